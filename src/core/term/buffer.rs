//! Display line storage
//!
//! Accumulates interpreted text into finished lines plus one open line that
//! is still receiving characters. This is the document the UI renders and
//! the text written out when the user saves the console.

use std::fmt::Write as _;

use chrono::{Local, NaiveTime};

use super::parser::ControlAction;
use crate::config::DEFAULT_TIMESTAMP_FORMAT;

/// Source of line capture times
pub trait Clock: Send {
    fn now(&self) -> NaiveTime;
}

/// Wall clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// One rendered console line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayLine {
    /// Capture time, set once when the line receives its first character
    pub timestamp: Option<String>,
    /// Line content without terminator
    pub text: String,
}

impl DisplayLine {
    /// Line as shown to the user, timestamp prefix included
    pub fn render(&self) -> String {
        match &self.timestamp {
            Some(ts) => format!("[{}] {}", ts, self.text),
            None => self.text.clone(),
        }
    }
}

/// Ordered console lines
pub struct LineBuffer {
    /// Finished lines (oldest first)
    lines: Vec<DisplayLine>,
    /// Line still open for characters
    current: DisplayLine,
    /// Open line has received at least one character or terminator
    line_started: bool,
    /// Last character was `\r`; a following `\n` belongs to the same break
    pending_cr: bool,
    show_timestamp: bool,
    timestamp_format: String,
    clock: Box<dyn Clock>,
    /// Bumped on every mutation
    revision: u64,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Create a buffer that stamps lines using `clock`
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            lines: Vec::new(),
            current: DisplayLine::default(),
            line_started: false,
            pending_cr: false,
            show_timestamp: false,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            clock,
            revision: 0,
        }
    }

    pub fn set_show_timestamp(&mut self, enabled: bool) {
        self.show_timestamp = enabled;
    }

    /// Set the chrono `strftime` pattern used for new timestamps
    pub fn set_timestamp_format(&mut self, format: &str) {
        self.timestamp_format = format.to_string();
    }

    /// Append text. `\n`, `\r` and `\r\n` each close the open line.
    pub fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        for ch in text.chars() {
            match ch {
                '\r' => {
                    self.close_line();
                    self.pending_cr = true;
                }
                '\n' => {
                    if !self.pending_cr {
                        self.close_line();
                    }
                    self.pending_cr = false;
                }
                _ => {
                    self.pending_cr = false;
                    self.start_line();
                    self.current.text.push(ch);
                }
            }
        }

        self.revision += 1;
    }

    /// Apply a control action from the escape interpreter
    pub fn control(&mut self, action: ControlAction) {
        match action {
            ControlAction::ClearScreen | ControlAction::CursorHome => self.clear_all(),
            ControlAction::ClearLine => self.clear_current_line(),
        }
    }

    /// Discard every line, finished or not
    pub fn clear_all(&mut self) {
        self.lines.clear();
        self.reset_current();
        self.pending_cr = false;
        self.revision += 1;
    }

    /// Discard the content of the open line only
    pub fn clear_current_line(&mut self) {
        self.reset_current();
        self.revision += 1;
    }

    /// Full text of the console, one physical line per display line
    pub fn snapshot_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        if self.line_started {
            out.push_str(&self.current.render());
        }
        out
    }

    /// Finished lines, oldest first
    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    /// The open line
    pub fn current_line(&self) -> &DisplayLine {
        &self.current
    }

    /// Whether the open line has no content yet
    pub fn current_line_is_empty(&self) -> bool {
        self.current.text.is_empty()
    }

    /// Number of lines including a started open line
    pub fn line_count(&self) -> usize {
        self.lines.len() + usize::from(self.line_started)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && !self.line_started
    }

    /// Mutation counter, used to detect whether an operation changed anything
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn start_line(&mut self) {
        if self.line_started {
            return;
        }
        self.line_started = true;
        if self.show_timestamp {
            self.current.timestamp = Some(self.format_now());
        }
    }

    fn close_line(&mut self) {
        self.start_line();
        let line = std::mem::take(&mut self.current);
        self.lines.push(line);
        self.line_started = false;
    }

    fn reset_current(&mut self) {
        self.current = DisplayLine::default();
        self.line_started = false;
    }

    fn format_now(&self) -> String {
        let now = self.clock.now();
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.timestamp_format)).is_err() {
            // Invalid user pattern
            out.clear();
            let _ = write!(out, "{}", now.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> NaiveTime {
            NaiveTime::from_hms_milli_opt(12, 34, 56, 789).unwrap()
        }
    }

    fn stamped() -> LineBuffer {
        let mut buffer = LineBuffer::with_clock(Box::new(FixedClock));
        buffer.set_show_timestamp(true);
        buffer
    }

    #[test]
    fn test_lines_are_closed_by_newline() {
        let mut buffer = LineBuffer::new();
        buffer.append("one\ntwo\nthr");
        buffer.append("ee");

        assert_eq!(buffer.lines().len(), 2);
        assert_eq!(buffer.lines()[1].text, "two");
        assert_eq!(buffer.current_line().text, "three");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.snapshot_text(), "one\ntwo\nthree");
    }

    #[test]
    fn test_carriage_returns_are_normalised() {
        let mut buffer = LineBuffer::new();
        buffer.append("a\r\nb\rc\r");
        buffer.append("\nd");
        assert_eq!(buffer.snapshot_text(), "a\nb\nc\nd");
    }

    #[test]
    fn test_timestamp_once_per_line() {
        let mut buffer = stamped();
        buffer.append("he");
        buffer.append("llo\n\nworld");
        assert_eq!(
            buffer.snapshot_text(),
            "[12:34:56.789] hello\n[12:34:56.789] \n[12:34:56.789] world"
        );
    }

    #[test]
    fn test_custom_timestamp_format() {
        let mut buffer = stamped();
        buffer.set_timestamp_format("%H:%M");
        buffer.append("x\n");
        assert_eq!(buffer.lines()[0].render(), "[12:34] x");
    }

    #[test]
    fn test_invalid_timestamp_format_falls_back() {
        for format in ["%Q", "%Y-%m-%d", "%", "%H:%M %"] {
            let mut buffer = stamped();
            buffer.set_timestamp_format(format);
            buffer.append("x\n");
            assert_eq!(buffer.lines()[0].render(), "[12:34:56.789] x", "format {:?}", format);
        }
    }

    #[test]
    fn test_clear_all() {
        let mut buffer = LineBuffer::new();
        buffer.append("a\nb");
        buffer.clear_all();
        assert!(buffer.is_empty());
        assert_eq!(buffer.snapshot_text(), "");
    }

    #[test]
    fn test_clear_current_line() {
        let mut buffer = LineBuffer::new();
        buffer.append("kept\npartial");
        buffer.clear_current_line();
        assert_eq!(buffer.snapshot_text(), "kept\n");
        buffer.append("new");
        assert_eq!(buffer.snapshot_text(), "kept\nnew");
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let mut buffer = LineBuffer::new();
        let start = buffer.revision();
        buffer.append("");
        assert_eq!(buffer.revision(), start);
        buffer.append("x");
        buffer.control(ControlAction::ClearLine);
        assert_eq!(buffer.revision(), start + 2);
    }
}
