//! VT100 control sequence interpreter
//!
//! Splits decoded text into plain text runs and a small set of control
//! actions. Only `ESC [ 2 J`, `ESC [ H` and `ESC [ 2 K` have an effect; every
//! other sequence is recognized far enough to be swallowed and then dropped.
//!
//! The interpreter works one character at a time and keeps its state between
//! calls, so a sequence split across two deliveries is handled the same as
//! one delivered whole.

use tracing::debug;

use super::buffer::LineBuffer;

const ESC: char = '\x1b';

/// Longest command token kept before the sequence is abandoned
const MAX_COMMAND_LEN: usize = 3;

/// Buffer-level operation requested by a control sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// `ESC [ 2 J`
    ClearScreen,
    /// `ESC [ H` (treated as a full clear, there is no cursor addressing)
    CursorHome,
    /// `ESC [ 2 K`
    ClearLine,
}

/// Interpreter state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpreterState {
    #[default]
    PlainText,
    EscapeSeen,
    CollectingCommand,
    PendingFontReset,
}

/// Resumable escape sequence interpreter
#[derive(Debug, Default)]
pub struct EscapeInterpreter {
    state: InterpreterState,
    command: String,
}

impl EscapeInterpreter {
    pub fn new() -> Self {
        Self {
            state: InterpreterState::PlainText,
            command: String::with_capacity(MAX_COMMAND_LEN),
        }
    }

    /// Current state, for inspection between deliveries
    pub fn state(&self) -> InterpreterState {
        self.state
    }

    /// Forget any partially received sequence
    pub fn reset(&mut self) {
        self.state = InterpreterState::PlainText;
        self.command.clear();
    }

    /// Feed decoded text, writing text runs and control actions to `buffer`
    pub fn feed(&mut self, text: &str, buffer: &mut LineBuffer) {
        let mut run = String::with_capacity(text.len());

        for ch in text.chars() {
            match self.state {
                InterpreterState::PlainText => self.plain_text(ch, &mut run, buffer),
                InterpreterState::EscapeSeen => self.escape(ch),
                InterpreterState::CollectingCommand => {
                    if let Some(action) = self.collect(ch) {
                        buffer.control(action);
                    }
                }
                InterpreterState::PendingFontReset => {
                    // Charset designation: the selector is consumed and ignored
                    self.state = InterpreterState::PlainText;
                }
            }
        }

        flush(&mut run, buffer);
    }

    fn plain_text(&mut self, ch: char, run: &mut String, buffer: &mut LineBuffer) {
        match ch {
            ESC => {
                flush(run, buffer);
                self.state = InterpreterState::EscapeSeen;
            }
            '\n' => {
                run.push('\n');
                flush(run, buffer);
            }
            _ => run.push(ch),
        }
    }

    fn escape(&mut self, ch: char) {
        match ch {
            '[' => {
                self.command.clear();
                self.state = InterpreterState::CollectingCommand;
            }
            '(' => {
                self.state = InterpreterState::PendingFontReset;
            }
            _ => {
                debug!("Ignoring unknown escape: ESC {:?}", ch);
                self.state = InterpreterState::PlainText;
            }
        }
    }

    fn collect(&mut self, ch: char) -> Option<ControlAction> {
        if ch == ESC {
            // A new sequence starts before the old one finished
            self.command.clear();
            self.state = InterpreterState::EscapeSeen;
            return None;
        }

        if !ch.is_ascii_alphanumeric() {
            debug!("Aborting CSI {:?} on {:?}", self.command, ch);
            self.command.clear();
            self.state = InterpreterState::PlainText;
            return None;
        }

        self.command.push(ch);
        let action = match self.command.as_str() {
            "2J" => Some(ControlAction::ClearScreen),
            "H" => Some(ControlAction::CursorHome),
            "2K" => Some(ControlAction::ClearLine),
            cmd if cmd.len() >= MAX_COMMAND_LEN => {
                debug!("Unknown CSI: {:?}", cmd);
                None
            }
            _ => return None, // keep collecting
        };

        self.command.clear();
        self.state = InterpreterState::PlainText;
        action
    }
}

fn flush(run: &mut String, buffer: &mut LineBuffer) {
    if !run.is_empty() {
        buffer.append(run);
        run.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(chunks: &[&str]) -> (EscapeInterpreter, LineBuffer) {
        let mut parser = EscapeInterpreter::new();
        let mut buffer = LineBuffer::new();
        for chunk in chunks {
            parser.feed(chunk, &mut buffer);
        }
        (parser, buffer)
    }

    #[test]
    fn test_plain_text_passes_through() {
        let (parser, buffer) = interpret(&["hello\nworld"]);
        assert_eq!(parser.state(), InterpreterState::PlainText);
        assert_eq!(buffer.snapshot_text(), "hello\nworld");
    }

    #[test]
    fn test_clear_screen_leaves_no_text() {
        let (parser, buffer) = interpret(&["\x1b[2J"]);
        assert_eq!(parser.state(), InterpreterState::PlainText);
        assert!(buffer.is_empty());
        assert_eq!(buffer.snapshot_text(), "");
    }

    #[test]
    fn test_clear_screen_split_across_chunks() {
        let (_, split) = interpret(&["AB\x1b[2", "JC"]);
        let (_, whole) = interpret(&["AB\x1b[2JC"]);
        assert_eq!(split.snapshot_text(), "C");
        assert_eq!(whole.snapshot_text(), "C");
    }

    #[test]
    fn test_state_persists_between_feeds() {
        let mut parser = EscapeInterpreter::new();
        let mut buffer = LineBuffer::new();

        parser.feed("x\x1b", &mut buffer);
        assert_eq!(parser.state(), InterpreterState::EscapeSeen);
        parser.feed("[", &mut buffer);
        assert_eq!(parser.state(), InterpreterState::CollectingCommand);
        parser.feed("2", &mut buffer);
        assert_eq!(parser.state(), InterpreterState::CollectingCommand);
        parser.feed("K", &mut buffer);
        assert_eq!(parser.state(), InterpreterState::PlainText);
        assert_eq!(buffer.snapshot_text(), "");
    }

    #[test]
    fn test_cursor_home_clears() {
        let (_, buffer) = interpret(&["line one\nline two\x1b[Hafter"]);
        assert_eq!(buffer.snapshot_text(), "after");
    }

    #[test]
    fn test_clear_line_keeps_finished_lines() {
        let (_, buffer) = interpret(&["done\nprogress 10%\x1b[2Kprogress 20%"]);
        assert_eq!(buffer.snapshot_text(), "done\nprogress 20%");
    }

    #[test]
    fn test_unknown_escape_returns_to_plain_text() {
        let (parser, buffer) = interpret(&["a\x1bZb"]);
        assert_eq!(parser.state(), InterpreterState::PlainText);
        assert_eq!(buffer.snapshot_text(), "ab");
    }

    #[test]
    fn test_unknown_command_is_discarded_after_three_chars() {
        let (_, buffer) = interpret(&["a\x1b[123b"]);
        assert_eq!(buffer.snapshot_text(), "ab");

        // SGR colour codes end on a non-alphanumeric and are dropped too
        let (_, buffer) = interpret(&["\x1b[1;31mred"]);
        assert_eq!(buffer.snapshot_text(), "31mred");
    }

    #[test]
    fn test_invalid_char_aborts_command_without_output() {
        let (parser, buffer) = interpret(&["\x1b[2;x"]);
        assert_eq!(parser.state(), InterpreterState::PlainText);
        assert_eq!(buffer.snapshot_text(), "x");
    }

    #[test]
    fn test_escape_inside_command_restarts_sequence() {
        let (_, buffer) = interpret(&["keep\x1b[2\x1b[2Kgone"]);
        assert_eq!(buffer.snapshot_text(), "gone");
    }

    #[test]
    fn test_font_selection_consumes_one_char() {
        let (parser, buffer) = interpret(&["\x1b(", "Babc"]);
        assert_eq!(parser.state(), InterpreterState::PlainText);
        assert_eq!(buffer.snapshot_text(), "abc");
    }

    #[test]
    fn test_reset_forgets_partial_sequence() {
        let mut parser = EscapeInterpreter::new();
        let mut buffer = LineBuffer::new();
        parser.feed("\x1b[2", &mut buffer);
        parser.reset();
        parser.feed("J", &mut buffer);
        assert_eq!(buffer.snapshot_text(), "J");
    }
}
