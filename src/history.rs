//! Command history for serterm
//!
//! Remembers the commands sent to the device and lets the user walk back
//! and forth through them with up/down recall.

use crate::config::DEFAULT_HISTORY_LIMIT;

/// Sent command storage with a recall cursor
#[derive(Debug, Clone)]
pub struct CommandHistory {
    /// All sent commands (newest last)
    entries: Vec<String>,
    /// Entry currently recalled, `None` when not browsing
    cursor: Option<usize>,
    /// Maximum entries
    max_entries: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    /// Create an empty history with the default limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty history keeping at most `max_entries` commands
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_entries: max_entries.max(1),
        }
    }

    /// Add a sent command to history and stop browsing
    pub fn record(&mut self, command: &str) {
        self.cursor = None;

        if command.is_empty() {
            return;
        }

        self.entries.push(command.to_string());

        // Trim if exceeding limit
        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
    }

    /// Step towards older commands.
    ///
    /// Returns `None` once the oldest command has already been recalled; the
    /// cursor stays on the oldest entry (no wraparound).
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }

        let index = match self.cursor {
            None => self.entries.len() - 1,
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Step towards newer commands.
    ///
    /// Moving past the newest command ends browsing and returns `None`.
    pub fn next(&mut self) -> Option<&str> {
        let index = self.cursor? + 1;
        if index >= self.entries.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Command under the recall cursor
    pub fn current(&self) -> Option<&str> {
        self.cursor
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    /// Whether up/down recall is in progress
    pub fn is_browsing(&self) -> bool {
        self.cursor.is_some()
    }

    /// All commands, oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
