//! Console controller
//!
//! Owns the pipeline state for one device session: decodes received chunks,
//! runs them through the escape interpreter into the line buffer, frames and
//! sends user commands, and tells subscribers what changed.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use super::codec::{self, StreamDecoder};
use super::framer;
use super::term::{Clock, EscapeInterpreter, LineBuffer, SystemClock};
use super::transport::Transport;
use crate::config::{Config, DataMode, DisplayMode, LineEnding};
use crate::history::CommandHistory;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Device is not connected")]
    NotConnected,

    #[error("Failed to write to device: {0}")]
    Transport(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Configuration knob reported by [`ConsoleEvent::SettingChanged`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    DataMode,
    DisplayMode,
    LineEnding,
    Echo,
    Autoscroll,
    ShowTimestamp,
    Vt100,
}

/// Console events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Line buffer content changed
    DisplayChanged,
    /// A setter was called (even if the value did not change)
    SettingChanged(Setting),
    /// Up/down recall produced this text (empty when browsing ended)
    HistoryRecalled(String),
    /// Bytes accepted by the transport
    DataSent(usize),
}

/// Console shared between a reader thread and the UI thread
pub type SharedConsole<T> = Arc<Mutex<Console<T>>>;

/// Serial console controller
pub struct Console<T> {
    config: Config,
    decoder: StreamDecoder,
    interpreter: EscapeInterpreter,
    lines: LineBuffer,
    history: CommandHistory,
    transport: T,
    subscribers: Vec<Sender<ConsoleEvent>>,
}

impl<T: Transport> Console<T> {
    /// Create a console writing to `transport`
    pub fn new(config: Config, transport: T) -> Self {
        Self::with_clock(config, transport, Box::new(SystemClock))
    }

    /// Create a console whose line timestamps come from `clock`
    pub fn with_clock(config: Config, transport: T, clock: Box<dyn Clock>) -> Self {
        let mut lines = LineBuffer::with_clock(clock);
        lines.set_show_timestamp(config.show_timestamp);
        lines.set_timestamp_format(&config.timestamp.format);

        Self {
            history: CommandHistory::with_limit(config.history.limit),
            config,
            decoder: StreamDecoder::new(),
            interpreter: EscapeInterpreter::new(),
            lines,
            transport,
            subscribers: Vec::new(),
        }
    }

    /// Wrap the console for use from several threads
    pub fn into_shared(self) -> SharedConsole<T> {
        Arc::new(Mutex::new(self))
    }

    /// Register for console events.
    ///
    /// The channel is unbounded: a receiver that is kept alive must be read,
    /// otherwise events pile up for the rest of the session. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<ConsoleEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Process one chunk received from the device
    pub fn on_bytes_received(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        let text = self.decoder.decode(chunk, self.config.data_mode);
        self.display(text);
    }

    /// Render bytes still held back by the decoder (end of stream)
    pub fn flush_decoder(&mut self) {
        let text = self.decoder.finish();
        self.display(text);
    }

    /// Send a command typed as text
    pub fn send(&mut self, text: &str) -> Result<usize> {
        self.transmit(text, DataMode::Utf8)
    }

    /// Send a command typed as hex pairs (`"41 54 0D"`)
    pub fn send_hex(&mut self, text: &str) -> Result<usize> {
        self.transmit(text, DataMode::Hex)
    }

    fn transmit(&mut self, text: &str, input: DataMode) -> Result<usize> {
        if text.is_empty() {
            return Ok(0);
        }
        if !self.transport.is_connected() {
            return Err(ConsoleError::NotConnected);
        }

        self.history.record(text);

        let data = framer::frame(text, input, self.config.line_ending);
        if data.is_empty() {
            debug!("Nothing to send for {:?}", text);
            return Ok(0);
        }

        let written = self.transport.write(&data).map_err(|e| {
            warn!("Write failed: {}", e);
            ConsoleError::Transport(e)
        })?;
        if written < data.len() {
            warn!("Short write: {} of {} bytes", written, data.len());
        }
        self.emit(ConsoleEvent::DataSent(written));

        if self.config.echo {
            let sent = &data[..written.min(data.len())];
            let echoed = codec::decode(sent, self.config.data_mode);
            self.display(echoed);
        }

        Ok(written)
    }

    /// Route decoded text through the interpreter into the line buffer
    fn display(&mut self, mut text: String) {
        if text.is_empty() {
            return;
        }

        // Keep hex pairs separated across chunk boundaries
        if self.config.data_mode == DataMode::Hex && !self.lines.current_line_is_empty() {
            text.insert(0, ' ');
        }

        let before = self.lines.revision();
        if self.config.vt100_enabled {
            self.interpreter.feed(&text, &mut self.lines);
        } else {
            self.lines.append(&text);
        }

        if self.lines.revision() != before {
            self.emit(ConsoleEvent::DisplayChanged);
        }
    }

    /// Recall the previous (older) command
    pub fn history_up(&mut self) -> String {
        let text = self.history.previous().unwrap_or_default().to_string();
        self.emit(ConsoleEvent::HistoryRecalled(text.clone()));
        text
    }

    /// Recall the next (newer) command
    pub fn history_down(&mut self) -> String {
        let text = self.history.next().unwrap_or_default().to_string();
        self.emit(ConsoleEvent::HistoryRecalled(text.clone()));
        text
    }

    /// Text currently recalled from history
    pub fn current_history(&self) -> &str {
        self.history.current().unwrap_or_default()
    }

    /// Empty the line buffer; interpreter, history and settings are kept
    pub fn clear(&mut self) {
        self.lines.clear_all();
        self.emit(ConsoleEvent::DisplayChanged);
    }

    /// Console text for saving to a file
    pub fn save(&self) -> String {
        self.lines.snapshot_text()
    }

    /// Console text as a hex dump with ASCII gutter
    pub fn save_hex_dump(&self) -> String {
        codec::hex_dump(self.save().as_bytes())
    }

    /// Console text in the configured display mode
    pub fn render(&self) -> String {
        match self.config.display_mode {
            DisplayMode::PlainText => self.save(),
            DisplayMode::Hex => self.save_hex_dump(),
        }
    }

    /// Whether there is anything to save
    pub fn save_available(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn set_data_mode(&mut self, mode: DataMode) {
        debug!("Data mode: {}", mode.label());
        self.config.data_mode = mode;
        self.emit(ConsoleEvent::SettingChanged(Setting::DataMode));
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        debug!("Display mode: {}", mode.label());
        self.config.display_mode = mode;
        self.emit(ConsoleEvent::SettingChanged(Setting::DisplayMode));
    }

    pub fn set_line_ending(&mut self, ending: LineEnding) {
        debug!("Line ending: {}", ending.label());
        self.config.line_ending = ending;
        self.emit(ConsoleEvent::SettingChanged(Setting::LineEnding));
    }

    pub fn set_echo(&mut self, enabled: bool) {
        self.config.echo = enabled;
        self.emit(ConsoleEvent::SettingChanged(Setting::Echo));
    }

    pub fn set_autoscroll(&mut self, enabled: bool) {
        self.config.autoscroll = enabled;
        self.emit(ConsoleEvent::SettingChanged(Setting::Autoscroll));
    }

    pub fn set_show_timestamp(&mut self, enabled: bool) {
        self.config.show_timestamp = enabled;
        self.lines.set_show_timestamp(enabled);
        self.emit(ConsoleEvent::SettingChanged(Setting::ShowTimestamp));
    }

    /// Toggle VT100 interpretation; a partially received sequence is kept
    pub fn set_vt100_enabled(&mut self, enabled: bool) {
        self.config.vt100_enabled = enabled;
        self.emit(ConsoleEvent::SettingChanged(Setting::Vt100));
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lines(&self) -> &LineBuffer {
        &self.lines
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn interpreter(&self) -> &EscapeInterpreter {
        &self.interpreter
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn emit(&mut self, event: ConsoleEvent) {
        // Drop subscribers whose receiver is gone
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
