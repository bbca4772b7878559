//! serterm - console pipeline for serial devices
//!
//! serterm turns the raw byte stream of a serial device into display lines
//! and turns typed commands back into framed bytes.
//!
//! # Features
//!
//! - **Data Modes**: Show received bytes as UTF-8 text or as hex pairs
//! - **VT100 Subset**: Clear screen, clear line and cursor home sequences
//! - **Chunk Agnostic**: Split characters and escape sequences are reassembled
//! - **Line Timestamps**: Optional capture time prefix per line
//! - **Command History**: Up/down recall of sent commands
//! - **Line Endings**: None, LF, CR or CR+LF appended to commands
//!
//! # Example
//!
//! ```
//! use serterm::{Config, Console, LineEnding, LoopbackTransport};
//!
//! let config = Config { vt100_enabled: true, line_ending: LineEnding::Both, ..Config::default() };
//! let mut console = Console::new(config, LoopbackTransport::new());
//!
//! console.on_bytes_received(b"boot\x1b[2");
//! console.on_bytes_received(b"Jready\n");
//! assert_eq!(console.save(), "ready\n");
//!
//! console.send("AT").unwrap();
//! assert_eq!(console.transport_mut().take_incoming(), vec![b"AT\r\n".to_vec()]);
//! ```

pub mod config;
pub mod core;
pub mod history;

pub use crate::config::{
    data_modes, display_modes, line_endings, Config, ConfigError, DataMode, DisplayMode,
    LineEnding,
};
pub use crate::core::codec::{format_user_hex, hex_dump};
pub use crate::core::console::{Console, ConsoleError, ConsoleEvent, Setting, SharedConsole};
pub use crate::core::term::{
    Clock, ControlAction, DisplayLine, EscapeInterpreter, InterpreterState, LineBuffer,
};
pub use crate::core::transport::{spawn_reader, ChunkReader, LoopbackTransport, Transport};
pub use crate::history::CommandHistory;
