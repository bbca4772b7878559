//! Core console pipeline components.
//!
//! This module contains the byte-to-line pipeline and its send path:
//!
//! - **codec**: bytes <-> UTF-8 or hex text
//! - **term**: VT100 escape interpreter and display line buffer
//! - **framer**: user command -> outgoing bytes with line ending
//! - **transport**: device collaborator trait and chunked reader
//! - **console**: controller wiring everything together
//!
//! # Architecture
//!
//! ```text
//! Console
//! ├── StreamDecoder (received chunk -> text)
//! ├── EscapeInterpreter (text -> runs + control actions)
//! ├── LineBuffer (display lines, snapshot for saving)
//! ├── CommandHistory (up/down recall)
//! └── Transport (device write, connection status)
//! ```

pub mod codec;
pub mod console;
pub mod framer;
pub mod term;
pub mod transport;
