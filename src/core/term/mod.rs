//! Console text model: escape interpreter and line buffer.

pub mod buffer;
pub mod parser;

pub use buffer::{Clock, DisplayLine, LineBuffer, SystemClock};
pub use parser::{ControlAction, EscapeInterpreter, InterpreterState};
