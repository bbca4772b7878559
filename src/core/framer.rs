//! Outgoing command framing
//!
//! Turns a submitted command into the exact bytes written to the device.

use crate::config::{DataMode, LineEnding};

use super::codec;

/// Frame a command for transmission.
///
/// `input` says how the user typed the command: `DataMode::Hex` parses
/// space separated hex pairs, `DataMode::Utf8` sends the text as is. The
/// configured line ending is appended afterwards.
///
/// Hex input without a single valid byte frames to an empty vector (no line
/// ending either); callers treat that as nothing to send.
pub fn frame(text: &str, input: DataMode, line_ending: LineEnding) -> Vec<u8> {
    let mut bytes = codec::encode(text, input);

    if bytes.is_empty() && input == DataMode::Hex {
        return bytes;
    }

    bytes.extend_from_slice(line_ending.as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings() {
        assert_eq!(frame("hi", DataMode::Utf8, LineEnding::None), b"hi".to_vec());
        assert_eq!(frame("hi", DataMode::Utf8, LineEnding::NewLine), b"hi\n".to_vec());
        assert_eq!(
            frame("hi", DataMode::Utf8, LineEnding::CarriageReturn),
            b"hi\r".to_vec()
        );
        assert_eq!(
            frame("hi", DataMode::Utf8, LineEnding::Both),
            vec![0x68, 0x69, 0x0D, 0x0A]
        );
    }

    #[test]
    fn test_hex_input() {
        assert_eq!(
            frame("41 62", DataMode::Hex, LineEnding::NewLine),
            vec![0x41, 0x62, 0x0A]
        );
    }

    #[test]
    fn test_invalid_hex_frames_to_nothing() {
        assert!(frame("zz q", DataMode::Hex, LineEnding::Both).is_empty());
    }
}
