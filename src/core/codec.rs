//! Byte <-> text conversion
//!
//! Received bytes are shown either as UTF-8 text or as space separated hex
//! pairs, and typed commands are turned back into bytes the same two ways.

use tracing::debug;

use crate::config::DataMode;

/// Bytes shown per hex dump row
const DUMP_ROW: usize = 16;

/// Decode a complete byte sequence for display.
///
/// UTF-8 decoding is lossy: invalid sequences become U+FFFD and never stop
/// the rest of the input from being decoded. Hex mode renders each byte as
/// two uppercase digits joined by single spaces (`0x0A` -> `"0A"`).
pub fn decode(bytes: &[u8], mode: DataMode) -> String {
    match mode {
        DataMode::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        DataMode::Hex => bytes
            .iter()
            .map(|b| hex::encode_upper([*b]))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Encode user text into bytes.
///
/// In hex mode the text is split on whitespace and every token must be an
/// even run of hex digits (case-insensitive). Malformed tokens are skipped,
/// so fully invalid input yields an empty vector.
pub fn encode(text: &str, mode: DataMode) -> Vec<u8> {
    match mode {
        DataMode::Utf8 => text.as_bytes().to_vec(),
        DataMode::Hex => text
            .split_whitespace()
            .filter_map(|token| match hex::decode(token) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    debug!("Skipping hex token {:?}: {}", token, e);
                    None
                }
            })
            .flatten()
            .collect(),
    }
}

/// Regroup typed hex digits into space separated pairs (`"0a0B 1"` -> `"0a 0B 1"`)
pub fn format_user_hex(text: &str) -> String {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    digits
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classic hex dump: offset-free rows of 16 bytes with an ASCII gutter.
///
/// ```text
/// 48 65 6C 6C 6F 0A                                   |  Hello.
/// ```
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();

    for row in bytes.chunks(DUMP_ROW) {
        for i in 0..DUMP_ROW {
            match row.get(i) {
                Some(b) => {
                    out.push_str(&hex::encode_upper([*b]));
                    out.push(' ');
                }
                None => out.push_str("   "),
            }
            if i == DUMP_ROW / 2 - 1 || i == DUMP_ROW - 1 {
                out.push(' ');
            }
        }

        let ascii: String = row
            .iter()
            .map(|&b| if (b' '..=b'~').contains(&b) { b as char } else { '.' })
            .collect();
        out.push_str("|  ");
        out.push_str(&ascii);
        out.push_str(" \n");
    }

    out
}

/// Chunk-aware decoder.
///
/// A multi-byte UTF-8 character split across two transport deliveries is
/// held back until its remaining bytes arrive, so the decoded text does not
/// depend on where the chunk boundaries fall.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Incomplete UTF-8 tail of the previous chunk (at most 3 bytes)
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk
    pub fn decode(&mut self, bytes: &[u8], mode: DataMode) -> String {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(bytes);

        if mode == DataMode::Hex {
            return decode(&data, mode);
        }

        let mut out = String::with_capacity(data.len());
        let mut rest = &data[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // Truncated sequence at the end of the chunk
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush a held-back partial character as replacement text
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// Whether bytes are waiting for the rest of a character
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode(&[0x0A], DataMode::Hex), "0A");
        assert_eq!(decode(&[0xDE, 0xAD, 0x01], DataMode::Hex), "DE AD 01");
        assert_eq!(decode(&[], DataMode::Hex), "");
    }

    #[test]
    fn test_decode_invalid_utf8_is_replaced() {
        assert_eq!(decode(b"ok\xFFgo", DataMode::Utf8), "ok\u{FFFD}go");
    }

    #[test]
    fn test_encode_hex_tolerates_case_and_whitespace() {
        assert_eq!(encode("0a  FF\t1b", DataMode::Hex), vec![0x0A, 0xFF, 0x1B]);
        assert_eq!(encode(" 0A0B ", DataMode::Hex), vec![0x0A, 0x0B]);
    }

    #[test]
    fn test_encode_hex_skips_malformed_tokens() {
        assert_eq!(encode("41 4 zz 42", DataMode::Hex), vec![0x41, 0x42]);
        assert!(encode("xyz q", DataMode::Hex).is_empty());
    }

    #[test]
    fn test_round_trip() {
        let text = "AT+CGMI héllo";
        assert_eq!(decode(&encode(text, DataMode::Utf8), DataMode::Utf8), text);

        let bytes = [0x00, 0x7F, 0x80, 0xFF];
        assert_eq!(encode(&decode(&bytes, DataMode::Hex), DataMode::Hex), bytes);
    }

    #[test]
    fn test_format_user_hex() {
        assert_eq!(format_user_hex("0a0B 1"), "0a 0B 1");
        assert_eq!(format_user_hex("  de ad be ef  "), "de ad be ef");
        assert_eq!(format_user_hex(""), "");
    }

    #[test]
    fn test_hex_dump() {
        let dump = hex_dump(b"Hello\n");
        let expected = format!("48 65 6C 6C 6F 0A {} |  Hello. \n", " ".repeat(31));
        assert_eq!(dump, expected);

        let full = hex_dump(b"0123456789abcdef");
        assert_eq!(
            full,
            "30 31 32 33 34 35 36 37  38 39 61 62 63 64 65 66  |  0123456789abcdef \n"
        );
    }

    #[test]
    fn test_stream_decoder_joins_split_characters() {
        let mut decoder = StreamDecoder::new();
        let bytes = "é€".as_bytes();

        assert_eq!(decoder.decode(&bytes[..1], DataMode::Utf8), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(&bytes[1..3], DataMode::Utf8), "é");
        assert_eq!(decoder.decode(&bytes[3..], DataMode::Utf8), "€");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_stream_decoder_replaces_invalid_bytes() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xFFb", DataMode::Utf8), "a\u{FFFD}b");
        assert_eq!(decoder.decode(b"\xC3", DataMode::Utf8), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_stream_decoder_hex_keeps_pending_bytes() {
        let mut decoder = StreamDecoder::new();
        decoder.decode(b"\xE2\x82", DataMode::Utf8);
        assert_eq!(decoder.decode(b"A", DataMode::Hex), "E2 82 41");
    }
}
