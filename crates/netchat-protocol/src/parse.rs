//! Decoding of inbound client data.
//!
//! Clients send raw text with no framing. The server reads at most
//! [`READ_BUFFER_SIZE`] bytes at a time and treats each read as one message,
//! so a long paste may arrive as several messages and two quick sends may
//! arrive as one.

/// Size of the per-connection read buffer.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Decodes one read from a client into message text.
///
/// Invalid UTF-8 is replaced rather than rejected, and surrounding whitespace
/// (including the line terminator a terminal client appends) is trimmed.
/// Returns `None` when nothing but whitespace was received.
pub fn decode_chunk(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_trims_line_endings() {
        assert_eq!(decode_chunk(b"hello\r\n").as_deref(), Some("hello"));
        assert_eq!(decode_chunk(b"  spaced out  ").as_deref(), Some("spaced out"));
    }

    #[test]
    fn test_decode_whitespace_only_is_none() {
        assert_eq!(decode_chunk(b""), None);
        assert_eq!(decode_chunk(b"   "), None);
        assert_eq!(decode_chunk(b"\n\t\r\n"), None);
    }

    #[test]
    fn test_decode_keeps_inner_newlines() {
        assert_eq!(decode_chunk(b"one\ntwo\n").as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn test_decode_replaces_invalid_utf8() {
        let decoded = decode_chunk(&[b'h', b'i', 0xFF]).unwrap();
        assert!(decoded.starts_with("hi"));
        assert!(decoded.contains('\u{FFFD}'));
    }
}
