//! Inbound byte sanitization.

/// DEL, stripped along with the C0 control range.
const DEL: u8 = 127;

/// Strips control bytes (values below 32, and 127) from a raw read.
///
/// Works on bytes, not characters: a multibyte UTF-8 sequence split across
/// two reads passes through untouched and is decoded once the fragments are
/// folded into a message. Never fails.
pub fn sanitize(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .copied()
        .filter(|&b| b >= 32 && b != DEL)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_control_bytes() {
        assert_eq!(sanitize(b"he\r\nllo\x00\x1b"), b"hello");
        assert_eq!(sanitize(b"a\x7fb"), b"ab");
    }

    #[test]
    fn test_keeps_printable_ascii() {
        assert_eq!(sanitize(b" ~!abc XYZ"), b" ~!abc XYZ");
    }

    #[test]
    fn test_only_controls_yields_empty() {
        assert!(sanitize(b"\r\n\t").is_empty());
        assert!(sanitize(b"").is_empty());
    }

    #[test]
    fn test_keeps_utf8() {
        assert_eq!(sanitize("héllo\n".as_bytes()), "héllo".as_bytes());
    }

    #[test]
    fn test_split_multibyte_survives_concatenation() {
        let bytes = "é".as_bytes();
        let mut joined = sanitize(&bytes[..1]);
        joined.extend(sanitize(&bytes[1..]));
        assert_eq!(String::from_utf8(joined).unwrap(), "é");
    }
}
