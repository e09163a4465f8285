//! Tolerant base64 decoding for uploaded document payloads

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use regex::Regex;

/// Decode a base64 document payload into raw bytes.
///
/// Browser clients send payloads in several shapes: bare base64, full
/// `data:<mime>;base64,` URLs, and base64 wrapped with newlines or spaces.
/// All of them decode to the same bytes. Any malformed payload decodes to
/// an empty vector; callers treat empty bytes as "could not be processed".
pub fn decode_base64_content(content: &str) -> Vec<u8> {
    let prefix = Regex::new(r"^data:[^,]*;base64,").unwrap();
    let stripped = prefix.replace(content.trim(), "");

    let cleaned: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Vec::new();
    }

    match STANDARD.decode(cleaned.as_bytes()) {
        Ok(bytes) => bytes,
        // Some clients strip padding; accept that too before giving up
        Err(_) => STANDARD_NO_PAD
            .decode(cleaned.trim_end_matches('=').as_bytes())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &[u8] = b"hello world";

    #[test]
    fn test_decodes_plain_base64() {
        assert_eq!(decode_base64_content("aGVsbG8gd29ybGQ="), HELLO);
    }

    #[test]
    fn test_strips_data_url_prefix() {
        assert_eq!(
            decode_base64_content("data:application/pdf;base64,aGVsbG8gd29ybGQ="),
            HELLO
        );
    }

    #[test]
    fn test_ignores_embedded_whitespace() {
        assert_eq!(
            decode_base64_content("aGVs\r\nbG8g  d29y\tbGQ=\n"),
            HELLO
        );
    }

    #[test]
    fn test_same_bytes_from_all_shapes() {
        let plain = decode_base64_content("aGVsbG8gd29ybGQ=");
        let prefixed = decode_base64_content("data:text/plain;base64,aGVsbG8gd29ybGQ=");
        let wrapped = decode_base64_content("aGVsbG8g\nd29ybGQ=");
        assert_eq!(plain, prefixed);
        assert_eq!(plain, wrapped);
    }

    #[test]
    fn test_tolerates_missing_padding() {
        assert_eq!(decode_base64_content("aGVsbG8gd29ybGQ"), HELLO);
    }

    #[test]
    fn test_garbage_decodes_to_empty() {
        assert!(decode_base64_content("not base64 at all!!!").is_empty());
        assert!(decode_base64_content("").is_empty());
        assert!(decode_base64_content("data:application/pdf;base64,").is_empty());
    }
}
