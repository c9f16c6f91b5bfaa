//! Utility functions for encoding binary fields the way browsers and authenticators hand them to a
//! relying party. Every decoder accepts input with or without padding.

use data_encoding::{Specification, BASE64, BASE64URL, BASE64URL_NOPAD, BASE64_NOPAD};

/// Convert bytes to base64 without padding
pub fn base64(data: &[u8]) -> String {
    BASE64_NOPAD.encode(data)
}

/// Convert bytes to padded base64, the form used inside SafetyNet nonces and PEM bodies.
pub fn base64_padded(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Convert bytes to base64url without padding
pub fn base64url(data: &[u8]) -> String {
    BASE64URL_NOPAD.encode(data)
}

/// Try parsing from base64 with or without padding
pub fn try_from_base64(input: &str) -> Option<Vec<u8>> {
    let sane_string = input.trim_end_matches('=');
    BASE64_NOPAD.decode(sane_string.as_bytes()).ok()
}

/// Try parsing from base64url with or without padding
pub fn try_from_base64url(input: &str) -> Option<Vec<u8>> {
    let specs = BASE64URL.specification();
    let specs = Specification {
        check_trailing_bits: false,
        padding: None,
        ..specs
    };
    let encoding = specs.encoding().ok()?;
    let sane_string = input.trim_end_matches('=');
    encoding.decode(sane_string.as_bytes()).ok()
}

/// Whether `input` only uses the base64url alphabet, optionally followed by up to two padding
/// characters.
pub fn is_base64url(input: &str) -> bool {
    let body = input.trim_end_matches('=');
    let padding = input.len() - body.len();
    !body.is_empty()
        && padding <= 2
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Normalise a base64 or base64url string into unpadded base64url, returning `None` when the
/// input is neither.
pub fn to_base64url(input: &str) -> Option<String> {
    try_from_base64url(input)
        .or_else(|| try_from_base64(input))
        .map(|bytes| base64url(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64url_round_trips_for_every_length() {
        let data: Vec<u8> = (0..=255).collect();
        for len in 0..data.len() {
            let encoded = base64url(&data[..len]);
            let decoded = try_from_base64url(&encoded).expect("valid base64url");
            assert_eq!(base64url(&decoded), encoded);
        }
    }

    #[test]
    fn padding_is_optional() {
        assert_eq!(try_from_base64url("AQ=="), Some(vec![1]));
        assert_eq!(try_from_base64url("AQ"), Some(vec![1]));
        assert_eq!(try_from_base64("+/8="), Some(vec![0xfb, 0xff]));
    }

    #[test]
    fn base64url_shape() {
        assert!(is_base64url("33EHav-jZ1v9qwH783aU"));
        assert!(is_base64url("AQ=="));
        assert!(!is_base64url("AQ==="));
        assert!(!is_base64url("+/8="));
        assert!(!is_base64url(""));
    }

    #[test]
    fn normalises_base64_to_base64url() {
        assert_eq!(to_base64url("+/8=").as_deref(), Some("-_8"));
        assert_eq!(to_base64url("-_8").as_deref(), Some("-_8"));
        assert_eq!(to_base64url("not base64!"), None);
    }
}
