//! Utility functions shared by the client, classifier and webhook code.

use crate::errors::{MonobankError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;

/// Upper bound on response/webhook bytes kept for diagnostics.
pub const MAX_BODY_SNIPPET: usize = 4096;

/// Returns at most `max` leading bytes of `body` as an owned buffer.
///
/// # Examples
///
/// ```
/// use monobank_acquiring::utils::trim_body;
///
/// assert_eq!(trim_body(b"abcdef", 3), b"abc".to_vec());
/// assert_eq!(trim_body(b"ab", 3), b"ab".to_vec());
/// ```
pub fn trim_body(body: &[u8], max: usize) -> Vec<u8> {
    if max == 0 || body.len() <= max {
        return body.to_vec();
    }
    body[..max].to_vec()
}

/// Decodes standard-alphabet base64 after trimming surrounding whitespace.
///
/// # Examples
///
/// ```
/// use monobank_acquiring::utils::decode_base64;
///
/// assert_eq!(decode_base64("verify", " aGVsbG8= ").unwrap(), b"hello".to_vec());
/// assert!(decode_base64("verify", "***").is_err());
/// ```
pub fn decode_base64(op: &'static str, encoded: &str) -> Result<Vec<u8>> {
    BASE64.decode(encoded.trim().as_bytes()).map_err(|e| {
        MonobankError::decode(op, format!("base64 decode: {}", e), Vec::new(), Some(Box::new(e)))
    })
}

/// Encodes bytes as standard-alphabet base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Renders a JSON value as the plain string an error code is compared with.
///
/// Strings are trimmed, integral numbers lose any `.0` suffix, `null` is empty
/// and everything else is rendered as compact JSON.
///
/// # Examples
///
/// ```
/// use monobank_acquiring::utils::value_to_string;
/// use serde_json::json;
///
/// assert_eq!(value_to_string(&json!(82)), "82");
/// assert_eq!(value_to_string(&json!(82.0)), "82");
/// assert_eq!(value_to_string(&json!(" 1005 ")), "1005");
/// assert_eq!(value_to_string(&json!(null)), "");
/// ```
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        (f as i64).to_string()
                    }
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Returns the first value that is not blank, trimmed.
pub fn first_non_empty<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Trims a string and drops it entirely when nothing is left.
pub(crate) fn non_blank(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_trim_body() {
        let body = vec![b'x'; MAX_BODY_SNIPPET + 10];
        assert_eq!(trim_body(&body, MAX_BODY_SNIPPET).len(), MAX_BODY_SNIPPET);
        assert_eq!(trim_body(&body, 0).len(), body.len());
        assert!(trim_body(b"", 10).is_empty());
    }

    #[test]
    fn test_decode_base64() {
        let encoded = encode_base64(b"-----BEGIN PUBLIC KEY-----");
        assert_eq!(
            decode_base64("pubkey", &format!("\n{}\n", encoded)).unwrap(),
            b"-----BEGIN PUBLIC KEY-----".to_vec()
        );

        let err = decode_base64("pubkey", "not base64!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!(82)), "82");
        assert_eq!(value_to_string(&json!(-3)), "-3");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!("  INVALID_MERCHANT ")), "INVALID_MERCHANT");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(value_to_string(&Value::Null), "");
    }

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty(["", "  ", " declined "]), Some("declined"));
        assert_eq!(first_non_empty(["", " "]), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  inv-1 "), Some("inv-1".to_string()));
        assert_eq!(non_blank("   "), None);
    }
}
