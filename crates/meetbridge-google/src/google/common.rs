//! Shared helpers for the service clients.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

/// Placeholder for fields the API left out.
pub const NOT_AVAILABLE: &str = "N/A";

/// URL-safe decoder that accepts bodies with or without `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Extract an array field from a JSON response, returning an empty vec if missing.
pub fn extract_array(response: &Value, field: &str) -> Vec<Value> {
    response
        .get(field)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// String at a JSON pointer, if present.
pub fn pointer_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(|v| v.as_str())
}

/// String at a JSON pointer, or [`NOT_AVAILABLE`].
pub fn str_or_na(value: &Value, pointer: &str) -> String {
    pointer_str(value, pointer)
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Optional string at a JSON pointer; empty strings count as absent.
pub fn opt_string(value: &Value, pointer: &str) -> Option<String> {
    pointer_str(value, pointer)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Integer that Google may encode either as a JSON number or a string
/// (Gmail's `messagesTotal` vs. `historyId`, Docs' `endIndex`).
pub fn pointer_i64(value: &Value, pointer: &str) -> Option<i64> {
    let v = value.pointer(pointer)?;
    v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Base64url encode without padding.
pub fn base64_url_encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Base64url decode to text, tolerating missing padding and invalid UTF-8.
pub fn base64_url_decode(data: &str) -> Option<String> {
    let bytes = URL_SAFE_LENIENT.decode(data.trim()).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Header values are single lines; any CR/LF is folded into a space.
fn header_value(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a raw RFC 822 message: header lines, a blank line, then the body.
pub fn build_raw_message(
    to: &[String],
    subject: &str,
    body: &str,
    cc: &[String],
    bcc: &[String],
) -> String {
    let mut lines = vec![format!("To: {}", to.join(", ")), format!("Subject: {}", header_value(subject))];
    if !cc.is_empty() {
        lines.push(format!("Cc: {}", cc.join(", ")));
    }
    if !bcc.is_empty() {
        lines.push(format!("Bcc: {}", bcc.join(", ")));
    }
    lines.push(String::new());
    lines.push(body.to_string());
    lines.join("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_cannot_add_headers() {
        let raw = build_raw_message(
            &["a@example.com".to_string()],
            "Hi\r\nBcc: attacker@example.net",
            "body",
            &[],
            &[],
        );
        assert_eq!(
            raw,
            "To: a@example.com\r\nSubject: Hi Bcc: attacker@example.net\r\n\r\nbody"
        );
    }

    #[test]
    fn test_extract_array_missing_is_empty() {
        let v = json!({"items": [1, 2]});
        assert_eq!(extract_array(&v, "items").len(), 2);
        assert!(extract_array(&v, "messages").is_empty());
    }

    #[test]
    fn test_str_or_na() {
        let v = json!({"a": {"b": "x"}, "empty": ""});
        assert_eq!(str_or_na(&v, "/a/b"), "x");
        assert_eq!(str_or_na(&v, "/a/c"), "N/A");
        assert_eq!(str_or_na(&v, "/empty"), "N/A");
    }

    #[test]
    fn test_pointer_i64_accepts_strings() {
        let v = json!({"n": 5, "s": "42", "bad": "x"});
        assert_eq!(pointer_i64(&v, "/n"), Some(5));
        assert_eq!(pointer_i64(&v, "/s"), Some(42));
        assert_eq!(pointer_i64(&v, "/bad"), None);
    }

    #[test]
    fn test_base64_url_encode_has_no_padding() {
        let encoded = base64_url_encode(b"Hello, World!");
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
    }

    #[test]
    fn test_base64_url_decode_with_and_without_padding() {
        assert_eq!(base64_url_decode("aGk").as_deref(), Some("hi"));
        assert_eq!(base64_url_decode("aGk=").as_deref(), Some("hi"));
        assert_eq!(base64_url_decode("!!"), None);
    }

    #[test]
    fn test_build_raw_message() {
        let raw = build_raw_message(
            &["a@example.com".into(), "b@example.com".into()],
            "Hi",
            "Body",
            &["c@example.com".into()],
            &[],
        );
        assert_eq!(
            raw,
            "To: a@example.com, b@example.com\r\nSubject: Hi\r\nCc: c@example.com\r\n\r\nBody"
        );
    }
}
