//! # Payload Cleanup
//!
//! Best-effort normalization of the ingest payload before it is forwarded.
//!
//! The LLM produces the `url` field in several broken shapes: a plain string,
//! a nested object, a stringified object (`"{url: https://...}"`), or a URL
//! wrapped in stray quote characters. None of this is validated upstream, so
//! the rules here only make the common shapes usable; they guarantee nothing.

use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

/// Characters stripped from the final `url` value.
const STRAY_QUOTES: [char; 4] = ['\u{201C}', '\u{201D}', '\'', '"'];

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"https://[^\s"}]+"#).ok())
        .as_ref()
}

/// Extract the first `https://` URL from a string, or `""` if there is none.
pub fn extract_first_url(text: &str) -> String {
    url_pattern()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Normalize an ingest payload.
///
/// - a bare string becomes `{username: default_username, url: <string>}`
/// - an object without a `username` key gets `default_username`; a present
///   value is forwarded untouched, whatever its type
/// - `url` is unwrapped from nested objects and stringified objects, then
///   trimmed and stripped of quote characters
///
/// Anything that is neither a string nor an object is returned as-is.
pub fn normalize_ingest_payload(payload: Value, default_username: &str) -> Value {
    let mut object = match payload {
        Value::String(s) => {
            let mut map = Map::new();
            map.insert("username".to_string(), json!(default_username));
            map.insert("url".to_string(), json!(s.trim()));
            map
        }
        Value::Object(map) => map,
        other => return other,
    };

    if !object.contains_key("username") {
        object.insert("username".to_string(), json!(default_username));
    }

    let url = match object.remove("url") {
        Some(Value::String(s)) if s.contains("url:") || s.contains("notion.site") => {
            tracing::warn!("cleaning malformed 'url' string");
            extract_first_url(&s)
        }
        Some(Value::String(s)) => s,
        Some(Value::Object(inner)) => {
            tracing::warn!("'url' arrived as an object, unwrapping");
            match inner.get("url") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(v) => v.to_string(),
            }
        }
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let cleaned: String = url.trim().chars().filter(|c| !STRAY_QUOTES.contains(c)).collect();
    object.insert("url".to_string(), json!(cleaned));

    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "michelechungugc";

    #[test]
    fn test_bare_string_gets_default_username() {
        let out = normalize_ingest_payload(json!("  https://acme.notion.site/brief  "), USER);
        assert_eq!(out["username"], USER);
        assert_eq!(out["url"], "https://acme.notion.site/brief");
    }

    #[test]
    fn test_stringified_object_url_is_extracted() {
        let payload = json!({
            "username": "creator",
            "url": "{url: https://acme.notion.site/Brief-123}"
        });
        let out = normalize_ingest_payload(payload, USER);
        assert_eq!(out["username"], "creator");
        assert_eq!(out["url"], "https://acme.notion.site/Brief-123");
    }

    #[test]
    fn test_nested_object_url_is_unwrapped() {
        let payload = json!({
            "username": "creator",
            "url": {"url": "https://www.notion.so/page"}
        });
        let out = normalize_ingest_payload(payload, USER);
        assert_eq!(out["url"], "https://www.notion.so/page");
    }

    #[test]
    fn test_quotes_are_stripped() {
        let payload = json!({
            "username": "creator",
            "url": "\u{201C}https://example.com/brief\u{201D}'"
        });
        let out = normalize_ingest_payload(payload, USER);
        assert_eq!(out["url"], "https://example.com/brief");
    }

    #[test]
    fn test_missing_url_becomes_empty() {
        let out = normalize_ingest_payload(json!({}), USER);
        assert_eq!(out["username"], USER);
        assert_eq!(out["url"], "");
    }

    #[test]
    fn test_notion_string_without_https_becomes_empty() {
        let payload = json!({"username": "creator", "url": "acme.notion.site/brief"});
        let out = normalize_ingest_payload(payload, USER);
        assert_eq!(out["url"], "");
    }

    #[test]
    fn test_other_shapes_pass_through() {
        assert_eq!(normalize_ingest_payload(json!([1, 2]), USER), json!([1, 2]));
        assert_eq!(normalize_ingest_payload(Value::Null, USER), Value::Null);
    }

    #[test]
    fn test_extract_first_url_stops_at_delimiters() {
        assert_eq!(
            extract_first_url(r#"{"url": "https://a.notion.site/x"} https://b.io"#),
            "https://a.notion.site/x"
        );
        assert_eq!(extract_first_url("no links here"), "");
    }

    #[test]
    fn test_present_username_is_never_replaced() {
        let out = normalize_ingest_payload(json!({"username": null, "url": "https://x.io"}), USER);
        assert_eq!(out["username"], Value::Null);

        let out = normalize_ingest_payload(json!({"username": 42, "url": "https://x.io"}), USER);
        assert_eq!(out["username"], 42);
        assert_eq!(out["url"], "https://x.io");
    }
}
