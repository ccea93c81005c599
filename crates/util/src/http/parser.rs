//! # HTTP Response Helpers
//!
//! Helpers for turning record-store responses into JSON values and
//! user-facing error text.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters kept when previewing a response body.
pub const RESPONSE_PREVIEW_LIMIT: usize = 200;

/// Return a user-friendly hint for status codes staff commonly hit.
///
/// # Example
/// ```rust
/// use schoolhub_util::http::status_error_message;
///
/// let unauthorized = status_error_message(401).unwrap();
/// assert!(unauthorized.contains("SCHOOLHUB_API_TOKEN"));
///
/// let too_large = status_error_message(413).unwrap();
/// assert!(too_large.contains("attachment"));
///
/// assert!(status_error_message(404).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: set SCHOOLHUB_API_TOKEN=...".into()),
        403 => Some("Forbidden (403). Hint: this account may not create records".into()),
        413 => Some("Payload too large (413). Hint: an attachment exceeds the server limit".into()),
        _ => None,
    }
}

/// Parse HTTP response text into JSON, providing detailed errors on failure.
///
/// The error carries the originating status and a whitespace-collapsed
/// preview of the body so truncated or HTML error pages are still legible.
pub fn parse_response_json_strict(text: &str, status: Option<StatusCode>) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|error| {
        let status_note = status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string());
        let preview = truncate_response_preview(text, RESPONSE_PREVIEW_LIMIT);

        JsonParseError::new(status_note, error, preview)
    })
}

/// Collapse whitespace and cut the body to roughly `limit` characters.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for (count, ch) in text.chars().enumerate() {
        if count >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}

/// Error returned when strict JSON parsing of an HTTP response fails.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn new(status_note: String, source: serde_json::Error, body_preview: String) -> Self {
        Self {
            status_note,
            source,
            body_preview,
        }
    }

    /// Access the truncated response preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_parse_reports_status_and_preview() {
        let error = parse_response_json_strict("<html>\n<body>Bad gateway</body>\n</html>", Some(StatusCode::BAD_GATEWAY))
            .expect_err("html is not json");
        assert_eq!(error.body_preview(), "<html> <body>Bad gateway</body> </html>");
        assert!(error.to_string().contains("status 502"));
    }

    #[test]
    fn strict_parse_accepts_json() {
        let value = parse_response_json_strict(r#"{"id": "stu-1"}"#, None).expect("json");
        assert_eq!(value["id"], "stu-1");
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(500);
        let preview = truncate_response_preview(&body, 10);
        assert_eq!(preview, format!("{}...", "x".repeat(10)));
        assert_eq!(truncate_response_preview("   ", 10), "<empty>");
    }
}
