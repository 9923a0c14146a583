//! Message extraction and log formatting.

use chrono::Utc;

use crate::failure::payload::{sanitize_object, Payload};
use crate::failure::raw::RawFailure;

const UNKNOWN_MESSAGE: &str = "Unknown error occurred";

/// Best displayable message for a failure.
///
/// Prefers the failure's own message, then a nested `error.message`, then the
/// status text, then a sanitized rendering of whatever body is attached.
pub fn extract_error_message(failure: &RawFailure) -> String {
    let text = match failure {
        RawFailure::Message(s) => s.clone(),
        RawFailure::Network(n) => n.message.clone(),
        RawFailure::Runtime(r) => r.message.clone(),
        RawFailure::Wrapped { message, original } => message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| extract_error_message(original)),
        RawFailure::Http(h) => h
            .message
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| h.body.as_ref().and_then(|b| b.text_field("message")))
            .or_else(|| Some(h.status_text.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| h.body.as_ref().map(sanitize_object).unwrap_or_default()),
        RawFailure::Opaque(p) => payload_message(p),
    };

    if text.is_empty() {
        UNKNOWN_MESSAGE.to_string()
    } else {
        text
    }
}

fn payload_message(p: &Payload) -> String {
    if let Payload::Text(s) = p {
        return s.clone();
    }
    p.text_field("message")
        .or_else(|| p.get("error").and_then(|e| e.text_field("message")))
        .or_else(|| p.text_field("statusText"))
        .unwrap_or_else(|| sanitize_object(p))
}

/// `"<rfc3339 now> [context] text"`.
pub fn format_error_for_logging(text: &str, context: Option<&str>) -> String {
    let timestamp = Utc::now().to_rfc3339();
    match context {
        Some(ctx) => format!("{} [{}] {}", timestamp, ctx, text),
        None => format!("{} {}", timestamp, text),
    }
}
