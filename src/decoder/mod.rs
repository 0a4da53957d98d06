//! Frame decoding.
//!
//! Each inbound stream message is one frame and decodes to at most one
//! renderable line. Structured shapes are preferred for richer formatting,
//! but arbitrary plain-text lines are always representable losslessly:
//! a frame that fails structured decode is silently treated as plain text,
//! not as an error.

use serde_json::Value;

/// Decode one wire frame into a renderable line.
///
/// Ordered attempts, first match wins:
///
/// 1. structured decode of the frame as JSON;
/// 2. an object with `error` and `stack` fields renders as
///    `"ERROR: <error>\n<stack>"`;
/// 3. an object with a `message` field uses that field verbatim;
/// 4. an object with a `log` field uses that field verbatim;
/// 5. any other successfully decoded JSON value is pretty-printed;
/// 6. anything else is the trimmed raw text; if trimming leaves nothing,
///    the frame is dropped (`None`).
pub fn decode_frame(raw: &str) -> Option<String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some(render_structured(&value)),
        Err(_) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}

/// Render a successfully decoded JSON value.
fn render_structured(value: &Value) -> String {
    if let Some(object) = value.as_object() {
        if let (Some(error), Some(stack)) = (object.get("error"), object.get("stack")) {
            return format!("ERROR: {}\n{}", field_text(error), field_text(stack));
        }
        if let Some(message) = object.get("message") {
            return field_text(message);
        }
        if let Some(log) = object.get("log") {
            return field_text(log);
        }
    }

    // Decoded but matched no known shape: pretty-print the whole value.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Field content as display text: strings verbatim, other values as JSON.
fn field_text(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}
