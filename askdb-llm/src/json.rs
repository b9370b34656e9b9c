use askdb_core::{AskDbError, Value};

/// Parses model output as a JSON value, tolerating a surrounding markdown
/// code fence (```json ... ```).
pub fn parse_json_content(content: &str) -> Result<Value, AskDbError> {
    let body = strip_fence(content.trim());
    serde_json::from_str(body).map_err(|err| AskDbError::ParseFailed {
        output: content.to_string(),
        reason: err.to_string(),
    })
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
