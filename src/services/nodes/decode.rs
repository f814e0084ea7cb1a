//! Typed decoding of generator responses.

use serde::de::DeserializeOwned;

use crate::domain::{DomainError, DomainResult};

/// Decode `raw` into `T`.
///
/// Accepts a bare JSON object, one wrapped in a Markdown code fence, or one
/// surrounded by prose. Anything else is a schema violation.
pub fn decode<T: DeserializeOwned>(raw: &str) -> DomainResult<T> {
    let body = strip_fence(raw.trim());
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(first) => {
            let embedded = match (body.find('{'), body.rfind('}')) {
                (Some(start), Some(end)) if start < end => &body[start..=end],
                _ => return Err(DomainError::SchemaViolation(first.to_string())),
            };
            serde_json::from_str(embedded).map_err(|e| DomainError::SchemaViolation(e.to_string()))
        }
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
