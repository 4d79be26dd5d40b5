use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;
use validator::ValidationErrors;

/// Error payload returned by the backend on a rejected request.
///
/// A bare JSON string becomes [`ServerError::Message`]. An object whose values
/// are strings or string lists becomes [`ServerError::Fields`], `{"detail": "..."}`
/// included, with keys sorted alphabetically. Anything else is kept as `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerError {
    Message(String),
    Fields(BTreeMap<String, Vec<String>>),
    Other(Value),
}

impl ServerError {
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                let preview = String::from_utf8_lossy(body);
                let preview = if preview.len() > 200 {
                    format!("{}...", preview.chars().take(200).collect::<String>())
                } else {
                    preview.to_string()
                };

                warn!(
                    error_message = %e,
                    error_category = ?e.classify(),
                    response_body = %preview,
                    "Failed to parse error response body"
                );

                if preview.trim().is_empty() {
                    Self::Message("An unexpected error occurred. Please try again.".to_string())
                } else {
                    Self::Message(preview)
                }
            }
        }
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(message) => Self::Message(message),
            Value::Object(map) => {
                let mut fields = BTreeMap::new();
                for (field, messages) in &map {
                    match messages {
                        Value::String(message) => {
                            fields.insert(field.clone(), vec![message.clone()]);
                        }
                        Value::Array(items) if items.iter().all(Value::is_string) => {
                            fields.insert(field.clone(), items.iter().filter_map(|m| m.as_str().map(str::to_string)).collect());
                        }
                        _ => return Self::Other(Value::Object(map)),
                    }
                }
                Self::Fields(fields)
            }
            other => Self::Other(other),
        }
    }

    pub fn from_validation(errors: &ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::Fields(fields)
    }

    /// Single-line rendering: field errors become `field: a, b; other: c`.
    pub fn display_message(&self) -> String {
        match self {
            ServerError::Message(message) => message.clone(),
            ServerError::Fields(fields) => fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; "),
            ServerError::Other(value) => value.to_string(),
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_message())
    }
}

/// Returns the first usable message among `keys` of a JSON error body.
///
/// A key may hold a string or a list of strings (first element is used).
pub fn first_message(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match body.get(*key)? {
        Value::String(message) if !message.is_empty() => Some(message.clone()),
        Value::Array(items) => items.iter().find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    })
}

pub fn message_or(body: &[u8], keys: &[&str], fallback: &str) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| first_message(&value, keys))
        .unwrap_or_else(|| fallback.to_string())
}
