use thiserror::Error;
use validator::ValidationErrors;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    /// The request never produced an HTTP response (connection refused, timeout, DNS, ...).
    #[error("Network error. Please try again.")]
    Network { message: String },
    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),
    #[error("Not logged in")]
    Unauthorized,
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
    #[error("Session storage error")]
    Storage {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Request cancelled")]
    Cancelled,
    #[error("Operation already in progress")]
    InProgress,
    #[error("Internal error")]
    ConfigurationError {
        message: String,
        #[source]
        source: figment::Error,
    },
    #[error("Internal error")]
    HttpClient {
        message: String,
        #[source]
        source: reqwest::Error,
    },
}

impl AppError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            message: message.into(),
            source,
        }
    }

    /// Network failures and server-side errors can reasonably be retried by the user.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network { .. } => true,
            AppError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Message suitable for an inline error banner.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(errors) => first_validation_message(errors).unwrap_or_else(|| self.to_string()),
            AppError::Json { .. } => "Received an unexpected response from the server".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// First message of a set of validation errors, taking fields in name order so the
/// result is stable.
pub fn first_validation_message(errors: &ValidationErrors) -> Option<String> {
    let mut fields: Vec<(String, Vec<String>)> = errors
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
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields.into_iter().flat_map(|(_, messages)| messages).next()
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::ConfigurationError {
            message: "Failed to read configuration".to_string(),
            source: e,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::json("Failed to process JSON", e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::storage("Session storage I/O failed", e)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            AppError::HttpClient {
                message: "Failed to build HTTP request".to_string(),
                source: e,
            }
        } else {
            AppError::network(e.to_string())
        }
    }
}
