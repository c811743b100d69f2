//! Error types for silver-anno.

use thiserror::Error;

/// Library-level error type for annotation operations.
#[derive(Error, Debug)]
pub enum AnnoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value in row {row}, column '{column}': {value}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Unrecognized scene label: {0}")]
    UnrecognizedLabel(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl AnnoError {
    /// Whether a failed remote call is worth repeating.
    ///
    /// Authentication failures and malformed requests will fail the same way
    /// on every attempt; rate limits, server errors and transport failures
    /// may not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnnoError::Api { status, .. } => !is_fatal_status(*status),
            AnnoError::Http(e) => !e.status().is_some_and(|s| is_fatal_status(s.as_u16())),
            AnnoError::Config(_)
            | AnnoError::MissingColumn(_)
            | AnnoError::InvalidValue { .. }
            | AnnoError::UnrecognizedLabel(_) => false,
            _ => true,
        }
    }
}

fn is_fatal_status(status: u16) -> bool {
    matches!(status, 400 | 401 | 403 | 404)
}

/// Result type alias for silver-anno operations.
pub type Result<T> = std::result::Result<T, AnnoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_fatal() {
        let err = AnnoError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rate_limits_are_retryable() {
        let err = AnnoError::Api {
            status: 429,
            message: "rate_limit_error".to_string(),
        };
        assert!(err.is_retryable());
        assert!(AnnoError::EmptyResponse.is_retryable());
    }
}
