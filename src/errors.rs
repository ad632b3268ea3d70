//! Error types for GeminiBuddy
//!
//! One taxonomy for every scenario: configuration problems are fatal and
//! raised before any remote work, provider and parse failures are handled
//! per call, lookups that miss are reported to the user.

use thiserror::Error;

/// Main error type for the GeminiBuddy crate
#[derive(Error, Debug)]
pub enum BuddyError {
    /// Missing credential, invalid config file or value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Remote embedding or generation call failed
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Model output could not be interpreted
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Record lookup missed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already present
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Vectors that cannot be compared (zero norm, dimension mismatch)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML store errors
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Error: {0}")]
    Generic(String),
}

impl BuddyError {
    /// Whether the process should stop rather than degrade and continue
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BuddyError::ConfigError(_) | BuddyError::InvalidData(_) | BuddyError::YamlError(_)
        )
    }

    /// Whether the error is an expected, user-facing lookup outcome
    pub fn is_user_facing(&self) -> bool {
        matches!(self, BuddyError::NotFound(_) | BuddyError::AlreadyExists(_))
    }
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, BuddyError>;

/// Convert anyhow errors to BuddyError
impl From<anyhow::Error> for BuddyError {
    fn from(err: anyhow::Error) -> Self {
        BuddyError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BuddyError::AlreadyExists("vehicle ABC123".to_string());
        assert!(err.to_string().contains("ABC123"));
        assert!(err.to_string().starts_with("Already exists"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(BuddyError::ConfigError("GEMINI_API_KEY".into()).is_fatal());
        assert!(BuddyError::InvalidData("zero norm".into()).is_fatal());
        assert!(!BuddyError::ProviderError("timeout".into()).is_fatal());
        assert!(!BuddyError::ParseError("no digits".into()).is_fatal());
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(BuddyError::NotFound("XYZ789".into()).is_user_facing());
        assert!(BuddyError::AlreadyExists("XYZ789".into()).is_user_facing());
        assert!(!BuddyError::Generic("boom".into()).is_user_facing());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "faq.txt");
        let err: BuddyError = io.into();
        assert!(matches!(err, BuddyError::IoError(_)));
    }
}
