//! Error types for the reward monitor

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the reward monitor
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(String),

    // Input data errors
    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Invalid analysis window: {0} hours")]
    InvalidWindow(f64),

    // Ingestion errors
    #[error("Transfer source {source_name} timed out after {timeout_ms}ms")]
    SourceTimeout { source_name: String, timeout_ms: u64 },

    #[error("All transfer sources failed: {0}")]
    SourceExhausted(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error comes from bad input data rather than misuse
    pub fn is_data_quality(&self) -> bool {
        matches!(self, Error::InvalidAddress { .. } | Error::Deserialization(_))
    }

    /// Check if a fallback source may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::SourceTimeout { .. } | Error::Io(_) | Error::Deserialization(_)
        )
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Serialization(e.to_string())
        }
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::InvalidRegex(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_quality_classification() {
        let err = Error::InvalidAddress {
            input: "0x12".into(),
            reason: "too short".into(),
        };
        assert!(err.is_data_quality());
        assert!(!Error::InvalidWindow(-1.0).is_data_quality());
    }

    #[test]
    fn test_serde_error_maps_to_deserialization() {
        let err: Error = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, Error::Deserialization(_)));
        assert!(err.is_retryable());
    }
}
