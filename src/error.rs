//! Error types for the retrieval layer
//!
//! "No data" outcomes are never errors: they surface as empty maps, empty
//! series or `None`. The variants here cover caller misuse (terminal for the
//! call) and failures reported by the backend services.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied an argument the call cannot proceed with
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Backend service failure (transport, query execution, broken contract)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }

    /// Whether this error is terminal caller misuse rather than a failure
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

/// Scaling descriptor errors
///
/// Every message lists the accepted values so the caller can correct the
/// request without consulting documentation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScalingError {
    /// Unknown reduction algorithm
    #[error("unknown scale algorithm '{0}', expected one of: MAX, MIN, AVG, COUNT, SUM, REPEAT, INTERPOLATE")]
    UnknownAlgorithm(String),

    /// Unknown interval unit
    #[error("unknown scale interval '{0}', expected one of: SECOND, MINUTE, HOUR, DAY, WEEK, MONTH, YEAR")]
    UnknownInterval(String),

    /// Interval size is not a positive integer
    #[error("invalid scale size '{0}', expected a positive integer")]
    InvalidSize(String),
}

impl From<ScalingError> for Error {
    fn from(e: ScalingError) -> Self {
        Error::InvalidArgument(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_is_distinguishable() {
        let err = Error::invalid_argument("no valid beam modes found");
        assert!(err.is_invalid_argument());
        assert!(!Error::backend("timeout").is_invalid_argument());
    }

    #[test]
    fn test_scaling_error_lists_valid_values() {
        let err: Error = ScalingError::UnknownAlgorithm("MEDIAN".to_string()).into();
        let msg = err.to_string();
        assert!(msg.contains("MEDIAN"));
        assert!(msg.contains("INTERPOLATE"));
        assert!(err.is_invalid_argument());
    }
}
