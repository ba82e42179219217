//! Error types for mailprobe

use thiserror::Error;

/// Main error type for mailprobe
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("DNS error: {0}")]
    Dns(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("SMTP protocol error: {0}")]
    Protocol(String),

    #[error("Invalid email format: {0}")]
    Format(String),

    #[error("Rate limit exceeded for {domain}, retry after {retry_after_secs}s")]
    RateLimitExceeded { domain: String, retry_after_secs: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for mailprobe
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Storage(_) => "STORAGE_ERROR",
            Error::Dns(_) => "DNS_ERROR",
            Error::Network(_) => "NETWORK_ERROR",
            Error::Protocol(_) => "PROTOCOL_ERROR",
            Error::Format(_) => "FORMAT_ERROR",
            Error::RateLimitExceeded { .. } => "RATE_LIMITED",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Connection, timeout and resolver failures
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Dns(_))
    }

    /// Whether a queued caller should back off and retry later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimitExceeded { .. })
    }

    /// Seconds a caller should wait before retrying, when known
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::Format("x".into()).code(), "FORMAT_ERROR");
        assert_eq!(
            Error::RateLimitExceeded {
                domain: "example.com".into(),
                retry_after_secs: 60
            }
            .code(),
            "RATE_LIMITED"
        );
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = Error::RateLimitExceeded {
            domain: "example.com".into(),
            retry_after_secs: 120,
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(120));
        assert!(!Error::Network("reset".into()).is_retryable());
    }

    #[test]
    fn test_io_error_is_network() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out").into();
        assert!(err.is_network());
    }
}
