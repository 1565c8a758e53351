//! # Error Types
//!
//! Custom error types for Flight Scorer using `thiserror`.

use thiserror::Error;

/// Main error type for Flight Scorer
#[derive(Debug, Error)]
pub enum ScorerError {
    /// The simulator refused the connection (not running yet)
    #[error("Simulator host not running at {0}")]
    HostUnavailable(String),

    /// Any other failure while opening or talking to the host
    #[error("Host connection error: {0}")]
    Connection(String),

    /// Framing errors on the host link
    #[error("Link protocol error: {0}")]
    LinkProtocol(String),

    /// A telemetry record did not match the data definition
    #[error("Sample decode error: {0}")]
    Decode(String),

    /// A decoded sample carried values the flight monitor cannot use
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScorerError {
    /// Whether this error means "the simulator is not running yet".
    ///
    /// These failures are retried quietly and reported only once.
    pub fn is_host_unavailable(&self) -> bool {
        matches!(self, ScorerError::HostUnavailable(_))
    }
}

/// Result type alias for Flight Scorer
pub type Result<T> = std::result::Result<T, ScorerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_unavailable_classification() {
        assert!(ScorerError::HostUnavailable("127.0.0.1:5557".into()).is_host_unavailable());
        assert!(!ScorerError::Connection("reset".into()).is_host_unavailable());
    }

    #[test]
    fn test_display_includes_address() {
        let err = ScorerError::HostUnavailable("127.0.0.1:5557".into());
        assert_eq!(err.to_string(), "Simulator host not running at 127.0.0.1:5557");
    }
}
