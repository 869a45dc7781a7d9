//! Error types for Kino Telemetry

use thiserror::Error;

/// Result type alias for telemetry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Telemetry error types
///
/// None of these ever reach the playback path: the tracker degrades
/// gracefully and the dispatch queue logs and drops failed deliveries.
#[derive(Error, Debug)]
pub enum Error {
    // Delivery errors
    #[cfg(feature = "http")]
    #[error("Failed to deliver event: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Collector rejected event: HTTP {status}")]
    CollectorStatus { status: u16 },

    #[error("Dispatch queue is closed")]
    QueueClosed,

    // Encoding errors
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logging already initialized")]
    LoggingInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Returns true if a later delivery attempt could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Error::Transport(e) => e.is_timeout() || e.is_connect(),
            Error::CollectorStatus { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns the error code used in log records
    pub fn error_code(&self) -> &'static str {
        match self {
            #[cfg(feature = "http")]
            Error::Transport(_) => "TRANSPORT",
            Error::CollectorStatus { .. } => "COLLECTOR_STATUS",
            Error::QueueClosed => "QUEUE_CLOSED",
            Error::Serialize(_) => "SERIALIZE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::LoggingInitialized => "LOGGING_INIT",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_status_recoverable() {
        assert!(Error::CollectorStatus { status: 503 }.is_recoverable());
        assert!(Error::CollectorStatus { status: 429 }.is_recoverable());
        assert!(!Error::CollectorStatus { status: 400 }.is_recoverable());
        assert!(!Error::QueueClosed.is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::config("capacity").error_code(), "INVALID_CONFIG");
        assert_eq!(Error::QueueClosed.error_code(), "QUEUE_CLOSED");
    }
}
