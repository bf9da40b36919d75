//! Error types for pg-query-bench

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::Measurements;

/// Top-level application error
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Query failed: {0}")]
    Query(#[from] postgres::Error),

    #[error("Input error: {0}")]
    Source(#[from] SourceError),

    #[error("Results channel timed out after {}s without activity", .0.as_secs())]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        source: postgres::Error,
    },

    #[error("TLS setup failed: {0}")]
    TlsFailed(#[from] native_tls::Error),

    #[error("Ping query failed: {0}")]
    PingFailed(postgres::Error),
}

/// Errors raised while reading query parameters
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open parameter file {path}: {source}")]
    OpenFailed { path: String, source: io::Error },

    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
}

/// A run that ended before every worker reported completion, or whose
/// producer failed.
///
/// Whatever was measured up to that point is kept in `partial`.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct RunAborted {
    #[source]
    pub reason: BenchmarkError,
    pub partial: Measurements,
}

impl RunAborted {
    pub fn new(reason: BenchmarkError, partial: Measurements) -> Self {
        Self { reason, partial }
    }

    /// True if the run stopped on the inactivity timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self.reason, BenchmarkError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, BenchmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = BenchmarkError::Timeout(Duration::from_secs(10));
        assert_eq!(
            err.to_string(),
            "Results channel timed out after 10s without activity"
        );
    }

    #[test]
    fn test_run_aborted_keeps_partial_results() {
        let partial = Measurements::from(vec![Duration::from_nanos(7)]);
        let aborted = RunAborted::new(BenchmarkError::Timeout(Duration::from_secs(10)), partial);

        assert!(aborted.is_timeout());
        assert_eq!(aborted.partial.count(), 1);
        assert!(aborted.to_string().contains("timed out"));
    }

    #[test]
    fn test_config_error_is_not_timeout() {
        let aborted = RunAborted::new(
            BenchmarkError::Config("bad".to_string()),
            Measurements::default(),
        );
        assert!(!aborted.is_timeout());
    }
}
