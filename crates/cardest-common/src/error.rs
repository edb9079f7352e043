//! Error taxonomy shared across cardest crates.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout cardest.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the graph codec, the estimators, and the trial
/// harness.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed line in a text graph file.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number of the offending line.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    /// The persisted summary artifact does not exist.
    #[error("summary not found: {0}")]
    SummaryNotFound(PathBuf),

    /// The persisted summary artifact exists but cannot be decoded.
    #[error("summary corrupt: {0}")]
    SummaryCorrupt(String),

    /// The binary graph file exists but cannot be decoded.
    #[error("binary graph corrupt: {0}")]
    GraphCorrupt(String),

    /// The algorithm cannot process this pattern shape.
    ///
    /// Distinct from a zero-match estimate: the estimator is declining
    /// to answer, not answering zero.
    #[error("unsupported query shape: {0}")]
    UnsupportedQueryShape(String),

    /// No estimator is registered under this method name.
    #[error("unknown estimator method: {0}")]
    UnknownMethod(String),

    /// `run` was invoked before a summary was loaded.
    #[error("no summary loaded for method {0}")]
    SummaryNotLoaded(&'static str),

    /// Every trial of a query was excluded (timeout, crash, or
    /// rejection); there is no aggregate to report.
    #[error("all {attempted} trials failed for {query}: {detail}")]
    AllTrialsFailed {
        /// Query identifier (path) the trials ran against.
        query: String,
        /// Number of trials attempted.
        attempted: usize,
        /// Per-outcome breakdown for the error stream.
        detail: String,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse() {
        let err = Error::Parse {
            line: 12,
            message: "expected 4 fields".to_string(),
        };
        assert_eq!(err.to_string(), "parse error at line 12: expected 4 fields");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
