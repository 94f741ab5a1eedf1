//! Error types
//!
//! Every per-file failure pbsreport can report is one of these.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a job stdout file into a usage record
#[derive(Error, Debug)]
pub enum PbsReportError {
    /// File missing or unreadable
    #[error("cannot open file ({file}): {reason}")]
    FileOpenError { file: PathBuf, reason: String },

    /// No resource usage block anywhere in the file
    #[error("no resource usage block found in {file}")]
    UsageBlockNotFound { file: PathBuf },

    /// A required capture was absent from the match
    #[error("missing field in resource usage block: {field}")]
    MissingCapture { field: String },

    /// Duration not of the form H:MM:SS
    #[error("malformed duration: {value:?}")]
    MalformedDuration { value: String },

    /// Numeric field did not parse
    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    /// Utilisation undefined for zero cpus or zero walltime
    #[error("cannot compute cpu utilisation (ncpus_used={ncpus_used}, walltime_used_secs={walltime_used_secs})")]
    DivisionByZero {
        ncpus_used: u64,
        walltime_used_secs: u64,
    },

    /// Invalid file name glob
    #[error("invalid pattern: {pattern}")]
    InvalidPattern { pattern: String },
}

/// pbsreport result alias
pub type Result<T> = std::result::Result<T, PbsReportError>;
