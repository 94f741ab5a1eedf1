//! pbsreport - PBS JOB REPORTER
//!
//! Extracts the resource usage block PBS appends to a job's stdout file and
//! renders it as delimited text for reporting.
//!
//! # Pipeline
//!
//! - **pattern**: finds the first "Resource Usage on ..." block in a file and
//!   captures its named fields
//! - **record**: normalises the timestamp, converts durations to seconds and
//!   computes cpu utilisation
//! - **output**: renders the requested fields as CSV or JSONL
//! - **processor**: per-file read/match/build/render, failures as values
//! - **filter**: expands directory arguments into input files
//!
//! # Example
//!
//! ```bash
//! # every field, one line per job
//! pbsreport job.o1234567 job.o1234568
//!
//! # selected fields from every stdout file under ./runs
//! pbsreport -k job_id,cpu_utilisation ./runs --pattern '*.o*'
//! ```

pub mod cli;
pub mod error;
pub mod filter;
pub mod output;
pub mod pattern;
pub mod processor;
pub mod record;
pub mod stats;

// Re-exports for convenient access
pub use cli::Args;
pub use error::{PbsReportError, Result};
pub use filter::{collect_inputs, FileFilter};
pub use output::{OutputFormat, RowFormat};
pub use pattern::{available_fields, RawCaptures, UsagePattern};
pub use processor::{parse_file, process_file, ProcessOptions, ProcessResult};
pub use record::{JobUsageRecord, PLACEHOLDER};
pub use stats::{format_bytes, Statistics};
