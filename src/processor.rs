//! Job stdout file processing module
//!
//! Reads one file, finds its resource usage block, builds the record and
//! renders the requested fields.

use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{PbsReportError, Result};
use crate::output::RowFormat;
use crate::pattern::{available_fields, RawCaptures, UsagePattern};
use crate::record::JobUsageRecord;

/// File processing result
#[derive(Debug)]
pub struct ProcessResult {
    /// Processed file path
    pub path: PathBuf,
    /// Rendered output line (on success)
    pub line: Option<String>,
    /// Error message (on failure)
    pub error: Option<String>,
    /// Size of the file as read
    pub file_size: u64,
}

impl ProcessResult {
    /// Successful result
    pub fn success(path: PathBuf, line: String, file_size: u64) -> Self {
        Self {
            path,
            line: Some(line),
            error: None,
            file_size,
        }
    }

    /// Failed result
    pub fn failure(path: PathBuf, error: String, file_size: u64) -> Self {
        Self {
            path,
            line: None,
            error: Some(error),
            file_size,
        }
    }

    pub fn is_success(&self) -> bool {
        self.line.is_some()
    }
}

/// Processing options
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Fields to output, in order
    pub keys: Vec<String>,
    /// Row layout
    pub row: RowFormat,
    /// Files at least this large are memory mapped
    pub mmap_threshold: u64,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessOptions {
    /// Default options: every available field, plain CSV
    pub fn new() -> Self {
        Self {
            keys: available_fields(),
            row: RowFormat::default(),
            mmap_threshold: 10 * 1024 * 1024, // 10MB
        }
    }

    /// Set output fields (`None` keeps the defaults)
    pub fn with_keys(mut self, keys: Option<Vec<String>>) -> Self {
        if let Some(keys) = keys {
            self.keys = keys;
        }
        self
    }

    /// Set row layout
    pub fn with_row_format(mut self, row: RowFormat) -> Self {
        self.row = row;
        self
    }

    /// Set memory mapping threshold
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }
}

/// Process a single job stdout file
///
/// Never fails: errors are carried in the returned `ProcessResult`.
///
/// # Arguments
/// * `path` - job stdout file
/// * `options` - processing options
pub fn process_file(path: PathBuf, options: &ProcessOptions) -> ProcessResult {
    let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    match parse_file_with(&path, file_size, options.mmap_threshold) {
        Ok(record) => {
            let line = options.row.row(&record, &options.keys);
            ProcessResult::success(path, line, file_size)
        }
        Err(e) => ProcessResult::failure(path, e.to_string(), file_size),
    }
}

/// Read `path` and build its usage record
pub fn parse_file(path: &Path) -> Result<JobUsageRecord> {
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    parse_file_with(path, file_size, ProcessOptions::new().mmap_threshold)
}

fn parse_file_with(path: &Path, file_size: u64, mmap_threshold: u64) -> Result<JobUsageRecord> {
    // The file is released before the record is built.
    let captures = if file_size >= mmap_threshold {
        let mmap = map_file(path)?;
        find_usage_block(path, &mmap)?
    } else {
        let bytes = read_whole(path)?;
        find_usage_block(path, &bytes)?
    };

    JobUsageRecord::build(&captures, path)
}

/// Search file contents for the resource usage block
fn find_usage_block(path: &Path, bytes: &[u8]) -> Result<RawCaptures> {
    let text = String::from_utf8_lossy(bytes);
    UsagePattern::global()
        .captures(&text)
        .ok_or_else(|| PbsReportError::UsageBlockNotFound {
            file: path.to_path_buf(),
        })
}

/// Whole-file read
fn read_whole(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| PbsReportError::FileOpenError {
        file: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Memory mapped read (large files)
fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).map_err(|e| PbsReportError::FileOpenError {
        file: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    unsafe {
        Mmap::map(&file).map_err(|e| PbsReportError::FileOpenError {
            file: path.to_path_buf(),
            reason: format!("memory map failed: {}", e),
        })
    }
}
