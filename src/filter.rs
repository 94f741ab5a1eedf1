//! Input collection module
//!
//! Expands directory arguments into job stdout files, optionally filtered by a
//! glob on the file name.

use glob::Pattern;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::error::{PbsReportError, Result};

/// Compiled file name filter
#[derive(Default)]
pub struct FileFilter {
    pattern: Option<Pattern>,
}

impl FileFilter {
    /// Create a new filter
    ///
    /// # Arguments
    /// * `pattern` - glob pattern (None matches every file)
    ///
    /// # Examples
    /// ```
    /// use pbsreport::filter::FileFilter;
    ///
    /// let filter = FileFilter::new(Some("*.o*".to_string())).unwrap();
    /// assert!(filter.matches("run.o1234567"));
    /// assert!(!filter.matches("run.sh"));
    /// ```
    pub fn new(pattern: Option<String>) -> Result<Self> {
        let compiled = match pattern {
            Some(ref p) => Some(
                Pattern::new(p)
                    .map_err(|_| PbsReportError::InvalidPattern { pattern: p.clone() })?,
            ),
            None => None,
        };

        Ok(Self { pattern: compiled })
    }

    /// Whether the file name passes the filter (always true without a pattern)
    pub fn matches(&self, file_name: &str) -> bool {
        match &self.pattern {
            Some(p) => p.matches(file_name),
            None => true,
        }
    }
}

/// Expand the command line paths into the list of files to process.
///
/// Order follows the arguments. Directories are walked in file name order and
/// contribute the regular files that pass `filter`; anything else, including
/// paths that do not exist, is passed through untouched so it can fail on its
/// own.
pub fn collect_inputs(
    paths: &[PathBuf],
    filter: &FileFilter,
    max_depth: Option<usize>,
) -> Vec<PathBuf> {
    let mut inputs = Vec::with_capacity(paths.len());

    for path in paths {
        if !path.is_dir() {
            inputs.push(path.clone());
            continue;
        }

        let walker = match max_depth {
            Some(depth) => WalkDir::new(path).max_depth(depth),
            None => WalkDir::new(path),
        };

        inputs.extend(
            walker
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .map(|name| filter.matches(name))
                        .unwrap_or(false)
                })
                .map(|e| e.into_path()),
        );
    }

    inputs
}
