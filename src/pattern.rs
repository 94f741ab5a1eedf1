//! Resource usage block matcher
//!
//! Recognises the multi-line "Resource Usage on ..." report PBS appends to a
//! job's stdout file and extracts its named fields.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{PbsReportError, Result};

/// Line-shaped fragments of a resource usage block, in the order PBS prints them.
///
/// Joined into a single case-insensitive, multi-line expression. Every named
/// group becomes a field of the block.
const BLOCK_LINES: &[&str] = &[
    r"^\s+Resource Usage on (?P<timestamp>\d{4}-\d\d-\d\d \d\d:\d\d:\d\d)(?:\.\d+)?:[ \t]*$",
    r"\s+Job\s*Id:\s*(?P<job_id>\S+)\s*$",
    r"\s+Project:\s*(?P<project>\S+)\s*$",
    r"\s+Exit Status:\s*(?P<exit_status>\d+)(?:\s+\(Linux Signal (?P<signal>\d+)\))?[ \t]*$",
    r"\s+Service Units:\s*(?P<service_units>\S+)[ \t]*$",
    r"\s+NCPUs Requested:\s*(?P<ncpus_requested>\d+)\s+NCPUs Used:\s*(?P<ncpus_used>\d+)\s*$",
    r"\s+CPU Time Used:\s*(?P<cpu_used>\d+:\d\d:\d\d)\s*$",
    r"\s+Memory Requested:\s*(?P<memory_requested>\S+)\s+Memory Used:\s*(?P<memory_used>\S+)\s*$",
    r"(?:\s+Vmem Used:\s*(?P<vmem_used>\S+)[ \t]*$)?",
    r"\s+Walltime requested:\s*(?P<walltime_requested>\d+:\d\d:\d\d)\s+Walltime Used:\s*(?P<walltime_used>\d+:\d\d:\d\d)\s*$",
    r"\s+JobFS request(?:ed)?:\s+(?P<jobfs_requested>\S+)\s+JobFS used:\s*(?P<jobfs_used>\S+)\s*$",
];

/// Fields computed from the captures, appended after the captured ones.
pub const DERIVED_FIELDS: [&str; 5] = [
    "path",
    "stdout_size",
    "cpu_utilisation",
    "walltime_requested_secs",
    "walltime_used_secs",
];

static USAGE_PATTERN: LazyLock<UsagePattern> = LazyLock::new(|| {
    let source = format!("(?imR){}", BLOCK_LINES.concat());
    UsagePattern {
        regex: Regex::new(&source).expect("resource usage pattern is valid"),
    }
});

/// Compiled resource usage block pattern
#[derive(Debug)]
pub struct UsagePattern {
    regex: Regex,
}

impl UsagePattern {
    /// The process-wide compiled pattern
    pub fn global() -> &'static UsagePattern {
        &USAGE_PATTERN
    }

    /// Names of the captured fields, in declaration order
    pub fn capture_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.regex.capture_names().flatten()
    }

    /// Search `text` for the first complete resource usage block.
    ///
    /// # Returns
    /// The raw captures, or `None` when no block is present
    pub fn captures(&self, text: &str) -> Option<RawCaptures> {
        let caps = self.regex.captures(text)?;
        let values = self
            .capture_names()
            .map(|name| {
                let value = caps.name(name).map(|m| m.as_str().to_string());
                (name.to_string(), value)
            })
            .collect();
        Some(RawCaptures { values })
    }
}

/// Every field a record can produce: captures first, then derived fields.
///
/// This is also the default key list for output.
///
/// # Examples
/// ```
/// use pbsreport::pattern::available_fields;
///
/// let fields = available_fields();
/// assert_eq!(fields.first().map(String::as_str), Some("timestamp"));
/// assert_eq!(fields.last().map(String::as_str), Some("walltime_used_secs"));
/// ```
pub fn available_fields() -> Vec<String> {
    UsagePattern::global()
        .capture_names()
        .chain(DERIVED_FIELDS)
        .map(str::to_string)
        .collect()
}

/// Field name to captured text for one matched block.
///
/// Optional groups that did not participate in the match hold `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCaptures {
    values: Vec<(String, Option<String>)>,
}

impl RawCaptures {
    /// Captured text for `field`, `None` if absent or unknown
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Captured text for a field the caller cannot do without
    pub fn require(&self, field: &str) -> Result<&str> {
        self.get(field).ok_or_else(|| PbsReportError::MissingCapture {
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
impl<K, V> FromIterator<(K, V)> for RawCaptures
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}
