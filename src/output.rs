//! Row rendering
//!
//! Turns records into CSV or JSONL lines.

use clap::ValueEnum;
use serde_json::{Map, Value};

use crate::record::{JobUsageRecord, PLACEHOLDER};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Delimited values, one header line
    #[default]
    Csv,
    /// One JSON object per line, no header
    Jsonl,
}

/// How rows are written
#[derive(Debug, Clone)]
pub struct RowFormat {
    pub format: OutputFormat,
    pub delimiter: String,
    /// Quote values containing the delimiter, a quote or a line break
    pub quote: bool,
}

impl Default for RowFormat {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            delimiter: ",".to_string(),
            quote: false,
        }
    }
}

impl RowFormat {
    /// Header line for `keys`, `None` for formats without one
    pub fn header<S: AsRef<str>>(&self, keys: &[S]) -> Option<String> {
        match self.format {
            OutputFormat::Csv => Some(self.join(keys.iter().map(|k| k.as_ref()))),
            OutputFormat::Jsonl => None,
        }
    }

    /// One output line for `record`
    pub fn row<S: AsRef<str>>(&self, record: &JobUsageRecord, keys: &[S]) -> String {
        let values = record.values(keys, PLACEHOLDER);
        match self.format {
            OutputFormat::Csv => self.join(values.iter().map(String::as_str)),
            OutputFormat::Jsonl => {
                let object: Map<String, Value> = keys
                    .iter()
                    .map(|k| k.as_ref().to_string())
                    .zip(values.into_iter().map(Value::String))
                    .collect();
                Value::Object(object).to_string()
            }
        }
    }

    fn join<'a>(&self, values: impl Iterator<Item = &'a str>) -> String {
        values
            .map(|v| self.escape(v))
            .collect::<Vec<_>>()
            .join(self.delimiter.as_str())
    }

    fn escape(&self, value: &str) -> String {
        let needs_quotes = self.quote
            && (value.contains(self.delimiter.as_str())
                || value.contains('"')
                || value.contains('\n')
                || value.contains('\r'));

        if needs_quotes {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(project: &str) -> JobUsageRecord {
        JobUsageRecord {
            timestamp: "2024-01-02T03:04:05".to_string(),
            job_id: "42.pbs".to_string(),
            project: project.to_string(),
            exit_status: "0".to_string(),
            signal: None,
            service_units: "1.50".to_string(),
            ncpus_requested: "2".to_string(),
            ncpus_used: "2".to_string(),
            cpu_used: "00:30:00".to_string(),
            memory_requested: "4gb".to_string(),
            memory_used: "1gb".to_string(),
            vmem_used: None,
            walltime_requested: "02:00:00".to_string(),
            walltime_used: "01:00:00".to_string(),
            jobfs_requested: "100mb".to_string(),
            jobfs_used: "0b".to_string(),
            path: PathBuf::from("job.o42"),
            stdout_size: 10,
            cpu_used_secs: 1800,
            walltime_requested_secs: 7200,
            walltime_used_secs: 3600,
            cpu_utilisation: 25.0,
        }
    }

    #[test]
    fn test_csv_row_and_header() {
        let format = RowFormat::default();
        let keys = ["job_id", "cpu_utilisation", "bogus", "signal"];
        assert_eq!(
            format.header(&keys).as_deref(),
            Some("job_id,cpu_utilisation,bogus,signal")
        );
        assert_eq!(format.row(&record("ab12"), &keys), "42.pbs,25.0,?,");
    }

    #[test]
    fn test_csv_unquoted_by_default() {
        let format = RowFormat::default();
        assert_eq!(format.row(&record("a,b"), &["project", "job_id"]), "a,b,42.pbs");
    }

    #[test]
    fn test_csv_quoting() {
        let format = RowFormat {
            quote: true,
            ..Default::default()
        };
        assert_eq!(
            format.row(&record("a,\"b\""), &["project", "job_id"]),
            "\"a,\"\"b\"\"\",42.pbs"
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let format = RowFormat {
            delimiter: "\t".to_string(),
            ..Default::default()
        };
        assert_eq!(format.row(&record("ab12"), &["project", "job_id"]), "ab12\t42.pbs");
    }

    #[test]
    fn test_jsonl_row() {
        let format = RowFormat {
            format: OutputFormat::Jsonl,
            ..Default::default()
        };
        assert!(format.header(&["job_id"]).is_none());
        assert_eq!(
            format.row(&record("ab12"), &["project", "job_id", "bogus"]),
            r#"{"project":"ab12","job_id":"42.pbs","bogus":"?"}"#
        );
    }
}
