//! Job usage record module
//!
//! Turns the raw captures of one resource usage block into a finished record:
//! canonical timestamp, durations in seconds, and cpu utilisation.

use std::path::{Path, PathBuf};

use crate::error::{PbsReportError, Result};
use crate::pattern::RawCaptures;

/// Value returned for keys a record does not know
pub const PLACEHOLDER: &str = "?";

/// One parsed job stdout file
#[derive(Debug, Clone, PartialEq)]
pub struct JobUsageRecord {
    pub timestamp: String,
    pub job_id: String,
    pub project: String,
    pub exit_status: String,
    pub signal: Option<String>,
    pub service_units: String,
    pub ncpus_requested: String,
    pub ncpus_used: String,
    pub cpu_used: String,
    pub memory_requested: String,
    pub memory_used: String,
    pub vmem_used: Option<String>,
    pub walltime_requested: String,
    pub walltime_used: String,
    pub jobfs_requested: String,
    pub jobfs_used: String,
    /// Path the record was read from
    pub path: PathBuf,
    /// Size of the stdout file in bytes
    pub stdout_size: u64,
    pub cpu_used_secs: u64,
    pub walltime_requested_secs: u64,
    pub walltime_used_secs: u64,
    /// Percentage of allocated cpu time consumed, two decimal places
    pub cpu_utilisation: f64,
}

impl JobUsageRecord {
    /// Build a record from the captures of the block found in `path`.
    ///
    /// `stdout_size` is measured here, not taken from the read that produced
    /// the captures.
    ///
    /// # Errors
    /// Missing captures, malformed durations or counts, zero cpus or zero
    /// walltime, and an unreadable `path` are all reported, never panicked on.
    pub fn build(captures: &RawCaptures, path: &Path) -> Result<Self> {
        let stdout_size = std::fs::metadata(path)
            .map(|m| m.len())
            .map_err(|e| PbsReportError::FileOpenError {
                file: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let timestamp = normalize_timestamp(captures.get("timestamp"))?;

        let cpu_used = captures.require("cpu_used")?;
        let walltime_requested = captures.require("walltime_requested")?;
        let walltime_used = captures.require("walltime_used")?;
        let ncpus_used = captures.require("ncpus_used")?;

        let cpu_used_secs = duration_to_seconds(cpu_used)?;
        let walltime_requested_secs = duration_to_seconds(walltime_requested)?;
        let walltime_used_secs = duration_to_seconds(walltime_used)?;
        let ncpus = parse_count("ncpus_used", ncpus_used)?;
        let cpu_utilisation = cpu_utilisation(cpu_used_secs, ncpus, walltime_used_secs)?;

        let owned = |field: &str| captures.require(field).map(str::to_string);

        Ok(Self {
            timestamp,
            job_id: owned("job_id")?,
            project: owned("project")?,
            exit_status: owned("exit_status")?,
            signal: captures.get("signal").map(str::to_string),
            service_units: owned("service_units")?,
            ncpus_requested: owned("ncpus_requested")?,
            ncpus_used: ncpus_used.to_string(),
            cpu_used: cpu_used.to_string(),
            memory_requested: owned("memory_requested")?,
            memory_used: owned("memory_used")?,
            vmem_used: captures.get("vmem_used").map(str::to_string),
            walltime_requested: walltime_requested.to_string(),
            walltime_used: walltime_used.to_string(),
            jobfs_requested: owned("jobfs_requested")?,
            jobfs_used: owned("jobfs_used")?,
            path: path.to_path_buf(),
            stdout_size,
            cpu_used_secs,
            walltime_requested_secs,
            walltime_used_secs,
            cpu_utilisation,
        })
    }

    /// Stringified value of `key`, `None` for keys the record does not have.
    ///
    /// Optional fields absent from the block are known keys with an empty value.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "timestamp" => self.timestamp.clone(),
            "job_id" => self.job_id.clone(),
            "project" => self.project.clone(),
            "exit_status" => self.exit_status.clone(),
            "signal" => self.signal.clone().unwrap_or_default(),
            "service_units" => self.service_units.clone(),
            "ncpus_requested" => self.ncpus_requested.clone(),
            "ncpus_used" => self.ncpus_used.clone(),
            "cpu_used" => self.cpu_used.clone(),
            "memory_requested" => self.memory_requested.clone(),
            "memory_used" => self.memory_used.clone(),
            "vmem_used" => self.vmem_used.clone().unwrap_or_default(),
            "walltime_requested" => self.walltime_requested.clone(),
            "walltime_used" => self.walltime_used.clone(),
            "jobfs_requested" => self.jobfs_requested.clone(),
            "jobfs_used" => self.jobfs_used.clone(),
            "path" => self.path.display().to_string(),
            "stdout_size" => self.stdout_size.to_string(),
            "cpu_used_secs" => self.cpu_used_secs.to_string(),
            "walltime_requested_secs" => self.walltime_requested_secs.to_string(),
            "walltime_used_secs" => self.walltime_used_secs.to_string(),
            "cpu_utilisation" => format_utilisation(self.cpu_utilisation),
            _ => return None,
        };
        Some(value)
    }

    /// Values for `keys` in the order given, `placeholder` for unknown keys
    pub fn values<S: AsRef<str>>(&self, keys: &[S], placeholder: &str) -> Vec<String> {
        keys.iter()
            .map(|k| {
                self.get(k.as_ref())
                    .unwrap_or_else(|| placeholder.to_string())
            })
            .collect()
    }
}

/// Canonicalise a block timestamp to `YYYY-MM-DDTHH:MM:SS`
///
/// # Examples
/// ```
/// use pbsreport::record::normalize_timestamp;
///
/// assert_eq!(
///     normalize_timestamp(Some("2024-01-02 03:04:05")).unwrap(),
///     "2024-01-02T03:04:05"
/// );
/// assert!(normalize_timestamp(None).is_err());
/// ```
pub fn normalize_timestamp(raw: Option<&str>) -> Result<String> {
    let raw = raw.ok_or_else(|| PbsReportError::MissingCapture {
        field: "timestamp".to_string(),
    })?;
    Ok(raw.trim().replace(char::is_whitespace, "T"))
}

/// Convert a PBS `H:MM:SS` duration to seconds; the hour part may be any width.
///
/// # Examples
/// ```
/// use pbsreport::record::duration_to_seconds;
///
/// assert_eq!(duration_to_seconds("01:02:03").unwrap(), 3723);
/// assert_eq!(duration_to_seconds("100:00:00").unwrap(), 360000);
/// ```
pub fn duration_to_seconds(raw: &str) -> Result<u64> {
    let malformed = || PbsReportError::MalformedDuration {
        value: raw.to_string(),
    };

    let fields: Vec<u64> = raw
        .split(':')
        .map(|f| f.parse::<u64>().map_err(|_| malformed()))
        .collect::<Result<_>>()?;

    match fields.as_slice() {
        [hours, minutes, seconds] => hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
            .and_then(|hm| hm.checked_add(*seconds))
            .ok_or_else(malformed),
        _ => Err(malformed()),
    }
}

/// Percentage of allocated cpu time (`ncpus * walltime`) actually used,
/// rounded to two decimal places.
///
/// # Errors
/// `DivisionByZero` when `ncpus` or `walltime_secs` is zero
pub fn cpu_utilisation(cpu_secs: u64, ncpus: u64, walltime_secs: u64) -> Result<f64> {
    if ncpus == 0 || walltime_secs == 0 {
        return Err(PbsReportError::DivisionByZero {
            ncpus_used: ncpus,
            walltime_used_secs: walltime_secs,
        });
    }
    let ratio = cpu_secs as f64 * 100.0 / (ncpus as f64 * walltime_secs as f64);
    // Fixed precision formatting rounds the exact binary value, ties to even.
    Ok(format!("{:.2}", ratio).parse().unwrap_or(ratio))
}

/// Render a utilisation with at least one fractional digit (`25.0`, `12.35`)
pub fn format_utilisation(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn parse_count(field: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| PbsReportError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn captures(ncpus_used: &str, cpu_used: &str, walltime_used: &str) -> RawCaptures {
        [
            ("timestamp", "2024-01-02 03:04:05"),
            ("job_id", "42.pbs"),
            ("project", "ab12"),
            ("exit_status", "0"),
            ("service_units", "1.50"),
            ("ncpus_requested", "2"),
            ("ncpus_used", ncpus_used),
            ("cpu_used", cpu_used),
            ("memory_requested", "4gb"),
            ("memory_used", "1gb"),
            ("walltime_requested", "02:00:00"),
            ("walltime_used", walltime_used),
            ("jobfs_requested", "100mb"),
            ("jobfs_used", "0b"),
        ]
        .into_iter()
        .collect()
    }

    fn stdout_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("job.o42");
        fs::write(&path, "0123456789").unwrap();
        path
    }

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(duration_to_seconds("00:00:00").unwrap(), 0);
        assert_eq!(duration_to_seconds("01:02:03").unwrap(), 3723);
        assert_eq!(duration_to_seconds("100:00:00").unwrap(), 360000);
    }

    #[test]
    fn test_duration_to_seconds_malformed() {
        for raw in ["", "01:02", "01:02:03:04", "aa:00:00", "1:-2:03"] {
            assert!(
                matches!(
                    duration_to_seconds(raw),
                    Err(PbsReportError::MalformedDuration { .. })
                ),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp(Some("2024-01-02 03:04:05")).unwrap(),
            "2024-01-02T03:04:05"
        );
        assert!(matches!(
            normalize_timestamp(None),
            Err(PbsReportError::MissingCapture { .. })
        ));
    }

    #[test]
    fn test_cpu_utilisation() {
        assert_eq!(cpu_utilisation(1800, 2, 3600).unwrap(), 25.0);
        assert_eq!(cpu_utilisation(1, 3, 1).unwrap(), 33.33);
        assert!(cpu_utilisation(10, 0, 10).is_err());
        assert!(cpu_utilisation(10, 1, 0).is_err());
    }

    #[test]
    fn test_cpu_utilisation_half_way_values() {
        // 0.125 is exact in binary and rounds to even
        assert_eq!(format_utilisation(cpu_utilisation(1, 8, 100).unwrap()), "0.12");
        // 2.675 is stored just below the half way point
        assert_eq!(format_utilisation(cpu_utilisation(2675, 1, 100000).unwrap()), "2.67");
        assert_eq!(format_utilisation(cpu_utilisation(3, 8, 100).unwrap()), "0.38");
    }

    #[test]
    fn test_format_utilisation() {
        assert_eq!(format_utilisation(25.0), "25.0");
        assert_eq!(format_utilisation(12.35), "12.35");
        assert_eq!(format_utilisation(0.0), "0.0");
    }

    #[test]
    fn test_build_record() {
        let dir = TempDir::new().unwrap();
        let path = stdout_file(&dir);
        let record =
            JobUsageRecord::build(&captures("2", "00:30:00", "01:00:00"), &path).unwrap();

        assert_eq!(record.timestamp, "2024-01-02T03:04:05");
        assert_eq!(record.stdout_size, 10);
        assert_eq!(record.cpu_used_secs, 1800);
        assert_eq!(record.walltime_requested_secs, 7200);
        assert_eq!(record.walltime_used_secs, 3600);
        assert_eq!(record.cpu_utilisation, 25.0);
        assert_eq!(record.get("cpu_utilisation").as_deref(), Some("25.0"));
        assert_eq!(record.get("cpu_used_secs").as_deref(), Some("1800"));
        assert_eq!(record.get("signal").as_deref(), Some(""));
        assert_eq!(record.get("vmem_used").as_deref(), Some(""));
    }

    #[test]
    fn test_build_record_zero_ncpus() {
        let dir = TempDir::new().unwrap();
        let path = stdout_file(&dir);
        let result = JobUsageRecord::build(&captures("0", "00:30:00", "01:00:00"), &path);
        assert!(matches!(result, Err(PbsReportError::DivisionByZero { .. })));
    }

    #[test]
    fn test_build_record_zero_walltime() {
        let dir = TempDir::new().unwrap();
        let path = stdout_file(&dir);
        let result = JobUsageRecord::build(&captures("2", "00:00:00", "00:00:00"), &path);
        assert!(matches!(result, Err(PbsReportError::DivisionByZero { .. })));
    }

    #[test]
    fn test_build_record_missing_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = stdout_file(&dir);
        let caps: RawCaptures = [("job_id", "1")].into_iter().collect();
        let result = JobUsageRecord::build(&caps, &path);
        assert!(matches!(result, Err(PbsReportError::MissingCapture { .. })));
    }

    #[test]
    fn test_build_record_unreadable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.o1");
        let result = JobUsageRecord::build(&captures("2", "00:30:00", "01:00:00"), &path);
        assert!(matches!(result, Err(PbsReportError::FileOpenError { .. })));
    }

    #[test]
    fn test_values_with_placeholder() {
        let dir = TempDir::new().unwrap();
        let path = stdout_file(&dir);
        let record =
            JobUsageRecord::build(&captures("2", "00:30:00", "01:00:00"), &path).unwrap();

        assert_eq!(
            record.values(&["nonexistent_key", "job_id"], PLACEHOLDER),
            vec!["?", "42.pbs"]
        );
        assert_eq!(record.values(&["project"], "-"), vec!["ab12"]);
    }
}
