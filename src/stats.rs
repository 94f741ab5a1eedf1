//! Run statistics module
//!
//! Counts parsed and failed files and prints an optional summary.

use colored::Colorize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Run statistics
#[derive(Debug, Default)]
pub struct Statistics {
    /// Total input files
    pub total_files: usize,
    /// Files that produced a record
    pub parsed_count: AtomicUsize,
    /// Files reported as failed
    pub failed_count: AtomicUsize,
    /// Bytes of job stdout read
    pub total_bytes_read: AtomicU64,
    start_time: Option<Instant>,
}

impl Statistics {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn increment_parsed(&self) {
        self.parsed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_read(&self, bytes: u64) {
        self.total_bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get_parsed_count(&self) -> usize {
        self.parsed_count.load(Ordering::Relaxed)
    }

    pub fn get_failed_count(&self) -> usize {
        self.failed_count.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Print the run summary to stderr
    pub fn print_summary(&self) {
        let parsed = self.get_parsed_count();
        let failed = self.get_failed_count();
        let bytes_read = self.total_bytes_read.load(Ordering::Relaxed);

        eprintln!("{}", "═".repeat(50).bright_blue());
        eprintln!("{}", " PBS job report summary".bright_white().bold());
        eprintln!("{}", "═".repeat(50).bright_blue());

        eprintln!("  files:        {}", self.total_files);
        eprintln!("  parsed:       {}", parsed.to_string().green());

        if failed > 0 {
            eprintln!("  failed:       {}", failed.to_string().red());
        } else {
            eprintln!("  failed:       {}", "0".green());
        }

        eprintln!("  read:         {}", format_bytes(bytes_read));

        if self.total_files > 0 {
            let parse_rate = (parsed as f64 / self.total_files as f64) * 100.0;
            eprintln!("  parse rate:   {:.1}%", parse_rate);
        }

        eprintln!("  elapsed:      {}", format_duration(self.elapsed()));
        eprintln!("{}", "═".repeat(50).bright_blue());
    }
}

/// Human readable byte count
///
/// # Examples
/// ```
/// use pbsreport::stats::format_bytes;
///
/// assert_eq!(format_bytes(500), "500 B");
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(1048576), "1.00 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Human readable elapsed time
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 3600 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
