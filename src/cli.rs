//! Command line arguments
//!
//! clap derive definitions for the pbsreport binary.

use clap::Parser;
use std::path::PathBuf;

use crate::output::{OutputFormat, RowFormat};

/// pbsreport CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "pbsreport",
    author = "YourName <your@email.com>",
    version,
    about = "Collect resource usage from PBS job stdout files and print it as CSV",
    long_about = r#"
PBS JOB REPORTER
================

Scans PBS job stdout files for the "Resource Usage on ..." block PBS appends
at job end, and prints one delimited line per job.

Files without a usage block are reported on stderr as
"could not parse <path>" and skipped; the exit status stays 0.

Examples:
  pbsreport job.o1234567 job.o1234568
  pbsreport --keys-only
  pbsreport -k job_id,cpu_utilisation,walltime_used_secs ./runs --pattern '*.o*'
  pbsreport --no-keys --format jsonl ./runs
"#
)]
pub struct Args {
    /// Job stdout files, or directories to search for them
    pub paths: Vec<PathBuf>,

    /// Comma separated fields to output (default: every available field)
    #[arg(short, long)]
    pub keys: Option<String>,

    /// Print the field header and exit
    #[arg(long, alias = "keys_only")]
    pub keys_only: bool,

    /// Suppress the field header
    #[arg(long, alias = "no_keys")]
    pub no_keys: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// CSV delimiter
    #[arg(short, long, default_value = ",")]
    pub delimiter: String,

    /// Quote CSV values that contain the delimiter, quotes or line breaks
    #[arg(long)]
    pub quote: bool,

    /// File name filter for directory inputs (glob, e.g. "*.o*")
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Maximum directory search depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Worker threads (default: number of CPU cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Print the failure reason under each "could not parse" line
    #[arg(short, long)]
    pub verbose: bool,

    /// Show a progress bar on stderr
    #[arg(long)]
    pub progress: bool,

    /// Print run statistics to stderr
    #[arg(long)]
    pub summary: bool,

    /// Write failures and their reasons to this file
    #[arg(long)]
    pub log: Option<PathBuf>,
}

impl Args {
    /// Requested fields, trimmed, empty entries dropped
    pub fn get_keys(&self) -> Option<Vec<String>> {
        self.keys.as_ref().map(|k| {
            k.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    pub fn row_format(&self) -> RowFormat {
        RowFormat {
            format: self.format,
            delimiter: self.delimiter.clone(),
            quote: self.quote,
        }
    }
}
