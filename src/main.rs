//! pbsreport - PBS JOB REPORTER
//!
//! Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use pbsreport::{
    available_fields,
    cli::Args,
    filter::{collect_inputs, FileFilter},
    processor::{process_file, ProcessOptions, ProcessResult},
    stats::Statistics,
};

fn main() -> Result<()> {
    let args = Args::parse();

    // Thread pool
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to initialise thread pool")?;
    }

    let keys = args.get_keys().unwrap_or_else(available_fields);
    let row = args.row_format();

    if args.keys_only {
        if !args.no_keys {
            println!("{}", keys.join(row.delimiter.as_str()));
        }
        return Ok(());
    }

    if !args.no_keys {
        if let Some(header) = row.header(&keys) {
            println!("{}", header);
        }
    }

    let filter = FileFilter::new(args.pattern.clone()).map_err(|e| anyhow::anyhow!("{}", e))?;
    let inputs = collect_inputs(&args.paths, &filter, args.max_depth);

    let stats = Statistics::new(inputs.len());
    let options = ProcessOptions::new()
        .with_keys(Some(keys))
        .with_row_format(row);

    let pb = create_progress_bar(inputs.len(), args.progress)?;

    let failures = run_batch(
        &inputs,
        rayon::current_num_threads(),
        &options,
        &pb,
        &stats,
        args.verbose,
    )?;

    pb.finish_and_clear();

    if let Some(ref log_path) = args.log {
        write_error_log(log_path, &failures)?;
    }

    if args.summary {
        stats.print_summary();
    }

    Ok(())
}

/// Process `inputs` in chunks of `chunk_size` files, each chunk in parallel,
/// writing a chunk's output before the next one starts.
///
/// Returns the failures for the error log.
fn run_batch(
    inputs: &[PathBuf],
    chunk_size: usize,
    options: &ProcessOptions,
    pb: &ProgressBar,
    stats: &Statistics,
    verbose: bool,
) -> Result<Vec<(PathBuf, String)>> {
    let mut failures = Vec::new();

    for chunk in inputs.chunks(chunk_size.max(1)) {
        // Order within the chunk is preserved by collect
        let results: Vec<ProcessResult> = chunk
            .par_iter()
            .map(|path| {
                let result = process_file(path.clone(), options);
                pb.inc(1);
                result
            })
            .collect();

        emit_results(results, stats, verbose, &mut failures)?;
    }

    Ok(failures)
}

/// Write rows to stdout and failures to stderr, in input order.
fn emit_results(
    results: Vec<ProcessResult>,
    stats: &Statistics,
    verbose: bool,
    failures: &mut Vec<(PathBuf, String)>,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for result in results {
        stats.add_bytes_read(result.file_size);

        if let Some(line) = result.line {
            stats.increment_parsed();
            writeln!(out, "{}", line)?;
            continue;
        }

        stats.increment_failed();
        out.flush()?;
        eprintln!("could not parse {}", result.path.display());

        let reason = result.error.unwrap_or_default();
        if verbose {
            eprintln!("    {}", reason.dimmed());
        }
        failures.push((result.path, reason));
    }

    out.flush()?;
    Ok(())
}

/// Progress bar on stderr, hidden unless requested
fn create_progress_bar(total: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .context("invalid progress bar template")?
            .progress_chars("█▓▒░"),
    );
    Ok(pb)
}

/// Write the error log file
fn write_error_log(log_path: &Path, errors: &[(PathBuf, String)]) -> Result<()> {
    let file = File::create(log_path)
        .with_context(|| format!("cannot create error log {}", log_path.display()))?;
    let mut log_file = BufWriter::new(file);

    writeln!(log_file, "pbsreport error log")?;
    writeln!(log_file, "created: {}", unix_now())?;
    writeln!(log_file, "failures: {}", errors.len())?;
    writeln!(log_file, "{}", "=".repeat(50))?;

    for (path, error) in errors {
        writeln!(log_file, "\nfile: {}", path.display())?;
        writeln!(log_file, "error: {}", error)?;
    }

    log_file.flush()?;
    Ok(())
}

/// Current time as a unix timestamp string
fn unix_now() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now();
    let duration = now
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    format!("unix timestamp {}", duration.as_secs())
}
