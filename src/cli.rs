//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use batch_downloader::config::{
    DEFAULT_FAILURE_LOG_FILE, DEFAULT_MANIFEST_FILE, DEFAULT_PROCESS_LOG_FILE,
};
use batch_downloader::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use batch_downloader::{BatchConfig, ConcurrencyMode, DEFAULT_CONCURRENCY, HttpTimeouts};
use clap::Parser;

/// Download every entry of a JSON manifest with bounded concurrency.
///
/// The manifest is a JSON array of {"url": ..., "path": ...} records. Entries
/// whose destination already exists are skipped, so re-running a manifest only
/// fetches what is missing. Failed entries are saved in the same format.
#[derive(Parser, Debug)]
#[command(name = "batch-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error log output
    #[arg(short, long)]
    pub quiet: bool,

    /// Manifest file to read
    #[arg(short, long, default_value = DEFAULT_MANIFEST_FILE)]
    pub manifest: PathBuf,

    /// Where failed entries are written (only when something failed)
    #[arg(short, long, default_value = DEFAULT_FAILURE_LOG_FILE)]
    pub failure_log: PathBuf,

    /// Append-only diagnostic log file
    #[arg(long, default_value = DEFAULT_PROCESS_LOG_FILE)]
    pub log_file: PathBuf,

    /// Directory manifest paths are resolved against
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Start the next download as soon as any finishes, instead of waiting for the whole batch
    #[arg(long)]
    pub sliding_window: bool,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: u64,

    /// Whole-request timeout in seconds (1-3600)
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Exit right after the run instead of waiting for Enter
    #[arg(long)]
    pub no_wait: bool,
}

impl Args {
    /// Returns the default log level implied by `-q` / `-v`.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Builds the library configuration for this run.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            concurrency: usize::from(self.concurrency),
            mode: if self.sliding_window {
                ConcurrencyMode::SlidingWindow
            } else {
                ConcurrencyMode::Batch
            },
            output_dir: self.output_dir.clone(),
            failure_log: self.failure_log.clone(),
            timeouts: HttpTimeouts {
                connect_secs: self.connect_timeout,
                read_secs: self.timeout,
            },
        }
    }
}
