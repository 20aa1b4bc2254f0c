//! CLI entry point for the batch downloader.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use batch_downloader::{BatchRunner, Manifest};
use clap::Parser;
use tracing::{debug, error, info};

mod cli;
mod logging;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    logging::init_tracing(args.default_log_level(), &args.log_file)?;

    debug!(?args, "CLI arguments parsed");
    info!("batch downloader starting");

    // A bad manifest is the one fatal input error: nothing is downloaded
    let manifest = match Manifest::load(&args.manifest).await {
        Ok(manifest) => manifest,
        Err(e) => {
            error!(error = %e, "cannot start batch");
            return Err(e).context("failed to load manifest");
        }
    };
    info!(items = manifest.len(), path = %args.manifest.display(), "manifest loaded");

    let config = args.batch_config();
    if !config.output_dir.exists() {
        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                config.output_dir.display()
            )
        })?;
        info!(dir = %config.output_dir.display(), "created output directory");
    }

    let runner = BatchRunner::new(config)?;
    let (summary, _stdout) = runner.run(manifest, tokio::io::stdout()).await?;
    debug!(?summary, "run finished");

    if !args.no_wait {
        wait_for_enter()?;
    }

    Ok(())
}

/// Blocks until a line (or EOF) arrives on stdin.
fn wait_for_enter() -> Result<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "press Enter to close")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
