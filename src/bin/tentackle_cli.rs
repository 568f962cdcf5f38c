use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use tentackle::cache::parse_selection;
use tentackle::config::{Config, RegressionWindow, DEFAULT_CONFIG_FILE};
use tentackle::{SelectionCache, Table};

#[derive(Parser, Debug)]
#[command(name = "tentackle_cli")]
#[command(version)]
#[command(about = "Tensile data analysis assisting tool for Shimadzu exports", long_about = None)]
struct Cli {
    /// Export (.csv) to process; repeat for several files
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Samples to analyse: batch-subbatch(-truncation),batch-subbatch
    #[arg(short = 's', long = "select", value_name = "SELECTION")]
    select: Option<String>,

    /// Strain range for modulus measurement: start,end
    #[arg(short = 'r', long = "slope-range", value_name = "START,END")]
    slope_range: Option<String>,

    /// Config file (defaults to ./config.json when present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Restore a saved session before importing files
    #[arg(long = "restore", value_name = "SNAPSHOT")]
    restore: Option<PathBuf>,

    /// Save the resulting session
    #[arg(long = "save", value_name = "SNAPSHOT")]
    save: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long)]
    verbose: bool,
}

fn parse_range(text: &str) -> Result<RegressionWindow> {
    let Some((start, end)) = text.split_once(',') else {
        bail!("slope range {text:?} must look like start,end");
    };
    let start: f64 = start.trim().parse().with_context(|| format!("bad start {start:?}"))?;
    let end: f64 = end.trim().parse().with_context(|| format!("bad end {end:?}"))?;
    Ok(RegressionWindow::new(start, end))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(std::path::Path::new(DEFAULT_CONFIG_FILE)),
    };
    if let Some(range) = &cli.slope_range {
        config = config.with_regression(parse_range(range)?);
    }

    let selection = cli
        .select
        .as_deref()
        .filter(|s| *s != "all")
        .map(parse_selection)
        .transpose()
        .context("parsing --select")?;

    let mut cache = SelectionCache::new(config);

    if let Some(snapshot) = &cli.restore {
        let report = cache
            .restore_snapshot(snapshot, false)
            .with_context(|| format!("restoring {}", snapshot.display()))?;
        for (path, e) in &report.failed {
            log::error!("Unable to re-open {}: {e}", path.display());
        }
    }

    if cli.files.is_empty() && cache.is_empty() {
        bail!("No file specified. Use -h for help.");
    }

    for file in &cli.files {
        let table = Table::open(file).with_context(|| format!("Unable to open {}", file.display()))?;
        let kept = cache.cache(table, selection.as_deref());
        if kept == 0 {
            log::warn!("{}: none of the selected samples exist", file.display());
        }
    }

    match cache.analyze(None) {
        Ok(report) => {
            for sample in &report.samples {
                log::debug!("{}: {:?}", sample.label, sample);
            }
            print!("{report}");
        }
        Err(e) => log::error!("Analysis failed: {e}"),
    }

    if let Some(snapshot) = &cli.save {
        let written = cache.take_snapshot(Some(snapshot))?;
        log::info!("Session saved to {}", written.display());
    }

    Ok(())
}
