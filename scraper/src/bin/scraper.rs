use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use log::{error, info, warn};

use gocomics_scraper::config::DEFAULT_SCRAPER_CONFIG;
use gocomics_scraper::{date_stamp, logging, Scraper, ScraperConfig};

/// Download today's strip of every comic listed in the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// INI file with a `[GoComicsScraper] COMICS` list
    #[arg(long, default_value = DEFAULT_SCRAPER_CONFIG)]
    config: PathBuf,

    /// Date to fetch (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Directory the per-comic folders are created in
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let config = ScraperConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    info!(
        "Fetching {} comic(s) for {}",
        config.comics.len(),
        date_stamp(date)
    );

    let scraper = Scraper::new()
        .output_root(&cli.output_dir)
        .shutdown_flag(shutdown);
    let report = scraper.run(&config.comics, date);

    for (i, (comic, _)) in report.failed.iter().enumerate() {
        let kind = report.fetch_error(i).map_or("unknown", |e| e.kind());
        error!("{}: {} error", comic, kind);
    }
    if report.interrupted {
        warn!("Interrupted after {} comic(s)", report.attempted());
    }
    info!(
        "Done: {} saved, {} failed",
        report.saved.len(),
        report.failed.len()
    );

    Ok(())
}
