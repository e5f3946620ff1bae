mod poster;
use crate::poster::{PostJob, PostRun};
mod reddit;
use crate::reddit::RedditClient;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use log::{error, info};

use gocomics_scraper::config::{DEFAULT_REDDIT_CONFIG, DEFAULT_SCRAPER_CONFIG};
use gocomics_scraper::{date_stamp, logging, RedditConfig, ScraperConfig};

/// Post the downloaded strips of the configured comics to a subreddit
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// INI file with the `[Reddit]` credentials and pacing
    #[arg(long, default_value = DEFAULT_REDDIT_CONFIG)]
    config: PathBuf,

    /// INI file listing the comics whose strips get posted
    #[arg(long, default_value = DEFAULT_SCRAPER_CONFIG)]
    scraper_config: PathBuf,

    /// Date of the strips to post (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Directory the scraper saved the per-comic folders in
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Post title; `{comic}` and `{date}` are filled in
    #[arg(long, default_value = "{comic} ({date})")]
    title: String,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let reddit_config = RedditConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let scraper_config = ScraperConfig::load(&cli.scraper_config).with_context(|| {
        format!(
            "Failed to load config from {}",
            cli.scraper_config.display()
        )
    })?;
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let stamp = date_stamp(date);

    let jobs: Vec<PostJob> = scraper_config
        .comics
        .iter()
        .map(|comic| PostJob {
            title: cli
                .title
                .replace("{comic}", comic.name())
                .replace("{date}", &stamp),
            image_path: comic.output_path(&cli.output_dir, date),
        })
        .collect();

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    info!("Starting...");
    let client = RedditClient::new().context("Failed to build Reddit client")?;
    let run = PostRun::new(&client, &reddit_config).shutdown_flag(shutdown);
    match run.run(&jobs) {
        Ok(summary) => {
            info!(
                "Script done running: {} posted, {} skipped",
                summary.posted.len(),
                summary.skipped.len()
            );
            Ok(())
        }
        Err(e) => {
            let e = anyhow::Error::new(e).context("Posting stopped");
            error!("{:#}", e);
            Err(e)
        }
    }
}
