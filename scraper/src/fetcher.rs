use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, error, info, warn};

use crate::comic::{date_stamp, Comic, GOCOMICS_BASE_URL};
use crate::error::FetchError;
use crate::extract::extract_comic_image_url;
use crate::http::{HttpSession, Transport};

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: Vec<(Comic, PathBuf)>,
    /// Each failure wraps the `FetchError` that caused it.
    pub failed: Vec<(Comic, anyhow::Error)>,
    /// Set when a shutdown request stopped the batch early.
    pub interrupted: bool,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.saved.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.interrupted
    }

    /// The typed cause of the `i`-th failure.
    pub fn fetch_error(&self, i: usize) -> Option<&FetchError> {
        self.failed.get(i).and_then(|(_, e)| e.downcast_ref())
    }
}

/// Downloads one day's strip for each comic, one comic at a time.
pub struct Scraper<T: Transport = HttpSession> {
    transport: T,
    base_url: String,
    output_root: PathBuf,
    shutdown: Option<Arc<AtomicBool>>,
}

impl Scraper<HttpSession> {
    pub fn new() -> Scraper<HttpSession> {
        Scraper::with_transport(HttpSession::default())
    }
}

impl Default for Scraper<HttpSession> {
    fn default() -> Self {
        Scraper::new()
    }
}

impl<T: Transport> Scraper<T> {
    pub fn with_transport(transport: T) -> Scraper<T> {
        Scraper {
            transport,
            base_url: GOCOMICS_BASE_URL.to_string(),
            output_root: PathBuf::from("."),
            shutdown: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Directory the per-comic folders are created in.
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Stop before the next comic once `flag` is set.
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst))
    }

    /// Fetch every comic for `date`. A failing comic is logged and skipped.
    pub fn run(&self, comics: &[Comic], date: NaiveDate) -> BatchReport {
        let mut report = BatchReport::default();
        let stamp = date_stamp(date);

        for comic in comics {
            if self.shutdown_requested() {
                warn!("Shutdown requested, skipping remaining comics");
                report.interrupted = true;
                break;
            }

            info!("Downloading comic \"{}\" ({})", comic, stamp);
            match self.fetch_comic(comic, date) {
                Ok(path) => {
                    info!("Saved {}", path.display());
                    report.saved.push((comic.clone(), path));
                }
                Err(e) => {
                    let e = anyhow::Error::new(e)
                        .context(format!("Failed to download \"{}\" ({})", comic, stamp));
                    error!("{:#}", e);
                    report.failed.push((comic.clone(), e));
                }
            }
        }

        report
    }

    /// Download the strip of a single comic and return where it was written.
    pub fn fetch_comic(&self, comic: &Comic, date: NaiveDate) -> Result<PathBuf, FetchError> {
        let dir = comic.dir(&self.output_root);
        create_folder(&dir)?;

        let page_url = comic.page_url(&self.base_url, date);
        debug!("{}", page_url);
        let img_url = self.comic_image_url(&page_url)?;

        let path = dir.join(comic.file_name(date));
        self.save_comic_image(&img_url, &path)?;
        Ok(path)
    }

    pub fn comic_image_url(&self, page_url: &str) -> Result<String, FetchError> {
        let html = self.transport.get_text(page_url)?;
        extract_comic_image_url(&html, page_url)
    }

    fn save_comic_image(&self, img_url: &str, path: &Path) -> Result<(), FetchError> {
        debug!("Fetching image {}", img_url);
        let bytes = self.transport.get_bytes(img_url)?;
        fs::write(path, bytes).map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Create the comic's folder if it is not there yet.
pub fn create_folder(dir: &Path) -> Result<(), FetchError> {
    fs::create_dir_all(dir).map_err(|source| FetchError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
