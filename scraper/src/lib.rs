pub mod comic;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod http;
pub mod logging;

#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::comic::{build_url, date_stamp, Comic, ASSET_EXTENSION, GOCOMICS_BASE_URL};
pub use crate::config::{IniConfig, Property, RedditConfig, ScraperConfig};
pub use crate::error::{ConfigError, FetchError};
pub use crate::extract::{extract_comic_image_url, COMIC_IMG_QUERY};
pub use crate::fetcher::{create_folder, BatchReport, Scraper};
pub use crate::http::{HttpSession, RetryPolicy, Transport};
