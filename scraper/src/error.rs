use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a single comic could not be saved.
///
/// Every variant is recoverable at the batch level: the failing comic is
/// logged and the run moves on to the next one.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed after {attempts} attempt(s)")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error(
        "the query `{query}` did not match anything on {url}, or no comic was published for this date"
    )]
    AssetNotFound { url: String, query: &'static str },

    #[error("the comic image on {url} has no `src` attribute")]
    MissingSource { url: String },

    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Short label used in the batch summary.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "http-status",
            FetchError::AssetNotFound { .. } => "not-found",
            FetchError::MissingSource { .. } => "missing-src",
            FetchError::Io { .. } => "io",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config section [{0}] is missing")]
    MissingSection(String),

    #[error("config key {key} is missing from section [{section}]")]
    MissingKey { section: String, key: String },

    #[error("config key {key} must be a number, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("config key {key} must hold a single value, got {count}")]
    NotSingle { key: String, count: usize },
}
