use std::path::{Path, PathBuf};

use ini::Ini;

use crate::comic::Comic;
use crate::error::ConfigError;

pub const DEFAULT_SCRAPER_CONFIG: &str = "gocomics-scraper-config.ini";
pub const DEFAULT_REDDIT_CONFIG: &str = "gocomics-reddit-config.ini";

pub const GOCOMICS_SECTION: &str = "GoComicsScraper";
pub const REDDIT_SECTION: &str = "Reddit";

/// A config value after splitting on commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Single(String),
    List(Vec<String>),
}

impl Property {
    pub fn from_values(mut values: Vec<String>) -> Property {
        if values.len() == 1 {
            Property::Single(values.remove(0))
        } else {
            Property::List(values)
        }
    }
}

/// Thin wrapper over an INI file that remembers where it came from so
/// edits can be saved back.
#[derive(Debug)]
pub struct IniConfig {
    path: PathBuf,
    ini: Ini,
}

impl IniConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<IniConfig, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let ini = Ini::load_from_file(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(IniConfig { path, ini })
    }

    fn raw(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        let props = self
            .ini
            .section(Some(section))
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        // Keys are case-insensitive; `comics` and `COMICS` are the same key.
        props
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
            .ok_or_else(|| ConfigError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// Comma-separated values of `key`, each trimmed.
    pub fn get_properties(&self, section: &str, key: &str) -> Result<Vec<String>, ConfigError> {
        let value = self.raw(section, key)?;
        Ok(split_values(value))
    }

    pub fn get_property(&self, section: &str, key: &str) -> Result<Property, ConfigError> {
        self.get_properties(section, key).map(Property::from_values)
    }

    pub fn get_reddit_property(&self, key: &str) -> Result<Property, ConfigError> {
        self.get_property(REDDIT_SECTION, key)
    }

    pub fn get_gocomics_properties(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        self.get_properties(GOCOMICS_SECTION, key)
    }

    /// Set a key in the scraper section. Call `save` to persist it.
    pub fn update_property(&mut self, key: &str, value: impl ToString) {
        let existing = self
            .ini
            .section(Some(GOCOMICS_SECTION))
            .and_then(|props| props.iter().find(|(name, _)| name.eq_ignore_ascii_case(key)))
            .map(|(name, _)| name.to_string());
        let key = existing.unwrap_or_else(|| key.to_string());
        self.ini
            .with_section(Some(GOCOMICS_SECTION))
            .set(key, value.to_string());
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.ini
            .write_to_file(&self.path)
            .map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// A key that must hold exactly one value.
    pub fn single(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        match self.get_property(section, key)? {
            Property::Single(value) => Ok(value),
            Property::List(values) => Err(ConfigError::NotSingle {
                key: key.to_string(),
                count: values.len(),
            }),
        }
    }

    pub fn number<T: std::str::FromStr>(&self, section: &str, key: &str) -> Result<T, ConfigError> {
        let value = self.single(section, key)?;
        value.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value,
        })
    }
}

fn split_values(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}

/// The comics to download, from `[GoComicsScraper] COMICS`.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub comics: Vec<Comic>,
}

impl ScraperConfig {
    pub fn from_ini(config: &IniConfig) -> Result<ScraperConfig, ConfigError> {
        let comics = config
            .get_gocomics_properties("COMICS")?
            .into_iter()
            .filter(|name| !name.is_empty())
            .map(Comic::new)
            .collect();
        Ok(ScraperConfig { comics })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<ScraperConfig, ConfigError> {
        ScraperConfig::from_ini(&IniConfig::load(path)?)
    }
}

/// Credentials and pacing for the Reddit poster, from `[Reddit]`.
#[derive(Clone)]
pub struct RedditConfig {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    /// Maximum number of posts per run.
    pub limit: u32,
    /// Seconds to wait between posts.
    pub wait: u64,
    /// Seconds a login stays fresh before logging in again.
    pub refresh: u64,
    pub subreddit: String,
}

impl RedditConfig {
    pub fn from_ini(config: &IniConfig) -> Result<RedditConfig, ConfigError> {
        let text = |key: &str| config.single(REDDIT_SECTION, key);
        Ok(RedditConfig {
            username: text("REDDIT_USER")?,
            password: text("REDDIT_PASS")?,
            client_id: text("REDDIT_CLIENT_ID")?,
            client_secret: text("REDDIT_CLIENT_SECRET")?,
            limit: config.number(REDDIT_SECTION, "LIMIT")?,
            wait: config.number(REDDIT_SECTION, "WAIT")?,
            refresh: config.number(REDDIT_SECTION, "REFRESH")?,
            subreddit: text("SUBREDDIT")?,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<RedditConfig, ConfigError> {
        RedditConfig::from_ini(&IniConfig::load(path)?)
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditConfig")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("limit", &self.limit)
            .field("wait", &self.wait)
            .field("refresh", &self.refresh)
            .field("subreddit", &self.subreddit)
            .finish_non_exhaustive()
    }
}
