use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

pub const GOCOMICS_BASE_URL: &str = "https://www.gocomics.com";

// The comics checked so far are all served as gifs. Detecting the real
// format would need the response content type or the image bytes.
pub const ASSET_EXTENSION: &str = "gif";

/// A comic tracked on GoComics, e.g. `calvinandhobbes`.
///
/// The name is used verbatim as the URL path segment and as the output
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comic(String);

impl Comic {
    pub fn new(name: impl Into<String>) -> Comic {
        Comic(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `{base}/{comic}/{year}/{month}/{day}`, without zero padding.
    pub fn page_url(&self, base: &str, date: NaiveDate) -> String {
        build_url(base, self.name(), date)
    }

    /// `<comic>-(<year>-<month>-<day>).gif`
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}-({}).{}", self.name(), date_stamp(date), ASSET_EXTENSION)
    }

    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(self.name())
    }

    /// Where the asset for `date` is written under `root`.
    pub fn output_path(&self, root: &Path, date: NaiveDate) -> PathBuf {
        self.dir(root).join(self.file_name(date))
    }
}

impl fmt::Display for Comic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn build_url(base: &str, comic: &str, date: NaiveDate) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        base.trim_end_matches('/'),
        comic,
        date.year(),
        date.month(),
        date.day()
    )
}

/// `2022-12-1` style stamp used in file names and log lines.
pub fn date_stamp(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month(), date.day())
}
