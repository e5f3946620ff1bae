use std::fs;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/tests/fixtures")
}

/// Load a saved comic page by name
pub fn load_html_fixture(fixture_name: &str) -> String {
    let path = fixtures_dir().join(format!("{}.html", fixture_name));
    fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to load test fixture: {}", path.display()))
}

/// Load a page captured by `save_scrape_failure`, if there is one
pub fn load_failure_html(failure_name: &str) -> Option<String> {
    let path = fixtures_dir()
        .join("failures")
        .join(format!("{}.html", failure_name));
    fs::read_to_string(path).ok()
}
