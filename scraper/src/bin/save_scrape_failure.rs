use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use gocomics_scraper::{build_url, extract_comic_image_url, COMIC_IMG_QUERY, GOCOMICS_BASE_URL};
use std::env;
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Please provide a comic name and optionally a date");
        eprintln!("Usage: cargo run --bin save_scrape_failure <COMIC> [YYYY-MM-DD]");
        std::process::exit(1);
    }

    let comic = &args[1];
    let date = match args.get(2) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .with_context(|| format!("Invalid date: {}", d))?,
        None => Local::now().date_naive(),
    };
    let url = build_url(GOCOMICS_BASE_URL, comic, date);

    println!("Fetching HTML from {}...", url);

    // Error pages are worth keeping too, so the status is only reported.
    let client = reqwest::blocking::Client::new();
    let response = client.get(&url).send().context("Failed to fetch page")?;
    println!("Server answered with HTTP {}", response.status());
    let html = response.text().context("Failed to read response body")?;

    let failures_dir = Path::new("src/tests/fixtures/failures");
    fs::create_dir_all(failures_dir).context("Failed to create failures directory")?;

    let test_name = format!("{}_{}", comic, date.format("%Y_%m_%d"));
    let file_path = failures_dir.join(format!("{}.html", test_name));
    fs::write(&file_path, &html).context("Failed to write HTML file")?;

    println!(
        "Saved HTML to {} for regression testing",
        file_path.display()
    );

    // Look for the pieces the query depends on, to tell a layout change
    // apart from a day without a strip.
    use scraper::{Html, Selector};

    let document = Html::parse_document(&html);
    let count = |css: &str| match Selector::parse(css) {
        Ok(selector) => document.select(&selector).count(),
        Err(_) => 0,
    };
    let pictures = count("picture");
    let comic_pictures = count(r#"picture[class="item-comic-image"]"#);
    let loose_comic_class = count(".item-comic-image");

    println!("HTML analysis results:");
    println!("  - <picture> elements: {}", pictures);
    println!("  - exact class=\"item-comic-image\": {}", comic_pictures);
    println!("  - any element with item-comic-image class: {}", loose_comic_class);

    match extract_comic_image_url(&html, &url) {
        Ok(src) => {
            println!("Extraction succeeded ({}). This may not be a failure case.", src);
        }
        Err(e) => {
            println!("Extraction failed with error: {}", e);

            if loose_comic_class > comic_pictures {
                println!("   The comic class moved or gained extra classes - layout change");
            } else {
                println!("   No comic markup at all - likely no strip for this date");
            }
            println!("   Query: {}", COMIC_IMG_QUERY);

            println!("\nThis page has been saved and will be included in regression tests.");
        }
    }

    Ok(())
}
