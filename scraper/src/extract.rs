use scraper::{Html, Selector};

use crate::error::FetchError;

/// The strip is the `img` directly inside `<picture class="item-comic-image">`.
/// The class must match exactly.
pub const COMIC_IMG_QUERY: &str = r#"picture[class="item-comic-image"] > img"#;

/// Pull the comic image URL out of a comic page.
///
/// `page_url` is only used to make errors point at the page that failed.
pub fn extract_comic_image_url(html: &str, page_url: &str) -> Result<String, FetchError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(COMIC_IMG_QUERY).expect("comic image query is valid CSS");

    let img = document
        .select(&selector)
        .next()
        .ok_or_else(|| FetchError::AssetNotFound {
            url: page_url.to_string(),
            query: COMIC_IMG_QUERY,
        })?;

    img.value()
        .attr("src")
        .map(str::to_string)
        .ok_or_else(|| FetchError::MissingSource {
            url: page_url.to_string(),
        })
}
