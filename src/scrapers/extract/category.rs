//! Category tiles, category page headings and subcategory links.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html};

use super::select::{ancestor_anchor, first_attr, SelectorChain};
use super::{parse_base, ExtractionError};
use crate::models::{name_from_url, CategoryRecord};
use crate::utils::{first_srcset_url, resolve_url, sanitize_text};

/// Grid cell holding one category tile on the category listing page.
static TILES: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        r#"[class*="col-4"][class*="col-md-3"][class*="col-lg-2"][class*="col-xl-1-5"][class*="mb-5"]"#,
    ])
    .unwrap()
});

static TILE_NAME: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        ".text-center.line-height-13.mt-3.mb-0.text-16.font-semibold.font-poppins",
        r#"[class*="text-center"][class*="line-height-13"][class*="font-semibold"]"#,
    ])
    .unwrap()
});

static ANCHOR: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&["a[href]"]).unwrap());

static PICTURE_SOURCE: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&["picture source[srcset]"]).unwrap());

static TILE_IMAGE: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&["picture img", "img"]).unwrap());

static PAGE_HEADING: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&["h1", ".category-title", r#"[class*="category"] h1"#]).unwrap()
});

static SUBCATEGORY_LINKS: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        ".subcategory a",
        ".category-item a",
        r#"[class*="subcategory"] a"#,
        ".category-list a",
    ])
    .unwrap()
});

const IMAGE_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-original", "src"];

/// Category tiles on a category listing page.
pub fn category_tiles(document: &Html) -> Vec<ElementRef<'_>> {
    TILES.outermost_in(document)
}

fn tile_url(tile: ElementRef<'_>, base_url: &str) -> Option<String> {
    let href = ANCHOR
        .first(tile)
        .or_else(|| ancestor_anchor(tile))
        .and_then(|a| a.value().attr("href"))?;
    resolve_url(base_url, href)
}

fn tile_image(tile: ElementRef<'_>, base_url: &str) -> Option<String> {
    let from_source = PICTURE_SOURCE.find_map(tile, |source| {
        source
            .value()
            .attr("srcset")
            .and_then(first_srcset_url)
            .and_then(|src| resolve_url(base_url, src))
    });
    from_source.or_else(|| {
        TILE_IMAGE.find_map(tile, |img| {
            first_attr(img, IMAGE_ATTRS)
                .filter(|src| !src.starts_with("data:"))
                .and_then(|src| resolve_url(base_url, src))
        })
    })
}

/// Extract a category from a listing tile.
///
/// Both a name and a resolvable URL are required; `Ok(None)` otherwise.
pub fn extract_category(
    tile: ElementRef<'_>,
    base_url: &str,
) -> Result<Option<CategoryRecord>, ExtractionError> {
    parse_base(base_url)?;

    let Some(name) = TILE_NAME.first_text(tile).and_then(|t| sanitize_text(&t)) else {
        return Ok(None);
    };
    let Some(url) = tile_url(tile, base_url) else {
        return Ok(None);
    };

    Ok(Some(CategoryRecord {
        name,
        url,
        image: tile_image(tile, base_url),
    }))
}

/// Display name of a category page: its heading, else derived from the URL.
pub fn page_category_name(document: &Html, url: &str) -> String {
    PAGE_HEADING
        .first_text(document.root_element())
        .and_then(|text| sanitize_text(&text))
        .unwrap_or_else(|| name_from_url(url))
}

/// Links to subcategories on a category page, resolved and de-duplicated
/// in discovery order. The page's own URL is never returned.
pub fn discover_subcategories(document: &Html, current_url: &str) -> Vec<String> {
    let mut seen = HashSet::from([current_url.to_string()]);
    let mut urls = Vec::new();
    for selector in SUBCATEGORY_LINKS.selectors() {
        for anchor in document.select(selector) {
            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| resolve_url(current_url, href))
            else {
                continue;
            };
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }
    urls
}
