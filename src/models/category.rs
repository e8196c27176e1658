//! Category models and the URL-derived naming rules.

use serde::{Deserialize, Serialize};

use crate::utils::{content_hash, last_path_segment};

/// A category as extracted from a tile or page, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Display name.
    pub name: String,
    /// Canonical absolute URL of the category page.
    pub url: String,
    /// Tile image, if the tile carried one.
    pub image: Option<String>,
}

/// Fields written for a category, matched by its canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFields {
    pub name: String,
    pub slug: String,
    /// Parent category, `None` for a root.
    pub parent_id: Option<i64>,
    pub image: Option<String>,
}

impl CategoryFields {
    /// Build the stored fields for a category URL.
    pub fn for_url(url: &str, name: String, parent_id: Option<i64>) -> Self {
        Self {
            name,
            slug: slug_from_url(url),
            parent_id,
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }
}

/// Handle to a stored category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryHandle {
    pub id: i64,
}

/// URL-safe slug of the last path segment of a category URL.
///
/// Falls back to a short hash of the URL when the segment has no
/// sluggable characters, so the slug is never empty.
pub fn slug_from_url(url: &str) -> String {
    let slug = last_path_segment(url)
        .map(|segment| slugify(&segment))
        .unwrap_or_default();
    if slug.is_empty() {
        content_hash(&[url])[..12].to_string()
    } else {
        slug
    }
}

/// Human-readable name from the last path segment: dashes become spaces
/// and every word is capitalized (`led-televizorji` -> `Led Televizorji`).
pub fn name_from_url(url: &str) -> String {
    let segment = last_path_segment(url).unwrap_or_default();
    segment
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        let mapped = if c.is_ascii_alphanumeric() {
            Some(c.to_string())
        } else {
            transliterate(c).map(str::to_string)
        };

        match mapped {
            Some(part) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push_str(&part);
            }
            None => pending_dash = true,
        }
    }

    slug
}

/// ASCII form of a lowercase accented letter; `None` for separators.
fn transliterate(c: char) -> Option<&'static str> {
    let ascii = match c {
        'č' | 'ć' | 'ç' => "c",
        'š' | 'ś' => "s",
        'ž' | 'ź' | 'ż' => "z",
        'đ' => "d",
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'ą' => "a",
        'é' | 'è' | 'ê' | 'ë' | 'ę' | 'ě' => "e",
        'í' | 'ì' | 'î' | 'ï' => "i",
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => "o",
        'ú' | 'ù' | 'û' | 'ü' | 'ů' => "u",
        'ñ' | 'ń' | 'ň' => "n",
        'ř' => "r",
        'ł' => "l",
        'ý' | 'ÿ' => "y",
        'ß' => "ss",
        _ => return None,
    };
    Some(ascii)
}
