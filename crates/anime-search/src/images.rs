//! Image URL cleanup.
//!
//! The catalog reports several image variants per title, some of them
//! empty, placeholder strings or protocol-relative paths. These helpers
//! pick one usable absolute URL.

use shared::{ImageUrls, ImageVariants};

const CDN_BASE: &str = "https://cdn.myanimelist.net";

const PLACEHOLDERS: [&str; 3] = ["null", "undefined", "N/A"];

/// Turn a reported image URL into an absolute one, or `None` if unusable
pub fn normalize_image_url(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() || PLACEHOLDERS.contains(&url) {
        return None;
    }

    if url.starts_with("data:") || url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }
    if url.starts_with("//") {
        return Some(format!("https:{url}"));
    }
    if url.starts_with('/') && (url.contains("images") || url.contains("anime")) {
        return Some(format!("{CDN_BASE}{url}"));
    }

    None
}

/// First usable URL, jpg before webp.
///
/// With `prefer_large` the large variant is tried first, otherwise the
/// regular one.
pub fn best_image_url(images: &ImageUrls, prefer_large: bool) -> Option<String> {
    [images.jpg.as_ref(), images.webp.as_ref()]
        .into_iter()
        .flatten()
        .flat_map(|variants| candidates(variants, prefer_large))
        .flatten()
        .find_map(|url| normalize_image_url(url))
}

fn candidates(variants: &ImageVariants, prefer_large: bool) -> [Option<&str>; 3] {
    let large = variants.large_image_url.as_deref();
    let regular = variants.image_url.as_deref();
    let small = variants.small_image_url.as_deref();
    if prefer_large {
        [large, regular, small]
    } else {
        [regular, large, small]
    }
}
