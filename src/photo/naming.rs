//! Photo file naming.
//!
//! Stored photos are named `<unix-millis>_<sanitised original name>`, e.g.
//! `1734700000123_IMG_0042.jpg`. The leading timestamp orders photos newest
//! first everywhere they are listed.

use std::cmp::Reverse;

/// Longest sanitised original name kept in a stored file name.
const MAX_ORIGINAL_NAME_CHARS: usize = 100;

/// Marker preceding the file name in photo URLs.
const IMAGES_SEGMENT: &str = "/images/";

/// Reduce a client-supplied file name to a safe single path segment.
///
/// Directory components are dropped, characters outside `[A-Za-z0-9._-]`
/// become `_`, leading dots are stripped and the result is truncated.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_ORIGINAL_NAME_CHARS)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Name under which an upload made at `millis` is stored.
pub fn stored_filename(millis: i64, original: &str) -> String {
    format!("{}_{}", millis, sanitize_filename(original))
}

/// Whether `name` can be used as a stored photo name in a request path.
pub fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(|c| c.is_control())
}

/// Extract the stored file name from a photo URL.
///
/// Uses the text after the last `/images/` when present, otherwise the last
/// path segment.
pub fn filename_from_url(url: &str) -> Option<String> {
    if let Some(idx) = url.rfind(IMAGES_SEGMENT) {
        let name = &url[idx + IMAGES_SEGMENT.len()..];
        return (!name.is_empty()).then(|| name.to_string());
    }
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
}

/// Upload timestamp embedded in a photo URL or file name (0 if absent).
pub fn timestamp_of(url: &str) -> i64 {
    let name = url.rsplit('/').next().unwrap_or("");
    let prefix = name.split('_').next().unwrap_or("");
    prefix.parse().unwrap_or(0)
}

/// Sort photo URLs newest first. Equal timestamps keep their input order.
pub fn sort_urls_desc<I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut urls: Vec<String> = urls.into_iter().collect();
    urls.sort_by_key(|url| Reverse(timestamp_of(url)));
    urls
}
