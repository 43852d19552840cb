//! Permanent-link parsing
//!
//! A permanent link is the human-readable canonical URL of a catalog entity
//! (song, album, playlist, artist); its last path segment is the entity's
//! token. Upstream is not consistent about well-formedness, so extraction
//! falls back to plain string splitting when URL parsing fails.

use url::Url;

/// Extracts the canonical token from a permanent link.
///
/// Returns the last non-empty path segment, or `None` when the input is
/// empty or has no path segments at all. Inputs that `Url` rejects (missing
/// scheme, scheme-relative forms) are handled by stripping any query string
/// and trailing slashes and splitting on `/`.
pub fn extract_token_from_perma_url(perma_url: &str) -> Option<String> {
    if perma_url.is_empty() {
        return None;
    }

    match Url::parse(perma_url) {
        Ok(parsed) => last_segment(parsed.path()),
        Err(_) => {
            let cleaned = perma_url
                .split('?')
                .next()
                .unwrap_or_default()
                .trim_end_matches('/');
            last_segment(cleaned)
        }
    }
}

/// Normalizes a caller-supplied value that may be either a bare token or a
/// full permanent link.
///
/// Values that look like a URL (an http scheme prefix, or any slash) go
/// through [`extract_token_from_perma_url`]; bare tokens pass through
/// unchanged. Used by routing layers to clean a path parameter before
/// building an upstream request.
pub fn normalize_token(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http") || raw.contains('/') {
        extract_token_from_perma_url(raw)
    } else {
        Some(raw.to_string())
    }
}

fn last_segment(path: &str) -> Option<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(str::to_string)
}
