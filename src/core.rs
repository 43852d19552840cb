//! Tree-walking augmentation engine
//!
//! The upstream catalog API returns arbitrarily-shaped JSON with no schema
//! guarantee: a single song, an album with a nested song list, a search page
//! mixing entity kinds. Rather than model any of it, the walker visits every
//! map node in the tree and applies the same augmentation steps wherever the
//! relevant fields happen to be. Every irregularity degrades gracefully; no
//! input ever fails the caller.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::links::{create_download_links, create_image_links};
use crate::utils::url::extract_token_from_perma_url;

/// Obfuscated-reference field names, in lookup priority order.
const ENCRYPTED_FIELDS: [&str; 3] = [
    "encrypted_media_url",
    "encrypted_drm_media_url",
    "encrypted_cache_url",
];

/// Raw fields stripped from every visited node and its secondary-info map.
const SENSITIVE_FIELDS: [&str; 4] = [
    "encrypted_media_url",
    "encrypted_cache_url",
    "encrypted_drm_cache_url",
    "encrypted_drm_media_url",
];

/// Nested map carrying alternate locations for several node-level fields.
const SECONDARY_INFO: &str = "more_info";

/// Recursively augments an upstream JSON document in place.
///
/// For every map node anywhere in the tree:
///
/// 1. decodes the obfuscated media reference into `downloadLinks`
/// 2. expands the `image` field into `imageLinks`
/// 3. extracts `token` from `perma_url`
/// 4. copies `more_info.vlink` up when the node has no `vlink` of its own
/// 5. strips the encrypted raw fields
/// 6. recurses into children
/// 7. consolidates the node's candidates into `urls` plus `bestUrl`
///
/// Augmentation fields are only added where absent, so re-running on an
/// already-augmented document is a no-op. Scalars and non-JSON-shaped input
/// pass through untouched, and decode failures leave the node unaugmented;
/// this function never fails.
pub fn augment_media_links(document: &mut Value) -> &mut Value {
    walk(document);
    document
}

fn walk(value: &mut Value) {
    match value {
        Value::Object(node) => augment_node(node),
        Value::Array(items) => {
            for item in items {
                walk(item);
            }
        }
        _ => {}
    }
}

fn augment_node(node: &mut Map<String, Value>) {
    // Obfuscated reference -> downloadLinks
    if !has_truthy(node, "downloadLinks") {
        if let Some(encrypted) = find_encrypted(node).map(str::to_string) {
            let links = create_download_links(&encrypted);
            if !links.is_empty() {
                if let Ok(links) = serde_json::to_value(links) {
                    node.insert("downloadLinks".to_string(), links);
                }
            }
        }
    }

    // image -> imageLinks
    if !has_truthy(node, "imageLinks") {
        if let Some(image) = find_field(node, "image").map(str::to_string) {
            let links = create_image_links(&image);
            if !links.is_empty() {
                if let Ok(links) = serde_json::to_value(links) {
                    node.insert("imageLinks".to_string(), links);
                }
            }
        }
    }

    // perma_url -> token
    if non_empty_str(node, "token").is_none() {
        if let Some(perma) = find_field(node, "perma_url").map(str::to_string) {
            if let Some(token) = extract_token_from_perma_url(&perma) {
                node.insert("token".to_string(), Value::String(token));
            }
        }
    }

    // prefer vlink from more_info when the node has none of its own
    if non_empty_str(node, "vlink").is_none() {
        let inherited = secondary_info(node)
            .and_then(|info| non_empty_str(info, "vlink"))
            .map(str::to_string);
        if let Some(vlink) = inherited {
            node.insert("vlink".to_string(), Value::String(vlink));
        }
    }

    sanitize_node(node);

    for child in node.values_mut() {
        walk(child);
    }

    // after children, so a node's consolidation reflects only its own fields
    consolidate_urls(node);
}

/// Returns the first non-empty obfuscated reference, honoring the fixed
/// field priority at the node's own level before falling back to the
/// secondary-info map.
fn find_encrypted(node: &Map<String, Value>) -> Option<&str> {
    ENCRYPTED_FIELDS
        .iter()
        .find_map(|field| non_empty_str(node, field))
        .or_else(|| {
            let info = secondary_info(node)?;
            ENCRYPTED_FIELDS
                .iter()
                .find_map(|field| non_empty_str(info, field))
        })
}

/// Looks a field up at the node's own level, then inside secondary-info.
fn find_field<'a>(node: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    non_empty_str(node, field)
        .or_else(|| secondary_info(node).and_then(|info| non_empty_str(info, field)))
}

fn secondary_info(node: &Map<String, Value>) -> Option<&Map<String, Value>> {
    node.get(SECONDARY_INFO).and_then(Value::as_object)
}

fn non_empty_str<'a>(node: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    node.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Presence test for the derived-list guards. The upstream contract is
/// loose here: `null`, `""`, `0` and `false` count as absent, while any
/// array or object (even empty) counts as present and is never overwritten.
fn has_truthy(node: &Map<String, Value>, field: &str) -> bool {
    node.get(field).is_some_and(|value| match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// Removes the sensitive raw fields from the node and its secondary-info
/// map. Runs unconditionally; absent fields are skipped.
fn sanitize_node(node: &mut Map<String, Value>) {
    for field in SENSITIVE_FIELDS {
        node.remove(field);
    }
    if let Some(Value::Object(info)) = node.get_mut(SECONDARY_INFO) {
        for field in SENSITIVE_FIELDS {
            info.remove(field);
        }
    }
}

/// Ranks and flattens a node's link candidates into an ordered `urls` list
/// and a single `bestUrl`.
///
/// A direct `vlink` comes first, followed by every `downloadLinks` entry
/// tagged by its quality; `more_info.vlink` is used alone only when nothing
/// else matched. Nodes with no candidates are left untouched.
fn consolidate_urls(node: &mut Map<String, Value>) {
    let mut urls: Vec<Value> = Vec::new();

    if let Some(vlink) = non_empty_str(node, "vlink") {
        urls.push(json!({ "type": "vlink", "url": vlink }));
    }

    if let Some(Value::Array(links)) = node.get("downloadLinks") {
        for link in links {
            let Some(link) = link.as_object() else {
                continue;
            };
            if let Some(url) = non_empty_str(link, "url") {
                let tag = non_empty_str(link, "quality").unwrap_or("download");
                urls.push(json!({ "type": tag, "url": url }));
            }
        }
    }

    if urls.is_empty() {
        if let Some(vlink) = secondary_info(node).and_then(|info| non_empty_str(info, "vlink")) {
            urls.push(json!({ "type": "vlink", "url": vlink }));
        }
    }

    if let Some(best) = urls.first().map(|entry| entry["url"].clone()) {
        debug!(candidates = urls.len(), "consolidated node urls");
        node.insert("urls".to_string(), Value::Array(urls));
        node.insert("bestUrl".to_string(), best);
    }
}
