//! Media link generation
//!
//! Decodes the obfuscated media references carried by upstream payloads into
//! quality-tiered download links, and expands image URLs into the fixed set
//! of resolution variants served by the CDN.

use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use des::Des;
use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyInit};
use ecb::Decryptor;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Obfuscation key used by the upstream service. This is a protocol
/// constant, not configuration: changing any byte breaks decoding for
/// every existing payload.
const MEDIA_KEY: [u8; 8] = *b"38346591";

/// Audio quality tiers in ascending bitrate order. The decrypted URL embeds
/// the `_96` marker; every tier (96 included) is derived by substituting it.
const AUDIO_QUALITIES: [(&str, &str); 5] = [
    ("_12", "12kbps"),
    ("_48", "48kbps"),
    ("_96", "96kbps"),
    ("_160", "160kbps"),
    ("_320", "320kbps"),
];

/// Image resolution tiers, in output order.
const IMAGE_QUALITIES: [&str; 3] = ["50x50", "150x150", "500x500"];

/// Matches the resolution marker already present in an upstream image URL.
static IMAGE_QUALITY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"150x150|50x50").expect("literal alternation always compiles"));

/// A single quality-tiered streaming URL derived from an obfuscated reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub quality: String,
    pub url: String,
}

/// A single resolution-tiered image URL derived from an image template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageLink {
    pub quality: String,
    pub url: String,
}

/// Errors that can occur while decoding an obfuscated media reference.
///
/// These never cross the public API boundary: callers of
/// [`create_download_links`] receive an empty list instead, after the
/// failure has been logged.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("obfuscated reference is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("ciphertext could not be decrypted (bad length or padding)")]
    Decrypt,
    #[error("decrypted payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decrypts an obfuscated media reference into the plaintext template URL.
///
/// The reference is a base64-encoded DES-ECB block with PKCS#7 padding,
/// keyed by [`MEDIA_KEY`]. ECB is block-independent, so no IV is involved.
pub fn decrypt_media_url(encrypted_media_url: &str) -> Result<String, DecodeError> {
    let ciphertext = BASE64.decode(encrypted_media_url)?;
    let plaintext = Decryptor::<Des>::new((&MEDIA_KEY).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| DecodeError::Decrypt)?;
    Ok(String::from_utf8(plaintext)?)
}

/// Decodes one obfuscated reference into the full set of quality-tiered
/// download links, in ascending bitrate order.
///
/// Each entry is produced by substituting the first `_96` marker in the
/// decrypted template with the tier's own marker. Never fails: malformed or
/// undecodable input yields an empty list after a logged warning, and the
/// caller proceeds without download links.
pub fn create_download_links(encrypted_media_url: &str) -> Vec<DownloadLink> {
    if encrypted_media_url.is_empty() {
        return Vec::new();
    }

    let template = match decrypt_media_url(encrypted_media_url) {
        Ok(template) => template,
        Err(err) => {
            warn!("failed to decode obfuscated media reference: {err}");
            return Vec::new();
        }
    };

    AUDIO_QUALITIES
        .iter()
        .map(|(marker, bitrate)| DownloadLink {
            quality: (*bitrate).to_string(),
            url: template.replacen("_96", marker, 1),
        })
        .collect()
}

/// Expands one image URL into the three fixed resolution variants.
///
/// The resolution marker already present in the URL (leftmost `150x150` or
/// `50x50`) is swapped for each target tier, and a leading `http://` is
/// rewritten to `https://`. Empty input yields an empty list.
pub fn create_image_links(link: &str) -> Vec<ImageLink> {
    if link.is_empty() {
        return Vec::new();
    }

    IMAGE_QUALITIES
        .iter()
        .map(|quality| ImageLink {
            quality: (*quality).to_string(),
            url: force_https(&IMAGE_QUALITY_MARKER.replace(link, *quality)),
        })
        .collect()
}

/// Rewrites a leading insecure scheme to the secure one. Already-secure and
/// scheme-less URLs pass through unchanged.
fn force_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // DES-ECB("http://aac.saavncdn.com/238/c0ffee4b1dca_96.mp4") under the
    // production key, base64-encoded.
    const ENCRYPTED_SONG_URL: &str =
        "iPPGVzyogeiPwpro65A0eUaQggN+8+J4qIcvC12WpsYzR+Hh37Lf4pT4p7AxSE/F";

    #[test]
    fn test_decrypt_media_url_known_vector() {
        let plaintext = decrypt_media_url(ENCRYPTED_SONG_URL).unwrap();
        assert_eq!(plaintext, "http://aac.saavncdn.com/238/c0ffee4b1dca_96.mp4");
    }

    #[test]
    fn test_decrypt_media_url_rejects_invalid_base64() {
        assert!(matches!(
            decrypt_media_url("not base64!!!"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_decrypt_media_url_rejects_partial_block() {
        // 3 bytes of ciphertext cannot be a whole DES block
        assert!(matches!(
            decrypt_media_url("AAAA"),
            Err(DecodeError::Decrypt)
        ));
    }

    #[test]
    fn test_create_download_links_all_tiers_ascending() {
        let links = create_download_links(ENCRYPTED_SONG_URL);
        let qualities: Vec<&str> = links.iter().map(|l| l.quality.as_str()).collect();
        assert_eq!(
            qualities,
            vec!["12kbps", "48kbps", "96kbps", "160kbps", "320kbps"]
        );
        let markers = ["_12", "_48", "_96", "_160", "_320"];
        for (link, marker) in links.iter().zip(markers) {
            assert_eq!(
                link.url,
                format!("http://aac.saavncdn.com/238/c0ffee4b1dca{}.mp4", marker)
            );
        }
    }

    #[test]
    fn test_create_download_links_substitutes_marker_once() {
        // DES-ECB("https://aac.saavncdn.com/006/song_96_p.mp4"): the tier
        // marker appears mid-path and must be replaced exactly once.
        let links = create_download_links(
            "ID2ieOjCrwfgWvL5sXl4B1ImC5QfbsDyTZHY94QCaevXycxjiDSyvW+XHLUinhCK",
        );
        assert_eq!(links.len(), 5);
        assert_eq!(links[4].url, "https://aac.saavncdn.com/006/song_320_p.mp4");
        assert_eq!(links[2].url, "https://aac.saavncdn.com/006/song_96_p.mp4");
    }

    #[test]
    fn test_create_download_links_empty_and_garbage_input() {
        assert!(create_download_links("").is_empty());
        assert!(create_download_links("@@@").is_empty());
    }

    #[test]
    fn test_create_download_links_deterministic() {
        assert_eq!(
            create_download_links(ENCRYPTED_SONG_URL),
            create_download_links(ENCRYPTED_SONG_URL)
        );
    }

    #[test]
    fn test_create_image_links_three_tiers_in_order() {
        let links = create_image_links("https://c.saavncdn.com/862/cover_150x150.jpg");
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://c.saavncdn.com/862/cover_50x50.jpg",
                "https://c.saavncdn.com/862/cover_150x150.jpg",
                "https://c.saavncdn.com/862/cover_500x500.jpg",
            ]
        );
        let qualities: Vec<&str> = links.iter().map(|l| l.quality.as_str()).collect();
        assert_eq!(qualities, vec!["50x50", "150x150", "500x500"]);
    }

    #[test]
    fn test_create_image_links_forces_https() {
        let links = create_image_links("http://c.saavncdn.com/862/cover_50x50.jpg");
        for link in &links {
            assert!(link.url.starts_with("https://"), "{}", link.url);
        }
        assert_eq!(links[2].url, "https://c.saavncdn.com/862/cover_500x500.jpg");
    }

    #[test]
    fn test_create_image_links_without_marker_or_scheme() {
        // No resolution marker: all three variants keep the original URL
        let links = create_image_links("c.saavncdn.com/862/cover.jpg");
        assert_eq!(links.len(), 3);
        for link in &links {
            assert_eq!(link.url, "c.saavncdn.com/862/cover.jpg");
        }
    }

    #[test]
    fn test_create_image_links_empty_input() {
        assert!(create_image_links("").is_empty());
    }

    #[test]
    fn test_force_https_leaves_secure_urls_alone() {
        assert_eq!(force_https("https://a/b"), "https://a/b");
        assert_eq!(force_https("http://a/b"), "https://a/b");
        assert_eq!(force_https("//a/b"), "//a/b");
    }
}
