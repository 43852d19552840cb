//! # saavn-augment
//!
//! Library for augmenting opaque JSON payloads returned by an upstream
//! media-catalog API. It walks the whole document tree and, for every map
//! node that carries the relevant fields:
//!
//! - decodes obfuscated media references into quality-tiered download links
//! - expands image URLs into resolution-tiered variants
//! - extracts the canonical token from permanent links
//! - strips the raw encrypted fields
//! - consolidates everything into a ranked `urls` list plus a `bestUrl`
//!
//! ## Module organization
//!
//! - `core` - tree walker, consolidation and sanitization logic
//! - `links` - media URL decoding and image variant generation
//! - `utils` - URL helpers and token extraction

pub mod core;
pub mod links;
pub mod utils;

// Re-export commonly used items for convenience
pub use crate::core::augment_media_links;
pub use crate::links::{create_download_links, create_image_links, DownloadLink, ImageLink};
pub use crate::utils::url::{extract_token_from_perma_url, normalize_token};
