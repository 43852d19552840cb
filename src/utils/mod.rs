//! Utility functions
//!
//! - `url` - permanent-link parsing and token normalization

pub mod url;

// Re-export commonly used items for convenience
pub use url::{extract_token_from_perma_url, normalize_token};
