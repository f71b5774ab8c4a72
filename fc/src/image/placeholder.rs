//! Placeholder images
//!
//! A deterministic stand-in shown when image generation fails, so the caller
//! always has something to render.

use reqwest::Url;
use tracing::debug;

/// Placeholder service base: 400x300, indigo background, white text
pub const DEFAULT_PLACEHOLDER_BASE: &str = "https://dummyimage.com/400x300/6366f1/ffffff";

/// Placeholder URL with `prompt` as its caption
///
/// Falls back to the default base when `base` does not parse as a URL.
pub fn placeholder_url(base: &str, prompt: &str) -> String {
    debug!(%base, prompt_len = prompt.len(), "placeholder_url: called");
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(e) if base != DEFAULT_PLACEHOLDER_BASE => {
            debug!(error = %e, "placeholder_url: invalid base, using default");
            return placeholder_url(DEFAULT_PLACEHOLDER_BASE, prompt);
        }
        Err(_) => return DEFAULT_PLACEHOLDER_BASE.to_string(),
    };
    url.query_pairs_mut().clear().append_pair("text", prompt.trim());
    url.to_string()
}
