//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Seven-day plan prompt
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");

/// Motivational quote prompt
pub const QUOTE: &str = include_str!("../../prompts/quote.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "plan" => Some(PLAN),
        "quote" => Some(QUOTE),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
