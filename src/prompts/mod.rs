//! Prompts for the two check-in generation calls
//!
//! The coaching prompt yields a short free-text nudge; the actions prompt
//! yields a JSON array of suggested micro-actions.

pub mod actions_prompt;
pub mod coaching_prompt;

pub use actions_prompt::generate_actions_prompt;
pub use coaching_prompt::{fallback_coaching, generate_coaching_prompt};
