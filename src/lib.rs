//! Mindful Social - session tracking and mindful check-ins
//!
//! This library is the native side of a browser extension. It follows the
//! user's time on a fixed set of social-media sites, persists daily usage,
//! and interrupts long sessions with a short coaching check-in plus a few
//! suggested alternative actions.
//!
//! # Architecture
//!
//! - `sites`: URL classification against the tracked-site table
//! - `storage`: durable session, usage, settings, goals, actions, and moods
//! - `tracker`: the session state machine, reminder, and runtime loop
//! - `host`: browser abstraction and the native messaging implementation
//! - `providers`: chat-completions text generation
//! - `prompts`: coaching and suggested-action prompts
//! - `checkin`: link resolution, generation with fallbacks, and delivery
//! - `config`, `logging`, `error`, `cli`, `commands`: the ambient stack
//!
//! # Example
//!
//! ```no_run
//! use mindful_social::{Config, cli::Cli};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Cli::default())?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod checkin;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod sites;
pub mod storage;
pub mod tracker;

// Re-export commonly used types
pub use config::Config;
pub use error::{MindfulError, Result};
pub use sites::{classify, extract_domain, Classification};
pub use storage::SessionStore;
pub use tracker::SessionTracker;

#[cfg(test)]
pub mod test_utils;
