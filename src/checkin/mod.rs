//! Check-in pipeline: link resolution, content generation, and delivery

pub mod generator;
pub mod links;
pub mod orchestrator;

pub use generator::{extract_actions, fallback_actions, CheckinContent, CheckinGenerator};
pub use links::{create_link_resolver, InstantAnswerResolver, LinkResolver, SearchLinkResolver};
pub use orchestrator::CheckinOrchestrator;
