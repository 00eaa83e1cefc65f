//! Generate a check-in without a browser

use crate::checkin::{create_link_resolver, CheckinContent, CheckinGenerator};
use crate::config::Config;
use crate::error::Result;
use crate::providers::{create_provider, Provider};
use crate::storage::{LinkSource, SessionStore};
use colored::Colorize;
use std::sync::Arc;

/// Generate content for `site` with the stored (or given) goal and seeds
pub async fn generate_preview(
    config: &Config,
    store: &SessionStore,
    site: &str,
    goal: Option<String>,
) -> Result<(String, CheckinContent)> {
    let goal = match goal {
        Some(goal) => goal,
        None => store.primary_goal()?,
    };
    let seeds = store.seed_actions()?;

    let provider: Arc<dyn Provider> = Arc::from(create_provider(&config.generation)?);
    let generator = CheckinGenerator::new(
        provider,
        create_link_resolver(&config.links)?,
        &config.generation,
    );

    let content = generator.generate(&goal, site, &seeds).await;
    Ok((goal, content))
}

/// Print a generated check-in
pub async fn run_preview(
    config: &Config,
    store: &SessionStore,
    site: &str,
    goal: Option<String>,
) -> Result<()> {
    let (goal, content) = generate_preview(config, store, site, goal).await?;

    println!("\n{} {}\n", "Goal:".bold(), goal);
    println!("{}\n", content.coaching.italic());
    for (index, action) in content.actions.iter().enumerate() {
        let source = match action.source {
            LinkSource::UserProvided => "your link".green(),
            LinkSource::AutoSearched => "searched".dimmed(),
        };
        println!("{}. {} ({})", index + 1, action.label.bold(), source);
        println!("   {}", action.url.cyan());
    }
    println!();
    Ok(())
}
