//! Mindful Social - native messaging host and CLI
//!
#![doc = "Mindful Social - mindful check-ins for social-media sessions"]
#![doc = "Main entry point for the native host and the data-management commands."]

use anyhow::Result;

use mindful_social::cli::{Cli, Commands};
use mindful_social::commands;
use mindful_social::config::Config;
use mindful_social::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    config.validate()?;

    match cli.command {
        Commands::Run => {
            tracing::info!("Starting native messaging host");
            commands::run::run_host(config).await?;
        }
        Commands::Status { json } => {
            let store = commands::open_store(&config)?;
            commands::report::show_status(&store, chrono::Utc::now(), json)?;
        }
        Commands::Stats { json } => {
            let store = commands::open_store(&config)?;
            commands::report::show_stats(&store, json)?;
        }
        Commands::Insights { days, json } => {
            let store = commands::open_store(&config)?;
            commands::report::show_insights(&store, days, json)?;
        }
        Commands::Settings { command } => {
            let store = commands::open_store(&config)?;
            commands::settings::handle_settings(&store, command)?;
        }
        Commands::Goals { command } => {
            let store = commands::open_store(&config)?;
            commands::goals::handle_goals(&store, command)?;
        }
        Commands::Actions { command } => {
            let store = commands::open_store(&config)?;
            commands::actions::handle_actions(&store, command)?;
        }
        Commands::Mood { mood } => {
            let store = commands::open_store(&config)?;
            commands::data::record_mood(&store, mood, chrono::Utc::now())?;
        }
        Commands::Export { output } => {
            let store = commands::open_store(&config)?;
            commands::data::export(&store, output.as_deref(), chrono::Utc::now())?;
        }
        Commands::Erase { yes } => {
            let store = commands::open_store(&config)?;
            commands::data::erase(&store, yes)?;
        }
        Commands::Preview { site, goal } => {
            tracing::info!("Generating preview check-in for {}", site);
            let store = commands::open_store(&config)?;
            commands::preview::run_preview(&config, &store, &site, goal).await?;
        }
    }

    Ok(())
}
