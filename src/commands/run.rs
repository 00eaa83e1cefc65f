//! Native messaging host command
//!
//! Wires the store, the browser channel on stdin/stdout, the generation
//! provider, and the link resolver into a [`SessionTracker`] and runs it
//! until the browser disconnects or the process is interrupted.

use crate::checkin::{create_link_resolver, CheckinGenerator, CheckinOrchestrator};
use crate::commands::open_store;
use crate::config::Config;
use crate::error::Result;
use crate::host::{connect_stdio, BrowserHost};
use crate::providers::{create_provider, Provider};
use crate::storage::SessionStore;
use crate::tracker::{Clock, SessionTracker, SystemClock, TrackerOptions};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Assemble a tracker from configuration and its collaborators
///
/// # Errors
///
/// Returns error if the provider or link resolver cannot be created
pub fn build_tracker(
    config: &Config,
    store: Arc<SessionStore>,
    host: Arc<dyn BrowserHost>,
    clock: Arc<dyn Clock>,
) -> Result<SessionTracker> {
    let provider: Arc<dyn Provider> = Arc::from(create_provider(&config.generation)?);
    let links = create_link_resolver(&config.links)?;
    let generator = CheckinGenerator::new(provider, links, &config.generation);
    let orchestrator = Arc::new(CheckinOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&host),
        generator,
        config.tracker.injection_settle(),
    ));

    Ok(SessionTracker::new(
        store,
        host,
        orchestrator,
        clock,
        TrackerOptions::from(&config.tracker),
    ))
}

/// Run as the browser's native messaging host
pub async fn run_host(config: Config) -> Result<()> {
    let store = Arc::new(open_store(&config)?);
    let cancel = CancellationToken::new();
    let channel = connect_stdio(config.tracker.host_request_timeout(), cancel.clone());
    let host: Arc<dyn BrowserHost> = channel.host.clone();

    let mut tracker = build_tracker(&config, store, host, Arc::new(SystemClock))?;
    tracker.restore().await;

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            interrupt.cancel();
        }
    });

    tracker.run(channel.events, cancel.clone()).await;
    cancel.cancel();
    for task in channel.tasks {
        if let Err(e) = task.await {
            tracing::warn!("Host I/O task ended abnormally: {}", e);
        }
    }

    tracing::info!("Native host stopped");
    Ok(())
}
