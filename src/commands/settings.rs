//! Consent and check-in interval

use crate::cli::{SettingsCommand, Toggle};
use crate::error::{MindfulError, Result};
use crate::storage::{SessionStore, Settings};
use colored::Colorize;

/// Handle settings commands
pub fn handle_settings(store: &SessionStore, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => print_settings(&store.settings()?),
        SettingsCommand::Set { consent, interval } => {
            let settings = apply(store, consent, interval)?;
            println!("{}", "Settings saved.".green());
            print_settings(&settings);
        }
    }
    Ok(())
}

/// Apply requested changes; at least one must be given
///
/// An invalid interval is rejected before anything is written.
pub fn apply(
    store: &SessionStore,
    consent: Option<Toggle>,
    interval: Option<u32>,
) -> Result<Settings> {
    if consent.is_none() && interval.is_none() {
        return Err(MindfulError::Validation(
            "Nothing to change: pass --consent and/or --interval".to_string(),
        )
        .into());
    }

    let mut settings = store.settings()?;
    if let Some(consent) = consent {
        settings.consent_granted = consent.into();
    }
    if let Some(minutes) = interval {
        settings.checkin_interval_minutes = minutes;
    }
    store.save_settings(&settings)?;
    Ok(settings)
}

fn print_settings(settings: &Settings) {
    let consent = if settings.consent_granted {
        "on".green()
    } else {
        "off".yellow()
    };
    println!("Consent:   {}", consent);
    println!("Interval:  {} minutes", settings.checkin_interval_minutes);
}
