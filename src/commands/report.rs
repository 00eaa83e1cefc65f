//! Read-only reports: status, stats, and mood insights

use crate::commands::truncate;
use crate::error::{MindfulError, Result};
use crate::storage::{CheckinRecord, DailyMoodSummary, Session, SessionStore, UsageEntry};
use chrono::{DateTime, Utc};
use colored::Colorize;
use prettytable::{format, row, Table};
use serde_json::json;

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(MindfulError::Serialization)?;
    println!("{}", json);
    Ok(())
}

/// Show settings, the persisted session, today's usage, and the last check-in
pub fn show_status(store: &SessionStore, now: DateTime<Utc>, as_json: bool) -> Result<()> {
    let settings = store.settings()?;
    let session = store.session()?;
    let today = store.usage_for(now.date_naive())?;
    let last = store.last_checkin()?;

    if as_json {
        return print_json(&json!({
            "settings": settings,
            "session": session,
            "today": today,
            "last_checkin": last,
        }));
    }

    println!("\n{}\n", "Mindful Social Status".bold());
    let consent = if settings.consent_granted {
        "granted".green()
    } else {
        "not granted (tracking paused)".yellow()
    };
    println!("Consent:          {}", consent);
    println!(
        "Check-in every:   {} minutes",
        settings.checkin_interval_minutes
    );

    match &session {
        Some(session) => println!("Session:          {}", describe_session(session, now)),
        None => println!("Session:          {}", "idle".dimmed()),
    }

    if today.is_empty() {
        println!("\n{}", "No usage recorded today.".yellow());
    } else {
        println!("\nToday:");
        usage_table(&today).printstd();
    }

    if let Some(record) = &last {
        print_last_checkin(record);
    }
    println!();
    Ok(())
}

/// One-line description of a session
pub fn describe_session(session: &Session, now: DateTime<Utc>) -> String {
    let mut text = format!(
        "{} ({}) on tab {}, {:.1} min so far",
        session.app_name,
        session.domain,
        session.tab_id,
        session.elapsed_minutes(now)
    );
    if session.checkin_fired {
        text.push_str(", check-in shown");
    }
    text
}

fn usage_table(entries: &[UsageEntry]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "Date".bold(),
        "Site".bold(),
        "Minutes".bold(),
        "Check-ins".bold(),
        "Mood".bold()
    ]);
    for entry in entries {
        table.add_row(row![
            entry.date,
            entry.app_name,
            format!("{:.1}", entry.duration_minutes),
            entry.checkins_triggered,
            entry
                .mood
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string())
        ]);
    }
    table
}

fn print_last_checkin(record: &CheckinRecord) {
    println!(
        "\nLast check-in:    {} on {} ({})",
        record.at.format("%Y-%m-%d %H:%M"),
        record.domain,
        record.outcome
    );
    println!("  {}", truncate(&record.coaching, 100).italic());
    for action in &record.actions {
        println!("  - {} {}", action.label, action.url.cyan());
    }
}

/// Aggregate statistics across all tracked days
pub fn show_stats(store: &SessionStore, as_json: bool) -> Result<()> {
    let stats = store.stats()?;
    if as_json {
        return print_json(&stats);
    }

    if stats.days_tracked == 0 {
        println!("{}", "No usage recorded yet.".yellow());
        return Ok(());
    }

    println!("\n{}\n", "Usage Statistics".bold());
    println!("Days tracked:       {}", stats.days_tracked);
    println!("Total minutes:      {:.1}", stats.total_minutes);
    println!("Average per day:    {:.1} minutes", stats.average_minutes_per_day);
    println!("Check-ins:          {}", stats.total_checkins);
    println!();
    Ok(())
}

/// Per-day mood counts, most recent first
pub fn show_insights(store: &SessionStore, days: Option<usize>, as_json: bool) -> Result<()> {
    let mut summaries = store.mood_insights()?;
    if let Some(days) = days {
        summaries.truncate(days);
    }

    if as_json {
        return print_json(&summaries);
    }

    if summaries.is_empty() {
        println!("{}", "No mood or usage data yet.".yellow());
        return Ok(());
    }

    println!("\n{}", "Mood Insights".bold());
    insights_table(&summaries).printstd();
    println!();
    Ok(())
}

fn insights_table(summaries: &[DailyMoodSummary]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "Date".bold(),
        "Inspired".bold(),
        "Okay".bold(),
        "Drained".bold(),
        "Minutes".bold()
    ]);
    for day in summaries {
        table.add_row(row![
            day.date,
            day.inspired.to_string().green(),
            day.okay,
            day.drained.to_string().red(),
            format!("{:.1}", day.minutes_active)
        ]);
    }
    table
}
