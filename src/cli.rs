//! Command-line interface definition for Mindful Social
//!
//! This module defines the CLI structure using clap's derive API. `run`
//! starts the native messaging host; the other commands inspect and edit
//! the local store.

use crate::storage::{ActionKind, Mood};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Mindful Social - mindful check-ins for social-media sessions
///
/// Tracks time spent on social sites reported by the browser extension
/// and interrupts long sessions with a short coaching check-in.
#[derive(Parser, Debug, Clone)]
#[command(name = "mindful-social")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the database directory
    #[arg(long, env = "MINDFUL_STORAGE_PATH")]
    pub storage_path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run as the browser's native messaging host
    Run,

    /// Show consent, interval, the persisted session, and the last check-in
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show aggregate usage statistics
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show per-day mood counts and active minutes
    Insights {
        /// Only the most recent N days
        #[arg(short, long)]
        days: Option<usize>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change tracking settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Manage goals (the first goal guides check-ins)
    Goals {
        #[command(subcommand)]
        command: GoalCommand,
    },

    /// Manage preferred alternative actions
    Actions {
        #[command(subcommand)]
        command: ActionCommand,
    },

    /// Record how you feel right now
    Mood {
        /// inspired, okay, or drained
        mood: Mood,
    },

    /// Export usage and mood data as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete all usage, mood, goal, and action data
    Erase {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Generate a check-in without a browser and print it
    Preview {
        /// Site to pretend the user is on
        #[arg(short, long, default_value = "instagram.com")]
        site: String,

        /// Goal to use instead of the stored primary goal
        #[arg(short, long)]
        goal: Option<String>,
    },
}

/// On/off switch for flags
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> Self {
        toggle == Toggle::On
    }
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print current settings
    Show,

    /// Change consent and/or the check-in interval
    Set {
        /// Grant or withdraw tracking consent
        #[arg(long, value_enum)]
        consent: Option<Toggle>,

        /// Minutes on a tracked site before a check-in (1-1440)
        #[arg(long)]
        interval: Option<u32>,
    },
}

/// Goal subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum GoalCommand {
    /// List goals in order
    List,

    /// Append a goal
    Add { label: String },

    /// Rename a goal
    Update { id: String, label: String },

    /// Remove a goal
    Remove { id: String },
}

/// Kind of an alternative action on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKindArg {
    #[default]
    Link,
    Activity,
}

impl From<ActionKindArg> for ActionKind {
    fn from(kind: ActionKindArg) -> Self {
        match kind {
            ActionKindArg::Link => ActionKind::Link,
            ActionKindArg::Activity => ActionKind::Activity,
        }
    }
}

/// Action subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ActionCommand {
    /// List actions
    List,

    /// Add an action
    Add {
        label: String,

        #[arg(short, long, value_enum, default_value = "link")]
        kind: ActionKindArg,

        /// http(s) URL for link actions
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Replace an action's fields
    Update {
        id: String,

        label: String,

        #[arg(short, long, value_enum, default_value = "link")]
        kind: ActionKindArg,

        #[arg(short, long)]
        url: Option<String>,
    },

    /// Remove an action
    Remove { id: String },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            storage_path: None,
            verbose: false,
            command: Commands::Status { json: false },
        }
    }
}
