//! Preferred alternative actions

use crate::cli::ActionCommand;
use crate::error::{MindfulError, Result};
use crate::storage::SessionStore;
use colored::Colorize;
use prettytable::{format, row, Table};

/// Handle action commands
pub fn handle_actions(store: &SessionStore, command: ActionCommand) -> Result<()> {
    match command {
        ActionCommand::List => {
            let actions = store.actions()?;
            if actions.is_empty() {
                println!("{}", "No actions yet. Add one with `actions add`.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(row!["ID".bold(), "Label".bold(), "Type".bold(), "URL".bold()]);
            for action in actions {
                table.add_row(row![
                    action.id.cyan(),
                    action.label,
                    action.kind,
                    action.url.unwrap_or_else(|| "-".to_string())
                ]);
            }
            table.printstd();
        }
        ActionCommand::Add { label, kind, url } => {
            let action = store.add_action(&label, kind.into(), url.as_deref())?;
            println!("{} {}", "Added action".green(), action.id.cyan());
        }
        ActionCommand::Update {
            id,
            label,
            kind,
            url,
        } => {
            let action = store.update_action(&id, &label, kind.into(), url.as_deref())?;
            println!("{} {}", "Updated action".green(), action.id.cyan());
        }
        ActionCommand::Remove { id } => {
            if !store.remove_action(&id)? {
                return Err(
                    MindfulError::Validation(format!("No action with id '{}'", id)).into(),
                );
            }
            println!("{} {}", "Removed action".green(), id.cyan());
        }
    }
    Ok(())
}
