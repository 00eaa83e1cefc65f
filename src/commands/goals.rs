//! Goal list management

use crate::cli::GoalCommand;
use crate::error::{MindfulError, Result};
use crate::storage::SessionStore;
use colored::Colorize;
use prettytable::{format, row, Table};

/// Handle goal commands
pub fn handle_goals(store: &SessionStore, command: GoalCommand) -> Result<()> {
    match command {
        GoalCommand::List => {
            let goals = store.goals()?;
            if goals.is_empty() {
                println!("{}", "No goals. Check-ins will use a default goal.".yellow());
                return Ok(());
            }

            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(row!["#".bold(), "ID".bold(), "Goal".bold()]);
            for (index, goal) in goals.iter().enumerate() {
                let marker = if index == 0 {
                    "primary".green().to_string()
                } else {
                    (index + 1).to_string()
                };
                table.add_row(row![marker, goal.id.cyan(), goal.label]);
            }
            table.printstd();
        }
        GoalCommand::Add { label } => {
            let goal = store.add_goal(&label)?;
            println!("{} {}", "Added goal".green(), goal.id.cyan());
        }
        GoalCommand::Update { id, label } => {
            let goal = store.update_goal(&id, &label)?;
            println!("{} {}", "Updated goal".green(), goal.id.cyan());
        }
        GoalCommand::Remove { id } => {
            if !store.remove_goal(&id)? {
                return Err(MindfulError::Validation(format!("No goal with id '{}'", id)).into());
            }
            println!("{} {}", "Removed goal".green(), id.cyan());
        }
    }
    Ok(())
}
