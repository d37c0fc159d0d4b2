//! Preference and tour commands: `leadsflow prefs`, `leadsflow tour`.

use anyhow::Result;
use leadsflow::config::Config;
use leadsflow::ui::icons::CHECK;

use super::super::{PrefsCommands, TourCommands};
use super::open_workspace;

pub fn cmd_prefs(config: &Config, command: Option<PrefsCommands>) -> Result<()> {
    let workspace = open_workspace(config)?;

    let prefs = match command {
        None | Some(PrefsCommands::Show) => workspace.preferences(),
        Some(PrefsCommands::Set { key, value }) => {
            let prefs = workspace.set_preference(&key, &value)?;
            println!("{}Saved {}", CHECK, key);
            prefs
        }
    };

    println!();
    println!("theme = {}", prefs.theme);
    println!("sidebar_open = {}", prefs.sidebar_open);
    println!("language = {}", prefs.language);
    println!();
    Ok(())
}

pub fn cmd_tour(config: &Config, command: TourCommands) -> Result<()> {
    let workspace = open_workspace(config)?;

    match command {
        TourCommands::Done { name } => {
            workspace.complete_tour(&name)?;
            println!("{}Tour '{}' marked as completed", CHECK, name);
        }
        TourCommands::Status { name } => {
            let state = if workspace.tour_completed(&name) {
                "completed"
            } else {
                "not completed"
            };
            println!("Tour '{}': {}", name, state);
        }
    }
    Ok(())
}
