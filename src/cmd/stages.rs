//! Funnel stage configuration: `leadsflow stages ...`.

use anyhow::{Result, bail};
use console::style;
use leadsflow::config::Config;
use leadsflow::ui::icons::{CHECK, TROPHY};
use leadsflow_common::StageOutcome;

use super::super::StagesCommands;
use super::{confirm, open_workspace};

/// 1-based CLI position to a board index.
fn index(position: usize) -> Result<usize> {
    if position == 0 {
        bail!("Stage positions start at 1");
    }
    Ok(position - 1)
}

pub fn cmd_stages(config: &Config, command: Option<StagesCommands>) -> Result<()> {
    let workspace = open_workspace(config)?;

    match command {
        None | Some(StagesCommands::List) => {
            println!();
            println!(
                "{:<4} {:<20} {:<24} {:<9} {:<8} Status value",
                "#", "ID", "Label", "Color", "Outcome"
            );
            println!(
                "{:<4} {:<20} {:<24} {:<9} {:<8} ------------",
                "--", "--------------------", "------------------------", "-------", "-------"
            );
            for (i, stage) in workspace.stages().iter().enumerate() {
                let marker = if stage.outcome == StageOutcome::Won {
                    TROPHY.to_string()
                } else {
                    String::new()
                };
                println!(
                    "{:<4} {:<20} {:<24} {:<9} {:<8} {}{}",
                    i + 1,
                    stage.id,
                    stage.label,
                    stage.color,
                    stage.outcome.as_str(),
                    marker,
                    style(stage.effective_status()).dim()
                );
            }
            println!();
        }
        Some(StagesCommands::Add { label, color }) => {
            let stage = workspace.add_stage(&label, &color)?;
            println!("{}Added stage '{}' ({})", CHECK, stage.label, stage.id);
        }
        Some(StagesCommands::Rename { id, label }) => {
            workspace.rename_stage(&id, &label)?;
            println!("{}Renamed stage {} to '{}'", CHECK, id, label.trim());
        }
        Some(StagesCommands::Color { id, color }) => {
            workspace.recolor_stage(&id, &color)?;
            println!("{}Recolored stage {}", CHECK, id);
        }
        Some(StagesCommands::Outcome { id, outcome }) => {
            workspace.set_stage_outcome(&id, outcome)?;
            println!("{}Stage {} is now {}", CHECK, id, outcome.as_str());
        }
        Some(StagesCommands::Remove { id }) => {
            if !confirm(
                config,
                &format!("Remove stage '{}'? Its leads will show in the first stage.", id),
            ) {
                println!("Cancelled");
                return Ok(());
            }
            let removed = workspace.remove_stage(&id)?;
            println!("{}Removed stage '{}'", CHECK, removed.label);
        }
        Some(StagesCommands::Move { from, to }) => {
            workspace.move_stage(index(from)?, index(to)?)?;
            println!("{}Moved stage from position {} to {}", CHECK, from, to);
        }
        Some(StagesCommands::Reset) => {
            if !confirm(config, "Restore the default stages? Custom stages are removed.") {
                println!("Cancelled");
                return Ok(());
            }
            workspace.reset_stages()?;
            println!("{}Default stages restored", CHECK);
        }
    }

    Ok(())
}
