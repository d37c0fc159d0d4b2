//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                 |
//! |------------|----------------------------------|
//! | `project`  | `Init`                           |
//! | `config`   | `Config`                         |
//! | `leads`    | `Leads`                          |
//! | `board`    | `Board`, `Move`, `Watch`         |
//! | `stages`   | `Stages`                         |
//! | `tasks`    | `Tasks`                          |
//! | `prefs`    | `Prefs`, `Tour`                  |
//! | `settings` | `Settings`                       |

pub mod board;
pub mod config;
pub mod leads;
pub mod prefs;
pub mod project;
pub mod settings;
pub mod stages;
pub mod tasks;

pub use board::{cmd_board, cmd_move, cmd_watch};
pub use config::cmd_config;
pub use leads::cmd_leads;
pub use prefs::{cmd_prefs, cmd_tour};
pub use project::cmd_init;
pub use settings::cmd_settings;
pub use stages::cmd_stages;
pub use tasks::cmd_tasks;

use anyhow::{Context, Result};
use leadsflow::Workspace;
use leadsflow::config::Config;

/// Open the workspace without touching the backend.
pub(crate) fn open_workspace(config: &Config) -> Result<Workspace> {
    Workspace::connect(config)
}

/// Open the workspace and load the lead list.
pub(crate) async fn load_workspace(config: &Config) -> Result<Workspace> {
    let workspace = Workspace::connect(config)?;
    workspace
        .refresh()
        .await
        .with_context(|| format!("Failed to load leads from {}", config.api_url))?;
    Ok(workspace)
}

/// Ask before a destructive action unless `--yes` was given.
pub(crate) fn confirm(config: &Config, prompt: &str) -> bool {
    use dialoguer::Confirm;

    if config.yes {
        return true;
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}
