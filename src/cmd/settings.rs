//! Remote account settings: `leadsflow settings`.

use anyhow::{Result, bail};
use leadsflow::config::Config;
use leadsflow::ui::icons::CHECK;
use serde_json::Value;

use super::super::SettingsCommands;
use super::open_workspace;

/// JSON when it parses (numbers, booleans, objects), otherwise a plain string.
pub(crate) fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn cmd_settings(config: &Config, command: SettingsCommands) -> Result<()> {
    let workspace = open_workspace(config)?;

    match command {
        SettingsCommands::Get { key: None } => {
            let settings = workspace.remote_settings().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsCommands::Get { key: Some(key) } => {
            let settings = workspace.remote_settings().await?;
            match settings.get(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
                None => bail!("Setting '{}' is not set", key),
            }
        }
        SettingsCommands::Set { key, value } => {
            workspace.set_remote_setting(&key, parse_value(&value)).await?;
            println!("{}Saved setting {}", CHECK, key);
        }
    }
    Ok(())
}
