//! Configuration view and validation commands: `leadsflow config`.

use anyhow::Result;
use leadsflow::config::Config;
use leadsflow::leadsflow_config::{ENV_API_TOKEN, LeadsflowToml};

use super::super::ConfigCommands;

fn print_toml(toml: &LeadsflowToml) {
    println!("[api]");
    println!("  base_url = \"{}\"", toml.api.base_url);
    println!("  timeout_secs = {}", toml.api.timeout_secs);
    println!();
    println!("[account]");
    match &toml.account.user {
        Some(user) => println!("  user = \"{}\"", user),
        None => println!("  user = (unset)"),
    }
    match toml.account.lead_limit {
        Some(limit) => println!("  lead_limit = {}", limit),
        None => println!("  lead_limit = (unlimited)"),
    }
    println!();
    println!("[sync]");
    println!("  refresh_interval_secs = {}", toml.sync.refresh_interval_secs);
    println!();
    println!("[bulk_delete]");
    println!("  chunk_size = {}", toml.bulk_delete.chunk_size);
    println!();
}

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = &config.config_file;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("LeadsFlow Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No leadsflow.toml found at {}", config_path.display());
                println!("Using default configuration:");
            }
            println!();
            print_toml(config.toml());

            println!("Effective values (with env/CLI overrides):");
            println!("  home = \"{}\"", config.home.display());
            println!("  api_url = \"{}\"", config.api_url);
            println!("  user = \"{}\"", config.user);
            println!(
                "  api_token = {}",
                if config.api_token.is_some() {
                    "(set)".to_string()
                } else {
                    format!("(unset; export {})", ENV_API_TOKEN)
                }
            );
            println!();
            if !config_path.exists() {
                println!("Run 'leadsflow config init' to create a leadsflow.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No leadsflow.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = LeadsflowToml::load(config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("leadsflow.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config.home)?;
            LeadsflowToml::default().save(config_path)?;

            println!("Created leadsflow.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, timeout_secs");
            println!("  - [account] user, lead_limit");
            println!("  - [sync] refresh_interval_secs");
            println!("  - [bulk_delete] chunk_size");
            println!();
        }
    }

    Ok(())
}
