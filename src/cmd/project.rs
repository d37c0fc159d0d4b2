//! `leadsflow init`.

use anyhow::Result;
use leadsflow::config::Config;
use leadsflow::leadsflow_config::LeadsflowToml;
use leadsflow::store::Store;
use leadsflow::ui::icons::CHECK;

pub fn cmd_init(config: &Config) -> Result<()> {
    config.ensure_directories()?;

    let wrote_config = if config.config_file.exists() {
        false
    } else {
        LeadsflowToml::default().save(&config.config_file)?;
        true
    };
    let created_store = Store::init(&config.home)?;

    if wrote_config || created_store {
        println!("{}Initialized LeadsFlow at {}", CHECK, config.home.display());
        println!();
        println!("  {}/", config.home.display());
        println!("  ├── leadsflow.toml   # API URL, account, sync and bulk delete settings");
        println!("  ├── store.json       # Stages, tasks, preferences (this device only)");
        println!("  └── logs/");
        println!();
        println!("Next steps:");
        println!("  1. Set api.base_url in leadsflow.toml (or LEADSFLOW_API_URL)");
        println!("  2. Export LEADSFLOW_API_TOKEN");
        println!("  3. Run `leadsflow board`");
    } else {
        println!("LeadsFlow already initialized at {}", config.home.display());
    }
    Ok(())
}
