//! Funnel commands: `leadsflow board`, `leadsflow move`, `leadsflow watch`.

use anyhow::Result;
use chrono::Local;
use leadsflow::config::Config;
use leadsflow::refresh::Poller;
use leadsflow::ui::icons::{CHECK, FUNNEL, REFRESH};
use leadsflow::ui::{render_board, render_summary, terminal_width};
use std::time::Duration;
use tokio::sync::watch;

use super::load_workspace;

pub async fn cmd_board(config: &Config) -> Result<()> {
    let workspace = load_workspace(config).await?;
    println!();
    println!("{}", render_board(&workspace.board(), terminal_width()));
    println!();
    println!("{}{}", FUNNEL, render_summary(&workspace.summary()));
    Ok(())
}

pub async fn cmd_move(config: &Config, lead_id: &str, stage_id: &str) -> Result<()> {
    let workspace = load_workspace(config).await?;
    let lead = workspace.move_lead_to_stage(lead_id, stage_id).await?;
    println!("{}{} moved to '{}'", CHECK, lead.name, lead.status);
    Ok(())
}

pub async fn cmd_watch(config: &Config, interval: Option<u64>) -> Result<()> {
    let workspace = load_workspace(config).await?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or(config.refresh_interval)
        .max(Duration::from_secs(1));

    println!("{}", render_summary(&workspace.summary()));
    println!();
    println!(
        "Refreshing every {}s. Press Ctrl-C to stop.",
        interval.as_secs()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let observed = workspace.clone();
    let poller = Poller::spawn_with(workspace, interval, shutdown_rx, move |stats| {
        println!();
        println!(
            "{}{} {} lead(s), {} hidden",
            REFRESH,
            Local::now().format("%H:%M:%S"),
            stats.cached,
            stats.hidden
        );
        println!("{}", render_summary(&observed.summary()));
    });

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(true);
    poller.await?;
    Ok(())
}
