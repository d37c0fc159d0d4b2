//! Lead commands: `leadsflow leads ...`.

use anyhow::{Context, Result, bail};
use console::style;
use leadsflow::Workspace;
use leadsflow::config::Config;
use leadsflow::ui::icons::{CHECK, CROSS, ROBOT, STAR, TRASH, WARN};
use leadsflow::ui::{DeleteProgress, progress::report_lines};
use leadsflow_common::{Lead, LeadPatch, NewLead};
use std::path::Path;
use tracing::warn;

use super::super::{LeadFields, LeadsCommands};
use super::{confirm, load_workspace};

pub async fn cmd_leads(config: &Config, command: LeadsCommands) -> Result<()> {
    match command {
        LeadsCommands::List { stage, json } => list(config, stage.as_deref(), json).await,
        LeadsCommands::Show { id } => show(config, &id).await,
        LeadsCommands::Add { name, fields } => add(config, name, fields).await,
        LeadsCommands::Edit { id, name, fields } => edit(config, &id, name, fields).await,
        LeadsCommands::Status { id, status } => {
            let workspace = load_workspace(config).await?;
            let lead = workspace.change_status(&id, &status).await?;
            println!("{}{} is now '{}'", CHECK, lead.name, lead.status);
            Ok(())
        }
        LeadsCommands::Flag { id, flag, off } => {
            let workspace = load_workspace(config).await?;
            let lead = workspace.set_flag(&id, flag, !off).await?;
            println!(
                "{}{}: {} {}",
                CHECK,
                lead.name,
                flag.as_str(),
                if lead.flag(flag) { "on" } else { "off" }
            );
            Ok(())
        }
        LeadsCommands::Delete { ids } => delete(config, ids).await,
        LeadsCommands::Import { file } => import(config, &file).await,
        LeadsCommands::Dedupe { dry_run } => dedupe(config, dry_run).await,
    }
}

fn flags(lead: &Lead) -> String {
    let mut out = String::new();
    if lead.favorite {
        out.push_str(&STAR.to_string());
    }
    if lead.ai_enabled {
        out.push_str(&ROBOT.to_string());
    }
    out
}

fn print_table(leads: &[Lead]) {
    println!();
    println!(
        "{:<14} {:<24} {:<14} {:<28} {:>10}",
        "ID", "Name", "Status", "Contact", "Value"
    );
    println!(
        "{:<14} {:<24} {:<14} {:<28} {:>10}",
        "--------------",
        "------------------------",
        "--------------",
        "----------------------------",
        "----------"
    );
    for lead in leads {
        println!(
            "{:<14} {:<24} {:<14} {:<28} {:>10} {}",
            lead.id,
            lead.name,
            lead.status,
            lead.contact().unwrap_or("-"),
            lead.deal_value
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string()),
            flags(lead)
        );
    }
    println!();
    println!("{} lead(s)", leads.len());
}

async fn list(config: &Config, stage: Option<&str>, json: bool) -> Result<()> {
    let workspace = load_workspace(config).await?;
    let leads = match stage {
        None => workspace.leads(),
        Some(stage) => workspace
            .board()
            .into_iter()
            .find(|c| c.stage.id == stage || c.stage.matches_status(stage))
            .map(|c| c.leads)
            .with_context(|| format!("Unknown stage '{}'; see `leadsflow stages list`", stage))?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&leads)?);
    } else {
        print_table(&leads);
    }
    Ok(())
}

fn cached(workspace: &Workspace, id: &str) -> Result<Lead> {
    workspace
        .lead(id)
        .with_context(|| format!("Lead '{}' not found", id))
}

async fn show(config: &Config, id: &str) -> Result<()> {
    let workspace = load_workspace(config).await?;
    let lead = cached(&workspace, id)?;
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!();
    println!("{} {}", style(&lead.name).bold(), flags(&lead));
    println!("  id:        {}", lead.id);
    println!("  status:    {}", lead.status);
    println!("  phone:     {}", optional(&lead.phone));
    println!("  email:     {}", optional(&lead.email));
    println!("  interest:  {}", optional(&lead.interest));
    println!("  origin:    {}", optional(&lead.origin));
    if let Some(value) = lead.deal_value {
        println!("  value:     {:.2}", value);
    }
    println!("  created:   {}", lead.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(converted) = lead.converted_at {
        println!("  converted: {}", converted.format("%Y-%m-%d %H:%M"));
    }
    println!();
    Ok(())
}

async fn add(config: &Config, name: String, fields: LeadFields) -> Result<()> {
    let workspace = load_workspace(config).await?;
    let lead = NewLead {
        name,
        phone: fields.phone,
        email: fields.email,
        interest: fields.interest,
        origin: fields.origin,
        status: fields.status,
        deal_value: fields.value,
    };
    let created = workspace.create_lead(lead).await?;
    println!("{}Created lead {} ({})", CHECK, created.name, created.id);
    if let Some(remaining) = workspace.usage().remaining() {
        println!("  {} lead(s) left on the current plan", remaining);
    }
    Ok(())
}

async fn edit(config: &Config, id: &str, name: Option<String>, fields: LeadFields) -> Result<()> {
    let workspace = load_workspace(config).await?;
    let patch = LeadPatch {
        name,
        phone: fields.phone,
        email: fields.email,
        interest: fields.interest,
        origin: fields.origin,
        status: fields.status,
        deal_value: fields.value,
        ..LeadPatch::default()
    };
    let lead = workspace.edit_lead(id, patch).await?;
    println!("{}Updated {}", CHECK, lead.name);
    Ok(())
}

async fn delete(config: &Config, ids: Vec<String>) -> Result<()> {
    let workspace = load_workspace(config).await?;

    if let [id] = ids.as_slice() {
        let name = cached(&workspace, id)?.name;
        if !confirm(config, &format!("Delete lead '{}'?", name)) {
            println!("Deletion cancelled");
            return Ok(());
        }
        workspace.delete_lead(id).await?;
        println!("{}Deleted {}", TRASH, name);
        return Ok(());
    }

    if !confirm(config, &format!("Delete {} leads?", ids.len())) {
        println!("Deletion cancelled");
        return Ok(());
    }

    let progress = DeleteProgress::new(ids.len() as u64);
    let outcome = workspace
        .delete_leads(&ids, |done, total| progress.update(done, total))
        .await;
    progress.finish(&outcome.report);
    for line in report_lines(&outcome.report) {
        println!("{}", line);
    }

    if let Some(reconcile) = outcome.reconcile {
        match reconcile.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Refresh after bulk delete failed"),
            Err(e) => warn!(error = %e, "Refresh task after bulk delete panicked"),
        }
    }

    let report = outcome.report;
    if report.aborted {
        bail!("Backend unreachable; deletion stopped after {} lead(s)", report.deleted_count());
    }
    if report.errors > 0 {
        bail!("{} of {} deletion(s) failed", report.errors, report.requested);
    }
    Ok(())
}

async fn import(config: &Config, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let leads: Vec<NewLead> = serde_json::from_str(&content)
        .with_context(|| format!("{} must contain a JSON array of leads", file.display()))?;

    let workspace = load_workspace(config).await?;
    let report = workspace.import_leads(leads).await?;

    println!(
        "{}Imported {} lead(s), {} skipped as duplicates",
        CHECK, report.summary.imported, report.summary.skipped
    );
    if !report.invalid.is_empty() {
        println!("{}{} row(s) rejected:", CROSS, report.invalid.len());
        for row in &report.invalid {
            println!("  - row {} ({}): {}", row.index + 1, row.name, row.error);
        }
    }
    if report.over_limit > 0 {
        println!(
            "{}{} row(s) not sent: plan lead limit reached",
            WARN, report.over_limit
        );
    }
    Ok(())
}

async fn dedupe(config: &Config, dry_run: bool) -> Result<()> {
    let workspace = load_workspace(config).await?;

    if dry_run {
        let groups = workspace.find_duplicates();
        if groups.is_empty() {
            println!("No duplicates found.");
            return Ok(());
        }
        for group in &groups {
            println!(
                "{:?} {}: {}",
                group.field,
                style(&group.key).bold(),
                group.lead_ids.join(", ")
            );
        }
        println!();
        println!("{} duplicate group(s)", groups.len());
        return Ok(());
    }

    if !confirm(config, "Remove duplicate leads on the backend?") {
        println!("Cancelled");
        return Ok(());
    }
    let removed = workspace.remove_duplicates().await?;
    println!("{}Removed {} duplicate lead(s)", CHECK, removed);
    Ok(())
}
