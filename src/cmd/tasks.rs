//! Task commands: `leadsflow tasks ...`.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use console::style;
use leadsflow::config::Config;
use leadsflow::tasks::TaskFilter;
use leadsflow::ui::icons::{CHECK, CLOCK, PIN};
use leadsflow_common::{NewTask, Task, TaskPatch, TaskStatus};

use super::super::TasksCommands;
use super::open_workspace;

/// `YYYY-MM-DD` (end of that day, UTC) or a full RFC 3339 timestamp.
pub(crate) fn parse_due(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid due date '{}': expected YYYY-MM-DD or RFC 3339", raw))?;
    date.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("Invalid due date '{}'", raw))
}

fn short_id(task: &Task) -> String {
    task.id.to_string()[..8].to_string()
}

fn print_tasks(tasks: &[&Task], now: DateTime<Utc>) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    println!();
    println!(
        "{:<9} {:<10} {:<8} {:<10} {:<17} Title",
        "ID", "Type", "Priority", "Status", "Due"
    );
    println!(
        "{:<9} {:<10} {:<8} {:<10} {:<17} -----",
        "--------", "----------", "--------", "----------", "-----------------"
    );
    for task in tasks {
        let due = task
            .due_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let due = if task.is_overdue(now) {
            style(due).red().to_string()
        } else {
            due
        };
        let lead = task
            .lead_id
            .as_deref()
            .map(|id| format!(" [lead {}]", id))
            .unwrap_or_default();
        println!(
            "{:<9} {:<10} {:<8} {:<10} {:<17} {}{}",
            short_id(task),
            task.kind.as_str(),
            task.priority.as_str(),
            task.status.as_str(),
            due,
            task.title,
            style(lead).dim()
        );
    }
    println!();
}

pub fn cmd_tasks(config: &Config, command: Option<TasksCommands>) -> Result<()> {
    let workspace = open_workspace(config)?;
    let now = Utc::now();

    match command {
        None => {
            let book = workspace.tasks();
            let filter = TaskFilter {
                status: Some(TaskStatus::Pending),
                ..TaskFilter::default()
            };
            print_tasks(&book.list(&filter), now);
        }
        Some(TasksCommands::List { status, lead, kind }) => {
            let book = workspace.tasks();
            let filter = TaskFilter {
                status,
                lead_id: lead,
                kind,
            };
            print_tasks(&book.list(&filter), now);
        }
        Some(TasksCommands::Add {
            title,
            kind,
            priority,
            due,
            lead,
            description,
        }) => {
            let mut task = NewTask::new(title, kind);
            task.priority = priority;
            task.due_at = due.as_deref().map(parse_due).transpose()?;
            task.lead_id = lead;
            task.description = description;
            let created = workspace.update_tasks(|book| book.add(task, now).cloned())?;
            println!("{}Added task {} ({})", PIN, created.title, short_id(&created));
        }
        Some(TasksCommands::Edit {
            id,
            title,
            kind,
            priority,
            due,
            no_due,
        }) => {
            let due_at = if no_due {
                Some(None)
            } else {
                due.as_deref().map(parse_due).transpose()?.map(Some)
            };
            let patch = TaskPatch {
                title,
                kind,
                priority,
                due_at,
                ..TaskPatch::default()
            };
            let task = workspace.update_tasks(|book| {
                let id = book.resolve(&id)?;
                book.update(id, patch).cloned()
            })?;
            println!("{}Updated task {}", CHECK, task.title);
        }
        Some(TasksCommands::Done { id }) => {
            let task = workspace.update_tasks(|book| {
                let id = book.resolve(&id)?;
                book.complete(id, now).cloned()
            })?;
            println!("{}Completed: {}", CHECK, task.title);
        }
        Some(TasksCommands::Cancel { id }) => {
            let task = workspace.update_tasks(|book| {
                let id = book.resolve(&id)?;
                book.cancel(id).cloned()
            })?;
            println!("Cancelled: {}", task.title);
        }
        Some(TasksCommands::Reopen { id }) => {
            let task = workspace.update_tasks(|book| {
                let id = book.resolve(&id)?;
                book.reopen(id).cloned()
            })?;
            println!("Reopened: {}", task.title);
        }
        Some(TasksCommands::Remove { id }) => {
            let task = workspace.update_tasks(|book| {
                let id = book.resolve(&id)?;
                book.remove(id)
            })?;
            println!("Removed: {}", task.title);
        }
        Some(TasksCommands::Overdue) => {
            let book = workspace.tasks();
            let overdue = book.overdue(now);
            println!("{}{} overdue task(s)", CLOCK, overdue.len());
            print_tasks(&overdue, now);
        }
        Some(TasksCommands::Today) => {
            let book = workspace.tasks();
            print_tasks(&book.due_on(now.date_naive()), now);
        }
    }

    Ok(())
}
