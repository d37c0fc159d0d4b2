use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Call,
    Email,
    #[serde(rename = "whatsapp")]
    WhatsApp,
    Meeting,
    FollowUp,
    Other,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::WhatsApp => "whatsapp",
            Self::Meeting => "meeting",
            Self::FollowUp => "follow_up",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call" => Ok(Self::Call),
            "email" => Ok(Self::Email),
            "whatsapp" => Ok(Self::WhatsApp),
            "meeting" => Ok(Self::Meeting),
            "follow_up" | "follow-up" => Ok(Self::FollowUp),
            "other" => Ok(Self::Other),
            _ => Err(format!(
                "Invalid task type: {} (expected call, email, whatsapp, meeting, follow_up or other)",
                s
            )),
        }
    }
}

/// Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid priority: {} (expected low, medium or high)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" | "done" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!(
                "Invalid task status: {} (expected pending, completed or cancelled)",
                s
            )),
        }
    }
}

/// A follow-up task kept on this device only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lead_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_at.is_some_and(|due| due < now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub kind: TaskKind,
    pub priority: TaskPriority,
    pub due_at: Option<DateTime<Utc>>,
    pub lead_id: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            title: title.into(),
            description: None,
            kind,
            priority: TaskPriority::default(),
            due_at: None,
            lead_id: None,
        }
    }

    pub fn into_task(self, now: DateTime<Utc>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            kind: self.kind,
            priority: self.priority,
            status: TaskStatus::Pending,
            due_at: self.due_at,
            lead_id: self.lead_id,
            created_at: now,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<TaskKind>,
    pub priority: Option<TaskPriority>,
    /// `Some(None)` clears the due date.
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub lead_id: Option<Option<String>>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = Some(description);
        }
        if let Some(kind) = self.kind {
            task.kind = kind;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_at) = self.due_at {
            task.due_at = due_at;
        }
        if let Some(lead_id) = self.lead_id {
            task.lead_id = lead_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_task_kind_serializes_like_the_stored_shape() {
        let task = NewTask::new("Ligar", TaskKind::WhatsApp).into_task(Utc::now());
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "whatsapp");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["priority"], "medium");
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::High > TaskPriority::Medium);
        assert!(TaskPriority::Medium > TaskPriority::Low);
    }

    #[test]
    fn test_overdue_only_for_pending_tasks() {
        let now = Utc::now();
        let mut task = NewTask::new("Follow up", TaskKind::FollowUp).into_task(now);
        task.due_at = Some(now - Duration::hours(1));
        assert!(task.is_overdue(now));
        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_patch_can_clear_due_date() {
        let now = Utc::now();
        let mut task = NewTask::new("Meet", TaskKind::Meeting).into_task(now);
        task.due_at = Some(now);
        TaskPatch {
            due_at: Some(None),
            ..TaskPatch::default()
        }
        .apply(&mut task);
        assert!(task.due_at.is_none());
    }

    #[test]
    fn test_enum_parse_errors_name_valid_values() {
        let err = TaskKind::from_str("fax").unwrap_err();
        assert!(err.contains("whatsapp"));
        assert_eq!(TaskStatus::from_str("done").unwrap(), TaskStatus::Completed);
    }
}
