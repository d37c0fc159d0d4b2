//! Device-local task book.
//!
//! Tasks never reach the backend; the workspace persists the book to the
//! store after every mutation.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use leadsflow_common::{NewTask, Task, TaskKind, TaskPatch, TaskStatus};
use uuid::Uuid;

use crate::errors::TaskError;

/// Criteria for [`TaskBook::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub lead_id: Option<String>,
    pub kind: Option<TaskKind>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self
                .lead_id
                .as_deref()
                .is_none_or(|id| task.lead_id.as_deref() == Some(id))
            && self.kind.is_none_or(|k| task.kind == k)
    }
}

/// Due date first (undated last), then higher priority, then creation time.
fn agenda_order(a: &Task, b: &Task) -> Ordering {
    let due = match (a.due_at, b.due_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    due.then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBook {
    tasks: Vec<Task>,
}

impl TaskBook {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn into_inner(self) -> Vec<Task> {
        self.tasks
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn add(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<&Task, TaskError> {
        if new.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        self.tasks.push(new.into_task(now));
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Resolve a full id or a unique prefix of one, as shown in listings.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<Uuid, TaskError> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return Ok(id);
        }
        let prefix = id_or_prefix.trim().to_ascii_lowercase();
        let mut matches = self
            .tasks
            .iter()
            .filter(|t| !prefix.is_empty() && t.id.to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id),
            _ => Err(TaskError::UnknownRef(id_or_prefix.to_string())),
        }
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Task, TaskError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))
    }

    pub fn update(&mut self, id: Uuid, patch: TaskPatch) -> Result<&Task, TaskError> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TaskError::EmptyTitle);
        }
        let task = self.get_mut(id)?;
        patch.apply(task);
        Ok(task)
    }

    pub fn complete(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<&Task, TaskError> {
        let task = self.get_mut(id)?;
        if task.status == TaskStatus::Cancelled {
            return Err(TaskError::Cancelled(id));
        }
        if task.status != TaskStatus::Completed {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(now);
        }
        Ok(task)
    }

    pub fn cancel(&mut self, id: Uuid) -> Result<&Task, TaskError> {
        let task = self.get_mut(id)?;
        task.status = TaskStatus::Cancelled;
        task.completed_at = None;
        Ok(task)
    }

    pub fn reopen(&mut self, id: Uuid) -> Result<&Task, TaskError> {
        let task = self.get_mut(id)?;
        task.status = TaskStatus::Pending;
        task.completed_at = None;
        Ok(task)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Task, TaskError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))?;
        Ok(self.tasks.remove(idx))
    }

    pub fn list(&self, filter: &TaskFilter) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| filter.matches(t)).collect();
        tasks.sort_by(|a, b| agenda_order(a, b));
        tasks
    }

    /// Pending tasks whose due time has passed, in agenda order.
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| t.is_overdue(now)).collect();
        tasks.sort_by(|a, b| agenda_order(a, b));
        tasks
    }

    /// Tasks due on `date` (UTC calendar day), in agenda order.
    pub fn due_on(&self, date: NaiveDate) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.due_at.is_some_and(|due| due.date_naive() == date))
            .collect();
        tasks.sort_by(|a, b| agenda_order(a, b));
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use leadsflow_common::TaskPriority;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn task(title: &str, due_in_hours: Option<i64>, priority: TaskPriority) -> NewTask {
        let mut new = NewTask::new(title, TaskKind::Call);
        new.due_at = due_in_hours.map(|h| now() + Duration::hours(h));
        new.priority = priority;
        new
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_add_rejects_blank_title() {
        let mut book = TaskBook::default();
        assert_eq!(
            book.add(NewTask::new("  ", TaskKind::Other), now()).unwrap_err(),
            TaskError::EmptyTitle
        );
    }

    #[test]
    fn test_list_orders_by_due_then_priority() {
        let mut book = TaskBook::default();
        book.add(task("undated", None, TaskPriority::High), now()).unwrap();
        book.add(task("later", Some(48), TaskPriority::Low), now()).unwrap();
        book.add(task("soon-low", Some(2), TaskPriority::Low), now()).unwrap();
        book.add(task("soon-high", Some(2), TaskPriority::High), now()).unwrap();

        let listed = book.list(&TaskFilter::default());
        assert_eq!(titles(&listed), vec!["soon-high", "soon-low", "later", "undated"]);
    }

    #[test]
    fn test_filter_by_status_and_lead() {
        let mut book = TaskBook::default();
        let mut for_lead = task("a", None, TaskPriority::Medium);
        for_lead.lead_id = Some("42".into());
        let id = book.add(for_lead, now()).unwrap().id;
        book.add(task("b", None, TaskPriority::Medium), now()).unwrap();
        book.complete(id, now()).unwrap();

        let filter = TaskFilter {
            lead_id: Some("42".into()),
            ..TaskFilter::default()
        };
        assert_eq!(titles(&book.list(&filter)), vec!["a"]);
        let pending = TaskFilter {
            status: Some(TaskStatus::Pending),
            ..TaskFilter::default()
        };
        assert_eq!(titles(&book.list(&pending)), vec!["b"]);
    }

    #[test]
    fn test_complete_cancel_reopen_lifecycle() {
        let mut book = TaskBook::default();
        let id = book.add(task("x", None, TaskPriority::Medium), now()).unwrap().id;

        assert_eq!(book.complete(id, now()).unwrap().completed_at, Some(now()));
        book.cancel(id).unwrap();
        assert_eq!(book.complete(id, now()).unwrap_err(), TaskError::Cancelled(id));
        let reopened = book.reopen(id).unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);
        assert!(reopened.completed_at.is_none());
    }

    #[test]
    fn test_overdue_and_due_on() {
        let mut book = TaskBook::default();
        book.add(task("past", Some(-3), TaskPriority::Medium), now()).unwrap();
        let done = book.add(task("past-done", Some(-1), TaskPriority::Medium), now()).unwrap().id;
        book.add(task("tomorrow", Some(24), TaskPriority::Medium), now()).unwrap();
        book.complete(done, now()).unwrap();

        assert_eq!(titles(&book.overdue(now())), vec!["past"]);
        let tomorrow = (now() + Duration::hours(24)).date_naive();
        assert_eq!(titles(&book.due_on(tomorrow)), vec!["tomorrow"]);
    }

    #[test]
    fn test_update_and_remove() {
        let mut book = TaskBook::default();
        let id = book.add(task("x", Some(1), TaskPriority::Low), now()).unwrap().id;
        let patch = TaskPatch {
            title: Some("y".into()),
            due_at: Some(None),
            ..TaskPatch::default()
        };
        let updated = book.update(id, patch).unwrap();
        assert_eq!(updated.title, "y");
        assert!(updated.due_at.is_none());

        book.remove(id).unwrap();
        assert_eq!(book.remove(id).unwrap_err(), TaskError::NotFound(id));
    }

    #[test]
    fn test_resolve_by_prefix() {
        let mut book = TaskBook::default();
        let id = book.add(task("x", None, TaskPriority::Low), now()).unwrap().id;
        let short = &id.to_string()[..8];
        assert_eq!(book.resolve(short).unwrap(), id);
        assert!(book.resolve("").is_err());
    }
}
