//! Task domain model
//!
//! A task is one checkbox list item inside a document. Tasks are immutable:
//! every edit goes through [`TaskBuilder`], which copies an existing task and
//! overrides the requested fields.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::Identifier;
use super::recurrence::Recurrence;
use super::status::Status;

/// Date format used for every date field on disk
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A task parsed from a line of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    identifier: Identifier,
    name: String,
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scheduled: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    every: Option<Recurrence>,
}

impl Task {
    /// Starts building a new task
    pub fn builder(identifier: Identifier, name: impl Into<String>, status: Status) -> TaskBuilder {
        TaskBuilder {
            task: Task {
                identifier,
                name: name.into(),
                status,
                due: None,
                scheduled: None,
                completed: None,
                priority: None,
                every: None,
            },
        }
    }

    /// Starts building a copy of this task; fields not overridden are kept
    pub fn to_builder(&self) -> TaskBuilder {
        TaskBuilder { task: self.clone() }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn path(&self) -> &str {
        self.identifier.path()
    }

    pub fn line(&self) -> usize {
        self.identifier.line()
    }

    pub fn version(&self) -> &str {
        self.identifier.version()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.due
    }

    pub fn scheduled(&self) -> Option<NaiveDate> {
        self.scheduled
    }

    pub fn completed(&self) -> Option<NaiveDate> {
        self.completed
    }

    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    pub fn every(&self) -> Option<&Recurrence> {
        self.every.as_ref()
    }
}

/// Renders the canonical task line.
///
/// Fields are always written in the order due, scheduled, priority, every,
/// completed, regardless of where they appeared in the source line.
impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- [{}] {}", self.status.marker(), self.name)?;
        if let Some(due) = self.due {
            write!(f, " due:{}", due.format(DATE_FORMAT))?;
        }
        if let Some(scheduled) = self.scheduled {
            write!(f, " scheduled:{}", scheduled.format(DATE_FORMAT))?;
        }
        if let Some(priority) = self.priority {
            write!(f, " priority:{}", priority)?;
        }
        if let Some(every) = &self.every {
            write!(f, " every:{}", every.text())?;
        }
        if let Some(completed) = self.completed {
            write!(f, " completed:{}", completed.format(DATE_FORMAT))?;
        }
        Ok(())
    }
}

/// Builds a [`Task`], either from scratch or as a copy with overrides
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.task.identifier.set_path(path.into());
        self
    }

    pub fn line(mut self, line: usize) -> Self {
        self.task.identifier.set_line(line);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.task.identifier.set_version(version.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.task.name = name.into();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.task.status = status;
        self
    }

    pub fn due(mut self, due: NaiveDate) -> Self {
        self.task.due = Some(due);
        self
    }

    pub fn scheduled(mut self, scheduled: NaiveDate) -> Self {
        self.task.scheduled = Some(scheduled);
        self
    }

    pub fn completed(mut self, completed: NaiveDate) -> Self {
        self.task.completed = Some(completed);
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.task.priority = Some(priority);
        self
    }

    pub fn every(mut self, every: Recurrence) -> Self {
        self.task.every = Some(every);
        self
    }

    pub fn clear_completed(mut self) -> Self {
        self.task.completed = None;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_task() -> Task {
        Task::builder(Identifier::new("inbox.md", 4, "v1"), "Water plants", Status::Todo).build()
    }

    #[test]
    fn new_task_has_no_optional_fields() {
        let task = make_task();
        assert_eq!(task.name(), "Water plants");
        assert_eq!(task.status(), Status::Todo);
        assert_eq!(task.path(), "inbox.md");
        assert_eq!(task.line(), 4);
        assert_eq!(task.version(), "v1");
        assert!(task.due().is_none());
        assert!(task.scheduled().is_none());
        assert!(task.completed().is_none());
        assert!(task.priority().is_none());
        assert!(task.every().is_none());
    }

    #[test]
    fn copy_with_overrides_keeps_other_fields() {
        let original = make_task()
            .to_builder()
            .due(date(2024, 1, 10))
            .priority(2)
            .build();

        let done = original
            .to_builder()
            .status(Status::Done)
            .completed(date(2024, 1, 9))
            .build();

        assert_eq!(done.status(), Status::Done);
        assert_eq!(done.completed(), Some(date(2024, 1, 9)));
        assert_eq!(done.due(), Some(date(2024, 1, 10)));
        assert_eq!(done.priority(), Some(2));
        assert_eq!(done.line(), 4);
        assert_eq!(done.version(), "v1");

        // The source task is untouched
        assert_eq!(original.status(), Status::Todo);
        assert!(original.completed().is_none());
    }

    #[test]
    fn last_override_wins() {
        let task = make_task().to_builder().priority(1).priority(3).line(9).build();
        assert_eq!(task.priority(), Some(3));
        assert_eq!(task.line(), 9);
    }

    #[test]
    fn clear_removes_optional_field() {
        let task = make_task()
            .to_builder()
            .completed(date(2024, 1, 1))
            .clear_completed()
            .build();
        assert!(task.completed().is_none());
    }

    #[test]
    fn display_minimal() {
        assert_eq!(make_task().to_string(), "- [ ] Water plants");
    }

    #[test]
    fn display_uses_canonical_field_order() {
        let every = Recurrence::new(Frequency::Weekly, date(2024, 1, 1), "monday, wednesday");
        let task = make_task()
            .to_builder()
            .status(Status::Blocked)
            .completed(date(2024, 2, 1))
            .every(every)
            .priority(1)
            .scheduled(date(2024, 1, 5))
            .due(date(2024, 1, 10))
            .build();

        assert_eq!(
            task.to_string(),
            "- [b] Water plants due:2024-01-10 scheduled:2024-01-05 priority:1 every:monday, wednesday completed:2024-02-01"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let task = make_task().to_builder().due(date(2024, 3, 1)).build();
        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(task, parsed);
    }
}
