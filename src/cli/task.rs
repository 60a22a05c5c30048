//! Task CLI commands

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use serde::Serialize;

use super::output::Output;
use crate::domain::{DocumentRef, Identifier, Status, Task};
use crate::index::write::{create_task, delete_task, update_task};
use crate::index::{DateRange, Fetcher, Filter, ListOption, Sorter, StatusOrder};
use crate::parser::{parse_recurrence, TaskParser};
use crate::storage::{Config, DocumentSource, LineWriter, Position};

/// Sort keys accepted by `list --sort`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Todo, blocked, doing, done, abandoned
    StatusKanban,
    /// Doing, todo, blocked, done, abandoned
    StatusAgenda,
    Priority,
    Due,
}

impl From<SortKey> for Sorter {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::StatusKanban => Sorter::Status(StatusOrder::Kanban),
            SortKey::StatusAgenda => Sorter::Status(StatusOrder::Agenda),
            SortKey::Priority => Sorter::Priority,
            SortKey::Due => Sorter::Due,
        }
    }
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only tasks in this document
    #[arg(long)]
    pub document: Option<String>,

    /// Only tasks with this status (repeatable)
    #[arg(long)]
    pub status: Vec<Status>,

    /// Only tasks with this priority (repeatable)
    #[arg(long)]
    pub priority: Vec<u32>,

    /// Only tasks due on or before this date
    #[arg(long)]
    pub due_before: Option<NaiveDate>,

    /// Only tasks due on or after this date
    #[arg(long)]
    pub due_after: Option<NaiveDate>,

    /// Sort keys, most significant first (repeatable)
    #[arg(long, value_enum)]
    pub sort: Vec<SortKey>,
}

impl ListArgs {
    fn fetcher(&self) -> Fetcher {
        match &self.document {
            Some(path) => Fetcher::Document(path.clone()),
            None => Fetcher::All,
        }
    }

    fn options(&self) -> Vec<ListOption> {
        let mut filters = Vec::new();
        if !self.status.is_empty() {
            filters.push(Filter::Status(self.status.clone()));
        }
        if !self.priority.is_empty() {
            filters.push(Filter::Priority(self.priority.clone()));
        }
        if self.due_after.is_some() || self.due_before.is_some() {
            filters.push(Filter::Due(DateRange::new(self.due_after, self.due_before)));
        }

        let mut options = Vec::new();
        if !filters.is_empty() {
            options.push(ListOption::Filters(filters));
        }
        if !self.sort.is_empty() {
            options.push(ListOption::Sorters(
                self.sort.iter().copied().map(Sorter::from).collect(),
            ));
        }
        options
    }
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Document path, relative to the root
    pub document: String,

    /// Task name
    pub name: String,

    /// Insert at this line instead of appending
    #[arg(long, conflicts_with = "beginning")]
    pub line: Option<usize>,

    /// Insert after the front matter instead of appending
    #[arg(long)]
    pub beginning: bool,

    #[arg(long, default_value = "todo")]
    pub status: Status,

    #[arg(long)]
    pub due: Option<NaiveDate>,

    #[arg(long)]
    pub scheduled: Option<NaiveDate>,

    #[arg(long)]
    pub priority: Option<u32>,

    /// Recurrence, e.g. "week", "monday, friday", "3 days", "15 march"
    #[arg(long)]
    pub every: Option<String>,
}

/// JSON view of a task
#[derive(Debug, Serialize)]
struct TaskView<'a> {
    id: String,
    path: &'a str,
    line: usize,
    name: &'a str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    due: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    every: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<NaiveDate>,
}

impl<'a> TaskView<'a> {
    fn new(task: &'a Task, today: NaiveDate) -> Self {
        Self {
            id: task.identifier().to_string(),
            path: task.path(),
            line: task.line(),
            name: task.name(),
            status: task.status(),
            due: task.due(),
            scheduled: task.scheduled(),
            completed: task.completed(),
            priority: task.priority(),
            every: task.every().map(|e| e.text()),
            next: task.every().and_then(|e| e.next_after(today)),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn list(config: &Config, args: &ListArgs, output: &Output) -> Result<()> {
    let source = DocumentSource::new(&config.root, config.project.clone());
    let index = source.load_index(config.project.index_config())?;
    let tasks = index.list(&args.fetcher(), &args.options());

    if output.is_json() {
        let today = today();
        let views: Vec<_> = tasks.iter().map(|t| TaskView::new(t, today)).collect();
        output.data(&views);
    } else if tasks.is_empty() {
        output.success("No tasks found.");
    } else {
        let rows: Vec<_> = tasks
            .iter()
            .map(|task| vec![task.identifier().to_string(), task.to_string()])
            .collect();
        output.table(&rows);
    }
    Ok(())
}

pub fn summary(config: &Config, output: &Output) -> Result<()> {
    let source = DocumentSource::new(&config.root, config.project.clone());
    let index = source.load_index(config.project.index_config())?;
    let tasks = index.summary();
    let documents = index.documents().len();

    if output.is_json() {
        output.data(&serde_json::json!({
            "tasks": tasks,
            "documents": documents,
        }));
    } else {
        output.success(&format!("{} tasks in {} documents", tasks, documents));
    }
    Ok(())
}

pub fn add(config: &Config, args: &AddArgs, output: &Output) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        bail!("Task name must not be empty");
    }

    let writer = LineWriter::new(&config.root);
    let today = today();

    let mut builder = Task::builder(
        Identifier::new(args.document.as_str(), 0, ""),
        name,
        args.status,
    );
    if let Some(due) = args.due {
        builder = builder.due(due);
    }
    if let Some(scheduled) = args.scheduled {
        builder = builder.scheduled(scheduled);
    }
    if let Some(priority) = args.priority {
        builder = builder.priority(priority);
    }
    if let Some(text) = &args.every {
        match parse_recurrence(text, today) {
            Ok(Some((every, consumed))) if text[consumed..].trim().is_empty() => {
                builder = builder.every(every);
            }
            Ok(_) => bail!("Unrecognized recurrence: '{}'", text),
            Err(e) => bail!("{}", e),
        }
    }
    if args.status.is_closed() {
        builder = builder.completed(today);
    }
    let task = builder.build();

    // The rendered line must read back as the same task
    let line = task.to_string();
    let reparsed = TaskParser::new(task.path(), "", today).parse_line(1, &line)?;
    if reparsed.as_ref().map(Task::name) != Some(task.name()) {
        bail!("Task name must not contain field keys or line breaks: '{}'", args.name);
    }

    let (doc, position) = match (args.line, args.beginning) {
        (Some(line), _) => {
            let current = writer.read_document(&args.document)?;
            (current.reference(), Position::Line(line))
        }
        (None, true) => (DocumentRef::unversioned(args.document.as_str()), Position::Beginning),
        (None, false) => (DocumentRef::unversioned(args.document.as_str()), Position::End),
    };

    create_task(&writer, &doc, position, &task)
        .with_context(|| format!("Failed to add task to {}", args.document))?;
    output.success(&format!("Added to {}: {}", args.document, line));
    Ok(())
}

pub fn set_status(
    config: &Config,
    document: &str,
    line: usize,
    status: Status,
    output: &Output,
) -> Result<()> {
    let writer = LineWriter::new(&config.root);
    let task = find_task(&writer, document, line)?;

    let mut builder = task.to_builder().status(status);
    if !status.is_closed() {
        builder = builder.clear_completed();
    } else if task.completed().is_none() {
        builder = builder.completed(today());
    }
    let updated = builder.build();

    update_task(&writer, &updated)
        .with_context(|| format!("Failed to update {}", updated.identifier()))?;
    output.success(&format!("{}: {}", updated.identifier(), updated));
    Ok(())
}

pub fn remove(config: &Config, document: &str, line: usize, output: &Output) -> Result<()> {
    let writer = LineWriter::new(&config.root);
    let task = find_task(&writer, document, line)?;

    delete_task(&writer, &task)
        .with_context(|| format!("Failed to remove {}", task.identifier()))?;
    output.success(&format!("Removed {}: {}", task.identifier(), task));
    Ok(())
}

/// Reads the document and parses the task on `line`
fn find_task(writer: &LineWriter, document: &str, line: usize) -> Result<Task> {
    let snapshot = writer.read_document(document)?;
    TaskParser::new(&snapshot.path, &snapshot.version, today())
        .parse_document(&snapshot.content)
        .into_iter()
        .find(|task| task.line() == line)
        .with_context(|| format!("No task at {}:{}", document, line))
}
