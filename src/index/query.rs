//! Fetchers, filters, and sorters for index queries

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::domain::{Status, Task};

/// Selects the candidate tasks of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetcher {
    /// Every indexed task
    All,
    /// Tasks of one document, by path
    Document(String),
}

/// Inclusive date bounds; an open side is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(after: Option<NaiveDate>, before: Option<NaiveDate>) -> Self {
        Self { after, before }
    }

    pub fn between(after: NaiveDate, before: NaiveDate) -> Self {
        Self::new(Some(after), Some(before))
    }

    /// A missing date never matches
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else {
            return false;
        };
        self.after.map_or(true, |after| date >= after)
            && self.before.map_or(true, |before| date <= before)
    }
}

/// Keeps tasks that satisfy a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Status is any of the listed ones
    Status(Vec<Status>),
    /// Priority is any of the listed ones
    Priority(Vec<u32>),
    Due(DateRange),
    Scheduled(DateRange),
    Completed(DateRange),
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::Status(statuses) => statuses.contains(&task.status()),
            Filter::Priority(priorities) => task
                .priority()
                .is_some_and(|p| priorities.contains(&p)),
            Filter::Due(range) => range.contains(task.due()),
            Filter::Scheduled(range) => range.contains(task.scheduled()),
            Filter::Completed(range) => range.contains(task.completed()),
        }
    }
}

/// Column order for status sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOrder {
    /// Todo, Blocked, Doing, Done, Abandoned
    Kanban,
    /// Doing, Todo, Blocked, Done, Abandoned
    Agenda,
}

impl StatusOrder {
    fn sequence(self) -> [Status; 5] {
        match self {
            StatusOrder::Kanban => [
                Status::Todo,
                Status::Blocked,
                Status::Doing,
                Status::Done,
                Status::Abandoned,
            ],
            StatusOrder::Agenda => [
                Status::Doing,
                Status::Todo,
                Status::Blocked,
                Status::Done,
                Status::Abandoned,
            ],
        }
    }

    fn rank(self, status: Status) -> usize {
        self.sequence()
            .iter()
            .position(|s| *s == status)
            .unwrap_or(usize::MAX)
    }
}

/// One sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sorter {
    Status(StatusOrder),
    /// Lowest number first, tasks without a priority last
    Priority,
    /// Earliest first, tasks without a due date last
    Due,
}

impl Sorter {
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            Sorter::Status(order) => order.rank(a.status()).cmp(&order.rank(b.status())),
            Sorter::Priority => missing_last(a.priority(), b.priority()),
            Sorter::Due => missing_last(a.due(), b.due()),
        }
    }
}

fn missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Post-processing step applied to fetched tasks, in the order given
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOption {
    /// Keep tasks matching every filter
    Filters(Vec<Filter>),
    /// Stable sort; the first sorter is the primary key
    Sorters(Vec<Sorter>),
}

impl ListOption {
    pub(crate) fn apply(&self, tasks: &mut Vec<Task>) {
        match self {
            ListOption::Filters(filters) => {
                tasks.retain(|task| filters.iter().all(|f| f.matches(task)));
            }
            ListOption::Sorters(sorters) => {
                tasks.sort_by(|a, b| {
                    sorters
                        .iter()
                        .map(|s| s.compare(a, b))
                        .find(|o| o.is_ne())
                        .unwrap_or(Ordering::Equal)
                });
            }
        }
    }
}
