//! Task status and its checkbox markers
//!
//! Every status has exactly one canonical marker that is written back to
//! disk, and a fixed set of characters accepted when reading.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("Invalid status '{0}': expected one of todo, doing, blocked, done, abandoned")]
pub struct StatusError(pub String);

/// Status of a task, read from the `[ ]` checkbox of a list item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    Doing,
    Blocked,
    Done,
    Abandoned,
}

struct Marker {
    status: Status,
    canonical: char,
    accepted: &'static [char],
    word: &'static str,
}

static MARKERS: [Marker; 5] = [
    Marker { status: Status::Todo, canonical: ' ', accepted: &[' '], word: "todo" },
    Marker { status: Status::Doing, canonical: '/', accepted: &['/'], word: "doing" },
    Marker { status: Status::Blocked, canonical: 'b', accepted: &['b', 'B'], word: "blocked" },
    Marker { status: Status::Done, canonical: 'x', accepted: &['x', 'X'], word: "done" },
    Marker { status: Status::Abandoned, canonical: 'a', accepted: &['a', 'A'], word: "abandoned" },
];

impl Status {
    /// All statuses, in declaration order
    pub const ALL: [Status; 5] = [
        Status::Todo,
        Status::Doing,
        Status::Blocked,
        Status::Done,
        Status::Abandoned,
    ];

    fn marker_entry(self) -> &'static Marker {
        // The table holds every variant, in declaration order.
        &MARKERS[self as usize]
    }

    /// Looks up the status for a checkbox character
    pub fn from_marker(c: char) -> Option<Status> {
        MARKERS
            .iter()
            .find(|m| m.accepted.contains(&c))
            .map(|m| m.status)
    }

    /// Returns the character written between the brackets
    pub fn marker(self) -> char {
        self.marker_entry().canonical
    }

    /// Returns the lowercase name used by the CLI and JSON output
    pub fn as_str(self) -> &'static str {
        self.marker_entry().word
    }

    /// Returns true for statuses that close the task
    pub fn is_closed(self) -> bool {
        matches!(self, Status::Done | Status::Abandoned)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MARKERS
            .iter()
            .find(|m| m.word.eq_ignore_ascii_case(s))
            .map(|m| m.status)
            .ok_or_else(|| StatusError(s.to_string()))
    }
}
