//! Line-addressed task identifiers
//!
//! Format: `{path}:{line}` (e.g., `notes/inbox.md:12`), with the document
//! version carried alongside but never rendered.
//!
//! Lines are 1-indexed and counted from the top of the file, so a line number
//! can be handed straight to the document writer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a task lives: document path, line, and the document version it was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Identifier {
    path: String,
    line: usize,
    version: String,
}

impl Identifier {
    /// Creates an identifier for a line of a document at a given version
    pub fn new(path: impl Into<String>, line: usize, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            version: version.into(),
        }
    }

    /// Returns the document path (relative to the notes root)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the 1-indexed line number
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the version of the document the line was read from
    pub fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub(crate) fn set_version(&mut self, version: String) {
        self.version = version;
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}
