//! Line-addressed document edits
//!
//! Every edit names the document version it was computed against. The writer
//! re-reads the file under an exclusive lock, rejects the batch if the
//! content moved on, and otherwise replaces the file atomically (temp file +
//! rename). The lock is taken on a hidden `.<name>.lock` file next to the
//! document, so it serializes writers across processes as well.
//!
//! Lines are 1-indexed from the top of the file. Front matter lines can
//! never be edited by number; `Position::Beginning` means the first line
//! after the front matter.

use std::collections::HashMap;
use std::fmt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{version_of, Document, DocumentRef, Frontmatter};

/// Where a mutation applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// First line after any front matter
    Beginning,
    /// After the last line
    End,
    /// Absolute 1-indexed line number
    Line(usize),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Beginning => write!(f, "beginning"),
            Position::End => write!(f, "end"),
            Position::Line(n) => write!(f, "line {}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Add,
    Update,
    Remove,
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationOp::Add => "add",
            MutationOp::Update => "update",
            MutationOp::Remove => "remove",
        };
        write!(f, "{}", s)
    }
}

/// One line edit; `text` is ignored for removals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMutation {
    pub op: MutationOp,
    pub position: Position,
    pub text: String,
}

impl LineMutation {
    pub fn add(position: Position, text: impl Into<String>) -> Self {
        Self {
            op: MutationOp::Add,
            position,
            text: text.into(),
        }
    }

    pub fn update(line: usize, text: impl Into<String>) -> Self {
        Self {
            op: MutationOp::Update,
            position: Position::Line(line),
            text: text.into(),
        }
    }

    pub fn remove(line: usize) -> Self {
        Self {
            op: MutationOp::Remove,
            position: Position::Line(line),
            text: String::new(),
        }
    }

    /// Adds at either end are safe to apply without a version pin
    fn is_unanchored_add(&self) -> bool {
        self.op == MutationOp::Add && matches!(self.position, Position::Beginning | Position::End)
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Document {path} has changed since it was read")]
    StaleVersion { path: String },

    #[error("Line {line} is out of range for {path}")]
    OutOfRange { path: String, line: usize },

    #[error("Line {line} of {path} is part of the front matter")]
    FrontmatterProtected { path: String, line: usize },

    #[error("Cannot {op} at the {position}; an absolute line number is required")]
    InvalidPosition { op: MutationOp, position: Position },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Applies line mutations to documents
pub trait DocumentUpdater {
    /// Applies `mutations` in order, all or nothing, if `doc.version` is current
    fn update_content(&self, doc: &DocumentRef, mutations: &[LineMutation]) -> Result<(), WriteError>;
}

/// Writes documents under a root directory
pub struct LineWriter {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LineWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Reads a fresh snapshot of a document
    pub fn read_document(&self, path: &str) -> Result<Document, WriteError> {
        let full = self.root.join(path);
        let content = fs::read_to_string(&full).map_err(|e| io_error(path, e))?;
        Ok(Document::from_content(path, content))
    }

    pub fn add_line(
        &self,
        doc: &DocumentRef,
        position: Position,
        text: impl Into<String>,
    ) -> Result<(), WriteError> {
        self.update_content(doc, &[LineMutation::add(position, text)])
    }

    pub fn update_line(
        &self,
        doc: &DocumentRef,
        line: usize,
        text: impl Into<String>,
    ) -> Result<(), WriteError> {
        self.update_content(doc, &[LineMutation::update(line, text)])
    }

    pub fn remove_line(&self, doc: &DocumentRef, line: usize) -> Result<(), WriteError> {
        self.update_content(doc, &[LineMutation::remove(line)])
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    fn write_locked(
        &self,
        doc: &DocumentRef,
        mutations: &[LineMutation],
        full: &Path,
    ) -> Result<(), WriteError> {
        if !full.is_file() {
            return Err(WriteError::NotFound(doc.path.clone()));
        }

        // The document itself is replaced by rename, so the lock lives on a
        // sidecar file whose inode stays put across writes
        let lock = open_lock(full).map_err(|e| io_error(&doc.path, e))?;
        lock.lock_exclusive().map_err(|e| io_error(&doc.path, e))?;

        let content = fs::read_to_string(full).map_err(|e| io_error(&doc.path, e))?;

        let pinned = !doc.version.is_empty();
        if pinned && version_of(content.as_bytes()) != doc.version {
            return Err(WriteError::StaleVersion {
                path: doc.path.clone(),
            });
        }

        let mut buffer = LineBuffer::parse(&content);
        for mutation in mutations {
            buffer.apply(&doc.path, mutation)?;
        }

        replace_file(full, &buffer.render()).map_err(|e| io_error(&doc.path, e))?;
        info!(path = %doc.path, mutations = mutations.len(), "wrote document");

        // Held until after the rename so competing writers re-read new content
        drop(lock);
        Ok(())
    }
}

impl DocumentUpdater for LineWriter {
    fn update_content(&self, doc: &DocumentRef, mutations: &[LineMutation]) -> Result<(), WriteError> {
        for mutation in mutations {
            check_position(&doc.path, mutation)?;
        }

        if doc.version.is_empty() && !mutations.iter().all(LineMutation::is_unanchored_add) {
            debug!(path = %doc.path, "refusing unversioned edit");
            return Err(WriteError::StaleVersion {
                path: doc.path.clone(),
            });
        }

        let full = self.root.join(&doc.path);
        let lock = self.path_lock(&full);
        let _guard = lock.lock();
        self.write_locked(doc, mutations, &full)
    }
}

/// Rejects positions that are invalid regardless of file content
fn check_position(path: &str, mutation: &LineMutation) -> Result<(), WriteError> {
    match (mutation.op, mutation.position) {
        (_, Position::Line(0)) => Err(WriteError::OutOfRange {
            path: path.to_string(),
            line: 0,
        }),
        (MutationOp::Update | MutationOp::Remove, position @ (Position::Beginning | Position::End)) => {
            Err(WriteError::InvalidPosition {
                op: mutation.op,
                position,
            })
        }
        _ => Ok(()),
    }
}

/// Sidecar lock file for `target`: `.<name>.lock` in the same directory
fn lock_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(".lock");
    target.with_file_name(name)
}

fn open_lock(target: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(target))
}

fn io_error(path: &str, source: io::Error) -> WriteError {
    if source.kind() == io::ErrorKind::NotFound {
        return WriteError::NotFound(path.to_string());
    }
    WriteError::Io {
        path: path.to_string(),
        source,
    }
}

/// Writes `content` to a fresh temp file next to `target` and renames it into place
fn replace_file(target: &Path, content: &str) -> io::Result<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), fs::metadata(target)?.permissions())?;
    temp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// A document split into lines, remembering whether it ended with a newline
#[derive(Debug)]
struct LineBuffer {
    lines: Vec<String>,
    trailing_newline: bool,
    preamble: usize,
}

impl LineBuffer {
    fn parse(content: &str) -> Self {
        let preamble = Frontmatter::line_count(content);
        if content.is_empty() {
            return Self {
                lines: Vec::new(),
                trailing_newline: true,
                preamble,
            };
        }

        let body = content.strip_suffix('\n').unwrap_or(content);
        Self {
            lines: body.split('\n').map(str::to_string).collect(),
            trailing_newline: content.ends_with('\n'),
            preamble,
        }
    }

    fn apply(&mut self, path: &str, mutation: &LineMutation) -> Result<(), WriteError> {
        let text = mutation.text.clone();

        let line = match mutation.position {
            Position::Beginning => {
                self.lines.insert(self.preamble, text);
                return Ok(());
            }
            Position::End => {
                self.lines.push(text);
                return Ok(());
            }
            Position::Line(line) => line,
        };

        if line == 0 || (line > self.lines.len() && mutation.op != MutationOp::Add) {
            return Err(WriteError::OutOfRange {
                path: path.to_string(),
                line,
            });
        }
        if line <= self.preamble {
            return Err(WriteError::FrontmatterProtected {
                path: path.to_string(),
                line,
            });
        }

        let index = line - 1;
        match mutation.op {
            MutationOp::Add if index >= self.lines.len() => self.lines.push(text),
            MutationOp::Add => self.lines.insert(index, text),
            MutationOp::Update => self.lines[index] = text,
            MutationOp::Remove => {
                self.lines.remove(index);
            }
        }
        Ok(())
    }

    fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}
