//! Task-level edits expressed as line mutations
//!
//! Updates and deletes are pinned to the document version the task was
//! parsed from, so an edit computed from a stale index entry is rejected
//! instead of clobbering someone else's change.

use crate::domain::{DocumentRef, Task};
use crate::storage::writer::{DocumentUpdater, LineMutation, Position, WriteError};

/// Inserts the rendered task into `doc` at `position`
pub fn create_task<U: DocumentUpdater + ?Sized>(
    updater: &U,
    doc: &DocumentRef,
    position: Position,
    task: &Task,
) -> Result<(), WriteError> {
    updater.update_content(doc, &[LineMutation::add(position, task.to_string())])
}

/// Rewrites the task's line with its current rendering
pub fn update_task<U: DocumentUpdater + ?Sized>(updater: &U, task: &Task) -> Result<(), WriteError> {
    updater.update_content(
        &source_of(task),
        &[LineMutation::update(task.line(), task.to_string())],
    )
}

/// Removes the task's line
pub fn delete_task<U: DocumentUpdater + ?Sized>(updater: &U, task: &Task) -> Result<(), WriteError> {
    updater.update_content(&source_of(task), &[LineMutation::remove(task.line())])
}

fn source_of(task: &Task) -> DocumentRef {
    DocumentRef::new(task.path(), task.version())
}
