//! Domain models for marktask
//!
//! Contains the core value types without any I/O concerns.

mod id;
mod status;
mod task;
mod recurrence;
mod document;

pub use id::Identifier;
pub use status::{Status, StatusError};
pub use task::{Task, TaskBuilder, DATE_FORMAT};
pub use recurrence::{Frequency, Recurrence};
pub use document::{version_of, Document, DocumentRef, Frontmatter, Metadata, TYPE_KEY};
