//! marktask - index, query and edit tasks embedded in markdown notes
//!
//! Tasks are checkbox list items such as
//! `- [ ] Renew passport due:2024-06-01 priority:1 every:year`.
//! marktask parses them out of a directory of notes into a live,
//! concurrently readable index, and edits them back in place with
//! line-addressed, version-checked writes.

pub mod domain;
pub mod parser;
pub mod index;
pub mod storage;
pub mod cli;

pub use domain::{Document, DocumentRef, Identifier, Recurrence, Status, Task};
pub use index::{IndexConfig, TaskIndex};
pub use parser::TaskParser;
pub use storage::{DocumentSource, LineWriter};
