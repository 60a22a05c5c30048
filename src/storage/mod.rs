//! # Storage Layer
//!
//! Everything that touches the filesystem.
//!
//! | Concern | Type | Notes |
//! |---------|------|-------|
//! | Reading and watching notes | [`DocumentSource`] | feeds the index |
//! | Editing notes by line | [`LineWriter`] | version-checked, atomic |
//! | Configuration | [`Config`] | `.marktask.toml` + global `config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`LineWriter`] serializes writers per path in-process and holds an
//!   `fs2` exclusive lock on a `.<name>.lock` sidecar while it re-validates
//!   and replaces the document, so separate processes serialize too
//! - All writes are atomic (unique temp file + rename)

mod config;
mod source;
pub mod writer;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, PROJECT_CONFIG_FILE};
pub use source::{DocumentSource, WatchHandle};
pub use writer::{DocumentUpdater, LineMutation, LineWriter, MutationOp, Position, WriteError};
