//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `list` | Query tasks with filters and sort keys |
//! | `summary` | Count indexed tasks |
//! | `add` | Write a new task line |
//! | `set` | Change a task's status |
//! | `remove` | Delete a task line |
//! | `watch` | Stream index events |
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Logs go to stderr at `warn` by default. `--verbose` raises the level to
//! `debug`; `RUST_LOG` takes precedence over both.

mod app;
mod output;
mod task;
mod watch;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
