//! Document source: feeds the index from a directory of notes
//!
//! [`DocumentSource::scan`] walks the root once and reports every document
//! as a `Load`, followed by the initial load sentinel.
//! [`DocumentSource::watch`] then reports edits as `Change` and removals as
//! `Delete`. Keys are `/`-separated paths relative to the root.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, info, warn};

use super::config::ProjectConfig;
use crate::domain::Document;
use crate::index::{IndexConfig, SourceEvent, TaskIndex};

/// Reads documents under a root directory
#[derive(Debug, Clone)]
pub struct DocumentSource {
    root: PathBuf,
    canonical_root: PathBuf,
    config: ProjectConfig,
}

impl DocumentSource {
    pub fn new(root: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        let root = root.into();
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());
        Self {
            root,
            canonical_root,
            config,
        }
    }

    /// Key for a document path, or `None` if the path is not a document
    /// under the root (hidden, temporary, or wrong extension)
    pub fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path
            .strip_prefix(&self.root)
            .or_else(|_| path.strip_prefix(&self.canonical_root))
            .unwrap_or(path);
        if relative.is_absolute() || !self.config.is_document(relative) {
            return None;
        }

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str()?;
                    if part.starts_with('.') {
                        return None;
                    }
                    parts.push(part);
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(parts.join("/"))
    }

    /// Reads a document snapshot by key
    pub fn read(&self, key: &str) -> Result<Document> {
        let path = self.root.join(key);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        Ok(Document::from_content(key, content))
    }

    /// Sends a `Load` for every document, then the initial load sentinel.
    ///
    /// Returns the number of documents loaded. Unreadable documents are
    /// logged and skipped.
    pub fn scan(&self, feed: &Sender<SourceEvent>) -> Result<usize> {
        let mut keys = BTreeSet::new();
        self.collect(&self.root, &mut keys)?;

        let mut loaded = 0;
        for key in keys {
            match self.read(&key) {
                Ok(document) => {
                    if feed.send(SourceEvent::load(document)).is_err() {
                        debug!("index dropped during scan");
                        return Ok(loaded);
                    }
                    loaded += 1;
                }
                Err(e) => warn!(path = %key, error = %format!("{:#}", e), "skipping document"),
            }
        }

        // A closed feed only means nobody is listening any more
        let _ = feed.send(SourceEvent::initial_load_complete());
        info!(root = %self.root.display(), documents = loaded, "scanned documents");
        Ok(loaded)
    }

    fn collect(&self, dir: &Path, keys: &mut BTreeSet<String>) -> Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to read directory: {}", dir.display()))?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden {
                continue;
            }

            let file_type = entry
                .file_type()
                .with_context(|| format!("Failed to stat: {}", path.display()))?;
            if file_type.is_dir() {
                self.collect(&path, keys)?;
            } else if let Some(key) = self.key_for(&path) {
                keys.insert(key);
            }
        }
        Ok(())
    }

    /// Watches the root and forwards changes to `feed` until the handle is dropped
    pub fn watch(&self, feed: Sender<SourceEvent>) -> Result<WatchHandle> {
        let (tx, rx) = mpsc::channel::<DebounceEventResult>();
        let mut debouncer =
            new_debouncer(self.config.debounce(), tx).context("Failed to create file watcher")?;
        debouncer
            .watcher()
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", self.root.display()))?;

        let source = self.clone();
        let thread = thread::Builder::new()
            .name("marktask-watch".to_string())
            .spawn(move || {
                while let Ok(result) = rx.recv() {
                    match result {
                        Ok(events) => {
                            let paths: BTreeSet<PathBuf> = events.into_iter().map(|e| e.path).collect();
                            if !source.forward(paths, &feed) {
                                break;
                            }
                        }
                        Err(error) => warn!(error = ?error, "watch error"),
                    }
                }
                debug!("watcher stopped");
            })
            .context("Failed to spawn watcher thread")?;

        info!(root = %self.root.display(), "watching for changes");
        Ok(WatchHandle {
            debouncer: Some(debouncer),
            thread: Some(thread),
        })
    }

    /// Translates changed paths into source events; false once the feed is closed
    fn forward(&self, paths: BTreeSet<PathBuf>, feed: &Sender<SourceEvent>) -> bool {
        for path in paths {
            let Some(key) = self.key_for(&path) else {
                continue;
            };

            let event = if path.is_file() {
                match self.read(&key) {
                    Ok(document) => SourceEvent::change(document),
                    Err(e) => {
                        warn!(path = %key, error = %format!("{:#}", e), "skipping document");
                        continue;
                    }
                }
            } else if !path.exists() {
                SourceEvent::delete(key)
            } else {
                continue;
            };

            if feed.send(event).is_err() {
                return false;
            }
        }
        true
    }

    /// Builds an index from a one-off scan, without watching
    pub fn load_index(&self, config: IndexConfig) -> Result<TaskIndex> {
        let tick = config.wait_for_initial_load.unwrap_or(self.config.initial_load_tick());
        let (tx, rx) = mpsc::channel();
        let index = TaskIndex::new(
            rx,
            IndexConfig {
                wait_for_initial_load: None,
                ..config
            },
        )
        .context("Failed to start index")?;

        self.scan(&tx)?;
        drop(tx);
        index.wait_for_initial_load(tick);
        Ok(index)
    }

    /// Builds an index from a scan and keeps it current while the handle lives
    pub fn spawn_index(&self, config: IndexConfig) -> Result<(TaskIndex, WatchHandle)> {
        let tick = config.wait_for_initial_load;
        let (tx, rx) = mpsc::channel();
        let index = TaskIndex::new(
            rx,
            IndexConfig {
                wait_for_initial_load: None,
                ..config
            },
        )
        .context("Failed to start index")?;

        // Watch first so edits made during the scan are not missed
        let handle = self.watch(tx.clone())?;
        self.scan(&tx)?;

        if let Some(tick) = tick {
            index.wait_for_initial_load(tick);
        }
        Ok((index, handle))
    }
}

/// Keeps a directory watch alive; dropping it stops watching
pub struct WatchHandle {
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Stops watching and waits for pending events to be forwarded
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.debouncer.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
