//! In-memory task index
//!
//! The index consumes an ordered feed of [`SourceEvent`]s on a dedicated
//! thread, parses each document into tasks, and keeps one bucket of tasks
//! per document. A bucket is always replaced as a whole, so readers never
//! see a mix of old and new tasks for the same document.
//!
//! After each update the index publishes an [`IndexEvent`] to every
//! subscriber.

mod event;
mod publisher;
mod query;
pub mod write;

pub use event::{IndexEvent, IndexOp, SourceEvent, SourceOp};
pub use publisher::Publisher;
pub use query::{DateRange, Fetcher, Filter, ListOption, Sorter, StatusOrder};

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::{Document, Task};
use crate::parser::TaskParser;

type Bucket = BTreeMap<usize, Task>;

/// Index construction settings
#[derive(Debug, Clone, Default)]
pub struct IndexConfig {
    /// Block in [`TaskIndex::new`] until the initial scan has been indexed,
    /// polling at this interval
    pub wait_for_initial_load: Option<Duration>,
    /// Only index documents whose front matter `type` equals this
    pub document_type: Option<String>,
    /// Anchor for recurrence rules; today when unset
    pub reference_date: Option<NaiveDate>,
}

struct Shared {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    publisher: Publisher<IndexEvent>,
    initial_load_complete: AtomicBool,
    feed_closed: AtomicBool,
    document_type: Option<String>,
    reference_date: Option<NaiveDate>,
}

/// Concurrent read view over all indexed tasks
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct TaskIndex {
    shared: Arc<Shared>,
}

impl TaskIndex {
    /// Starts ingesting `feed` on a background thread
    pub fn new(feed: Receiver<SourceEvent>, config: IndexConfig) -> io::Result<Self> {
        let index = Self::detached(&config);

        let worker = index.clone();
        thread::Builder::new()
            .name("marktask-index".to_string())
            .spawn(move || worker.ingest(feed))?;

        if let Some(tick) = config.wait_for_initial_load {
            index.wait_for_initial_load(tick);
        }
        Ok(index)
    }

    /// Creates an index without an ingestion thread; feed it with [`apply`](Self::apply)
    pub fn detached(config: &IndexConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                buckets: RwLock::new(BTreeMap::new()),
                publisher: Publisher::new(),
                initial_load_complete: AtomicBool::new(false),
                feed_closed: AtomicBool::new(false),
                document_type: config.document_type.clone(),
                reference_date: config.reference_date,
            }),
        }
    }

    fn ingest(&self, feed: Receiver<SourceEvent>) {
        for event in feed {
            self.apply(event);
        }
        self.shared.feed_closed.store(true, Ordering::Release);
        debug!("source feed closed");
    }

    /// Applies one source event.
    ///
    /// Events must be applied in feed order; a detached index expects a
    /// single caller.
    pub fn apply(&self, event: SourceEvent) {
        match event.op {
            SourceOp::Load => self.update(IndexOp::Load, event.key, &event.document),
            SourceOp::Change => self.update(IndexOp::Change, event.key, &event.document),
            SourceOp::Delete => self.remove(event.key),
            SourceOp::InitialLoadComplete => {
                self.shared.initial_load_complete.store(true, Ordering::Release);
                info!(tasks = self.summary(), "initial load complete");
            }
        }
    }

    fn in_scope(&self, document: &Document) -> bool {
        match &self.shared.document_type {
            Some(wanted) => document.metadata.document_type() == Some(wanted.as_str()),
            None => true,
        }
    }

    fn update(&self, op: IndexOp, key: String, document: &Document) {
        if !self.in_scope(document) {
            debug!(path = %key, "document out of scope");
            if op == IndexOp::Change && self.shared.buckets.write().remove(&key).is_some() {
                self.shared.publisher.publish(IndexEvent::new(IndexOp::Delete, key));
            }
            return;
        }

        let reference = self
            .shared
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        let bucket: Bucket = TaskParser::new(&key, &document.version, reference)
            .parse_document(&document.content)
            .into_iter()
            .map(|task| (task.line(), task))
            .collect();

        debug!(path = %key, tasks = bucket.len(), "indexed document");
        self.shared.buckets.write().insert(key.clone(), bucket);
        self.shared.publisher.publish(IndexEvent::new(op, key));
    }

    fn remove(&self, key: String) {
        self.shared.buckets.write().remove(&key);
        debug!(path = %key, "removed document");
        self.shared.publisher.publish(IndexEvent::new(IndexOp::Delete, key));
    }

    pub fn is_initial_load_complete(&self) -> bool {
        self.shared.initial_load_complete.load(Ordering::Acquire)
    }

    /// Blocks until the initial load sentinel arrives or the feed closes
    pub fn wait_for_initial_load(&self, tick: Duration) {
        while !self.is_initial_load_complete() && !self.shared.feed_closed.load(Ordering::Acquire) {
            thread::sleep(tick);
        }
    }

    /// Total number of indexed tasks
    pub fn summary(&self) -> usize {
        self.shared.buckets.read().values().map(BTreeMap::len).sum()
    }

    /// Paths of indexed documents, sorted
    pub fn documents(&self) -> Vec<String> {
        self.shared.buckets.read().keys().cloned().collect()
    }

    /// Fetches tasks in (path, line) order, then applies `options` in order
    pub fn list(&self, fetcher: &Fetcher, options: &[ListOption]) -> Vec<Task> {
        let mut tasks: Vec<Task> = {
            let buckets = self.shared.buckets.read();
            match fetcher {
                Fetcher::All => buckets
                    .values()
                    .flat_map(|bucket| bucket.values().cloned())
                    .collect(),
                Fetcher::Document(path) => buckets
                    .get(path)
                    .map(|bucket| bucket.values().cloned().collect())
                    .unwrap_or_default(),
            }
        };

        for option in options {
            option.apply(&mut tasks);
        }
        tasks
    }

    /// Receives every index event published from now on
    pub fn subscribe(&self) -> Receiver<IndexEvent> {
        self.shared.publisher.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;
    use std::sync::mpsc;

    fn config() -> IndexConfig {
        IndexConfig {
            reference_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..IndexConfig::default()
        }
    }

    fn doc(path: &str, content: &str) -> Document {
        Document::from_content(path, content)
    }

    fn names(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(Task::name).collect()
    }

    #[test]
    fn load_change_delete() {
        let index = TaskIndex::detached(&config());
        let events = index.subscribe();

        index.apply(SourceEvent::load(doc("a.md", "- [ ] one\n- [x] two\n")));
        assert_eq!(index.summary(), 2);

        index.apply(SourceEvent::change(doc("a.md", "- [ ] three\n")));
        let tasks = index.list(&Fetcher::Document("a.md".into()), &[]);
        assert_eq!(names(&tasks), vec!["three"]);

        index.apply(SourceEvent::delete("a.md"));
        assert!(index.list(&Fetcher::Document("a.md".into()), &[]).is_empty());
        assert_eq!(index.summary(), 0);

        let ops: Vec<_> = events.try_iter().map(|e| e.op).collect();
        assert_eq!(ops, vec![IndexOp::Load, IndexOp::Change, IndexOp::Delete]);
    }

    #[test]
    fn tasks_carry_document_version() {
        let index = TaskIndex::detached(&config());
        let document = doc("a.md", "- [ ] one\n");
        let version = document.version.clone();
        index.apply(SourceEvent::load(document));

        let tasks = index.list(&Fetcher::All, &[]);
        assert_eq!(tasks[0].version(), version);
        assert_eq!(tasks[0].path(), "a.md");
    }

    #[test]
    fn fetch_all_in_path_then_line_order() {
        let index = TaskIndex::detached(&config());
        index.apply(SourceEvent::load(doc("b.md", "- [ ] b1\n")));
        index.apply(SourceEvent::load(doc("a.md", "\n- [ ] a2\n- [ ] a3\n")));

        let tasks = index.list(&Fetcher::All, &[]);
        assert_eq!(names(&tasks), vec!["a2", "a3", "b1"]);
        assert_eq!(tasks[0].line(), 2);
        assert_eq!(index.documents(), vec!["a.md".to_string(), "b.md".to_string()]);
    }

    #[test]
    fn list_options_apply_in_order() {
        let index = TaskIndex::detached(&config());
        index.apply(SourceEvent::load(doc(
            "a.md",
            "- [x] done p:1\n- [ ] later p:3\n- [ ] sooner p:2\n",
        )));

        let tasks = index.list(
            &Fetcher::All,
            &[
                ListOption::Filters(vec![Filter::Status(vec![Status::Todo])]),
                ListOption::Sorters(vec![Sorter::Priority]),
            ],
        );
        assert_eq!(names(&tasks), vec!["sooner", "later"]);
    }

    #[test]
    fn document_type_scoping() {
        let index = TaskIndex::detached(&IndexConfig {
            document_type: Some("daily".to_string()),
            ..config()
        });
        let events = index.subscribe();

        index.apply(SourceEvent::load(doc("note.md", "- [ ] ignored\n")));
        index.apply(SourceEvent::load(doc("day.md", "---\ntype: daily\n---\n- [ ] kept\n")));
        assert_eq!(names(&index.list(&Fetcher::All, &[])), vec!["kept"]);

        // Leaving scope drops the bucket
        index.apply(SourceEvent::change(doc("day.md", "---\ntype: weekly\n---\n- [ ] kept\n")));
        assert_eq!(index.summary(), 0);

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                IndexEvent::new(IndexOp::Load, "day.md"),
                IndexEvent::new(IndexOp::Delete, "day.md"),
            ]
        );
    }

    #[test]
    fn initial_load_flag() {
        let index = TaskIndex::detached(&config());
        assert!(!index.is_initial_load_complete());
        index.apply(SourceEvent::initial_load_complete());
        assert!(index.is_initial_load_complete());
    }

    #[test]
    fn new_waits_for_initial_load() {
        let (tx, rx) = mpsc::channel();
        tx.send(SourceEvent::load(doc("a.md", "- [ ] one\n"))).unwrap();
        tx.send(SourceEvent::initial_load_complete()).unwrap();

        let index = TaskIndex::new(
            rx,
            IndexConfig {
                wait_for_initial_load: Some(Duration::from_millis(1)),
                ..config()
            },
        )
        .unwrap();

        assert!(index.is_initial_load_complete());
        assert_eq!(index.summary(), 1);
        drop(tx);
    }

    #[test]
    fn waiter_returns_when_feed_closes() {
        let (tx, rx) = mpsc::channel::<SourceEvent>();
        drop(tx);

        let index = TaskIndex::new(
            rx,
            IndexConfig {
                wait_for_initial_load: Some(Duration::from_millis(1)),
                ..config()
            },
        )
        .unwrap();
        assert!(!index.is_initial_load_complete());
    }

    #[test]
    fn readers_never_see_mixed_buckets() {
        let (tx, rx) = mpsc::channel();
        let index = TaskIndex::new(rx, config()).unwrap();

        let old = "- [ ] old\n- [ ] old\n- [ ] old\n";
        let new = "- [x] new\n- [x] new\n- [x] new\n";
        tx.send(SourceEvent::load(doc("a.md", old))).unwrap();

        let writer = thread::spawn(move || {
            for i in 0..200 {
                let content = if i % 2 == 0 { new } else { old };
                tx.send(SourceEvent::change(doc("a.md", content))).unwrap();
            }
        });

        for _ in 0..200 {
            let tasks = index.list(&Fetcher::Document("a.md".into()), &[]);
            if let Some(first) = tasks.first() {
                assert!(tasks.iter().all(|t| t.name() == first.name()));
                assert_eq!(tasks.len(), 3);
            }
        }
        writer.join().unwrap();
    }
}
