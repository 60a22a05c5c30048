//! Events flowing into and out of the index

use serde::Serialize;

use crate::domain::Document;

/// Lifecycle operation reported by a document source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOp {
    Load,
    Change,
    Delete,
    /// Sentinel sent once the initial scan has been fully delivered
    InitialLoadComplete,
}

/// One entry of the inbound feed
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub op: SourceOp,
    /// Document path, relative to the source root
    pub key: String,
    pub document: Document,
}

impl SourceEvent {
    pub fn load(document: Document) -> Self {
        Self {
            op: SourceOp::Load,
            key: document.path.clone(),
            document,
        }
    }

    pub fn change(document: Document) -> Self {
        Self {
            op: SourceOp::Change,
            key: document.path.clone(),
            document,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            op: SourceOp::Delete,
            document: Document {
                path: key.clone(),
                ..Document::default()
            },
            key,
        }
    }

    pub fn initial_load_complete() -> Self {
        Self {
            op: SourceOp::InitialLoadComplete,
            key: String::new(),
            document: Document::default(),
        }
    }
}

/// What happened to a document's tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOp {
    Load,
    Change,
    Delete,
}

/// Notification published after the index has been updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEvent {
    pub op: IndexOp,
    pub path: String,
}

impl IndexEvent {
    pub fn new(op: IndexOp, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
        }
    }
}
