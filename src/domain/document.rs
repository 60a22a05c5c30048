//! Document snapshots and front matter
//!
//! A document is a markdown file that may open with a YAML front matter
//! block delimited by `---` lines. The front matter is the document's
//! metadata; its lines are never addressable by line-based edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Front matter key holding the document type discriminator
pub const TYPE_KEY: &str = "type";

const DELIMITER: &str = "---";

/// Computes the version fingerprint of raw document bytes
pub fn version_of(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Location of a front matter block at the top of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    /// YAML between the delimiters
    pub yaml: &'a str,
    /// Number of lines the block occupies, delimiters included
    pub lines: usize,
}

impl<'a> Frontmatter<'a> {
    /// Finds the front matter block, if the document has a closed one
    pub fn split(content: &'a str) -> Option<Self> {
        let mut offset = 0;
        let mut yaml_start = None;

        for (index, raw) in content.split('\n').enumerate() {
            let line = raw.trim_end_matches('\r');
            match yaml_start {
                None => {
                    if index > 0 || line != DELIMITER {
                        return None;
                    }
                    yaml_start = Some(raw.len() + 1);
                }
                Some(start) if line == DELIMITER => {
                    let end = offset.max(start);
                    return Some(Self {
                        yaml: &content[start.min(end)..end],
                        lines: index + 1,
                    });
                }
                Some(_) => {}
            }
            offset += raw.len() + 1;
        }

        None
    }

    /// Number of preamble lines at the top of `content` (0 without front matter)
    pub fn line_count(content: &str) -> usize {
        Frontmatter::split(content).map_or(0, |fm| fm.lines)
    }
}

/// Front matter key/value pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    /// Creates empty metadata
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parses a YAML mapping; blank input yields empty metadata
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_yaml::from_str(yaml).map(Self)
    }

    /// Gets a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a string value by key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns the document type discriminator
    pub fn document_type(&self) -> Option<&str> {
        self.get_str(TYPE_KEY)
    }

    /// Returns true if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Precondition token for edits: which document, at which version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DocumentRef {
    pub path: String,
    /// Expected version; empty opts out of the staleness check where allowed
    pub version: String,
}

impl DocumentRef {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    /// A reference that does not pin a version
    pub fn unversioned(path: impl Into<String>) -> Self {
        Self::new(path, "")
    }
}

/// Snapshot of a document's content at one version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub path: String,
    pub version: String,
    /// Full file text, front matter included
    pub content: String,
    pub metadata: Metadata,
}

impl Document {
    /// Builds a snapshot from file content, deriving version and metadata
    pub fn from_content(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        let version = version_of(content.as_bytes());

        let metadata = match Frontmatter::split(&content).map(|fm| Metadata::from_yaml(fm.yaml)) {
            Some(Ok(metadata)) => metadata,
            Some(Err(e)) => {
                tracing::warn!(path = %path, error = %e, "ignoring unparseable front matter");
                Metadata::new()
            }
            None => Metadata::new(),
        };

        Self {
            path,
            version,
            content,
            metadata,
        }
    }

    /// Returns the precondition token for editing this snapshot
    pub fn reference(&self) -> DocumentRef {
        DocumentRef::new(self.path.clone(), self.version.clone())
    }

    /// Number of front matter lines at the top of the document
    pub fn preamble_lines(&self) -> usize {
        Frontmatter::line_count(&self.content)
    }
}
