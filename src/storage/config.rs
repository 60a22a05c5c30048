//! Configuration handling for marktask
//!
//! Configuration is stored in `.marktask.toml` at the notes root (project)
//! and `~/.config/marktask/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::IndexConfig;

/// Project configuration file name, looked up at the notes root
pub const PROJECT_CONFIG_FILE: &str = ".marktask.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Only index documents whose front matter `type` matches
    pub document_type: Option<String>,

    /// Watcher debounce in milliseconds
    pub debounce_ms: u64,

    /// Poll interval while waiting for the initial scan, in milliseconds
    pub initial_load_tick_ms: u64,

    /// File extensions treated as documents, without the dot
    pub extensions: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            document_type: None,
            debounce_ms: 200,
            initial_load_tick_ms: 10,
            extensions: vec!["md".to_string()],
        }
    }
}

impl ProjectConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn initial_load_tick(&self) -> Duration {
        Duration::from_millis(self.initial_load_tick_ms)
    }

    /// Returns true if `path` has one of the configured extensions
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid("extensions must not be empty".to_string()));
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.is_empty() || e.starts_with('.')) {
            return Err(ConfigError::Invalid(format!(
                "extension '{}' must be non-empty and given without a leading dot",
                ext
            )));
        }
        if self.initial_load_tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "initial_load_tick_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Index settings derived from this configuration
    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            wait_for_initial_load: Some(self.initial_load_tick()),
            document_type: self.document_type.clone(),
            reference_date: None,
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub root: PathBuf,
}

impl Config {
    /// Loads configuration for `root`, or for the nearest directory holding
    /// a project config file, falling back to the current directory
    pub fn load(root: Option<&Path>) -> Result<Self> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                Self::find_project_root(&cwd).unwrap_or(cwd)
            }
        };
        Self::for_root(&root)
    }

    /// Loads configuration for a specific notes root
    pub fn for_root(root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(root)?;

        Ok(Self {
            project,
            global,
            root: root.to_path_buf(),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "marktask", "marktask").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    fn load_project_config(root: &Path) -> Result<ProjectConfig> {
        let config_path = root.join(PROJECT_CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;
        config.validate().context("Invalid project config")?;
        Ok(config)
    }

    /// Walks up from `start` looking for a project config file
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_CONFIG_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
