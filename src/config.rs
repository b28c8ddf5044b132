//! Assembler configuration
//!
//! Loaded from YAML (`--config <file>` or `<config dir>/provgraph/config.yaml`)
//! and then overridden field by field from the command line.

use crate::params::{MatchStrictness, VersioningOrder};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid checkpoint pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("invalid file limit {0:?}: expected a count or \"unlimited\"")]
    InvalidFileLimit(String),
}

/// Maximum number of files taken from one wildcard pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FileLimitRepr", into = "FileLimitRepr")]
pub enum FileLimit {
    Unlimited,
    AtMost(usize),
}

impl Default for FileLimit {
    fn default() -> Self {
        FileLimit::AtMost(2)
    }
}

impl FileLimit {
    /// Truncate a sorted match list to the limit
    pub fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let FileLimit::AtMost(max) = self {
            items.truncate(*max);
        }
        items
    }
}

impl std::str::FromStr for FileLimit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unlimited" | "none" | "all" => Ok(FileLimit::Unlimited),
            other => other
                .parse()
                .map(FileLimit::AtMost)
                .map_err(|_| ConfigError::InvalidFileLimit(s.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FileLimitRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<FileLimitRepr> for FileLimit {
    type Error = ConfigError;

    fn try_from(repr: FileLimitRepr) -> Result<Self, Self::Error> {
        match repr {
            FileLimitRepr::Count(n) => Ok(FileLimit::AtMost(n)),
            FileLimitRepr::Keyword(s) => s.parse(),
        }
    }
}

impl From<FileLimit> for FileLimitRepr {
    fn from(limit: FileLimit) -> Self {
        match limit {
            FileLimit::Unlimited => FileLimitRepr::Keyword("unlimited".to_string()),
            FileLimit::AtMost(n) => FileLimitRepr::Count(n),
        }
    }
}

/// Settings for one pipeline assembly run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Driver script file name, relative to the project directory
    pub driver_script: String,
    /// Plain scripts recognised in the driver script besides notebooks
    pub secondary_scripts: Vec<String>,
    pub file_limit: FileLimit,
    pub match_strictness: MatchStrictness,
    pub versioning_order: VersioningOrder,
    /// Key notebook-local parameters by file basename instead of full path
    pub collapse_by_basename: bool,
    /// Also describe input files as they were at the previous checkpoint
    pub previous_state: bool,
    /// Regex over commit subjects marking checkpoint commits
    pub checkpoint_pattern: String,
    pub remote_name: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            driver_script: "update.sh".to_string(),
            secondary_scripts: vec!["make_xlsx.py".to_string()],
            file_limit: FileLimit::default(),
            match_strictness: MatchStrictness::default(),
            versioning_order: VersioningOrder::default(),
            collapse_by_basename: true,
            previous_state: false,
            checkpoint_pattern: "(?i)^(release|checkpoint)".to_string(),
            remote_name: "origin".to_string(),
        }
    }
}

impl AssemblerConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Load `path` if given, else the default config file if it exists,
    /// else built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => match default_config_path() {
                Some(default) if default.is_file() => Self::from_path(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Compiled checkpoint pattern
    pub fn checkpoint_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.checkpoint_pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: self.checkpoint_pattern.clone(),
            message: e.to_string(),
        })
    }

    pub fn with_driver_script(mut self, name: impl Into<String>) -> Self {
        self.driver_script = name.into();
        self
    }

    pub fn with_file_limit(mut self, limit: FileLimit) -> Self {
        self.file_limit = limit;
        self
    }

    pub fn with_match_strictness(mut self, strictness: MatchStrictness) -> Self {
        self.match_strictness = strictness;
        self
    }

    pub fn with_versioning_order(mut self, order: VersioningOrder) -> Self {
        self.versioning_order = order;
        self
    }

    pub fn with_previous_state(mut self, enabled: bool) -> Self {
        self.previous_state = enabled;
        self
    }
}

/// `<config dir>/provgraph/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("provgraph").join("config.yaml"))
}
