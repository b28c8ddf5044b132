//! Crate-level error type aggregating the per-layer errors

use crate::config::ConfigError;
use crate::graph::GraphError;
use crate::notebook::NotebookError;
use crate::resolver::ResolverError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required file or entity is missing
    NotFound,
    /// Input was present but unusable
    Value,
    Io,
}

#[derive(Debug, Error)]
pub enum ProvError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{0}")]
    Value(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Notebook(#[from] NotebookError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvError::NotFound(_) => ErrorKind::NotFound,
            ProvError::Graph(GraphError::EntityNotFound(_)) => ErrorKind::NotFound,
            ProvError::Resolver(ResolverError::Io(_))
            | ProvError::Storage(StorageError::Io(_))
            | ProvError::Notebook(NotebookError::Io { .. })
            | ProvError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Value,
        }
    }
}

/// Result type for assembly operations
pub type ProvResult<T> = Result<T, ProvError>;
