//! Storage trait definitions

use crate::graph::ProvenanceGraph;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for graph storage backends
///
/// Graphs are stored as whole snapshots keyed by graph name; saving a graph
/// replaces any earlier snapshot of the same name.
pub trait GraphStore: Send + Sync {
    /// Create or replace a graph snapshot
    fn save_graph(&self, graph: &ProvenanceGraph) -> StorageResult<()>;

    /// Load a graph by name
    fn load_graph(&self, name: &str) -> StorageResult<Option<ProvenanceGraph>>;

    /// List stored graph names
    fn list_graphs(&self) -> StorageResult<Vec<String>>;

    /// Delete a graph and all its entities
    fn delete_graph(&self, name: &str) -> StorageResult<bool>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
