//! Persistence for provenance graphs
//!
//! Graph snapshots are stored through the `GraphStore` trait, with
//! `SqliteStore` as the primary backend. `JsonLdWriter` produces the
//! published `ro-crate-metadata.json` document.

mod jsonld;
mod sqlite;
mod traits;

pub use jsonld::{JsonLdWriter, METADATA_FILE};
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, OpenStore, StorageError, StorageResult};
