//! provgraph: provenance graphs for notebook-driven data pipelines
//!
//! Reads a pipeline's driver script and the notebooks it executes, and
//! assembles a JSON-LD provenance document describing which steps ran, which
//! files they read and wrote, and how those files relate across steps.
//!
//! # Core Concepts
//!
//! - **Steps**: notebooks and scripts invoked by the driver script, and the
//!   code cells inside each notebook
//! - **Formal parameters**: named data slots, versioned each time the
//!   pipeline writes them
//! - **Files**: concrete, permanently addressable files linked to the
//!   parameters they stand for
//!
//! # Example
//!
//! ```no_run
//! use provgraph::{AssemblerConfig, PipelineAssembler, StaticResolver};
//! use std::path::Path;
//!
//! let project = Path::new("pipeline");
//! let resolver = StaticResolver::new(project, "https://example.org/pipeline", "HEAD");
//! let assembler = PipelineAssembler::new(project, AssemblerConfig::default(), &resolver);
//! let provenance = assembler.assemble()?;
//! provenance.write(Path::new("provenance"))?;
//! # Ok::<(), provgraph::ProvError>(())
//! ```

pub mod config;
mod error;
pub mod extract;
pub mod graph;
mod hashing;
pub mod notebook;
pub mod params;
pub mod pipeline;
pub mod resolver;
pub mod storage;

pub use config::{AssemblerConfig, ConfigError, FileLimit};
pub use error::{ErrorKind, ProvError, ProvResult};
pub use graph::{Entity, EntityBody, EntityId, GraphError, ProvenanceGraph, Relation};
pub use hashing::{sha256_file, sha256_hex};
pub use notebook::{NotebookProvenance, NotebookProvenanceDriver};
pub use params::{MatchStrictness, VersioningOrder};
pub use pipeline::{PipelineAssembler, PipelineProvenance};
pub use resolver::{GitResolver, SourceControlResolver, StaticResolver};
pub use storage::{GraphStore, JsonLdWriter, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
