//! JSON-LD document output

use super::traits::StorageResult;
use crate::graph::ProvenanceGraph;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the metadata document inside an output directory
pub const METADATA_FILE: &str = "ro-crate-metadata.json";

/// Writes a graph as `ro-crate-metadata.json` into a directory
#[derive(Debug, Clone)]
pub struct JsonLdWriter {
    pretty: bool,
}

impl Default for JsonLdWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonLdWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// Emit compact JSON instead of indented output
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn write(&self, graph: &ProvenanceGraph, dir: &Path) -> StorageResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(METADATA_FILE);
        let doc = graph.to_jsonld();
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&doc)?
        } else {
            serde_json::to_vec(&doc)?
        };
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), entities = graph.entity_count(), "wrote provenance document");
        Ok(path)
    }
}
