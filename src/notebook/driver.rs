//! Builds the provenance graph of a single notebook

use super::artifact::GeneratedFile;
use super::cells::{build_cell, CellRecord};
use super::format::{Notebook, NotebookError};
use super::media::collect_media;
use super::parameters::LocalParameters;
use crate::error::ProvResult;
use crate::extract::{extract_paths, ExtractedPaths};
use crate::graph::{EntityBody, ProvenanceGraph, Relation, SoftwareTool, Workflow};
use crate::hashing::sha256_file;
use crate::storage::JsonLdWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Identifier of the kernel entity inside a notebook graph
pub const KERNEL_ID: &str = "#jupyter-kernel";

pub const NOTEBOOK_ENCODING: &str = "application/x-ipynb+json";

/// Everything derived from one notebook
#[derive(Debug, Clone)]
pub struct NotebookProvenance {
    pub graph: ProvenanceGraph,
    /// One record per code cell, in source order
    pub cells: Vec<CellRecord>,
    pub formal_params: LocalParameters,
    /// Code blocks and chart payloads to write next to the document
    pub files: Vec<GeneratedFile>,
}

impl NotebookProvenance {
    /// Write generated files and the JSON-LD document into `out_dir`
    pub fn write(&self, out_dir: &Path) -> ProvResult<PathBuf> {
        for file in &self.files {
            file.write_under(out_dir)?;
        }
        Ok(JsonLdWriter::new().write(&self.graph, out_dir)?)
    }
}

/// Turns a notebook file into a [`NotebookProvenance`]
#[derive(Debug, Clone)]
pub struct NotebookProvenanceDriver {
    collapse_by_basename: bool,
}

impl Default for NotebookProvenanceDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl NotebookProvenanceDriver {
    pub fn new() -> Self {
        Self {
            collapse_by_basename: true,
        }
    }

    pub fn with_collapse_by_basename(mut self, collapse: bool) -> Self {
        self.collapse_by_basename = collapse;
        self
    }

    /// Build and write in one go
    pub fn run(&self, path: &Path, out_dir: &Path) -> ProvResult<NotebookProvenance> {
        let provenance = self.build(path)?;
        provenance.write(out_dir)?;
        Ok(provenance)
    }

    /// Parse `path` and assemble its graph without touching the filesystem
    pub fn build(&self, path: &Path) -> ProvResult<NotebookProvenance> {
        let notebook = Notebook::from_path(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let sha256 = sha256_file(path).map_err(|source| NotebookError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut graph = ProvenanceGraph::new(format!("{} provenance", file_name));

        let workflow = graph.add_data_entity(
            file_name.clone(),
            EntityBody::Workflow(Workflow {
                name: file_name.clone(),
                description: notebook.title(),
                encoding_format: Some(NOTEBOOK_ENCODING.to_string()),
                code_repository: None,
                sha256: Some(sha256),
            }),
        );
        graph.set_main_entity(&workflow)?;

        let kernel = graph.get_or_create(
            KERNEL_ID,
            EntityBody::Tool(SoftwareTool {
                name: "Jupyter Notebook Kernel".to_string(),
                identifier: notebook.kernel_name().to_string(),
                version: notebook.language_version().to_string(),
                programming_language: notebook.kernel_name().to_string(),
                description: format!(
                    "Jupyter Notebook kernel for {}",
                    notebook.kernel_display_name()
                ),
            }),
        );

        let mut all_paths = ExtractedPaths::default();
        for cell in notebook.code_cells() {
            all_paths.extend(extract_paths(&cell.source.text()));
        }
        let formal_params =
            LocalParameters::collect(&mut graph, &all_paths, self.collapse_by_basename);
        for id in formal_params.ids_for(&all_paths.inputs) {
            graph.append_unique(&workflow, Relation::Input, &id)?;
        }
        for id in formal_params.ids_for(&all_paths.outputs) {
            graph.append_unique(&workflow, Relation::Output, &id)?;
        }

        let mut cells = Vec::new();
        let mut files = Vec::new();
        for (idx, cell) in notebook.code_cells().enumerate() {
            let position = idx as u32 + 1;
            let (mut record, code_file) =
                build_cell(&mut graph, position, cell, &kernel, &formal_params)?;
            graph.append_unique(&workflow, Relation::Step, &record.step_id)?;
            files.push(code_file);
            files.extend(collect_media(&mut graph, &mut record, cell)?);
            cells.push(record);
        }

        graph.set_relation(&workflow, Relation::TargetProduct, &kernel)?;

        debug!(notebook = %file_name, params = formal_params.len(), "collected local parameters");
        info!(notebook = %file_name, cells = cells.len(), files = files.len(), "built notebook provenance");

        Ok(NotebookProvenance {
            graph,
            cells,
            formal_params,
            files,
        })
    }
}
