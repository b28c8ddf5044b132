//! Assembles the pipeline-level provenance graph
//!
//! The driver script fixes the steps. Every notebook step gets its own
//! nested graph; the parameter references recorded on its cells are then
//! versioned across the whole pipeline and the files behind them are
//! stamped through the resolver and linked back to the parameters.

use super::files::{link_files_to_parameters, FileCollector, ResolvedFile};
use super::script::{assign_step_ids, DriverScript, StepEntry};
use crate::config::AssemblerConfig;
use crate::error::{ProvError, ProvResult};
use crate::graph::{
    Collection, CollectionKind, ComputerLanguage, EntityBody, EntityId, NestedGraph,
    ProvenanceGraph, Relation, Step, StepKind, Workflow,
};
use crate::hashing::sha256_file;
use crate::notebook::{NotebookProvenance, NotebookProvenanceDriver, NOTEBOOK_ENCODING};
use crate::params::{Access, ParameterVersioner};
use crate::resolver::{FileState, ResolverError, SourceControlResolver};
use crate::storage::{JsonLdWriter, METADATA_FILE};
use chrono::Utc;
use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Identifier of the collection the root data entity points at
pub const MAIN_ENTITY_ID: &str = "#pipeline-provenance";

const NOTEBOOKS_DIR: &str = "notebooks";
const BASH_ID: &str = "Bash";
const PYTHON_ID: &str = "Python";

/// A notebook step together with its nested graph
#[derive(Debug, Clone)]
pub struct NotebookRun {
    pub step: StepEntry,
    pub provenance: NotebookProvenance,
}

impl NotebookRun {
    /// Output sub-area of the nested document, relative to the pipeline output
    pub fn relative_dir(&self) -> String {
        format!("{}/{}", NOTEBOOKS_DIR, self.step.stem())
    }
}

/// Result of one assembly run
#[derive(Debug)]
pub struct PipelineProvenance {
    pub graph: ProvenanceGraph,
    pub workflow: EntityId,
    pub steps: Vec<StepEntry>,
    pub notebooks: Vec<NotebookRun>,
    pub files: Vec<ResolvedFile>,
    pub versioner: ParameterVersioner,
}

impl PipelineProvenance {
    /// Write nested notebook documents, then the pipeline document, below `out_dir`
    pub fn write(&self, out_dir: &Path) -> ProvResult<PathBuf> {
        for run in &self.notebooks {
            run.provenance.write(&out_dir.join(run.relative_dir()))?;
        }
        Ok(JsonLdWriter::new().write(&self.graph, out_dir)?)
    }
}

/// Builds a [`PipelineProvenance`] for one project directory
pub struct PipelineAssembler<'a> {
    project_dir: PathBuf,
    config: AssemblerConfig,
    resolver: &'a dyn SourceControlResolver,
}

impl<'a> PipelineAssembler<'a> {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        config: AssemblerConfig,
        resolver: &'a dyn SourceControlResolver,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            config,
            resolver,
        }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Run every assembly stage. Nothing is written to disk.
    pub fn assemble(&self) -> ProvResult<PipelineProvenance> {
        let driver_path = self.project_dir.join(&self.config.driver_script);
        let script = DriverScript::from_path(&driver_path, &self.config.secondary_scripts)?;
        let steps = assign_step_ids(&script.step_files);
        info!(driver = %self.config.driver_script, steps = steps.len(), "parsed driver script");

        let mut graph = ProvenanceGraph::new(self.graph_name());
        let main = self.add_main_entity(&mut graph)?;
        let workflow = self.add_driver_workflow(&mut graph, &driver_path, &script)?;
        graph.append_unique(&main, Relation::HasPart, &workflow)?;

        self.add_steps(&mut graph, &workflow, &steps)?;
        let mut notebooks = self.build_notebooks(&mut graph, &steps)?;

        let versioner = self.generate_parameters(&mut graph, &mut notebooks)?;
        for id in versioner.pipeline_inputs() {
            graph.append_unique(&workflow, Relation::Input, &id)?;
        }
        for id in versioner.pipeline_outputs() {
            graph.append_unique(&workflow, Relation::Output, &id)?;
        }

        let collector = FileCollector::new(&self.project_dir, self.resolver, self.config.file_limit);
        let mut files = self.resolve_files(&mut graph, &collector, &notebooks)?;

        let params: Vec<EntityId> = versioner
            .pipeline_inputs()
            .into_iter()
            .chain(versioner.pipeline_outputs())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let linked =
            link_files_to_parameters(&mut graph, &files, &params, self.config.match_strictness)?;
        info!(files = files.len(), links = linked, "linked files to formal parameters");

        if self.config.previous_state {
            let previous = self.add_previous_state(&mut graph, &collector, &versioner, &files)?;
            files.extend(previous);
        }

        info!(entities = graph.entity_count(), "assembled pipeline provenance");
        Ok(PipelineProvenance {
            graph,
            workflow,
            steps,
            notebooks,
            files,
            versioner,
        })
    }

    fn graph_name(&self) -> String {
        self.project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string())
    }

    fn add_main_entity(&self, graph: &mut ProvenanceGraph) -> ProvResult<EntityId> {
        let version = match self.resolver.last_commit_touching(&self.config.driver_script) {
            Ok(info) => Some(info.commit_url),
            Err(ResolverError::NoHistory(path)) => {
                warn!(path, "driver script has no commit history, leaving version unset");
                None
            }
            Err(e) => return Err(e.into()),
        };
        let main = graph.get_or_create(
            MAIN_ENTITY_ID,
            EntityBody::Collection(Collection {
                kind: CollectionKind::Thing,
                name: "Pipeline provenance".to_string(),
                description: Some(
                    "Provenance of the workflow executed by the driver script.".to_string(),
                ),
                date_published: Some(Utc::now()),
                version,
            }),
        );
        graph.set_main_entity(&main)?;
        Ok(main)
    }

    fn add_driver_workflow(
        &self,
        graph: &mut ProvenanceGraph,
        driver_path: &Path,
        script: &DriverScript,
    ) -> ProvResult<EntityId> {
        let bash = graph.get_or_create(
            BASH_ID,
            EntityBody::Language(ComputerLanguage {
                name: "Bash".to_string(),
                url: None,
                description: Some("Bash is a Unix shell and command language.".to_string()),
            }),
        );
        let locator = self.resolver.resolve(&self.config.driver_script)?;

        let mut description =
            "Driver script that executes the computational workflow.".to_string();
        if !script.comments.is_empty() {
            description.push_str("\n\nComments:\n");
            description.push_str(&script.comments.join("\n"));
        }

        let workflow = graph.add_data_entity(
            self.config.driver_script.as_str(),
            EntityBody::Workflow(Workflow {
                name: self.config.driver_script.clone(),
                description: Some(description),
                encoding_format: Some("text/x-sh".to_string()),
                code_repository: Some(locator.permalink),
                sha256: Some(sha256_file(driver_path)?),
            }),
        );
        graph.set_relation(&workflow, Relation::ProgrammingLanguage, &bash)?;
        Ok(workflow)
    }

    fn add_steps(
        &self,
        graph: &mut ProvenanceGraph,
        workflow: &EntityId,
        steps: &[StepEntry],
    ) -> ProvResult<()> {
        let python = graph.get_or_create(
            PYTHON_ID,
            EntityBody::Language(ComputerLanguage {
                name: "Python".to_string(),
                url: Some("https://www.python.org/".to_string()),
                description: None,
            }),
        );

        for (idx, entry) in steps.iter().enumerate() {
            let path = self.project_dir.join(&entry.file_name);
            if !path.is_file() {
                return Err(ProvError::NotFound(path));
            }
            let locator = self.resolver.resolve(&entry.file_name)?;
            let (kind, encoding) = if entry.is_notebook() {
                (StepKind::Notebook, NOTEBOOK_ENCODING)
            } else {
                (StepKind::Script, "text/x-python")
            };

            let step = graph.add_data_entity(
                entry.step_id.as_str(),
                EntityBody::Step(Step {
                    position: idx as u32 + 1,
                    name: entry.file_name.clone(),
                    kind,
                    encoding_format: Some(encoding.to_string()),
                    code_repository: Some(locator.permalink),
                    sha256: Some(sha256_file(&path)?),
                }),
            );
            graph.set_relation(&step, Relation::ProgrammingLanguage, &python)?;
            graph.append_unique(workflow, Relation::Step, &step)?;
            debug!(step = %step, position = idx + 1, "added workflow step");
        }
        Ok(())
    }

    fn build_notebooks(
        &self,
        graph: &mut ProvenanceGraph,
        steps: &[StepEntry],
    ) -> ProvResult<Vec<NotebookRun>> {
        let driver = NotebookProvenanceDriver::new()
            .with_collapse_by_basename(self.config.collapse_by_basename);

        let mut runs = Vec::new();
        for entry in steps.iter().filter(|e| e.is_notebook()) {
            let mut provenance = driver.build(&self.project_dir.join(&entry.file_name))?;
            // Repeated invocations of one notebook are stored under distinct names.
            provenance.graph.name = format!("{} provenance", entry.step_id);
            let run = NotebookRun {
                step: entry.clone(),
                provenance,
            };

            let nested = graph.add_data_entity(
                format!("{}/{}", run.relative_dir(), METADATA_FILE),
                EntityBody::NestedGraph(NestedGraph {
                    name: format!("{} Provenance Crate", entry.step_id),
                    description: format!("Provenance RO-Crate for notebook {}.", entry.step_id),
                }),
            );
            graph.set_relation(&EntityId::from(entry.step_id.as_str()), Relation::ExampleOfWork, &nested)?;
            runs.push(run);
        }
        Ok(runs)
    }

    /// Version the local parameters of every notebook cell, in step order
    fn generate_parameters(
        &self,
        graph: &mut ProvenanceGraph,
        notebooks: &mut [NotebookRun],
    ) -> ProvResult<ParameterVersioner> {
        let workflow = EntityId::from(self.config.driver_script.as_str());
        if !graph.contains(&workflow) {
            return Err(ProvError::Value(format!(
                "workflow entity {} not found before parameter generation",
                workflow
            )));
        }

        let mut versioner = ParameterVersioner::new();
        for run in notebooks.iter_mut() {
            let step = EntityId::from(run.step.step_id.as_str());
            let cells = &mut run.provenance.cells;

            let plan: Vec<(usize, Access, EntityId)> = {
                let refs: Vec<(&[EntityId], &[EntityId])> = cells
                    .iter()
                    .map(|c| (c.input_params.as_slice(), c.output_params.as_slice()))
                    .collect();
                self.config
                    .versioning_order
                    .schedule(&refs)
                    .into_iter()
                    .map(|(idx, access, id)| (idx, access, id.clone()))
                    .collect()
            };

            for (idx, access, local) in plan {
                let resolved = versioner.resolve(graph, local.as_str(), access);
                let cell = &mut cells[idx];
                let (relation, recorded) = match access {
                    Access::Read => (Relation::Input, &mut cell.resolved_inputs),
                    Access::Write => (Relation::Output, &mut cell.resolved_outputs),
                };
                graph.append_unique(&step, relation, &resolved.id)?;
                if !recorded.contains(&resolved.id) {
                    recorded.push(resolved.id);
                }
            }
        }

        info!(
            parameters = versioner.minted().count(),
            base_keys = versioner.base_keys().count(),
            "generated formal parameters"
        );
        Ok(versioner)
    }

    fn resolve_files(
        &self,
        graph: &mut ProvenanceGraph,
        collector: &FileCollector<'_>,
        notebooks: &[NotebookRun],
    ) -> ProvResult<Vec<ResolvedFile>> {
        let patterns: IndexSet<&str> = notebooks
            .iter()
            .flat_map(|run| run.provenance.cells.iter())
            .flat_map(|cell| cell.input_paths.iter().chain(cell.output_paths.iter()))
            .map(|p| p.strip_prefix("./").unwrap_or(p))
            .collect();

        let mut files: Vec<ResolvedFile> = Vec::new();
        for pattern in patterns {
            for path in collector.paths_for(pattern)? {
                let file = collector.stamp(graph, &path, pattern, FileState::Current)?;
                if !files.iter().any(|f| f.id == file.id) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }

    /// Describe files read as version 1 of a parameter the pipeline later
    /// rewrites, as they were at the previous checkpoint
    fn add_previous_state(
        &self,
        graph: &mut ProvenanceGraph,
        collector: &FileCollector<'_>,
        versioner: &ParameterVersioner,
        files: &[ResolvedFile],
    ) -> ProvResult<Vec<ResolvedFile>> {
        let mut previous: Vec<ResolvedFile> = Vec::new();
        for version in versioner.minted().filter(|p| p.version == 1) {
            if !versioner.is_written(&version.base_key)
                || !versioner.pipeline_inputs().contains(&version.id)
            {
                continue;
            }
            for file in files
                .iter()
                .filter(|f| f.matches_parameter(&version.base_key, self.config.match_strictness))
            {
                let before = collector.stamp(graph, &file.path, &file.pattern, FileState::Previous)?;
                graph.append_unique(&before.id, Relation::ExampleOfWork, &version.id)?;
                debug!(file = %before.id, parameter = %version.id, "added previous-state file");
                if !previous.iter().any(|f| f.id == before.id) {
                    previous.push(before);
                }
            }
        }
        Ok(previous)
    }
}
