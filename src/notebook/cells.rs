//! Per-cell steps, code artifacts and create actions

use super::artifact::GeneratedFile;
use super::format::Cell;
use super::parameters::LocalParameters;
use crate::extract::extract_paths;
use crate::graph::{
    CodeArtifact, CreateAction, EntityBody, EntityId, GraphResult, ProvenanceGraph, Relation,
    Step, StepKind,
};
use crate::hashing::sha256_hex;

/// What one code cell reads, writes and produced
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    /// 1-based index among code cells
    pub position: u32,
    pub step_id: EntityId,
    pub code_id: EntityId,
    pub action_id: EntityId,
    pub source: String,
    /// Sorted normalised paths read by the cell
    pub input_paths: Vec<String>,
    /// Sorted normalised paths written by the cell
    pub output_paths: Vec<String>,
    /// Notebook-local parameters for `input_paths`
    pub input_params: Vec<EntityId>,
    /// Notebook-local parameters for `output_paths`
    pub output_params: Vec<EntityId>,
    /// Pipeline-level parameters resolved for this cell's inputs
    pub resolved_inputs: Vec<EntityId>,
    /// Pipeline-level parameters resolved for this cell's outputs
    pub resolved_outputs: Vec<EntityId>,
    /// Media artifact produced by the cell, if any
    pub result: Option<EntityId>,
}

pub fn step_id(position: u32) -> EntityId {
    EntityId::new(format!("#step-{}", position))
}

pub fn code_block_path(position: u32) -> String {
    format!("code_blocks/cell_{}.py", position)
}

pub fn action_id(position: u32) -> EntityId {
    EntityId::new(format!("#create-action-{}", position))
}

/// Build step, code artifact and create action for one code cell.
///
/// The cell source is returned as a generated file for `code_blocks/`.
pub fn build_cell(
    graph: &mut ProvenanceGraph,
    position: u32,
    cell: &Cell,
    kernel: &EntityId,
    params: &LocalParameters,
) -> GraphResult<(CellRecord, GeneratedFile)> {
    let source = cell.source.text();
    let paths = extract_paths(&source);
    let input_paths: Vec<String> = paths.inputs.iter().cloned().collect();
    let output_paths: Vec<String> = paths.outputs.iter().cloned().collect();
    let input_params = params.ids_for(&input_paths);
    let output_params = params.ids_for(&output_paths);

    let step = graph.get_or_create(
        step_id(position),
        EntityBody::Step(Step {
            position,
            name: format!("Code cell {}", position),
            kind: StepKind::Cell,
            encoding_format: None,
            code_repository: None,
            sha256: None,
        }),
    );
    graph.set_relation(&step, Relation::Tool, kernel)?;

    let block_path = code_block_path(position);
    let code = graph.add_data_entity(
        block_path.clone(),
        EntityBody::Code(CodeArtifact {
            name: format!("Code Cell {}", position),
            text: source.clone(),
            sha256: sha256_hex(source.as_bytes()),
        }),
    );
    for param in &input_params {
        graph.append_unique(&code, Relation::Input, param)?;
    }
    for param in &output_params {
        graph.append_unique(&code, Relation::Output, param)?;
    }
    graph.set_relation(&step, Relation::WorkExample, &code)?;

    let action = graph.get_or_create(
        action_id(position),
        EntityBody::CreateAction(CreateAction {
            name: format!("Execution of code cell {}", position),
        }),
    );
    graph.set_relation(&action, Relation::Instrument, &code)?;
    graph.set_relation(&step, Relation::About, &action)?;

    let record = CellRecord {
        position,
        step_id: step,
        code_id: code,
        action_id: action,
        source: source.clone(),
        input_paths,
        output_paths,
        input_params,
        output_params,
        resolved_inputs: Vec::new(),
        resolved_outputs: Vec::new(),
        result: None,
    };
    Ok((record, GeneratedFile::new(block_path, source)))
}
