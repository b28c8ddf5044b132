//! Pipeline-level assembly driven by the driver script

mod assembler;
mod files;
mod script;

pub use assembler::{NotebookRun, PipelineAssembler, PipelineProvenance, MAIN_ENTITY_ID};
pub use files::{expand_pattern, link_files_to_parameters, FileCollector, ResolvedFile};
pub use script::{assign_step_ids, parse_driver_text, DriverScript, StepEntry};
