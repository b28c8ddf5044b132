//! Per-notebook provenance: cells, local parameters and chart outputs

mod artifact;
mod cells;
mod driver;
mod format;
mod media;
mod parameters;

pub use artifact::GeneratedFile;
pub use cells::{action_id, build_cell, code_block_path, step_id, CellRecord};
pub use driver::{NotebookProvenance, NotebookProvenanceDriver, KERNEL_ID, NOTEBOOK_ENCODING};
pub use format::{Cell, CellOutput, CellType, Notebook, NotebookError, Source};
pub use media::{collect_media, media_id};
pub use parameters::{basename, LocalParameters};
