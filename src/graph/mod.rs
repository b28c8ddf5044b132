//! Core provenance graph data structures

mod document;
mod entity;
mod jsonld;
mod relation;


pub use document::{GraphError, GraphMetadata, GraphResult, ProvenanceGraph, METADATA_ID, ROOT_ID};
pub use entity::{
    CodeArtifact, Collection, CollectionKind, ComputerLanguage, CreateAction, Entity, EntityBody,
    EntityId, FileArtifact, FormalParameter, MediaArtifact, NestedGraph, Properties,
    PropertyValue, SoftwareTool, Step, StepKind, Workflow,
};
pub use relation::{Relation, RelationEntry, RelationList, Relations};
