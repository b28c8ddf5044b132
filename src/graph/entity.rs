//! Entity representation in the provenance graph

use super::relation::Relations;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable string identifier of an entity.
///
/// Serializes as a plain string (`#step-3`, `update.sh`, a permalink URL, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&EntityId> for EntityId {
    fn from(id: &EntityId) -> Self {
        id.clone()
    }
}

/// Typed pass-through property values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
}

/// Open extension map for attributes not modelled by an entity body
pub type Properties = BTreeMap<String, PropertyValue>;

/// What a step stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// One code cell of a notebook
    Cell,
    /// A whole notebook invoked by the driver script
    Notebook,
    /// A plain script invoked by the driver script
    Script,
}

/// One executable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based ordinal, unique within the parent workflow
    pub position: u32,
    pub name: String,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Source text of a single code cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub name: String,
    pub text: String,
    pub sha256: String,
}

/// One execution of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAction {
    pub name: String,
}

/// A named data slot.
///
/// Pipeline-level parameters carry a version; notebook-local ones do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormalParameter {
    pub name: String,
    pub base_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub additional_type: String,
    pub value_required: bool,
}

/// A concrete point-in-time file; the entity id is its permanent locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileArtifact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A chart or other media payload extracted from cell outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaArtifact {
    pub name: String,
    pub encoding_format: String,
}

/// A workflow document: the driver script or a notebook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Execution environment, e.g. a Jupyter kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareTool {
    pub name: String,
    pub identifier: String,
    pub version: String,
    pub programming_language: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerLanguage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// JSON-LD type of a collection entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Dataset,
    Thing,
}

/// Grouping entity: the root data entity or the main entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub kind: CollectionKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Reference to a separately written provenance document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedGraph {
    pub name: String,
    pub description: String,
}

/// Typed entity payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityBody {
    Step(Step),
    Code(CodeArtifact),
    CreateAction(CreateAction),
    FormalParameter(FormalParameter),
    File(FileArtifact),
    Media(MediaArtifact),
    Workflow(Workflow),
    Tool(SoftwareTool),
    Language(ComputerLanguage),
    Collection(Collection),
    NestedGraph(NestedGraph),
}

impl EntityBody {
    /// JSON-LD `@type` values
    pub fn type_names(&self) -> Vec<&'static str> {
        match self {
            EntityBody::Step(step) => match step.kind {
                StepKind::Cell => vec!["HowToStep"],
                StepKind::Notebook | StepKind::Script => {
                    vec!["File", "HowToStep", "SoftwareSourceCode"]
                }
            },
            EntityBody::Code(_) => vec!["SoftwareApplication", "File"],
            EntityBody::CreateAction(_) => vec!["CreateAction"],
            EntityBody::FormalParameter(_) => vec!["FormalParameter"],
            EntityBody::File(_) => vec!["File"],
            EntityBody::Media(_) => vec!["File", "MediaObject"],
            EntityBody::Workflow(_) => vec!["File", "SoftwareSourceCode", "HowTo"],
            EntityBody::Tool(_) => vec!["SoftwareApplication"],
            EntityBody::Language(_) => vec!["ComputerLanguage"],
            EntityBody::Collection(c) => match c.kind {
                CollectionKind::Dataset => vec!["Dataset"],
                CollectionKind::Thing => vec!["Thing"],
            },
            EntityBody::NestedGraph(_) => vec!["RO-Crate"],
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            EntityBody::Step(b) => &b.name,
            EntityBody::Code(b) => &b.name,
            EntityBody::CreateAction(b) => &b.name,
            EntityBody::FormalParameter(b) => &b.name,
            EntityBody::File(b) => &b.name,
            EntityBody::Media(b) => &b.name,
            EntityBody::Workflow(b) => &b.name,
            EntityBody::Tool(b) => &b.name,
            EntityBody::Language(b) => &b.name,
            EntityBody::Collection(b) => &b.name,
            EntityBody::NestedGraph(b) => &b.name,
        }
    }

    /// Short kind label used in logs and storage columns
    pub fn kind_label(&self) -> &'static str {
        match self {
            EntityBody::Step(_) => "step",
            EntityBody::Code(_) => "code",
            EntityBody::CreateAction(_) => "create_action",
            EntityBody::FormalParameter(_) => "formal_parameter",
            EntityBody::File(_) => "file",
            EntityBody::Media(_) => "media",
            EntityBody::Workflow(_) => "workflow",
            EntityBody::Tool(_) => "tool",
            EntityBody::Language(_) => "language",
            EntityBody::Collection(_) => "collection",
            EntityBody::NestedGraph(_) => "nested_graph",
        }
    }

    pub fn as_formal_parameter(&self) -> Option<&FormalParameter> {
        match self {
            EntityBody::FormalParameter(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileArtifact> {
        match self {
            EntityBody::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_step(&self) -> Option<&Step> {
        match self {
            EntityBody::Step(s) => Some(s),
            _ => None,
        }
    }
}

/// An entity in the provenance graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub id: EntityId,
    /// Typed payload
    pub body: EntityBody,
    /// Outgoing relations
    #[serde(default)]
    pub relations: Relations,
    /// Pass-through attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Properties,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, body: EntityBody) -> Self {
        Self {
            id: id.into(),
            body,
            relations: Relations::new(),
            extra: Properties::new(),
        }
    }

    /// Add a pass-through property
    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}
