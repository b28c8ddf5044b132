//! Versioning of pipeline-level formal parameters.
//!
//! Every base key starts at version 1 on first reference. Each later write
//! mints the next version; reads return the current one. Versions for a key
//! are therefore dense from 1 and prior versions stay in the graph.

use super::normalize::{normalize_identifier, MatchStrictness};
use crate::graph::{EntityBody, EntityId, FormalParameter, ProvenanceGraph};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Direction of a parameter reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

/// Order in which a notebook's parameter references are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersioningOrder {
    /// Every input of every cell, then every output of every cell
    #[default]
    InputsThenOutputs,
    /// Each cell's inputs then its outputs, cell after cell
    CellByCell,
}

impl VersioningOrder {
    /// Flatten per-cell `(inputs, outputs)` references into resolution order.
    ///
    /// Each item carries the index of the cell it came from.
    pub fn schedule<'a>(
        &self,
        cells: &[(&'a [EntityId], &'a [EntityId])],
    ) -> Vec<(usize, Access, &'a EntityId)> {
        let mut plan = Vec::new();
        match self {
            VersioningOrder::InputsThenOutputs => {
                for (idx, (inputs, _)) in cells.iter().enumerate() {
                    plan.extend(inputs.iter().map(|id| (idx, Access::Read, id)));
                }
                for (idx, (_, outputs)) in cells.iter().enumerate() {
                    plan.extend(outputs.iter().map(|id| (idx, Access::Write, id)));
                }
            }
            VersioningOrder::CellByCell => {
                for (idx, (inputs, outputs)) in cells.iter().enumerate() {
                    plan.extend(inputs.iter().map(|id| (idx, Access::Read, id)));
                    plan.extend(outputs.iter().map(|id| (idx, Access::Write, id)));
                }
            }
        }
        plan
    }
}

/// One minted version of a formal parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterVersion {
    pub base_key: String,
    pub version: u32,
    pub id: EntityId,
}

impl ParameterVersion {
    fn new(base_key: &str, version: u32) -> Self {
        Self {
            base_key: base_key.to_string(),
            version,
            id: EntityId::new(format!("#fp-{}-{}", base_key, version)),
        }
    }

    fn body(&self) -> EntityBody {
        EntityBody::FormalParameter(FormalParameter {
            name: self.id.to_string(),
            base_key: self.base_key.clone(),
            version: Some(self.version),
            additional_type: "File".to_string(),
            value_required: true,
        })
    }
}

/// Per-run version state, keyed by canonical base key in first-seen order
#[derive(Debug, Default)]
pub struct ParameterVersioner {
    current: IndexMap<String, ParameterVersion>,
    written: HashSet<EntityId>,
    minted: Vec<ParameterVersion>,
}

impl ParameterVersioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a raw parameter reference to a versioned identifier and make
    /// sure the matching entity exists in `graph`.
    pub fn resolve(
        &mut self,
        graph: &mut ProvenanceGraph,
        raw: &str,
        access: Access,
    ) -> ParameterVersion {
        let base_key = normalize_identifier(raw, MatchStrictness::Exact);

        let resolved = match (self.version_of(&base_key), access) {
            (None, _) => self.mint(ParameterVersion::new(&base_key, 1)),
            (Some(version), Access::Write) => {
                self.mint(ParameterVersion::new(&base_key, version + 1))
            }
            (Some(version), Access::Read) => ParameterVersion::new(&base_key, version),
        };

        if access == Access::Write {
            self.written.insert(resolved.id.clone());
        }
        graph.get_or_create(resolved.id.clone(), resolved.body());
        resolved
    }

    fn mint(&mut self, version: ParameterVersion) -> ParameterVersion {
        debug!(id = %version.id, "minted parameter version");
        self.current.insert(version.base_key.clone(), version.clone());
        self.minted.push(version.clone());
        version
    }

    /// Current version record of a base key
    pub fn current(&self, base_key: &str) -> Option<&ParameterVersion> {
        self.current.get(base_key)
    }

    /// Current version number of a base key
    pub fn version_of(&self, base_key: &str) -> Option<u32> {
        self.current.get(base_key).map(|p| p.version)
    }

    /// Every version minted for `base_key`, in ascending order
    pub fn versions(&self, base_key: &str) -> Vec<u32> {
        self.minted
            .iter()
            .filter(|p| p.base_key == base_key)
            .map(|p| p.version)
            .collect()
    }

    /// All minted versions in mint order
    pub fn minted(&self) -> impl Iterator<Item = &ParameterVersion> {
        self.minted.iter()
    }

    /// Base keys in first-seen order
    pub fn base_keys(&self) -> impl Iterator<Item = &str> {
        self.current.keys().map(String::as_str)
    }

    /// True when any version of `base_key` was handed out for a write
    pub fn is_written(&self, base_key: &str) -> bool {
        self.minted
            .iter()
            .any(|p| p.base_key == base_key && self.written.contains(&p.id))
    }

    /// Version-1 identifiers never returned for a write
    pub fn pipeline_inputs(&self) -> Vec<EntityId> {
        self.current
            .keys()
            .map(|key| ParameterVersion::new(key, 1).id)
            .filter(|id| !self.written.contains(id))
            .collect()
    }

    /// Highest version of every base key that was written at least once
    pub fn pipeline_outputs(&self) -> Vec<EntityId> {
        self.current
            .iter()
            .filter(|(key, _)| self.is_written(key))
            .map(|(_, current)| current.id.clone())
            .collect()
    }
}
