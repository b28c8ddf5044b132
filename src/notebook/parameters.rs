//! Notebook-local formal parameters, keyed by file basename

use crate::extract::ExtractedPaths;
use crate::graph::{EntityBody, EntityId, FormalParameter, ProvenanceGraph};
use crate::params::local_parameter_id;
use std::collections::{BTreeMap, BTreeSet};

/// Unversioned parameters of one notebook.
///
/// With `collapse_by_basename` set, `data/a/x.csv` and `out/x.csv` share
/// one parameter; otherwise the full normalised path is the key.
#[derive(Debug, Clone, Default)]
pub struct LocalParameters {
    collapse_by_basename: bool,
    by_key: BTreeMap<String, EntityId>,
}

/// Final path component of a `/`-separated path
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

impl LocalParameters {
    /// Create one parameter per distinct key across `paths` and register it in `graph`
    pub fn collect(
        graph: &mut ProvenanceGraph,
        paths: &ExtractedPaths,
        collapse_by_basename: bool,
    ) -> Self {
        let mut params = Self {
            collapse_by_basename,
            by_key: BTreeMap::new(),
        };
        let all: BTreeSet<&String> = paths.inputs.iter().chain(paths.outputs.iter()).collect();
        for path in all {
            let key = params.key_for(path).to_string();
            if params.by_key.contains_key(&key) {
                continue;
            }
            let id = graph.get_or_create(
                local_parameter_id(&key),
                EntityBody::FormalParameter(FormalParameter {
                    name: basename(path).to_string(),
                    base_key: key.clone(),
                    version: None,
                    additional_type: "File".to_string(),
                    value_required: true,
                }),
            );
            params.by_key.insert(key, id);
        }
        params
    }

    fn key_for<'a>(&self, path: &'a str) -> &'a str {
        if self.collapse_by_basename {
            basename(path)
        } else {
            path
        }
    }

    /// Parameter standing for `path`, if one was collected
    pub fn lookup(&self, path: &str) -> Option<&EntityId> {
        self.by_key.get(self.key_for(path))
    }

    /// Sorted, duplicate-free parameter ids for a list of paths
    pub fn ids_for<'a>(&self, paths: impl IntoIterator<Item = &'a String>) -> Vec<EntityId> {
        paths
            .into_iter()
            .filter_map(|p| self.lookup(p).cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityId)> {
        self.by_key.iter().map(|(k, v)| (k.as_str(), v))
    }
}
