//! Concrete files behind the paths recorded on cells

use crate::config::FileLimit;
use crate::error::{ProvError, ProvResult};
use crate::graph::{EntityBody, EntityId, FileArtifact, ProvenanceGraph, Relation};
use crate::notebook::basename;
use crate::params::{is_fuzzy_match, MatchStrictness};
use crate::resolver::{FileState, SourceControlResolver};
use globset::GlobBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const MISSING_NOW: &str = "This file did not exist in the current git commit.";
const MISSING_BEFORE: &str = "This file did not exist at the previous checkpoint commit.";

/// A file entity created for a recorded path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Permanent locator, also the entity identifier
    pub id: EntityId,
    /// File name
    pub name: String,
    /// Project-relative path
    pub path: String,
    /// The recorded path or pattern this file was found through
    pub pattern: String,
}

impl ResolvedFile {
    /// True when the parameter with canonical `base_key` names this file,
    /// by its own name or by the pattern's last component
    pub fn matches_parameter(&self, base_key: &str, strictness: MatchStrictness) -> bool {
        is_fuzzy_match(base_key, &self.name, strictness)
            || is_fuzzy_match(base_key, basename(&self.pattern), strictness)
    }
}

/// Only `*` expands; every other character of a recorded path is literal
fn is_wildcard(path: &str) -> bool {
    path.contains('*')
}

/// Escape glob syntax other than `*`
fn escape_glob(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '?' | '[' | ']' | '{' | '}' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Leading directory components that contain no wildcard
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();
    for component in &components[..components.len().saturating_sub(1)] {
        if is_wildcard(component) {
            break;
        }
        prefix.push(component);
    }
    prefix
}

/// Project-relative files matching `pattern`, sorted and truncated to `limit`.
///
/// `*` does not cross `/`. The `.git` directory is never searched.
pub fn expand_pattern(project_dir: &Path, pattern: &str, limit: FileLimit) -> ProvResult<Vec<String>> {
    let matcher = GlobBuilder::new(&escape_glob(pattern))
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|e| ProvError::Value(format!("invalid file pattern {:?}: {}", pattern, e)))?
        .compile_matcher();

    let start = project_dir.join(literal_prefix(pattern));
    if !start.is_dir() {
        return Ok(Vec::new());
    }

    let mut matched: Vec<String> = WalkDir::new(&start)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(project_dir).ok()?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            matcher.is_match(&relative).then_some(relative)
        })
        .collect();
    matched.sort();

    Ok(limit.apply(matched))
}

/// Turns recorded paths into stamped file entities
pub struct FileCollector<'a> {
    project_dir: &'a Path,
    resolver: &'a dyn SourceControlResolver,
    limit: FileLimit,
}

impl<'a> FileCollector<'a> {
    pub fn new(project_dir: &'a Path, resolver: &'a dyn SourceControlResolver, limit: FileLimit) -> Self {
        Self {
            project_dir,
            resolver,
            limit,
        }
    }

    /// Paths a recorded path stands for: its wildcard expansion, or itself
    pub fn paths_for(&self, recorded: &str) -> ProvResult<Vec<String>> {
        let recorded = recorded.strip_prefix("./").unwrap_or(recorded);
        if is_wildcard(recorded) {
            match expand_pattern(self.project_dir, recorded, self.limit) {
                Ok(matched) => {
                    if matched.is_empty() {
                        debug!(pattern = recorded, "pattern matched no files");
                    }
                    Ok(matched)
                }
                Err(e) => {
                    warn!(pattern = recorded, error = %e, "unusable file pattern, keeping it as a literal path");
                    Ok(vec![recorded.to_string()])
                }
            }
        } else {
            Ok(vec![recorded.to_string()])
        }
    }

    /// Create the file entity for `path` in the given state and add it to the root
    pub fn stamp(
        &self,
        graph: &mut ProvenanceGraph,
        path: &str,
        pattern: &str,
        state: FileState,
    ) -> ProvResult<ResolvedFile> {
        let (locator, missing) = match state {
            FileState::Current => (self.resolver.resolve(path)?, MISSING_NOW),
            FileState::Previous => (self.resolver.resolve_previous(path)?, MISSING_BEFORE),
        };
        let sha256 = self.resolver.hash_of(path, state)?;
        let size = self.resolver.size_at(path, &locator.commit_hash)?;
        let name = basename(path).to_string();

        if !locator.exists {
            warn!(path, commit = %locator.commit_hash, "file missing at referenced commit");
        }

        let id = graph.add_data_entity(
            locator.permalink,
            EntityBody::File(FileArtifact {
                name: name.clone(),
                sha256,
                size,
                commit_hash: Some(locator.commit_hash),
                exists: locator.exists,
                description: (!locator.exists).then(|| missing.to_string()),
            }),
        );

        Ok(ResolvedFile {
            id,
            name,
            path: path.to_string(),
            pattern: pattern.to_string(),
        })
    }
}

/// Link every file to every parameter that names it. Returns the number of links added.
pub fn link_files_to_parameters(
    graph: &mut ProvenanceGraph,
    files: &[ResolvedFile],
    params: &[EntityId],
    strictness: MatchStrictness,
) -> ProvResult<usize> {
    let keys: Vec<String> = params.iter().map(|p| parameter_key(graph, p)).collect();
    let mut linked = 0;
    for file in files {
        for (param, key) in params.iter().zip(&keys) {
            if file.matches_parameter(key, strictness)
                && graph.append_unique(&file.id, Relation::ExampleOfWork, param)?
            {
                linked += 1;
            }
        }
    }
    Ok(linked)
}

/// Canonical base key of a parameter entity, or its identifier when the
/// graph holds no formal parameter under it
fn parameter_key(graph: &ProvenanceGraph, param: &EntityId) -> String {
    graph
        .get(param)
        .and_then(|e| e.body.as_formal_parameter())
        .map(|p| p.base_key.clone())
        .unwrap_or_else(|| param.to_string())
}
