//! In-memory resolver for offline runs and tests

use super::traits::{
    percent_encode_path, CommitInfo, FileState, Locator, ResolverError, ResolverResult,
    SourceControlResolver,
};
use crate::hashing::{sha256_file, sha256_hex};
use std::collections::HashMap;
use std::path::PathBuf;

/// Resolver with a fixed base URL and commit.
///
/// Current state comes from the working tree under `project_dir`; the
/// previous state is whatever was registered with `with_previous_file`.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    project_dir: PathBuf,
    base_url: String,
    commit: String,
    previous_commit: Option<String>,
    previous_files: HashMap<String, Vec<u8>>,
}

impl StaticResolver {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        base_url: impl Into<String>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            commit: commit.into(),
            previous_commit: None,
            previous_files: HashMap::new(),
        }
    }

    pub fn with_previous_commit(mut self, commit: impl Into<String>) -> Self {
        self.previous_commit = Some(commit.into());
        self
    }

    /// Register the contents `path` had at the previous commit
    pub fn with_previous_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.previous_files.insert(path.into(), contents.into());
        self
    }

    fn permalink(&self, commit: &str, path: &str) -> String {
        format!("{}/blob/{}/{}", self.base_url, commit, percent_encode_path(path))
    }

    fn previous(&self) -> ResolverResult<&str> {
        self.previous_commit
            .as_deref()
            .ok_or(ResolverError::InsufficientHistory { found: 1 })
    }
}

impl SourceControlResolver for StaticResolver {
    fn resolve(&self, path: &str) -> ResolverResult<Locator> {
        Ok(Locator {
            permalink: self.permalink(&self.commit, path),
            commit_hash: self.commit.clone(),
            exists: self.project_dir.join(path).is_file(),
        })
    }

    fn resolve_previous(&self, path: &str) -> ResolverResult<Locator> {
        let commit = self.previous()?;
        Ok(Locator {
            permalink: self.permalink(commit, path),
            commit_hash: commit.to_string(),
            exists: self.previous_files.contains_key(path),
        })
    }

    fn size_at(&self, path: &str, commit_hash: &str) -> ResolverResult<Option<u64>> {
        if commit_hash == self.commit {
            let local = self.project_dir.join(path);
            return Ok(std::fs::metadata(local).ok().map(|m| m.len()));
        }
        if self.previous_commit.as_deref() == Some(commit_hash) {
            return Ok(self.previous_files.get(path).map(|b| b.len() as u64));
        }
        Ok(None)
    }

    fn hash_of(&self, path: &str, state: FileState) -> ResolverResult<Option<String>> {
        match state {
            FileState::Current => {
                let local = self.project_dir.join(path);
                if local.is_file() {
                    Ok(Some(sha256_file(&local)?))
                } else {
                    Ok(None)
                }
            }
            FileState::Previous => {
                self.previous()?;
                Ok(self.previous_files.get(path).map(|b| sha256_hex(b)))
            }
        }
    }

    fn last_commit_touching(&self, _path: &str) -> ResolverResult<CommitInfo> {
        Ok(CommitInfo {
            commit_hash: self.commit.clone(),
            commit_url: format!("{}/commit/{}", self.base_url, self.commit),
        })
    }
}
