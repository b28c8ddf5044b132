//! Resolver backed by the `git` command line

use super::traits::{
    percent_encode_path, CommitInfo, FileState, Locator, ResolverError, ResolverResult,
    SourceControlResolver,
};
use crate::hashing::{sha256_file, sha256_hex};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Resolves files against the HEAD commit of a git checkout.
///
/// Permalinks point at `<remote>/blob/<commit>/<path>`. The previous state
/// of a file is read from the second most recent commit whose subject
/// matches the checkpoint pattern.
pub struct GitResolver {
    project_dir: PathBuf,
    remote_url: String,
    head: String,
    /// Path of the project directory relative to the repository root, with trailing `/`
    prefix: String,
    checkpoint_pattern: Regex,
}

/// Turn an SSH or `.git` remote into a browsable https base URL
pub fn normalize_remote_url(remote: &str) -> String {
    let mut url = remote.trim().to_string();
    if let Some(rest) = url.strip_prefix("git@github.com:") {
        url = format!("https://github.com/{}", rest);
    }
    if let Some(stripped) = url.strip_suffix(".git") {
        url = stripped.to_string();
    }
    url.trim_end_matches('/').to_string()
}

impl GitResolver {
    /// Inspect the checkout containing `project_dir`
    pub fn open(
        project_dir: impl AsRef<Path>,
        remote_name: &str,
        checkpoint_pattern: Regex,
    ) -> ResolverResult<Self> {
        let project_dir = project_dir.as_ref().to_path_buf();
        let remote = git_text(&project_dir, &["remote", "get-url", remote_name])?;
        let head = git_text(&project_dir, &["rev-parse", "HEAD"])?;
        let prefix = git_text(&project_dir, &["rev-parse", "--show-prefix"])?;

        let resolver = Self {
            project_dir,
            remote_url: normalize_remote_url(&remote),
            head,
            prefix,
            checkpoint_pattern,
        };
        debug!(remote = %resolver.remote_url, head = %resolver.head, "opened git resolver");
        Ok(resolver)
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    fn repo_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches("./"))
    }

    fn permalink(&self, commit: &str, path: &str) -> String {
        format!(
            "{}/blob/{}/{}",
            self.remote_url,
            commit,
            percent_encode_path(&self.repo_path(path))
        )
    }

    /// Whether `path` is tracked at `commit`. A bad commit or a failing git
    /// process is an error, not an absent file.
    fn exists_at(&self, commit: &str, path: &str) -> ResolverResult<bool> {
        let repo_path = self.repo_path(path);
        let listing = git_text(
            &self.project_dir,
            &["ls-tree", "--full-tree", "--name-only", commit, "--", &repo_path],
        )?;
        Ok(!listing.is_empty())
    }

    /// Checkpoint commits, newest first
    fn checkpoint_commits(&self) -> ResolverResult<Vec<String>> {
        let log = git_text(&self.project_dir, &["log", "--format=%H%x09%s"])?;
        Ok(log
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .filter(|(_, subject)| self.checkpoint_pattern.is_match(subject))
            .map(|(hash, _)| hash.to_string())
            .collect())
    }

    fn previous_commit(&self) -> ResolverResult<String> {
        let marked = self.checkpoint_commits()?;
        match marked.get(1) {
            Some(commit) => Ok(commit.clone()),
            None => Err(ResolverError::InsufficientHistory {
                found: marked.len(),
            }),
        }
    }
}

impl SourceControlResolver for GitResolver {
    fn resolve(&self, path: &str) -> ResolverResult<Locator> {
        Ok(Locator {
            permalink: self.permalink(&self.head, path),
            commit_hash: self.head.clone(),
            exists: self.exists_at(&self.head, path)?,
        })
    }

    fn resolve_previous(&self, path: &str) -> ResolverResult<Locator> {
        let commit = self.previous_commit()?;
        Ok(Locator {
            permalink: self.permalink(&commit, path),
            exists: self.exists_at(&commit, path)?,
            commit_hash: commit,
        })
    }

    fn size_at(&self, path: &str, commit_hash: &str) -> ResolverResult<Option<u64>> {
        if self.exists_at(commit_hash, path)? {
            let object = format!("{}:{}", commit_hash, self.repo_path(path));
            let size = git_text(&self.project_dir, &["cat-file", "-s", &object])?;
            return Ok(size.parse().ok());
        }
        // Uncommitted files fall back to their working-tree size.
        if commit_hash == self.head {
            let local = self.project_dir.join(path);
            Ok(std::fs::metadata(local).ok().map(|m| m.len()))
        } else {
            Ok(None)
        }
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
                let commit = self.previous_commit()?;
                if !self.exists_at(&commit, path)? {
                    return Ok(None);
                }
                let object = format!("{}:{}", commit, self.repo_path(path));
                let bytes = git_bytes(&self.project_dir, &["show", &object])?;
                Ok(Some(sha256_hex(&bytes)))
            }
        }
    }

    fn last_commit_touching(&self, path: &str) -> ResolverResult<CommitInfo> {
        let commit = git_text(
            &self.project_dir,
            &["log", "-1", "--format=%H", "--", path],
        )?;
        if commit.is_empty() {
            return Err(ResolverError::NoHistory(path.to_string()));
        }
        Ok(CommitInfo {
            commit_url: format!("{}/commit/{}", self.remote_url, commit),
            commit_hash: commit,
        })
    }
}

fn git_bytes(dir: &Path, args: &[&str]) -> ResolverResult<Vec<u8>> {
    let output = Command::new("git").arg("-C").arg(dir).args(args).output()?;
    if !output.status.success() {
        return Err(ResolverError::Git {
            command: args.join(" "),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

fn git_text(dir: &Path, args: &[&str]) -> ResolverResult<String> {
    let bytes = git_bytes(dir, args)?;
    Ok(String::from_utf8_lossy(&bytes).trim().to_string())
}
