//! Resolver trait definitions

use thiserror::Error;

/// Errors raised by source control lookups
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("need at least two checkpoint commits for a previous-state lookup, found {found}")]
    InsufficientHistory { found: usize },

    #[error("no commit touches {0}")]
    NoHistory(String),
}

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Permanent location of a file at one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub permalink: String,
    pub commit_hash: String,
    /// Whether the file exists at `commit_hash`
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub commit_hash: String,
    pub commit_url: String,
}

/// Which state of a file to look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// The working tree at the current commit
    Current,
    /// The file as of the previous checkpoint commit
    Previous,
}

/// Maps project-relative paths to permanent locators and content facts.
///
/// Paths are `/`-separated and relative to the project directory.
/// Every call may block on an external process.
pub trait SourceControlResolver {
    fn resolve(&self, path: &str) -> ResolverResult<Locator>;

    /// Locator of `path` at the previous checkpoint commit
    fn resolve_previous(&self, path: &str) -> ResolverResult<Locator>;

    /// Byte size of `path` at `commit_hash`, `None` if absent there
    fn size_at(&self, path: &str, commit_hash: &str) -> ResolverResult<Option<u64>>;

    /// Hex SHA-256 of the file contents, `None` if absent in that state
    fn hash_of(&self, path: &str, state: FileState) -> ResolverResult<Option<String>>;

    fn last_commit_touching(&self, path: &str) -> ResolverResult<CommitInfo>;
}

/// Percent-encode a path for use in a URL, keeping `/` and unreserved characters
pub fn percent_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_spaces_and_keeps_slashes() {
        assert_eq!(percent_encode_path("data/my file.csv"), "data/my%20file.csv");
        assert_eq!(percent_encode_path("a/b-c_d.e~f"), "a/b-c_d.e~f");
        assert_eq!(percent_encode_path("é"), "%C3%A9");
    }
}
