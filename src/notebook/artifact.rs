//! Files generated alongside a notebook document

use std::io;
use std::path::{Path, PathBuf};

/// A file to be written below a document's output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Path relative to the output directory, `/`-separated
    pub relative_path: String,
    pub contents: Vec<u8>,
}

impl GeneratedFile {
    pub fn new(relative_path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            contents: contents.into(),
        }
    }

    /// Write the file below `out_dir`, creating parent directories
    pub fn write_under(&self, out_dir: &Path) -> io::Result<PathBuf> {
        let target = out_dir.join(&self.relative_path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &self.contents)?;
        Ok(target)
    }
}
