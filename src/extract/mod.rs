//! Heuristic extraction of file I/O paths from source text

mod paths;

pub use paths::{extract_paths, normalize_path, ExtractedPaths};
