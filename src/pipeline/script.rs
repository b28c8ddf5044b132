//! Driver script parsing and step identifier assignment

use crate::error::{ProvError, ProvResult};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// What a driver script says about the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverScript {
    /// Comment lines in order, `#!` lines excluded
    pub comments: Vec<String>,
    /// Step file names in invocation order, repeats kept
    pub step_files: Vec<String>,
}

impl DriverScript {
    /// Read and parse a driver script
    pub fn from_path(path: &Path, secondary_scripts: &[String]) -> ProvResult<Self> {
        if !path.is_file() {
            return Err(ProvError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(parse_driver_text(&text, secondary_scripts))
    }

    pub fn is_empty(&self) -> bool {
        self.step_files.is_empty()
    }
}

/// Parse driver script text.
///
/// `jupyter nbconvert` lines contribute every token ending in `.ipynb`;
/// a line invoking one of `secondary_scripts` directly (`./x.py`) or through
/// `python`/`python3` contributes that script.
pub fn parse_driver_text(text: &str, secondary_scripts: &[String]) -> DriverScript {
    let mut script = DriverScript::default();

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('#') && !line.starts_with("#!") {
            script.comments.push(line.to_string());
            continue;
        }

        if line.starts_with("jupyter nbconvert") {
            script.step_files.extend(
                line.split_whitespace()
                    .filter(|token| token.ends_with(".ipynb"))
                    .map(|token| strip_dot_slash(token).to_string()),
            );
        } else if let Some(name) = secondary_invocation(line, secondary_scripts) {
            script.step_files.push(name.to_string());
        }
    }

    script
}

fn strip_dot_slash(token: &str) -> &str {
    token.strip_prefix("./").unwrap_or(token)
}

fn secondary_invocation<'a>(line: &str, secondary_scripts: &'a [String]) -> Option<&'a str> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    let invoked = match first {
        "python" | "python3" => strip_dot_slash(tokens.next()?),
        other => other.strip_prefix("./")?,
    };
    secondary_scripts
        .iter()
        .find(|name| name.as_str() == invoked)
        .map(String::as_str)
}

/// One step of the driver workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    /// File name as invoked, relative to the project directory
    pub file_name: String,
    /// Unique identifier within the pipeline graph
    pub step_id: String,
    /// 1 for the first invocation of this file, 2 for the second, ...
    pub occurrence: u32,
}

impl StepEntry {
    pub fn is_notebook(&self) -> bool {
        self.file_name.ends_with(".ipynb")
    }

    /// Step identifier without its extension, used for output sub-areas
    pub fn stem(&self) -> &str {
        split_extension(&self.step_id).0
    }
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Give every step a unique identifier.
///
/// The first invocation of a file keeps its bare name. A later invocation
/// becomes `<stem>-<k>.<ext>`, starting from its occurrence number and
/// bumping `k` past any identifier already taken, including the bare names
/// of other files in the script.
pub fn assign_step_ids(step_files: &[String]) -> Vec<StepEntry> {
    let mut taken: HashSet<String> = step_files.iter().cloned().collect();
    let mut seen: HashMap<&str, u32> = HashMap::new();
    step_files
        .iter()
        .map(|file_name| {
            let count = seen.entry(file_name.as_str()).or_insert(0);
            *count += 1;
            let step_id = if *count == 1 {
                file_name.clone()
            } else {
                let mut k = *count;
                loop {
                    let candidate = suffixed(file_name, k);
                    if taken.insert(candidate.clone()) {
                        break candidate;
                    }
                    k += 1;
                }
            };
            StepEntry {
                file_name: file_name.clone(),
                step_id,
                occurrence: *count,
            }
        })
        .collect()
}

fn suffixed(file_name: &str, k: u32) -> String {
    match split_extension(file_name) {
        (stem, Some(ext)) => format!("{}-{}.{}", stem, k, ext),
        (stem, None) => format!("{}-{}", stem, k),
    }
}
