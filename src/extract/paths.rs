//! Line-local path extraction.
//!
//! A fixed table of call markers (`read_csv("..")`, `to_file(f"..")`, ...) is
//! matched against each line. Paths assembled across several statements are
//! not detected.

use regex_lite::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Paths read and written by a block of source, normalised and sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPaths {
    pub inputs: BTreeSet<String>,
    pub outputs: BTreeSet<String>,
}

impl ExtractedPaths {
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    /// Merge another extraction into this one
    pub fn extend(&mut self, other: ExtractedPaths) {
        self.inputs.extend(other.inputs);
        self.outputs.extend(other.outputs);
    }
}

struct MarkerTable {
    reads: Vec<Regex>,
    writes: Vec<Regex>,
}

fn marker(call: &str) -> Regex {
    let pattern = format!(r#"{}\(f?["']([^"']+)["']"#, regex_lite::escape(call));
    Regex::new(&pattern).expect("marker pattern is valid")
}

fn markers() -> &'static MarkerTable {
    static TABLE: OnceLock<MarkerTable> = OnceLock::new();
    TABLE.get_or_init(|| MarkerTable {
        reads: ["read_csv", "read_file", "glob"].into_iter().map(marker).collect(),
        writes: ["to_csv", "to_file"].into_iter().map(marker).collect(),
    })
}

struct Normalizers {
    placeholder: Regex,
    starred_word: Regex,
    star_run: Regex,
}

fn normalizers() -> &'static Normalizers {
    static RULES: OnceLock<Normalizers> = OnceLock::new();
    RULES.get_or_init(|| Normalizers {
        placeholder: Regex::new(r"\{[^}]+\}").expect("static pattern"),
        starred_word: Regex::new(r"\w*\*\w*").expect("static pattern"),
        star_run: Regex::new(r"\*+").expect("static pattern"),
    })
}

/// Normalise a captured path so that templated and globbed spellings of
/// the same location compare equal.
///
/// `{..}` placeholders become `*`, a word containing `*` collapses to `*`,
/// and runs of `*` collapse to one.
pub fn normalize_path(path: &str) -> String {
    let rules = normalizers();
    let path = rules.placeholder.replace_all(path, "*");
    let path = rules.starred_word.replace_all(&path, "*");
    rules.star_run.replace_all(&path, "*").into_owned()
}

fn collect(line: &str, patterns: &[Regex], into: &mut BTreeSet<String>) {
    for pattern in patterns {
        for caps in pattern.captures_iter(line) {
            if let Some(m) = caps.get(1) {
                into.insert(normalize_path(m.as_str()));
            }
        }
    }
}

/// Scan `source` line by line for read and write markers
pub fn extract_paths(source: &str) -> ExtractedPaths {
    let table = markers();
    let mut found = ExtractedPaths::default();
    for line in source.lines() {
        collect(line, &table.reads, &mut found.inputs);
        collect(line, &table.writes, &mut found.outputs);
    }
    found
}
