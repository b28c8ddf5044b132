//! Jupyter notebook (nbformat v4) document model

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a notebook
#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("failed to read notebook {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse notebook {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Cell source: nbformat allows a single string or a list of lines
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Text(String),
    Lines(Vec<String>),
}

impl Default for Source {
    fn default() -> Self {
        Source::Text(String::new())
    }
}

impl Source {
    pub fn text(&self) -> String {
        match self {
            Source::Text(s) => s.clone(),
            Source::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Code,
    Markdown,
    Raw,
    #[serde(other)]
    Other,
}

/// One output of a code cell.
///
/// Accepts any JSON value so a malformed output never rejects the notebook.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Value")]
pub struct CellOutput {
    pub output_type: Option<String>,
    pub data: Option<Value>,
}

impl From<Value> for CellOutput {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };
        Self {
            output_type: match fields.remove("output_type") {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            data: fields.remove("data"),
        }
    }
}

impl CellOutput {
    /// Rich outputs that may carry a MIME bundle
    pub fn is_rich(&self) -> bool {
        matches!(
            self.output_type.as_deref(),
            Some("display_data" | "execute_result")
        )
    }

    /// The MIME bundle, if `data` is a JSON object
    pub fn bundle(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref().and_then(Value::as_object)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    pub cell_type: CellType,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub outputs: Vec<CellOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KernelSpec {
    pub name: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageInfo {
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookMetadata {
    #[serde(default)]
    pub kernelspec: Option<KernelSpec>,
    #[serde(default)]
    pub language_info: Option<LanguageInfo>,
}

/// A parsed notebook document
#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub metadata: NotebookMetadata,
}

impl Notebook {
    pub fn from_path(path: &Path) -> Result<Self, NotebookError> {
        let text = std::fs::read_to_string(path).map_err(|source| NotebookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| NotebookError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Code cells in source order
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.cell_type == CellType::Code)
    }

    pub fn kernel_name(&self) -> &str {
        self.metadata
            .kernelspec
            .as_ref()
            .and_then(|k| k.name.as_deref())
            .unwrap_or("python3")
    }

    pub fn kernel_display_name(&self) -> &str {
        self.metadata
            .kernelspec
            .as_ref()
            .and_then(|k| k.display_name.as_deref())
            .unwrap_or("Python 3")
    }

    pub fn language_version(&self) -> &str {
        self.metadata
            .language_info
            .as_ref()
            .and_then(|l| l.version.as_deref())
            .unwrap_or("unknown")
    }

    /// Text of the first top-level heading found in a markdown cell
    pub fn title(&self) -> Option<String> {
        self.cells
            .iter()
            .filter(|c| c.cell_type == CellType::Markdown)
            .find_map(|c| first_heading(&c.source.text()))
    }
}

fn first_heading(markdown: &str) -> Option<String> {
    let mut best: Option<(HeadingLevel, String)> = None;
    let mut current: Option<(HeadingLevel, String)> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((level, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    let text = text.trim().to_string();
                    if !text.is_empty() && best.as_ref().map_or(true, |(l, _)| level < *l) {
                        best = Some((level, text));
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(_, text)| text)
}
