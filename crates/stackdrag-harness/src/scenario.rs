//! Scripted drag scenarios.
//!
//! A scenario seeds a navigation stack of folder paths and then performs a
//! sequence of drags, each from a fresh row in the topmost folder:
//!
//! ```json
//! {
//!   "stack": ["/", "/projects", "/projects/rust"],
//!   "completion": "deferred",
//!   "drags": [
//!     { "row": { "child": "notes" } },
//!     { "row": { "link": "/projects" }, "over": ["back_button"] },
//!     { "row": { "link": "/" }, "outcome": "cancel" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use stackdrag_core::CoordinatorConfig;
use stackdrag_core::testing::CompletionMode;

use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Folder paths, bottom first.
    pub stack: Vec<String>,
    #[serde(default)]
    pub completion: Completion,
    /// Inline coordinator config; `--config` takes precedence.
    #[serde(default)]
    pub config: Option<CoordinatorConfig>,
    pub drags: Vec<DragStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    #[default]
    Immediate,
    Twice,
    Deferred,
    Never,
}

impl From<Completion> for CompletionMode {
    fn from(value: Completion) -> Self {
        match value {
            Completion::Immediate => Self::Immediate,
            Completion::Twice => Self::Twice,
            Completion::Deferred => Self::Deferred,
            Completion::Never => Self::Never,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DragStep {
    pub row: RowSpec,
    /// Whether the row registers for dragging before pickup.
    #[serde(default = "default_true")]
    pub register: bool,
    /// Surfaces the pointer passes over before the outcome.
    #[serde(default)]
    pub over: Vec<Surface>,
    #[serde(default)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSpec {
    /// Row for a subfolder of the topmost folder.
    Child(String),
    /// Shortcut row to an absolute path.
    Link(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    BackButton,
    /// The list of the stack entry at this index.
    Entry(usize),
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Release,
    Cancel,
}

fn default_true() -> bool {
    true
}

impl Scenario {
    /// Read and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HarnessError::MissingPath {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario: Self =
            serde_json::from_str(&content).map_err(|source| HarnessError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stack.is_empty() {
            return Err(HarnessError::invalid("stack must contain at least one folder"));
        }
        if let Some(bad) = self.stack.iter().find(|path| !path.starts_with('/')) {
            return Err(HarnessError::invalid(format!(
                "stack path {bad:?} is not absolute"
            )));
        }
        for (index, step) in self.drags.iter().enumerate() {
            match &step.row {
                RowSpec::Child(name) if name.is_empty() || name.contains('/') => {
                    return Err(HarnessError::invalid(format!(
                        "drag {index}: child name {name:?} must be a single path segment"
                    )));
                }
                RowSpec::Link(path) if !path.starts_with('/') => {
                    return Err(HarnessError::invalid(format!(
                        "drag {index}: link {path:?} is not absolute"
                    )));
                }
                _ => {}
            }
        }
        if let Some(config) = &self.config {
            config.clone().validated()?;
        }
        Ok(())
    }
}
