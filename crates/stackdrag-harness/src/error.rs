use std::path::PathBuf;

use stackdrag_core::{ConfigError, DragError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("path does not exist: {}", path.display())]
    MissingPath { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scenario {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid scenario: {message}")]
    InvalidScenario { message: String },

    #[error("coordinator config: {0}")]
    Config(#[from] ConfigError),

    #[error("drag {index}: {source}")]
    Drag {
        index: usize,
        #[source]
        source: DragError,
    },
}

impl HarnessError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidScenario { .. } | Self::Json { .. } | Self::Config(_) => 2,
            Self::MissingPath { .. } | Self::Io { .. } => 3,
            Self::Drag { .. } => 4,
        }
    }
}
