#![forbid(unsafe_code)]

//! Tunables for the drag coordinator.
//!
//! Every field has a default, so `CoordinatorConfig::default()` is the
//! normal choice. With the `config` feature the struct can be loaded from
//! TOML or JSON:
//!
//! ```toml
//! # stackdrag.toml
//! transition_log_capacity = 128
//! stall_warning_after_ms = 10000
//! equivalence_scan_limit = 32
//! registry_prune_watermark = 512
//! ```
//!
//! ```rust,ignore
//! let config = CoordinatorConfig::from_toml_file("stackdrag.toml")?;
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::registry::DEFAULT_PRUNE_WATERMARK;

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CoordinatorConfig {
    /// Maximum number of phase transitions retained for `drain_transitions`.
    pub transition_log_capacity: usize,
    /// Log a warning once when a session waits in `Completing` longer than
    /// this. Never ends the session. `None` disables the warning.
    pub stall_warning_after_ms: Option<u64>,
    /// Equivalence checks per release after which one warning is logged.
    /// The whole stack is still scanned. `None` disables the warning.
    pub equivalence_scan_limit: Option<usize>,
    /// Registry size at which dead row entries are swept.
    pub registry_prune_watermark: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            transition_log_capacity: 64,
            stall_warning_after_ms: Some(30_000),
            equivalence_scan_limit: None,
            registry_prune_watermark: DEFAULT_PRUNE_WATERMARK,
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn with_transition_log_capacity(mut self, capacity: usize) -> Self {
        self.transition_log_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_stall_warning(mut self, after: Option<Duration>) -> Self {
        self.stall_warning_after_ms = after.map(|d| d.as_millis() as u64);
        self
    }

    #[must_use]
    pub fn with_equivalence_scan_limit(mut self, limit: Option<usize>) -> Self {
        self.equivalence_scan_limit = limit;
        self
    }

    #[must_use]
    pub fn with_registry_prune_watermark(mut self, watermark: usize) -> Self {
        self.registry_prune_watermark = watermark;
        self
    }

    /// Stall warning threshold as a duration.
    #[must_use]
    pub fn stall_warning_after(&self) -> Option<Duration> {
        self.stall_warning_after_ms.map(Duration::from_millis)
    }

    /// Check every field. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.transition_log_capacity == 0 {
            errors.push("transition_log_capacity must be > 0".into());
        }
        if self.stall_warning_after_ms == Some(0) {
            errors.push("stall_warning_after_ms must be > 0 when set".into());
        }
        if self.equivalence_scan_limit == Some(0) {
            errors.push("equivalence_scan_limit must be > 0 when set".into());
        }
        if self.registry_prune_watermark == 0 {
            errors.push("registry_prune_watermark must be > 0".into());
        }

        errors
    }

    /// Load from a TOML string and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(s)
            .map_err(ConfigError::Toml)?
            .validated()
    }

    /// Load from a TOML file on disk and validate.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string and validate.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Self>(s)
            .map_err(ConfigError::Json)?
            .validated()
    }

    /// Load from a JSON file on disk and validate.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Load from a file, choosing the format from its extension
    /// (`.json` is JSON, anything else is TOML).
    #[cfg(feature = "config")]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Return `self` if valid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading a [`CoordinatorConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
