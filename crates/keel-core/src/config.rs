//! Workspace configuration
//!
//! `KeelConfig` is read from TOML. Every field is optional in the file;
//! anything left out takes its default.
//!
//! ```toml
//! [context]
//! window_limit = 8000
//! compression_threshold = 0.6
//!
//! [store]
//! documents_kind = "documents"
//! ```

use keel_context::{ContextConfig, ContextError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration load and validation failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Context section out of range
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A resource kind name is empty
    #[error("store.{0} must not be empty")]
    EmptyKind(&'static str),
}

/// Resource kind names used by the document tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Collection holding documents
    pub documents_kind: String,
    /// Collection holding forms
    pub forms_kind: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            documents_kind: "documents".to_string(),
            forms_kind: "forms".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeelConfig {
    /// Context store tunables
    pub context: ContextConfig,
    /// Store kind names
    pub store: StoreConfig,
}

impl KeelConfig {
    /// Set context configuration
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: ContextConfig) -> Self {
        self.context = context;
        self
    }

    /// Set store configuration
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] for malformed input, or any validation error
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`KeelConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Check every section
    ///
    /// # Errors
    /// The first out-of-range value found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.context.validate()?;
        if self.store.documents_kind.is_empty() {
            return Err(ConfigError::EmptyKind("documents_kind"));
        }
        if self.store.forms_kind.is_empty() {
            return Err(ConfigError::EmptyKind("forms_kind"));
        }
        Ok(())
    }
}
