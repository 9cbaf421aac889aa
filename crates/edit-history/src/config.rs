#![forbid(unsafe_code)]

//! Tracker configuration.
//!
//! # Loading
//!
//! With the `config` feature, a [`HistoryConfig`] can be read from TOML or
//! JSON. Missing fields take their defaults.
//!
//! ```toml
//! # edit-history.toml
//! limit = 200
//! warn_on_untracked_changes = true
//! ```
//!
//! ```rust,ignore
//! let config = HistoryConfig::from_toml_file("edit-history.toml")?;
//! let tracker = HistoryTracker::with_config(document, &config);
//! ```

use std::fmt;
#[cfg(feature = "config")]
use std::path::{Path, PathBuf};

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::store::MIN_LIMIT;

/// Settings for a [`HistoryTracker`](crate::HistoryTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct HistoryConfig {
    /// Maximum number of records kept, sentinel included.
    pub limit: usize,
    /// Log a warning when an edit returns `Checkpoint::Skip` but changed the
    /// live state anyway. On by default in debug builds.
    pub warn_on_untracked_changes: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            warn_on_untracked_changes: cfg!(debug_assertions),
        }
    }
}

impl HistoryConfig {
    /// Default configuration with the given record limit.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::default().with_limit(limit)
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_untracked_change_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_untracked_changes = enabled;
        self
    }

    /// Problems with this configuration; empty means valid.
    ///
    /// A limit of 0 is the only invalid setting: the sentinel always needs a
    /// slot.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.limit < MIN_LIMIT {
            problems.push(format!(
                "limit is {}, but at least {MIN_LIMIT} record is required",
                self.limit
            ));
        }
        problems
    }

    /// `self` if [`validate`](Self::validate) finds nothing, otherwise
    /// [`HistoryConfigError::Invalid`].
    pub fn checked(self) -> Result<Self, HistoryConfigError> {
        let problems = self.validate();
        if problems.is_empty() {
            Ok(self)
        } else {
            Err(HistoryConfigError::Invalid(problems))
        }
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, HistoryConfigError> {
        toml::from_str::<Self>(s)
            .map_err(HistoryConfigError::Toml)?
            .checked()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, HistoryConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, HistoryConfigError> {
        serde_json::from_str::<Self>(s)
            .map_err(HistoryConfigError::Json)?
            .checked()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HistoryConfigError> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Serialize to a TOML string.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(feature = "config")]
fn read(path: &Path) -> Result<String, HistoryConfigError> {
    std::fs::read_to_string(path).map_err(|source| HistoryConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Why a [`HistoryConfig`] was rejected.
#[derive(Debug)]
pub enum HistoryConfigError {
    /// The config file could not be read.
    #[cfg(feature = "config")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Parsed, but [`HistoryConfig::validate`] reported problems.
    Invalid(Vec<String>),
}

impl fmt::Display for HistoryConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "config")]
            Self::Read { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "malformed TOML history config: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "malformed JSON history config: {e}"),
            Self::Invalid(problems) => {
                write!(f, "invalid history config: {}", problems.join(", "))
            }
        }
    }
}

impl std::error::Error for HistoryConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "config")]
            Self::Read { source, .. } => Some(source),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}
