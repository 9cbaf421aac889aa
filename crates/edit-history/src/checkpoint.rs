#![forbid(unsafe_code)]

//! Checkpoint descriptors attached to state transitions.
//!
//! Every commit ends with the edit function describing what it just did.
//! The description is a [`Checkpoint`]:
//!
//! - [`Checkpoint::Standard`] records (or squashes into) a history entry.
//! - [`Checkpoint::Skip`] records nothing; the change is treated as transient.
//! - [`Checkpoint::Soft`] records nothing but breaks the squash chain of the
//!   current entry.
//!
//! # Squashing
//!
//! Two consecutive standard checkpoints squash into one history record when
//! their `action` tags are equal and both carry the same [`SquashKey`].
//! A checkpoint without a key never squashes.
//!
//! ```text
//! commit(rename, key=title, "A")   stack: [init, rename "A"]
//! commit(rename, key=title, "AB")  stack: [init, rename "AB"]   (squashed)
//! commit(rename, key=body,  "x")   stack: [init, rename "AB", rename "x"]
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Action tag reserved for the sentinel record at the bottom of every stack.
pub const INIT_ACTION: &str = "init";

/// Key that lets consecutive commits of the same action merge into one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(untagged))]
pub enum SquashKey {
    /// Textual key, e.g. the name of the field being edited.
    Text(String),
    /// Numeric key, e.g. the index of the list item being edited.
    Number(i64),
}

impl fmt::Display for SquashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for SquashKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SquashKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SquashKey {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SquashKey {
    fn from(value: i32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<u32> for SquashKey {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<usize> for SquashKey {
    fn from(value: usize) -> Self {
        // Indices beyond i64::MAX cannot occur in practice; saturate rather than wrap.
        Self::Number(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Metadata describing one recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CheckpointInfo {
    /// Kind of edit, e.g. `"rename"` or `"move-item"`.
    pub action: String,
    /// Human-readable label for history lists.
    pub description: String,
    /// Optional squash key. See the module docs.
    pub squash_by: Option<SquashKey>,
}

impl CheckpointInfo {
    /// Create checkpoint metadata without a squash key.
    #[must_use]
    pub fn new(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            description: description.into(),
            squash_by: None,
        }
    }

    /// Set the squash key.
    #[must_use]
    pub fn squash_by(mut self, key: impl Into<SquashKey>) -> Self {
        self.squash_by = Some(key.into());
        self
    }

    /// Whether a commit carrying `self` may merge into a record with the given
    /// action and squash key.
    #[must_use]
    pub fn squashes_into(&self, action: &str, squash_by: Option<&SquashKey>) -> bool {
        match (&self.squash_by, squash_by) {
            (Some(ours), Some(theirs)) => self.action == action && ours == theirs,
            _ => false,
        }
    }
}

/// Outcome reported by an edit function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkpoint {
    /// Record the edit, squashing into the current record when eligible.
    Standard(CheckpointInfo),
    /// Do not touch history at all.
    Skip,
    /// Do not add a record, but break the current record's squash chain.
    Soft,
}

impl Checkpoint {
    /// Standard checkpoint without a squash key.
    #[must_use]
    pub fn new(action: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Standard(CheckpointInfo::new(action, description))
    }

    /// Standard checkpoint that squashes with neighbours sharing `key`.
    #[must_use]
    pub fn squashed(
        action: impl Into<String>,
        description: impl Into<String>,
        key: impl Into<SquashKey>,
    ) -> Self {
        Self::Standard(CheckpointInfo::new(action, description).squash_by(key))
    }

    /// Short label used in log output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Standard(_) => "standard",
            Self::Skip => "skip",
            Self::Soft => "soft",
        }
    }
}

impl From<CheckpointInfo> for Checkpoint {
    fn from(info: CheckpointInfo) -> Self {
        Self::Standard(info)
    }
}
