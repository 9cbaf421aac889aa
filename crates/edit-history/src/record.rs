#![forbid(unsafe_code)]

//! History records and the materialized read view.
//!
//! Internally a [`HistoryRecord`] stores its snapshot only while it is *not*
//! current; the current record's state lives in the [`LiveState`] cell and is
//! pulled from there whenever a [`HistoryView`] is built. That keeps exactly
//! one copy of the live value around instead of one per record.
//!
//! [`LiveState`]: crate::LiveState

use std::sync::Arc;

use web_time::SystemTime;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::checkpoint::{CheckpointInfo, INIT_ACTION, SquashKey};

/// One entry of the history stack.
#[derive(Debug, Clone)]
pub struct HistoryRecord<T> {
    pub(crate) state: Option<Arc<T>>,
    pub(crate) action: String,
    pub(crate) description: String,
    pub(crate) squash_by: Option<SquashKey>,
    pub(crate) time: SystemTime,
}

impl<T> HistoryRecord<T> {
    /// Sentinel record for the bottom of a fresh stack.
    pub(crate) fn sentinel(time: SystemTime) -> Self {
        Self {
            state: None,
            action: INIT_ACTION.to_owned(),
            description: String::new(),
            squash_by: None,
            time,
        }
    }

    /// Record produced by a standard checkpoint. Starts out current.
    pub(crate) fn from_checkpoint(info: CheckpointInfo, time: SystemTime) -> Self {
        Self {
            state: None,
            action: info.action,
            description: info.description,
            squash_by: info.squash_by,
            time,
        }
    }

    /// Fold a squashed checkpoint into this record.
    pub(crate) fn absorb(&mut self, info: CheckpointInfo, time: SystemTime) {
        self.action = info.action;
        self.description = info.description;
        self.squash_by = info.squash_by;
        self.time = time;
    }

    /// Action tag of the checkpoint that produced this record.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Squash key, if the squash chain is still open.
    #[must_use]
    pub fn squash_by(&self) -> Option<&SquashKey> {
        self.squash_by.as_ref()
    }

    /// Commit time.
    #[must_use]
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// Whether this is the `init` sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.action == INIT_ACTION
    }

    /// Whether a snapshot is held. False exactly for the current record.
    #[must_use]
    pub fn has_snapshot(&self) -> bool {
        self.state.is_some()
    }
}

/// A record with its state materialized.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RecordView<T> {
    /// State at this point in history.
    pub state: Arc<T>,
    /// Action tag.
    pub action: String,
    /// Human-readable description.
    pub description: String,
    /// Squash key, if any.
    pub squash_by: Option<SquashKey>,
    /// Commit time.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_epoch_millis"))]
    pub time: SystemTime,
}

impl<T> RecordView<T> {
    pub(crate) fn into_record(self, current: bool) -> (HistoryRecord<T>, Arc<T>) {
        let state = Arc::clone(&self.state);
        let record = HistoryRecord {
            state: if current { None } else { Some(self.state) },
            action: self.action,
            description: self.description,
            squash_by: self.squash_by,
            time: self.time,
        };
        (record, state)
    }
}

/// Snapshot of the whole tracker, as handed to history UIs.
///
/// # Invariants
///
/// For views produced by a tracker: `stack` is non-empty, `stack[0]` is the
/// `init` sentinel, and `index < stack.len() <= limit`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HistoryView<T> {
    /// All records, oldest first.
    pub stack: Vec<RecordView<T>>,
    /// Position of the current record.
    pub index: usize,
    /// Maximum number of records retained.
    pub limit: usize,
}

impl<T> HistoryView<T> {
    /// The current record.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range, which cannot happen for views built
    /// by a tracker.
    #[must_use]
    pub fn current(&self) -> &RecordView<T> {
        &self.stack[self.index]
    }

    /// Whether an undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether a redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.stack.len()
    }
}

#[cfg(feature = "serde")]
fn serialize_epoch_millis<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let millis = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0);
    serializer.serialize_u64(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_init() {
        let r = HistoryRecord::<u8>::sentinel(SystemTime::now());
        assert!(r.is_sentinel());
        assert_eq!(r.action(), "init");
        assert!(r.squash_by().is_none());
        assert!(!r.has_snapshot());
    }

    #[test]
    fn absorb_overwrites_metadata() {
        let t0 = SystemTime::now();
        let mut r = HistoryRecord::<u8>::from_checkpoint(
            CheckpointInfo::new("rename", "A").squash_by("title"),
            t0,
        );
        let t1 = t0 + std::time::Duration::from_secs(1);
        r.absorb(CheckpointInfo::new("rename", "AB").squash_by("title"), t1);
        assert_eq!(r.description(), "AB");
        assert_eq!(r.time(), t1);
        assert_eq!(r.squash_by(), Some(&SquashKey::from("title")));
    }

    #[test]
    fn view_into_record_compacts_current() {
        let view = RecordView {
            state: Arc::new(7),
            action: "edit".into(),
            description: "Edit".into(),
            squash_by: None,
            time: SystemTime::now(),
        };
        let (record, state) = view.clone().into_record(true);
        assert!(!record.has_snapshot());
        assert_eq!(*state, 7);
        let (record, _) = view.into_record(false);
        assert!(record.has_snapshot());
    }
}
