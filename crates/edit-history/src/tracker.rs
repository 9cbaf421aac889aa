#![forbid(unsafe_code)]

//! Commit protocol and navigation for [`HistoryTracker`].
//!
//! # Commit
//!
//! ```text
//! commit(edit)
//!   snapshot live value ──► run edit ──► Checkpoint
//!                                          │
//!        Skip ◄────────────────────────────┤  (warn if the value changed)
//!                                          │
//!        squash eligible? ── yes ──► merge into current record
//!               │ no
//!        value unchanged? ── yes ──► Soft
//!               │ no
//!        Soft ──► clear current squash key
//!        Standard ──► prune redo, push record, trim to limit
//! ```
//!
//! Squash eligibility requires equal `action`, equal non-empty squash keys and
//! no redo records above the current one. A squash-eligible checkpoint is
//! merged even when the value did not change; only non-eligible no-ops are
//! demoted to soft checkpoints.
//!
//! Demotion uses the equality set with
//! [`with_equality`](HistoryTracker::with_equality), falling back to
//! `PartialEq`. Subscribers of the live cell are always notified by
//! `PartialEq`, so a write the custom equality ignores still reaches them.
//!
//! # Navigation
//!
//! [`undo`](HistoryTracker::undo), [`redo`](HistoryTracker::redo) and
//! [`checkout`](HistoryTracker::checkout) only move the index. Out-of-range
//! requests are ignored.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::checkpoint::{Checkpoint, CheckpointInfo};
use crate::config::HistoryConfig;
use crate::live::{EditScope, LiveState};
use crate::record::{HistoryRecord, HistoryView};
use crate::store::{Clock, StateEq, StoreWrite, TrackerStore};

/// Bounded, squashable undo/redo history over a live state value.
pub struct HistoryTracker<T> {
    store: TrackerStore<T>,
    noop_eq: Option<StateEq<T>>,
    warn_on_untracked_changes: bool,
}

impl<T: fmt::Debug> fmt::Debug for HistoryTracker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryTracker")
            .field("store", &self.store)
            .field("custom_equality", &self.noop_eq.is_some())
            .field("warn_on_untracked_changes", &self.warn_on_untracked_changes)
            .finish()
    }
}

/// What an edit did to the live value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Change {
    /// Differs by `PartialEq`; subscribers are notified.
    observed: bool,
    /// Differs by the demotion equality; a standard checkpoint may push.
    recorded: bool,
}

impl Change {
    const NONE: Self = Self {
        observed: false,
        recorded: false,
    };
}

/// How a commit ends up touching the stack.
enum Outcome {
    Soft,
    Squash(CheckpointInfo),
    Push(CheckpointInfo),
}

impl<T: Clone + PartialEq + 'static> HistoryTracker<T> {
    /// Track `initial` with the given record limit and default settings.
    #[must_use]
    pub fn new(initial: T, limit: usize) -> Self {
        Self::with_config(initial, &HistoryConfig::default().with_limit(limit))
    }

    /// Track `initial` using `config`.
    #[must_use]
    pub fn with_config(initial: T, config: &HistoryConfig) -> Self {
        Self::from_live(LiveState::new(initial), config)
    }

    /// Track an existing live cell. Its current value becomes the sentinel.
    #[must_use]
    pub fn from_live(live: LiveState<T>, config: &HistoryConfig) -> Self {
        Self {
            store: TrackerStore::new(
                live,
                config.limit,
                Box::new(|a: &T, b: &T| a == b),
                web_time::SystemTime::now,
            ),
            noop_eq: None,
            warn_on_untracked_changes: config.warn_on_untracked_changes,
        }
    }
}

impl<T: Clone + 'static> HistoryTracker<T> {
    /// Use `eq` instead of `PartialEq` to decide whether a standard
    /// checkpoint is a no-op. Subscriber notifications are unaffected.
    #[must_use]
    pub fn with_equality(mut self, eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.noop_eq = Some(Box::new(eq));
        self
    }

    /// Stamp records with `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.store.set_clock(clock);
        self
    }

    // ====================================================================
    // Commit
    // ====================================================================

    /// Run `edit` against the live state and record the checkpoint it returns.
    pub fn commit(&mut self, edit: impl FnOnce(&mut EditScope<'_, T>) -> Checkpoint) {
        match self.try_commit(|scope| Ok::<_, Infallible>(edit(scope))) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Fallible [`commit`](Self::commit).
    ///
    /// An error from `edit` is returned unchanged and history is left alone.
    /// Writes the edit made before failing stay in the live state and are
    /// absorbed into the current record.
    pub fn try_commit<E>(
        &mut self,
        edit: impl FnOnce(&mut EditScope<'_, T>) -> Result<Checkpoint, E>,
    ) -> Result<(), E> {
        let live = self.store.live().clone();
        let before = Arc::new(live.get());
        let version = live.version();

        let result = {
            let mut scope = EditScope::new(&live);
            edit(&mut scope)
        };
        let change = self.change_since(&before, version);
        let checkpoint = match result {
            Ok(checkpoint) => checkpoint,
            Err(err) => {
                if change.observed {
                    live.notify();
                }
                return Err(err);
            }
        };
        self.apply(checkpoint, before, change);
        if change.observed {
            live.notify();
        }
        Ok(())
    }

    /// Commit without an edit: breaks the squash chain of the current record.
    pub fn soft_checkpoint(&mut self) {
        let before = Arc::new(self.store.live().get());
        self.apply(Checkpoint::Soft, before, Change::NONE);
    }

    fn change_since(&self, before: &T, version: u64) -> Change {
        let live = self.store.live();
        if live.version() == version {
            return Change::NONE;
        }
        live.with(|now| {
            let observed = !self.store.same_state(before, now);
            let recorded = match &self.noop_eq {
                Some(eq) => !eq(before, now),
                None => observed,
            };
            Change { observed, recorded }
        })
    }

    fn apply(&mut self, checkpoint: Checkpoint, before: Arc<T>, change: Change) {
        let outcome = match checkpoint {
            Checkpoint::Skip => {
                if change.observed && self.warn_on_untracked_changes {
                    warn!(
                        target: "edit_history::commit",
                        index = self.store.index(),
                        "state changed during a skipped checkpoint; the change is absorbed into the current record"
                    );
                }
                debug!(
                    target: "edit_history::commit",
                    outcome = "skipped",
                    changed = change.observed
                );
                return;
            }
            Checkpoint::Soft => Outcome::Soft,
            Checkpoint::Standard(info) => {
                let current = self.store.current();
                let squash = self.store.at_top()
                    && info.squashes_into(current.action(), current.squash_by());
                if squash {
                    Outcome::Squash(info)
                } else if !change.recorded {
                    trace!(
                        target: "edit_history::commit",
                        action = %info.action,
                        "no-op checkpoint demoted to soft"
                    );
                    Outcome::Soft
                } else {
                    Outcome::Push(info)
                }
            }
        };

        match outcome {
            Outcome::Soft => {
                self.store.current_mut().squash_by = None;
                debug!(
                    target: "edit_history::commit",
                    outcome = "soft",
                    index = self.store.index()
                );
            }
            Outcome::Squash(info) => {
                let now = self.store.stamp();
                debug!(
                    target: "edit_history::commit",
                    outcome = "squashed",
                    action = %info.action,
                    index = self.store.index()
                );
                self.store.current_mut().absorb(info, now);
            }
            Outcome::Push(info) => {
                let now = self.store.stamp();
                let action = info.action.clone();
                let pushed = self
                    .store
                    .push(HistoryRecord::from_checkpoint(info, now), before);
                debug!(
                    target: "edit_history::commit",
                    outcome = "pushed",
                    action = %action,
                    index = self.store.index(),
                    len = self.store.len(),
                    pruned = pushed.pruned,
                    trimmed = pushed.trimmed
                );
            }
        }
    }

    // ====================================================================
    // Navigation
    // ====================================================================

    /// Step back one record. Returns whether the head moved.
    pub fn undo(&mut self) -> bool {
        let index = self.store.index();
        index > 0 && self.store.move_to(index - 1)
    }

    /// Step forward one record. Returns whether the head moved.
    pub fn redo(&mut self) -> bool {
        let index = self.store.index();
        index + 1 < self.store.len() && self.store.move_to(index + 1)
    }

    /// Jump to record `index`. Out-of-range indices are ignored.
    pub fn checkout(&mut self, index: usize) -> bool {
        self.store.move_to(index)
    }

    /// Discard all history, keeping the live value and the limit.
    pub fn reset(&mut self) {
        self.store.set(StoreWrite::Reset);
    }

    /// Replace the whole history, e.g. when restoring a persisted session.
    pub fn replace(&mut self, view: HistoryView<T>) {
        self.store.set(StoreWrite::Replace(view));
    }

    // ====================================================================
    // Query
    // ====================================================================

    /// Materialized view of the full history.
    #[must_use]
    pub fn view(&self) -> HistoryView<T> {
        self.store.get()
    }

    /// Handle to the live state cell.
    #[must_use]
    pub fn live(&self) -> LiveState<T> {
        self.store.live().clone()
    }

    /// Clone of the live value.
    #[must_use]
    pub fn state(&self) -> T {
        self.store.live().get()
    }

    /// Records, oldest first. States are not materialized.
    #[must_use]
    pub fn records(&self) -> &[HistoryRecord<T>] {
        self.store.records()
    }

    /// The current record.
    #[must_use]
    pub fn current(&self) -> &HistoryRecord<T> {
        self.store.current()
    }

    /// Position of the current record; 0 is the sentinel.
    #[must_use]
    pub fn index(&self) -> usize {
        self.store.index()
    }

    /// Number of records, sentinel included. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Always false: the sentinel is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Maximum number of records kept, sentinel included.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.store.limit()
    }

    /// Whether [`undo`](Self::undo) would move the head.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.store.index() > 0
    }

    /// Whether [`redo`](Self::redo) would move the head.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.store.at_top()
    }

    /// Descriptions of the records `undo` would step over, most recent first.
    pub fn undo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.store.records()[1..=self.store.index()]
            .iter()
            .rev()
            .take(limit)
            .map(HistoryRecord::description)
            .collect()
    }

    /// Descriptions of the records `redo` would restore, next one first.
    pub fn redo_descriptions(&self, limit: usize) -> Vec<&str> {
        self.store.records()[self.store.index() + 1..]
            .iter()
            .take(limit)
            .map(HistoryRecord::description)
            .collect()
    }
}
