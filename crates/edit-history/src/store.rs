#![forbid(unsafe_code)]

//! Tracker store: the single source of truth for `{stack, index, limit}`.
//!
//! # Architecture
//!
//! ```text
//!              stack (oldest first)                      LiveState<T>
//! ┌──────┬──────────┬──────────┬──────────┐            ┌─────────────┐
//! │ init │ rename   │ move     │ rename   │            │ live value  │
//! │ Arc  │ Arc      │ (live)   │ Arc      │ ◄────────► │ (rendered)  │
//! └──────┴──────────┴──────────┴──────────┘            └─────────────┘
//!                       ▲ index
//! ```
//!
//! The current record holds no snapshot; its state *is* the live value. Moving
//! the index hands snapshots back and forth: the outgoing record captures the
//! live value, the incoming record's snapshot becomes the live value.
//!
//! # Invariants
//!
//! 1. `stack` is never empty and `stack[0]` is the `init` sentinel.
//! 2. `index < stack.len() <= limit` after every write.
//! 3. `stack[i].state.is_none()` iff `i == index`.
//! 4. Record times are non-decreasing in creation order.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use web_time::SystemTime;

use crate::live::LiveState;
use crate::record::{HistoryRecord, HistoryView, RecordView};
use crate::checkpoint::INIT_ACTION;

/// Smallest accepted limit. With a limit of 1 only the sentinel is kept and
/// every edit folds into it.
pub const MIN_LIMIT: usize = 1;

/// Equality between two states.
pub type StateEq<T> = Box<dyn Fn(&T, &T) -> bool>;

/// Clock used to stamp records.
pub type Clock = fn() -> SystemTime;

/// Structural write accepted by [`TrackerStore::set`].
#[derive(Debug, Clone)]
pub enum StoreWrite<T> {
    /// Replace stack, index and limit wholesale.
    Replace(HistoryView<T>),
    /// Drop all history and re-seed a sentinel from the live value.
    Reset,
}

/// Owner of the history stack and the live state cell.
pub struct TrackerStore<T> {
    live: LiveState<T>,
    stack: Vec<HistoryRecord<T>>,
    index: usize,
    limit: usize,
    eq: StateEq<T>,
    clock: Clock,
    last_time: SystemTime,
}

impl<T: fmt::Debug> fmt::Debug for TrackerStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerStore")
            .field("len", &self.stack.len())
            .field("index", &self.index)
            .field("limit", &self.limit)
            .field("live", &self.live)
            .finish()
    }
}

impl<T: Clone + 'static> TrackerStore<T> {
    /// Create a store seeded with a sentinel for the live value.
    ///
    /// `eq` decides whether loading a snapshot into the live cell notifies
    /// subscribers. `limit` is raised to [`MIN_LIMIT`] if smaller.
    pub fn new(live: LiveState<T>, limit: usize, eq: StateEq<T>, clock: Clock) -> Self {
        let limit = clamp_limit(limit);
        let now = clock();
        Self {
            live,
            stack: vec![HistoryRecord::sentinel(now)],
            index: 0,
            limit,
            eq,
            clock,
            last_time: now,
        }
    }

    // ====================================================================
    // Read
    // ====================================================================

    /// Materialize the full history.
    #[must_use]
    pub fn get(&self) -> HistoryView<T> {
        let current = Arc::new(self.live.get());
        let stack = self
            .stack
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let state = if i == self.index {
                    Arc::clone(&current)
                } else {
                    debug_assert!(record.state.is_some(), "non-current record without state");
                    record.state.clone().unwrap_or_else(|| Arc::clone(&current))
                };
                RecordView {
                    state,
                    action: record.action.clone(),
                    description: record.description.clone(),
                    squash_by: record.squash_by.clone(),
                    time: record.time,
                }
            })
            .collect();
        HistoryView {
            stack,
            index: self.index,
            limit: self.limit,
        }
    }

    /// Handle to the live cell.
    #[must_use]
    pub fn live(&self) -> &LiveState<T> {
        &self.live
    }

    /// Raw records, oldest first.
    #[must_use]
    pub fn records(&self) -> &[HistoryRecord<T>] {
        &self.stack
    }

    /// Position of the current record in the stack.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of records, sentinel included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Maximum number of records kept.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether subscribers would see `a` and `b` as the same value.
    pub(crate) fn same_state(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }

    pub(crate) fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    // ====================================================================
    // Write
    // ====================================================================

    /// Apply a structural write.
    ///
    /// Every write re-synchronizes the live value to the state of the
    /// current record.
    pub fn set(&mut self, write: StoreWrite<T>) {
        match write {
            StoreWrite::Reset => {
                let now = self.stamp();
                debug!(
                    target: "edit_history::store",
                    discarded = self.stack.len(),
                    limit = self.limit,
                    "history reset"
                );
                self.stack = vec![HistoryRecord::sentinel(now)];
                self.index = 0;
            }
            StoreWrite::Replace(view) => self.replace(view),
        }
    }

    fn replace(&mut self, view: HistoryView<T>) {
        if view.stack.is_empty() {
            warn!(
                target: "edit_history::store",
                "ignoring history replacement with an empty stack"
            );
            return;
        }
        if view.stack[0].action != INIT_ACTION {
            warn!(
                target: "edit_history::store",
                action = %view.stack[0].action,
                "ignoring history replacement whose first record is not the init sentinel"
            );
            return;
        }
        let index = view.index.min(view.stack.len() - 1);
        let mut current_state = None;
        let stack = view
            .stack
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let (record, state) = record.into_record(i == index);
                if i == index {
                    current_state = Some(state);
                }
                record
            })
            .collect();

        self.stack = stack;
        self.index = index;
        self.limit = clamp_limit(view.limit);
        if let Some(last) = self.stack.iter().map(|r| r.time).max() {
            self.last_time = self.last_time.max(last);
        }
        let trimmed = self.enforce_limit();
        if trimmed > 0 {
            debug!(target: "edit_history::store", trimmed, "replacement exceeded limit");
        }
        if let Some(state) = current_state {
            self.load_live(state);
        }
    }

    /// Move the current index, swapping snapshots with the live cell.
    ///
    /// Returns `false` when `target` is out of range or already current.
    pub fn move_to(&mut self, target: usize) -> bool {
        if target >= self.stack.len() || target == self.index {
            return false;
        }
        let outgoing = Arc::new(self.live.get());
        self.stack[self.index].state = Some(outgoing);
        let incoming = self.stack[target].state.take();
        trace!(
            target: "edit_history::store",
            from = self.index,
            to = target,
            "move head"
        );
        self.index = target;
        match incoming {
            Some(state) => self.load_live(state),
            None => debug_assert!(false, "non-current record without state"),
        }
        true
    }

    /// Write a snapshot into the live cell, notifying on change.
    fn load_live(&self, state: Arc<T>) {
        let value = Arc::unwrap_or_clone(state);
        self.live.replace_with(value, |old, new| !(self.eq)(old, new));
    }

    // ====================================================================
    // Commit primitives
    // ====================================================================

    /// Timestamp for a new or squashed record, never earlier than the last one.
    pub(crate) fn stamp(&mut self) -> SystemTime {
        let now = (self.clock)().max(self.last_time);
        self.last_time = now;
        now
    }

    pub(crate) fn current(&self) -> &HistoryRecord<T> {
        &self.stack[self.index]
    }

    pub(crate) fn current_mut(&mut self) -> &mut HistoryRecord<T> {
        &mut self.stack[self.index]
    }

    pub(crate) fn at_top(&self) -> bool {
        self.index + 1 == self.stack.len()
    }

    /// Append `record` as the new current record.
    ///
    /// `previous` is the pre-edit value of the outgoing current record. Redo
    /// records beyond the current index are discarded first.
    pub(crate) fn push(&mut self, record: HistoryRecord<T>, previous: Arc<T>) -> PushOutcome {
        let pruned = self.stack.len() - (self.index + 1);
        self.stack.truncate(self.index + 1);
        self.stack[self.index].state = Some(previous);
        self.stack.push(record);
        self.index = self.stack.len() - 1;
        let trimmed = self.enforce_limit();
        PushOutcome { pruned, trimmed }
    }

    /// Drop records until `len <= limit`.
    ///
    /// Oldest non-sentinel records go first. The current record is only
    /// dropped when nothing but the sentinel fits; the sentinel then becomes
    /// current and takes over the live value. Otherwise, if the current
    /// record is the oldest candidate, the newest redo records go instead.
    fn enforce_limit(&mut self) -> usize {
        let excess = self.stack.len().saturating_sub(self.limit);
        if excess == 0 {
            return 0;
        }
        let older = self.index.saturating_sub(1).min(excess);
        self.stack.drain(1..1 + older);
        self.index -= older;
        let rest = excess - older;
        if rest > 0 {
            let len = self.stack.len() - rest;
            self.stack.truncate(len);
        }
        if self.index >= self.stack.len() {
            self.index = self.stack.len() - 1;
            self.stack[self.index].state = None;
        }
        excess
    }
}

/// What a push discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PushOutcome {
    /// Redo records discarded by branch pruning.
    pub pruned: usize,
    /// Old records evicted by the limit.
    pub trimmed: usize,
}

fn clamp_limit(limit: usize) -> usize {
    if limit < MIN_LIMIT {
        warn!(
            target: "edit_history::store",
            requested = limit,
            applied = MIN_LIMIT,
            "history limit too small"
        );
        MIN_LIMIT
    } else {
        limit
    }
}
