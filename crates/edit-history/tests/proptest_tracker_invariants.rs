#![forbid(unsafe_code)]

//! Property tests for [`HistoryTracker`] invariants.
//!
//! Validates:
//! - `1 <= len <= limit` and `index < len` after every operation.
//! - The `init` sentinel survives trimming and reset.
//! - Only the current record lacks a stored snapshot.
//! - The tracker agrees step by step with a plain reference model.
//! - Commit, undo, redo round-trips restore the exact post-edit state.
//! - Record times never decrease in stack order.

use proptest::prelude::*;

use edit_history::{Checkpoint, CheckpointInfo, HistoryTracker, SquashKey};

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    /// Write `value` and report a standard checkpoint.
    Edit {
        value: i64,
        action: &'static str,
        key: Option<SquashKey>,
    },
    /// Report a standard checkpoint without writing.
    Touch {
        action: &'static str,
        key: Option<SquashKey>,
    },
    /// Write `value` but skip the checkpoint.
    Skip(i64),
    Soft,
    Undo,
    Redo,
    Checkout(usize),
    Reset,
}

fn key_strategy() -> impl Strategy<Value = Option<SquashKey>> {
    prop_oneof![
        2 => Just(None),
        2 => Just(Some(SquashKey::from("k"))),
        1 => Just(Some(SquashKey::from(1_i64))),
    ]
}

fn action_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("a"), Just("b")]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0i64..4, action_strategy(), key_strategy())
            .prop_map(|(value, action, key)| Op::Edit { value, action, key }),
        1 => (action_strategy(), key_strategy()).prop_map(|(action, key)| Op::Touch { action, key }),
        1 => (0i64..4).prop_map(Op::Skip),
        1 => Just(Op::Soft),
        3 => Just(Op::Undo),
        2 => Just(Op::Redo),
        1 => (0usize..12).prop_map(Op::Checkout),
        1 => Just(Op::Reset),
    ]
}

fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op_strategy(), 1..=max_len)
}

fn info(action: &str, key: Option<SquashKey>) -> CheckpointInfo {
    CheckpointInfo {
        action: action.to_owned(),
        description: format!("{action} edit"),
        squash_by: key,
    }
}

// ============================================================================
// Reference model
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct ModelRecord {
    state: i64,
    action: String,
    key: Option<SquashKey>,
}

#[derive(Debug)]
struct Model {
    stack: Vec<ModelRecord>,
    index: usize,
    limit: usize,
    live: i64,
}

impl Model {
    fn new(initial: i64, limit: usize) -> Self {
        Self {
            stack: vec![ModelRecord {
                state: initial,
                action: "init".into(),
                key: None,
            }],
            index: 0,
            limit,
            live: initial,
        }
    }

    fn commit(&mut self, write: Option<i64>, checkpoint: Checkpoint) {
        let before = self.live;
        if let Some(v) = write {
            self.live = v;
        }
        let changed = self.live != before;
        let top = self.index + 1 == self.stack.len();
        match checkpoint {
            Checkpoint::Skip => {}
            Checkpoint::Soft => self.stack[self.index].key = None,
            Checkpoint::Standard(info) => {
                let cur = &self.stack[self.index];
                let squash = top
                    && info.squash_by.is_some()
                    && info.squash_by == cur.key
                    && info.action == cur.action;
                if squash {
                    let cur = &mut self.stack[self.index];
                    cur.action = info.action;
                    cur.key = info.squash_by;
                } else if !changed {
                    self.stack[self.index].key = None;
                } else {
                    self.stack.truncate(self.index + 1);
                    self.stack[self.index].state = before;
                    self.stack.push(ModelRecord {
                        state: self.live,
                        action: info.action,
                        key: info.squash_by,
                    });
                    self.index = self.stack.len() - 1;
                    while self.stack.len() > self.limit {
                        self.stack.remove(1);
                        self.index -= 1;
                    }
                }
            }
        }
    }

    fn move_to(&mut self, target: usize) {
        if target >= self.stack.len() || target == self.index {
            return;
        }
        self.stack[self.index].state = self.live;
        self.index = target;
        self.live = self.stack[target].state;
    }

    fn reset(&mut self) {
        self.stack = vec![ModelRecord {
            state: self.live,
            action: "init".into(),
            key: None,
        }];
        self.index = 0;
    }

    fn materialized(&self) -> Vec<ModelRecord> {
        let mut out = self.stack.clone();
        out[self.index].state = self.live;
        out
    }
}

fn apply(tracker: &mut HistoryTracker<i64>, model: &mut Model, op: &Op) {
    match op.clone() {
        Op::Edit { value, action, key } => {
            let checkpoint = Checkpoint::Standard(info(action, key));
            model.commit(Some(value), checkpoint.clone());
            tracker.commit(move |s| {
                s.set(value);
                checkpoint
            });
        }
        Op::Touch { action, key } => {
            let checkpoint = Checkpoint::Standard(info(action, key));
            model.commit(None, checkpoint.clone());
            tracker.commit(move |_| checkpoint);
        }
        Op::Skip(value) => {
            model.commit(Some(value), Checkpoint::Skip);
            tracker.commit(move |s| {
                s.set(value);
                Checkpoint::Skip
            });
        }
        Op::Soft => {
            model.commit(None, Checkpoint::Soft);
            tracker.soft_checkpoint();
        }
        Op::Undo => {
            if model.index > 0 {
                model.move_to(model.index - 1);
            }
            tracker.undo();
        }
        Op::Redo => {
            model.move_to(model.index + 1);
            tracker.redo();
        }
        Op::Checkout(i) => {
            model.move_to(i);
            tracker.checkout(i);
        }
        Op::Reset => {
            model.reset();
            tracker.reset();
        }
    }
}

fn assert_structural_invariants(tracker: &HistoryTracker<i64>) -> Result<(), TestCaseError> {
    prop_assert!(tracker.len() >= 1);
    prop_assert!(tracker.len() <= tracker.limit());
    prop_assert!(tracker.index() < tracker.len());
    prop_assert!(tracker.records()[0].is_sentinel());
    for (i, record) in tracker.records().iter().enumerate() {
        prop_assert_eq!(record.has_snapshot(), i != tracker.index());
    }
    let times: Vec<_> = tracker.records().iter().map(|r| r.time()).collect();
    prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

// ============================================================================
// Invariant 1: structure holds after every operation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn structure_holds_after_every_op(
        limit in 1usize..8,
        ops in ops_strategy(80),
    ) {
        let mut tracker = HistoryTracker::new(0_i64, limit);
        let mut model = Model::new(0, limit);
        for op in &ops {
            apply(&mut tracker, &mut model, op);
            assert_structural_invariants(&tracker)?;
        }
    }
}

// ============================================================================
// Invariant 2: tracker matches the reference model
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn tracker_matches_reference_model(
        limit in 1usize..8,
        ops in ops_strategy(80),
    ) {
        let mut tracker = HistoryTracker::new(0_i64, limit);
        let mut model = Model::new(0, limit);
        for op in &ops {
            apply(&mut tracker, &mut model, op);

            let view = tracker.view();
            let actual: Vec<ModelRecord> = view
                .stack
                .iter()
                .map(|r| ModelRecord {
                    state: *r.state,
                    action: r.action.clone(),
                    key: r.squash_by.clone(),
                })
                .collect();
            prop_assert_eq!(&actual, &model.materialized(), "after {:?}", op);
            prop_assert_eq!(view.index, model.index);
            prop_assert_eq!(tracker.state(), model.live);
        }
    }
}

// ============================================================================
// Invariant 3: navigation at the edges is idempotent
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn edge_navigation_is_noop(ops in ops_strategy(40)) {
        let mut tracker = HistoryTracker::new(0_i64, 6);
        let mut model = Model::new(0, 6);
        for op in &ops {
            apply(&mut tracker, &mut model, op);
        }

        while tracker.undo() {}
        let bottom = tracker.view();
        prop_assert!(!tracker.undo());
        prop_assert_eq!(tracker.view(), bottom);

        while tracker.redo() {}
        let top = tracker.view();
        prop_assert!(!tracker.redo());
        prop_assert_eq!(tracker.view(), top);
    }
}

// ============================================================================
// Invariant 4: commit, undo, redo round-trips
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn commit_undo_redo_round_trip(
        ops in ops_strategy(40),
        value in 100i64..200,
    ) {
        let mut tracker = HistoryTracker::new(0_i64, 6);
        let mut model = Model::new(0, 6);
        for op in &ops {
            apply(&mut tracker, &mut model, op);
        }

        let before = tracker.state();
        tracker.commit(|s| {
            s.set(value);
            Checkpoint::new("round-trip", "round trip")
        });
        let after = tracker.state();
        prop_assert_eq!(after, value);

        prop_assert!(tracker.undo());
        prop_assert_eq!(tracker.state(), before);
        prop_assert!(tracker.redo());
        prop_assert_eq!(tracker.state(), after);
    }
}

// ============================================================================
// Invariant 5: limit enforcement keeps the original sentinel
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn limit_enforced_with_original_sentinel(limit in 2usize..20) {
        let mut tracker = HistoryTracker::new(-1_i64, limit);
        let sentinel_time = tracker.records()[0].time();
        for v in 0..(limit as i64 + 10) {
            tracker.commit(move |s| {
                s.set(v);
                Checkpoint::new("set", format!("set {v}"))
            });
        }
        prop_assert_eq!(tracker.len(), limit);
        prop_assert!(tracker.records()[0].is_sentinel());
        prop_assert_eq!(tracker.records()[0].time(), sentinel_time);
        prop_assert_eq!(*tracker.view().stack[0].state, -1);
    }
}
