#![no_main]

use arbitrary::Arbitrary;
use edit_history::{Checkpoint, CheckpointInfo, HistoryTracker, SquashKey};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Edit { value: u8, action: bool, key: Option<u8> },
    Touch { action: bool, key: Option<u8> },
    Skip(u8),
    Soft,
    Undo,
    Redo,
    Checkout(u8),
    Reset,
}

#[derive(Debug, Arbitrary)]
struct Input {
    limit: u8,
    ops: Vec<Op>,
}

fn checkpoint(action: bool, key: Option<u8>) -> Checkpoint {
    let action = if action { "a" } else { "b" };
    Checkpoint::Standard(CheckpointInfo {
        action: action.to_owned(),
        description: action.to_owned(),
        squash_by: key.map(|k| SquashKey::from(u32::from(k % 4))),
    })
}

fuzz_target!(|input: Input| {
    // Keep limits small so trimming is exercised constantly.
    let limit = usize::from(input.limit % 16);
    let mut tracker = HistoryTracker::new(0_u8, limit);
    let effective_limit = tracker.limit();
    assert!(effective_limit >= 1);

    for op in input.ops {
        match op {
            Op::Edit { value, action, key } => tracker.commit(|s| {
                s.set(value % 8);
                checkpoint(action, key)
            }),
            Op::Touch { action, key } => tracker.commit(|_| checkpoint(action, key)),
            Op::Skip(value) => tracker.commit(|s| {
                s.set(value % 8);
                Checkpoint::Skip
            }),
            Op::Soft => tracker.soft_checkpoint(),
            Op::Undo => {
                tracker.undo();
            }
            Op::Redo => {
                tracker.redo();
            }
            Op::Checkout(i) => {
                tracker.checkout(usize::from(i % 20));
            }
            Op::Reset => tracker.reset(),
        }

        // Post-conditions that must always hold:
        assert!(tracker.len() >= 1, "stack emptied");
        assert!(tracker.len() <= effective_limit, "limit exceeded");
        assert!(tracker.index() < tracker.len(), "index OOB");
        assert!(tracker.records()[0].is_sentinel(), "sentinel lost");
        let view = tracker.view();
        assert_eq!(*view.current().state, tracker.state(), "live state drifted");
        for (i, record) in tracker.records().iter().enumerate() {
            assert_eq!(record.has_snapshot(), i != tracker.index(), "compaction broken");
        }
    }
});
