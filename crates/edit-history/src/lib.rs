#![forbid(unsafe_code)]

//! Bounded, squashable undo/redo history.
//!
//! This crate tracks the edit history of a single live state value, such as
//! the document open in an editor. The host performs edits through
//! [`HistoryTracker::commit`], describing each one with a [`Checkpoint`], and
//! renders from the [`LiveState`] cell. Undo, redo and checkout swap the live
//! value for an earlier or later snapshot.
//!
//! # Key Components
//!
//! - [`HistoryTracker`] - commit protocol and navigation
//! - [`TrackerStore`] - the `{stack, index, limit}` source of truth
//! - [`LiveState`] - shared, versioned state cell with change callbacks
//! - [`Checkpoint`] - what an edit did: record it, skip it, or soft-break
//! - [`HistoryConfig`] - limits and diagnostics
//!
//! # Quick Start
//!
//! ```
//! use edit_history::{Checkpoint, HistoryTracker};
//!
//! let mut history = HistoryTracker::new(String::from("Untitled"), 50);
//!
//! for title in ["D", "Do", "Doc"] {
//!     history.commit(|doc| {
//!         doc.set(title.to_string());
//!         Checkpoint::squashed("rename", format!("Rename to {title}"), "title")
//!     });
//! }
//! // Three keystrokes, one history record.
//! assert_eq!(history.len(), 2);
//!
//! history.undo();
//! assert_eq!(history.state(), "Untitled");
//! history.redo();
//! assert_eq!(history.state(), "Doc");
//! ```
//!
//! # Threading
//!
//! Everything is single-threaded and synchronous. [`LiveState`] is built on
//! `Rc<RefCell<..>>` and the tracker is `!Send`; keep it on the thread that
//! handles UI events.
//!
//! # Feature Flags
//!
//! - `serde`: `Serialize` for [`HistoryView`] and checkpoint metadata
//! - `config`: TOML/JSON loading for [`HistoryConfig`]
//! - `hamt`: re-exports `im` persistent collections as [`persistent`]

pub mod checkpoint;
pub mod config;
pub mod live;
pub mod record;
pub mod store;
pub mod tracker;

pub use checkpoint::{Checkpoint, CheckpointInfo, INIT_ACTION, SquashKey};
pub use config::{HistoryConfig, HistoryConfigError};
pub use live::{EditScope, LiveState, Subscription};
pub use record::{HistoryRecord, HistoryView, RecordView};
pub use store::{MIN_LIMIT, StoreWrite, TrackerStore};
pub use tracker::HistoryTracker;

/// Persistent collection types for snapshot-friendly state.
///
/// Every commit clones the live value once, so states built from these
/// collections keep commits cheap through structural sharing.
#[cfg(feature = "hamt")]
pub mod persistent {
    pub use im::{HashMap, HashSet, OrdMap, OrdSet, Vector};
}
