#![forbid(unsafe_code)]

//! Live application state cell.
//!
//! [`LiveState<T>`] holds the value the host application renders from. The
//! history tracker reads and writes it, and so does every edit function via an
//! [`EditScope`]. Cloning a `LiveState` creates another handle to the **same**
//! cell.
//!
//! # Versioning
//!
//! `version` increments by exactly 1 on every write, even if the written
//! value equals the old one. An unchanged version therefore proves the value
//! was never touched, which is the cheap identity half of the tracker's no-op
//! detection. Subscribers, on the other hand, are notified only when the value
//! actually changed (by the tracker's equality, or `PartialEq` for direct
//! writes).
//!
//! # Failure Modes
//!
//! - **Re-entrant write**: writing the cell from inside a subscriber callback
//!   is fine; callbacks run after the borrow is released. Reading inside
//!   [`LiveState::with`] and writing in the same closure panics (RefCell).

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct LiveInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<CallbackWeak<T>>,
}

/// Shared, versioned state cell with change callbacks.
pub struct LiveState<T> {
    inner: Rc<RefCell<LiveInner<T>>>,
}

impl<T> Clone for LiveState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LiveState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("LiveState")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + 'static> LiveState<T> {
    /// Create a cell holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LiveInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Current write version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Whether two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Register a change callback. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Replace the value, notifying subscribers if `changed` says so.
    pub(crate) fn replace_with(&self, value: T, changed: impl FnOnce(&T, &T) -> bool) {
        let notify = {
            let mut inner = self.inner.borrow_mut();
            let notify = changed(&inner.value, &value);
            inner.value = value;
            inner.version += 1;
            notify
        };
        if notify {
            self.notify();
        }
    }

    /// Mutate the value in place. Always bumps the version.
    pub(crate) fn update_raw(&self, f: impl FnOnce(&mut T)) {
        let mut inner = self.inner.borrow_mut();
        f(&mut inner.value);
        inner.version += 1;
    }

    pub(crate) fn notify(&self) {
        let callbacks: Vec<CallbackRc<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        if callbacks.is_empty() {
            return;
        }
        let value = self.get();
        for cb in &callbacks {
            cb(&value);
        }
    }
}

impl<T: Clone + PartialEq + 'static> LiveState<T> {
    /// Write a new value outside of any commit.
    ///
    /// Such writes are not recorded by a tracker; they are absorbed into
    /// whatever record is current.
    pub fn set(&self, value: T) {
        self.replace_with(value, |old, new| old != new);
    }

    /// Modify the value in place outside of any commit.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            inner.version += 1;
            inner.value != old
        };
        if changed {
            self.notify();
        }
    }
}

/// RAII guard for a subscriber callback.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Read/write access to the live state handed to edit functions.
///
/// Writes made through the scope are batched: subscribers are notified once,
/// after the commit finished, and only if the value ended up different.
pub struct EditScope<'a, T> {
    live: &'a LiveState<T>,
    written: bool,
}

impl<'a, T: Clone + 'static> EditScope<'a, T> {
    pub(crate) fn new(live: &'a LiveState<T>) -> Self {
        Self {
            live,
            written: false,
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.live.get()
    }

    /// Borrow the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.live.with(f)
    }

    /// Replace the value.
    pub fn set(&mut self, value: T) {
        self.live.update_raw(|slot| *slot = value);
        self.written = true;
    }

    /// Modify the value in place.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        self.live.update_raw(f);
        self.written = true;
    }

    /// Whether the edit wrote to the cell at all.
    #[must_use]
    pub fn written(&self) -> bool {
        self.written
    }
}
