//! Push-based change notification.
//!
//! Sources keep a set of subscriber callbacks; a change walks the set and
//! invokes each callback. There is no dependency tracking: everything that
//! should re-run on change is subscribed explicitly, and unsubscribed by
//! dropping the returned handle.

use parking_lot::Mutex;
use slab::Slab;
use std::sync::{Arc, Weak};

type Callback = Arc<dyn Fn() + Send + Sync>;
type Subscribers = Arc<Mutex<Slab<Callback>>>;

/// Shared subscriber storage for one observable source.
///
/// Slab keys stay stable across removals, so a [`Subscription`] can
/// unsubscribe without scanning.
#[derive(Clone, Default)]
pub(crate) struct SubscriberSet {
    inner: Subscribers,
}

impl SubscriberSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, callback: Callback) -> Subscription {
        let key = self.inner.lock().insert(callback);
        Subscription {
            set: Arc::downgrade(&self.inner),
            key,
        }
    }

    /// Invoke every subscriber.
    ///
    /// Callbacks are cloned out first and run with the lock released, so a
    /// callback may freely subscribe or notify further sources.
    pub(crate) fn notify(&self) {
        let callbacks: Vec<Callback> = self.inner.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback();
        }
    }
}

/// Handle to one observable source, erased over the value type.
///
/// A `WatchSource` is how reactive inputs are handed to the orchestration
/// layer: `Signal::source()` and `Computed::sources()` produce them, and
/// [`watch`] subscribes to them.
#[derive(Clone)]
pub struct WatchSource {
    subscribers: SubscriberSet,
}

impl WatchSource {
    pub(crate) fn new(subscribers: SubscriberSet) -> Self {
        Self { subscribers }
    }

    /// Subscribe a callback to this source.
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.subscribers.insert(Arc::new(callback))
    }
}

/// Active subscription to a single source. Dropping it unsubscribes.
pub struct Subscription {
    set: Weak<Mutex<Slab<Callback>>>,
    key: usize,
}

impl Subscription {
    /// Remove the subscriber now instead of waiting for drop.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(set) = self.set.upgrade() {
            let mut slab = set.lock();
            if slab.contains(self.key) {
                slab.remove(self.key);
            }
        }
    }
}

/// Invoke `callback` whenever any of `sources` changes.
///
/// Returns a [`WatchHandle`] owning the subscriptions; dropping the handle
/// stops the watching. The callback runs on the thread that performed the
/// change.
///
/// # Example
///
/// ```ignore
/// let page = Signal::new(1u64);
/// let handle = watch([page.source()], move || refetch());
/// page.set(2); // refetch() runs
/// drop(handle);
/// page.set(3); // nothing runs
/// ```
pub fn watch(
    sources: impl IntoIterator<Item = WatchSource>,
    callback: impl Fn() + Send + Sync + 'static,
) -> WatchHandle {
    let callback: Callback = Arc::new(callback);
    let subscriptions = sources
        .into_iter()
        .map(|source| source.subscribers.insert(callback.clone()))
        .collect();
    WatchHandle {
        _subscriptions: subscriptions,
    }
}

/// Keeps a set of watch subscriptions alive.
pub struct WatchHandle {
    _subscriptions: Vec<Subscription>,
}
