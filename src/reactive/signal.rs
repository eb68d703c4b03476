use crate::reactive::watch::{SubscriberSet, Subscription, WatchSource};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Mutable observable cell.
///
/// A `Signal` owns its value and a set of subscribers. Writing through
/// [`set`](Signal::set) or [`update`](Signal::update) notifies every
/// subscriber on the writing thread. Clones share the same cell.
///
/// # Usage
///
/// ```ignore
/// let page = Signal::new(1u64);
///
/// let sub = page.subscribe(|| println!("page changed"));
/// page.set(2);          // subscriber runs
/// assert_eq!(page.get(), 2);
/// drop(sub);            // unsubscribed
/// ```
pub struct Signal<T> {
    value: Arc<RwLock<T>>,
    subscribers: SubscriberSet,
}

impl<T: Clone> Signal<T> {
    /// Create a new signal holding `value`.
    pub fn new(value: T) -> Self {
        Signal {
            value: Arc::new(RwLock::new(value)),
            subscribers: SubscriberSet::new(),
        }
    }

    /// Current value, cloned out of the cell.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Read the value in place without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replace the value and notify subscribers.
    ///
    /// The write lock is released before subscribers run, so a subscriber
    /// may read this signal again without deadlocking.
    pub fn set(&self, value: T) {
        {
            *self.value.write() = value;
        }
        self.subscribers.notify();
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            f(&mut self.value.write());
        }
        self.subscribers.notify();
    }

    /// Subscribe a callback invoked after every write.
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.subscribers.insert(Arc::new(callback))
    }

    /// This signal as a type-erased watch source.
    pub fn source(&self) -> WatchSource {
        WatchSource::new(self.subscribers.clone())
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            value: self.value.clone(),
            subscribers: self.subscribers.clone(),
        }
    }
}

impl<T: Clone + Default> Default for Signal<T> {
    fn default() -> Self {
        Signal::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&*self.value.read()).finish()
    }
}
