use crate::reactive::watch::WatchSource;
use std::sync::Arc;

/// Read-only derived value.
///
/// A `Computed` pairs a closure with the sources it reads. The closure runs
/// on every [`get`](Computed::get); change notification comes from the
/// declared sources, not from tracking what the closure touched. Keeping the
/// source list accurate is the constructor's responsibility.
///
/// # Example
///
/// ```ignore
/// let size = Signal::new(10u64);
/// let data = Signal::new(None::<Value>);
///
/// let total = Computed::new([data.source()], move || read_total(&data));
/// let pages = Computed::new([data.source(), size.source()], move || {
///     total.get().div_ceil(size.get())
/// });
/// ```
pub struct Computed<T> {
    read: Arc<dyn Fn() -> T + Send + Sync>,
    sources: Arc<[WatchSource]>,
}

impl<T: Clone> Computed<T> {
    /// Create a derived value over the given sources.
    pub fn new(
        sources: impl IntoIterator<Item = WatchSource>,
        read: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Computed {
            read: Arc::new(read),
            sources: sources.into_iter().collect(),
        }
    }

    /// Recompute and return the current value.
    pub fn get(&self) -> T {
        (self.read)()
    }

    /// The sources whose changes invalidate this value.
    pub fn sources(&self) -> Vec<WatchSource> {
        self.sources.to_vec()
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Computed {
            read: self.read.clone(),
            sources: self.sources.clone(),
        }
    }
}
