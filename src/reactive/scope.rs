use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Teardown scope for pollers, watchers and other background resources.
///
/// Cleanups registered with [`on_cleanup`](Scope::on_cleanup) run exactly
/// once, either on an explicit [`dispose`](Scope::dispose) or when the last
/// clone of the scope is dropped. Registering on an already-disposed scope
/// runs the cleanup immediately.
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    cleanups: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    disposed: AtomicBool,
}

impl Scope {
    /// Create a live scope.
    pub fn new() -> Self {
        Scope {
            inner: Arc::new(ScopeInner {
                cleanups: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a cleanup to run at disposal.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + Send + 'static) {
        if self.inner.disposed.load(Ordering::Acquire) {
            cleanup();
            return;
        }
        self.inner.cleanups.lock().push(Box::new(cleanup));
    }

    /// Run all cleanups now. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// True once [`dispose`](Scope::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl ScopeInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let cleanups = std::mem::take(&mut *self.cleanups.lock());
        for cleanup in cleanups {
            cleanup();
        }
    }
}

impl Clone for Scope {
    fn clone(&self) -> Self {
        Scope {
            inner: self.inner.clone(),
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::new()
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}
