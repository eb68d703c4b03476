use crate::error::FetchError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one execution of the request routine.
pub type Outcome = Result<(), FetchError>;

/// Observable, settle-once completion of a scheduled execution.
///
/// Every path that may defer work (debounce, throttle, polling, the execute
/// pipeline itself) hands the caller a `Completion`. The first
/// [`settle`](Completion::settle) wins; later settles are ignored. Waiters
/// block on a condvar, so joining a pending execution costs no polling.
///
/// Clones share the same slot: a filter can keep one completion for every
/// coalesced caller and settle it once the eventual invocation finishes.
pub struct Completion {
    inner: Arc<CompletionInner>,
}

struct CompletionInner {
    state: Mutex<Option<Outcome>>,
    settled: Condvar,
}

impl Completion {
    /// A completion with no result yet.
    pub fn new() -> Self {
        Completion {
            inner: Arc::new(CompletionInner {
                state: Mutex::new(None),
                settled: Condvar::new(),
            }),
        }
    }

    /// A completion that already carries `outcome`.
    pub fn settled(outcome: Outcome) -> Self {
        let completion = Completion::new();
        completion.settle(outcome);
        completion
    }

    /// Store the outcome and wake all waiters. First write wins.
    pub fn settle(&self, outcome: Outcome) {
        let mut state = self.inner.state.lock();
        if state.is_none() {
            *state = Some(outcome);
            self.inner.settled.notify_all();
        }
    }

    /// Block until settled and return the outcome.
    pub fn wait(&self) -> Outcome {
        let mut state = self.inner.state.lock();
        while state.is_none() {
            self.inner.settled.wait(&mut state);
        }
        state.clone().unwrap_or(Ok(()))
    }

    /// Block up to `timeout`; `None` if still pending afterwards.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome> {
        let mut state = self.inner.state.lock();
        if state.is_none() {
            self.inner.settled.wait_for(&mut state, timeout);
        }
        state.clone()
    }

    /// The outcome if already settled, without blocking.
    pub fn try_result(&self) -> Option<Outcome> {
        self.inner.state.lock().clone()
    }

    /// True once a result has been stored.
    pub fn is_settled(&self) -> bool {
        self.inner.state.lock().is_some()
    }
}

impl Clone for Completion {
    fn clone(&self) -> Self {
        Completion {
            inner: self.inner.clone(),
        }
    }
}

impl Default for Completion {
    fn default() -> Self {
        Completion::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn settled_is_immediately_ready() {
        let completion = Completion::settled(Ok(()));
        assert!(completion.is_settled());
        assert!(completion.wait().is_ok());
    }

    #[test]
    fn first_settle_wins() {
        let completion = Completion::new();
        completion.settle(Err(FetchError::Cancelled));
        completion.settle(Ok(()));
        assert_eq!(completion.wait(), Err(FetchError::Cancelled));
    }

    #[test]
    fn wait_blocks_until_settled_from_another_thread() {
        let completion = Completion::new();
        let remote = completion.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.settle(Ok(()));
        });
        assert!(completion.wait().is_ok());
    }

    #[test]
    fn wait_timeout_reports_pending() {
        let completion = Completion::new();
        assert!(completion.wait_timeout(Duration::from_millis(10)).is_none());
        completion.settle(Ok(()));
        assert_eq!(
            completion.wait_timeout(Duration::from_millis(10)),
            Some(Ok(()))
        );
    }
}
