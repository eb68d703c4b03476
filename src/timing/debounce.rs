use crate::error::FetchError;
use crate::reactive::MaybeReactive;
use crate::timing::{Completion, Invoke, Timeout};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Behaviour knobs for [`Debounced`].
#[derive(Clone, Default)]
pub struct DebounceOptions {
    /// Upper bound on how long invocation may keep being postponed.
    ///
    /// Armed at the first pending call of a burst; when it elapses the
    /// invocation is forced even though fresh calls keep resetting the base
    /// delay.
    pub max_wait: Option<MaybeReactive<Duration>>,
    /// Settle a superseded call with [`FetchError::Cancelled`] instead of
    /// letting it share the eventual invocation's outcome.
    pub reject_on_cancel: bool,
}

/// Debounce filter around an invocable.
///
/// Every [`call`](Debounced::call) cancels the previously scheduled timer
/// and arms a new one, so only the last call of a burst invokes. All callers
/// within the burst receive the same [`Completion`], settled with the single
/// eventual invocation's outcome. A delay of zero invokes inline on the
/// calling thread.
///
/// # Example
///
/// ```ignore
/// let debounced = Debounced::new(run, Duration::from_millis(50), DebounceOptions::default());
/// debounced.call();
/// debounced.call();
/// let last = debounced.call();      // one invocation, ~50ms from now
/// last.wait()?;
/// ```
pub struct Debounced {
    inner: Arc<DebounceInner>,
}

struct DebounceInner {
    invoke: Invoke,
    delay: MaybeReactive<Duration>,
    options: DebounceOptions,
    state: Mutex<DebounceState>,
}

#[derive(Default)]
struct DebounceState {
    next_token: u64,
    timer: Option<(u64, Timeout)>,
    max_timer: Option<(u64, Timeout)>,
    slot: Option<Completion>,
}

impl Debounced {
    /// Wrap `invoke` with a debounce window of `delay`.
    pub fn new(
        invoke: Invoke,
        delay: impl Into<MaybeReactive<Duration>>,
        options: DebounceOptions,
    ) -> Self {
        Debounced {
            inner: Arc::new(DebounceInner {
                invoke,
                delay: delay.into(),
                options,
                state: Mutex::new(DebounceState::default()),
            }),
        }
    }

    /// Schedule (or reschedule) the invocation.
    pub fn call(&self) -> Completion {
        let delay = self.inner.delay.get();
        let max_wait = self.inner.options.max_wait.as_ref().map(MaybeReactive::get);

        let mut state = self.inner.state.lock();
        if let Some((_, timer)) = state.timer.take() {
            timer.cancel();
            if self.inner.options.reject_on_cancel {
                if let Some(slot) = state.slot.take() {
                    slot.settle(Err(FetchError::Cancelled));
                }
            }
        }

        if delay.is_zero() || max_wait.is_some_and(|m| m.is_zero()) {
            if let Some((_, timer)) = state.max_timer.take() {
                timer.cancel();
            }
            let slot = state.slot.take();
            drop(state);
            let outcome = (self.inner.invoke)();
            if let Some(slot) = slot {
                slot.settle(outcome.clone());
            }
            return Completion::settled(outcome);
        }

        let slot = state.slot.get_or_insert_with(Completion::new).clone();
        if let Some(max_wait) = max_wait {
            if state.max_timer.is_none() {
                let token = state.next_token;
                state.next_token += 1;
                let inner = self.inner.clone();
                state.max_timer = Some((
                    token,
                    Timeout::schedule(max_wait, move || fire_max(&inner, token)),
                ));
            }
        }
        let token = state.next_token;
        state.next_token += 1;
        let inner = self.inner.clone();
        state.timer = Some((token, Timeout::schedule(delay, move || fire(&inner, token))));
        drop(state);
        slot
    }

    /// Cancel any pending timers and settle waiting callers.
    ///
    /// Waiters receive `Ok(())` in resolve mode and
    /// [`FetchError::Cancelled`] in reject mode; the wrapped invocable is
    /// not run.
    pub fn cancel(&self) {
        let reject = self.inner.options.reject_on_cancel;
        let mut state = self.inner.state.lock();
        if let Some((_, timer)) = state.timer.take() {
            timer.cancel();
        }
        if let Some((_, timer)) = state.max_timer.take() {
            timer.cancel();
        }
        if let Some(slot) = state.slot.take() {
            slot.settle(if reject {
                Err(FetchError::Cancelled)
            } else {
                Ok(())
            });
        }
    }
}

impl Clone for Debounced {
    fn clone(&self) -> Self {
        Debounced {
            inner: self.inner.clone(),
        }
    }
}

/// Regular timer expiry. The token check discards a firing that lost the
/// race against cancellation.
fn fire(inner: &Arc<DebounceInner>, token: u64) {
    let mut state = inner.state.lock();
    match &state.timer {
        Some((current, _)) if *current == token => state.timer = None,
        _ => return,
    }
    if let Some((_, max_timer)) = state.max_timer.take() {
        max_timer.cancel();
    }
    let slot = state.slot.take();
    drop(state);
    trace!("debounce window elapsed, invoking");
    let outcome = (inner.invoke)();
    if let Some(slot) = slot {
        slot.settle(outcome);
    }
}

/// Max-wait expiry: force the invocation past any pending regular timer.
fn fire_max(inner: &Arc<DebounceInner>, token: u64) {
    let mut state = inner.state.lock();
    match &state.max_timer {
        Some((current, _)) if *current == token => state.max_timer = None,
        _ => return,
    }
    if let Some((_, timer)) = state.timer.take() {
        timer.cancel();
    }
    let slot = state.slot.take();
    drop(state);
    trace!("debounce max wait elapsed, forcing invocation");
    let outcome = (inner.invoke)();
    if let Some(slot) = slot {
        slot.settle(outcome);
    }
}
