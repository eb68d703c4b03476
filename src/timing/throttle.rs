use crate::error::FetchError;
use crate::reactive::MaybeReactive;
use crate::timing::{Completion, Invoke, Timeout};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Behaviour knobs for [`Throttled`].
///
/// Filter-level defaults are `leading: true`, `trailing: true`. The request
/// composables construct their throttle with `trailing: false`, so their net
/// default is no trailing invocation unless explicitly enabled.
#[derive(Clone)]
pub struct ThrottleOptions {
    /// Invoke on the trailing edge of an open window.
    pub trailing: bool,
    /// Invoke immediately when the window is closed.
    pub leading: bool,
    /// Settle a superseded trailing call with [`FetchError::Cancelled`].
    pub reject_on_cancel: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        ThrottleOptions {
            trailing: true,
            leading: true,
            reject_on_cancel: false,
        }
    }
}

/// Rate-limiting filter around an invocable.
///
/// Keeps a `last_exec` timestamp. A call outside the window invokes inline
/// (leading edge). Calls inside the window either coalesce into a single
/// trailing invocation scheduled for the window's end, or, with trailing
/// disabled, are dropped and handed the previous call's [`Completion`].
pub struct Throttled {
    inner: Arc<ThrottleInner>,
}

struct ThrottleInner {
    invoke: Invoke,
    interval: MaybeReactive<Duration>,
    options: ThrottleOptions,
    state: Mutex<ThrottleState>,
}

struct ThrottleState {
    last_exec: Option<Instant>,
    /// Pending trailing-edge or leading-reset timer, token-tagged so a stale
    /// expiry cannot fire after cancellation.
    timer: Option<(u64, Timeout)>,
    next_token: u64,
    is_leading: bool,
    slot: Option<Completion>,
    last: Option<Completion>,
}

impl Default for ThrottleState {
    fn default() -> Self {
        ThrottleState {
            last_exec: None,
            timer: None,
            next_token: 0,
            is_leading: true,
            slot: None,
            last: None,
        }
    }
}

impl Throttled {
    /// Wrap `invoke` with a throttle window of `interval`.
    pub fn new(
        invoke: Invoke,
        interval: impl Into<MaybeReactive<Duration>>,
        options: ThrottleOptions,
    ) -> Self {
        Throttled {
            inner: Arc::new(ThrottleInner {
                invoke,
                interval: interval.into(),
                options,
                state: Mutex::new(ThrottleState::default()),
            }),
        }
    }

    /// Invoke now, schedule a trailing invocation, or drop the call,
    /// depending on the window state.
    pub fn call(&self) -> Completion {
        let interval = self.inner.interval.get();
        let options = &self.inner.options;

        let mut state = self.inner.state.lock();
        if let Some((_, timer)) = state.timer.take() {
            timer.cancel();
            if options.reject_on_cancel {
                if let Some(slot) = state.slot.take() {
                    slot.settle(Err(FetchError::Cancelled));
                }
            }
        }

        let elapsed = state.last_exec.map(|at| at.elapsed());
        let window_open = elapsed.is_some_and(|e| e <= interval) && !interval.is_zero();

        let completion = if !window_open && (options.leading || !state.is_leading) {
            state.last_exec = Some(Instant::now());
            state.is_leading = false;
            drop(state);
            let outcome = (self.inner.invoke)();
            let completion = Completion::settled(outcome);
            state = self.inner.state.lock();
            state.last = Some(completion.clone());
            completion
        } else if options.trailing {
            let slot = state.slot.get_or_insert_with(Completion::new).clone();
            let remaining = elapsed.map_or(Duration::ZERO, |e| interval.saturating_sub(e));
            let token = state.next_token;
            state.next_token += 1;
            let inner = self.inner.clone();
            state.timer = Some((
                token,
                Timeout::schedule(remaining, move || trailing_fire(&inner, token)),
            ));
            state.last = Some(slot.clone());
            slot
        } else {
            trace!("throttle window open, dropping call");
            state
                .last
                .clone()
                .unwrap_or_else(|| Completion::settled(Ok(())))
        };

        // With leading disabled the window reopens silently once the
        // interval passes without an invocation.
        if !options.leading && state.timer.is_none() {
            let token = state.next_token;
            state.next_token += 1;
            let inner = self.inner.clone();
            state.timer = Some((
                token,
                Timeout::schedule(interval, move || reset_fire(&inner, token)),
            ));
        }
        state.is_leading = false;
        completion
    }

    /// Cancel a pending trailing invocation and settle its waiters.
    pub fn cancel(&self) {
        let reject = self.inner.options.reject_on_cancel;
        let mut state = self.inner.state.lock();
        if let Some((_, timer)) = state.timer.take() {
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

impl Clone for Throttled {
    fn clone(&self) -> Self {
        Throttled {
            inner: self.inner.clone(),
        }
    }
}

fn trailing_fire(inner: &Arc<ThrottleInner>, token: u64) {
    let mut state = inner.state.lock();
    match &state.timer {
        Some((current, _)) if *current == token => state.timer = None,
        _ => return,
    }
    state.last_exec = Some(Instant::now());
    state.is_leading = true;
    let slot = state.slot.take();
    drop(state);
    trace!("throttle trailing edge, invoking");
    let outcome = (inner.invoke)();
    if let Some(slot) = slot {
        slot.settle(outcome);
    }
}

fn reset_fire(inner: &Arc<ThrottleInner>, token: u64) {
    let mut state = inner.state.lock();
    match &state.timer {
        Some((current, _)) if *current == token => state.timer = None,
        _ => return,
    }
    state.is_leading = true;
}
