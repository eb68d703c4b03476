use crate::reactive::MaybeReactive;
use crate::timing::Completion;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Pausable interval poller.
///
/// Starts inactive. [`resume`](Poller::resume) spawns a cycle thread that
/// runs the task, waits for its completion, sleeps `interval` and repeats
/// until [`pause`](Poller::pause) lands. The interval is measured from the
/// end of one cycle to the start of the next, and re-read each cycle so a
/// reactive interval takes effect without restarting.
///
/// Pausing wakes the sleeping cycle thread immediately, so no timer survives
/// its poller. A paused poller can be resumed again; stale cycle threads
/// from an earlier activation notice the epoch change and exit.
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    task: Arc<dyn Fn() -> Completion + Send + Sync>,
    interval: MaybeReactive<Duration>,
    state: Mutex<PollState>,
    wake: Condvar,
}

#[derive(Default)]
struct PollState {
    active: bool,
    epoch: u64,
}

impl Poller {
    /// Create an inactive poller over `task`.
    pub fn new(
        task: impl Fn() -> Completion + Send + Sync + 'static,
        interval: impl Into<MaybeReactive<Duration>>,
    ) -> Self {
        Poller {
            inner: Arc::new(PollerInner {
                task: Arc::new(task),
                interval: interval.into(),
                state: Mutex::new(PollState::default()),
                wake: Condvar::new(),
            }),
        }
    }

    /// True while the cycle loop is running.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    /// Start the cycle loop. No-op (settled `Ok`) if already active.
    ///
    /// The returned [`Completion`] settles with the outcome of the first
    /// cycle, so immediate-polling callers can block on it.
    pub fn resume(&self) -> Completion {
        let epoch = {
            let mut state = self.inner.state.lock();
            if state.active {
                return Completion::settled(Ok(()));
            }
            state.active = true;
            state.epoch += 1;
            state.epoch
        };
        debug!("poller resumed");

        let first_cycle = Completion::new();
        let inner = self.inner.clone();
        let first = first_cycle.clone();
        thread::spawn(move || run_cycles(inner, epoch, first));
        first_cycle
    }

    /// Stop the cycle loop. Idempotent.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if !state.active {
            return;
        }
        state.active = false;
        self.inner.wake.notify_all();
        debug!("poller paused");
    }
}

impl Clone for Poller {
    fn clone(&self) -> Self {
        Poller {
            inner: self.inner.clone(),
        }
    }
}

fn run_cycles(inner: Arc<PollerInner>, epoch: u64, first_cycle: Completion) {
    loop {
        {
            let state = inner.state.lock();
            if !state.active || state.epoch != epoch {
                break;
            }
        }

        trace!("poll cycle starting");
        let outcome = (inner.task)().wait();
        first_cycle.settle(outcome);

        let interval = inner.interval.get();
        let deadline = Instant::now() + interval;
        let mut state = inner.state.lock();
        loop {
            if !state.active || state.epoch != epoch {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            inner.wake.wait_for(&mut state, deadline - now);
        }
    }
    // a pause before the first cycle still releases waiters
    first_cycle.settle(Ok(()));
}
