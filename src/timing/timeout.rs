use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cancellable one-shot timer handle.
///
/// The callback runs on a dedicated thread after `delay`, unless
/// [`cancel`](Timeout::cancel) lands first. Cancellation wakes the waiting
/// thread immediately, so no timer outlives its usefulness by a full delay.
///
/// Cancellation and expiry race by nature. A caller that must not observe a
/// late firing should pair the handle with its own token check inside the
/// callback, as the debounce and throttle filters do.
pub struct Timeout {
    inner: Arc<TimeoutInner>,
}

struct TimeoutInner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl Timeout {
    /// Arm a timer that runs `callback` after `delay`.
    pub fn schedule(delay: Duration, callback: impl FnOnce() + Send + 'static) -> Self {
        let inner = Arc::new(TimeoutInner {
            cancelled: Mutex::new(false),
            wake: Condvar::new(),
        });
        let waiter = inner.clone();
        thread::spawn(move || {
            let deadline = Instant::now() + delay;
            let mut cancelled = waiter.cancelled.lock();
            loop {
                if *cancelled {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                waiter.wake.wait_for(&mut cancelled, deadline - now);
            }
            drop(cancelled);
            callback();
        });
        Timeout { inner }
    }

    /// Prevent the callback from running if it has not started yet.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        *cancelled = true;
        self.inner.wake.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let _timer = Timeout::schedule(Duration::from_millis(20), move || {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(fired.load(Ordering::Relaxed), 0);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let timer = Timeout::schedule(Duration::from_millis(30), move || {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        });

        timer.cancel();
        thread::sleep(Duration::from_millis(80));
        assert_eq!(fired.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn zero_delay_still_runs_on_its_own_thread() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let _timer = Timeout::schedule(Duration::ZERO, move || {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        });
        thread::sleep(Duration::from_millis(50));
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }
}
