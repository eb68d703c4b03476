//! The request execution core.
//!
//! `use_async_data` turns a producer closure into observable request state
//! plus an execution pipeline: readiness gate, debounce, throttle, then
//! either direct invocation or delegation to the interval poller. Watch
//! sources re-trigger the same pipeline.

use crate::error::FetchError;
use crate::options::{AsyncDataOptions, WatchConfig};
use crate::reactive::{watch, Scope, Signal, WatchSource};
use crate::timing::{Completion, DebounceOptions, Debounced, Poller, ThrottleOptions, Throttled};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace};

/// Lifecycle of the most recent execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// No execution has run yet.
    #[default]
    Idle,
    /// An execution is in flight.
    Pending,
    /// The last settled execution succeeded.
    Success,
    /// The last settled execution failed.
    Error,
}

/// Producer of one request result.
pub type Producer<T> = Arc<dyn Fn() -> Result<T, FetchError> + Send + Sync>;

/// Observable request state returned by `use_async_data` and the composables
/// built on it.
///
/// The signals are shared cells: clone them freely, read them from any
/// thread, subscribe to them for change notification. `data` keeps the last
/// successful result while a newer execution is pending or failing
/// (stale-while-revalidate); `error` holds the last failure until a new
/// execution succeeds.
///
/// Dropping the `AsyncData` (or disposing its [`scope`](AsyncData::scope))
/// pauses polling, cancels pending filter timers and removes watch
/// subscriptions. In-flight requests are not aborted.
pub struct AsyncData<T> {
    /// Last successful (transformed) result, or the seeded default.
    pub data: Signal<Option<T>>,
    /// True strictly while an execution is in flight.
    pub pending: Signal<bool>,
    /// Lifecycle of the most recent execution.
    pub status: Signal<FetchStatus>,
    /// Last failure, cleared by the next successful execution.
    pub error: Signal<Option<FetchError>>,
    execute: Arc<dyn Fn() -> Completion + Send + Sync>,
    scope: Scope,
}

impl<T> AsyncData<T> {
    /// Trigger an execution through the gate and filter pipeline.
    ///
    /// The returned [`Completion`] settles when the triggered invocation
    /// does. With `ready` currently false this is a no-op that settles
    /// `Ok(())` without touching any state.
    pub fn execute(&self) -> Completion {
        (self.execute)()
    }

    /// Alias for [`execute`](AsyncData::execute).
    pub fn refresh(&self) -> Completion {
        self.execute()
    }

    /// Teardown scope owning this call site's poller, timers and watchers.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// Run `producer` with the given orchestration options.
///
/// # Example
///
/// ```ignore
/// let user = use_async_data(
///     move || client.fetch_user(id),
///     AsyncDataOptions::default().debounce_interval(Duration::from_millis(50)),
/// );
/// user.execute().wait()?;
/// assert!(user.data.get().is_some());
/// ```
pub fn use_async_data<T: Clone + Send + Sync + 'static>(
    producer: impl Fn() -> Result<T, FetchError> + Send + Sync + 'static,
    options: AsyncDataOptions<T>,
) -> AsyncData<T> {
    AsyncDataPreset::default().use_async_data(producer, options)
}

/// Reusable default options for `use_async_data`.
///
/// `create` chains: each call produces a new preset whose defaults are the
/// parent's defaults shallow-merged with the new ones, new keys winning.
/// Call-site options take precedence over every preset layer.
pub struct AsyncDataPreset<T> {
    defaults: AsyncDataOptions<T>,
}

impl<T> Default for AsyncDataPreset<T> {
    fn default() -> Self {
        AsyncDataPreset {
            defaults: AsyncDataOptions::default(),
        }
    }
}

impl<T> Clone for AsyncDataPreset<T> {
    fn clone(&self) -> Self {
        AsyncDataPreset {
            defaults: self.defaults.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> AsyncDataPreset<T> {
    /// Derive a preset with additional defaults.
    pub fn create(&self, defaults: AsyncDataOptions<T>) -> Self {
        AsyncDataPreset {
            defaults: self.defaults.clone().merge(defaults),
        }
    }

    /// Run `producer` with this preset's defaults beneath `options`.
    pub fn use_async_data(
        &self,
        producer: impl Fn() -> Result<T, FetchError> + Send + Sync + 'static,
        options: AsyncDataOptions<T>,
    ) -> AsyncData<T> {
        create_async_data(Arc::new(producer), self.defaults.clone().merge(options))
    }
}

/// Resets `pending` even when the producer path unwinds.
struct PendingGuard(Signal<bool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub(crate) fn create_async_data<T: Clone + Send + Sync + 'static>(
    producer: Producer<T>,
    options: AsyncDataOptions<T>,
) -> AsyncData<T> {
    let data = Signal::new(options.default_value.as_ref().and_then(|default| default()));
    let pending = Signal::new(false);
    let status = Signal::new(FetchStatus::Idle);
    let error = Signal::new(None::<FetchError>);
    let transform = options.transform.clone();

    // One invocation of the state machine: Pending, run, Success | Error.
    let run: Arc<dyn Fn() -> Result<(), FetchError> + Send + Sync> = {
        let data = data.clone();
        let pending = pending.clone();
        let status = status.clone();
        let error = error.clone();
        Arc::new(move || {
            trace!("execution starting");
            status.set(FetchStatus::Pending);
            pending.set(true);
            let _guard = PendingGuard(pending.clone());
            match producer() {
                Ok(result) => {
                    let result = match &transform {
                        Some(transform) => transform(result),
                        None => result,
                    };
                    data.set(Some(result));
                    status.set(FetchStatus::Success);
                    error.set(None);
                    trace!("execution succeeded");
                    Ok(())
                }
                Err(e) => {
                    debug!(error = %e, "execution failed");
                    error.set(Some(e.clone()));
                    status.set(FetchStatus::Error);
                    Err(e)
                }
            }
        })
    };

    let scope = Scope::new();

    // Pipeline: debounce first, throttle around it.
    let step: Arc<dyn Fn() -> Completion + Send + Sync> = match options.debounce_interval.clone() {
        Some(delay) => {
            let debounced = Debounced::new(run, delay, DebounceOptions::default());
            scope.on_cleanup({
                let debounced = debounced.clone();
                move || debounced.cancel()
            });
            Arc::new(move || debounced.call())
        }
        None => Arc::new(move || Completion::settled(run())),
    };
    let step: Arc<dyn Fn() -> Completion + Send + Sync> = match options.throttle_interval.clone() {
        Some(interval) => {
            let inner = step;
            let throttled = Throttled::new(
                Arc::new(move || inner().wait()),
                interval,
                ThrottleOptions {
                    trailing: false,
                    ..ThrottleOptions::default()
                },
            );
            scope.on_cleanup({
                let throttled = throttled.clone();
                move || throttled.cancel()
            });
            Arc::new(move || throttled.call())
        }
        None => step,
    };

    // Readiness gate, resolved at call time, outside the filters.
    let ready = options.ready.clone().unwrap_or(true.into());
    let execute: Arc<dyn Fn() -> Completion + Send + Sync> = Arc::new(move || {
        if ready.get() {
            step()
        } else {
            trace!("not ready, skipping execution");
            Completion::settled(Ok(()))
        }
    });

    let immediate = options.immediate.unwrap_or(true);
    if let Some(interval) = options.polling_interval.clone() {
        // Polling supersedes the one-shot immediate execution.
        let poller = Poller::new(
            {
                let execute = execute.clone();
                move || execute()
            },
            interval,
        );
        scope.on_cleanup({
            let poller = poller.clone();
            move || poller.pause()
        });
        if immediate {
            poller.resume();
        }
    } else if immediate {
        let execute = execute.clone();
        thread::spawn(move || {
            // errors land in the error state
            let _ = execute().wait();
        });
    }

    let sources: Vec<WatchSource> = match options.watch.clone().unwrap_or_default() {
        WatchConfig::Default => Vec::new(),
        WatchConfig::Sources(sources) => sources,
        WatchConfig::Disabled => Vec::new(),
    };
    if !sources.is_empty() {
        let execute = execute.clone();
        let handle = watch(sources, move || {
            let execute = execute.clone();
            thread::spawn(move || {
                let _ = execute().wait();
            });
        });
        scope.on_cleanup(move || drop(handle));
    }

    AsyncData {
        data,
        pending,
        status,
        error,
        execute,
        scope,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn manual_execute_stores_data() {
        let state = use_async_data(
            || Ok::<_, FetchError>(41 + 1),
            AsyncDataOptions::default().immediate(false),
        );

        assert_eq!(state.status.get(), FetchStatus::Idle);
        assert_eq!(state.data.get(), None);

        state.execute().wait().unwrap();
        assert_eq!(state.data.get(), Some(42));
        assert_eq!(state.status.get(), FetchStatus::Success);
        assert!(!state.pending.get());
    }

    #[test]
    fn immediate_executes_on_creation() {
        let state = use_async_data(|| Ok::<_, FetchError>(7), AsyncDataOptions::default());
        assert!(wait_until(
            || state.data.get() == Some(7),
            Duration::from_secs(2)
        ));
    }

    #[test]
    fn failure_keeps_stale_data_and_stores_error() {
        let fail = Arc::new(AtomicUsize::new(0));
        let fail_clone = fail.clone();
        let state = use_async_data(
            move || {
                if fail_clone.load(Ordering::Relaxed) == 0 {
                    Ok(1)
                } else {
                    Err(FetchError::message("boom"))
                }
            },
            AsyncDataOptions::default().immediate(false),
        );

        state.execute().wait().unwrap();
        assert_eq!(state.data.get(), Some(1));

        fail.store(1, Ordering::Relaxed);
        let outcome = state.execute().wait();
        assert_eq!(outcome, Err(FetchError::message("boom")));
        assert_eq!(state.data.get(), Some(1));
        assert_eq!(state.status.get(), FetchStatus::Error);
        assert_eq!(state.error.get(), Some(FetchError::message("boom")));

        fail.store(0, Ordering::Relaxed);
        state.execute().wait().unwrap();
        assert_eq!(state.error.get(), None);
        assert_eq!(state.status.get(), FetchStatus::Success);
    }

    #[test]
    fn ready_false_is_a_silent_no_op() {
        let ready = Signal::new(false);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let state = use_async_data(
            move || {
                count_clone.fetch_add(1, Ordering::Relaxed);
                Ok(1)
            },
            AsyncDataOptions::default()
                .immediate(false)
                .ready(ready.clone()),
        );

        state.execute().wait().unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(state.status.get(), FetchStatus::Idle);

        ready.set(true);
        state.execute().wait().unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn transform_applies_before_store() {
        let state = use_async_data(
            || Ok::<_, FetchError>(10),
            AsyncDataOptions::default()
                .immediate(false)
                .transform(|n| n * 2),
        );
        state.execute().wait().unwrap();
        assert_eq!(state.data.get(), Some(20));
    }

    #[test]
    fn default_value_seeds_data() {
        let state = use_async_data(
            || Ok::<_, FetchError>(1),
            AsyncDataOptions::default()
                .immediate(false)
                .default_value(|| Some(99)),
        );
        assert_eq!(state.data.get(), Some(99));
    }

    #[test]
    fn watch_source_triggers_execution() {
        let source = Signal::new(0);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let _state = use_async_data(
            move || {
                count_clone.fetch_add(1, Ordering::Relaxed);
                Ok(1)
            },
            AsyncDataOptions::default()
                .immediate(false)
                .watch(vec![source.source()]),
        );

        source.set(1);
        assert!(wait_until(
            || count.load(Ordering::Relaxed) == 1,
            Duration::from_secs(2)
        ));
    }

    #[test]
    fn scope_dispose_stops_watching() {
        let source = Signal::new(0);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let state = use_async_data(
            move || {
                count_clone.fetch_add(1, Ordering::Relaxed);
                Ok(1)
            },
            AsyncDataOptions::default()
                .immediate(false)
                .watch(vec![source.source()]),
        );

        state.scope().dispose();
        source.set(1);
        thread::sleep(Duration::from_millis(80));
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn polling_with_immediate_starts_the_loop_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let state = use_async_data(
            move || {
                count_clone.fetch_add(1, Ordering::Relaxed);
                Ok(1)
            },
            AsyncDataOptions::default().polling_interval(Duration::from_millis(50)),
        );

        assert!(wait_until(
            || count.load(Ordering::Relaxed) == 1,
            Duration::from_secs(2)
        ));
        thread::sleep(Duration::from_millis(80));
        assert_eq!(count.load(Ordering::Relaxed), 2);

        state.scope().dispose();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn preset_chain_composes_defaults() {
        let base = AsyncDataPreset::<i32>::default()
            .create(AsyncDataOptions::default().immediate(false));

        let ready = Signal::new(false);
        let gated = base.create(AsyncDataOptions::default().ready(ready.clone()));

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let state = gated.use_async_data(
            move || {
                count_clone.fetch_add(1, Ordering::Relaxed);
                Ok(1)
            },
            AsyncDataOptions::default(),
        );

        // immediate=false from the first layer, ready=false from the second
        state.execute().wait().unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 0);

        ready.set(true);
        state.execute().wait().unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
