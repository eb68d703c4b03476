//! Execution scheduling primitives: completion handles, cancellable timers,
//! debounce and throttle filters, and the interval poller.
//!
//! Everything here is built on threads with condvar-based timed waits. A
//! scheduled piece of work is represented by three explicit parts: a
//! [`Timeout`] handle that can be cancelled, a [`Completion`] whose
//! settlement is observable, and the invocable itself.

mod completion;
mod debounce;
mod poll;
mod throttle;
mod timeout;

pub use completion::{Completion, Outcome};
pub use debounce::{DebounceOptions, Debounced};
pub use poll::Poller;
pub use throttle::{ThrottleOptions, Throttled};
pub use timeout::Timeout;

use crate::error::FetchError;
use std::sync::Arc;

/// The invocable wrapped by the filters: one run of the request routine.
pub type Invoke = Arc<dyn Fn() -> Result<(), FetchError> + Send + Sync>;
