//! Minimal reactive substrate: observable cells, derived values, explicit
//! watch subscriptions and teardown scopes.
//!
//! This is deliberately push-based. There is no dependency graph and no
//! automatic tracking; every reactive relationship is declared by listing
//! watch sources. That is all the request orchestration layer needs, and it
//! keeps cleanup a matter of dropping handles.

mod computed;
mod maybe;
mod scope;
mod signal;
mod watch;

pub use computed::Computed;
pub use maybe::MaybeReactive;
pub use scope::Scope;
pub use signal::Signal;
pub use watch::{watch, Subscription, WatchHandle, WatchSource};
