#![deny(missing_docs)]

//! Composable reactive data fetching.
//!
//! This crate layers a small, race-aware request orchestration pipeline over
//! two seams: a blocking HTTP transport ([`HttpClient`]) and a minimal
//! push-based reactive substrate ([`reactive`]). Three composables share one
//! state machine:
//!
//! - [`use_async_data`] runs any producer closure and exposes
//!   `data` / `pending` / `status` / `error` as observable signals.
//! - [`use_fetch`] specializes it for HTTP: reactive URL, reactive
//!   per-request overrides, lifecycle hooks, JSON parsing.
//! - [`use_pagination`] wraps fetch with page state, key injection and
//!   derived totals.
//!
//! # Quick Start
//!
//! ```ignore
//! use refetch::{use_fetch, FetchOptions};
//!
//! let users = use_fetch("http://localhost:3000/users", FetchOptions::default());
//! users.execute().wait()?;
//! println!("{:?}", users.data.get());
//! ```
//!
//! # Execution pipeline
//!
//! Every trigger, whether a manual `execute()`, a watch-source change or a
//! poll cycle, runs through the same pipeline:
//!
//! ```ignore
//! ready gate -> debounce -> throttle -> invoke producer
//! ```
//!
//! The gate resolves at call time and turns not-ready calls into silent
//! no-ops. Debounce coalesces bursts into the last call; throttle
//! rate-limits to one leading invocation per window. With
//! `polling_interval` configured, `immediate` starts the poll loop instead
//! of firing a one-shot request.
//!
//! ```ignore
//! let state = use_fetch(
//!     url,
//!     FetchOptions::default()
//!         .debounce_interval(Duration::from_millis(50))
//!         .ready(is_logged_in.clone()),
//! );
//! ```
//!
//! # Reactivity
//!
//! State cells are [`Signal`]s: clone them anywhere, read them from any
//! thread, subscribe for change notification. Inputs that may change are
//! [`MaybeReactive`]: pass a plain value, a `Signal` or a [`Computed`], and
//! reactive inputs automatically join the watch set of the call site.
//!
//! ```ignore
//! let target = Signal::new(String::from("users"));
//! let state = use_fetch(target.clone(), FetchOptions::default());
//! target.set("teams".into());   // refetches
//! ```
//!
//! # Presets
//!
//! [`FetchPreset`], [`AsyncDataPreset`] and [`PaginationPreset`] hold
//! immutable default-option snapshots. `create()` derives a new preset by
//! shallow-merging additional defaults, new keys winning; call-site options
//! override every preset layer.
//!
//! # Concurrency notes
//!
//! Overlapping executions at one call site are not serialized: the last
//! continuation to settle wins, so a fast later request can overwrite a
//! slow earlier one. Configure `debounce_interval` or `throttle_interval`
//! to coalesce rapid triggers. In-flight requests are not aborted;
//! disposing a call site's [`Scope`](reactive::Scope) stops polling, pending
//! filter timers and watch subscriptions.

// Internal modules
mod async_data;
mod client;
mod error;
mod fetch;
mod options;
mod pagination;
pub mod path;
pub mod reactive;
mod request;
pub mod timing;

// Core composables and state
pub use async_data::{use_async_data, AsyncData, AsyncDataPreset, FetchStatus, Producer};
pub use fetch::{FetchData, FetchPreset};
pub use pagination::{Pagination, PaginationOptions, PaginationPreset};

#[cfg(feature = "ureq")]
pub use fetch::use_fetch;
#[cfg(feature = "ureq")]
pub use pagination::use_pagination;

// Options
pub use options::{
    AsyncDataOptions, FetchOptions, RequestOverrides, TransportOptions, WatchConfig,
};

// Transport seam
#[cfg(feature = "ureq")]
pub use client::UreqClient;
pub use client::{HttpClient, HttpRequest, Method, RawResponse, ResponseType};
pub use request::{
    FetchHooks, HeaderMap, OnRequest, OnRequestError, OnResponse, OnResponseError, QueryMap,
    RequestContext, ResponseContext,
};

// Errors
pub use error::FetchError;

// Re-exported reactive primitives
pub use reactive::{Computed, MaybeReactive, Signal};

#[cfg(all(test, feature = "ureq"))]
mod tests;
