//! Page-aware wrapper over the fetch core.
//!
//! Page number and page size live in signals. An injected `on_request` hook
//! writes them into the outgoing query and params under configurable keys
//! (caller-set values win), both signals join the watch set so navigation
//! refetches, and totals are derived from the response payload by key path.

use crate::fetch::{FetchData, FetchPreset};
use crate::options::{FetchOptions, WatchConfig};
use crate::path;
use crate::reactive::{Computed, MaybeReactive, Scope, Signal};
use crate::request::{OnRequest, QueryMap};
use crate::timing::Completion;
use serde_json::Value;
use std::sync::Arc;

/// Options for `use_pagination`: the pagination keys plus a full
/// [`FetchOptions`] for the underlying call site.
#[derive(Clone, Default)]
pub struct PaginationOptions {
    /// Query/params key carrying the page number. Default: `current`.
    pub page_current_key: Option<String>,
    /// Query/params key carrying the page size. Default: `pageSize`.
    pub page_size_key: Option<String>,
    /// Initial page size. Default: 10.
    pub default_page_size: Option<u64>,
    /// Key path of the total item count in the payload. Default: `total`.
    pub total_key: Option<String>,
    /// Key path of the total page count in the payload. Default:
    /// `totalPage`; a missing key falls back to `ceil(total / page_size)`.
    pub page_total_key: Option<String>,
    /// Options for the underlying fetch call site.
    pub fetch: FetchOptions,
}

impl PaginationOptions {
    /// Shallow-merge, fields set in `overrides` winning.
    pub fn merge(self, overrides: Self) -> Self {
        PaginationOptions {
            page_current_key: overrides.page_current_key.or(self.page_current_key),
            page_size_key: overrides.page_size_key.or(self.page_size_key),
            default_page_size: overrides.default_page_size.or(self.default_page_size),
            total_key: overrides.total_key.or(self.total_key),
            page_total_key: overrides.page_total_key.or(self.page_total_key),
            fetch: self.fetch.merge(overrides.fetch),
        }
    }

    /// Set the page-number key.
    pub fn page_current_key(mut self, key: impl Into<String>) -> Self {
        self.page_current_key = Some(key.into());
        self
    }

    /// Set the page-size key.
    pub fn page_size_key(mut self, key: impl Into<String>) -> Self {
        self.page_size_key = Some(key.into());
        self
    }

    /// Set the initial page size.
    pub fn default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = Some(size);
        self
    }

    /// Set the total-count key path.
    pub fn total_key(mut self, key: impl Into<String>) -> Self {
        self.total_key = Some(key.into());
        self
    }

    /// Set the total-pages key path.
    pub fn page_total_key(mut self, key: impl Into<String>) -> Self {
        self.page_total_key = Some(key.into());
        self
    }

    /// Set the underlying fetch options.
    pub fn fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }
}

/// Paginated request state.
///
/// `data`, `pending`, `status` and `error` are the fetch state cells;
/// `page_current` and `page_size` are writable and trigger a refetch on
/// change; `total` and `page_total` are derived read-only views over the
/// current payload.
pub struct Pagination {
    /// Last successful payload.
    pub data: Signal<Option<Value>>,
    /// True strictly while a request is in flight.
    pub pending: Signal<bool>,
    /// Lifecycle of the most recent request.
    pub status: Signal<crate::FetchStatus>,
    /// Last failure, cleared by the next success.
    pub error: Signal<Option<crate::FetchError>>,
    /// Current page number, 1-based.
    pub page_current: Signal<u64>,
    /// Current page size.
    pub page_size: Signal<u64>,
    /// Total item count from the payload.
    pub total: Computed<u64>,
    /// Total page count from the payload, or `ceil(total / page_size)`.
    pub page_total: Computed<u64>,
    inner: FetchData,
}

impl Pagination {
    /// Trigger a request through the gate and filter pipeline.
    pub fn execute(&self) -> Completion {
        self.inner.execute()
    }

    /// Alias for [`execute`](Pagination::execute).
    pub fn refresh(&self) -> Completion {
        self.inner.refresh()
    }

    /// Teardown scope of the underlying call site.
    pub fn scope(&self) -> &Scope {
        self.inner.scope()
    }
}

/// Pagination factory over a [`FetchPreset`].
pub struct PaginationPreset {
    fetch: FetchPreset,
    defaults: PaginationOptions,
}

impl PaginationPreset {
    /// Preset dispatching through `fetch`, with empty defaults.
    pub fn new(fetch: FetchPreset) -> Self {
        PaginationPreset {
            fetch,
            defaults: PaginationOptions::default(),
        }
    }

    /// Derive a preset with additional defaults.
    pub fn create(&self, defaults: PaginationOptions) -> Self {
        PaginationPreset {
            fetch: self.fetch.clone(),
            defaults: self.defaults.clone().merge(defaults),
        }
    }

    /// Start a paginated call site for `target`.
    pub fn paginate(
        &self,
        target: impl Into<MaybeReactive<String>>,
        options: PaginationOptions,
    ) -> Pagination {
        let options = self.defaults.clone().merge(options);

        let page_current_key = options.page_current_key.unwrap_or_else(|| "current".into());
        let page_size_key = options.page_size_key.unwrap_or_else(|| "pageSize".into());
        let total_key = options.total_key.unwrap_or_else(|| "total".into());
        let page_total_key = options.page_total_key.unwrap_or_else(|| "totalPage".into());

        let page_current = Signal::new(1u64);
        let page_size = Signal::new(options.default_page_size.unwrap_or(10));

        let mut fetch_options = options.fetch;

        // Page injection runs before any caller hook so callers can still
        // observe or override the final request.
        let inject: OnRequest = {
            let page_current = page_current.clone();
            let page_size = page_size.clone();
            let current_key = page_current_key.clone();
            let size_key = page_size_key.clone();
            Arc::new(move |ctx| {
                assign_page_key(&mut ctx.query, &current_key, page_current.get());
                assign_page_key(&mut ctx.query, &size_key, page_size.get());
                assign_page_key(&mut ctx.params, &current_key, page_current.get());
                assign_page_key(&mut ctx.params, &size_key, page_size.get());
                Ok(())
            })
        };
        fetch_options.transport.hooks.on_request.insert(0, inject);

        // Page state joins the watch set unless watching is disabled.
        fetch_options.orchestration.watch =
            Some(match fetch_options.orchestration.watch.unwrap_or_default() {
                WatchConfig::Disabled => WatchConfig::Disabled,
                WatchConfig::Default => {
                    WatchConfig::Sources(vec![page_current.source(), page_size.source()])
                }
                WatchConfig::Sources(user) => {
                    let mut sources = vec![page_current.source(), page_size.source()];
                    sources.extend(user);
                    WatchConfig::Sources(sources)
                }
            });

        let inner = self.fetch.fetch(target, fetch_options);

        let total = {
            let data = inner.data.clone();
            let key = total_key;
            Computed::new([data.source()], move || {
                data.with(|payload| match payload {
                    Some(value) => path::get_u64(value, &key, 0),
                    None => 0,
                })
            })
        };
        let page_total = {
            let data = inner.data.clone();
            let total = total.clone();
            let page_size = page_size.clone();
            let key = page_total_key;
            Computed::new([data.source(), page_size.source()], move || {
                let fallback = total.get().div_ceil(page_size.get().max(1));
                data.with(|payload| match payload {
                    Some(value) => path::get_u64(value, &key, fallback),
                    None => fallback,
                })
            })
        };

        Pagination {
            data: inner.data.clone(),
            pending: inner.pending.clone(),
            status: inner.status.clone(),
            error: inner.error.clone(),
            page_current,
            page_size,
            total,
            page_total,
            inner,
        }
    }
}

impl Clone for PaginationPreset {
    fn clone(&self) -> Self {
        PaginationPreset {
            fetch: self.fetch.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

/// Write `value` under `key` unless the caller already set a non-falsy
/// value there. Empty strings, zero, `false` and `null` count as unset.
fn assign_page_key(map: &mut QueryMap, key: &str, value: u64) {
    let falsy = match map.get(key) {
        None => true,
        Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if falsy {
        map.insert(key.to_owned(), Value::from(value));
    }
}

/// Paginate `target` through the shared default client.
#[cfg(feature = "ureq")]
pub fn use_pagination(
    target: impl Into<MaybeReactive<String>>,
    options: PaginationOptions,
) -> Pagination {
    PaginationPreset::new(FetchPreset::default()).paginate(target, options)
}
