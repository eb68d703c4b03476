//! Option bags and the context resolver.
//!
//! Options are partitioned into three named sub-configurations instead of
//! one flat bag: orchestration (when and how often to execute), reactive
//! per-request overrides (what to send), and transport options (passed to
//! the HTTP layer). Merging is a pure function with a single precedence
//! rule: call-site options override preset defaults, and defaults set by a
//! later `create()` override earlier ones. Presets are immutable snapshots;
//! deriving one never mutates its parent.

use crate::client::{Method, ResponseType};
use crate::reactive::{MaybeReactive, WatchSource};
use crate::request::{
    FetchHooks, HeaderMap, OnRequest, OnRequestError, OnResponse, OnResponseError, QueryMap,
    RequestContext, ResponseContext,
};
use crate::FetchError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Which sources trigger re-execution.
#[derive(Clone, Default)]
pub enum WatchConfig {
    /// The listed sources, plus whatever implicit sources the composable
    /// adds (the request target, reactive overrides, pagination state).
    #[default]
    Default,
    /// The listed sources in addition to the implicit ones.
    Sources(Vec<WatchSource>),
    /// No watching at all; implicit sources are disabled too.
    Disabled,
}

impl From<Vec<WatchSource>> for WatchConfig {
    fn from(sources: Vec<WatchSource>) -> Self {
        WatchConfig::Sources(sources)
    }
}

/// Orchestration options for the async-data core.
///
/// Every field is optional; unset fields fall back to the preset chain and
/// finally to the documented defaults.
pub struct AsyncDataOptions<T> {
    /// Execute once at creation (or start the poll loop when polling is
    /// configured). Default: true.
    pub immediate: Option<bool>,
    /// Re-execution triggers. Default: implicit sources only.
    pub watch: Option<WatchConfig>,
    /// Poll repeatedly at this interval.
    pub polling_interval: Option<MaybeReactive<Duration>>,
    /// Debounce window applied in front of every execution.
    pub debounce_interval: Option<MaybeReactive<Duration>>,
    /// Throttle window applied after debouncing. Leading-edge only unless
    /// reconfigured at the filter level.
    pub throttle_interval: Option<MaybeReactive<Duration>>,
    /// Readiness gate checked right before each execution attempt.
    /// Default: true.
    pub ready: Option<MaybeReactive<bool>>,
    /// Applied to every successful result before it is stored.
    pub transform: Option<Arc<dyn Fn(T) -> T + Send + Sync>>,
    /// Seeds the `data` state at creation. Default: `None`.
    pub default_value: Option<Arc<dyn Fn() -> Option<T> + Send + Sync>>,
}

impl<T> Default for AsyncDataOptions<T> {
    fn default() -> Self {
        AsyncDataOptions {
            immediate: None,
            watch: None,
            polling_interval: None,
            debounce_interval: None,
            throttle_interval: None,
            ready: None,
            transform: None,
            default_value: None,
        }
    }
}

impl<T> Clone for AsyncDataOptions<T> {
    fn clone(&self) -> Self {
        AsyncDataOptions {
            immediate: self.immediate,
            watch: self.watch.clone(),
            polling_interval: self.polling_interval.clone(),
            debounce_interval: self.debounce_interval.clone(),
            throttle_interval: self.throttle_interval.clone(),
            ready: self.ready.clone(),
            transform: self.transform.clone(),
            default_value: self.default_value.clone(),
        }
    }
}

impl<T> AsyncDataOptions<T> {
    /// Shallow-merge, fields set in `overrides` winning.
    pub fn merge(self, overrides: Self) -> Self {
        AsyncDataOptions {
            immediate: overrides.immediate.or(self.immediate),
            watch: overrides.watch.or(self.watch),
            polling_interval: overrides.polling_interval.or(self.polling_interval),
            debounce_interval: overrides.debounce_interval.or(self.debounce_interval),
            throttle_interval: overrides.throttle_interval.or(self.throttle_interval),
            ready: overrides.ready.or(self.ready),
            transform: overrides.transform.or(self.transform),
            default_value: overrides.default_value.or(self.default_value),
        }
    }

    /// Set `immediate`.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = Some(immediate);
        self
    }

    /// Watch the given sources (in addition to implicit ones).
    pub fn watch(mut self, sources: Vec<WatchSource>) -> Self {
        self.watch = Some(WatchConfig::Sources(sources));
        self
    }

    /// Disable watching entirely, implicit sources included.
    pub fn no_watch(mut self) -> Self {
        self.watch = Some(WatchConfig::Disabled);
        self
    }

    /// Poll at `interval`.
    pub fn polling_interval(mut self, interval: impl Into<MaybeReactive<Duration>>) -> Self {
        self.polling_interval = Some(interval.into());
        self
    }

    /// Debounce executions by `delay`.
    pub fn debounce_interval(mut self, delay: impl Into<MaybeReactive<Duration>>) -> Self {
        self.debounce_interval = Some(delay.into());
        self
    }

    /// Throttle executions to one per `interval`.
    pub fn throttle_interval(mut self, interval: impl Into<MaybeReactive<Duration>>) -> Self {
        self.throttle_interval = Some(interval.into());
        self
    }

    /// Gate executions on `ready`.
    pub fn ready(mut self, ready: impl Into<MaybeReactive<bool>>) -> Self {
        self.ready = Some(ready.into());
        self
    }

    /// Transform each successful result before storing it.
    pub fn transform(mut self, transform: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Seed the `data` state.
    pub fn default_value(mut self, default: impl Fn() -> Option<T> + Send + Sync + 'static) -> Self {
        self.default_value = Some(Arc::new(default));
        self
    }
}

/// Per-request values, each individually static or reactive.
///
/// Reactive entries are resolved to their current value at execution time
/// and contribute implicit watch sources.
#[derive(Clone, Default)]
pub struct RequestOverrides {
    /// Request method. Default: GET.
    pub method: Option<MaybeReactive<Method>>,
    /// Query parameters.
    pub query: Option<MaybeReactive<QueryMap>>,
    /// Additional parameters merged under the query.
    pub params: Option<MaybeReactive<QueryMap>>,
    /// JSON request body.
    pub body: Option<MaybeReactive<Value>>,
    /// Outgoing headers.
    pub headers: Option<MaybeReactive<HeaderMap>>,
    /// Base URL joined in front of relative targets.
    pub base_url: Option<MaybeReactive<String>>,
}

impl RequestOverrides {
    /// Shallow-merge, fields set in `overrides` winning.
    pub fn merge(self, overrides: Self) -> Self {
        RequestOverrides {
            method: overrides.method.or(self.method),
            query: overrides.query.or(self.query),
            params: overrides.params.or(self.params),
            body: overrides.body.or(self.body),
            headers: overrides.headers.or(self.headers),
            base_url: overrides.base_url.or(self.base_url),
        }
    }

    /// Watch sources contributed by the reactive entries.
    pub(crate) fn sources(&self) -> Vec<WatchSource> {
        let mut sources = Vec::new();
        if let Some(method) = &self.method {
            sources.extend(method.sources());
        }
        if let Some(query) = &self.query {
            sources.extend(query.sources());
        }
        if let Some(params) = &self.params {
            sources.extend(params.sources());
        }
        if let Some(body) = &self.body {
            sources.extend(body.sources());
        }
        if let Some(headers) = &self.headers {
            sources.extend(headers.sources());
        }
        if let Some(base_url) = &self.base_url {
            sources.extend(base_url.sources());
        }
        sources
    }

    /// Resolve every entry to its current value.
    pub(crate) fn resolve(&self, url: String) -> RequestContext {
        RequestContext {
            url,
            method: self
                .method
                .as_ref()
                .map(MaybeReactive::get)
                .unwrap_or_default(),
            base_url: self.base_url.as_ref().map(MaybeReactive::get),
            query: self
                .query
                .as_ref()
                .map(MaybeReactive::get)
                .unwrap_or_default(),
            params: self
                .params
                .as_ref()
                .map(MaybeReactive::get)
                .unwrap_or_default(),
            headers: self
                .headers
                .as_ref()
                .map(MaybeReactive::get)
                .unwrap_or_default(),
            body: self.body.as_ref().map(MaybeReactive::get),
        }
    }
}

/// Options handed through to the transport layer.
#[derive(Clone, Default)]
pub struct TransportOptions {
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Response parsing mode. Default: JSON with text fallback.
    pub response_type: Option<ResponseType>,
    /// Do not map non-2xx statuses onto errors.
    pub ignore_response_error: Option<bool>,
    /// Lifecycle hooks.
    pub hooks: FetchHooks,
}

impl TransportOptions {
    /// Shallow-merge. Hook lists set at the call site replace preset hook
    /// lists wholesale; composition happens inside the composables, not in
    /// the merge.
    pub fn merge(self, overrides: Self) -> Self {
        TransportOptions {
            timeout: overrides.timeout.or(self.timeout),
            response_type: overrides.response_type.or(self.response_type),
            ignore_response_error: overrides.ignore_response_error.or(self.ignore_response_error),
            hooks: if overrides.hooks.is_empty() {
                self.hooks
            } else {
                overrides.hooks
            },
        }
    }
}

/// The full option surface of `use_fetch`: three named sub-configurations.
#[derive(Clone, Default)]
pub struct FetchOptions {
    /// When and how often to execute.
    pub orchestration: AsyncDataOptions<Value>,
    /// What to send, possibly reactive.
    pub request: RequestOverrides,
    /// Everything handed to the transport layer.
    pub transport: TransportOptions,
}

impl FetchOptions {
    /// Shallow-merge all three sub-configurations, `overrides` winning.
    pub fn merge(self, overrides: Self) -> Self {
        FetchOptions {
            orchestration: self.orchestration.merge(overrides.orchestration),
            request: self.request.merge(overrides.request),
            transport: self.transport.merge(overrides.transport),
        }
    }

    /// Set `immediate`.
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.orchestration.immediate = Some(immediate);
        self
    }

    /// Watch the given sources (in addition to implicit ones).
    pub fn watch(mut self, sources: Vec<WatchSource>) -> Self {
        self.orchestration.watch = Some(WatchConfig::Sources(sources));
        self
    }

    /// Disable watching entirely, implicit sources included.
    pub fn no_watch(mut self) -> Self {
        self.orchestration.watch = Some(WatchConfig::Disabled);
        self
    }

    /// Poll at `interval`.
    pub fn polling_interval(mut self, interval: impl Into<MaybeReactive<Duration>>) -> Self {
        self.orchestration.polling_interval = Some(interval.into());
        self
    }

    /// Debounce executions by `delay`.
    pub fn debounce_interval(mut self, delay: impl Into<MaybeReactive<Duration>>) -> Self {
        self.orchestration.debounce_interval = Some(delay.into());
        self
    }

    /// Throttle executions to one per `interval`.
    pub fn throttle_interval(mut self, interval: impl Into<MaybeReactive<Duration>>) -> Self {
        self.orchestration.throttle_interval = Some(interval.into());
        self
    }

    /// Gate executions on `ready`.
    pub fn ready(mut self, ready: impl Into<MaybeReactive<bool>>) -> Self {
        self.orchestration.ready = Some(ready.into());
        self
    }

    /// Transform each parsed response before storing it.
    pub fn transform(mut self, transform: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.orchestration.transform = Some(Arc::new(transform));
        self
    }

    /// Seed the `data` state.
    pub fn default_value(
        mut self,
        default: impl Fn() -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.orchestration.default_value = Some(Arc::new(default));
        self
    }

    /// Set the request method.
    pub fn method(mut self, method: impl Into<MaybeReactive<Method>>) -> Self {
        self.request.method = Some(method.into());
        self
    }

    /// Set the query parameters.
    pub fn query(mut self, query: impl Into<MaybeReactive<QueryMap>>) -> Self {
        self.request.query = Some(query.into());
        self
    }

    /// Set the additional parameters.
    pub fn params(mut self, params: impl Into<MaybeReactive<QueryMap>>) -> Self {
        self.request.params = Some(params.into());
        self
    }

    /// Set the JSON body.
    pub fn body(mut self, body: impl Into<MaybeReactive<Value>>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Set the outgoing headers.
    pub fn headers(mut self, headers: impl Into<MaybeReactive<HeaderMap>>) -> Self {
        self.request.headers = Some(headers.into());
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<MaybeReactive<String>>) -> Self {
        self.request.base_url = Some(base_url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = Some(timeout);
        self
    }

    /// Set the response parsing mode.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.transport.response_type = Some(response_type);
        self
    }

    /// Do not map non-2xx statuses onto errors.
    pub fn ignore_response_error(mut self, ignore: bool) -> Self {
        self.transport.ignore_response_error = Some(ignore);
        self
    }

    /// Append an `on_request` hook.
    pub fn on_request(
        mut self,
        hook: impl Fn(&mut RequestContext) -> Result<(), FetchError> + Send + Sync + 'static,
    ) -> Self {
        self.transport.hooks.on_request.push(Arc::new(hook) as OnRequest);
        self
    }

    /// Append an `on_request_error` observer.
    pub fn on_request_error(
        mut self,
        hook: impl Fn(&RequestContext, &FetchError) + Send + Sync + 'static,
    ) -> Self {
        self.transport
            .hooks
            .on_request_error
            .push(Arc::new(hook) as OnRequestError);
        self
    }

    /// Append an `on_response` hook.
    pub fn on_response(
        mut self,
        hook: impl Fn(&mut ResponseContext) -> Result<(), FetchError> + Send + Sync + 'static,
    ) -> Self {
        self.transport.hooks.on_response.push(Arc::new(hook) as OnResponse);
        self
    }

    /// Append an `on_response_error` observer.
    pub fn on_response_error(
        mut self,
        hook: impl Fn(&ResponseContext, &FetchError) + Send + Sync + 'static,
    ) -> Self {
        self.transport
            .hooks
            .on_response_error
            .push(Arc::new(hook) as OnResponseError);
        self
    }
}
