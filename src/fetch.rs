//! HTTP specialization of the async-data core.
//!
//! `use_fetch` supplies the core with a producer that resolves the reactive
//! request target and per-request overrides at call time and runs the
//! result through the transport layer. The resolved target and every
//! reactive override join the watch set, so changing any of them refetches.

use crate::async_data::{create_async_data, AsyncData};
use crate::client::HttpClient;
use crate::options::{FetchOptions, WatchConfig};
use crate::reactive::MaybeReactive;
use crate::request;
use serde_json::Value;
use std::sync::Arc;

/// Request state produced by `use_fetch`: the async-data state machine over
/// parsed JSON payloads.
pub type FetchData = AsyncData<Value>;

/// A fetch factory: an HTTP client plus an immutable default-option
/// snapshot.
///
/// Deriving a preset with [`create`](FetchPreset::create) merges new
/// defaults over the existing ones without touching the parent; call-site
/// options passed to [`fetch`](FetchPreset::fetch) take precedence over
/// every preset layer.
///
/// # Example
///
/// ```ignore
/// let api = FetchPreset::new(client)
///     .create(FetchOptions::default().base_url("http://localhost:3000"));
/// let lazy = api.create(FetchOptions::default().immediate(false));
///
/// let users = lazy.fetch("users", FetchOptions::default());
/// users.execute().wait()?;
/// ```
pub struct FetchPreset {
    client: Arc<dyn HttpClient>,
    defaults: FetchOptions,
}

impl FetchPreset {
    /// Preset over `client` with empty defaults.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        FetchPreset {
            client,
            defaults: FetchOptions::default(),
        }
    }

    /// Derive a preset with additional defaults.
    pub fn create(&self, defaults: FetchOptions) -> Self {
        FetchPreset {
            client: self.client.clone(),
            defaults: self.defaults.clone().merge(defaults),
        }
    }

    /// The transport this preset dispatches through.
    pub fn client(&self) -> Arc<dyn HttpClient> {
        self.client.clone()
    }

    /// Start a fetch call site for `target`.
    ///
    /// `target` may be a plain string, a [`Signal`](crate::reactive::Signal)
    /// or a [`Computed`](crate::reactive::Computed); reactive targets
    /// trigger a refetch on change.
    pub fn fetch(
        &self,
        target: impl Into<MaybeReactive<String>>,
        options: FetchOptions,
    ) -> FetchData {
        let options = self.defaults.clone().merge(options);
        let target: MaybeReactive<String> = target.into();

        let mut orchestration = options.orchestration;
        orchestration.watch = Some(match orchestration.watch.unwrap_or_default() {
            WatchConfig::Disabled => WatchConfig::Disabled,
            WatchConfig::Default => {
                let mut sources = target.sources();
                sources.extend(options.request.sources());
                WatchConfig::Sources(sources)
            }
            WatchConfig::Sources(user) => {
                let mut sources = target.sources();
                sources.extend(options.request.sources());
                sources.extend(user);
                WatchConfig::Sources(sources)
            }
        });

        let client = self.client.clone();
        let overrides = options.request;
        let transport = options.transport;
        let producer = move || {
            let ctx = overrides.resolve(target.get());
            request::perform(client.as_ref(), ctx, &transport)
        };

        create_async_data(Arc::new(producer), orchestration)
    }
}

impl Clone for FetchPreset {
    fn clone(&self) -> Self {
        FetchPreset {
            client: self.client.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

#[cfg(feature = "ureq")]
mod default_client {
    use super::*;
    use crate::client::UreqClient;
    use std::sync::OnceLock;

    /// Process-wide default transport shared by the module-level
    /// conveniences. Read-only after construction.
    pub(crate) fn shared_client() -> Arc<dyn HttpClient> {
        static CLIENT: OnceLock<Arc<UreqClient>> = OnceLock::new();
        CLIENT.get_or_init(|| Arc::new(UreqClient::default())).clone()
    }

    impl Default for FetchPreset {
        fn default() -> Self {
            FetchPreset::new(shared_client())
        }
    }
}

/// Fetch `target` through the shared default client.
///
/// Equivalent to `FetchPreset::default().fetch(target, options)`.
#[cfg(feature = "ureq")]
pub fn use_fetch(target: impl Into<MaybeReactive<String>>, options: FetchOptions) -> FetchData {
    FetchPreset::default().fetch(target, options)
}
