use crate::reactive::{Computed, Signal, WatchSource};

/// An input that is either a plain value, a [`Signal`] or a [`Computed`].
///
/// Option fields across the crate accept `impl Into<MaybeReactive<T>>`, so a
/// call site can pass a constant where a reactive value is allowed and the
/// orchestration layer reads both uniformly through
/// [`get`](MaybeReactive::get). Reactive variants additionally expose their
/// [`sources`](MaybeReactive::sources) so they can join a watch set.
pub enum MaybeReactive<T> {
    /// Fixed value, read once per resolution.
    Value(T),
    /// Live cell; resolution reads the current value.
    Signal(Signal<T>),
    /// Derived value; resolution recomputes.
    Computed(Computed<T>),
}

impl<T: Clone> MaybeReactive<T> {
    /// Resolve to the current value.
    pub fn get(&self) -> T {
        match self {
            MaybeReactive::Value(value) => value.clone(),
            MaybeReactive::Signal(signal) => signal.get(),
            MaybeReactive::Computed(computed) => computed.get(),
        }
    }

    /// Watch sources behind this input. Empty for a plain value.
    pub fn sources(&self) -> Vec<WatchSource> {
        match self {
            MaybeReactive::Value(_) => Vec::new(),
            MaybeReactive::Signal(signal) => vec![signal.source()],
            MaybeReactive::Computed(computed) => computed.sources(),
        }
    }
}

impl<T: Clone> Clone for MaybeReactive<T> {
    fn clone(&self) -> Self {
        match self {
            MaybeReactive::Value(value) => MaybeReactive::Value(value.clone()),
            MaybeReactive::Signal(signal) => MaybeReactive::Signal(signal.clone()),
            MaybeReactive::Computed(computed) => MaybeReactive::Computed(computed.clone()),
        }
    }
}

impl<T> From<T> for MaybeReactive<T> {
    fn from(value: T) -> Self {
        MaybeReactive::Value(value)
    }
}

impl<T> From<Signal<T>> for MaybeReactive<T> {
    fn from(signal: Signal<T>) -> Self {
        MaybeReactive::Signal(signal)
    }
}

impl<T> From<Computed<T>> for MaybeReactive<T> {
    fn from(computed: Computed<T>) -> Self {
        MaybeReactive::Computed(computed)
    }
}

impl From<&str> for MaybeReactive<String> {
    fn from(value: &str) -> Self {
        MaybeReactive::Value(value.to_owned())
    }
}
