use crate::client::Method;

/// Unified error for every failure path in the crate.
///
/// The same value is stored in the reactive `error` state and carried through
/// the [`Completion`](crate::timing::Completion) returned by `execute()`, so
/// it must be cheap to clone. Callers can therefore both subscribe to the
/// error state and match on the result of a waited execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    ///
    /// The display form carries the numeric status, so
    /// `err.to_string().contains("404")` holds for a not-found response.
    #[error("{method} {url}: {status} {status_text}")]
    Status {
        /// Request method.
        method: Method,
        /// Fully resolved request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Status reason phrase as sent by the server.
        status_text: String,
    },

    /// The request never produced a response (DNS, connect, read failures).
    #[error("transport failure: {0}")]
    Transport(String),

    /// A caller-supplied request or response hook failed.
    #[error("hook failed: {0}")]
    Hook(String),

    /// Arbitrary failure raised by a producer passed to `use_async_data`.
    #[error("{0}")]
    Message(String),

    /// A filtered call was superseded before its invocation ran.
    ///
    /// Only produced when a debounce/throttle filter is configured with
    /// `reject_on_cancel`.
    #[error("cancelled before invocation")]
    Cancelled,
}

impl FetchError {
    /// Wrap an arbitrary failure message.
    pub fn message(msg: impl Into<String>) -> Self {
        FetchError::Message(msg.into())
    }

    /// HTTP status code, if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for [`FetchError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}
