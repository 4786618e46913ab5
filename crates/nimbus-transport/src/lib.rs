//! # nimbus-transport
//!
//! Connection dispatcher for the Nimbus pub/sub client.
//!
//! Events hand a built [`HttpRequest`] plus a fresh single-consumer reply
//! channel to a [`Dispatcher`]; the dispatcher performs the HTTP call
//! asynchronously and delivers exactly one [`Reply`] — either the raw
//! [`HttpResponse`] or a [`Stop`] — back through that channel. Reply
//! isolation is structural: every fired event owns its own channel, so one
//! event's response can never reach another event's waiter.

#![deny(unsafe_code)]

mod http;

pub use http::{HttpDispatcher, TransportConfig, TransportError};

use std::fmt;
use std::time::Duration;

use tokio::sync::oneshot;

/// A built outbound request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// Fully assembled request URI.
    pub url: String,
    /// Per-request deadline covering the body read; `None` uses the
    /// dispatcher's default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// A GET request for the given URI.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    /// Set the per-request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The raw outcome of one HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, decoded as text.
    pub body: String,
}

/// Cancellation sentinel delivered instead of a response.
///
/// Terminal: a fired event that receives a `Stop` returns it directly
/// without parsing or callbacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stop {
    /// Human-readable reason the exchange was abandoned.
    pub reason: String,
}

impl Stop {
    /// A stop with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stopped: {}", self.reason)
    }
}

/// The one message delivered per dispatched request.
#[derive(Clone, Debug)]
pub enum Reply {
    /// The HTTP exchange completed; any status code counts as a response.
    Response(HttpResponse),
    /// The exchange was abandoned before a response arrived.
    Stop(Stop),
}

/// Shared connection layer used by all in-flight events.
///
/// `dispatch` is fire-and-forget: the implementation must eventually send
/// exactly one [`Reply`] to `reply_to`, whatever happens to the underlying
/// connection.
pub trait Dispatcher: Send + Sync {
    /// Perform `request` asynchronously, delivering the outcome to
    /// `reply_to`.
    fn dispatch(&self, request: HttpRequest, reply_to: oneshot::Sender<Reply>);

    /// Abort in-flight requests; they observe a [`Stop`].
    fn shutdown(&self) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
