//! Event lifecycle: fire → dispatch → correlate → parse → callbacks.
//!
//! [`Event`] is the capability every concrete event implements. The provided
//! [`Event::fire`] drives the whole exchange: it builds the request URI,
//! hands the request and a fresh reply channel to the dispatcher, suspends on
//! that one channel, then classifies the reply. A [`Stop`] terminates the
//! event immediately with no parsing and no callbacks; a response is parsed
//! into an ordered envelope batch, batch bounds are marked, and callbacks run
//! synchronously on the caller's task in batch order.
//!
//! Protocol failures never cross the `fire` boundary as `Err` values; they
//! come back as error envelopes inside the delivered batch.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use nimbus_core::config::{ClientConfig, ConfigSnapshot, Timeouts};
use nimbus_core::envelope::{
    mark_batch_bounds, Envelope, EnvelopeItem, EnvelopeStatus, ErrorEnvelope, Operation,
    StatusCategory,
};
use nimbus_core::query::to_query_string;
use nimbus_transport::{Dispatcher, HttpRequest, HttpResponse, Reply, Stop};

/// SDK identity sent as the `pnsdk` parameter on every request.
pub const SDK_IDENT: &str = concat!("Nimbus-Rust/", env!("CARGO_PKG_VERSION"));

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ─────────────────────────────────────────────────────────────────────────────
// Callbacks
// ─────────────────────────────────────────────────────────────────────────────

/// User-supplied result sinks: two independent slots.
///
/// Success and error are mutually exclusive per envelope; a consumer that
/// registers only one slot silently misses the other class of outcome. That
/// split is part of the contract, so both slots stay optional and
/// independent.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub(crate) on_success: Option<Arc<dyn Fn(&Envelope) + Send + Sync>>,
    pub(crate) on_error: Option<Arc<dyn Fn(&ErrorEnvelope) + Send + Sync>>,
}

impl Callbacks {
    /// No callbacks registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the success callback.
    #[must_use]
    pub fn with_success(mut self, callback: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Register the error callback.
    #[must_use]
    pub fn with_error(
        mut self,
        callback: impl Fn(&ErrorEnvelope) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Invoke callbacks for a delivered batch, in batch order.
///
/// Timetoken-only envelopes are suppressed from the success slot.
pub(crate) fn deliver(callbacks: &Callbacks, items: &[EnvelopeItem]) {
    for item in items {
        match item {
            EnvelopeItem::Success(envelope) => {
                if envelope.timetoken_update {
                    continue;
                }
                if let Some(on_success) = &callbacks.on_success {
                    on_success(envelope);
                }
            }
            EnvelopeItem::Error(envelope) => {
                if let Some(on_error) = &callbacks.on_error {
                    on_error(envelope);
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventConfig — effective per-call configuration
// ─────────────────────────────────────────────────────────────────────────────

/// The effective configuration of one event: client-wide values with any
/// per-call overrides already merged in.
#[derive(Clone, Debug, PartialEq)]
pub struct EventConfig {
    /// Origin host.
    pub origin: String,
    /// `https` when true.
    pub secure: bool,
    /// Subscribe key.
    pub subscribe_key: String,
    /// Publish key, if configured.
    pub publish_key: Option<String>,
    /// Effective auth key for this call.
    pub auth_key: Option<String>,
    /// Caller UUID.
    pub uuid: Option<String>,
    /// Effective cipher key for this call.
    pub cipher_key: Option<String>,
    /// Transport timeouts.
    pub timeouts: Timeouts,
}

impl EventConfig {
    /// Start from the client-wide configuration.
    #[must_use]
    pub fn from_client(config: &ClientConfig) -> Self {
        Self {
            origin: config.origin.clone(),
            secure: config.secure,
            subscribe_key: config.subscribe_key.clone(),
            publish_key: config.publish_key.clone(),
            auth_key: config.auth_key.clone(),
            uuid: config.uuid.clone(),
            cipher_key: config.cipher_key.clone(),
            timeouts: config.timeouts,
        }
    }

    /// The subset echoed into envelope statuses.
    #[must_use]
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            origin: self.origin.clone(),
            secure: self.secure,
            uuid: self.uuid.clone(),
            auth_key: self.auth_key.clone(),
        }
    }

    /// Base query parameters shared by every operation.
    ///
    /// `pnsdk` is always present; `uuid` and `auth` only when non-blank.
    pub(crate) fn base_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("pnsdk".to_owned(), SDK_IDENT.to_owned())];
        if let Some(uuid) = self.uuid.as_deref().filter(|v| !is_blank(v)) {
            params.push(("uuid".to_owned(), uuid.to_owned()));
        }
        if let Some(auth) = self.auth_key.as_deref().filter(|v| !is_blank(v)) {
            params.push(("auth".to_owned(), auth.to_owned()));
        }
        params
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FireOutcome
// ─────────────────────────────────────────────────────────────────────────────

/// What `fire()` returns: the parsed envelope batch, or the cancellation
/// sentinel when the exchange was abandoned before a response arrived.
#[derive(Debug)]
pub enum FireOutcome {
    /// The response was parsed and callbacks ran; the batch in order.
    Delivered(Vec<EnvelopeItem>),
    /// The exchange was cancelled; no parsing, no callbacks.
    Stopped(Stop),
}

impl FireOutcome {
    /// The delivered batch; empty when stopped.
    #[must_use]
    pub fn envelopes(&self) -> &[EnvelopeItem] {
        match self {
            Self::Delivered(items) => items,
            Self::Stopped(_) => &[],
        }
    }

    /// Whether the event was cancelled before a response arrived.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event trait
// ─────────────────────────────────────────────────────────────────────────────

/// One dispatchable event.
///
/// Implementors supply the operation tag, effective configuration, request
/// path/params, and the response parser; `request_uri` and `fire` are
/// provided and identical for every event.
#[async_trait]
pub trait Event: Send + Sync {
    /// Operation tag of this event.
    fn operation(&self) -> Operation;

    /// Effective configuration of this call.
    fn config(&self) -> &EventConfig;

    /// Registered callbacks.
    fn callbacks(&self) -> &Callbacks;

    /// Request path, starting with `/`.
    fn path(&self) -> String;

    /// Operation-specific query parameters, appended after the base params.
    fn query_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Expand one raw response into an ordered envelope batch.
    fn parse_response(&self, response: &HttpResponse, request_uri: &str) -> Vec<EnvelopeItem>;

    /// Post-callback hook; runs after delivery, before `fire` returns.
    fn finalize(&self, _items: &[EnvelopeItem]) {}

    /// The full request URI. Pure: building it twice yields the same string.
    fn request_uri(&self) -> String {
        let config = self.config();
        let scheme = if config.secure { "https" } else { "http" };
        let mut params = config.base_params();
        params.extend(self.query_params());
        format!(
            "{scheme}://{}{}?{}",
            config.origin,
            self.path(),
            to_query_string(&params)
        )
    }

    /// Drive the full lifecycle of this event through `dispatcher`.
    async fn fire(&self, dispatcher: &dyn Dispatcher) -> FireOutcome {
        let uri = self.request_uri();
        debug!(operation = %self.operation(), uri = %uri, "firing event");

        let (reply_to, reply) = oneshot::channel();
        dispatcher.dispatch(
            HttpRequest::get(uri.clone()).with_timeout(self.config().timeouts.request),
            reply_to,
        );

        // A dropped sender means the dispatcher abandoned the exchange;
        // treat it like any other cancellation.
        let reply = reply
            .await
            .unwrap_or_else(|_| Reply::Stop(Stop::new("reply channel closed")));

        match reply {
            Reply::Stop(stop) => {
                debug!(operation = %self.operation(), reason = %stop.reason, "event stopped");
                FireOutcome::Stopped(stop)
            }
            Reply::Response(response) => {
                let mut items = self.parse_response(&response, &uri);
                mark_batch_bounds(&mut items);
                deliver(self.callbacks(), &items);
                self.finalize(&items);
                FireOutcome::Delivered(items)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a response body as a top-level JSON array.
///
/// Anything else — invalid JSON or a non-array top level — is structurally
/// not a service response.
pub(crate) fn parse_array_body(body: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(elements)) => Some(elements),
        Ok(_) | Err(_) => None,
    }
}

/// Build a single-item error envelope for a failed exchange.
pub(crate) fn error_envelope(
    operation: Operation,
    category: StatusCategory,
    response: &HttpResponse,
    request_uri: &str,
    config: &EventConfig,
) -> EnvelopeItem {
    warn!(
        operation = %operation,
        category = %category,
        status = response.status,
        "response classified as error"
    );
    EnvelopeItem::Error(ErrorEnvelope {
        status: EnvelopeStatus::failed(
            category,
            response.status,
            request_uri,
            &response.body,
            config.snapshot(),
        ),
        operation,
        first: false,
        last: false,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
