//! Time event: probe the service clock.
//!
//! `GET /time/0` responds with a one-element array `[timetoken]`. No channel
//! or key beyond the base configuration is required, so construction is
//! infallible.

use async_trait::async_trait;

use nimbus_core::config::ClientConfig;
use nimbus_core::envelope::{
    Envelope, EnvelopeData, EnvelopeItem, EnvelopeResult, EnvelopeStatus, Operation,
    StatusCategory,
};
use nimbus_transport::HttpResponse;

use crate::event::{error_envelope, parse_array_body, Callbacks, Event, EventConfig};

/// A constructed server-time probe.
pub struct Time {
    config: EventConfig,
    callbacks: Callbacks,
}

impl Time {
    /// Build a time event from the client-wide configuration.
    #[must_use]
    pub fn new(callbacks: Callbacks, client: &ClientConfig) -> Self {
        Self {
            config: EventConfig::from_client(client),
            callbacks,
        }
    }
}

#[async_trait]
impl Event for Time {
    fn operation(&self) -> Operation {
        Operation::Time
    }

    fn config(&self) -> &EventConfig {
        &self.config
    }

    fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    fn path(&self) -> String {
        "/time/0".to_owned()
    }

    fn parse_response(&self, response: &HttpResponse, request_uri: &str) -> Vec<EnvelopeItem> {
        let timetoken = parse_array_body(&response.body)
            .and_then(|elements| elements.first().cloned())
            .filter(|value| !value.is_null());
        let Some(timetoken) = timetoken else {
            return vec![error_envelope(
                Operation::Time,
                StatusCategory::NonJsonResponse,
                response,
                request_uri,
                &self.config,
            )];
        };
        if response.status != 200 {
            return vec![error_envelope(
                Operation::Time,
                StatusCategory::Error,
                response,
                request_uri,
                &self.config,
            )];
        }

        vec![EnvelopeItem::Success(Envelope {
            status: EnvelopeStatus::ack(
                response.status,
                request_uri,
                &response.body,
                self.config.snapshot(),
            ),
            result: EnvelopeResult {
                code: response.status,
                operation: Operation::Time,
                client_request: request_uri.to_owned(),
                server_response: response.body.clone(),
                data: EnvelopeData::Time { timetoken },
            },
            timetoken_update: false,
            first: false,
            last: false,
        })]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
