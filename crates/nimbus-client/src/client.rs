//! Client facade: one configuration, one shared dispatcher, typed
//! operations.
//!
//! Every operation builds its event by merging per-call options over the
//! client-wide configuration, fires it through the shared dispatcher, and
//! returns the [`FireOutcome`]. Construction errors (blank channel, missing
//! key, encryption failure) surface as `Err` before anything is dispatched;
//! everything that happens after dispatch comes back inside the outcome.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use nimbus_core::config::{ClientConfig, Timeouts};
use nimbus_core::errors::EventError;
use nimbus_settings::NimbusSettings;
use nimbus_transport::{Dispatcher, HttpDispatcher, TransportConfig, TransportError};

use crate::event::{Callbacks, Event, FireOutcome};
use crate::history::{History, HistoryOptions};
use crate::publish::{Publish, PublishOptions};
use crate::time::Time;

/// The client could not be constructed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] EventError),

    /// The transport layer could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A configured Nimbus client.
///
/// Cheap to share: operations borrow the client, and the dispatcher is
/// reference-counted, so concurrent calls from several tasks only need an
/// `Arc<Client>`.
pub struct Client {
    config: ClientConfig,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Client {
    /// Build a client with its own HTTP dispatcher.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = TransportConfig {
            connect_timeout: config.timeouts.connect,
            request_timeout: config.timeouts.request,
            idle_timeout: config.timeouts.idle,
        };
        let dispatcher = Arc::new(HttpDispatcher::new(&transport)?);
        info!(origin = %config.origin, secure = config.secure, "client ready");
        Ok(Self { config, dispatcher })
    }

    /// Build a client over an existing dispatcher.
    #[must_use]
    pub fn with_dispatcher(config: ClientConfig, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Build a client from loaded settings.
    ///
    /// A blank settings UUID gets a generated v4 identity so the service
    /// can attribute requests to this client instance.
    pub fn from_settings(settings: &NimbusSettings) -> Result<Self, ClientError> {
        Self::new(client_config_from_settings(settings)?)
    }

    /// The client-wide configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch stored messages for a channel.
    pub async fn history(&self, options: HistoryOptions) -> Result<FireOutcome, EventError> {
        let event = History::new(options, &self.config)?;
        Ok(event.fire(self.dispatcher.as_ref()).await)
    }

    /// Publish one message to a channel.
    pub async fn publish(&self, options: PublishOptions) -> Result<FireOutcome, EventError> {
        let event = Publish::new(options, &self.config)?;
        Ok(event.fire(self.dispatcher.as_ref()).await)
    }

    /// Probe the service clock.
    pub async fn time(&self, callbacks: Callbacks) -> FireOutcome {
        Time::new(callbacks, &self.config)
            .fire(self.dispatcher.as_ref())
            .await
    }

    /// Abort in-flight events; each observes a stop through its own reply
    /// channel.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Convert loaded settings into a validated client configuration.
pub fn client_config_from_settings(settings: &NimbusSettings) -> Result<ClientConfig, EventError> {
    let mut config = ClientConfig::new(settings.origin.clone(), settings.subscribe_key.clone())?
        .with_secure(settings.secure)
        .with_timeouts(Timeouts {
            connect: std::time::Duration::from_millis(settings.timeouts.connect_ms),
            request: std::time::Duration::from_millis(settings.timeouts.request_ms),
            idle: std::time::Duration::from_millis(settings.timeouts.idle_ms),
        });
    config.publish_key = optional(&settings.publish_key);
    config.secret_key = optional(&settings.secret_key);
    config.auth_key = optional(&settings.auth_key);
    config.cipher_key = optional(&settings.cipher_key);
    config.uuid = Some(
        optional(&settings.uuid).unwrap_or_else(|| Uuid::new_v4().to_string()),
    );
    Ok(config)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use nimbus_core::envelope::{EnvelopeData, Operation, StatusCategory};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// A client pointed at a local mock server over plain HTTP.
    fn client_for(server: &MockServer) -> Client {
        let origin = server.uri().trim_start_matches("http://").to_owned();
        let config = ClientConfig::new(origin, "sub-key")
            .unwrap()
            .with_publish_key("pub-key")
            .with_secure(false);
        Client::new(config).unwrap()
    }

    // ── history ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn history_end_to_end() {
        let server = MockServer::start().await;
        let body = json!([["m1", "m2"], 14000000000000000u64, 15000000000000000u64]);
        Mock::given(method("GET"))
            .and(path("/v2/history/sub-key/sub-key/channel/room"))
            .and(query_param("count", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in_callback = Arc::clone(&hits);
        let callbacks = Callbacks::new().with_success(move |_| {
            let _ = hits_in_callback.fetch_add(1, Ordering::SeqCst);
        });

        let client = client_for(&server);
        let outcome = client
            .history(
                HistoryOptions::channel("room")
                    .with_count(2)
                    .with_callbacks(callbacks),
            )
            .await
            .unwrap();

        let envelope = outcome.envelopes()[0].as_success().unwrap();
        assert_matches!(&envelope.result.data, EnvelopeData::History { messages, .. } => {
            assert_eq!(messages, &[json!("m1"), json!("m2")]);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn history_error_status_becomes_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!([0, "Forbidden"])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client.history(HistoryOptions::channel("room")).await.unwrap();
        let envelope = outcome.envelopes()[0].as_error().unwrap();
        assert_eq!(envelope.status.category, StatusCategory::Error);
        assert_eq!(envelope.operation, Operation::History);
    }

    #[tokio::test]
    async fn history_construction_error_never_dispatches() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let result = client.history(HistoryOptions::channel("  ")).await;
        assert_matches!(result, Err(EventError::BlankChannel));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    // ── publish ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn publish_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/publish/pub-key/sub-key/0/room/0/%22hi%22"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([1, "Sent", "15000000000000000"])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client
            .publish(PublishOptions::new("room", json!("hi")))
            .await
            .unwrap();

        let envelope = outcome.envelopes()[0].as_success().unwrap();
        assert_matches!(&envelope.result.data, EnvelopeData::Publish { timetoken, description } => {
            assert_eq!(timetoken.as_ref(), Some(&json!("15000000000000000")));
            assert_eq!(description.as_deref(), Some("Sent"));
        });
    }

    #[tokio::test]
    async fn publish_without_key_is_rejected() {
        let server = MockServer::start().await;
        let origin = server.uri().trim_start_matches("http://").to_owned();
        let config = ClientConfig::new(origin, "sub-key").unwrap().with_secure(false);
        let client = Client::new(config).unwrap();

        let result = client.publish(PublishOptions::new("room", json!("hi"))).await;
        assert_matches!(result, Err(EventError::MissingKey { key: "publish_key" }));
    }

    // ── time ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn time_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time/0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([15000000000000000u64])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client.time(Callbacks::new()).await;
        let envelope = outcome.envelopes()[0].as_success().unwrap();
        assert_matches!(&envelope.result.data, EnvelopeData::Time { timetoken } => {
            assert_eq!(timetoken, &json!(15000000000000000u64));
        });
    }

    // ── shutdown ────────────────────────────────────────────────────

    #[tokio::test]
    async fn shutdown_stops_subsequent_events() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        client.shutdown();

        let outcome = client.time(Callbacks::new()).await;
        assert!(outcome.is_stopped());
    }

    // ── settings conversion ─────────────────────────────────────────

    #[test]
    fn settings_conversion_fills_optionals() {
        let settings = NimbusSettings {
            subscribe_key: "sub-abc".into(),
            publish_key: "pub-abc".into(),
            auth_key: "  ".into(),
            ..NimbusSettings::default()
        };
        let config = client_config_from_settings(&settings).unwrap();
        assert_eq!(config.subscribe_key, "sub-abc");
        assert_eq!(config.publish_key.as_deref(), Some("pub-abc"));
        assert!(config.auth_key.is_none());
        // Blank settings UUID gets a generated identity.
        assert!(!config.uuid.as_deref().unwrap().is_empty());
    }

    #[test]
    fn settings_conversion_requires_subscribe_key() {
        let settings = NimbusSettings::default();
        assert_matches!(
            client_config_from_settings(&settings),
            Err(EventError::InvalidConfig { .. })
        );
    }

    #[test]
    fn settings_timeouts_are_converted() {
        let mut settings = NimbusSettings {
            subscribe_key: "sub-abc".into(),
            ..NimbusSettings::default()
        };
        settings.timeouts.connect_ms = 5000;
        let config = client_config_from_settings(&settings).unwrap();
        assert_eq!(config.timeouts.connect, std::time::Duration::from_millis(5000));
        assert_eq!(config.timeouts.request, std::time::Duration::from_millis(310_000));
    }
}
