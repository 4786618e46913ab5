//! Publish event: send one message to a channel.
//!
//! Wire contract: `GET /publish/{pub}/{sub}/0/{channel}/0/{payload}` where
//! the payload is the JSON-serialized message, percent-encoded into the
//! path. With a cipher key the message is encrypted at construction, so a
//! publish that would fail to encrypt never fires. The service responds
//! with `[status_flag, description, timetoken]`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use nimbus_core::channel::ChannelSpec;
use nimbus_core::config::ClientConfig;
use nimbus_core::envelope::{
    Envelope, EnvelopeData, EnvelopeItem, EnvelopeResult, EnvelopeStatus, Operation,
    StatusCategory,
};
use nimbus_core::errors::EventError;
use nimbus_core::query::encode_component;
use nimbus_crypto::{AesCbcCryptor, Cryptor};
use nimbus_transport::HttpResponse;

use crate::event::{error_envelope, parse_array_body, Callbacks, Event, EventConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Per-call options for a publish.
#[derive(Clone, Debug)]
pub struct PublishOptions {
    channel: String,
    message: Value,
    auth_key: Option<String>,
    cipher_key: Option<String>,
    callbacks: Callbacks,
}

impl PublishOptions {
    /// Publish `message` to `channel`.
    #[must_use]
    pub fn new(channel: impl Into<String>, message: Value) -> Self {
        Self {
            channel: channel.into(),
            message,
            auth_key: None,
            cipher_key: None,
            callbacks: Callbacks::default(),
        }
    }

    /// Override the client-wide auth key for this call.
    #[must_use]
    pub fn with_auth_key(mut self, auth_key: impl Into<String>) -> Self {
        self.auth_key = Some(auth_key.into());
        self
    }

    /// Override the client-wide cipher key for this call.
    #[must_use]
    pub fn with_cipher_key(mut self, cipher_key: impl Into<String>) -> Self {
        self.cipher_key = Some(cipher_key.into());
        self
    }

    /// Register result callbacks for this call.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

/// A constructed publish, ready to fire. The payload is already encrypted
/// and serialized.
#[derive(Debug)]
pub struct Publish {
    config: EventConfig,
    callbacks: Callbacks,
    channel: ChannelSpec,
    publish_key: String,
    payload_json: String,
}

impl Publish {
    /// Build a publish event, merging per-call options over the client-wide
    /// configuration. Requires a channel and a publish key.
    pub fn new(options: PublishOptions, client: &ClientConfig) -> Result<Self, EventError> {
        let channel = ChannelSpec::new(&options.channel)?;

        let mut config = EventConfig::from_client(client);
        if let Some(auth_key) = options.auth_key {
            config.auth_key = Some(auth_key);
        }
        if let Some(cipher_key) = options.cipher_key {
            config.cipher_key = Some(cipher_key);
        }

        let publish_key = config
            .publish_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(EventError::MissingKey { key: "publish_key" })?;

        let payload = match config
            .cipher_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
        {
            Some(key) => {
                let cryptor: Arc<dyn Cryptor> = Arc::new(AesCbcCryptor::new(key));
                cryptor
                    .encrypt(&options.message)
                    .map_err(|error| EventError::Crypto {
                        message: error.to_string(),
                    })?
            }
            None => options.message,
        };

        Ok(Self {
            config,
            callbacks: options.callbacks,
            channel,
            publish_key,
            payload_json: payload.to_string(),
        })
    }
}

#[async_trait]
impl Event for Publish {
    fn operation(&self) -> Operation {
        Operation::Publish
    }

    fn config(&self) -> &EventConfig {
        &self.config
    }

    fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    fn path(&self) -> String {
        format!(
            "/publish/{}/{}/0/{}/0/{}",
            encode_component(&self.publish_key),
            encode_component(&self.config.subscribe_key),
            self.channel.encoded(),
            encode_component(&self.payload_json)
        )
    }

    fn parse_response(&self, response: &HttpResponse, request_uri: &str) -> Vec<EnvelopeItem> {
        let Some(elements) = parse_array_body(&response.body) else {
            return vec![error_envelope(
                Operation::Publish,
                StatusCategory::NonJsonResponse,
                response,
                request_uri,
                &self.config,
            )];
        };
        if response.status != 200 {
            return vec![error_envelope(
                Operation::Publish,
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
                operation: Operation::Publish,
                client_request: request_uri.to_owned(),
                server_response: response.body.clone(),
                data: EnvelopeData::Publish {
                    timetoken: elements.get(2).cloned(),
                    description: elements
                        .get(1)
                        .and_then(Value::as_str)
                        .map(str::to_owned),
                },
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

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn client_config() -> ClientConfig {
        ClientConfig::new("ps.nimbus.cloud", "sub-key")
            .unwrap()
            .with_publish_key("pub-key")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_owned(),
        }
    }

    // ── construction ────────────────────────────────────────────────

    #[test]
    fn requires_publish_key() {
        let client = ClientConfig::new("ps.nimbus.cloud", "sub-key").unwrap();
        assert_matches!(
            Publish::new(PublishOptions::new("room", json!("hi")), &client),
            Err(EventError::MissingKey { key: "publish_key" })
        );
    }

    #[test]
    fn blank_publish_key_is_missing() {
        let client = ClientConfig::new("ps.nimbus.cloud", "sub-key")
            .unwrap()
            .with_publish_key("  ");
        assert_matches!(
            Publish::new(PublishOptions::new("room", json!("hi")), &client),
            Err(EventError::MissingKey { .. })
        );
    }

    #[test]
    fn requires_channel() {
        assert_matches!(
            Publish::new(PublishOptions::new("", json!("hi")), &client_config()),
            Err(EventError::BlankChannel)
        );
    }

    // ── path assembly ───────────────────────────────────────────────

    #[test]
    fn path_carries_serialized_payload() {
        let event =
            Publish::new(PublishOptions::new("room", json!({"a": 1})), &client_config()).unwrap();
        assert_eq!(
            event.path(),
            "/publish/pub-key/sub-key/0/room/0/%7B%22a%22%3A1%7D"
        );
    }

    #[test]
    fn string_payload_keeps_its_quotes() {
        let event =
            Publish::new(PublishOptions::new("room", json!("hello")), &client_config()).unwrap();
        assert!(event.path().ends_with("/0/%22hello%22"));
    }

    #[test]
    fn cipher_key_encrypts_payload_at_construction() {
        let event = Publish::new(
            PublishOptions::new("room", json!({"text": "secret"})).with_cipher_key("enigma"),
            &client_config(),
        )
        .unwrap();

        // The path no longer contains the plaintext; the embedded payload
        // round-trips through the same cryptor.
        assert!(!event.path().contains("secret"));
        let ciphertext: Value = serde_json::from_str(&event.payload_json).unwrap();
        let decrypted = AesCbcCryptor::new("enigma").decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted, json!({"text": "secret"}));
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parses_acknowledgement() {
        let event = Publish::new(PublishOptions::new("room", json!("hi")), &client_config()).unwrap();
        let body = json!([1, "Sent", "15000000000000000"]).to_string();
        let items = event.parse_response(&response(200, &body), "https://x/y");

        assert_eq!(items.len(), 1);
        let envelope = items[0].as_success().unwrap();
        assert_eq!(envelope.result.operation, Operation::Publish);
        match &envelope.result.data {
            EnvelopeData::Publish {
                timetoken,
                description,
            } => {
                assert_eq!(timetoken.as_ref(), Some(&json!("15000000000000000")));
                assert_eq!(description.as_deref(), Some("Sent"));
            }
            other => panic!("expected publish data, got {other:?}"),
        }
    }

    #[test]
    fn remote_rejection_is_error_category() {
        let event = Publish::new(PublishOptions::new("room", json!("hi")), &client_config()).unwrap();
        let body = json!([0, "Invalid Key"]).to_string();
        let items = event.parse_response(&response(400, &body), "https://x/y");
        let envelope = items[0].as_error().unwrap();
        assert_eq!(envelope.status.category, StatusCategory::Error);
        assert_eq!(envelope.operation, Operation::Publish);
    }

    #[test]
    fn non_json_body_is_non_json_response() {
        let event = Publish::new(PublishOptions::new("room", json!("hi")), &client_config()).unwrap();
        let items = event.parse_response(&response(200, "gateway timeout"), "https://x/y");
        assert_eq!(
            items[0].as_error().unwrap().status.category,
            StatusCategory::NonJsonResponse
        );
    }
}
