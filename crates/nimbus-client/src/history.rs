//! History event: fetch stored messages for a channel.
//!
//! Wire contract: `GET /v2/history/sub-key/{sub}/channel/{channel}` with the
//! optional paging parameters, responding with a 1–3 element array
//! `[messages, start, end]`. With `include_token` each stored message is a
//! `{message, timetoken}` pair; only the message bodies land in the
//! envelope. With a cipher key every message body is decrypted before
//! inclusion, and the first body that fails to decrypt converts the whole
//! response into a single error envelope.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

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

/// Per-call options for a history fetch.
#[derive(Clone, Debug, Default)]
pub struct HistoryOptions {
    channels: Vec<String>,
    start: Option<u64>,
    end: Option<u64>,
    count: Option<u32>,
    reverse: bool,
    include_token: bool,
    auth_key: Option<String>,
    cipher_key: Option<String>,
    callbacks: Callbacks,
}

impl HistoryOptions {
    /// History for a single channel.
    #[must_use]
    pub fn channel(name: impl Into<String>) -> Self {
        Self {
            channels: vec![name.into()],
            ..Self::default()
        }
    }

    /// History for several channels at once.
    #[must_use]
    pub fn channels<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Lower paging cursor.
    #[must_use]
    pub fn with_start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }

    /// Upper paging cursor.
    #[must_use]
    pub fn with_end(mut self, end: u64) -> Self {
        self.end = Some(end);
        self
    }

    /// Maximum number of messages to return.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Return oldest messages first.
    #[must_use]
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Ask the service for per-message timetokens.
    #[must_use]
    pub fn with_include_token(mut self, include_token: bool) -> Self {
        self.include_token = include_token;
        self
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

/// A constructed history fetch, ready to fire.
pub struct History {
    config: EventConfig,
    callbacks: Callbacks,
    channel: ChannelSpec,
    start: Option<u64>,
    end: Option<u64>,
    count: Option<u32>,
    reverse: bool,
    include_token: bool,
    cryptor: Option<Arc<dyn Cryptor>>,
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("config", &self.config)
            .field("callbacks", &self.callbacks)
            .field("channel", &self.channel)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("count", &self.count)
            .field("reverse", &self.reverse)
            .field("include_token", &self.include_token)
            .field("cryptor", &self.cryptor.is_some())
            .finish()
    }
}

impl History {
    /// Build a history event, merging per-call options over the client-wide
    /// configuration.
    pub fn new(options: HistoryOptions, client: &ClientConfig) -> Result<Self, EventError> {
        let channel = ChannelSpec::from_names(&options.channels)?;

        let mut config = EventConfig::from_client(client);
        if let Some(auth_key) = options.auth_key {
            config.auth_key = Some(auth_key);
        }
        if let Some(cipher_key) = options.cipher_key {
            config.cipher_key = Some(cipher_key);
        }

        let cryptor: Option<Arc<dyn Cryptor>> = config
            .cipher_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .map(|key| Arc::new(AesCbcCryptor::new(key)) as Arc<dyn Cryptor>);

        Ok(Self {
            config,
            callbacks: options.callbacks,
            channel,
            start: options.start,
            end: options.end,
            count: options.count,
            reverse: options.reverse,
            include_token: options.include_token,
            cryptor,
        })
    }

    /// Extract message bodies from the first response element, unwrapping
    /// `{message, timetoken}` pairs and decrypting when configured.
    fn extract_messages(&self, raw: &[Value]) -> Result<Vec<Value>, ()> {
        let mut messages = Vec::with_capacity(raw.len());
        for entry in raw {
            let body = if self.include_token {
                entry.get("message").cloned().unwrap_or_else(|| entry.clone())
            } else {
                entry.clone()
            };
            let body = match &self.cryptor {
                Some(cryptor) => cryptor.decrypt(&body).map_err(|error| {
                    warn!(channel = %self.channel, %error, "history message decryption failed");
                })?,
                None => body,
            };
            messages.push(body);
        }
        Ok(messages)
    }
}

#[async_trait]
impl Event for History {
    fn operation(&self) -> Operation {
        Operation::History
    }

    fn config(&self) -> &EventConfig {
        &self.config
    }

    fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    fn path(&self) -> String {
        format!(
            "/v2/history/sub-key/{}/channel/{}",
            encode_component(&self.config.subscribe_key),
            self.channel.encoded()
        )
    }

    fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("start".to_owned(), start.to_string()));
        }
        if let Some(end) = self.end {
            params.push(("end".to_owned(), end.to_string()));
        }
        if let Some(count) = self.count {
            params.push(("count".to_owned(), count.to_string()));
        }
        if self.reverse {
            params.push(("reverse".to_owned(), "true".to_owned()));
        }
        if self.include_token {
            params.push(("include_token".to_owned(), "true".to_owned()));
        }
        params
    }

    fn parse_response(&self, response: &HttpResponse, request_uri: &str) -> Vec<EnvelopeItem> {
        let Some(elements) = parse_array_body(&response.body) else {
            return vec![error_envelope(
                Operation::History,
                StatusCategory::NonJsonResponse,
                response,
                request_uri,
                &self.config,
            )];
        };
        if response.status != 200 {
            return vec![error_envelope(
                Operation::History,
                StatusCategory::Error,
                response,
                request_uri,
                &self.config,
            )];
        }

        // First element is the stored-message list; a present non-array
        // first element is structurally not a history response.
        let messages = match elements.first() {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(raw)) => match self.extract_messages(raw) {
                Ok(messages) => messages,
                Err(()) => {
                    return vec![error_envelope(
                        Operation::History,
                        StatusCategory::Error,
                        response,
                        request_uri,
                        &self.config,
                    )]
                }
            },
            Some(_) => {
                return vec![error_envelope(
                    Operation::History,
                    StatusCategory::NonJsonResponse,
                    response,
                    request_uri,
                    &self.config,
                )]
            }
        };

        vec![EnvelopeItem::Success(Envelope {
            status: EnvelopeStatus::ack(
                response.status,
                request_uri,
                &response.body,
                self.config.snapshot(),
            ),
            result: EnvelopeResult {
                code: response.status,
                operation: Operation::History,
                client_request: request_uri.to_owned(),
                server_response: response.body.clone(),
                data: EnvelopeData::History {
                    messages,
                    start: elements.get(1).cloned(),
                    end: elements.get(2).cloned(),
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
