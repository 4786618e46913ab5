//! Client-wide configuration.
//!
//! [`ClientConfig`] is an explicit struct with named, typed fields and a
//! validating constructor; per-call options are merged over it when an
//! event is built. [`ConfigSnapshot`] is the subset echoed into envelope
//! statuses so a callback can see the effective configuration of its call.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::EventError;

/// Whether a string is empty or whitespace-only.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Connect / request / pool-idle timeouts handed to the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect timeout.
    pub connect: Duration,
    /// Whole-request timeout (covers the body read).
    pub request: Duration,
    /// Idle timeout for pooled connections.
    pub idle: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(310),
            idle: Duration::from_secs(300),
        }
    }
}

/// Client-wide configuration; the defaults every event starts from.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Origin host of the service, e.g. `ps.nimbus.cloud`.
    pub origin: String,
    /// Use `https` when true, `http` otherwise.
    pub secure: bool,
    /// Subscribe key (required for every operation).
    pub subscribe_key: String,
    /// Publish key (required only for publish).
    pub publish_key: Option<String>,
    /// Secret key for request signing.
    pub secret_key: Option<String>,
    /// Access-manager auth key, sent as the `auth` parameter when non-blank.
    pub auth_key: Option<String>,
    /// Caller UUID, sent as the `uuid` parameter when non-blank.
    pub uuid: Option<String>,
    /// Cipher key enabling payload encryption/decryption.
    pub cipher_key: Option<String>,
    /// Transport timeouts.
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Create a configuration, validating that origin and subscribe key are
    /// non-blank.
    pub fn new(
        origin: impl Into<String>,
        subscribe_key: impl Into<String>,
    ) -> Result<Self, EventError> {
        let origin = origin.into();
        let subscribe_key = subscribe_key.into();
        if is_blank(&origin) {
            return Err(EventError::invalid_config("origin is blank"));
        }
        if is_blank(&subscribe_key) {
            return Err(EventError::invalid_config("subscribe key is blank"));
        }
        Ok(Self {
            origin,
            secure: true,
            subscribe_key,
            publish_key: None,
            secret_key: None,
            auth_key: None,
            uuid: None,
            cipher_key: None,
            timeouts: Timeouts::default(),
        })
    }

    /// Set the publish key.
    #[must_use]
    pub fn with_publish_key(mut self, key: impl Into<String>) -> Self {
        self.publish_key = Some(key.into());
        self
    }

    /// Set the secret key.
    #[must_use]
    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = Some(key.into());
        self
    }

    /// Set the auth key.
    #[must_use]
    pub fn with_auth_key(mut self, key: impl Into<String>) -> Self {
        self.auth_key = Some(key.into());
        self
    }

    /// Set the caller UUID.
    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    /// Set the cipher key.
    #[must_use]
    pub fn with_cipher_key(mut self, key: impl Into<String>) -> Self {
        self.cipher_key = Some(key.into());
        self
    }

    /// Choose between `https` (default) and `http`.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Override the transport timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// The effective configuration echoed into every envelope status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    /// Origin host the request was sent to.
    pub origin: String,
    /// Whether the request used `https`.
    pub secure: bool,
    /// Caller UUID, if one was set.
    pub uuid: Option<String>,
    /// Auth key, if one was set.
    pub auth_key: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
