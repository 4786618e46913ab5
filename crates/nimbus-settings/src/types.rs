//! Settings schema.

use serde::{Deserialize, Serialize};

/// Per-stage HTTP timeouts, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutSettings {
    /// TCP connect timeout.
    pub connect_ms: u64,
    /// Whole-request timeout, sized for long-poll style requests.
    pub request_ms: u64,
    /// Idle timeout for pooled connections.
    pub idle_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            connect_ms: 10_000,
            request_ms: 310_000,
            idle_ms: 300_000,
        }
    }
}

/// Client-wide defaults.
///
/// Individual operations may override `auth_key` and `cipher_key` per call;
/// everything else is fixed for the client's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NimbusSettings {
    /// Service origin host, without scheme.
    pub origin: String,
    /// Use HTTPS when true.
    pub secure: bool,
    /// Subscribe key; required by every operation.
    pub subscribe_key: String,
    /// Publish key; required only for publish.
    pub publish_key: String,
    /// Secret key, reserved for signed operations.
    pub secret_key: String,
    /// Access-control token sent as `auth` when non-blank.
    pub auth_key: String,
    /// Client instance identifier sent as `uuid` when non-blank.
    pub uuid: String,
    /// Cipher key enabling payload encryption when non-blank.
    pub cipher_key: String,
    /// HTTP timeouts.
    pub timeouts: TimeoutSettings,
}

impl Default for NimbusSettings {
    fn default() -> Self {
        Self {
            origin: "ps.nimbus.cloud".to_string(),
            secure: true,
            subscribe_key: String::new(),
            publish_key: String::new(),
            secret_key: String::new(),
            auth_key: String::new(),
            uuid: String::new(),
            cipher_key: String::new(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
