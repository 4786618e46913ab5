//! Error hierarchy for event construction and configuration.
//!
//! Protocol-level failures (non-JSON bodies, remote error statuses) are
//! *data* — they become [`crate::envelope::ErrorEnvelope`]s, not `Err`
//! values. [`EventError`] covers only what prevents an event from being
//! constructed in the first place.

use thiserror::Error;

/// An event could not be constructed from the given configuration.
#[derive(Debug, Error)]
pub enum EventError {
    /// The channel specifier was blank after normalization.
    #[error("channel specifier is blank")]
    BlankChannel,

    /// A key required by the operation was absent or blank.
    #[error("missing required key: {key}")]
    MissingKey {
        /// Name of the missing key.
        key: &'static str,
    },

    /// Client-wide configuration failed validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong.
        message: String,
    },

    /// The payload cipher rejected the message.
    #[error("payload encryption failed: {message}")]
    Crypto {
        /// Cipher error description.
        message: String,
    },
}

impl EventError {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BlankChannel => "BLANK_CHANNEL",
            Self::MissingKey { .. } => "MISSING_KEY",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::Crypto { .. } => "CRYPTO_ERROR",
        }
    }

    /// Create an invalid-configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
