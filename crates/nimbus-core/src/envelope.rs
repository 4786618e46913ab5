//! Envelope data model: the structured result of one fired event.
//!
//! One raw response expands into an ordered batch of envelopes. History,
//! publish, and time each produce exactly one; batch-capable operations may
//! produce many, so the first and last items of a batch carry boolean
//! markers for consumers that need the bounds without scanning the list.
//!
//! The field names and category strings here are wire-stable toward
//! application callbacks — renaming them is a breaking change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ConfigSnapshot;

// ─────────────────────────────────────────────────────────────────────────────
// Operation / StatusCategory — closed tag sets
// ─────────────────────────────────────────────────────────────────────────────

/// Operation tag identifying the event kind that produced an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Fetch stored messages for a channel.
    History,
    /// Publish one message to a channel.
    Publish,
    /// Probe the service clock for a timetoken.
    Time,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::History => write!(f, "history"),
            Self::Publish => write!(f, "publish"),
            Self::Time => write!(f, "time"),
        }
    }
}

/// Status category of an envelope; a closed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCategory {
    /// The request was acknowledged and produced data.
    #[serde(rename = "ack")]
    Ack,
    /// The remote reported a failure (parseable body, non-200 status).
    #[serde(rename = "error")]
    Error,
    /// The response body failed structural parsing.
    #[serde(rename = "non_json_response")]
    NonJsonResponse,
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ack => write!(f, "ack"),
            Self::Error => write!(f, "error"),
            Self::NonJsonResponse => write!(f, "non_json_response"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Status / result
// ─────────────────────────────────────────────────────────────────────────────

/// Status metadata shared by success and error envelopes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeStatus {
    /// HTTP status code of the response.
    pub code: u16,
    /// Status category.
    pub category: StatusCategory,
    /// The request URI that produced this envelope.
    pub client_request: String,
    /// The raw response body.
    pub server_response: String,
    /// Effective per-call configuration.
    pub config: ConfigSnapshot,
    /// Whether this envelope represents a failure.
    pub error: bool,
    /// Whether the request was retried automatically before this result.
    pub auto_retried: bool,
}

impl EnvelopeStatus {
    /// Status for an acknowledged response.
    #[must_use]
    pub fn ack(code: u16, request: &str, response: &str, config: ConfigSnapshot) -> Self {
        Self {
            code,
            category: StatusCategory::Ack,
            client_request: request.to_owned(),
            server_response: response.to_owned(),
            config,
            error: false,
            auto_retried: false,
        }
    }

    /// Status for a failed response.
    #[must_use]
    pub fn failed(
        category: StatusCategory,
        code: u16,
        request: &str,
        response: &str,
        config: ConfigSnapshot,
    ) -> Self {
        Self {
            code,
            category,
            client_request: request.to_owned(),
            server_response: response.to_owned(),
            config,
            error: true,
            auto_retried: false,
        }
    }
}

/// Operation-specific success payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    /// History fetch result.
    History {
        /// Message bodies, post-decryption, in service order.
        messages: Vec<Value>,
        /// Pagination cursor: raw second element of the response array.
        start: Option<Value>,
        /// Pagination cursor: raw third element of the response array.
        end: Option<Value>,
    },
    /// Publish acknowledgement.
    Publish {
        /// Timetoken assigned to the published message.
        timetoken: Option<Value>,
        /// Service description string (e.g. `"Sent"`).
        description: Option<String>,
    },
    /// Server clock probe result.
    Time {
        /// Current service timetoken.
        timetoken: Value,
    },
}

/// Per-operation result carried by a success envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeResult {
    /// HTTP status code of the response.
    pub code: u16,
    /// Operation that produced this result.
    pub operation: Operation,
    /// The request URI that produced this envelope.
    pub client_request: String,
    /// The raw response body.
    pub server_response: String,
    /// Operation-specific payload.
    pub data: EnvelopeData,
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope / ErrorEnvelope
// ─────────────────────────────────────────────────────────────────────────────

/// The structured success result of one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Status metadata (`error` is always false here).
    pub status: EnvelopeStatus,
    /// Operation result payload.
    pub result: EnvelopeResult,
    /// True for envelopes that only refresh an internal timetoken; these
    /// are suppressed from the success callback.
    #[serde(default)]
    pub timetoken_update: bool,
    /// First envelope of its batch.
    #[serde(default)]
    pub first: bool,
    /// Last envelope of its batch.
    #[serde(default)]
    pub last: bool,
}

/// The structured failure result of one event: same status shape as
/// [`Envelope`] with `error: true` and no result payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Status metadata (`error` is always true here).
    pub status: EnvelopeStatus,
    /// Operation that produced this failure.
    pub operation: Operation,
    /// First envelope of its batch.
    #[serde(default)]
    pub first: bool,
    /// Last envelope of its batch.
    #[serde(default)]
    pub last: bool,
}

/// One item of the ordered batch a response expands into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeItem {
    /// Success envelope.
    Success(Envelope),
    /// Failure envelope.
    Error(ErrorEnvelope),
}

impl EnvelopeItem {
    /// Whether this item is a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Status metadata of either variant.
    #[must_use]
    pub fn status(&self) -> &EnvelopeStatus {
        match self {
            Self::Success(envelope) => &envelope.status,
            Self::Error(envelope) => &envelope.status,
        }
    }

    /// The success envelope, if this item is one.
    #[must_use]
    pub fn as_success(&self) -> Option<&Envelope> {
        match self {
            Self::Success(envelope) => Some(envelope),
            Self::Error(_) => None,
        }
    }

    /// The error envelope, if this item is one.
    #[must_use]
    pub fn as_error(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Error(envelope) => Some(envelope),
            Self::Success(_) => None,
        }
    }

    fn set_first(&mut self, first: bool) {
        match self {
            Self::Success(envelope) => envelope.first = first,
            Self::Error(envelope) => envelope.first = first,
        }
    }

    fn set_last(&mut self, last: bool) {
        match self {
            Self::Success(envelope) => envelope.last = last,
            Self::Error(envelope) => envelope.last = last,
        }
    }
}

/// Mark the head and tail of a batch so consumers can detect batch bounds
/// without inspecting the whole list. A single item is both first and last.
pub fn mark_batch_bounds(items: &mut [EnvelopeItem]) {
    if let Some(head) = items.first_mut() {
        head.set_first(true);
    }
    if let Some(tail) = items.last_mut() {
        tail.set_last(true);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            origin: "ps.nimbus.cloud".into(),
            secure: true,
            uuid: None,
            auth_key: None,
        }
    }

    fn success_item() -> EnvelopeItem {
        EnvelopeItem::Success(Envelope {
            status: EnvelopeStatus::ack(200, "https://x/y", "[]", snapshot()),
            result: EnvelopeResult {
                code: 200,
                operation: Operation::History,
                client_request: "https://x/y".into(),
                server_response: "[]".into(),
                data: EnvelopeData::History {
                    messages: vec![],
                    start: None,
                    end: None,
                },
            },
            timetoken_update: false,
            first: false,
            last: false,
        })
    }

    fn error_item() -> EnvelopeItem {
        EnvelopeItem::Error(ErrorEnvelope {
            status: EnvelopeStatus::failed(
                StatusCategory::Error,
                403,
                "https://x/y",
                "denied",
                snapshot(),
            ),
            operation: Operation::History,
            first: false,
            last: false,
        })
    }

    // ── category / operation wire strings ───────────────────────────────

    #[test]
    fn category_serde_strings() {
        assert_eq!(
            serde_json::to_value(StatusCategory::Ack).unwrap(),
            json!("ack")
        );
        assert_eq!(
            serde_json::to_value(StatusCategory::Error).unwrap(),
            json!("error")
        );
        assert_eq!(
            serde_json::to_value(StatusCategory::NonJsonResponse).unwrap(),
            json!("non_json_response")
        );
    }

    #[test]
    fn category_display_matches_serde() {
        assert_eq!(StatusCategory::NonJsonResponse.to_string(), "non_json_response");
        assert_eq!(StatusCategory::Ack.to_string(), "ack");
    }

    #[test]
    fn operation_serde_strings() {
        assert_eq!(serde_json::to_value(Operation::History).unwrap(), json!("history"));
        assert_eq!(serde_json::to_value(Operation::Publish).unwrap(), json!("publish"));
        assert_eq!(serde_json::to_value(Operation::Time).unwrap(), json!("time"));
    }

    #[test]
    fn operation_display() {
        assert_eq!(Operation::History.to_string(), "history");
        assert_eq!(Operation::Time.to_string(), "time");
    }

    // ── status constructors ─────────────────────────────────────────────

    #[test]
    fn ack_status_is_not_error() {
        let status = EnvelopeStatus::ack(200, "req", "resp", snapshot());
        assert_eq!(status.category, StatusCategory::Ack);
        assert!(!status.error);
        assert!(!status.auto_retried);
    }

    #[test]
    fn failed_status_is_error() {
        let status =
            EnvelopeStatus::failed(StatusCategory::NonJsonResponse, 200, "req", "resp", snapshot());
        assert_eq!(status.category, StatusCategory::NonJsonResponse);
        assert!(status.error);
    }

    // ── item accessors ──────────────────────────────────────────────────

    #[test]
    fn item_accessors() {
        let success = success_item();
        assert!(!success.is_error());
        assert!(success.as_success().is_some());
        assert!(success.as_error().is_none());

        let error = error_item();
        assert!(error.is_error());
        assert!(error.as_error().is_some());
        assert!(error.as_success().is_none());
        assert_eq!(error.status().code, 403);
    }

    // ── batch bounds ────────────────────────────────────────────────────

    #[test]
    fn batch_bounds_empty() {
        let mut items: Vec<EnvelopeItem> = vec![];
        mark_batch_bounds(&mut items);
        assert!(items.is_empty());
    }

    #[test]
    fn batch_bounds_single_item_is_first_and_last() {
        let mut items = vec![success_item()];
        mark_batch_bounds(&mut items);
        let envelope = items[0].as_success().unwrap();
        assert!(envelope.first);
        assert!(envelope.last);
    }

    #[test]
    fn batch_bounds_multiple_items() {
        let mut items = vec![success_item(), error_item(), success_item()];
        mark_batch_bounds(&mut items);
        assert!(items[0].as_success().unwrap().first);
        assert!(!items[0].as_success().unwrap().last);
        assert!(!items[1].as_error().unwrap().first);
        assert!(!items[1].as_error().unwrap().last);
        assert!(items[2].as_success().unwrap().last);
        assert!(!items[2].as_success().unwrap().first);
    }

    // ── serde shape ─────────────────────────────────────────────────────

    #[test]
    fn envelope_serializes_history_data_fields() {
        let EnvelopeItem::Success(envelope) = success_item() else {
            unreachable!()
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"]["category"], "ack");
        assert_eq!(json["result"]["operation"], "history");
        assert!(json["result"]["data"]["messages"].is_array());
        assert_eq!(json["timetoken_update"], false);
    }

    #[test]
    fn error_envelope_has_no_result() {
        let EnvelopeItem::Error(envelope) = error_item() else {
            unreachable!()
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"]["error"], true);
        assert!(json.get("result").is_none());
    }
}
