//! Feedback registration and feedback batch decoding.
//!
//! An app registers each device token once, together with a feedback key it
//! generated and stored for itself. The relay later reports events (such as
//! the app being uninstalled) for those tokens, retrievable by feedback key.
//!
//! The feedback key is chosen by the application and reused for every token
//! it registers. This crate only transmits it.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode_relay_object, relay_field};
use crate::keys::{derive_routing_key, RoutingKey};
use crate::token::ParsedToken;
use crate::{Result, SkyglowError};

/// Body for `POST /register_token_for_feedback`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRegistration {
    /// Relay hostname from the device token.
    pub server_address: String,
    /// Hex-encoded routing key, identical to the one used when sending.
    pub routing_key: String,
    /// Hex-encoded application feedback key.
    pub feedback_key: String,
}

/// Query parameters for `GET /get_feedback`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeedbackQuery {
    /// Hex-encoded application feedback key.
    pub feedback_key: String,
    /// RFC 3339 lower bound on `created_at`.
    pub after: String,
}

/// What happened to a registered token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeedbackKind {
    /// The token is no longer valid; stop sending to it.
    TokenRemoved,
    /// A kind this version does not know about.
    Unknown,
}

impl FeedbackKind {
    /// Wire code for `TokenRemoved`.
    pub const TOKEN_REMOVED_CODE: i64 = 0;

    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenRemoved => "token-removed",
            Self::Unknown => "unknown",
        }
    }

    fn from_wire(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) if n.as_i64() == Some(Self::TOKEN_REMOVED_CODE) => {
                Self::TokenRemoved
            }
            Some(Value::String(s)) if s == "token-removed" => Self::TokenRemoved,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feedback event reported by the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackRecord {
    /// How the application should react.
    pub kind: FeedbackKind,
    /// Free-text reason supplied by the relay.
    pub reason: String,
    /// Routing key of the affected token. Empty if the relay sent something
    /// undecodable.
    pub routing_token: Vec<u8>,
    /// Relay the affected token belongs to.
    pub server_address: String,
    /// When the relay recorded the event.
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Hex form of the affected routing key.
    pub fn routing_token_hex(&self) -> String {
        hex::encode(&self.routing_token)
    }

    /// True if this record is about the token with `routing_key`.
    pub fn concerns(&self, routing_key: &RoutingKey) -> bool {
        self.routing_token.as_slice() == routing_key.as_bytes()
    }
}

#[derive(Deserialize)]
struct FeedbackWire {
    #[serde(default)]
    routing_token: Option<Value>,
    #[serde(default)]
    server_address: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    created_at: DateTime<Utc>,
}

impl From<FeedbackWire> for FeedbackRecord {
    fn from(wire: FeedbackWire) -> Self {
        Self {
            kind: FeedbackKind::from_wire(wire.kind.as_ref()),
            reason: wire.reason.unwrap_or_default(),
            routing_token: decode_routing_token(wire.routing_token.as_ref()),
            server_address: wire.server_address.unwrap_or_default(),
            created_at: wire.created_at,
        }
    }
}

/// Build the registration body for a parsed token.
pub fn build_feedback_registration(
    parsed: &ParsedToken,
    feedback_key: &[u8],
) -> FeedbackRegistration {
    FeedbackRegistration {
        server_address: parsed.server_address.clone(),
        routing_key: derive_routing_key(&parsed.secret).to_hex(),
        feedback_key: hex::encode(feedback_key),
    }
}

/// Build the feedback poll query.
pub fn build_feedback_query(feedback_key: &[u8], after: DateTime<Utc>) -> FeedbackQuery {
    FeedbackQuery {
        feedback_key: hex::encode(feedback_key),
        after: after.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// Decode a `/get_feedback` response body.
///
/// An empty or missing `Data` list is a valid "nothing yet" answer. Records
/// with an unknown kind, an undecodable routing token or `null` text fields
/// are kept. `Status` and `Data` keys are matched case-insensitively.
///
/// # Errors
///
/// - [`SkyglowError::MalformedRelayResponse`] with the raw body if it does
///   not parse.
/// - [`SkyglowError::RelayRejected`] with the status text for a non-success
///   status.
pub fn decode_feedback_response(body: &str) -> Result<Vec<FeedbackRecord>> {
    let object = decode_relay_object(body)?;

    let data = match relay_field(&object, "Data") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(data) => data,
    };

    let records = Vec::<FeedbackWire>::deserialize(data)
        .map_err(|_| SkyglowError::MalformedRelayResponse(body.to_string()))?;

    Ok(records.into_iter().map(FeedbackRecord::from).collect())
}

/// The relay encodes the hex routing key as a byte string, which its JSON
/// encoder renders as base64. Plain hex is accepted too.
fn decode_routing_token(value: Option<&Value>) -> Vec<u8> {
    let Some(Value::String(text)) = value else {
        return Vec::new();
    };

    if let Ok(raw) = B64.decode(text.as_bytes()) {
        if let Ok(hex_text) = std::str::from_utf8(&raw) {
            if let Ok(token) = hex::decode(hex_text) {
                return token;
            }
        }
    }

    hex::decode(text).unwrap_or_default()
}
