//! Wire envelopes exchanged with the relay.
//!
//! # Send path
//!
//! Two shapes are posted to `/send`:
//!
//! ```text
//! plaintext:  {server_address, routing_key, message, alert_sound, alert_action, badge_number}
//! encrypted:  {server_address, routing_key, is_encrypted, data_type, ciphertext, iv}
//! ```
//!
//! `routing_key` is lowercase hex; `ciphertext` and `iv` are standard base64.
//!
//! # Feedback path
//!
//! Registrations are posted to `/register_token_for_feedback` and feedback
//! batches are polled from `/get_feedback`. See [`feedback`].
//!
//! # Acknowledgements
//!
//! Every relay response carries a `Status` string. The live relay spells the
//! success status `"sucess"`; it is kept verbatim as [`RELAY_SUCCESS_STATUS`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{Result, SkyglowError};

pub mod feedback;
mod notification;

pub use feedback::{
    build_feedback_query, build_feedback_registration, decode_feedback_response, FeedbackKind,
    FeedbackQuery, FeedbackRecord, FeedbackRegistration,
};
pub use notification::{
    build_encrypted_envelope, build_plaintext_envelope, open_encrypted_envelope,
    EncryptedEnvelope, PayloadFormat, PlaintextEnvelope, NONCE_LEN,
};

/// Success status as emitted by the live relay (sic).
pub const RELAY_SUCCESS_STATUS: &str = "sucess";

/// Correctly spelled success status, accepted alongside the relay literal.
pub const RELAY_SUCCESS_STATUS_ALT: &str = "success";

/// Returns true if `status` is one of the relay's success statuses.
pub fn is_success_status(status: &str) -> bool {
    status == RELAY_SUCCESS_STATUS || status == RELAY_SUCCESS_STATUS_ALT
}

/// What the lock screen slider says for a notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AlertAction {
    /// "slide to view" (wire: empty string)
    #[default]
    View,
    /// "slide to Open" (wire: `"Open"`)
    Open,
}

impl AlertAction {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "",
            Self::Open => "Open",
        }
    }
}

impl Serialize for AlertAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlertAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("open") => Self::Open,
            _ => Self::View,
        })
    }
}

/// Notification content supplied by the application.
///
/// Field order and names match what devices expect inside both the
/// plaintext envelope and the encrypted payload.
///
/// # Example
///
/// ```
/// use skyglow_lib::{AlertAction, Notification};
///
/// let n = Notification::new("New message")
///     .with_sound("chime.caf")
///     .with_badge(0)
///     .with_action(AlertAction::Open);
///
/// let json = serde_json::to_value(&n).unwrap();
/// assert_eq!(json["badge_number"], 0);
/// assert_eq!(json["alert_action"], "Open");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Body text. Always sent, may be empty.
    #[serde(default)]
    pub message: String,

    /// Sound bundled with the app. `None` plays the default sound.
    #[serde(rename = "alert_sound", default, with = "empty_as_none")]
    pub sound: Option<String>,

    /// Slider text hint.
    #[serde(rename = "alert_action", default)]
    pub action: AlertAction,

    /// App icon badge. `None` leaves the badge unchanged; `Some(0)` clears it.
    #[serde(default)]
    pub badge_number: Option<i32>,
}

impl Notification {
    /// Create a notification with the given message and defaults otherwise.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the alert sound.
    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    /// Set the badge number.
    pub fn with_badge(mut self, badge: i32) -> Self {
        self.badge_number = Some(badge);
        self
    }

    /// Set the slider action.
    pub fn with_action(mut self, action: AlertAction) -> Self {
        self.action = action;
        self
    }
}

/// Look up a key the way the relay's JSON encoder matches field names:
/// an exact match wins, otherwise the first case-insensitive one.
pub(crate) fn relay_field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Parse a relay response body and check its `Status`.
///
/// Returns the top-level object so callers can read further fields.
pub(crate) fn decode_relay_object(body: &str) -> Result<Map<String, Value>> {
    let malformed = || SkyglowError::MalformedRelayResponse(body.to_string());

    let object = match serde_json::from_str(body) {
        Ok(Value::Object(object)) => object,
        _ => return Err(malformed()),
    };

    let status = relay_field(&object, "Status")
        .and_then(Value::as_str)
        .ok_or_else(malformed)?;

    if !is_success_status(status) {
        return Err(SkyglowError::RelayRejected(status.to_string()));
    }
    Ok(object)
}

/// Interpret a relay acknowledgement body.
///
/// The `Status` key is matched case-insensitively.
///
/// # Errors
///
/// - [`SkyglowError::MalformedRelayResponse`] with the raw body if it is not
///   a JSON object carrying a `Status` string.
/// - [`SkyglowError::RelayRejected`] with the status text for any status
///   other than success.
pub fn decode_relay_ack(body: &str) -> Result<()> {
    decode_relay_object(body).map(|_| ())
}

/// Serde adapter: `Option<String>` where `None` is the empty string.
mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}

/// Serde adapter: bytes as standard, padded base64.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&B64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        B64.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// A request body for `POST /send`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    /// Sealed payload; the relay sees only routing metadata.
    Encrypted(EncryptedEnvelope),
    /// Inline payload; the relay can read the content.
    Plaintext(PlaintextEnvelope),
}

impl Envelope {
    /// Relay hostname the envelope is addressed to.
    pub fn server_address(&self) -> &str {
        match self {
            Self::Encrypted(e) => &e.server_address,
            Self::Plaintext(p) => &p.server_address,
        }
    }

    /// Hex routing key the envelope is addressed to.
    pub fn routing_key(&self) -> &str {
        match self {
            Self::Encrypted(e) => &e.routing_key,
            Self::Plaintext(p) => &p.routing_key,
        }
    }

    /// True for the encrypted variant.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

impl From<PlaintextEnvelope> for Envelope {
    fn from(envelope: PlaintextEnvelope) -> Self {
        Self::Plaintext(envelope)
    }
}

impl From<EncryptedEnvelope> for Envelope {
    fn from(envelope: EncryptedEnvelope) -> Self {
        Self::Encrypted(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_wire_fields() {
        let n = Notification::new("hi");
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(
            value,
            json!({
                "message": "hi",
                "alert_sound": "",
                "alert_action": "",
                "badge_number": null,
            })
        );
    }

    #[test]
    fn test_badge_zero_is_distinct_from_unset() {
        let unset = serde_json::to_value(Notification::new("a")).unwrap();
        let zero = serde_json::to_value(Notification::new("a").with_badge(0)).unwrap();

        assert!(unset["badge_number"].is_null());
        assert_eq!(zero["badge_number"], 0);
    }

    #[test]
    fn test_notification_field_order() {
        let text = serde_json::to_string(&Notification::new("x")).unwrap();
        let message = text.find("\"message\"").unwrap();
        let sound = text.find("\"alert_sound\"").unwrap();
        let action = text.find("\"alert_action\"").unwrap();
        let badge = text.find("\"badge_number\"").unwrap();
        assert!(message < sound && sound < action && action < badge);
    }

    #[test]
    fn test_notification_decodes_device_form() {
        let n: Notification = serde_json::from_value(json!({
            "message": "m",
            "alert_sound": "",
            "alert_action": "Open",
            "badge_number": 3,
        }))
        .unwrap();
        assert_eq!(n.sound, None);
        assert_eq!(n.action, AlertAction::Open);
        assert_eq!(n.badge_number, Some(3));
    }

    #[test]
    fn test_relay_ack_success_spellings() {
        assert!(decode_relay_ack(r#"{"Status":"sucess"}"#).is_ok());
        assert!(decode_relay_ack(r#"{"Status":"success"}"#).is_ok());
        assert!(decode_relay_ack(r#"{"status":"sucess"}"#).is_ok());
    }

    #[test]
    fn test_relay_ack_status_key_any_case() {
        assert!(decode_relay_ack(r#"{"STATUS":"sucess"}"#).is_ok());
        assert!(decode_relay_ack(r#"{"sTaTuS":"success"}"#).is_ok());
    }

    #[test]
    fn test_relay_ack_exact_status_key_wins() {
        assert!(decode_relay_ack(r#"{"status":"rate-limited","Status":"sucess"}"#).is_ok());
        match decode_relay_ack(r#"{"Status":"rate-limited","status":"sucess"}"#) {
            Err(SkyglowError::RelayRejected(status)) => assert_eq!(status, "rate-limited"),
            other => panic!("expected RelayRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_relay_ack_rejected() {
        match decode_relay_ack(r#"{"Status":"rate-limited"}"#) {
            Err(SkyglowError::RelayRejected(status)) => assert_eq!(status, "rate-limited"),
            other => panic!("expected RelayRejected, got {:?}", other),
        }
    }

    #[test]
    fn test_relay_ack_malformed_keeps_body() {
        for body in ["<html>502 Bad Gateway</html>", "{}", "", r#"{"Status":1}"#] {
            match decode_relay_ack(body) {
                Err(SkyglowError::MalformedRelayResponse(raw)) => assert_eq!(raw, body),
                other => panic!("expected MalformedRelayResponse for {:?}, got {:?}", body, other),
            }
        }
    }
}
