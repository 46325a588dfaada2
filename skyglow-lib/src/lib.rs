//! Skyglow Notifications client library.
//!
//! Sends push notifications to Skyglow devices through an untrusted relay
//! and reads back delivery feedback. The relay only ever sees a routing key;
//! notification content is sealed with a key the relay cannot derive.
//!
//! The crate stays stateless: the codec functions are pure, and network
//! access goes through a [`RelayTransport`] supplied by the caller.
//!
//! # Features
//!
//! - **Token codec**: split a 32-byte device token into relay address and secret
//! - **Key derivation**: SHA-256 routing key, HKDF-SHA256 encryption key
//! - **Envelope codec**: plaintext and AES-256-GCM envelopes, feedback batches
//! - **Transport abstraction**: reqwest adapter behind `http-transport`
//!
//! # Example
//!
//! ```ignore
//! use skyglow_lib::prelude::*;
//! use skyglow_lib::session::configure_session;
//! use skyglow_lib::transport::{DohTxtResolver, HttpRelayTransport};
//!
//! let resolver = DohTxtResolver::cloudflare()?;
//! let config = configure_session(&resolver, "d.preloading.dev").await?;
//! let relay = HttpRelayTransport::new(config)?;
//!
//! let token = decode_device_token("ZC5wcmVsb2FkaW5nLmRldheJMhPP3zZrlGx1ie+8Q6g=")?;
//! send_encrypted_notification(&relay, &token, &Notification::new("Hello")).await?;
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod envelope;
pub mod errors;
pub mod keys;
pub mod prelude;
pub mod session;
pub mod token;
pub mod transport;

/// Test utilities: a recording mock relay, a static TXT resolver and
/// token fixtures.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use envelope::{
    AlertAction, Envelope, FeedbackKind, FeedbackRecord, Notification, PayloadFormat,
};
pub use errors::{SkyglowError, SkyglowErrorCode};
pub use keys::RoutingKey;
pub use token::{decode_device_token, parse_device_token, ParsedToken};
pub use transport::{RelayTransport, TxtResolver};

/// Common result alias for Skyglow operations.
pub type Result<T> = std::result::Result<T, SkyglowError>;

/// Sends a notification the relay can read.
///
/// # Errors
///
/// Token parse errors before any I/O, then transport errors, then the relay
/// verdict (`RelayRejected` or `MalformedRelayResponse`).
#[cfg_attr(feature = "tracing", tracing::instrument(skip(transport, device_token, notification)))]
pub async fn send_notification<T>(
    transport: &T,
    device_token: &[u8],
    notification: &Notification,
) -> Result<()>
where
    T: RelayTransport + ?Sized,
{
    let parsed = parse_device_token(device_token)?;
    let plaintext = envelope::build_plaintext_envelope(&parsed, notification);

    let body = transport
        .post_envelope(&plaintext.into())
        .await
        .map_err(|err| map_transport_error("send_notification", err))?;

    envelope::decode_relay_ack(&body)
}

/// Sends a notification sealed for the device.
///
/// A fresh nonce is drawn for every call; retrying never reuses one.
///
/// # Examples
/// ```
/// # use skyglow_lib::{send_encrypted_notification, Notification, RelayTransport};
/// # async fn demo(relay: &impl RelayTransport, token: &[u8]) -> skyglow_lib::Result<()> {
/// let notification = Notification::new("Your order shipped").with_badge(1);
/// send_encrypted_notification(relay, token, &notification).await?;
/// # Ok(())
/// # }
/// ```
#[cfg_attr(feature = "tracing", tracing::instrument(skip(transport, device_token, notification)))]
pub async fn send_encrypted_notification<T>(
    transport: &T,
    device_token: &[u8],
    notification: &Notification,
) -> Result<()>
where
    T: RelayTransport + ?Sized,
{
    send_sealed(transport, device_token, notification, "send_encrypted_notification").await
}

/// Sends any JSON-serializable payload sealed for the device.
///
/// Devices decode the payload as a JSON object, so `payload` should
/// serialize to one (an APS-style dictionary, for instance).
#[cfg_attr(feature = "tracing", tracing::instrument(skip(transport, device_token, payload)))]
pub async fn send_encrypted_payload<T, P>(
    transport: &T,
    device_token: &[u8],
    payload: &P,
) -> Result<()>
where
    T: RelayTransport + ?Sized,
    P: Serialize + ?Sized,
{
    send_sealed(transport, device_token, payload, "send_encrypted_payload").await
}

async fn send_sealed<T, P>(
    transport: &T,
    device_token: &[u8],
    payload: &P,
    label: &'static str,
) -> Result<()>
where
    T: RelayTransport + ?Sized,
    P: Serialize + ?Sized,
{
    let parsed = parse_device_token(device_token)?;
    let sealed = envelope::build_encrypted_envelope(&parsed, payload)?;

    let body = transport
        .post_envelope(&sealed.into())
        .await
        .map_err(|err| map_transport_error(label, err))?;

    envelope::decode_relay_ack(&body)
}

/// Registers a device token for feedback under the application's key.
///
/// Call once per token. The relay tolerates repeat registrations; if it
/// rejects one, the `RelayRejected` error can usually be ignored.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(transport, device_token, feedback_key)))]
pub async fn configure_token_for_feedback<T>(
    transport: &T,
    device_token: &[u8],
    feedback_key: &[u8],
) -> Result<()>
where
    T: RelayTransport + ?Sized,
{
    let parsed = parse_device_token(device_token)?;
    let registration = envelope::build_feedback_registration(&parsed, feedback_key);

    let body = transport
        .post_feedback_registration(&registration)
        .await
        .map_err(|err| map_transport_error("configure_token_for_feedback", err))?;

    envelope::decode_relay_ack(&body)
}

/// Fetches feedback recorded after `after` for tokens registered under
/// `feedback_key`.
///
/// An empty batch is `Ok(vec![])`. Use [`FeedbackRecord::concerns`] or the
/// pair returned by [`routing_info_from_device_token`] to match records to
/// stored tokens.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(transport, feedback_key)))]
pub async fn get_feedback<T>(
    transport: &T,
    feedback_key: &[u8],
    after: DateTime<Utc>,
) -> Result<Vec<FeedbackRecord>>
where
    T: RelayTransport + ?Sized,
{
    let query = envelope::build_feedback_query(feedback_key, after);

    let body = transport
        .fetch_feedback(&query)
        .await
        .map_err(|err| map_transport_error("get_feedback", err))?;

    let records = envelope::decode_feedback_response(&body)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(count = records.len(), "fetched feedback");

    Ok(records)
}

/// Returns the routing key and relay address for a device token.
///
/// Apps store this pair alongside the token to recognise it in feedback.
///
/// ```
/// use skyglow_lib::routing_info_from_device_token;
///
/// let mut token = [0u8; 32];
/// token[..13].copy_from_slice(b"a.example.com");
/// let (routing_key, address) = routing_info_from_device_token(&token).unwrap();
/// assert_eq!(address, "a.example.com");
/// assert_eq!(routing_key.to_hex().len(), 64);
/// ```
pub fn routing_info_from_device_token(device_token: &[u8]) -> Result<(RoutingKey, String)> {
    let parsed = parse_device_token(device_token)?;
    let routing_key = keys::derive_routing_key(&parsed.secret);
    Ok((routing_key, parsed.server_address))
}

fn map_transport_error(label: &'static str, err: SkyglowError) -> SkyglowError {
    match err {
        SkyglowError::Transport(msg) => SkyglowError::Transport(format!("{label}: {msg}")),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_device_token, MockRelay, TestFixtures};
    use chrono::TimeZone;
    use serde_json::json;

    fn token() -> Vec<u8> {
        test_device_token("a.example.com", &TestFixtures::SEQUENTIAL_SECRET)
    }

    #[tokio::test]
    async fn test_send_plaintext() {
        let relay = MockRelay::new();
        send_notification(&relay, &token(), &Notification::new("hi").with_badge(0))
            .await
            .unwrap();

        let sent = relay.envelopes();
        assert_eq!(sent.len(), 1);
        let value = serde_json::to_value(&sent[0]).unwrap();
        assert_eq!(value["server_address"], "a.example.com");
        assert_eq!(value["routing_key"], TestFixtures::SEQUENTIAL_ROUTING_HEX);
        assert_eq!(value["message"], "hi");
        assert_eq!(value["badge_number"], 0);
    }

    #[tokio::test]
    async fn test_send_encrypted_opens_on_device() {
        let relay = MockRelay::new();
        let token = token();
        let notification = Notification::new("sealed").with_sound("bell.caf");

        send_encrypted_notification(&relay, &token, &notification)
            .await
            .unwrap();

        let parsed = parse_device_token(&token).unwrap();
        match relay.envelopes().pop() {
            Some(Envelope::Encrypted(envelope)) => {
                assert_eq!(envelope.open_notification(&parsed.secret).unwrap(), notification);
            }
            other => panic!("expected encrypted envelope, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_payload() {
        let relay = MockRelay::new();
        let payload = json!({"aps": {"alert": "raw"}});
        send_encrypted_payload(&relay, &token(), &payload).await.unwrap();
        assert!(relay.envelopes()[0].is_encrypted());
    }

    #[tokio::test]
    async fn test_invalid_token_never_reaches_relay() {
        let relay = MockRelay::new();
        let err = send_encrypted_notification(&relay, &[0u8; 31], &Notification::new("x"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SkyglowError::InvalidTokenLength {
                expected: 32,
                actual: 31
            }
        ));
        assert!(relay.envelopes().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_token_rejected() {
        let relay = MockRelay::new();
        let foreign = [0xabu8; 32];
        let err = send_notification(&relay, &foreign, &Notification::new("x"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_token());
        assert!(relay.envelopes().is_empty());
    }

    #[tokio::test]
    async fn test_relay_rejection_surfaces_status() {
        let relay = MockRelay::new().with_send_response(r#"{"Status":"rate-limited"}"#);
        let err = send_encrypted_notification(&relay, &token(), &Notification::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.relay_status(), Some("rate-limited"));
    }

    #[tokio::test]
    async fn test_transport_error_is_labelled() {
        let relay = MockRelay::new().with_transport_failure("down");
        let err = send_notification(&relay, &token(), &Notification::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "transport error: send_notification: down");
    }

    #[tokio::test]
    async fn test_feedback_registration_matches_send_routing() {
        let relay = MockRelay::new();
        let token = token();

        send_notification(&relay, &token, &Notification::new("x")).await.unwrap();
        configure_token_for_feedback(&relay, &token, &[1, 2, 3])
            .await
            .unwrap();

        let registration = relay.registrations().pop().unwrap();
        assert_eq!(registration.feedback_key, "010203");
        assert_eq!(registration.routing_key, relay.envelopes()[0].routing_key());
    }

    #[tokio::test]
    async fn test_repeat_registration_rejection_is_surfaced() {
        let relay =
            MockRelay::new().with_register_response(r#"{"Status":"already registered"}"#);

        let err = configure_token_for_feedback(&relay, &token(), &[1, 2, 3])
            .await
            .unwrap_err();

        match err {
            SkyglowError::RelayRejected(status) => assert_eq!(status, "already registered"),
            other => panic!("expected RelayRejected, got {:?}", other),
        }
        assert_eq!(relay.registrations().len(), 1);
    }

    #[tokio::test]
    async fn test_get_feedback() {
        let relay = MockRelay::new().with_feedback_response(
            json!({
                "Status": "sucess",
                "Data": [{
                    "routing_token": TestFixtures::SEQUENTIAL_ROUTING_HEX,
                    "server_address": "a.example.com",
                    "type": 0,
                    "reason": "uninstalled",
                    "created_at": "2024-05-01T12:30:00Z",
                }]
            })
            .to_string(),
        );

        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let records = get_feedback(&relay, &[0xaa], after).await.unwrap();

        let query = relay.queries().pop().unwrap();
        assert_eq!(query.feedback_key, "aa");
        assert_eq!(query.after, "2024-01-01T00:00:00Z");

        let (routing_key, _) = routing_info_from_device_token(&token()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].concerns(&routing_key));
        assert_eq!(records[0].kind, FeedbackKind::TokenRemoved);
    }

    #[tokio::test]
    async fn test_get_feedback_empty() {
        let relay = MockRelay::new();
        let records = get_feedback(&relay, &[1], Utc::now()).await.unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_routing_info() {
        let (routing_key, address) = routing_info_from_device_token(&token()).unwrap();
        assert_eq!(address, "a.example.com");
        assert_eq!(routing_key.to_hex(), TestFixtures::SEQUENTIAL_ROUTING_HEX);
    }
}
