//! Send-path envelopes: plaintext-routed and AES-256-GCM encrypted.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::{base64_bytes, Notification};
use crate::keys::{derive_encryption_key, derive_routing_key, EncryptionKey};
use crate::token::{DeviceSecret, ParsedToken};
use crate::{Result, SkyglowError};

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Declared encoding of the sealed payload.
///
/// Devices also understand property lists; this crate only produces JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// JSON object.
    #[default]
    Json,
    /// Apple property list.
    Plist,
}

/// Envelope whose content the relay can read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextEnvelope {
    /// Relay hostname from the device token.
    pub server_address: String,
    /// Hex-encoded routing key.
    pub routing_key: String,
    /// Notification fields, inline.
    #[serde(flatten)]
    pub notification: Notification,
}

/// Envelope whose content only the device can read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// Relay hostname from the device token.
    pub server_address: String,
    /// Hex-encoded routing key.
    pub routing_key: String,
    /// Always `true` for this shape.
    pub is_encrypted: bool,
    /// Encoding of the plaintext inside `ciphertext`.
    pub data_type: PayloadFormat,
    /// AES-256-GCM output, tag appended.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// The nonce used for this envelope.
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Decrypt and decode a [`Notification`] payload, as the device would.
    ///
    /// # Errors
    ///
    /// [`SkyglowError::Serialization`] if the envelope declares a format
    /// other than JSON; nothing is decrypted in that case.
    pub fn open_notification(&self, secret: &DeviceSecret) -> Result<Notification> {
        if self.data_type != PayloadFormat::Json {
            return Err(SkyglowError::Serialization(format!(
                "unsupported payload format {:?}",
                self.data_type
            )));
        }
        let plaintext = open_encrypted_envelope(self, secret)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Build an envelope carrying the notification in the clear.
///
/// Cheaper than [`build_encrypted_envelope`] but lets every relay on the
/// path read the content.
pub fn build_plaintext_envelope(
    parsed: &ParsedToken,
    notification: &Notification,
) -> PlaintextEnvelope {
    PlaintextEnvelope {
        server_address: parsed.server_address.clone(),
        routing_key: derive_routing_key(&parsed.secret).to_hex(),
        notification: notification.clone(),
    }
}

/// Serialize `payload` to JSON and seal it for the device.
///
/// A fresh nonce is drawn from the OS random source on every call, so
/// retrying a send always produces a new envelope.
///
/// # Errors
///
/// - [`SkyglowError::Serialization`] if the payload cannot be encoded.
/// - [`SkyglowError::KeyDerivation`] if HKDF fails.
/// - [`SkyglowError::Encryption`] if the random source or the cipher fails.
pub fn build_encrypted_envelope<P>(parsed: &ParsedToken, payload: &P) -> Result<EncryptedEnvelope>
where
    P: Serialize + ?Sized,
{
    let plaintext = serde_json::to_vec(payload)?;
    let key = derive_encryption_key(&parsed.secret, &parsed.server_address)?;
    let (ciphertext, nonce) = seal(&key, &plaintext)?;

    Ok(EncryptedEnvelope {
        server_address: parsed.server_address.clone(),
        routing_key: derive_routing_key(&parsed.secret).to_hex(),
        is_encrypted: true,
        data_type: PayloadFormat::Json,
        ciphertext,
        iv: nonce.to_vec(),
    })
}

/// Decrypt an envelope with the device secret.
///
/// The key is derived from the envelope's own `server_address`, so a
/// tampered address fails authentication.
pub fn open_encrypted_envelope(
    envelope: &EncryptedEnvelope,
    secret: &DeviceSecret,
) -> Result<Vec<u8>> {
    if envelope.iv.len() != NONCE_LEN {
        return Err(SkyglowError::Encryption(format!(
            "nonce must be {} bytes, got {}",
            NONCE_LEN,
            envelope.iv.len()
        )));
    }

    let key = derive_encryption_key(secret, &envelope.server_address)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| SkyglowError::Encryption(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_slice())
        .map_err(|_| SkyglowError::Encryption("authentication failed".to_string()))
}

fn seal(key: &EncryptionKey, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| SkyglowError::Encryption(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| SkyglowError::Encryption(format!("secure random source failed: {e}")))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| SkyglowError::Encryption(e.to_string()))?;

    Ok((ciphertext, nonce))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::envelope::{AlertAction, Envelope};
    use crate::token::{parse_device_token, SECRET_LEN};

    /// AES-GCM authentication tag length.
    const TAG_LEN: usize = 16;

    fn parsed() -> ParsedToken {
        let mut token = [0u8; 32];
        token[..13].copy_from_slice(b"a.example.com");
        for (i, b) in token[16..].iter_mut().enumerate() {
            *b = i as u8;
        }
        parse_device_token(&token).unwrap()
    }

    #[test]
    fn test_plaintext_envelope_shape() {
        let notification = Notification::new("hello").with_badge(2);
        let envelope = build_plaintext_envelope(&parsed(), &notification);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["server_address"], "a.example.com");
        assert_eq!(
            value["routing_key"],
            "be45cb2605bf36bebde684841a28f0fd43c69850a3dce5fedba69928ee3a8991"
        );
        assert_eq!(value["message"], "hello");
        assert_eq!(value["badge_number"], 2);
        assert!(value.get("ciphertext").is_none());
    }

    #[test]
    fn test_encrypted_envelope_shape() {
        let envelope = build_encrypted_envelope(&parsed(), &Notification::new("secret")).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["is_encrypted"], true);
        assert_eq!(value["data_type"], "json");
        assert!(value["ciphertext"].is_string());
        assert!(value.get("message").is_none());
        assert_eq!(envelope.iv.len(), NONCE_LEN);

        let plaintext_len = serde_json::to_vec(&Notification::new("secret")).unwrap().len();
        assert_eq!(envelope.ciphertext.len(), plaintext_len + TAG_LEN);
    }

    #[test]
    fn test_encrypted_round_trip() {
        let token = parsed();
        let notification = Notification::new("round trip")
            .with_sound("ping.caf")
            .with_badge(0)
            .with_action(AlertAction::Open);

        let envelope = build_encrypted_envelope(&token, &notification).unwrap();
        let opened = envelope.open_notification(&token.secret).unwrap();
        assert_eq!(opened, notification);
    }

    #[test]
    fn test_round_trip_through_json() {
        let token = parsed();
        let envelope = build_encrypted_envelope(&token, &Notification::new("wire")).unwrap();

        let text = serde_json::to_string(&Envelope::from(envelope.clone())).unwrap();
        let decoded: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, Envelope::Encrypted(envelope));
    }

    #[test]
    fn test_plist_envelope_not_decoded_as_json() {
        let token = parsed();
        let mut envelope = build_encrypted_envelope(&token, &Notification::new("x")).unwrap();
        envelope.data_type = PayloadFormat::Plist;

        match envelope.open_notification(&token.secret) {
            Err(SkyglowError::Serialization(msg)) => assert!(msg.contains("Plist")),
            other => panic!("expected Serialization, got {:?}", other),
        }
        // The raw bytes are still available to a caller that handles plists.
        assert!(open_encrypted_envelope(&envelope, &token.secret).is_ok());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let envelope = build_encrypted_envelope(&parsed(), &Notification::new("x")).unwrap();
        let wrong = DeviceSecret::from_bytes([0xee; SECRET_LEN]);
        assert!(matches!(
            open_encrypted_envelope(&envelope, &wrong),
            Err(SkyglowError::Encryption(_))
        ));
    }

    #[test]
    fn test_tampered_address_fails() {
        let token = parsed();
        let mut envelope = build_encrypted_envelope(&token, &Notification::new("x")).unwrap();
        envelope.server_address = "b.example.com".to_string();
        assert!(open_encrypted_envelope(&envelope, &token.secret).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let token = parsed();
        let mut envelope = build_encrypted_envelope(&token, &Notification::new("x")).unwrap();
        let last = envelope.ciphertext.len() - 1;
        envelope.ciphertext[last] ^= 1;
        assert!(open_encrypted_envelope(&envelope, &token.secret).is_err());
    }

    #[test]
    fn test_bad_nonce_length_rejected() {
        let token = parsed();
        let mut envelope = build_encrypted_envelope(&token, &Notification::new("x")).unwrap();
        envelope.iv.truncate(8);
        assert!(matches!(
            open_encrypted_envelope(&envelope, &token.secret),
            Err(SkyglowError::Encryption(_))
        ));
    }

    #[test]
    fn test_nonces_are_unique() {
        let token = parsed();
        let notification = Notification::new("same payload");
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let envelope = build_encrypted_envelope(&token, &notification).unwrap();
            assert!(seen.insert(envelope.iv), "nonce reused");
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn test_arbitrary_payload() {
        let token = parsed();
        let aps = serde_json::json!({"aps": {"alert": "hi", "sound": "default"}});
        let envelope = build_encrypted_envelope(&token, &aps).unwrap();

        let plaintext = open_encrypted_envelope(&envelope, &token.secret).unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
        assert_eq!(decoded, aps);
    }
}
