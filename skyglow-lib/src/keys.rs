//! Key derivation from the device secret.
//!
//! Two values are derived from the 16-byte secret of a device token:
//!
//! - **Routing key**: `SHA-256(secret)`. Not secret. The relay addresses the
//!   device by it and can recompute it without ever seeing the secret.
//! - **Encryption key**: `HKDF-SHA256(ikm = secret, salt = server_address ||
//!   HKDF_SALT_SUFFIX, info = "")`, 32 bytes. Shared only by sender and device.
//!
//! Both derivations must stay bit-identical to the device-side implementation.

use std::fmt;

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::token::DeviceSecret;
use crate::{Result, SkyglowError};

/// Protocol constant appended to the server address to form the HKDF salt.
///
/// Devices use the same literal. Changing it does not fail derivation; it
/// silently produces a key the device cannot decrypt with.
pub const HKDF_SALT_SUFFIX: &str = "Hello from the Skyglow Notifications developers!";

/// Length of both derived keys in bytes.
pub const KEY_LEN: usize = 32;

/// Non-secret identifier the relay uses to address a device.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutingKey([u8; KEY_LEN]);

impl RoutingKey {
    /// Wrap raw routing key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Lowercase hex, as sent on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoutingKey({})", self.to_hex())
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// AES-256-GCM key shared by sender and device. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Derive the routing key: `SHA-256(secret)`.
///
/// Deterministic and unsalted so that the relay and every sender agree on
/// the same value for a device.
pub fn derive_routing_key(secret: &DeviceSecret) -> RoutingKey {
    let digest = Sha256::digest(secret.as_bytes());
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest);
    RoutingKey(key)
}

/// Derive the payload encryption key for a device.
///
/// The salt binds the key to `server_address`, so two tokens sharing a
/// secret under different relays get different keys.
pub fn derive_encryption_key(secret: &DeviceSecret, server_address: &str) -> Result<EncryptionKey> {
    let mut salt = Vec::with_capacity(server_address.len() + HKDF_SALT_SUFFIX.len());
    salt.extend_from_slice(server_address.as_bytes());
    salt.extend_from_slice(HKDF_SALT_SUFFIX.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt), secret.as_bytes());
    let mut key = EncryptionKey([0u8; KEY_LEN]);
    hk.expand(&[], &mut key.0)
        .map_err(|e| SkyglowError::KeyDerivation(e.to_string()))?;
    Ok(key)
}
