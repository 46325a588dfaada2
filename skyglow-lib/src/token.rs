//! Device token codec.
//!
//! A Skyglow device token is 32 opaque bytes handed to the app by the device.
//! The layout is fixed:
//!
//! ```text
//! [16 bytes server address, NUL padded][16 bytes device secret]
//! ```
//!
//! The address tells the sender which relay serves the device. The secret
//! never leaves this process; it only feeds the key derivation in
//! [`crate::keys`].

use std::fmt;
use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{Result, SkyglowError};

/// Total device token length in bytes.
pub const TOKEN_LEN: usize = 32;

/// Width of the NUL-padded server address prefix.
pub const ADDRESS_LEN: usize = 16;

/// Width of the device secret suffix.
pub const SECRET_LEN: usize = TOKEN_LEN - ADDRESS_LEN;

/// Hostname-like labels, at least two, dot separated.
const SERVER_ADDRESS_PATTERN: &str =
    r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$";

fn server_address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(SERVER_ADDRESS_PATTERN).expect("valid regex"))
}

/// Returns true if `address` looks like a relay hostname.
pub fn is_valid_server_address(address: &str) -> bool {
    server_address_regex().is_match(address)
}

/// The 16-byte secret half of a device token.
///
/// Zeroized on drop and redacted from `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DeviceSecret([u8; SECRET_LEN]);

impl DeviceSecret {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for DeviceSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeviceSecret(<redacted>)")
    }
}

/// A device token split into its address and secret halves.
#[derive(Clone, Debug)]
pub struct ParsedToken {
    /// Hostname of the relay serving the device.
    pub server_address: String,
    /// Key derivation input. Never transmitted.
    pub secret: DeviceSecret,
}

/// Parse a raw 32-byte device token.
///
/// # Errors
///
/// - [`SkyglowError::InvalidTokenLength`] if `token` is not exactly 32 bytes.
/// - [`SkyglowError::InvalidServerAddress`] if the address prefix is not
///   UTF-8 or does not look like a hostname. This rejects tokens from other
///   push services before any network round-trip.
///
/// # Example
///
/// ```
/// use skyglow_lib::token::parse_device_token;
///
/// let mut token = [0u8; 32];
/// token[..16].copy_from_slice(b"d.preloading.dev");
/// token[16..].copy_from_slice(&[7u8; 16]);
///
/// let parsed = parse_device_token(&token).unwrap();
/// assert_eq!(parsed.server_address, "d.preloading.dev");
/// ```
pub fn parse_device_token(token: &[u8]) -> Result<ParsedToken> {
    if token.len() != TOKEN_LEN {
        return Err(SkyglowError::InvalidTokenLength {
            expected: TOKEN_LEN,
            actual: token.len(),
        });
    }

    let (address_bytes, secret_bytes) = token.split_at(ADDRESS_LEN);

    let end = address_bytes
        .iter()
        .rposition(|b| *b != 0)
        .map_or(0, |i| i + 1);
    let server_address = std::str::from_utf8(&address_bytes[..end])
        .map_err(|_| {
            SkyglowError::InvalidServerAddress(String::from_utf8_lossy(address_bytes).into_owned())
        })?
        .to_string();

    if !is_valid_server_address(&server_address) {
        return Err(SkyglowError::InvalidServerAddress(server_address));
    }

    let mut secret = [0u8; SECRET_LEN];
    secret.copy_from_slice(secret_bytes);

    Ok(ParsedToken {
        server_address,
        secret: DeviceSecret::from_bytes(secret),
    })
}

/// Decode a device token from the text form apps usually forward to their
/// backend: 64 hex characters, or standard base64.
///
/// Only the encoding is checked here; pass the result to
/// [`parse_device_token`] to validate the layout.
pub fn decode_device_token(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    if text.len() == TOKEN_LEN * 2 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(text)
            .map_err(|e| SkyglowError::Serialization(format!("invalid hex token: {e}")));
    }
    B64.decode(text)
        .map_err(|e| SkyglowError::Serialization(format!("invalid base64 token: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(address: &[u8], secret: [u8; SECRET_LEN]) -> Vec<u8> {
        let mut token = vec![0u8; TOKEN_LEN];
        token[..address.len()].copy_from_slice(address);
        token[ADDRESS_LEN..].copy_from_slice(&secret);
        token
    }

    #[test]
    fn test_parse_padded_address() {
        let token = token_with(b"a.example.com", [9u8; SECRET_LEN]);
        let parsed = parse_device_token(&token).unwrap();

        assert_eq!(parsed.server_address, "a.example.com");
        assert_eq!(parsed.secret.as_bytes(), &[9u8; SECRET_LEN]);
    }

    #[test]
    fn test_parse_full_width_address() {
        let token = token_with(b"d.preloading.dev", [1u8; SECRET_LEN]);
        let parsed = parse_device_token(&token).unwrap();
        assert_eq!(parsed.server_address, "d.preloading.dev");
    }

    #[test]
    fn test_wrong_length_rejected() {
        for len in [0, 31, 33, 64] {
            let result = parse_device_token(&vec![0u8; len]);
            match result {
                Err(SkyglowError::InvalidTokenLength { expected, actual }) => {
                    assert_eq!(expected, TOKEN_LEN);
                    assert_eq!(actual, len);
                }
                other => panic!("expected InvalidTokenLength, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_hostname_rejected() {
        let cases: [&[u8]; 5] = [
            b"",
            b"localhost",
            b"UPPER.example",
            b"-bad.example",
            b"a..example",
        ];
        for address in cases {
            let token = token_with(address, [0u8; SECRET_LEN]);
            assert!(
                matches!(
                    parse_device_token(&token),
                    Err(SkyglowError::InvalidServerAddress(_))
                ),
                "address {:?} should be rejected",
                String::from_utf8_lossy(address)
            );
        }
    }

    #[test]
    fn test_non_utf8_address_rejected() {
        let token = token_with(&[0xff, 0xfe, b'.', b'a', b'b'], [0u8; SECRET_LEN]);
        assert!(matches!(
            parse_device_token(&token),
            Err(SkyglowError::InvalidServerAddress(_))
        ));
    }

    #[test]
    fn test_random_token_rejected() {
        // APNs-style tokens are 32 random bytes and must not parse.
        let token: Vec<u8> = (0..TOKEN_LEN as u8).map(|i| i.wrapping_mul(37) ^ 0xa5).collect();
        assert!(parse_device_token(&token).is_err());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = DeviceSecret::from_bytes([0x41; SECRET_LEN]);
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("65"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_decode_hex_and_base64() {
        let from_hex =
            decode_device_token("742e7072656c6f6164696e672e646576badf9650c3c04b5523a93fb847ea6645")
                .unwrap();
        assert_eq!(&from_hex[..ADDRESS_LEN], b"t.preloading.dev");

        let from_b64 = decode_device_token("ZC5wcmVsb2FkaW5nLmRldheJMhPP3zZrlGx1ie+8Q6g=").unwrap();
        assert_eq!(from_b64.len(), TOKEN_LEN);
        assert_eq!(&from_b64[..ADDRESS_LEN], b"d.preloading.dev");

        assert!(decode_device_token("not a token!").is_err());
    }
}
