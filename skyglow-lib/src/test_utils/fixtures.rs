//! Device token fixtures and known-answer vectors.

use rand::RngCore;

use crate::token::{ADDRESS_LEN, SECRET_LEN, TOKEN_LEN};

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Demo token published for the `d.preloading.dev` relay, base64.
    pub const DEMO_TOKEN_BASE64: &'static str = "ZC5wcmVsb2FkaW5nLmRldheJMhPP3zZrlGx1ie+8Q6g=";
    /// Relay address inside the demo token.
    pub const DEMO_ADDRESS: &'static str = "d.preloading.dev";
    /// SHA-256 of the demo token secret.
    pub const DEMO_ROUTING_HEX: &'static str =
        "9a87895ab4101d9e51ec38e2ac4d8675d0fead8d988ae36f2786e001bb7cf1be";
    /// HKDF key of the demo token.
    pub const DEMO_ENCRYPTION_HEX: &'static str =
        "9a13f6f10632f0b66bbcf781e5af5802f8e0f654208b1de80884bc2282183d69";

    /// A second published token, hex encoded.
    pub const TEST_TOKEN_HEX: &'static str =
        "742e7072656c6f6164696e672e646576badf9650c3c04b5523a93fb847ea6645";
    /// Relay address inside [`Self::TEST_TOKEN_HEX`].
    pub const TEST_ADDRESS: &'static str = "t.preloading.dev";
    /// Routing key of [`Self::TEST_TOKEN_HEX`].
    pub const TEST_ROUTING_HEX: &'static str =
        "17c112d135bc9d0021ca83c7769c5f70b6e6a49df5b4d689941c94849e83e61d";
    /// Encryption key of [`Self::TEST_TOKEN_HEX`].
    pub const TEST_ENCRYPTION_HEX: &'static str =
        "1d1160a399730bbb2efdf20697d15c6107075cdfcaccd04543167bf3c88e4fb2";

    /// Secret bytes `0x00..=0x0f`.
    pub const SEQUENTIAL_SECRET: [u8; SECRET_LEN] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];
    /// Routing key of [`Self::SEQUENTIAL_SECRET`].
    pub const SEQUENTIAL_ROUTING_HEX: &'static str =
        "be45cb2605bf36bebde684841a28f0fd43c69850a3dce5fedba69928ee3a8991";
    /// Encryption key of [`Self::SEQUENTIAL_SECRET`] at `a.example.com`.
    pub const SEQUENTIAL_ENCRYPTION_HEX: &'static str =
        "0edf8862cecd4ced257f6c21c10fcce3dea35caf0b5ce2f379bdd4dfa16f2513";
}

/// Build a raw token from an address (at most 16 bytes) and a secret.
///
/// # Panics
///
/// If `address` is longer than the address field.
pub fn test_device_token(address: &str, secret: &[u8; SECRET_LEN]) -> Vec<u8> {
    assert!(address.len() <= ADDRESS_LEN, "address too long for a device token");

    let mut token = vec![0u8; TOKEN_LEN];
    token[..address.len()].copy_from_slice(address.as_bytes());
    token[ADDRESS_LEN..].copy_from_slice(secret);
    token
}

/// Build a raw token with a random secret.
pub fn random_device_token(address: &str) -> Vec<u8> {
    let mut secret = [0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    test_device_token(address, &secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{decode_device_token, parse_device_token};

    #[test]
    fn test_fixture_tokens_parse() {
        let demo = decode_device_token(TestFixtures::DEMO_TOKEN_BASE64).unwrap();
        assert_eq!(
            parse_device_token(&demo).unwrap().server_address,
            TestFixtures::DEMO_ADDRESS
        );

        let test = decode_device_token(TestFixtures::TEST_TOKEN_HEX).unwrap();
        assert_eq!(
            parse_device_token(&test).unwrap().server_address,
            TestFixtures::TEST_ADDRESS
        );
    }

    #[test]
    fn test_random_tokens_differ() {
        assert_ne!(
            random_device_token("a.example.com"),
            random_device_token("a.example.com")
        );
    }
}
