//! Error types for Skyglow operations.
//!
//! Token parse failures are caller-correctable and never retried. Derivation
//! and encryption failures are fatal for the call. Transport and relay errors
//! are propagated as-is; this crate does not retry.

use std::fmt;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SkyglowErrorCode {
    /// Feature not compiled in
    Unimplemented = 1000,
    /// Transport/network layer error
    Transport = 2000,
    /// Connection failed
    ConnectionFailed = 2001,
    /// Connection timeout
    ConnectionTimeout = 2002,
    /// Device token has the wrong length
    InvalidTokenLength = 3000,
    /// Device token does not carry a valid server address
    InvalidServerAddress = 3001,
    /// Key derivation failed
    KeyDerivation = 4000,
    /// AEAD setup, seal or open failed
    Encryption = 4001,
    /// Relay answered with a non-success status
    RelayRejected = 5000,
    /// Relay answered with a body we could not parse
    MalformedRelayResponse = 5001,
    /// Serialization error
    Serialization = 5002,
    /// No relay configured
    NotConfigured = 6000,
    /// Session bootstrap (DNS TXT lookup) failed
    SessionBootstrap = 6001,
}

/// Error type for Skyglow operations.
#[derive(Debug)]
pub enum SkyglowError {
    /// Feature not compiled in.
    Unimplemented(&'static str),

    /// Device token is not exactly 32 bytes.
    InvalidTokenLength {
        /// Required length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// The address prefix of the token is not a hostname.
    InvalidServerAddress(String),

    /// HKDF expansion failed.
    KeyDerivation(String),

    /// AES-GCM setup, nonce generation, seal or open failed.
    Encryption(String),

    /// Transport/network layer error.
    Transport(String),

    /// Connection failed.
    ConnectionFailed {
        /// Target endpoint
        target: String,
        /// Underlying error message
        reason: String,
    },

    /// Connection timeout.
    ConnectionTimeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// The relay returned a well-formed response with a non-success status.
    RelayRejected(String),

    /// The relay response did not parse; carries the raw body.
    MalformedRelayResponse(String),

    /// Serialization/deserialization error.
    Serialization(String),

    /// No relay endpoint has been configured.
    NotConfigured,

    /// Resolving or interpreting the `_sgn` TXT record failed.
    SessionBootstrap(String),
}

impl SkyglowError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> SkyglowErrorCode {
        match self {
            Self::Unimplemented(_) => SkyglowErrorCode::Unimplemented,
            Self::InvalidTokenLength { .. } => SkyglowErrorCode::InvalidTokenLength,
            Self::InvalidServerAddress(_) => SkyglowErrorCode::InvalidServerAddress,
            Self::KeyDerivation(_) => SkyglowErrorCode::KeyDerivation,
            Self::Encryption(_) => SkyglowErrorCode::Encryption,
            Self::Transport(_) => SkyglowErrorCode::Transport,
            Self::ConnectionFailed { .. } => SkyglowErrorCode::ConnectionFailed,
            Self::ConnectionTimeout { .. } => SkyglowErrorCode::ConnectionTimeout,
            Self::RelayRejected(_) => SkyglowErrorCode::RelayRejected,
            Self::MalformedRelayResponse(_) => SkyglowErrorCode::MalformedRelayResponse,
            Self::Serialization(_) => SkyglowErrorCode::Serialization,
            Self::NotConfigured => SkyglowErrorCode::NotConfigured,
            Self::SessionBootstrap(_) => SkyglowErrorCode::SessionBootstrap,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true for token parse failures, which the caller has to fix.
    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            Self::InvalidTokenLength { .. } | Self::InvalidServerAddress(_)
        )
    }

    /// Returns true if the failure happened below the relay protocol.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionFailed { .. } | Self::ConnectionTimeout { .. }
        )
    }

    /// The relay status text, if the relay rejected the request.
    pub fn relay_status(&self) -> Option<&str> {
        match self {
            Self::RelayRejected(status) => Some(status),
            _ => None,
        }
    }

    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(err: E) -> Self {
        Self::Transport(err.to_string())
    }
}

impl fmt::Display for SkyglowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unimplemented(label) => write!(f, "{} is not implemented", label),
            Self::InvalidTokenLength { expected, actual } => {
                write!(
                    f,
                    "device token size incorrect, expected {} got {}",
                    expected, actual
                )
            }
            Self::InvalidServerAddress(address) => {
                write!(f, "device token server address invalid: {:?}", address)
            }
            Self::KeyDerivation(msg) => write!(f, "failed to derive encryption key: {}", msg),
            Self::Encryption(msg) => write!(f, "encryption error: {}", msg),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::ConnectionFailed { target, reason } => {
                write!(f, "connection to {} failed: {}", target, reason)
            }
            Self::ConnectionTimeout {
                operation,
                timeout_ms,
            } => {
                write!(f, "{} timed out after {}ms", operation, timeout_ms)
            }
            Self::RelayRejected(status) => write!(f, "relay rejected request: {}", status),
            Self::MalformedRelayResponse(body) => {
                write!(f, "malformed relay response: {}", body)
            }
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::NotConfigured => write!(f, "no notification relay configured"),
            Self::SessionBootstrap(msg) => write!(f, "session bootstrap failed: {}", msg),
        }
    }
}

impl std::error::Error for SkyglowError {}

impl From<serde_json::Error> for SkyglowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
