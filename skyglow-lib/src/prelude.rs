//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use skyglow_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Operations: `send_notification`, `send_encrypted_notification`,
//!   `send_encrypted_payload`, `configure_token_for_feedback`, `get_feedback`
//! - Notification and feedback types
//! - Error types: `SkyglowError`, `SkyglowErrorCode`, `Result`
//! - Transport traits and the session config

// Operations
pub use crate::{
    configure_token_for_feedback, get_feedback, routing_info_from_device_token,
    send_encrypted_notification, send_encrypted_payload, send_notification,
};

// Notification and feedback types
pub use crate::envelope::{AlertAction, FeedbackKind, FeedbackRecord, Notification};

// Token handling
pub use crate::keys::RoutingKey;
pub use crate::token::{decode_device_token, parse_device_token, ParsedToken};

// Error handling
pub use crate::errors::{SkyglowError, SkyglowErrorCode};
pub use crate::Result;

// Transport
pub use crate::session::SessionConfig;
pub use crate::transport::{RelayTransport, TxtResolver};
pub use crate::transport::{DohTxtResolver, HttpRelayTransport};
