//! Relay transport and DNS resolution seams.
//!
//! The protocol core never performs I/O itself. It hands envelopes to a
//! [`RelayTransport`] and reads relay records through a [`TxtResolver`].
//!
//! ## Feature Flags
//!
//! The `http-transport` feature (enabled by default) provides
//! [`HttpRelayTransport`] and [`DohTxtResolver`], both backed by `reqwest`.
//! Without it, both types still exist but every call returns
//! [`SkyglowError::Unimplemented`](crate::SkyglowError::Unimplemented).

mod dns;
mod http;
mod traits;

pub use dns::{DohTxtResolver, CLOUDFLARE_DOH_URL};
pub use http::HttpRelayTransport;
pub use traits::{RelayTransport, TxtResolver};
