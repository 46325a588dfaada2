use async_trait::async_trait;

use crate::envelope::{Envelope, FeedbackQuery, FeedbackRegistration};
use crate::Result;

/// Carries requests to a relay and returns the raw response bodies.
///
/// Implementations return the body text whatever the HTTP status; the
/// envelope codec decides what it means. Only failures to exchange a
/// request at all are errors here.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RelayTransport {
    /// `POST /send` with a plaintext or encrypted envelope.
    async fn post_envelope(&self, envelope: &Envelope) -> Result<String>;

    /// `POST /register_token_for_feedback`.
    async fn post_feedback_registration(&self, registration: &FeedbackRegistration)
        -> Result<String>;

    /// `GET /get_feedback?feedback_key=..&after=..`.
    async fn fetch_feedback(&self, query: &FeedbackQuery) -> Result<String>;
}

/// Resolves DNS TXT records.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait TxtResolver {
    /// Return the TXT strings published at `name`, in answer order.
    ///
    /// A record split into several character-strings is returned joined.
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>>;
}
