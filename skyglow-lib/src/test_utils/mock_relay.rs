//! In-memory relay and TXT resolver for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::envelope::{Envelope, FeedbackQuery, FeedbackRegistration};
use crate::transport::{RelayTransport, TxtResolver};
use crate::{Result, SkyglowError};

const ACK_BODY: &str = r#"{"Status":"sucess"}"#;
const EMPTY_FEEDBACK_BODY: &str = r#"{"Status":"sucess","Data":[]}"#;

/// A relay that records requests and answers with canned bodies.
///
/// By default every send and registration is acknowledged and every
/// feedback poll returns an empty batch.
pub struct MockRelay {
    send_response: String,
    register_response: String,
    feedback_response: String,
    failure: Option<String>,
    envelopes: RwLock<Vec<Envelope>>,
    registrations: RwLock<Vec<FeedbackRegistration>>,
    queries: RwLock<Vec<FeedbackQuery>>,
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRelay {
    /// Create a relay that accepts everything.
    pub fn new() -> Self {
        Self {
            send_response: ACK_BODY.to_string(),
            register_response: ACK_BODY.to_string(),
            feedback_response: EMPTY_FEEDBACK_BODY.to_string(),
            failure: None,
            envelopes: RwLock::new(Vec::new()),
            registrations: RwLock::new(Vec::new()),
            queries: RwLock::new(Vec::new()),
        }
    }

    /// Body returned for `/send`.
    pub fn with_send_response(mut self, body: impl Into<String>) -> Self {
        self.send_response = body.into();
        self
    }

    /// Body returned for `/register_token_for_feedback`.
    pub fn with_register_response(mut self, body: impl Into<String>) -> Self {
        self.register_response = body.into();
        self
    }

    /// Body returned for `/get_feedback`.
    pub fn with_feedback_response(mut self, body: impl Into<String>) -> Self {
        self.feedback_response = body.into();
        self
    }

    /// Fail every request with a transport error. Requests are still recorded.
    pub fn with_transport_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Envelopes posted so far.
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.read().unwrap().clone()
    }

    /// Feedback registrations posted so far.
    pub fn registrations(&self) -> Vec<FeedbackRegistration> {
        self.registrations.read().unwrap().clone()
    }

    /// Feedback queries made so far.
    pub fn queries(&self) -> Vec<FeedbackQuery> {
        self.queries.read().unwrap().clone()
    }

    fn respond(&self, body: &str) -> Result<String> {
        match &self.failure {
            Some(reason) => Err(SkyglowError::Transport(reason.clone())),
            None => Ok(body.to_string()),
        }
    }
}

#[async_trait]
impl RelayTransport for MockRelay {
    async fn post_envelope(&self, envelope: &Envelope) -> Result<String> {
        self.envelopes.write().unwrap().push(envelope.clone());
        self.respond(&self.send_response)
    }

    async fn post_feedback_registration(
        &self,
        registration: &FeedbackRegistration,
    ) -> Result<String> {
        self.registrations.write().unwrap().push(registration.clone());
        self.respond(&self.register_response)
    }

    async fn fetch_feedback(&self, query: &FeedbackQuery) -> Result<String> {
        self.queries.write().unwrap().push(query.clone());
        self.respond(&self.feedback_response)
    }
}

/// TXT resolver answering from a fixed map.
///
/// Unknown names resolve to no records.
#[derive(Default)]
pub struct StaticTxtResolver {
    records: HashMap<String, Vec<String>>,
}

impl StaticTxtResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a TXT string at `name`.
    pub fn with_record(mut self, name: impl Into<String>, txt: impl Into<String>) -> Self {
        self.records.entry(name.into()).or_default().push(txt.into());
        self
    }
}

#[async_trait]
impl TxtResolver for StaticTxtResolver {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.records.get(name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::decode_relay_ack;

    #[tokio::test]
    async fn test_default_bodies_are_success() {
        let relay = MockRelay::new();
        let query = FeedbackQuery {
            feedback_key: "00".into(),
            after: "1970-01-01T00:00:00Z".into(),
        };

        let body = relay.fetch_feedback(&query).await.unwrap();
        assert!(crate::envelope::decode_feedback_response(&body)
            .unwrap()
            .is_empty());
        assert!(decode_relay_ack(&relay.send_response).is_ok());
        assert_eq!(relay.queries(), vec![query]);
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticTxtResolver::new()
            .with_record("_sgn.a.example", "http_addr=https://a.example")
            .with_record("_sgn.a.example", "http_addr=https://b.example");

        assert_eq!(resolver.lookup_txt("_sgn.a.example").await.unwrap().len(), 2);
        assert!(resolver.lookup_txt("_sgn.other").await.unwrap().is_empty());
    }
}
