//! HTTP relay transport.
//!
//! # Feature Flags
//!
//! Requires the `http-transport` feature for actual HTTP requests. Without
//! it, all requests return an `Unimplemented` error.
//!
//! # Example
//!
//! ```rust,ignore
//! use skyglow_lib::session::SessionConfig;
//! use skyglow_lib::transport::HttpRelayTransport;
//! use skyglow_lib::{send_encrypted_notification, Notification};
//!
//! let transport = HttpRelayTransport::new(SessionConfig::new("https://d.preloading.dev"))?;
//! send_encrypted_notification(&transport, &device_token, &Notification::new("hi")).await?;
//! ```

use async_trait::async_trait;
#[cfg(feature = "http-transport")]
use std::time::Duration;

use super::traits::RelayTransport;
use crate::envelope::{Envelope, FeedbackQuery, FeedbackRegistration};
use crate::session::SessionConfig;
#[cfg(feature = "http-transport")]
use crate::SkyglowError;
use crate::Result;

const SEND_PATH: &str = "send";
const REGISTER_FEEDBACK_PATH: &str = "register_token_for_feedback";
const GET_FEEDBACK_PATH: &str = "get_feedback";

/// Relay transport over HTTP(S).
///
/// Holds the session configuration for its whole lifetime; create one per
/// relay and share it between tasks.
pub struct HttpRelayTransport {
    config: SessionConfig,
    #[cfg(feature = "http-transport")]
    client: reqwest::Client,
}

impl HttpRelayTransport {
    /// Create a transport for the configured relay.
    ///
    /// # Errors
    ///
    /// [`SkyglowError::NotConfigured`] if the config has no relay URL.
    #[cfg(feature = "http-transport")]
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SkyglowError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a transport for the configured relay (stub when feature disabled).
    #[cfg(not(feature = "http-transport"))]
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[cfg(feature = "http-transport")]
    async fn post_json<B>(&self, path: &str, body: &B) -> Result<String>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.config.url(path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.read_body(response).await
    }

    #[cfg(feature = "http-transport")]
    async fn get_with_query<Q>(&self, path: &str, query: &Q) -> Result<String>
    where
        Q: serde::Serialize + ?Sized,
    {
        let url = self.config.url(path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        self.read_body(response).await
    }

    /// The relay reports failures in the body, so non-2xx bodies are
    /// returned too.
    #[cfg(feature = "http-transport")]
    async fn read_body(&self, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SkyglowError::Transport(format!("failed to read relay response: {}", e)))?;

        if !status.is_success() {
            #[cfg(feature = "tracing")]
            tracing::warn!(status = status.as_u16(), "relay answered with non-success HTTP status");
        }

        Ok(text)
    }

    #[cfg(feature = "http-transport")]
    fn map_reqwest_error(&self, e: reqwest::Error) -> SkyglowError {
        if e.is_timeout() {
            SkyglowError::ConnectionTimeout {
                operation: "relay request".to_string(),
                timeout_ms: self.config.timeout_secs * 1000,
            }
        } else if e.is_connect() {
            SkyglowError::ConnectionFailed {
                target: self.config.relay_url.clone(),
                reason: e.to_string(),
            }
        } else {
            SkyglowError::Transport(format!("relay request failed: {}", e))
        }
    }
}

#[cfg(feature = "http-transport")]
#[async_trait]
impl RelayTransport for HttpRelayTransport {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, envelope), fields(encrypted = envelope.is_encrypted()))
    )]
    async fn post_envelope(&self, envelope: &Envelope) -> Result<String> {
        self.post_json(SEND_PATH, envelope).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, registration)))]
    async fn post_feedback_registration(
        &self,
        registration: &FeedbackRegistration,
    ) -> Result<String> {
        self.post_json(REGISTER_FEEDBACK_PATH, registration).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, query), fields(after = %query.after))
    )]
    async fn fetch_feedback(&self, query: &FeedbackQuery) -> Result<String> {
        self.get_with_query(GET_FEEDBACK_PATH, query).await
    }
}

#[cfg(not(feature = "http-transport"))]
#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn post_envelope(&self, _envelope: &Envelope) -> Result<String> {
        Err(crate::SkyglowError::Unimplemented(
            "HTTP relay transport not compiled - enable the 'http-transport' feature",
        ))
    }

    async fn post_feedback_registration(
        &self,
        _registration: &FeedbackRegistration,
    ) -> Result<String> {
        Err(crate::SkyglowError::Unimplemented(
            "HTTP relay transport not compiled - enable the 'http-transport' feature",
        ))
    }

    async fn fetch_feedback(&self, _query: &FeedbackQuery) -> Result<String> {
        Err(crate::SkyglowError::Unimplemented(
            "HTTP relay transport not compiled - enable the 'http-transport' feature",
        ))
    }
}
