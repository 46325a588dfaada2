//! Relay session configuration and DNS bootstrap.
//!
//! A Skyglow server publishes its relay endpoints in a TXT record at
//! `_sgn.<server name>`:
//!
//! ```text
//! _sgn.d.preloading.dev. TXT "tcp_addr=d.preloading.dev tcp_port=7373 http_addr=https://d.preloading.dev"
//! ```
//!
//! [`configure_session`] resolves that record into a [`SessionConfig`], which
//! is then handed to a transport such as
//! [`HttpRelayTransport`](crate::transport::HttpRelayTransport). The config is
//! built once and only read afterwards.

use serde::{Deserialize, Serialize};

use crate::transport::TxtResolver;
use crate::{Result, SkyglowError};

/// DNS label prefix under which servers publish their relay record.
pub const TXT_RECORD_PREFIX: &str = "_sgn";

/// Configuration for talking to a relay over HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Relay base URL (e.g., `https://d.preloading.dev`).
    pub relay_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl SessionConfig {
    /// Create a configuration for a known relay URL.
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Check that a relay has been set.
    pub fn validate(&self) -> Result<()> {
        if self.relay_url.trim().is_empty() {
            return Err(SkyglowError::NotConfigured);
        }
        Ok(())
    }

    /// Build the full URL for a relay path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.relay_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Endpoints advertised in a `_sgn` TXT record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayRecord {
    /// HTTP base address of the relay.
    pub http_addr: Option<String>,
    /// Device-facing TCP host. Advertised but not used by senders.
    pub tcp_addr: Option<String>,
    /// Device-facing TCP port. Advertised but not used by senders.
    pub tcp_port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
enum TxtRecordError {
    #[error("invalid format in part: {0}")]
    MissingSeparator(String),
    #[error("invalid TCP port: {0}")]
    InvalidPort(String),
}

impl From<TxtRecordError> for SkyglowError {
    fn from(err: TxtRecordError) -> Self {
        SkyglowError::SessionBootstrap(err.to_string())
    }
}

/// Parse the space-separated `key=value` pairs of a relay TXT record.
///
/// Unknown keys are ignored.
///
/// # Example
///
/// ```
/// use skyglow_lib::session::parse_txt_record;
///
/// let record = parse_txt_record("http_addr=https://relay.example tcp_port=7373").unwrap();
/// assert_eq!(record.http_addr.as_deref(), Some("https://relay.example"));
/// assert_eq!(record.tcp_port, Some(7373));
/// ```
pub fn parse_txt_record(txt: &str) -> Result<RelayRecord> {
    let mut record = RelayRecord::default();

    for part in txt.split_whitespace() {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| TxtRecordError::MissingSeparator(part.to_string()))?;

        match key {
            "http_addr" => record.http_addr = Some(value.to_string()),
            "tcp_addr" => record.tcp_addr = Some(value.to_string()),
            "tcp_port" => {
                let port = value
                    .parse()
                    .map_err(|_| TxtRecordError::InvalidPort(value.to_string()))?;
                record.tcp_port = Some(port);
            }
            _ => {}
        }
    }

    Ok(record)
}

/// Resolve a server name into a relay session.
///
/// Looks up `_sgn.<server_name>`, reads the first TXT record and requires an
/// `http_addr` with an `http` or `https` scheme.
///
/// # Errors
///
/// [`SkyglowError::SessionBootstrap`] if the lookup fails, returns nothing,
/// or the record has no usable `http_addr`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(resolver)))]
pub async fn configure_session<R>(resolver: &R, server_name: &str) -> Result<SessionConfig>
where
    R: TxtResolver + ?Sized,
{
    let name = format!("{TXT_RECORD_PREFIX}.{}", server_name.trim_end_matches('.'));

    let records = resolver.lookup_txt(&name).await.map_err(|err| {
        SkyglowError::SessionBootstrap(format!(
            "failed to look up TXT record {name}, does the server exist? ({err})"
        ))
    })?;

    let first = records.first().ok_or_else(|| {
        SkyglowError::SessionBootstrap(format!("no TXT record found at {name}"))
    })?;

    let record = parse_txt_record(first)?;
    let http_addr = record.http_addr.ok_or_else(|| {
        SkyglowError::SessionBootstrap(format!("{name} does not advertise an http_addr"))
    })?;

    if !(http_addr.starts_with("https://") || http_addr.starts_with("http://")) {
        return Err(SkyglowError::SessionBootstrap(format!(
            "http_addr must be an http(s) URL, got {http_addr}"
        )));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(relay = %http_addr, "configured relay session");

    Ok(SessionConfig::new(http_addr))
}
