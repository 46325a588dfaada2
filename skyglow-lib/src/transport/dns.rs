//! TXT lookups over DNS-over-HTTPS (JSON API).

use async_trait::async_trait;
#[cfg(feature = "http-transport")]
use serde::Deserialize;
#[cfg(feature = "http-transport")]
use std::time::Duration;

use super::traits::TxtResolver;
use crate::Result;
#[cfg(feature = "http-transport")]
use crate::SkyglowError;

/// Cloudflare's public DoH JSON endpoint.
pub const CLOUDFLARE_DOH_URL: &str = "https://cloudflare-dns.com/dns-query";

#[cfg(feature = "http-transport")]
const TXT_RECORD_TYPE: u16 = 16;

/// Resolves TXT records through a DoH provider speaking `application/dns-json`.
pub struct DohTxtResolver {
    endpoint: String,
    timeout_secs: u64,
    #[cfg(feature = "http-transport")]
    client: reqwest::Client,
}

#[cfg(feature = "http-transport")]
#[derive(Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[cfg(feature = "http-transport")]
#[derive(Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

impl DohTxtResolver {
    /// Resolver against a specific DoH endpoint.
    #[cfg(feature = "http-transport")]
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SkyglowError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            timeout_secs,
            client,
        })
    }

    /// Resolver against a specific DoH endpoint (stub when feature disabled).
    #[cfg(not(feature = "http-transport"))]
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.into(),
            timeout_secs,
        })
    }

    /// Resolver against [`CLOUDFLARE_DOH_URL`] with a 10 second timeout.
    pub fn cloudflare() -> Result<Self> {
        Self::new(CLOUDFLARE_DOH_URL, 10)
    }

    /// The DoH endpoint in use.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Join the quoted character-strings of one TXT answer.
///
/// `"a=1 b" "=2"` becomes `a=1 b=2`.
#[cfg(any(feature = "http-transport", test))]
fn join_txt_strings(data: &str) -> String {
    let trimmed = data.trim();
    if !trimmed.starts_with('"') {
        return trimmed.to_string();
    }

    let mut joined = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    let mut escaped = false;
    for c in trimmed.chars() {
        match c {
            _ if escaped => {
                joined.push(c);
                escaped = false;
            }
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => joined.push(c),
            _ => {}
        }
    }
    joined
}

#[cfg(feature = "http-transport")]
#[async_trait]
impl TxtResolver for DohTxtResolver {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .query(&[("name", name), ("type", "TXT")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SkyglowError::ConnectionTimeout {
                        operation: format!("TXT lookup for {}", name),
                        timeout_ms: self.timeout_secs * 1000,
                    }
                } else if e.is_connect() {
                    SkyglowError::ConnectionFailed {
                        target: self.endpoint.clone(),
                        reason: e.to_string(),
                    }
                } else {
                    SkyglowError::Transport(format!("DoH request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(SkyglowError::Transport(format!(
                "DoH endpoint returned HTTP {}",
                response.status()
            )));
        }

        let body: DohResponse = response
            .json()
            .await
            .map_err(|e| SkyglowError::Transport(format!("invalid DoH response: {}", e)))?;

        // 3 is NXDOMAIN; treat it the same as an empty answer.
        if body.status != 0 && body.status != 3 {
            return Err(SkyglowError::Transport(format!(
                "DNS lookup for {} failed with rcode {}",
                name, body.status
            )));
        }

        Ok(body
            .answer
            .into_iter()
            .filter(|a| a.record_type == TXT_RECORD_TYPE)
            .map(|a| join_txt_strings(&a.data))
            .collect())
    }
}

#[cfg(not(feature = "http-transport"))]
#[async_trait]
impl TxtResolver for DohTxtResolver {
    async fn lookup_txt(&self, _name: &str) -> Result<Vec<String>> {
        Err(crate::SkyglowError::Unimplemented(
            "DoH resolver not compiled - enable the 'http-transport' feature",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_single_string() {
        assert_eq!(
            join_txt_strings("\"http_addr=https://d.example tcp_port=7373\""),
            "http_addr=https://d.example tcp_port=7373"
        );
    }

    #[test]
    fn test_join_split_strings() {
        assert_eq!(join_txt_strings("\"a=1 b\" \"=2\""), "a=1 b=2");
    }

    #[test]
    fn test_join_unquoted_and_escaped() {
        assert_eq!(join_txt_strings("plain=1"), "plain=1");
        assert_eq!(join_txt_strings(r#""say \"hi\"""#), "say \"hi\"");
    }

    #[test]
    fn test_cloudflare_endpoint() {
        assert_eq!(DohTxtResolver::cloudflare().unwrap().endpoint(), CLOUDFLARE_DOH_URL);
    }
}
