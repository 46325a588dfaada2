//! Command implementations

pub mod feedback;
pub mod inspect;
pub mod resolve;
pub mod send;

use anyhow::{bail, Context, Result};
use skyglow_lib::session::{configure_session, SessionConfig};
use skyglow_lib::transport::{DohTxtResolver, HttpRelayTransport};
use skyglow_lib::{decode_device_token, parse_device_token, SkyglowError};

use crate::ui;

/// Where to find the relay, from global flags.
pub struct RelayArgs {
    pub relay_url: Option<String>,
    pub server: Option<String>,
    pub timeout_secs: u64,
}

/// Build a relay transport from an explicit URL, a bootstrap server name,
/// or the address inside the device token, in that order.
pub async fn connect(args: &RelayArgs, token: Option<&[u8]>) -> Result<HttpRelayTransport> {
    let config = if let Some(url) = &args.relay_url {
        SessionConfig::new(url.clone())
    } else {
        let server = match (&args.server, token) {
            (Some(server), _) => server.clone(),
            (None, Some(token)) => parse_device_token(token)?.server_address,
            (None, None) => bail!("no relay configured: pass --relay-url or --server"),
        };

        let resolver = DohTxtResolver::cloudflare()?;
        let spinner = ui::spinner(&format!("Resolving relay for {}...", server));
        let result = configure_session(&resolver, &server).await;
        spinner.finish_and_clear();
        result.with_context(|| format!("could not bootstrap a session for {}", server))?
    };

    tracing::debug!(relay = %config.relay_url, "using relay");
    Ok(HttpRelayTransport::new(config.with_timeout(args.timeout_secs))?)
}

/// Decode a token argument and check its layout.
pub fn read_token(text: &str) -> Result<Vec<u8>> {
    let token = decode_device_token(text).context("device token must be base64 or hex")?;
    parse_device_token(&token)?;
    Ok(token)
}

/// Decode a hex feedback key argument.
pub fn read_feedback_key(text: &str) -> Result<Vec<u8>> {
    let key = hex::decode(text.trim()).context("feedback key must be hex")?;
    if key.is_empty() {
        bail!("feedback key must not be empty");
    }
    Ok(key)
}

/// Print extra guidance for relay-level failures.
pub fn explain(err: &SkyglowError) {
    if let Some(status) = err.relay_status() {
        ui::warning(&format!("The relay refused the request with status {:?}", status));
    } else if err.is_transport() {
        ui::warning("Could not reach the relay; check --relay-url or your network");
    } else if let SkyglowError::MalformedRelayResponse(_) = err {
        ui::warning("The relay answered with something other than a Skyglow response");
    }
}
