//! Feedback commands - register tokens and poll for feedback

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use skyglow_lib::{configure_token_for_feedback, get_feedback, FeedbackKind};

use super::{connect, explain, read_feedback_key, read_token, RelayArgs};
use crate::ui;

pub async fn register(
    relay: &RelayArgs,
    token_text: &str,
    feedback_key: &str,
    _verbose: bool,
) -> Result<()> {
    let token = read_token(token_text)?;
    let key = read_feedback_key(feedback_key)?;
    let transport = connect(relay, Some(&token)).await?;

    let spinner = ui::spinner("Registering token for feedback...");
    let result = configure_token_for_feedback(&transport, &token, &key).await;
    spinner.finish_and_clear();

    match result {
        Ok(()) => ui::success("Token registered for feedback"),
        Err(err) if err.relay_status().is_some() => {
            // Repeat registrations are refused but harmless.
            explain(&err);
            ui::info("If this token was registered before, this can be ignored");
        }
        Err(err) => {
            explain(&err);
            return Err(err.into());
        }
    }

    Ok(())
}

pub async fn fetch(
    relay: &RelayArgs,
    feedback_key: &str,
    after: Option<&str>,
    json: bool,
    _verbose: bool,
) -> Result<()> {
    let key = read_feedback_key(feedback_key)?;
    let after = match after {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .with_context(|| format!("invalid --after time {:?}", text))?
            .with_timezone(&Utc),
        None => Utc::now() - Duration::hours(24),
    };

    let transport = connect(relay, None).await?;

    let spinner = ui::spinner("Fetching feedback...");
    let result = get_feedback(&transport, &key, after).await;
    spinner.finish_and_clear();

    let records = match result {
        Ok(records) => records,
        Err(err) => {
            explain(&err);
            return Err(err.into());
        }
    };

    if json {
        let values: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "kind": r.kind.as_str(),
                    "reason": r.reason,
                    "routing_token": r.routing_token_hex(),
                    "server_address": r.server_address,
                    "created_at": r.created_at.to_rfc3339(),
                })
            })
            .collect();
        ui::json(&serde_json::Value::Array(values));
        return Ok(());
    }

    if records.is_empty() {
        ui::info(&format!("No feedback since {}", after.to_rfc3339()));
        return Ok(());
    }

    ui::header(&format!("Feedback ({} records)", records.len()));
    for record in &records {
        ui::separator();
        ui::key_value("Kind", record.kind.as_str());
        ui::key_value("Routing Key", &record.routing_token_hex());
        ui::key_value("Server", &record.server_address);
        ui::key_value("Reason", &record.reason);
        ui::key_value("At", &record.created_at.to_rfc3339());
        if record.kind == FeedbackKind::TokenRemoved {
            ui::warning("Stop sending to this token");
        }
    }

    Ok(())
}

pub fn generate_key(len: usize) -> Result<()> {
    if len == 0 || len > 1024 {
        bail!("key length must be between 1 and 1024 bytes");
    }

    let mut key = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut key);
    println!("{}", hex::encode(key));
    Ok(())
}
