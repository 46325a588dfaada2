//! Send commands - deliver a notification or raw payload

use anyhow::{bail, Context, Result};
use skyglow_lib::{
    send_encrypted_notification, send_encrypted_payload, send_notification, AlertAction,
    Notification,
};

use super::{connect, explain, read_token, RelayArgs};
use crate::ui;

/// Notification fields collected from the command line.
pub struct SendOptions {
    pub message: String,
    pub sound: Option<String>,
    pub badge: Option<i32>,
    pub action: AlertAction,
    pub plaintext: bool,
}

impl SendOptions {
    fn notification(&self) -> Notification {
        let mut notification = Notification::new(self.message.clone()).with_action(self.action);
        if let Some(sound) = &self.sound {
            notification = notification.with_sound(sound.clone());
        }
        if let Some(badge) = self.badge {
            notification = notification.with_badge(badge);
        }
        notification
    }
}

pub async fn run(
    relay: &RelayArgs,
    token_text: &str,
    options: SendOptions,
    verbose: bool,
) -> Result<()> {
    let token = read_token(token_text)?;
    let transport = connect(relay, Some(&token)).await?;
    let notification = options.notification();

    if verbose {
        ui::header("Notification");
        ui::json(&serde_json::to_value(&notification)?);
    }
    if options.plaintext {
        ui::warning("Sending in plaintext: the relay can read this notification");
    }

    let spinner = ui::spinner("Sending notification...");
    let result = if options.plaintext {
        send_notification(&transport, &token, &notification).await
    } else {
        send_encrypted_notification(&transport, &token, &notification).await
    };
    spinner.finish_and_clear();

    if let Err(err) = result {
        explain(&err);
        return Err(err.into());
    }

    ui::success("Notification accepted by the relay");
    Ok(())
}

pub async fn run_payload(
    relay: &RelayArgs,
    token_text: &str,
    payload: &str,
    _verbose: bool,
) -> Result<()> {
    let token = read_token(token_text)?;
    let payload: serde_json::Value =
        serde_json::from_str(payload).context("payload must be valid JSON")?;
    if !payload.is_object() {
        bail!("payload must be a JSON object");
    }

    let transport = connect(relay, Some(&token)).await?;

    let spinner = ui::spinner("Sending payload...");
    let result = send_encrypted_payload(&transport, &token, &payload).await;
    spinner.finish_and_clear();

    if let Err(err) = result {
        explain(&err);
        return Err(err.into());
    }

    ui::success("Payload accepted by the relay");
    Ok(())
}
