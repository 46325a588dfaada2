//! Inspect command - show what a device token routes to

use anyhow::Result;
use skyglow_lib::routing_info_from_device_token;

use super::read_token;
use crate::ui;

pub fn run(token_text: &str, verbose: bool) -> Result<()> {
    let token = read_token(token_text)?;
    let (routing_key, server_address) = routing_info_from_device_token(&token)?;

    ui::header("Device Token");
    ui::key_value("Server Address", &server_address);
    ui::key_value("Routing Key", &routing_key.to_hex());
    if verbose {
        ui::key_value("Token (hex)", &hex::encode(&token));
    }

    Ok(())
}
