//! Resolve command - look up a server's relay over DNS

use anyhow::Result;
use skyglow_lib::session::{parse_txt_record, TXT_RECORD_PREFIX};
use skyglow_lib::transport::DohTxtResolver;
use skyglow_lib::TxtResolver;

use crate::ui;

pub async fn run(server: &str, timeout_secs: u64, _verbose: bool) -> Result<()> {
    let resolver = DohTxtResolver::new(skyglow_lib::transport::CLOUDFLARE_DOH_URL, timeout_secs)?;
    let name = format!("{}.{}", TXT_RECORD_PREFIX, server.trim_end_matches('.'));

    let spinner = ui::spinner(&format!("Looking up {}...", name));
    let records = resolver.lookup_txt(&name).await;
    spinner.finish_and_clear();
    let records = records?;

    let Some(first) = records.first() else {
        ui::error(&format!("No TXT record at {}", name));
        return Ok(());
    };

    let record = parse_txt_record(first)?;
    ui::header(&format!("Relay for {}", server));
    ui::key_value("HTTP", record.http_addr.as_deref().unwrap_or("-"));
    ui::key_value("TCP host", record.tcp_addr.as_deref().unwrap_or("-"));
    ui::key_value(
        "TCP port",
        &record.tcp_port.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
    );

    if records.len() > 1 {
        ui::info(&format!("{} more record(s) ignored", records.len() - 1));
    }

    Ok(())
}
