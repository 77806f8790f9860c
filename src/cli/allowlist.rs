// IP allowlist management from the command line
// Changes are audited with the CLI as the request source

use chrono::{DateTime, Utc};
use std::net::IpAddr;

use crate::services::IpAllowlistService;
use crate::types::internal::context::RequestContext;

fn parse_ip(value: &str) -> Result<IpAddr, Box<dyn std::error::Error>> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not an IP address", value).into())
}

pub async fn add_entry(
    service: &IpAllowlistService,
    actor: &str,
    ip: &str,
    description: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = RequestContext::for_cli(actor);
    let entry = service.add(&ctx, parse_ip(ip)?, description, expires_at).await?;

    match entry.expires_at.and_then(|secs| DateTime::from_timestamp(secs, 0)) {
        Some(expiry) => println!("Allowed {} until {}", entry.ip_address, expiry.to_rfc3339()),
        None => println!("Allowed {} permanently", entry.ip_address),
    }

    Ok(())
}

pub async fn remove_entry(service: &IpAllowlistService, actor: &str, ip: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = RequestContext::for_cli(actor);
    let ip = parse_ip(ip)?;

    if service.remove(&ctx, ip).await? {
        println!("Deactivated {}", ip);
    } else {
        println!("No active entry for {}", ip);
    }

    Ok(())
}

pub async fn list_entries(service: &IpAllowlistService, include_inactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    let entries = service.list(include_inactive).await?;
    if entries.is_empty() {
        println!("Allowlist is empty");
        return Ok(());
    }

    let now = Utc::now().timestamp();
    for entry in entries {
        let status = if entry.is_effective(now) {
            "active"
        } else if entry.is_active {
            "expired"
        } else {
            "inactive"
        };
        println!(
            "{:<40} {:<8} added by {:<16} {}",
            entry.ip_address,
            status,
            entry.added_by,
            entry.description.unwrap_or_default()
        );
    }

    Ok(())
}
