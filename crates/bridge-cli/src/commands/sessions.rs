//! `bridge start|list|status|credential|items|close` — session management.

use crate::client::{decode_data_url, ApiClient};
use anyhow::{Context, Result};
use bridge_core::{Platform, SessionStatus};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// Start a session and print linking instructions.
pub async fn run_start(client: &ApiClient, platform: &str) -> Result<()> {
    let platform: Platform = platform.parse()?;
    let started = client.start(platform).await?;
    info!(session_id = %started.session_id, "session started");

    println!("session {} ({}) is {}", started.session_id, started.platform, started.status);
    for (i, step) in started.instructions.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    println!(
        "\nSave the QR code with `bridge credential {} --out qr.png`.",
        started.session_id
    );
    Ok(())
}

/// List sessions on the server.
pub async fn run_list(client: &ApiClient) -> Result<()> {
    let listing = client.list().await?;

    println!("{:<24} {:<10} {:<20} {:<8} {}", "SESSION", "PLATFORM", "STATUS", "IDLE", "ACCOUNT");
    println!("{:<24} {:<10} {:<20} {:<8} {}", "───────", "────────", "──────", "────", "───────");
    for s in &listing.sessions {
        let account = s
            .profile_info
            .as_ref()
            .and_then(|p| p.display_name.clone())
            .unwrap_or_else(|| "-".to_string());
        let idle = format!("{}s{}", s.idle_secs, if s.active { "" } else { "*" });
        println!(
            "{:<24} {:<10} {:<20} {:<8} {}",
            s.id,
            s.platform.as_str(),
            s.status.as_str(),
            idle,
            account
        );
    }
    println!("\n{} session(s), {} active", listing.total, listing.active);
    Ok(())
}

/// Print a session's status, optionally waiting until it connects.
pub async fn run_status(client: &ApiClient, id: &str, wait_secs: Option<u64>) -> Result<()> {
    let deadline = wait_secs.map(|s| Instant::now() + Duration::from_secs(s));
    loop {
        let status = client.status(id).await?;
        let done = status.connected || status.status.is_terminal();
        let expired = deadline.map_or(true, |d| Instant::now() >= d);

        if done || expired {
            println!("{} ({}): {}", status.session_id, status.platform, status.status);
            if let Some(name) = status.profile_info.and_then(|p| p.display_name) {
                println!("  account: {name}");
            }
            if let Some(error) = status.error {
                println!("  error: {error}");
            }
            if status.status == SessionStatus::Error {
                anyhow::bail!("session {id} failed; start a new one");
            }
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

/// Save the current QR code to `out`.
pub async fn run_credential(client: &ApiClient, id: &str, out: &Path) -> Result<()> {
    let credential = client.credential(id).await?;
    let bytes = decode_data_url(&credential.credential)?;
    std::fs::write(out, &bytes).with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "wrote {} bytes to {} (session is {})",
        bytes.len(),
        out.display(),
        credential.status
    );
    Ok(())
}

/// Print recent conversations.
pub async fn run_items(
    client: &ApiClient,
    id: &str,
    filter: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let items = client.items(id, filter, limit).await?;
    if items.items.is_empty() {
        println!("(no conversations)");
    }
    for item in &items.items {
        match &item.preview {
            Some(preview) => println!("{:<28} {preview}", item.title),
            None => println!("{}", item.title),
        }
    }
    Ok(())
}

/// Close a session.
pub async fn run_close(client: &ApiClient, id: &str) -> Result<()> {
    client.close(id).await?;
    println!("session {id} closed");
    Ok(())
}
