//! cloudflared process controller
//!
//! The production [`ForwardController`]: each forwarding endpoint maps to
//! one `cloudflared access` child process. Child handles are kept by host
//! key so stop can kill the right process later. Starting a host that
//! already has a live child is a no-op so a double-click can never spawn
//! duplicates.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::lifecycle::{ForwardController, ForwardError};

const CLOUDFLARED_BIN: &str = "cloudflared";

/// Build the `cloudflared access` argument list for one endpoint. SSH
/// endpoints use the ssh access mode, everything else tunnels raw TCP.
fn access_args(host: &str, local_port: u16, protocol: &str) -> Vec<String> {
    let mode = match protocol {
        "ssh" => "ssh",
        _ => "tcp",
    };
    vec![
        "access".to_string(),
        mode.to_string(),
        "--hostname".to_string(),
        host.to_string(),
        "--url".to_string(),
        format!("localhost:{local_port}"),
    ]
}

/// Spawns and kills `cloudflared access` processes, one per host
#[derive(Default)]
pub struct CloudflaredController {
    children: Mutex<HashMap<String, Child>>,
}

impl CloudflaredController {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ForwardController for CloudflaredController {
    async fn start(&self, host: &str, local_port: u16, protocol: &str) -> Result<(), ForwardError> {
        let mut children = self.children.lock().unwrap();
        if children.contains_key(host) {
            // already forwarding this host, don't spawn a duplicate
            return Ok(());
        }

        let args = access_args(host, local_port, protocol);
        info!(%host, local_port, %protocol, "spawning cloudflared access");

        let child = Command::new(CLOUDFLARED_BIN)
            .args(&args)
            .spawn()
            .map_err(ForwardError::Spawn)?;

        children.insert(host.to_string(), child);
        Ok(())
    }

    async fn stop(&self, host: &str) -> Result<(), ForwardError> {
        let child = self.children.lock().unwrap().remove(host);
        match child {
            Some(mut child) => {
                // best-effort kill, the process may have already exited
                if let Err(err) = child.kill().await {
                    warn!(%host, %err, "kill failed, process likely gone");
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// First line of `cloudflared --version`, if the binary is available
pub async fn probe_version() -> Option<String> {
    let output = Command::new(CLOUDFLARED_BIN)
        .arg("--version")
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}
