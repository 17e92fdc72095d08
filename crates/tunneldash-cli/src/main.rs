//! TunnelDash CLI - dashboard core driven from the command line
//!
//! Verifies an API key against the tunnel provider's control plane, lists
//! the resolved topology, and runs per-endpoint forwarding in the
//! foreground.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunneldash_cli::config::DiskSettingsStore;
use tunneldash_client::HttpControlPlane;
use tunneldash_control::{process, CloudflaredController, DashboardSession, Toggled, TunnelView};

/// TunnelDash - resolve provider tunnels and forward them locally
#[derive(Parser, Debug)]
#[command(name = "tunneldash")]
#[command(about = "Dashboard for provider tunnels and local forwarding", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify an API key and select its first account
    Verify {
        /// Control-plane API token
        #[arg(long, env = "TUNNELDASH_API_KEY")]
        api_key: String,
    },
    /// List tunnels and their resolved endpoints
    List {
        /// Print the raw view model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forward an endpoint until Ctrl-C
    Connect {
        /// Endpoint host key, as shown by `list`
        host: String,
        /// Local port, overriding the resolved one
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show stored settings and connector version
    Status,
    /// Update display preferences
    Config {
        /// Hide HTTP/HTTPS endpoints
        #[arg(long)]
        hide_http: Option<bool>,
        /// Hide origin-IP telemetry
        #[arg(long)]
        hide_ip: Option<bool>,
        /// Hide offline tunnels
        #[arg(long)]
        hide_offline: Option<bool>,
        /// Default local port for endpoints without one
        #[arg(long)]
        port_start: Option<String>,
    },
    /// Stop all forwarding and wipe stored settings
    Reset,
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_session() -> Result<DashboardSession> {
    let store = Arc::new(DiskSettingsStore::new()?);
    let client = Arc::new(HttpControlPlane::new());
    let controller = Arc::new(CloudflaredController::new());
    Ok(DashboardSession::new(client, controller, store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut session = build_session()?;

    match cli.command {
        Commands::Verify { api_key } => {
            session.update_settings(|s| s.api_key = api_key);
            let account = session.verify().await?;
            println!("Verified. Using account {} ({})", account.name, account.id);
        }
        Commands::List { json } => {
            session.reload().await?;
            let views = session.view();
            if json {
                println!("{}", render_json(&views)?);
            } else {
                render_views(&views, &session);
            }
        }
        Commands::Connect { host, port } => {
            session.reload().await?;
            match session.toggle(&host, port).await? {
                Toggled::Started {
                    host,
                    local_port,
                    protocol,
                } => {
                    println!("Forwarding {host} ({protocol}) on localhost:{local_port}");
                    println!("Press Ctrl-C to stop");
                    tokio::signal::ctrl_c().await?;
                    session.toggle(&host, None).await?;
                    println!("Stopped {host}");
                }
                Toggled::Stopped { host } => {
                    // a fresh process starts with an empty active set, so
                    // this only happens if the host raced another toggle
                    println!("Stopped {host}");
                }
            }
        }
        Commands::Status => {
            let settings = session.settings();
            println!(
                "Account:  {}",
                settings
                    .account_name
                    .as_deref()
                    .unwrap_or("(not verified)")
            );
            println!("Verified: {}", session.is_verified());
            println!("Port start: {}", settings.port_start);
            println!(
                "Filters:  hide_http={} hide_ip={} hide_offline={}",
                settings.hide_http, settings.hide_ip, settings.hide_offline
            );

            let version = match process::probe_version().await {
                Some(version) => version,
                None => {
                    // fall back to what tunnel telemetry reports
                    if session.is_verified() {
                        let _ = session.reload().await;
                    }
                    session
                        .telemetry_client_version()
                        .unwrap_or_else(|| "unknown".to_string())
                }
            };
            println!("Connector: {version}");
        }
        Commands::Config {
            hide_http,
            hide_ip,
            hide_offline,
            port_start,
        } => {
            session.update_settings(|s| {
                if let Some(hide_http) = hide_http {
                    s.hide_http = hide_http;
                }
                if let Some(hide_ip) = hide_ip {
                    s.hide_ip = hide_ip;
                }
                if let Some(hide_offline) = hide_offline {
                    s.hide_offline = hide_offline;
                }
                if let Some(port_start) = port_start {
                    s.port_start = port_start;
                }
            });
            // keep whatever was entered, but say when it won't work
            if !session.settings().is_port_start_valid() {
                println!(
                    "Warning: port start {:?} is not a port between 1024 and 65535",
                    session.settings().port_start
                );
            }
            info!("settings updated");
            println!("Settings saved");
        }
        Commands::Reset => {
            session.clear_all().await;
            println!("Stopped all forwarding and cleared stored settings");
        }
    }

    Ok(())
}

fn render_views(views: &[TunnelView], session: &DashboardSession) {
    if views.is_empty() {
        println!("No tunnels");
        return;
    }

    let active = session.active_hosts();
    for view in views {
        let status = view.status.as_deref().unwrap_or("unknown");
        println!("{} [{}] ({})", view.name, view.health.as_str(), status);

        if view.connection_count > 0 {
            let ip = view.connection_ip.as_deref().unwrap_or("hidden");
            println!(
                "  connections: {} via {} from {}",
                view.connection_count,
                view.colo_names.join(", "),
                ip
            );
        }

        for endpoint in &view.display_endpoints {
            let marker = if active.contains(&endpoint.host) {
                "*"
            } else {
                " "
            };
            let port = endpoint
                .local_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                " {} {}  {}  local port {}",
                marker, endpoint.host, endpoint.service, port
            );
        }

        if view.hidden_http_count > 0 {
            println!("   ({} hidden by the HTTP filter)", view.hidden_http_count);
        }
    }
}

fn render_json(views: &[TunnelView]) -> Result<String> {
    let value: Vec<serde_json::Value> = views
        .iter()
        .map(|view| {
            serde_json::json!({
                "id": view.id,
                "name": view.name,
                "status": view.status,
                "health": view.health.as_str(),
                "created_at": view.created_at,
                "connection_ip": view.connection_ip,
                "client_version": view.client_version,
                "connection_count": view.connection_count,
                "colo_names": view.colo_names,
                "hidden_http_count": view.hidden_http_count,
                "connect_service": view.connect_service,
                "connect_host": view.connect_host,
                "endpoints": view.display_endpoints.iter().map(|e| {
                    serde_json::json!({
                        "service": e.service,
                        "protocol": e.protocol,
                        "hostname": e.hostname,
                        "host": e.host,
                        "local_port": e.local_port,
                    })
                }).collect::<Vec<_>>(),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&value)?)
}
