//! View projection
//!
//! Applies display preferences to the resolved topology and produces the
//! presentation ordering. This is a pure projection: it never mutates the
//! underlying summaries or endpoints and is safe to recompute on every
//! preference change.

use crate::settings::Settings;
use crate::topology::{is_reported_down, is_reported_up, Endpoint, Health, TunnelSummary};

/// One tunnel as presented to the user
#[derive(Debug, Clone, PartialEq)]
pub struct TunnelView {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
    pub health: Health,
    pub created_at: Option<String>,
    /// Representative origin IP; suppressed entirely by the IP filter
    pub connection_ip: Option<String>,
    pub client_version: Option<String>,
    pub connection_count: usize,
    pub colo_names: Vec<String>,
    /// Every resolved endpoint for this tunnel
    pub endpoints: Vec<Endpoint>,
    /// Endpoints after the HTTP filter
    pub display_endpoints: Vec<Endpoint>,
    /// How many endpoints the HTTP filter removed
    pub hidden_http_count: usize,
    /// Service of the suggested connect target
    pub connect_service: Option<String>,
    /// Host key of the suggested connect target
    pub connect_host: Option<String>,
}

/// Project the topology through display preferences.
///
/// Tunnels classified offline are dropped when `hide_offline` is set;
/// the rest are stably partitioned with healthy/online tunnels first,
/// ties preserving arrival order.
pub fn present(
    tunnels: &[TunnelSummary],
    endpoints: &[Endpoint],
    settings: &Settings,
) -> Vec<TunnelView> {
    let mut views: Vec<TunnelView> = tunnels
        .iter()
        .filter(|t| !(settings.hide_offline && is_reported_down(t.status.as_deref())))
        .map(|t| project_tunnel(t, endpoints, settings))
        .collect();

    views.sort_by_key(|v| !is_reported_up(v.status.as_deref()));
    views
}

fn project_tunnel(
    tunnel: &TunnelSummary,
    endpoints: &[Endpoint],
    settings: &Settings,
) -> TunnelView {
    let all: Vec<Endpoint> = endpoints
        .iter()
        .filter(|e| e.tunnel_id == tunnel.id)
        .cloned()
        .collect();

    let display: Vec<Endpoint> = if settings.hide_http {
        all.iter().filter(|e| !e.is_http()).cloned().collect()
    } else {
        all.clone()
    };

    let hidden_http_count = all.len() - display.len();
    // The filtered list picks the connect target, but a fully hidden tunnel
    // still suggests something so the UI can explain why it is unreachable.
    let connect = display.first().or_else(|| all.first());
    let connect_service = connect.map(|e| e.service.clone());
    let connect_host = connect.map(|e| e.host.clone());

    TunnelView {
        id: tunnel.id.clone(),
        name: tunnel.name.clone(),
        status: tunnel.status.clone(),
        health: tunnel.health(),
        created_at: tunnel.created_at.clone(),
        connection_ip: if settings.hide_ip {
            None
        } else {
            tunnel.connection_ip.clone()
        },
        client_version: tunnel.client_version.clone(),
        connection_count: tunnel.connection_count,
        colo_names: tunnel.colo_names.clone(),
        endpoints: all,
        display_endpoints: display,
        hidden_http_count,
        connect_service,
        connect_host,
    }
}
