//! Topology resolution
//!
//! Converts raw control-plane data — tunnel records, per-tunnel ingress
//! rules, legacy port-map metadata, live connection telemetry — into a
//! normalized list of connectable [`Endpoint`]s, one per usable ingress
//! rule. Host and local-port resolution follow an explicit ordered list of
//! strategies, first success wins.

use futures::future::join_all;
use tracing::warn;
use tunneldash_client::{ClientError, ControlPlane};
use tunneldash_proto::metadata::{PortMapEntry, TunnelMetadata};
use tunneldash_proto::records::{IngressRule, TunnelRecord};
use tunneldash_proto::{parse_endpoint_address, parse_protocol};

/// Ingress rules with this service prefix are synthetic catch-alls, not
/// connectable services
const SYNTHETIC_SERVICE_PREFIX: &str = "http_status:";

/// Display classification of a tunnel's free-text status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Up,
    Down,
    Unknown,
}

impl Health {
    /// Classify a provider status string by substring, case-insensitive
    pub fn classify(status: Option<&str>) -> Self {
        if is_reported_up(status) {
            Health::Up
        } else if is_reported_down(status) {
            Health::Down
        } else {
            Health::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Up => "up",
            Health::Down => "down",
            Health::Unknown => "unknown",
        }
    }
}

/// Whether a status string reads as healthy/online
pub fn is_reported_up(status: Option<&str>) -> bool {
    status.is_some_and(|s| {
        let s = s.to_lowercase();
        s.contains("healthy") || s.contains("online")
    })
}

/// Whether a status string reads as offline/down
pub fn is_reported_down(status: Option<&str>) -> bool {
    status.is_some_and(|s| {
        let s = s.to_lowercase();
        s.contains("offline") || s.contains("down")
    })
}

/// One tunnel after summarization: identity, parsed metadata, and reduced
/// connection telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct TunnelSummary {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
    pub created_at: Option<String>,
    /// Typed view of the metadata bag
    pub metadata: TunnelMetadata,
    /// Origin IP of the first live connection (representative sample)
    pub connection_ip: Option<String>,
    /// Client version of the first live connection
    pub client_version: Option<String>,
    /// Number of live connections
    pub connection_count: usize,
    /// Deduplicated colo names across connections, first-seen order
    pub colo_names: Vec<String>,
}

impl TunnelSummary {
    /// Reduce a raw tunnel record into its summary
    pub fn summarize(record: &TunnelRecord) -> Self {
        let connections = record.connections.as_deref().unwrap_or_default();
        let first = connections.first();

        let mut colo_names: Vec<String> = Vec::new();
        for name in connections.iter().filter_map(|c| c.colo_name.clone()) {
            if !colo_names.contains(&name) {
                colo_names.push(name);
            }
        }

        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            status: record.status.clone(),
            created_at: record.created_at.clone(),
            metadata: TunnelMetadata::parse(record.metadata.as_ref()),
            connection_ip: first.and_then(|c| c.origin_ip.clone()),
            client_version: first.and_then(|c| c.client_version.clone()),
            connection_count: connections.len(),
            colo_names,
        }
    }

    pub fn health(&self) -> Health {
        Health::classify(self.status.as_deref())
    }
}

/// A single connectable endpoint derived from one ingress rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Parent tunnel, kept for display association only
    pub tunnel_id: String,
    /// The rule's service descriptor
    pub service: String,
    /// Protocol derived from the descriptor
    pub protocol: Option<String>,
    /// The rule's externally reachable hostname
    pub hostname: String,
    /// Resolved identity key, the unit the lifecycle manager locks on
    pub host: String,
    /// Resolved local port, when any resolution strategy produced one
    pub local_port: Option<u16>,
}

impl Endpoint {
    /// Whether this endpoint proxies plain HTTP or HTTPS
    pub fn is_http(&self) -> bool {
        matches!(self.protocol.as_deref(), Some("http") | Some("https"))
    }
}

/// The resolved topology: every known tunnel plus its connectable endpoints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub tunnels: Vec<TunnelSummary>,
    pub endpoints: Vec<Endpoint>,
}

impl Topology {
    /// Endpoints belonging to one tunnel, in ingress order
    pub fn endpoints_for<'a>(&'a self, tunnel_id: &'a str) -> impl Iterator<Item = &'a Endpoint> + 'a {
        self.endpoints
            .iter()
            .filter(move |e| e.tunnel_id == tunnel_id)
    }
}

/// Select the port-map entry for an endpoint: a `host` key matching the
/// rule's hostname wins over a `proto` match, which wins over the first
/// entry, regardless of table order.
fn pick_host_port<'a>(
    port_map: &'a [PortMapEntry],
    proto: Option<&str>,
    hostname: &str,
) -> Option<&'a PortMapEntry> {
    if port_map.is_empty() {
        return None;
    }
    if let Some(by_host) = port_map.iter().find(|p| p.host == hostname) {
        return Some(by_host);
    }
    if let Some(proto) = proto {
        if let Some(by_proto) = port_map.iter().find(|p| p.proto.as_deref() == Some(proto)) {
            return Some(by_proto);
        }
    }
    port_map.first()
}

/// Resolve the endpoint identity key through the ordered strategy list:
/// rule hostname, then port-map host, then parsed authority, then the
/// tunnel id as the last-resort key.
fn resolve_host(
    hostname: &str,
    entry: Option<&PortMapEntry>,
    service: &str,
    tunnel_id: &str,
) -> String {
    if !hostname.is_empty() {
        return hostname.to_string();
    }
    if let Some(entry) = entry {
        return entry.host.clone();
    }
    if let Some(authority) = parse_endpoint_address(service) {
        return authority;
    }
    tunnel_id.to_string()
}

/// Build the connectable endpoints for one tunnel from its ingress rules.
///
/// Synthetic catch-alls and rules missing either field are dropped; rule
/// order is preserved.
pub fn build_endpoints(summary: &TunnelSummary, rules: &[IngressRule]) -> Vec<Endpoint> {
    rules
        .iter()
        .filter_map(|rule| {
            let service = rule.service.as_deref().filter(|s| !s.is_empty())?;
            let hostname = rule.hostname.as_deref().filter(|h| !h.is_empty())?;
            if service.starts_with(SYNTHETIC_SERVICE_PREFIX) {
                return None;
            }

            let protocol = parse_protocol(service);
            let entry = pick_host_port(&summary.metadata.port_map, protocol.as_deref(), hostname);
            let host = resolve_host(hostname, entry, service, &summary.id);
            let local_port = entry
                .map(|e| e.port)
                .or(summary.metadata.fallback_port);

            Some(Endpoint {
                tunnel_id: summary.id.clone(),
                service: service.to_string(),
                protocol,
                hostname: hostname.to_string(),
                host,
                local_port,
            })
        })
        .collect()
}

/// Resolve the full topology for an account.
///
/// The tunnel listing is fatal on failure; a per-tunnel ingress failure is
/// logged and that tunnel is kept with zero endpoints so one bad tunnel
/// never hides the rest.
pub async fn resolve(
    client: &dyn ControlPlane,
    token: &str,
    account_id: &str,
) -> Result<Topology, ClientError> {
    let records = client.list_tunnels(token, account_id).await?;

    let resolved = join_all(records.iter().map(|record| async move {
        let summary = TunnelSummary::summarize(record);
        let endpoints = match client.tunnel_ingress(token, account_id, &record.id).await {
            Ok(rules) => build_endpoints(&summary, &rules),
            Err(err) => {
                warn!(tunnel_id = %record.id, %err, "ingress fetch failed, keeping tunnel without endpoints");
                Vec::new()
            }
        };
        (summary, endpoints)
    }))
    .await;

    let mut topology = Topology::default();
    for (summary, endpoints) in resolved {
        topology.tunnels.push(summary);
        topology.endpoints.extend(endpoints);
    }
    Ok(topology)
}
