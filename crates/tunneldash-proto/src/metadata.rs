//! Typed view of the untyped tunnel metadata bag
//!
//! Some deployments stash a legacy port-mapping table inside tunnel
//! metadata. The table lives under the `tunneldashPort` key: when that value
//! is an object, its keys are `"<proto>-<suffix>"`-style host identifiers
//! and its values are local port numbers. A scalar value under the same key
//! (or one of the older key spellings) is a tunnel-level fallback port
//! instead. All of this is parsed in one place here so the rest of the
//! resolver never touches raw JSON.

use serde_json::Value;

/// Metadata keys consulted for the tunnel-level fallback port, newest first.
/// The first key that is *present* wins; its value is coerced or discarded
/// without falling through to the older spellings.
const FALLBACK_PORT_KEYS: &[&str] = &["tunneldashPort", "tunnelPort", "port", "startPort"];

/// The metadata key that may hold the legacy port-map table
const PORT_MAP_KEY: &str = "tunneldashPort";

/// One entry of the legacy port-map table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapEntry {
    /// Host identifier the entry is keyed by
    pub host: String,
    /// Local port mapped for that host
    pub port: u16,
    /// Protocol token extracted from the host key (`tcp-a` -> `tcp`)
    pub proto: Option<String>,
}

/// Parsed form of a tunnel's metadata bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelMetadata {
    /// Tunnel-level fallback port, when a scalar port key was present
    pub fallback_port: Option<u16>,
    /// Legacy port-map entries, in provider order
    pub port_map: Vec<PortMapEntry>,
}

impl TunnelMetadata {
    /// Parse the untyped metadata bag, dropping malformed entries silently
    pub fn parse(metadata: Option<&Value>) -> Self {
        let Some(Value::Object(bag)) = metadata else {
            return Self::default();
        };

        // a null value counts as absent, anything else consumes the chain
        let fallback_port = FALLBACK_PORT_KEYS
            .iter()
            .find_map(|key| bag.get(*key).filter(|v| !v.is_null()))
            .and_then(coerce_port);

        let port_map = match bag.get(PORT_MAP_KEY) {
            Some(Value::Object(table)) => table
                .iter()
                .filter_map(|(host, value)| {
                    let port = coerce_port(value)?;
                    Some(PortMapEntry {
                        host: host.clone(),
                        port,
                        proto: proto_token(host),
                    })
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            fallback_port,
            port_map,
        }
    }

    /// Whether the bag contributed anything usable
    pub fn is_empty(&self) -> bool {
        self.fallback_port.is_none() && self.port_map.is_empty()
    }
}

/// Coerce a JSON value into a port number: integers and numeric strings
/// qualify, everything else is dropped.
fn coerce_port(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (port > 0).then_some(port)
}

/// Token before the first `-` of a port-map host key, empty means none
fn proto_token(host: &str) -> Option<String> {
    let token = host.split('-').next().unwrap_or_default();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_port_map_table() {
        let meta = json!({
            "tunneldashPort": {
                "tcp-a": 15432,
                "ssh-bastion": "2222",
                "web": 8080
            }
        });
        let parsed = TunnelMetadata::parse(Some(&meta));

        assert_eq!(parsed.port_map.len(), 3);
        assert_eq!(
            parsed.port_map[0],
            PortMapEntry {
                host: "tcp-a".into(),
                port: 15432,
                proto: Some("tcp".into()),
            }
        );
        // numeric strings coerce
        assert_eq!(parsed.port_map[1].port, 2222);
        assert_eq!(parsed.port_map[1].proto.as_deref(), Some("ssh"));
        // no dash: the whole key doubles as the proto token
        assert_eq!(parsed.port_map[2].proto.as_deref(), Some("web"));
        // an object under the key is not a scalar fallback port
        assert!(parsed.fallback_port.is_none());
    }

    #[test]
    fn drops_malformed_port_map_entries() {
        let meta = json!({
            "tunneldashPort": {
                "tcp-ok": 15432,
                "tcp-bad": "not-a-port",
                "tcp-zero": 0,
                "tcp-huge": 700000,
                "tcp-null": null
            }
        });
        let parsed = TunnelMetadata::parse(Some(&meta));
        assert_eq!(parsed.port_map.len(), 1);
        assert_eq!(parsed.port_map[0].host, "tcp-ok");
    }

    #[test]
    fn fallback_port_first_present_key_wins() {
        let meta = json!({"tunnelPort": 15000, "port": 16000});
        let parsed = TunnelMetadata::parse(Some(&meta));
        assert_eq!(parsed.fallback_port, Some(15000));
    }

    #[test]
    fn fallback_port_does_not_fall_through_past_a_present_key() {
        // `tunneldashPort` is present but unusable as a scalar, so the older
        // spellings are never consulted.
        let meta = json!({"tunneldashPort": {"tcp-a": 15432}, "port": 16000});
        let parsed = TunnelMetadata::parse(Some(&meta));
        assert!(parsed.fallback_port.is_none());
        assert_eq!(parsed.port_map.len(), 1);
    }

    #[test]
    fn fallback_port_skips_null_keys() {
        let meta = json!({"tunneldashPort": null, "port": 16000});
        let parsed = TunnelMetadata::parse(Some(&meta));
        assert_eq!(parsed.fallback_port, Some(16000));
    }

    #[test]
    fn fallback_port_from_numeric_string() {
        let meta = json!({"startPort": " 50000 "});
        let parsed = TunnelMetadata::parse(Some(&meta));
        assert_eq!(parsed.fallback_port, Some(50000));
    }

    #[test]
    fn non_object_metadata_yields_default() {
        assert!(TunnelMetadata::parse(None).is_empty());
        assert!(TunnelMetadata::parse(Some(&json!("text"))).is_empty());
        assert!(TunnelMetadata::parse(Some(&json!(null))).is_empty());
    }

    #[test]
    fn leading_dash_key_has_no_proto_token() {
        let meta = json!({"tunneldashPort": {"-odd": 1234}});
        let parsed = TunnelMetadata::parse(Some(&meta));
        assert_eq!(parsed.port_map[0].proto, None);
    }
}
