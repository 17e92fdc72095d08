use serde::{Deserialize, Serialize};

/// An account the API token has access to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque account identifier
    pub id: String,
    /// Human-readable account name
    pub name: String,
}

/// A live connection reported for a tunnel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Connection identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Connector UUID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Point-of-presence (colo) the connection terminates at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colo_name: Option<String>,
    /// IP address the connector dialed out from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_ip: Option<String>,
    /// Connector software version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
    /// When the connection was opened (RFC 3339, provider-formatted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<String>,
    /// Whether the connector is waiting to reconnect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pending_reconnect: Option<bool>,
}

/// One tunnel as reported by the control plane
///
/// `status` is free-text and provider-defined; callers classify it by
/// substring rather than matching exact values. `metadata` is an untyped
/// bag that may embed a legacy port-mapping table — see
/// [`crate::metadata::TunnelMetadata`] for the typed view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelRecord {
    /// Opaque tunnel identifier, stable across reloads
    pub id: String,
    /// Tunnel display name
    pub name: String,
    /// Free-text health status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation timestamp (RFC 3339, kept verbatim)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Untyped key-value bag attached to the tunnel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Live connections, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Connection>>,
}

/// One ingress rule from a tunnel's routing configuration
///
/// Both fields are optional on the wire; rules missing either one are not
/// independently connectable and get dropped during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Scheme-like descriptor of the proxied service (`tcp://db:5432`, `ssh`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Externally reachable hostname for this rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// A single error entry in a provider response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Provider error message, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The provider's standard `{success, errors, result}` response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the provider considered the call successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Error entries; populated means the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ApiMessage>>,
    /// The payload, absent on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// First provider error message, if the envelope carries any errors
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .as_deref()
            .and_then(|errs| errs.iter().find_map(|e| e.message.as_deref()))
    }

    /// Whether the envelope carries at least one error entry
    pub fn has_errors(&self) -> bool {
        self.errors.as_deref().is_some_and(|errs| !errs.is_empty())
    }
}

/// Payload of the tunnel configurations endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<IngressConfig>,
}

/// The `config` object nested inside a configurations response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngressConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Vec<IngressRule>>,
}

impl TunnelConfiguration {
    /// Flatten the nested response into its ingress rules
    pub fn into_rules(self) -> Vec<IngressRule> {
        self.config.and_then(|c| c.ingress).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_first_error_picks_first_message() {
        let env: ApiEnvelope<Vec<Account>> = serde_json::from_str(
            r#"{"success": false, "errors": [{"message": "Invalid API token"}, {"message": "second"}]}"#,
        )
        .unwrap();
        assert!(env.has_errors());
        assert_eq!(env.first_error(), Some("Invalid API token"));
        assert!(env.result.is_none());
    }

    #[test]
    fn envelope_skips_messageless_errors() {
        let env: ApiEnvelope<Vec<Account>> =
            serde_json::from_str(r#"{"errors": [{"code": 10000}, {"message": "real one"}]}"#)
                .unwrap();
        assert_eq!(env.first_error(), Some("real one"));
    }

    #[test]
    fn tunnel_record_tolerates_sparse_payloads() {
        let record: TunnelRecord =
            serde_json::from_str(r#"{"id": "t1", "name": "edge"}"#).unwrap();
        assert_eq!(record.id, "t1");
        assert!(record.status.is_none());
        assert!(record.metadata.is_none());
        assert!(record.connections.is_none());
    }

    #[test]
    fn configuration_flattens_to_rules() {
        let cfg: TunnelConfiguration = serde_json::from_str(
            r#"{"config": {"ingress": [{"service": "tcp://db:5432", "hostname": "db.example.com"}]}}"#,
        )
        .unwrap();
        let rules = cfg.into_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].service.as_deref(), Some("tcp://db:5432"));
        assert_eq!(rules[0].hostname.as_deref(), Some("db.example.com"));
    }

    #[test]
    fn configuration_without_config_yields_no_rules() {
        let cfg: TunnelConfiguration = serde_json::from_str("{}").unwrap();
        assert!(cfg.into_rules().is_empty());
    }
}
