//! HTTP implementation of the control-plane contract
//!
//! Talks to the provider's v4 REST API with bearer-token auth and unwraps
//! the `{success, errors, result}` envelope: a populated `errors` array maps
//! to [`ClientError::Api`] carrying the first provider message, a missing
//! `result` maps to an empty collection.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use tunneldash_proto::{Account, ApiEnvelope, IngressRule, TunnelConfiguration, TunnelRecord};

use crate::api::ControlPlane;
use crate::error::ClientError;

/// Base URL of the provider's control-plane API
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// reqwest-backed control-plane client
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
}

impl HttpControlPlane {
    /// Create a client against the provider's production API
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    /// Create a client against an alternate base URL (tests, gateways)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// GET an envelope-wrapped payload, mapping provider errors to
    /// [`ClientError::Api`]
    async fn get_envelope<T: DeserializeOwned + Default>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<ApiEnvelope<T>, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "control plane request");

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        let envelope: ApiEnvelope<T> = response.json().await?;

        if !status.is_success() {
            return Err(ClientError::api(envelope.first_error()));
        }

        Ok(envelope)
    }
}

impl Default for HttpControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn list_accounts(&self, token: &str) -> Result<Vec<Account>, ClientError> {
        let envelope: ApiEnvelope<Vec<Account>> = self.get_envelope("/accounts", token).await?;
        unwrap_list(envelope)
    }

    async fn list_tunnels(
        &self,
        token: &str,
        account_id: &str,
    ) -> Result<Vec<TunnelRecord>, ClientError> {
        let path = format!("/accounts/{account_id}/cfd_tunnel?is_deleted=false");
        let envelope: ApiEnvelope<Vec<TunnelRecord>> = self.get_envelope(&path, token).await?;
        unwrap_list(envelope)
    }

    async fn tunnel_ingress(
        &self,
        token: &str,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<Vec<IngressRule>, ClientError> {
        let path = format!("/accounts/{account_id}/cfd_tunnel/{tunnel_id}/configurations");
        let envelope: ApiEnvelope<TunnelConfiguration> = self.get_envelope(&path, token).await?;

        if envelope.has_errors() {
            return Err(ClientError::api(envelope.first_error()));
        }

        Ok(envelope.result.unwrap_or_default().into_rules())
    }
}

/// Unwrap a list envelope: provider errors fail, a missing result is empty
fn unwrap_list<T>(envelope: ApiEnvelope<Vec<T>>) -> Result<Vec<T>, ClientError> {
    if envelope.has_errors() {
        return Err(ClientError::api(envelope.first_error()));
    }
    Ok(envelope.result.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts_envelope(json: &str) -> ApiEnvelope<Vec<Account>> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn unwrap_list_surfaces_provider_message() {
        let envelope =
            accounts_envelope(r#"{"success": false, "errors": [{"message": "Invalid API token"}]}"#);
        let err = unwrap_list(envelope).unwrap_err();
        assert_eq!(err.to_string(), "Invalid API token");
    }

    #[test]
    fn unwrap_list_defaults_message_when_provider_gives_none() {
        let envelope = accounts_envelope(r#"{"success": false, "errors": [{}]}"#);
        let err = unwrap_list(envelope).unwrap_err();
        assert_eq!(err.to_string(), "control plane request failed");
    }

    #[test]
    fn unwrap_list_treats_missing_result_as_empty() {
        let envelope = accounts_envelope(r#"{"success": true}"#);
        assert!(unwrap_list(envelope).unwrap().is_empty());
    }

    #[test]
    fn unwrap_list_passes_payload_through() {
        let envelope = accounts_envelope(
            r#"{"success": true, "result": [{"id": "a1", "name": "Primary"}]}"#,
        );
        let accounts = unwrap_list(envelope).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, "a1");
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = HttpControlPlane::with_base_url("http://localhost:8787/");
        assert_eq!(client.base_url, "http://localhost:8787");
    }
}
