use async_trait::async_trait;
use tunneldash_proto::{Account, IngressRule, TunnelRecord};

use crate::error::ClientError;

/// The slice of the provider's control-plane API the dashboard consumes.
///
/// All calls are token-authenticated and read-only. Implementations decide
/// transport; the resolver and session only depend on this trait.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// List the accounts the token can access
    async fn list_accounts(&self, token: &str) -> Result<Vec<Account>, ClientError>;

    /// List the account's tunnels (deleted ones excluded)
    async fn list_tunnels(
        &self,
        token: &str,
        account_id: &str,
    ) -> Result<Vec<TunnelRecord>, ClientError>;

    /// Fetch one tunnel's ingress rules
    async fn tunnel_ingress(
        &self,
        token: &str,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<Vec<IngressRule>, ClientError>;
}
