//! Dashboard session
//!
//! The single owner of dashboard state: settings, the verification flag,
//! the resolved topology, and the lifecycle manager. Every mutation funnels
//! through a named method here, so concurrent callers never touch shared
//! state directly.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use tunneldash_client::{ClientError, ControlPlane};
use tunneldash_proto::Account;

use crate::lifecycle::{ForwardController, LifecycleError, LifecycleManager, Toggled};
use crate::settings::{Settings, SettingsStore, StoredSettings};
use crate::topology::{self, Endpoint, Topology, TunnelSummary};
use crate::view::{present, TunnelView};

/// Errors surfaced by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("set an API key before verifying")]
    MissingApiKey,

    #[error("verify an API key and account before loading tunnels")]
    NotVerified,

    #[error("no accounts returned for this API key")]
    NoAccounts,

    #[error("no endpoint with host {0}")]
    UnknownHost(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Owns all dashboard state; see the module docs
pub struct DashboardSession {
    client: Arc<dyn ControlPlane>,
    store: Arc<dyn SettingsStore>,
    lifecycle: LifecycleManager,
    settings: Settings,
    verified: bool,
    topology: Topology,
}

impl DashboardSession {
    /// Create a session, hydrating settings from the store
    pub fn new(
        client: Arc<dyn ControlPlane>,
        controller: Arc<dyn ForwardController>,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        let StoredSettings { settings, verified } = store.load();
        Self {
            client,
            store,
            lifecycle: LifecycleManager::new(controller),
            settings,
            verified,
            topology: Topology::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn tunnels(&self) -> &[TunnelSummary] {
        &self.topology.tunnels
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.topology.endpoints
    }

    /// Hosts currently believed to be forwarding
    pub fn active_hosts(&self) -> HashSet<String> {
        self.lifecycle.active_hosts()
    }

    /// Apply a settings change and persist it immediately, so a restart
    /// keeps whatever the user just entered
    pub fn update_settings<F: FnOnce(&mut Settings)>(&mut self, apply: F) {
        apply(&mut self.settings);
        self.store.save(&self.settings, self.verified);
    }

    /// Verify the API key: the first account the token can access becomes
    /// the selected account and the session is marked verified.
    pub async fn verify(&mut self) -> Result<Account, SessionError> {
        let token = self.settings.api_key.trim().to_string();
        if token.is_empty() {
            return Err(SessionError::MissingApiKey);
        }

        let accounts = self.client.list_accounts(&token).await?;
        let account = accounts
            .into_iter()
            .next()
            .ok_or(SessionError::NoAccounts)?;

        info!(account_id = %account.id, account_name = %account.name, "API key verified");
        self.settings.account_id = Some(account.id.clone());
        self.settings.account_name = Some(account.name.clone());
        self.verified = true;
        self.store.save(&self.settings, true);
        Ok(account)
    }

    /// Replace the topology with a fresh resolve.
    ///
    /// A tunnel-list failure clears the topology and surfaces the error;
    /// per-tunnel ingress failures are non-fatal. The active set is never
    /// touched by a reload.
    pub async fn reload(&mut self) -> Result<(), SessionError> {
        let (token, account_id) = self.credentials()?;
        match topology::resolve(self.client.as_ref(), &token, &account_id).await {
            Ok(topology) => {
                self.topology = topology;
                Ok(())
            }
            Err(err) => {
                self.topology = Topology::default();
                Err(err.into())
            }
        }
    }

    /// Toggle forwarding for the endpoint with this host key. An explicit
    /// port overrides the endpoint's resolved local port.
    pub async fn toggle(
        &self,
        host: &str,
        port_override: Option<u16>,
    ) -> Result<Toggled, SessionError> {
        let endpoint = self
            .topology
            .endpoints
            .iter()
            .find(|e| e.host == host)
            .ok_or_else(|| SessionError::UnknownHost(host.to_string()))?;

        let endpoint = match port_override {
            Some(port) => Endpoint {
                local_port: Some(port),
                ..endpoint.clone()
            },
            None => endpoint.clone(),
        };

        Ok(self.lifecycle.toggle(&endpoint, &self.settings).await?)
    }

    /// Project the current topology through the current preferences
    pub fn view(&self) -> Vec<TunnelView> {
        present(
            &self.topology.tunnels,
            &self.topology.endpoints,
            &self.settings,
        )
    }

    /// Tear everything down: best-effort stop of all forwarding, wipe the
    /// stored settings, and reset in-memory state to defaults. The wipe
    /// proceeds regardless of stop outcomes.
    pub async fn clear_all(&mut self) {
        self.lifecycle.clear_all().await;
        self.store.clear();
        self.settings = Settings::default();
        self.verified = false;
        self.topology = Topology::default();
    }

    /// Connector version reported by tunnel telemetry, if any tunnel
    /// carries one
    pub fn telemetry_client_version(&self) -> Option<String> {
        self.topology
            .tunnels
            .iter()
            .find_map(|t| t.client_version.clone())
    }

    fn credentials(&self) -> Result<(String, String), SessionError> {
        let token = self.settings.api_key.trim();
        match (token.is_empty(), self.settings.account_id.as_deref()) {
            (false, Some(account_id)) => Ok((token.to_string(), account_id.to_string())),
            _ => Err(SessionError::NotVerified),
        }
    }
}
