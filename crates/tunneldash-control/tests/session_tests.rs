//! Session tests over fake collaborators
//!
//! Drives the full verify -> reload -> toggle -> clear flow with an
//! in-memory control plane, forwarding controller, and settings store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tunneldash_client::{ClientError, ControlPlane};
use tunneldash_control::{
    DashboardSession, ForwardController, ForwardError, SessionError, Settings, SettingsStore,
    StoredSettings, Toggled,
};
use tunneldash_proto::{Account, IngressRule, TunnelRecord};

/// Scriptable in-memory control plane
#[derive(Default)]
struct FakeControlPlane {
    accounts: Vec<Account>,
    tunnels: Vec<TunnelRecord>,
    ingress: HashMap<String, Vec<IngressRule>>,
    /// Tunnel ids whose ingress fetch fails
    failing_ingress: HashSet<String>,
    /// When set, the tunnel listing itself fails
    fail_tunnels: bool,
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_accounts(&self, _token: &str) -> Result<Vec<Account>, ClientError> {
        Ok(self.accounts.clone())
    }

    async fn list_tunnels(
        &self,
        _token: &str,
        _account_id: &str,
    ) -> Result<Vec<TunnelRecord>, ClientError> {
        if self.fail_tunnels {
            return Err(ClientError::Api("tunnel listing unavailable".to_string()));
        }
        Ok(self.tunnels.clone())
    }

    async fn tunnel_ingress(
        &self,
        _token: &str,
        _account_id: &str,
        tunnel_id: &str,
    ) -> Result<Vec<IngressRule>, ClientError> {
        if self.failing_ingress.contains(tunnel_id) {
            return Err(ClientError::Api("configuration fetch failed".to_string()));
        }
        Ok(self.ingress.get(tunnel_id).cloned().unwrap_or_default())
    }
}

/// Counting fake forwarding controller
#[derive(Default)]
struct FakeController {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

#[async_trait]
impl ForwardController for FakeController {
    async fn start(
        &self,
        _host: &str,
        _local_port: u16,
        _protocol: &str,
    ) -> Result<(), ForwardError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _host: &str) -> Result<(), ForwardError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory settings store recording every save
#[derive(Default)]
struct MemoryStore {
    stored: Mutex<Option<StoredSettings>>,
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> StoredSettings {
        self.stored.lock().unwrap().clone().unwrap_or_default()
    }

    fn save(&self, settings: &Settings, verified: bool) {
        *self.stored.lock().unwrap() = Some(StoredSettings {
            settings: settings.clone(),
            verified,
        });
    }

    fn clear(&self) {
        *self.stored.lock().unwrap() = None;
    }
}

fn tunnel(id: &str, name: &str, status: Option<&str>, metadata: Option<serde_json::Value>) -> TunnelRecord {
    TunnelRecord {
        id: id.to_string(),
        name: name.to_string(),
        status: status.map(|s| s.to_string()),
        metadata,
        ..Default::default()
    }
}

fn rule(service: &str, hostname: &str) -> IngressRule {
    IngressRule {
        service: Some(service.to_string()),
        hostname: Some(hostname.to_string()),
    }
}

fn control_plane_fixture() -> FakeControlPlane {
    let mut plane = FakeControlPlane {
        accounts: vec![
            Account {
                id: "acct-1".to_string(),
                name: "Primary".to_string(),
            },
            Account {
                id: "acct-2".to_string(),
                name: "Secondary".to_string(),
            },
        ],
        ..FakeControlPlane::default()
    };
    plane.tunnels = vec![
        tunnel(
            "t1",
            "database",
            Some("healthy"),
            Some(json!({"tunneldashPort": {"tcp-a": 15432}})),
        ),
        tunnel("t2", "broken", Some("healthy"), None),
    ];
    plane.ingress.insert(
        "t1".to_string(),
        vec![
            rule("tcp://db:5432", "db.example.com"),
            rule("http_status:404", "catchall"),
        ],
    );
    plane.failing_ingress.insert("t2".to_string());
    plane
}

fn session_with(plane: FakeControlPlane) -> (DashboardSession, Arc<FakeController>, Arc<MemoryStore>) {
    let controller = Arc::new(FakeController::default());
    let store = Arc::new(MemoryStore::default());
    let session = DashboardSession::new(Arc::new(plane), controller.clone(), store.clone());
    (session, controller, store)
}

#[tokio::test]
async fn verify_selects_first_account_and_persists() {
    let (mut session, _controller, store) = session_with(control_plane_fixture());
    session.update_settings(|s| s.api_key = " secret-token ".to_string());

    let account = session.verify().await.unwrap();
    assert_eq!(account.id, "acct-1");
    assert!(session.is_verified());

    let stored = store.load();
    assert!(stored.verified);
    assert_eq!(stored.settings.account_id.as_deref(), Some("acct-1"));
    assert_eq!(stored.settings.account_name.as_deref(), Some("Primary"));
}

#[tokio::test]
async fn verify_without_key_or_accounts_fails() {
    let (mut session, _, _) = session_with(FakeControlPlane::default());
    let err = session.verify().await.unwrap_err();
    assert!(matches!(err, SessionError::MissingApiKey));

    session.update_settings(|s| s.api_key = "secret".to_string());
    let err = session.verify().await.unwrap_err();
    assert!(matches!(err, SessionError::NoAccounts));
    assert!(!session.is_verified());
}

#[tokio::test]
async fn reload_keeps_tunnels_whose_ingress_fetch_fails() {
    let (mut session, _, _) = session_with(control_plane_fixture());
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();
    session.reload().await.unwrap();

    // both tunnels survive, only one contributes endpoints, and the
    // synthetic catch-all is gone
    assert_eq!(session.tunnels().len(), 2);
    assert_eq!(session.endpoints().len(), 1);
    let endpoint = &session.endpoints()[0];
    assert_eq!(endpoint.host, "db.example.com");
    assert_eq!(endpoint.protocol.as_deref(), Some("tcp"));
    assert_eq!(endpoint.local_port, Some(15432));
}

#[tokio::test]
async fn reload_failure_clears_topology() {
    let mut plane = control_plane_fixture();
    plane.fail_tunnels = true;
    let (mut session, _, _) = session_with(plane);
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();

    let err = session.reload().await.unwrap_err();
    assert!(matches!(err, SessionError::Client(_)));
    assert!(session.tunnels().is_empty());
    assert!(session.endpoints().is_empty());
}

#[tokio::test]
async fn reload_never_touches_the_active_set() {
    let (mut session, _, _) = session_with(control_plane_fixture());
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();
    session.reload().await.unwrap();
    session.toggle("db.example.com", None).await.unwrap();

    session.reload().await.unwrap();
    assert!(session.active_hosts().contains("db.example.com"));
}

#[tokio::test]
async fn toggle_round_trip_through_the_session() {
    let (mut session, controller, _) = session_with(control_plane_fixture());
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();
    session.reload().await.unwrap();

    let outcome = session.toggle("db.example.com", None).await.unwrap();
    assert_eq!(
        outcome,
        Toggled::Started {
            host: "db.example.com".to_string(),
            local_port: 15432,
            protocol: "tcp".to_string(),
        }
    );
    assert!(session.active_hosts().contains("db.example.com"));

    let outcome = session.toggle("db.example.com", None).await.unwrap();
    assert!(matches!(outcome, Toggled::Stopped { .. }));
    assert!(session.active_hosts().is_empty());
    assert_eq!(controller.starts.load(Ordering::SeqCst), 1);
    assert_eq!(controller.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn toggle_unknown_host_is_rejected() {
    let (mut session, controller, _) = session_with(control_plane_fixture());
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();
    session.reload().await.unwrap();

    let err = session.toggle("nope.example.com", None).await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownHost(_)));
    assert_eq!(controller.starts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn toggle_port_override_wins_over_resolution() {
    let (mut session, _, _) = session_with(control_plane_fixture());
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();
    session.reload().await.unwrap();

    let outcome = session.toggle("db.example.com", Some(16000)).await.unwrap();
    assert_eq!(
        outcome,
        Toggled::Started {
            host: "db.example.com".to_string(),
            local_port: 16000,
            protocol: "tcp".to_string(),
        }
    );
}

#[tokio::test]
async fn clear_all_stops_hosts_and_wipes_settings() {
    let (mut session, controller, store) = session_with(control_plane_fixture());
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();
    session.reload().await.unwrap();
    session.toggle("db.example.com", None).await.unwrap();

    session.clear_all().await;

    assert_eq!(controller.stops.load(Ordering::SeqCst), 1);
    assert!(session.active_hosts().is_empty());
    assert!(session.tunnels().is_empty());
    assert!(!session.is_verified());
    assert_eq!(session.settings(), &Settings::default());
    assert_eq!(store.load(), StoredSettings::default());
}

#[tokio::test]
async fn view_reflects_current_preferences() {
    let mut plane = control_plane_fixture();
    plane.ingress.insert(
        "t2".to_string(),
        vec![rule("http://localhost:3000", "app.example.com")],
    );
    plane.failing_ingress.clear();

    let (mut session, _, _) = session_with(plane);
    session.update_settings(|s| s.api_key = "secret".to_string());
    session.verify().await.unwrap();
    session.reload().await.unwrap();

    let plain = session.view();
    assert_eq!(plain.len(), 2);

    session.update_settings(|s| s.hide_http = true);
    let filtered = session.view();
    let broken = filtered.iter().find(|v| v.id == "t2").unwrap();
    assert_eq!(broken.hidden_http_count, 1);
    assert!(broken.display_endpoints.is_empty());
}
