//! Connection lifecycle management
//!
//! The [`LifecycleManager`] owns the authoritative set of currently
//! forwarding endpoint hosts and serializes start/stop per host key. The
//! external forwarding process is reached only through the
//! [`ForwardController`] contract, so tests drive the manager with
//! recording fakes.
//!
//! Locking discipline: the state mutex is taken to test-and-mark, released
//! for the external call, and retaken to apply the effect. The busy marker
//! is cleared by a drop guard, so the UI can never get stuck on "working" —
//! and the effect on the active set is applied before the guard releases
//! the marker.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::settings::Settings;
use crate::topology::Endpoint;

/// Errors from the external forwarding process
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to launch forwarding process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{0}")]
    Process(String),
}

/// Contract for the external process that performs the actual forwarding.
///
/// `stop` on a host that is not forwarding must not corrupt state; errors
/// are surfaced to the caller, never retried here.
#[async_trait]
pub trait ForwardController: Send + Sync {
    /// Start forwarding `host` on `localhost:<local_port>`
    async fn start(&self, host: &str, local_port: u16, protocol: &str) -> Result<(), ForwardError>;

    /// Stop forwarding `host`
    async fn stop(&self, host: &str) -> Result<(), ForwardError>;
}

/// What a successful toggle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggled {
    Started {
        host: String,
        local_port: u16,
        protocol: String,
    },
    Stopped {
        host: String,
    },
}

/// Errors from a toggle request
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The endpoint is hidden by the HTTP filter; no external call was made
    #[error("this endpoint is hidden by the HTTP/HTTPS filter; disable the filter to connect")]
    FilteredEndpoint,

    /// No resolution strategy produced a usable local port
    #[error("pick a valid local port before starting a connection")]
    InvalidPort,

    /// A lifecycle operation for this host is already in flight
    #[error("an operation is already in progress for {host}")]
    Busy { host: String },

    /// The external start/stop failed; the active set reflects reality
    #[error(transparent)]
    Controller(#[from] ForwardError),
}

#[derive(Default)]
struct LifecycleState {
    /// Hosts that completed a start and have not completed a stop
    active: HashSet<String>,
    /// Hosts with an in-flight operation
    busy: HashSet<String>,
}

/// Owns the active set and serializes lifecycle operations per host
pub struct LifecycleManager {
    controller: Arc<dyn ForwardController>,
    state: Mutex<LifecycleState>,
}

/// Clears the busy marker for a host when dropped, including on panic
struct BusyGuard<'a> {
    state: &'a Mutex<LifecycleState>,
    host: &'a str,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.busy.remove(self.host);
        }
    }
}

impl LifecycleManager {
    pub fn new(controller: Arc<dyn ForwardController>) -> Self {
        Self {
            controller,
            state: Mutex::new(LifecycleState::default()),
        }
    }

    /// Snapshot of the hosts currently believed to be forwarding
    pub fn active_hosts(&self) -> HashSet<String> {
        self.state.lock().unwrap().active.clone()
    }

    /// Whether a host is currently forwarding
    pub fn is_active(&self, host: &str) -> bool {
        self.state.lock().unwrap().active.contains(host)
    }

    /// Start or stop forwarding for an endpoint, depending on whether its
    /// host is currently active.
    ///
    /// Validation failures reject before any external call; external
    /// failures leave the active set consistent with the last known-good
    /// state.
    pub async fn toggle(
        &self,
        endpoint: &Endpoint,
        settings: &Settings,
    ) -> Result<Toggled, LifecycleError> {
        if settings.hide_http && endpoint.is_http() {
            return Err(LifecycleError::FilteredEndpoint);
        }

        let local_port = endpoint
            .local_port
            .or_else(|| settings.port_start_value())
            .ok_or(LifecycleError::InvalidPort)?;
        let protocol = endpoint
            .protocol
            .clone()
            .unwrap_or_else(|| "tcp".to_string());
        let host = endpoint.host.clone();

        let was_active = {
            let mut state = self.state.lock().unwrap();
            if !state.busy.insert(host.clone()) {
                return Err(LifecycleError::Busy { host });
            }
            state.active.contains(&host)
        };
        let _busy = BusyGuard {
            state: &self.state,
            host: &host,
        };

        if was_active {
            self.controller.stop(&host).await?;
            self.state.lock().unwrap().active.remove(&host);
            info!(%host, "stopped forwarding");
            Ok(Toggled::Stopped { host: host.clone() })
        } else {
            self.controller.start(&host, local_port, &protocol).await?;
            self.state.lock().unwrap().active.insert(host.clone());
            info!(%host, local_port, %protocol, "started forwarding");
            Ok(Toggled::Started {
                host: host.clone(),
                local_port,
                protocol,
            })
        }
    }

    /// Best-effort teardown: stop every active host concurrently, log
    /// individual failures, then reset the active set unconditionally.
    /// Teardown exists to clear local state and must not be blocked by a
    /// single unreachable forwarding process.
    pub async fn clear_all(&self) {
        let hosts: Vec<String> = {
            let state = self.state.lock().unwrap();
            state.active.iter().cloned().collect()
        };

        join_all(hosts.iter().map(|host| async move {
            if let Err(err) = self.controller.stop(host).await {
                warn!(%host, %err, "best-effort stop failed during teardown");
            }
        }))
        .await;

        self.state.lock().unwrap().active.clear();
    }
}
