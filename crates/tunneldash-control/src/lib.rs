//! Tunnel Topology Resolution and Connection Lifecycle
//!
//! This crate is the dashboard core: it resolves control-plane tunnel data
//! into addressable endpoints, projects them through display preferences,
//! and drives the start/stop lifecycle of per-endpoint forwarding processes
//! with per-host mutual exclusion.

pub mod lifecycle;
pub mod process;
pub mod session;
pub mod settings;
pub mod topology;
pub mod view;

pub use lifecycle::{ForwardController, ForwardError, LifecycleError, LifecycleManager, Toggled};
pub use process::CloudflaredController;
pub use session::{DashboardSession, SessionError};
pub use settings::{Settings, SettingsStore, StoredSettings};
pub use topology::{Endpoint, Health, Topology, TunnelSummary};
pub use view::{present, TunnelView};
