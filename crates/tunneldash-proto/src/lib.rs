//! Control-Plane Data Model
//!
//! This crate defines the types returned by the tunnel provider's
//! control-plane API, the typed view of the legacy metadata bag, and the
//! service-descriptor locator. Everything here is pure data and parsing;
//! no I/O happens in this crate.

pub mod locator;
pub mod metadata;
pub mod records;

pub use locator::{is_http_service, parse_endpoint_address, parse_protocol};
pub use metadata::{PortMapEntry, TunnelMetadata};
pub use records::{
    Account, ApiEnvelope, ApiMessage, Connection, IngressConfig, IngressRule, TunnelConfiguration,
    TunnelRecord,
};
