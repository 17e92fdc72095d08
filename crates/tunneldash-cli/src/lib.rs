//! TunnelDash CLI library surface
//!
//! Exposes the on-disk settings store so integration tests can drive it
//! directly.

pub mod config;
