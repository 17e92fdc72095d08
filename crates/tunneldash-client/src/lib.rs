//! Control-Plane Client
//!
//! The [`ControlPlane`] trait describes the slice of the provider API the
//! dashboard consumes; [`HttpControlPlane`] is the reqwest-backed
//! implementation against the provider's v4 REST API. Tests and embedders
//! can substitute their own implementation of the trait.

pub mod api;
pub mod error;
pub mod http;

pub use api::ControlPlane;
pub use error::ClientError;
pub use http::{HttpControlPlane, DEFAULT_API_BASE};
