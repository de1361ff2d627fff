//! Transport layer (JSON over HTTP).
//!
//! Exposes the dashboard-facing handlers, the codec that decodes request
//! bodies once into validated domain types, and the HTTP error mapping.

pub mod codec;
pub mod error;
pub mod http;
