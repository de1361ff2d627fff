//! rrdserve gateway library entry.
//!
//! This crate wires config, the archive catalog and reader, the query
//! orchestrator, annotations and the HTTP transport into one service. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod annotations;
pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod query;
pub mod router;
pub mod transport;
