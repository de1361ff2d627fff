//! Top-level facade crate for rrdserve.
//!
//! Re-exports the query engine core and the HTTP gateway so users can depend on a single crate.

pub mod core {
    pub use rrdserve_core::*;
}

pub mod gateway {
    pub use rrdserve_gateway::*;
}
