//! rrdserve core: data model, resampling engine, archive access and errors.
//!
//! This crate holds everything the query engine needs below the HTTP layer.
//! It carries no web framework dependency so the resampler and the archive
//! reader can be reused and tested in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Archive files are
//! untrusted input: every malformed header or truncated data block surfaces
//! as an error instead of a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod catalog;
pub mod error;
pub mod model;
pub mod resample;
pub mod store;

/// Shared result type.
pub use error::{FetchError, Result, RrdServeError};
pub use model::{MetricId, Sample, Series, Target, TimeRange};
