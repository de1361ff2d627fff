//! Request-scoped data model shared by the reader, resampler and orchestrator.

use std::fmt;

use serde::ser::{Serialize, SerializeTuple, Serializer};

use crate::error::{Result, RrdServeError};

/// Name of one archived series, e.g. `host:ClientJobsIdle`.
///
/// Built as `<archive path relative to the root, '/' replaced by ':'>:<data source>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricId(String);

impl MetricId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (archive part, data source name) at the last `:`.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.rsplit_once(':')
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MetricId {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

/// Half-open `[from, to)` window in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    from: i64,
    to: i64,
}

impl TimeRange {
    pub fn new(from: i64, to: i64) -> Result<Self> {
        if from >= to {
            return Err(RrdServeError::InvalidRequest(format!(
                "range.from ({from}) must be before range.to ({to})"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    /// Width in milliseconds (always > 0).
    pub fn span(&self) -> i64 {
        self.to - self.from
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.from <= ts && ts < self.to
    }
}

/// One requested series within a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub metric: MetricId,
    /// Caller correlation label, echoed verbatim in the response.
    pub ref_id: String,
    pub hide: bool,
}

/// A single point. `value == None` is a gap, distinct from `Some(0.0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: i64, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }

    /// Archive values use NaN for "unknown"; fold that (and infinities) into a gap.
    pub fn from_raw(timestamp: i64, raw: f64) -> Self {
        let value = if raw.is_finite() { Some(raw) } else { None };
        Self { timestamp, value }
    }
}

/// Dashboard wire shape: `[value|null, timestamp_ms]`.
impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut t = s.serialize_tuple(2)?;
        t.serialize_element(&self.value)?;
        t.serialize_element(&self.timestamp)?;
        t.end()
    }
}

/// Time-ordered samples with strictly increasing timestamps.
pub type Series = Vec<Sample>;
