//! Decode-once codec for dashboard request bodies.
//!
//! - Wire structs mirror the dashboard JSON exactly and reject unknown fields.
//! - `decode_*` turns a body into validated domain values; every failure is
//!   `InvalidRequest`, raised before any archive is touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use rrdserve_core::error::{Result, RrdServeError};
use rrdserve_core::{MetricId, Target, TimeRange};

use crate::annotations::Annotation;
use crate::query::QueryRequest;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    pub target: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeWire {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(default)]
    pub raw: Option<RawRange>,
}

impl RangeWire {
    pub fn to_range(&self) -> Result<TimeRange> {
        TimeRange::new(self.from.timestamp_millis(), self.to.timestamp_millis())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TargetWire {
    /// Metric id; a panel with nothing selected sends no target.
    #[serde(default)]
    pub target: String,
    pub ref_id: String,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct QueryRequestWire {
    #[serde(default)]
    pub panel_id: Option<Value>,
    pub range: RangeWire,
    #[serde(default)]
    pub range_raw: Option<RawRange>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub interval_ms: Option<u64>,
    pub targets: Vec<TargetWire>,
    #[serde(default)]
    pub format: Option<String>,
    pub max_data_points: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct AnnotationRequestWire {
    pub range: RangeWire,
    #[serde(default)]
    pub range_raw: Option<RawRange>,
    /// Annotation query definition, echoed back on every result.
    pub annotation: Value,
    #[serde(default)]
    pub dashboard: Option<Value>,
    #[serde(default)]
    pub variables: Option<Value>,
}

/// Annotation in the dashboard's response shape.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationWire<'a> {
    pub annotation: &'a Value,
    pub time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<i64>,
    pub is_region: bool,
    pub title: &'a str,
    pub text: &'a str,
    pub tags: &'a [String],
}

impl<'a> AnnotationWire<'a> {
    pub fn new(query: &'a Value, a: &'a Annotation) -> Self {
        Self {
            annotation: query,
            time: a.time_ms(),
            time_end: a.time_end_ms(),
            is_region: a.time_end.is_some(),
            title: &a.title,
            text: &a.text,
            tags: &a.tags,
        }
    }
}

fn parse<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| RrdServeError::InvalidRequest(format!("malformed {what} body: {e}")))
}

pub fn decode_search(body: &[u8]) -> Result<SearchRequest> {
    parse(body, "search")
}

pub fn decode_query(body: &[u8]) -> Result<QueryRequest> {
    let wire: QueryRequestWire = parse(body, "query")?;

    if let Some(f) = wire.format.as_deref() {
        if f != "json" {
            return Err(RrdServeError::InvalidRequest(format!("unsupported format: {f}")));
        }
    }

    let range = wire.range.to_range()?;

    let mut targets = Vec::with_capacity(wire.targets.len());
    for t in wire.targets {
        match t.kind.as_deref() {
            None | Some("timeserie") | Some("timeseries") => {}
            Some(other) => {
                return Err(RrdServeError::InvalidRequest(format!(
                    "unsupported target type {other} (refId {})",
                    t.ref_id
                )));
            }
        }
        targets.push(Target { metric: MetricId::new(t.target), ref_id: t.ref_id, hide: t.hide });
    }

    Ok(QueryRequest {
        range,
        interval_ms: wire.interval_ms.unwrap_or(0),
        targets,
        max_data_points: wire.max_data_points,
    })
}

pub fn decode_annotations(body: &[u8]) -> Result<(TimeRange, Value)> {
    let wire: AnnotationRequestWire = parse(body, "annotations")?;
    Ok((wire.range.to_range()?, wire.annotation))
}
