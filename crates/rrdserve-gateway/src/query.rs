//! Query orchestrator: fan a multi-target request out to the archive reader,
//! resample each result, and assemble the response in input order.
//!
//! Failure policy:
//! - A target that fails (not found, corrupt, timed out, task panic) becomes
//!   an empty series; the other targets are unaffected.
//! - Only validation and the request deadline fail the whole call. On the
//!   deadline every in-flight fetch is aborted and nothing partial is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinSet;

use rrdserve_core::error::{FetchError, Result, RrdServeError};
use rrdserve_core::resample::{resample, MAX_DATA_POINTS};
use rrdserve_core::store::ArchiveReader;
use rrdserve_core::{Series, Target, TimeRange};

use crate::obs::metrics::GatewayMetrics;

/// Validated query, decoded from the dashboard request.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub range: TimeRange,
    pub interval_ms: u64,
    pub targets: Vec<Target>,
    pub max_data_points: u64,
}

/// One response entry, keyed by the caller's `refId`.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSeries {
    pub target: String,
    pub datapoints: Series,
}

pub type QueryResponse = Vec<TargetSeries>;

#[derive(Clone)]
pub struct QueryEngine {
    reader: Arc<dyn ArchiveReader>,
    metrics: Arc<GatewayMetrics>,
    target_timeout: Duration,
    request_timeout: Duration,
}

impl QueryEngine {
    pub fn new(
        reader: Arc<dyn ArchiveReader>,
        metrics: Arc<GatewayMetrics>,
        target_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self { reader, metrics, target_timeout, request_timeout }
    }

    pub async fn handle(&self, req: QueryRequest) -> Result<QueryResponse> {
        if req.max_data_points == 0 || req.max_data_points > MAX_DATA_POINTS {
            return Err(RrdServeError::InvalidRequest(format!(
                "maxDataPoints must be between 1 and {MAX_DATA_POINTS}"
            )));
        }

        tokio::time::timeout(self.request_timeout, self.fan_out(req))
            .await
            .map_err(|_| {
                tracing::warn!(timeout_ms = self.request_timeout.as_millis() as u64, "query deadline exceeded");
                RrdServeError::RequestTimeout
            })
    }

    async fn fan_out(&self, req: QueryRequest) -> QueryResponse {
        let QueryRequest { range, targets, max_data_points, .. } = req;
        let visible: Vec<Target> = targets.into_iter().filter(|t| !t.hide).collect();

        let mut results: Vec<Option<Series>> = vec![None; visible.len()];
        let mut tasks = JoinSet::new();

        for (idx, target) in visible.iter().enumerate() {
            let reader = Arc::clone(&self.reader);
            let metric = target.metric.clone();
            let timeout = self.target_timeout;
            tasks.spawn(async move {
                let started = Instant::now();
                let fetched = match tokio::time::timeout(timeout, reader.fetch(&metric, range, max_data_points)).await {
                    Ok(r) => r,
                    Err(_) => Err(FetchError::Timeout),
                };
                let out = fetched.map(|raw| resample(&raw, range, max_data_points));
                (idx, out, started.elapsed())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(series), elapsed)) => {
                    self.metrics.fetch_duration.observe(&[], elapsed);
                    if let Some(slot) = results.get_mut(idx) {
                        *slot = Some(series);
                    }
                }
                Ok((idx, Err(e), elapsed)) => {
                    self.metrics.target_failures.inc(&[("reason", e.reason())]);
                    if let Some(t) = visible.get(idx) {
                        tracing::warn!(
                            refid = %t.ref_id,
                            metric = %t.metric,
                            error = %e,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "target fetch failed, returning empty series"
                        );
                    }
                }
                Err(e) => {
                    self.metrics.target_failures.inc(&[("reason", "task_failed")]);
                    tracing::warn!(error = %e, "target task failed, returning empty series");
                }
            }
        }

        visible
            .into_iter()
            .zip(results)
            .map(|(t, series)| TargetSeries {
                target: t.ref_id,
                datapoints: series.unwrap_or_default(),
            })
            .collect()
    }
}
