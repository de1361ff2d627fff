//! Shared application state for the rrdserve gateway.
//!
//! Built once from the loaded config and cloned into every handler. All
//! members are read-only after construction, so no locks are needed.

use std::path::Path;
use std::sync::Arc;

use rrdserve_core::catalog::MetricCatalog;
use rrdserve_core::error::Result;
use rrdserve_core::store::{ArchiveReader, RrdArchiveReader};

use crate::annotations::AnnotationStore;
use crate::config::GatewayConfig;
use crate::obs::metrics::GatewayMetrics;
use crate::query::QueryEngine;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<GatewayMetrics>,
}

struct AppStateInner {
    catalog: MetricCatalog,
    engine: QueryEngine,
    annotations: AnnotationStore,
}

impl AppState {
    /// Build application state backed by the `.rrd` files under `server.rrdPath`.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let reader = Arc::new(RrdArchiveReader::new(&cfg.server.rrd_path));
        let annotations = match &cfg.server.annotations_path {
            Some(path) => AnnotationStore::load_from_file(path)?,
            None => AnnotationStore::empty(),
        };
        Ok(Self::with_parts(cfg, reader, annotations))
    }

    /// Build with an explicit reader and annotation set (tests, embedding).
    pub fn with_parts(
        cfg: GatewayConfig,
        reader: Arc<dyn ArchiveReader>,
        annotations: AnnotationStore,
    ) -> Self {
        if !Path::new(&cfg.server.rrd_path).is_dir() {
            tracing::warn!(rrd_path = %cfg.server.rrd_path, "archive root is not a directory; searches will fail");
        }

        let metrics = Arc::new(GatewayMetrics::default());
        let catalog = MetricCatalog::new(&cfg.server.rrd_path);
        let engine = QueryEngine::new(
            reader,
            Arc::clone(&metrics),
            cfg.server.target_timeout(),
            cfg.server.request_timeout(),
        );

        Self {
            inner: Arc::new(AppStateInner { catalog, engine, annotations }),
            metrics,
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.inner.catalog
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.inner.engine
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.inner.annotations
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }
}
