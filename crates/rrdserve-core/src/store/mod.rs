//! Archive access: the reader contract consumed by the query engine and the
//! file-backed implementation.

pub mod rrd;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::catalog;
use crate::error::FetchError;
use crate::model::{MetricId, Series, TimeRange};
use crate::resample;

pub use rrd::{ArchiveDef, RrdFile, StatHead};

/// Reads raw samples for one metric at the best matching stored resolution.
///
/// Implementations must be safe for concurrent reads. A range only partly
/// (or not at all) covered by the archive yields the overlap, not an error.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    async fn fetch(
        &self,
        metric: &MetricId,
        range: TimeRange,
        target_steps: u64,
    ) -> Result<Series, FetchError>;
}

/// Reader over `.rrd` files below a root directory.
#[derive(Debug, Clone)]
pub struct RrdArchiveReader {
    root: PathBuf,
}

impl RrdArchiveReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArchiveReader for RrdArchiveReader {
    async fn fetch(
        &self,
        metric: &MetricId,
        range: TimeRange,
        target_steps: u64,
    ) -> Result<Series, FetchError> {
        let (path, ds) = catalog::archive_path(&self.root, metric)?;
        tokio::task::spawn_blocking(move || read_series(&path, &ds, range, target_steps))
            .await
            .map_err(|e| FetchError::Internal(format!("reader task failed: {e}")))?
    }
}

/// Blocking read of one data source.
pub fn read_series(
    path: &Path,
    ds: &str,
    range: TimeRange,
    target_steps: u64,
) -> Result<Series, FetchError> {
    let file = open(path)?;
    let ds_idx = file
        .ds_index(ds)
        .ok_or_else(|| FetchError::MetricNotFound(format!("{}: no data source {ds}", path.display())))?;

    let step = resample::step_for(range, target_steps);
    let Some(archive) = file.select_archive(range, step) else {
        tracing::debug!(path = %path.display(), "no AVERAGE archive in file");
        return Ok(Vec::new());
    };
    file.read_rows(archive, ds_idx, range)
}

fn io_error(path: &Path, e: std::io::Error) -> FetchError {
    match e.kind() {
        std::io::ErrorKind::NotFound => FetchError::MetricNotFound(path.display().to_string()),
        _ => FetchError::StoreCorrupt(format!("{}: {e}", path.display())),
    }
}

fn with_path(path: &Path, e: FetchError) -> FetchError {
    match e {
        FetchError::StoreCorrupt(msg) => FetchError::StoreCorrupt(format!("{}: {msg}", path.display())),
        other => other,
    }
}

/// Read and decode a whole archive file.
pub fn open(path: &Path) -> Result<RrdFile, FetchError> {
    let raw = std::fs::read(path).map_err(|e| io_error(path, e))?;
    RrdFile::parse(Bytes::from(raw)).map_err(|e| with_path(path, e))
}

/// Data source names of an archive, reading only its leading definitions.
pub fn read_data_sources(path: &Path) -> Result<Vec<String>, FetchError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let file_len = file.metadata().map_err(|e| io_error(path, e))?.len();
    let file_len = usize::try_from(file_len).unwrap_or(usize::MAX);

    let mut head = Vec::with_capacity(rrd::STAT_HEAD_SIZE);
    let mut reader = file.take(rrd::STAT_HEAD_SIZE as u64);
    reader.read_to_end(&mut head).map_err(|e| io_error(path, e))?;

    let stat = StatHead::parse(&mut Bytes::from(head.clone()), file_len).map_err(|e| with_path(path, e))?;
    reader.set_limit((stat.ds_defs_end() - rrd::STAT_HEAD_SIZE) as u64);
    reader.read_to_end(&mut head).map_err(|e| io_error(path, e))?;

    rrd::data_source_names(Bytes::from(head), file_len).map_err(|e| with_path(path, e))
}
