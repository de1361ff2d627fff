//! Metric catalog: enumerate archive files under a root and map metric ids
//! to files and back.
//!
//! A file `<root>/dc1/web01.rrd` with data sources `load` and `users` yields
//! `dc1:web01:load` and `dc1:web01:users`.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{FetchError, Result, RrdServeError};
use crate::model::MetricId;
use crate::store;

const EXT: &str = "rrd";

/// Read-through view of the archive root. Holds no cached state.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    root: PathBuf,
}

impl MetricCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Metrics whose id starts with `prefix`, sorted. Runs on the blocking pool.
    pub async fn search(&self, prefix: &str) -> Result<Vec<MetricId>> {
        let this = self.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || this.search_blocking(&prefix))
            .await
            .map_err(|e| RrdServeError::Internal(format!("catalog task failed: {e}")))?
    }

    /// Synchronous variant of [`MetricCatalog::search`].
    pub fn search_blocking(&self, prefix: &str) -> Result<Vec<MetricId>> {
        let mut out: Vec<MetricId> = self
            .list()?
            .into_iter()
            .filter(|m| m.as_str().starts_with(prefix))
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    /// Every metric in the catalog, in file-walk order.
    pub fn list(&self) -> Result<Vec<MetricId>> {
        let meta = std::fs::metadata(&self.root).map_err(|e| {
            RrdServeError::CatalogUnavailable(format!("{}: {e}", self.root.display()))
        })?;
        if !meta.is_dir() {
            return Err(RrdServeError::CatalogUnavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let mut out = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable catalog entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || entry.path().extension().and_then(|e| e.to_str()) != Some(EXT) {
                continue;
            }
            let Some(base) = archive_id(&self.root, entry.path()) else {
                tracing::debug!(path = %entry.path().display(), "skipping non-utf8 archive path");
                continue;
            };
            match store::read_data_sources(entry.path()) {
                Ok(names) => {
                    out.extend(names.iter().map(|ds| MetricId::new(format!("{base}:{ds}"))));
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable archive");
                }
            }
        }
        Ok(out)
    }
}

/// `<root>/a/b.rrd` -> `a:b`.
fn archive_id(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?.with_extension("");
    let parts = rel
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(":"))
}

/// Map a metric id back to `(file path, data source name)` below `root`.
///
/// Ids that would leave the root (`..`, absolute parts, separators inside a
/// part) are reported as not found.
pub fn archive_path(root: &Path, metric: &MetricId) -> std::result::Result<(PathBuf, String), FetchError> {
    let not_found = || FetchError::MetricNotFound(metric.to_string());

    let (archive, ds) = metric.split().ok_or_else(not_found)?;
    if ds.is_empty() || archive.is_empty() {
        return Err(not_found());
    }

    let parts: Vec<&str> = archive.split(':').collect();
    let bad = parts.iter().any(|p| {
        p.is_empty() || *p == "." || *p == ".." || p.contains('/') || p.contains('\\')
    });
    if bad {
        return Err(not_found());
    }

    let mut path = root.to_path_buf();
    if let Some((file, dirs)) = parts.split_last() {
        path.extend(dirs);
        path.push(format!("{file}.{EXT}"));
    }
    Ok((path, ds.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn id_and_path_are_inverse() {
        let root = Path::new("/srv/rrd");
        let id = archive_id(root, Path::new("/srv/rrd/dc1/web01.rrd")).unwrap();
        assert_eq!(id, "dc1:web01");

        let (path, ds) = archive_path(root, &MetricId::new("dc1:web01:load")).unwrap();
        assert_eq!(path, PathBuf::from("/srv/rrd/dc1/web01.rrd"));
        assert_eq!(ds, "load");
    }

    #[test]
    fn dotted_file_names_keep_their_stem() {
        let root = Path::new("/srv/rrd");
        let id = archive_id(root, Path::new("/srv/rrd/host.example.rrd")).unwrap();
        assert_eq!(id, "host.example");
        let (path, _) = archive_path(root, &MetricId::new("host.example:cpu")).unwrap();
        assert_eq!(path, PathBuf::from("/srv/rrd/host.example.rrd"));
    }

    #[test]
    fn escaping_ids_are_rejected() {
        let root = Path::new("/srv/rrd");
        for bad in ["..:passwd:x", "a::b:x", "a/b:x", "sample:", "nocolon", ":x"] {
            assert!(
                matches!(archive_path(root, &MetricId::new(bad)), Err(FetchError::MetricNotFound(_))),
                "{bad}"
            );
        }
    }
}
