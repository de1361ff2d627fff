//! Annotation provider: events loaded once at startup, filtered per request
//! by intersection with the requested window.

use std::fs;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use rrdserve_core::error::{Result, RrdServeError};
use rrdserve_core::TimeRange;

/// A point event (`time_end == None`) or a region `[time, time_end]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Annotation {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub time_end: Option<DateTime<Utc>>,
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Annotation {
    pub fn time_ms(&self) -> i64 {
        self.time.timestamp_millis()
    }

    pub fn time_end_ms(&self) -> Option<i64> {
        self.time_end.map(|t| t.timestamp_millis())
    }

    pub fn intersects(&self, range: TimeRange) -> bool {
        match self.time_end_ms() {
            None => range.contains(self.time_ms()),
            Some(end) => self.time_ms() < range.to() && end >= range.from(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let s = fs::read_to_string(path)
            .map_err(|e| RrdServeError::Config(format!("read annotations {path} failed: {e}")))?;
        Self::load_from_str(&s)
    }

    pub fn load_from_str(s: &str) -> Result<Self> {
        let items: Vec<Annotation> = serde_yaml::from_str(s)
            .map_err(|e| RrdServeError::Config(format!("invalid annotations yaml: {e}")))?;
        Self::new(items)
    }

    pub fn new(mut items: Vec<Annotation>) -> Result<Self> {
        if let Some(bad) = items.iter().find(|a| a.time_end.is_some_and(|end| end < a.time)) {
            return Err(RrdServeError::Config(format!(
                "annotation {:?} ends before it starts",
                bad.title
            )));
        }
        items.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.title.cmp(&b.title)));
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Annotations intersecting `range`, ordered by time then title.
    pub fn get(&self, range: TimeRange) -> Vec<&Annotation> {
        self.items.iter().filter(|a| a.intersects(range)).collect()
    }
}
