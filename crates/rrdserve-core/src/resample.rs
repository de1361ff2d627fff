//! Resampling engine: normalize raw archive rows onto the caller's step.
//!
//! Rules:
//! - `step = max(1, ceil(span / max_data_points))`, with the point budget
//!   capped at [`MAX_DATA_POINTS`] so the output buffer stays bounded.
//! - Buckets are `[from + k*step, from + (k+1)*step)`, every bucket is emitted.
//! - Consolidation is last-value-wins over the samples that carry a value;
//!   a bucket with no valued sample is a gap (`None`), never zero.

use crate::model::{Sample, Series, TimeRange};

/// Largest point budget a single series may ask for.
pub const MAX_DATA_POINTS: u64 = 100_000;

/// Output step in milliseconds for a range and point budget.
///
/// `max_data_points` must be > 0 (validated by the caller); budgets above
/// [`MAX_DATA_POINTS`] are treated as the cap.
pub fn step_for(range: TimeRange, max_data_points: u64) -> i64 {
    let span = range.span() as u64;
    let points = max_data_points.clamp(1, MAX_DATA_POINTS);
    let step = span.div_ceil(points);
    step.max(1) as i64
}

/// Number of buckets the range splits into at `step`.
pub fn bucket_count(range: TimeRange, step: i64) -> usize {
    let span = range.span() as u64;
    span.div_ceil(step.max(1) as u64) as usize
}

/// Resample `raw` onto the grid implied by `(range, max_data_points)`.
pub fn resample(raw: &[Sample], range: TimeRange, max_data_points: u64) -> Series {
    let step = step_for(range, max_data_points);
    let n = bucket_count(range, step);

    let mut values: Vec<Option<f64>> = vec![None; n];

    let ordered = raw.windows(2).all(|w| w[0].timestamp <= w[1].timestamp);
    let mut sorted;
    let raw = if ordered {
        raw
    } else {
        sorted = raw.to_vec();
        sorted.sort_by_key(|s| s.timestamp);
        &sorted[..]
    };

    for sample in raw {
        if !range.contains(sample.timestamp) {
            continue;
        }
        let Some(v) = sample.value else { continue };
        let idx = ((sample.timestamp - range.from()) / step) as usize;
        if let Some(slot) = values.get_mut(idx) {
            *slot = Some(v);
        }
    }

    values
        .into_iter()
        .enumerate()
        .map(|(k, value)| Sample::new(range.from() + k as i64 * step, value))
        .collect()
}
