//! Resampling vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use rrdserve_core::resample::{resample, step_for};


#[test]
fn resample_vectors() {
    let files = [
        "resample_last_value_wins.json",
        "resample_gaps_stay_null.json",
        "resample_native_coarser_than_step.json",
        "resample_clip_outside_range.json",
        "resample_sub_ms_step.json",
    ];

    for f in files {
        let v = vector_loader::load(f);
        let range = v.time_range();

        assert_eq!(step_for(range, v.max_data_points), v.expect.step, "vector={}", v.description);

        let out = resample(&v.raw_samples(), range, v.max_data_points);
        let got: Vec<(Option<f64>, i64)> = out.iter().map(|s| (s.value, s.timestamp)).collect();
        assert_eq!(got, v.expect.datapoints, "vector={}", v.description);

        assert!(out.len() as u64 <= v.max_data_points, "vector={}", v.description);
        assert!(out.iter().all(|s| range.contains(s.timestamp)), "vector={}", v.description);
        assert!(
            out.windows(2).all(|w| w[1].timestamp - w[0].timestamp == v.expect.step),
            "vector={}",
            v.description
        );
    }
}

#[test]
fn resampling_is_deterministic() {
    let v = vector_loader::load("resample_last_value_wins.json");
    let a = serde_json::to_string(&resample(&v.raw_samples(), v.time_range(), v.max_data_points)).unwrap();
    let b = serde_json::to_string(&resample(&v.raw_samples(), v.time_range(), v.max_data_points)).unwrap();
    assert_eq!(a, b);
}
