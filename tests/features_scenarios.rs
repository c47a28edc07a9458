// Integration coverage for end-to-end invariants that span the feature
// extractor and scorer together.

use beaconwatch::features;
use beaconwatch::scorer::{score, ScorerConfig};

#[test]
fn periodic_beacon_is_detected_end_to_end() {
    // 10-minute series, one 100-byte burst every 10 seconds.
    let mut series = Vec::new();
    for _ in 0..60 {
        series.extend_from_slice(&[0.0; 9]);
        series.push(100.0);
    }
    let features = features::extract(&series);
    let result = score(&features, &ScorerConfig::default());
    assert!(result.detected, "p_score={}", result.p_score);
}

#[test]
fn constant_series_is_never_detected() {
    let series = vec![250.0; 1800];
    let features = features::extract(&series);
    let result = score(&features, &ScorerConfig::default());
    assert!(!result.detected);
}

#[test]
fn short_series_below_min_samples_is_degenerate_and_not_detected() {
    let series = vec![1.0, 2.0, 3.0, 4.0];
    let features = features::extract(&series);
    assert_eq!(features.autocorr_max, 0.0);
    assert_eq!(features.entropy_norm, 1.0);
    let result = score(&features, &ScorerConfig::default());
    assert!(!result.detected);
}

#[test]
fn invariant_p_score_stays_within_unit_interval_across_random_like_inputs() {
    let series: Vec<f64> = (0..900)
        .map(|i| ((i as f64 * 0.173).sin() * 400.0 + 400.0).abs())
        .collect();
    let features = features::extract(&series);
    let result = score(&features, &ScorerConfig::default());
    assert!((0.0..=1.0).contains(&result.p_score));
}

#[test]
fn invariant_feature_extraction_is_deterministic() {
    let series: Vec<f64> = (0..500).map(|i| (i % 7) as f64 * 11.0).collect();
    let a = features::extract(&series);
    let b = features::extract(&series);
    assert_eq!(a, b);
}
