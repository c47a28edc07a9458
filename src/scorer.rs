// src/scorer.rs
//
// Fixed-weight linear fusion of the feature tuple into `p_score`,
// thresholded into a boolean detection. Weights and threshold are
// configuration-adjustable but default to the reference values, which
// tests pin down as reference behavior.

use crate::model::FeatureTuple;

pub const DEFAULT_ALPHA: f64 = 0.4;
pub const DEFAULT_BETA: f64 = 0.4;
pub const DEFAULT_GAMMA: f64 = 0.2;
pub const DEFAULT_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Copy)]
pub struct ScorerConfig {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub threshold: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub p_score: f64,
    pub detected: bool,
}

/// `p_score = alpha*fft_peak + beta*autocorr_max + gamma*(1-entropy_norm)`,
/// `detected = p_score > threshold`. `autocorr_max` is clipped to `[0, 1]`
/// before fusion: finite-length linear autocorrelation can drift slightly
/// outside `[-1, 1]`, and clamping to the non-negative side keeps every term
/// of the weighted sum in `[0, 1]`, which keeps `p_score` itself in `[0,1]`.
pub fn score(features: &FeatureTuple, cfg: &ScorerConfig) -> ScoreResult {
    let autocorr = features.autocorr_max.clamp(0.0, 1.0);
    let p_score =
        cfg.alpha * features.fft_peak + cfg.beta * autocorr + cfg.gamma * (1.0 - features.entropy_norm);
    ScoreResult {
        p_score,
        detected: p_score > cfg.threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_tuple_scores_zero() {
        let f = FeatureTuple::degenerate(5);
        let r = score(&f, &ScorerConfig::default());
        assert!((r.p_score - 0.0).abs() < 1e-9);
        assert!(!r.detected);
    }

    #[test]
    fn strong_signal_detects() {
        let f = FeatureTuple {
            fft_peak: 1.0,
            autocorr_max: 0.9,
            entropy_norm: 0.4,
            samples: 600,
            peak_period_secs: Some(10.0),
        };
        let r = score(&f, &ScorerConfig::default());
        assert!(r.p_score > 0.8, "p_score={}", r.p_score);
        assert!(r.detected);
    }

    #[test]
    fn score_is_bounded_zero_one_for_clipped_inputs() {
        let f = FeatureTuple {
            fft_peak: 1.0,
            autocorr_max: 1.0,
            entropy_norm: 0.0,
            samples: 600,
            peak_period_secs: None,
        };
        let r = score(&f, &ScorerConfig::default());
        assert!((0.0..=1.0).contains(&r.p_score));
        assert!((r.p_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_series_does_not_detect() {
        // autocorr_max = 0, entropy_norm = 1 => p_score = alpha*fft_peak only.
        let f = FeatureTuple {
            fft_peak: 0.05,
            autocorr_max: 0.0,
            entropy_norm: 1.0,
            samples: 600,
            peak_period_secs: None,
        };
        let r = score(&f, &ScorerConfig::default());
        assert!(r.p_score <= 0.4 * 0.05 + 1e-9);
        assert!(!r.detected);
    }
}
