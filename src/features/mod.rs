// src/features/mod.rs
//
// Spectral peak ratio, short-lag autocorrelation maximum, and normalized
// histogram entropy. Pure functions over a dense `Vec<f64>` — no I/O,
// deterministic, NaN/Inf coerced to 0 at the boundary.
//
// Direct numeric code instead of a dataframe dependency. The real-valued
// FFT is computed by feeding a zero-imaginary-part complex buffer through
// rustfft's ordinary complex forward transform and reading off the first
// `N/2 + 1` bins — identical magnitudes to a dedicated real-to-complex
// transform, since a real input's DFT is conjugate symmetric.

pub mod series;

use rustfft::{num_complex::Complex64, FftPlanner};
use tracing::warn;

use crate::model::FeatureTuple;

const MIN_SAMPLES_FOR_SIGNAL: usize = 10;
const MAX_AUTOCORR_LAG: usize = 20;
const ENTROPY_BINS: usize = 10;

/// Extract the feature tuple for one host's 1-second-binned series.
/// Deterministic: identical input bytes always produce identical output.
pub fn extract(series: &[f64]) -> FeatureTuple {
    let n = series.len();

    let (fft_peak, peak_period_secs) = spectral_peak_ratio(series);
    let autocorr_max = autocorrelation_max(series);
    let entropy_norm = histogram_entropy(series);

    FeatureTuple {
        fft_peak: coerce_finite(fft_peak, "fft_peak"),
        autocorr_max: coerce_finite(autocorr_max, "autocorr_max"),
        entropy_norm: coerce_finite(entropy_norm, "entropy_norm"),
        samples: n,
        peak_period_secs,
    }
}

fn coerce_finite(v: f64, field: &str) -> f64 {
    if v.is_finite() {
        v
    } else {
        warn!("feature {field} produced non-finite value {v}, coercing to 0");
        0.0
    }
}

/// `fft_peak` and, as an enrichment, the peak's period in seconds.
fn spectral_peak_ratio(x: &[f64]) -> (f64, Option<f64>) {
    let n = x.len();
    if n < MIN_SAMPLES_FOR_SIGNAL {
        return (0.0, None);
    }

    let mut buf: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buf);

    let half = n / 2;
    let magnitudes: Vec<f64> = (0..=half)
        .map(|k| (2.0 / n as f64) * buf[k].norm())
        .collect();

    let denom = magnitudes.iter().cloned().fold(0.0_f64, f64::max);
    if magnitudes.len() < 2 || denom <= 0.0 {
        return (0.0, None);
    }

    let (peak_idx, peak) = magnitudes[1..]
        .iter()
        .enumerate()
        .map(|(i, &m)| (i + 1, m))
        .fold((1usize, magnitudes[1]), |acc, cur| {
            if cur.1 > acc.1 {
                cur
            } else {
                acc
            }
        });

    let ratio = peak / denom;
    let peak_freq = peak_idx as f64 / n as f64;
    let peak_period = if peak_freq > 0.0 {
        Some(1.0 / peak_freq)
    } else {
        None
    };

    (ratio, peak_period)
}

/// `autocorr_max`. Only the lags actually needed are computed — a full
/// autocorrelation array is unnecessary work once only a short prefix of it
/// is ever read. For `N <= 20` every lag up to `N-1` is read; beyond that the
/// scan is capped at lag 19, matching the two-branch window the original
/// analyzer used instead of a single `min(20, N-1)` cutoff.
fn autocorrelation_max(x: &[f64]) -> f64 {
    let n = x.len();
    if n < MIN_SAMPLES_FOR_SIGNAL {
        return 0.0;
    }

    let mean = x.iter().sum::<f64>() / n as f64;
    let y: Vec<f64> = x.iter().map(|&v| v - mean).collect();

    let std = (y.iter().map(|v| v * v).sum::<f64>() / n as f64).sqrt();
    if std == 0.0 {
        return 0.0;
    }

    let r0: f64 = y.iter().map(|v| v * v).sum();
    if r0 <= 0.0 {
        return 0.0;
    }

    let upper_exclusive = n.min(MAX_AUTOCORR_LAG);
    let mut max_r = f64::MIN;
    for tau in 1..upper_exclusive {
        let r_tau: f64 = (0..n - tau).map(|i| y[i] * y[i + tau]).sum();
        let normalized = (r_tau / r0).clamp(-1.0, 1.0);
        if normalized > max_r {
            max_r = normalized;
        }
    }

    if max_r == f64::MIN {
        0.0
    } else {
        max_r
    }
}

/// `entropy_norm`. The single-nonempty-bin case (a constant series) returns
/// 1.0, overriding the general `H_max > 0` case, which would otherwise
/// fall through to 0 — see DESIGN.md for this resolution.
fn histogram_entropy(x: &[f64]) -> f64 {
    let n = x.len();
    if n < MIN_SAMPLES_FOR_SIGNAL {
        return 1.0;
    }

    let min = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut counts = [0usize; ENTROPY_BINS];
    if max > min {
        let width = (max - min) / ENTROPY_BINS as f64;
        for &v in x {
            let mut bin = ((v - min) / width) as usize;
            if bin >= ENTROPY_BINS {
                bin = ENTROPY_BINS - 1;
            }
            counts[bin] += 1;
        }
    } else {
        // All samples identical — numpy's histogram collapses to one bin.
        counts[0] = n;
    }

    let nonempty: Vec<usize> = counts.into_iter().filter(|&c| c > 0).collect();
    if nonempty.is_empty() {
        return 1.0;
    }
    if nonempty.len() == 1 {
        return 1.0;
    }

    let probs: Vec<f64> = nonempty.iter().map(|&c| c as f64 / n as f64).collect();
    let entropy: f64 = -probs.iter().map(|p| p * p.log2()).sum::<f64>();
    let h_max = (nonempty.len() as f64).log2();

    if h_max > 0.0 {
        entropy / h_max
    } else {
        0.0
    }
}
