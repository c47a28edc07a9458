// src/model.rs
//
// Domain types shared across ingestion, feature extraction, scoring and
// persistence: one place for the shapes that flow through the pipeline.
//
// Absent numeric fields are represented with `Option<T>`, which *is*
// Rust's built-in Absent|Value sum type — there is no need for a bespoke
// enum to express what `Option` already expresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One observed bidirectional connection, as delivered by the passive
/// monitor's conn.log. Field order matches the TSV wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub ts: DateTime<Utc>,
    pub uid: String,
    pub id_orig_h: String,
    pub id_orig_p: Option<u16>,
    pub id_resp_h: String,
    pub id_resp_p: Option<u16>,
    pub proto: String,
    pub service: Option<String>,
    pub duration: Option<f64>,
    pub orig_bytes: Option<i64>,
    pub resp_bytes: Option<i64>,
    pub conn_state: String,
}

/// `(fft_peak, autocorr_max, entropy_norm, samples)` plus the non-scored
/// peak-period enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureTuple {
    pub fft_peak: f64,
    pub autocorr_max: f64,
    pub entropy_norm: f64,
    pub samples: usize,
    /// 1 / peak_frequency_hz when the dominant non-DC bin has nonzero
    /// frequency; informational only, never fed into the scorer.
    pub peak_period_secs: Option<f64>,
}

impl FeatureTuple {
    /// The all-degenerate tuple for series with fewer than 10 samples.
    pub fn degenerate(samples: usize) -> Self {
        Self {
            fft_peak: 0.0,
            autocorr_max: 0.0,
            entropy_norm: 1.0,
            samples,
            peak_period_secs: None,
        }
    }
}

/// Persisted, append-only scoring result for one host at one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub host: String,
    pub analyzed_at: DateTime<Utc>,
    pub p_score: f64,
    pub fft_peak: f64,
    pub autocorr_max: f64,
    pub entropy_norm: f64,
    pub sample_count: i32,
    pub detected: bool,
}

/// One entry in the bounded rolling alerts file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub display_host: String,
    pub p_score: f64,
    pub details: AlertDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDetails {
    pub fft_peak: f64,
    pub autocorr_max: f64,
    pub entropy_norm: f64,
    pub samples: usize,
}

impl AlertRecord {
    pub fn from_detection(det: &DetectionRecord, display_host: String) -> Self {
        Self {
            timestamp: det.analyzed_at,
            host: det.host.clone(),
            display_host,
            p_score: det.p_score,
            details: AlertDetails {
                fft_peak: det.fft_peak,
                autocorr_max: det.autocorr_max,
                entropy_norm: det.entropy_norm,
                samples: det.sample_count as usize,
            },
        }
    }
}

/// One row pulled from the flow store for windowed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSample {
    pub host: String,
    pub ts: DateTime<Utc>,
    pub resp_bytes: i64,
}

/// A host's 1-second-binned responder-byte series over `[t0, t1]`.
pub type HostBins = HashMap<String, Vec<f64>>;
