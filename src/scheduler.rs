// src/scheduler.rs
//
// Single-threaded, cooperative, sleep-between-passes analysis loop. Each
// pass queries the trailing window, bins per host, extracts features,
// scores, persists, and derives alerts. Passes never overlap — the loop
// awaits one pass to completion before sleeping.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::alerts::AlertsFile;
use crate::config::AnalysisConfig;
use crate::enrich::{NeighborResolver, NoopResolver};
use crate::error::Result;
use crate::features::{self, series};
use crate::model::{AlertRecord, DetectionRecord};
use crate::scorer::{self, ScorerConfig};
use crate::store::{DetectionStore, FlowStore};

pub struct AnalysisScheduler {
    flow_store: Arc<dyn FlowStore>,
    detection_store: Arc<dyn DetectionStore>,
    alerts: AlertsFile,
    scorer_config: ScorerConfig,
    resolver: Arc<dyn NeighborResolver>,
}

impl AnalysisScheduler {
    pub fn new(
        flow_store: Arc<dyn FlowStore>,
        detection_store: Arc<dyn DetectionStore>,
        alerts: AlertsFile,
    ) -> Self {
        Self {
            flow_store,
            detection_store,
            alerts,
            scorer_config: ScorerConfig::default(),
            resolver: Arc::new(NoopResolver),
        }
    }

    /// Swap in a real address resolver (e.g. `IpNeighResolver`) in place of
    /// the no-op default. Enrichment stays best-effort regardless: a
    /// resolver that returns `None` just leaves `display_host` as `host`.
    pub fn with_resolver(mut self, resolver: Arc<dyn NeighborResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// One analysis pass over `[t1 - window, t1)`. Returns the detection
    /// records produced, even if the alerts file write fails — that
    /// failure is logged and never aborts the pass.
    pub async fn run_once(&self, window_secs: i64) -> Result<Vec<DetectionRecord>> {
        let t1 = Utc::now();
        let t0 = t1 - chrono::Duration::seconds(window_secs);

        let samples = match self.flow_store.query_window(t0, t1).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "flow store unavailable, skipping this pass");
                return Ok(Vec::new());
            }
        };

        let bins = series::bin_by_host(&samples, t0, window_secs);
        let mut detections = Vec::with_capacity(bins.len());

        for (host, series) in bins {
            let features = features::extract(&series);
            let result = scorer::score(&features, &self.scorer_config);

            let record = DetectionRecord {
                host: host.clone(),
                analyzed_at: t1,
                p_score: result.p_score,
                fft_peak: features.fft_peak,
                autocorr_max: features.autocorr_max,
                entropy_norm: features.entropy_norm,
                sample_count: features.samples as i32,
                detected: result.detected,
            };

            if let Err(e) = self.detection_store.insert_detection(&record).await {
                warn!(host = %host, error = %e, "failed to persist detection result for host, continuing with others");
                continue;
            }

            if record.detected {
                info!(host = %host, p_score = record.p_score, "beacon candidate detected");
            }
            detections.push(record);
        }

        let mut new_alerts = Vec::new();
        for d in detections.iter().filter(|d| d.detected) {
            let display_host = self.display_host(&d.host).await;
            new_alerts.push(AlertRecord::from_detection(d, display_host));
        }

        if !new_alerts.is_empty() {
            if let Err(e) = self.alerts.prepend(new_alerts).await {
                warn!(error = %e, "failed to update alerts file, will retry next pass");
            }
        }

        Ok(detections)
    }

    /// Best-effort IPv4 display address for a detected host: `host (ipv4)`
    /// when the resolver finds a mapping, `host` unchanged otherwise. Never
    /// fails the pass — a resolver error surfaces as `None`.
    async fn display_host(&self, host: &str) -> String {
        match self.resolver.resolve(host).await {
            Some(ipv4) => format!("{host} ({ipv4})"),
            None => host.to_string(),
        }
    }

    /// The monitor service's main loop: run a pass, sleep for the
    /// configured interval, repeat. No overlap — the next pass never starts
    /// until the previous one (and its alerts write) has finished.
    pub async fn run_forever(&self, config: &AnalysisConfig) -> ! {
        loop {
            if let Err(e) = self.run_once(config.window_secs).await {
                warn!(error = %e, "analysis pass failed unexpectedly");
            }
            tokio::time::sleep(Duration::from_secs(config.interval_secs)).await;
        }
    }
}
