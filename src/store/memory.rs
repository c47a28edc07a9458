// src/store/memory.rs
//
// In-memory `FlowStore`/`DetectionStore`, guarded by `parking_lot::RwLock`.
// Backs unit tests and any dry-run analysis path that should not require a
// live Postgres connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;
use crate::model::{DetectionRecord, FlowRecord, FlowSample};

use super::{DetectionStore, FlowStore};

#[derive(Default)]
pub struct MemoryStore {
    flows: RwLock<Vec<FlowRecord>>,
    detections: RwLock<Vec<DetectionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStore for MemoryStore {
    async fn insert_flows(&self, records: &[FlowRecord]) -> Result<()> {
        self.flows.write().extend(records.iter().cloned());
        Ok(())
    }

    async fn query_window(&self, t0: DateTime<Utc>, t1: DateTime<Utc>) -> Result<Vec<FlowSample>> {
        let samples = self
            .flows
            .read()
            .iter()
            .filter(|f| f.ts >= t0 && f.ts < t1)
            .map(|f| FlowSample {
                host: f.id_orig_h.clone(),
                ts: f.ts,
                resp_bytes: f.resp_bytes.unwrap_or(0),
            })
            .collect();
        Ok(samples)
    }

    async fn hosts_seen_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let mut hosts: Vec<String> = self
            .flows
            .read()
            .iter()
            .filter(|f| f.ts >= cutoff)
            .map(|f| f.id_orig_h.clone())
            .collect();
        hosts.sort();
        hosts.dedup();
        Ok(hosts)
    }
}

#[async_trait]
impl DetectionStore for MemoryStore {
    async fn insert_detection(&self, record: &DetectionRecord) -> Result<()> {
        self.detections.write().push(record.clone());
        Ok(())
    }

    async fn recent_detections(&self, cutoff: DateTime<Utc>) -> Result<Vec<DetectionRecord>> {
        let mut out: Vec<DetectionRecord> = self
            .detections
            .read()
            .iter()
            .filter(|d| d.analyzed_at >= cutoff)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.analyzed_at.cmp(&a.analyzed_at));
        Ok(out)
    }
}
