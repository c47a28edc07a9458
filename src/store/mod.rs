// src/store/mod.rs
//
// Persistence boundary. Two traits keep the rest of the pipeline ignorant
// of the backing engine: `FlowStore` (conn_log) is written by the ingester
// and read by the scheduler; `DetectionStore` (detection_results) is
// written by the scheduler and read back for the rolling alerts file and
// `hosts_seen_since` queries. Schema creation/migration is out of scope —
// both implementations assume the tables already exist.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{DetectionRecord, FlowRecord, FlowSample};

/// Flow-record ingestion and windowed readback against `conn_log`.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Insert a batch atomically. Duplicate `(uid, ts)` pairs across restarts
    /// are accepted, not rejected — callers never dedupe before calling this.
    async fn insert_flows(&self, records: &[FlowRecord]) -> Result<()>;

    /// All responder-byte samples for `[t0, t1)`, keyed by originator host.
    /// Ordering is not guaranteed; callers bin by host and second themselves.
    async fn query_window(&self, t0: DateTime<Utc>, t1: DateTime<Utc>) -> Result<Vec<FlowSample>>;

    /// Distinct originator hosts with any activity at or after `cutoff`.
    async fn hosts_seen_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;
}

/// Detection-result persistence and readback.
#[async_trait]
pub trait DetectionStore: Send + Sync {
    async fn insert_detection(&self, record: &DetectionRecord) -> Result<()>;

    /// Most recent detections at or after `cutoff`, newest first — feeds
    /// the alerts file and any read-only dashboard consumer.
    async fn recent_detections(&self, cutoff: DateTime<Utc>) -> Result<Vec<DetectionRecord>>;
}
