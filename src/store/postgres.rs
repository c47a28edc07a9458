// src/store/postgres.rs
//
// sqlx::PgPool-backed `FlowStore`/`DetectionStore` against the `conn_log`
// and `detection_results` tables. Table/column creation is the upstream
// monitor's and the DBA's responsibility — this module only ever issues
// DML.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::model::{DetectionRecord, FlowRecord, FlowSample};

use super::{DetectionStore, FlowStore};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects lazily: the pool is constructed without attempting any
    /// network I/O, so a database that's unreachable at process start never
    /// makes `tail`/`monitor`/`analyze` exit nonzero. The first real
    /// connection attempt happens on the first query, where store errors are
    /// already non-fatal and retried next pass.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new().connect_lazy(&config.connection_string())?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlowStore for PostgresStore {
    async fn insert_flows(&self, records: &[FlowRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for rec in records {
            sqlx::query(
                "INSERT INTO conn_log \
                 (ts, uid, id_orig_h, id_orig_p, id_resp_h, id_resp_p, proto, \
                  service, duration, orig_bytes, resp_bytes, conn_state) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(rec.ts)
            .bind(&rec.uid)
            .bind(&rec.id_orig_h)
            .bind(rec.id_orig_p.map(i32::from))
            .bind(&rec.id_resp_h)
            .bind(rec.id_resp_p.map(i32::from))
            .bind(&rec.proto)
            .bind(&rec.service)
            .bind(rec.duration)
            .bind(rec.orig_bytes)
            .bind(rec.resp_bytes)
            .bind(&rec.conn_state)
            .execute(&mut *tx)
            .await?;
        }
        // Commit is atomic; the ingester never rolls its cursor back on
        // failure, so a dropped connection here surfaces to the caller and
        // the same bytes are re-read on the ingester's next pass.
        tx.commit().await?;
        Ok(())
    }

    async fn query_window(&self, t0: DateTime<Utc>, t1: DateTime<Utc>) -> Result<Vec<FlowSample>> {
        let rows: Vec<(String, DateTime<Utc>, Option<i64>)> = sqlx::query_as(
            "SELECT id_orig_h, ts, resp_bytes FROM conn_log \
             WHERE ts >= $1 AND ts < $2",
        )
        .bind(t0)
        .bind(t1)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(host, ts, resp_bytes)| FlowSample {
                host,
                ts,
                resp_bytes: resp_bytes.unwrap_or(0),
            })
            .collect())
    }

    async fn hosts_seen_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT id_orig_h FROM conn_log WHERE ts >= $1")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(h,)| h).collect())
    }
}

#[async_trait]
impl DetectionStore for PostgresStore {
    async fn insert_detection(&self, record: &DetectionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO detection_results \
             (host_ip, analyzed_at, p_score, fft_peak, autocorr_max, entropy_norm, \
              sample_count, detected) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&record.host)
        .bind(record.analyzed_at)
        .bind(record.p_score)
        .bind(record.fft_peak)
        .bind(record.autocorr_max)
        .bind(record.entropy_norm)
        .bind(record.sample_count)
        .bind(record.detected)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_detections(&self, cutoff: DateTime<Utc>) -> Result<Vec<DetectionRecord>> {
        let rows: Vec<(String, DateTime<Utc>, f64, f64, f64, f64, i32, bool)> = sqlx::query_as(
            "SELECT host_ip, analyzed_at, p_score, fft_peak, autocorr_max, entropy_norm, \
                    sample_count, detected \
             FROM detection_results \
             WHERE analyzed_at >= $1 \
             ORDER BY analyzed_at DESC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(host, analyzed_at, p_score, fft_peak, autocorr_max, entropy_norm, sample_count, detected)| {
                    DetectionRecord {
                        host,
                        analyzed_at,
                        p_score,
                        fft_peak,
                        autocorr_max,
                        entropy_norm,
                        sample_count,
                        detected,
                    }
                },
            )
            .collect())
    }
}
