// src/alerts.rs
//
// Bounded rolling alerts file: at most 100 entries, newest first, written
// atomically (temp file in the same directory, then rename) so a reader
// never observes a half-written file. Best-effort: a write failure is
// logged by the caller and never aborts an analysis pass.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

use crate::error::Result;
use crate::model::AlertRecord;

const MAX_ALERTS: usize = 100;

pub struct AlertsFile {
    path: PathBuf,
}

impl AlertsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Merge `new_alerts` in front of whatever is already on disk, truncate
    /// to `MAX_ALERTS`, and write back atomically.
    pub async fn prepend(&self, new_alerts: Vec<AlertRecord>) -> Result<()> {
        let mut existing = self.read().await.unwrap_or_else(|e| {
            warn!(error = %e, "alerts file unreadable, starting a fresh one");
            Vec::new()
        });

        let mut merged = new_alerts;
        merged.append(&mut existing);
        merged.truncate(MAX_ALERTS);

        self.write_atomic(&merged).await
    }

    /// Read the current alerts, tolerating a missing file (treated as
    /// empty, not an error — the file does not exist until the first
    /// alert fires).
    pub async fn read(&self) -> Result<Vec<AlertRecord>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, alerts: &[AlertRecord]) -> Result<()> {
        let body = serde_json::to_vec_pretty(alerts)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).await?;

        let tmp_path = dir.join(format!(
            ".{}.tmp",
            self.path.file_name().and_then(|n| n.to_str()).unwrap_or("alerts")
        ));
        fs::write(&tmp_path, &body).await?;
        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

impl From<serde_json::Error> for crate::error::BeaconError {
    fn from(e: serde_json::Error) -> Self {
        crate::error::BeaconError::Other(anyhow::anyhow!(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlertDetails;
    use chrono::Utc;

    fn alert(host: &str) -> AlertRecord {
        AlertRecord {
            timestamp: Utc::now(),
            host: host.to_string(),
            display_host: host.to_string(),
            p_score: 0.8,
            details: AlertDetails {
                fft_peak: 0.9,
                autocorr_max: 0.9,
                entropy_norm: 0.2,
                samples: 600,
            },
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let alerts = AlertsFile::new(dir.path().join("alerts.json"));
        assert!(alerts.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prepend_puts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let alerts = AlertsFile::new(dir.path().join("alerts.json"));
        alerts.prepend(vec![alert("a")]).await.unwrap();
        alerts.prepend(vec![alert("b")]).await.unwrap();
        let all = alerts.read().await.unwrap();
        assert_eq!(all[0].host, "b");
        assert_eq!(all[1].host, "a");
    }

    #[tokio::test]
    async fn truncates_to_one_hundred() {
        let dir = tempfile::tempdir().unwrap();
        let alerts = AlertsFile::new(dir.path().join("alerts.json"));
        for batch in 0..16 {
            let batch_alerts: Vec<AlertRecord> = (0..10)
                .map(|i| alert(&format!("host-{batch}-{i}")))
                .collect();
            alerts.prepend(batch_alerts).await.unwrap();
        }
        let all = alerts.read().await.unwrap();
        assert_eq!(all.len(), MAX_ALERTS);
        // Last batch written (batch 15) must be at the front.
        assert!(all[0].host.starts_with("host-15-"));
    }
}
