// src/ingest/mod.rs
//
// Tails the monitor's conn.log, parses each new line, and commits each
// batch once. The cursor is an in-process byte offset only — never
// persisted, so a restart re-reads from byte zero and the store sees the
// same lines again. That duplicate-insertion-on-restart behavior is
// accepted rather than guarded against; see DESIGN.md for the rationale.

pub mod parse;

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::FlowRecord;
use crate::store::FlowStore;

use self::parse::{parse_line, ParseLineError};

/// Tails a single conn.log file, committing well-formed lines in batches.
pub struct FlowIngester {
    path: PathBuf,
    cursor: u64,
}

impl FlowIngester {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cursor: 0,
        }
    }

    /// Read everything new since the last call, parse it, and commit the
    /// well-formed records in one batch. Malformed lines are logged and
    /// skipped without affecting the rest of the batch. Returns the number
    /// of records committed.
    pub async fn poll_once(&mut self, store: &dyn FlowStore) -> Result<usize> {
        let mut file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "conn log not readable, will retry next pass");
                return Ok(0);
            }
        };

        let len = file.metadata().await?.len();
        if len < self.cursor {
            // File was truncated/rotated out from under us; restart from 0.
            debug!(path = %self.path.display(), "conn log shrank, resetting cursor");
            self.cursor = 0;
        }

        file.seek(SeekFrom::Start(self.cursor)).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        if buf.is_empty() {
            return Ok(0);
        }

        let text = String::from_utf8_lossy(&buf);
        let mut complete_len = 0usize;
        let mut records = Vec::new();

        for segment in split_keep_trailing_partial(&text, &mut complete_len) {
            match parse_line(segment) {
                Ok(rec) => records.push(rec),
                Err(ParseLineError::Skip) => {}
                Err(e) => warn!(line = %segment, error = %e, "skipping malformed conn log line"),
            }
        }

        self.cursor += complete_len as u64;

        let committed = records.len();
        if committed > 0 {
            store.insert_flows(&records).await?;
        }
        Ok(committed)
    }

    /// Run forever, waking on filesystem events for the conn.log's parent
    /// directory and falling back to a timer so a missed event never stalls
    /// ingestion indefinitely.
    pub async fn run(mut self, store: Arc<dyn FlowStore>, poll_interval: Duration) -> Result<()> {
        let (tx, mut rx) = mpsc::channel(16);
        let _watcher = spawn_watcher(&self.path, tx);

        loop {
            if let Err(e) = self.poll_once(store.as_ref()).await {
                warn!(error = %e, "flow ingest pass failed, retrying next pass");
            }
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = rx.recv() => {}
            }
        }
    }
}

/// Splits `text` on `\n`, returning only complete lines; the trailing
/// partial line (no terminating `\n` yet) is left unconsumed so it is
/// re-read whole on the next pass. `complete_len` accumulates the byte
/// length of everything consumed, used to advance the cursor.
fn split_keep_trailing_partial<'a>(text: &'a str, complete_len: &mut usize) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut consumed = 0usize;
    for line in text.split_inclusive('\n') {
        if line.ends_with('\n') {
            out.push(line.trim_end_matches('\n').trim_end_matches('\r'));
            consumed += line.len();
        }
        // else: trailing partial line, leave it for next pass.
    }
    *complete_len = consumed;
    out
}

fn spawn_watcher(path: &Path, tx: mpsc::Sender<()>) -> Option<RecommendedWatcher> {
    let parent = path.parent()?.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            let _ = tx.try_send(());
        }
    })
    .ok()?;
    if let Err(e) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
        warn!(error = %e, "failed to watch conn log directory, falling back to polling only");
        return None;
    }
    Some(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::io::Write;

    #[tokio::test]
    async fn ingests_well_formed_lines_and_advances_cursor() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "1700000000.0\tU1\t10.0.0.1\t1234\t10.0.0.2\t80\ttcp\t-\t-\t10\t20\tSF"
        )
        .unwrap();
        let mut ingester = FlowIngester::new(f.path());
        let store = MemoryStore::new();
        let n = ingester.poll_once(&store).await.unwrap();
        assert_eq!(n, 1);
        assert!(ingester.cursor > 0);

        // Nothing new: second poll commits nothing.
        let n2 = ingester.poll_once(&store).await.unwrap();
        assert_eq!(n2, 0);
    }

    #[tokio::test]
    async fn skips_malformed_lines_without_aborting_batch() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "not-a-valid-line").unwrap();
        writeln!(
            f,
            "1700000000.0\tU1\t10.0.0.1\t1234\t10.0.0.2\t80\ttcp\t-\t-\t10\t20\tSF"
        )
        .unwrap();
        let mut ingester = FlowIngester::new(f.path());
        let store = MemoryStore::new();
        let n = ingester.poll_once(&store).await.unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn trailing_partial_line_is_not_consumed() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "1700000000.0\tU1\t10.0.0.1\t1234\t10.0.0.2\t80\ttcp\t-\t-\t10\t20\tSF\n1700000001.0\tU2\tincomplete").unwrap();
        let mut ingester = FlowIngester::new(f.path());
        let store = MemoryStore::new();
        let n = ingester.poll_once(&store).await.unwrap();
        assert_eq!(n, 1);

        let mut f2 = std::fs::OpenOptions::new().append(true).open(ingester.path.clone()).unwrap();
        writeln!(f2, "\t10.0.0.2\t80\ttcp\t-\t-\t10\t20\tSF").unwrap();
        let n2 = ingester.poll_once(&store).await.unwrap();
        assert_eq!(n2, 1);
    }

    #[tokio::test]
    async fn missing_file_is_tolerated() {
        let mut ingester = FlowIngester::new("/nonexistent/path/conn.log");
        let store = MemoryStore::new();
        let n = ingester.poll_once(&store).await.unwrap();
        assert_eq!(n, 0);
    }
}
