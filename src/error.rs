// src/error.rs
//
// None of these are fatal to a long-running process — callers at the
// pass/batch boundary log and continue (see scheduler.rs, ingest/mod.rs).
// Numerical degeneracy is deliberately absent as a variant: the feature
// extractor returns its defined degenerate value instead of an error.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeaconError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("malformed config at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("alerts file io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BeaconError>;
