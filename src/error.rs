//! Error types for the allocation engine
//!
//! None of these abort a rebuild or an assignment run: source faults are
//! isolated to the unit that produced them and persistence faults degrade to
//! an empty table.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{JobCategoryId, WorkerId};

/// Fault reported by the external worker/category source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("unknown worker {0}")]
    UnknownWorker(WorkerId),
    #[error("unknown job category {0}")]
    UnknownCategory(JobCategoryId),
    #[error("worker source failure: {0}")]
    Adapter(String),
}

/// Fault while reading or writing the persisted allocation table
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed allocation state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Fault while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },
}
