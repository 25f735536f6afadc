//! Filesystem persistence for the stat store.
//!
//! Layout under the data directory:
//! - `tables/<TEAM>.json`: one team table per file
//! - `master.jsonl`: one master row per line, line number = row
//! - `formatting/<TEAM>.jsonl`, `formatting/master.jsonl`: cell colors
//! - `raw/`: HTTP response cache
//! - `state/last_sync.json`: report of the last cycle

mod jsonl;
mod tables;

pub use jsonl::*;
pub use tables::*;

use std::path::PathBuf;
use thiserror::Error;

use crate::models::TeamCode;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Bad row at {path}:{line}: {source}")]
    BadLine {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Stored tables are inconsistent: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Refusing to overwrite existing tables in {0}")]
    AlreadyInitialized(PathBuf),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join("tables")
    }

    pub fn team_table_path(&self, team: &TeamCode) -> PathBuf {
        self.tables_dir().join(format!("{}.json", team))
    }

    pub fn master_path(&self) -> PathBuf {
        self.data_dir.join("master.jsonl")
    }

    pub fn formatting_dir(&self) -> PathBuf {
        self.data_dir.join("formatting")
    }

    pub fn team_formatting_path(&self, team: &TeamCode) -> PathBuf {
        self.formatting_dir().join(format!("{}.jsonl", team))
    }

    pub fn master_formatting_path(&self) -> PathBuf {
        self.formatting_dir().join("master.jsonl")
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn last_sync_path(&self) -> PathBuf {
        self.state_dir().join("last_sync.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
