//! Flat-file JSON storage for schedule records.
//!
//! The whole store is one JSON array, loaded and saved wholesale. There is
//! no partial-update API: every mutation goes through [`ScheduleStore::update`],
//! which holds the store lock across the load, the transform, and the save so
//! trigger firings cannot interleave with admin commands.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::warn;

use bossbot_types::ScheduleRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent store for schedule records, backed by a single JSON file.
pub struct ScheduleStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record. An absent file is initialized to `[]` and yields
    /// an empty list; an unparsable file is logged and also yields an empty
    /// list, never an error.
    pub async fn load_all(&self) -> Result<Vec<ScheduleRecord>> {
        let _guard = self.lock.lock().await;
        read_records(&self.path)
    }

    /// Replace the entire backing contents with exactly the given records.
    pub async fn save_all(&self, records: &[ScheduleRecord]) -> Result<()> {
        let _guard = self.lock.lock().await;
        write_records(&self.path, records)
    }

    /// Load, transform, save — one critical section. Returns the records
    /// as saved so callers can rebuild triggers or report counts.
    pub async fn update<F>(&self, f: F) -> Result<Vec<ScheduleRecord>>
    where
        F: FnOnce(Vec<ScheduleRecord>) -> Vec<ScheduleRecord>,
    {
        let _guard = self.lock.lock().await;
        let records = f(read_records(&self.path)?);
        write_records(&self.path, &records)?;
        Ok(records)
    }
}

fn read_records(path: &Path) -> Result<Vec<ScheduleRecord>> {
    if !path.exists() {
        write_records(path, &[])?;
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str(&content) {
        Ok(records) => Ok(records),
        Err(e) => {
            warn!(path = %path.display(), "Unparsable schedule file, treating as empty: {e}");
            Ok(Vec::new())
        }
    }
}

fn write_records(path: &Path, records: &[ScheduleRecord]) -> Result<()> {
    let content = serde_json::to_string_pretty(records)?;
    std::fs::write(path, content)?;
    Ok(())
}
