//! Append-only dedup audit trail used for offline threshold tuning.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupKind {
    /// Merged, but below the high-confidence threshold.
    Dodgy,
    /// Near miss above the review floor, not merged.
    Avoided,
}

impl DedupKind {
    pub fn stream(&self) -> &'static str {
        match self {
            DedupKind::Dodgy => "dodgy",
            DedupKind::Avoided => "avoided",
        }
    }
}

impl Display for DedupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stream())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupRecord {
    pub kind: DedupKind,
    pub new_name: String,
    pub matched_name: String,
    pub score: f32,
}

impl Display for DedupRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({:.3})",
            self.new_name, self.matched_name, self.score
        )
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, record: &DedupRecord) -> std::io::Result<()>;
}

/// Writes each stream to its own file: `dodgy_dedupes.txt`, `avoided_dedupes.txt`.
pub struct FileAudit {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileAudit {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn stream_path(&self, kind: DedupKind) -> PathBuf {
        self.dir.join(format!("{}_dedupes.txt", kind.stream()))
    }
}

impl AuditSink for FileAudit {
    fn record(&self, record: &DedupRecord) -> std::io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "audit lock poisoned"))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.stream_path(record.kind))?;
        writeln!(file, "{record}")
    }
}

/// Keeps records in memory; used by dry runs and tests.
#[derive(Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<DedupRecord>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DedupRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn of_kind(&self, kind: DedupKind) -> Vec<DedupRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, record: &DedupRecord) -> std::io::Result<()> {
        self.records
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "audit lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
