//! Manual heap snapshot capture and persistence
//!
//! Snapshots are decoupled from the tick cycle: they always read the
//! monitoring process's own memory, regardless of the target mode, and
//! bundle it with current session metadata. Persistence is best-effort.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::sample::{format_bytes, MemoryBreakdown};

/// Session metadata captured alongside a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSession {
    pub start_time: String,
    pub breach_count: u64,
    pub threshold: u64,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_pid: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFormatted {
    pub heap_used: String,
    pub heap_total: String,
    pub rss: String,
    pub external: String,
    pub array_buffers: String,
}

/// A persisted heap snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub timestamp: String,
    pub label: String,
    pub memory: MemoryBreakdown,
    pub formatted: SnapshotFormatted,
    pub session: SnapshotSession,
}

impl SnapshotRecord {
    pub fn new(
        at: DateTime<Utc>,
        label: Option<&str>,
        memory: MemoryBreakdown,
        session: SnapshotSession,
    ) -> Self {
        Self {
            timestamp: at.to_rfc3339(),
            label: label.unwrap_or("manual-capture").to_string(),
            memory,
            formatted: SnapshotFormatted {
                heap_used: format_bytes(memory.heap_used),
                heap_total: format_bytes(memory.heap_total),
                rss: format_bytes(memory.rss),
                external: format_bytes(memory.external),
                array_buffers: format_bytes(memory.array_buffers),
            },
            session,
        }
    }
}

/// Snapshot file name for a capture time and optional label
pub fn snapshot_filename(at: DateTime<Utc>, label: Option<&str>) -> String {
    let stamp = at.to_rfc3339().replace([':', '.'], "-");
    match label {
        Some(label) => format!("heap-snapshot-{stamp}-{label}.json"),
        None => format!("heap-snapshot-{stamp}.json"),
    }
}

/// Write a snapshot as pretty-printed JSON, returning its path.
pub fn write_snapshot(
    dir: &Path,
    at: DateTime<Utc>,
    label: Option<&str>,
    record: &SnapshotRecord,
) -> Result<PathBuf> {
    let path = dir.join(snapshot_filename(at, label));
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(&path, json).map_err(MonitorError::Snapshot)?;
    Ok(path)
}
