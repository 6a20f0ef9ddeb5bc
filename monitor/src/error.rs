//! Error handling for the memwatch monitor core
//!
//! Errors split into two families: fatal startup errors (target
//! resolution) that must terminate the process before the first tick,
//! and recoverable per-tick errors (stat queries, disk probe, snapshot
//! persistence) that are logged and absorbed by the tick cycle.

use std::io;

use thiserror::Error;

/// The main error type for the monitor core
#[derive(Error, Debug)]
pub enum MonitorError {
    /// External pid could not be resolved at start
    #[error("process with PID {pid} not found")]
    TargetNotFound { pid: u32 },

    /// Child process could not be spawned
    #[error("failed to spawn child process '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Configuration rejected before a session was constructed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Per-tick stat query failure (target vanished between ticks)
    #[error("stat query failed for PID {pid}: {reason}")]
    Stats { pid: u32, reason: String },

    /// Disk usage probe failure
    #[error("disk check failed: {0}")]
    DiskProbe(String),

    /// Heap snapshot persistence failure
    #[error("failed to save snapshot: {0}")]
    Snapshot(#[source] io::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    /// Whether this error may terminate the process (startup family)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::TargetNotFound { .. }
                | MonitorError::Spawn { .. }
                | MonitorError::Config(_)
        )
    }

    /// Process exit code for fatal errors
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Config(_) => 2,
            MonitorError::TargetNotFound { .. } => 3,
            MonitorError::Spawn { .. } => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
