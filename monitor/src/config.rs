//! Configuration for a monitoring session
//!
//! A `MonitorConfig` is built once by the CLI layer, validated, and is
//! immutable for the lifetime of the session it describes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Number of points retained for chart rendering, independent of the
/// sampling interval.
pub const MAX_CHART_POINTS: usize = 50;

/// Which process a session samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Sample the monitoring process itself
    Own,

    /// Spawn a command and sample the resulting child
    Child { command: String, args: Vec<String> },

    /// Sample an already-running process by pid
    ExternalPid { pid: u32 },
}

impl TargetSpec {
    /// Short mode name used in the structured record
    pub fn mode_name(&self) -> &'static str {
        match self {
            TargetSpec::Own => "self",
            TargetSpec::Child { .. } => "child",
            TargetSpec::ExternalPid { .. } => "pid",
        }
    }
}

/// How samples are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// Colored status lines and optional chart
    Human,
    /// One JSON record per line
    Structured,
}

/// Request to persist a heap snapshot during the session
#[derive(Debug, Clone, Default)]
pub struct SnapshotRequest {
    /// Optional label appended to the snapshot file name
    pub label: Option<String>,

    /// Directory the snapshot file is written into (defaults to the
    /// current working directory)
    pub dir: Option<PathBuf>,
}

/// Immutable configuration for one monitoring session
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sampling interval
    pub interval: Duration,

    /// Breach threshold in bytes
    pub threshold_bytes: u64,

    /// Target selection
    pub target: TargetSpec,

    /// Output rendering mode
    pub output: OutputMode,

    /// Optional append-only log file
    pub log_file: Option<PathBuf>,

    /// Render the ASCII live chart
    pub chart: bool,

    /// Optional snapshot capture request
    pub snapshot: Option<SnapshotRequest>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            threshold_bytes: 100 * 1024 * 1024,
            target: TargetSpec::Own,
            output: OutputMode::Human,
            log_file: None,
            chart: false,
            snapshot: None,
        }
    }
}

impl MonitorConfig {
    /// Validate the configuration before a session is constructed
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(MonitorError::Config(
                "interval must be greater than zero".to_string(),
            ));
        }

        if self.threshold_bytes == 0 {
            return Err(MonitorError::Config(
                "threshold must be greater than zero".to_string(),
            ));
        }

        match &self.target {
            TargetSpec::Own => {}
            TargetSpec::Child { command, .. } => {
                if command.trim().is_empty() {
                    return Err(MonitorError::Config(
                        "child command must not be empty".to_string(),
                    ));
                }
            }
            TargetSpec::ExternalPid { pid } => {
                if *pid == 0 {
                    return Err(MonitorError::Config("PID must be non-zero".to_string()));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let config = MonitorConfig {
            interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn zero_threshold_rejected() {
        let config = MonitorConfig {
            threshold_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn empty_child_command_rejected() {
        let config = MonitorConfig {
            target: TargetSpec::Child {
                command: "  ".to_string(),
                args: vec![],
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn zero_pid_rejected() {
        let config = MonitorConfig {
            target: TargetSpec::ExternalPid { pid: 0 },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn mode_names() {
        assert_eq!(TargetSpec::Own.mode_name(), "self");
        assert_eq!(
            TargetSpec::Child { command: "ls".into(), args: vec![] }.mode_name(),
            "child"
        );
        assert_eq!(TargetSpec::ExternalPid { pid: 1 }.mode_name(), "pid");
    }
}
