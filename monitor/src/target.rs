//! Target resolution: which process a session samples
//!
//! Resolution runs once at `start`, before the first tick. External
//! pids are probed for existence; child commands are spawned with
//! inherited stdio and supervised by a watcher task that reports the
//! exit reason back to the monitor.

use std::fmt;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid as NixPid;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::TargetSpec;
use crate::error::{MonitorError, Result};
use crate::stats::StatCollector;

/// Settle delay between spawning a child and the first sample, to
/// avoid racing pid availability.
const SPAWN_SETTLE: Duration = Duration::from_millis(100);

/// Why a supervised child went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildExit {
    Code(i32),
    Signal(i32),
    Unknown,
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildExit::Code(code) => write!(f, "code {code}"),
            ChildExit::Signal(signal) => write!(f, "signal {signal}"),
            ChildExit::Unknown => write!(f, "unknown status"),
        }
    }
}

/// Events the watcher task reports to the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEvent {
    /// The supervised child exited (normal or signaled); the session
    /// must stop.
    ChildExited(ChildExit),
    /// Supervision itself failed after launch; also stops the session.
    ChildError(String),
}

/// The resolved sampling source for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTarget {
    Own { pid: u32 },
    Child { pid: u32 },
    External { pid: u32 },
}

impl ResolvedTarget {
    pub fn pid(&self) -> u32 {
        match self {
            ResolvedTarget::Own { pid }
            | ResolvedTarget::Child { pid }
            | ResolvedTarget::External { pid } => *pid,
        }
    }

    pub fn is_child(&self) -> bool {
        matches!(self, ResolvedTarget::Child { .. })
    }
}

/// Resolve the target selection into a sampling source.
///
/// Failures here are fatal startup errors; the process must exit
/// non-zero before any tick runs.
pub async fn resolve(
    spec: &TargetSpec,
    collector: &mut StatCollector,
    events: mpsc::Sender<TargetEvent>,
) -> Result<ResolvedTarget> {
    match spec {
        TargetSpec::Own => Ok(ResolvedTarget::Own {
            pid: std::process::id(),
        }),
        TargetSpec::ExternalPid { pid } => {
            collector.probe_pid(*pid)?;
            Ok(ResolvedTarget::External { pid: *pid })
        }
        TargetSpec::Child { command, args } => {
            let mut child = Command::new(command)
                .args(args)
                .spawn()
                .map_err(|source| MonitorError::Spawn {
                    command: command.clone(),
                    source,
                })?;

            let pid = child.id().ok_or_else(|| MonitorError::Spawn {
                command: command.clone(),
                source: std::io::Error::other("child exited before pid was recorded"),
            })?;

            tokio::spawn(async move {
                let event = match child.wait().await {
                    Ok(status) => TargetEvent::ChildExited(exit_reason(status)),
                    Err(e) => TargetEvent::ChildError(e.to_string()),
                };
                let _ = events.send(event).await;
            });

            tokio::time::sleep(SPAWN_SETTLE).await;
            Ok(ResolvedTarget::Child { pid })
        }
    }
}

fn exit_reason(status: std::process::ExitStatus) -> ChildExit {
    if let Some(code) = status.code() {
        return ChildExit::Code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ChildExit::Signal(signal);
        }
    }
    ChildExit::Unknown
}

/// Ask a supervised child to terminate gracefully. Best-effort: the
/// child may already be gone.
pub fn terminate_child(pid: u32) {
    if let Err(e) = kill(NixPid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::debug!("SIGTERM to child {pid} failed: {e}");
    }
}
