//! Process memory and CPU collection
//!
//! Backed by a persistent `sysinfo::System` so consecutive CPU readings
//! are deltas between refreshes. Self-mode memory reads the richer
//! per-process breakdown the OS exposes for our own pid; foreign pids
//! only yield a single aggregate figure.

use sysinfo::{Pid, System};

use crate::error::{MonitorError, Result};
use crate::sample::{CpuStat, MemoryBreakdown};

/// Stat collector for the active session
pub struct StatCollector {
    system: System,
}

impl StatCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Verify a pid exists and is queryable. Used once at start for
    /// external-pid targets.
    pub fn probe_pid(&mut self, pid: u32) -> Result<()> {
        if self.system.refresh_process(Pid::from_u32(pid)) {
            Ok(())
        } else {
            Err(MonitorError::TargetNotFound { pid })
        }
    }

    /// Aggregate memory (bytes) and CPU percent for a foreign pid.
    ///
    /// Failure here is the recoverable per-tick error: the target has
    /// disappeared between ticks.
    pub fn process_stats(&mut self, pid: u32) -> Result<(u64, f64)> {
        let sys_pid = Pid::from_u32(pid);
        if !self.system.refresh_process(sys_pid) {
            return Err(MonitorError::Stats {
                pid,
                reason: "no such process".to_string(),
            });
        }

        let process = self.system.process(sys_pid).ok_or(MonitorError::Stats {
            pid,
            reason: "process disappeared during refresh".to_string(),
        })?;

        Ok((process.memory(), f64::from(process.cpu_usage())))
    }

    /// Sample a child or external target: the aggregate figure fills
    /// the whole breakdown.
    pub fn sample_pid(&mut self, pid: u32) -> Result<(MemoryBreakdown, CpuStat)> {
        let (memory, cpu_percent) = self.process_stats(pid)?;
        Ok((
            MemoryBreakdown::from_aggregate(memory),
            CpuStat { percent: round2(cpu_percent) },
        ))
    }

    /// Sample the monitoring process itself: full memory breakdown plus
    /// CPU percent from the process-stats source.
    pub fn sample_own(&mut self, own_pid: u32) -> Result<(MemoryBreakdown, CpuStat)> {
        let memory = self.own_memory(own_pid);
        let (_, cpu_percent) = self.process_stats(own_pid)?;
        Ok((memory, CpuStat { percent: round2(cpu_percent) }))
    }

    /// Memory breakdown for our own process, used by snapshot capture
    /// regardless of the target mode. Never fails.
    pub fn own_memory(&mut self, own_pid: u32) -> MemoryBreakdown {
        self_memory(&mut self.system, own_pid)
    }
}

impl Default for StatCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Memory breakdown for our own process. Never fails: unparseable
/// sources fall back to zero-filled fields.
#[cfg(target_os = "linux")]
fn self_memory(_system: &mut System, _own_pid: u32) -> MemoryBreakdown {
    use std::fs;

    let page_size = {
        let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if raw < 1 {
            4096
        } else {
            raw as u64
        }
    };

    // /proc/self/statm: size resident shared text lib data dt (pages)
    let Ok(content) = fs::read_to_string("/proc/self/statm") else {
        return MemoryBreakdown::default();
    };
    let fields: Vec<u64> = content
        .split_whitespace()
        .map(|f| f.parse().unwrap_or(0))
        .collect();
    if fields.len() < 6 {
        return MemoryBreakdown::default();
    }

    MemoryBreakdown {
        heap_used: fields[5] * page_size,
        heap_total: fields[0] * page_size,
        rss: fields[1] * page_size,
        external: fields[2] * page_size,
        array_buffers: 0,
    }
}

/// Non-Linux fallback: the breakdown collapses onto resident size.
#[cfg(not(target_os = "linux"))]
fn self_memory(system: &mut System, own_pid: u32) -> MemoryBreakdown {
    let sys_pid = Pid::from_u32(own_pid);
    system.refresh_process(sys_pid);
    let rss = system.process(sys_pid).map(|p| p.memory()).unwrap_or(0);
    MemoryBreakdown {
        heap_used: rss,
        heap_total: rss,
        rss,
        external: 0,
        array_buffers: 0,
    }
}
