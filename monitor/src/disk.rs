//! Disk usage probe for the root volume
//!
//! The monitor consumes this through a trait so tests can substitute
//! failing or canned probes; the default implementation asks sysinfo
//! for the mounted disk list once per tick.

use sysinfo::Disks;

use crate::error::{MonitorError, Result};
use crate::sample::DiskSnapshot;

/// Supplies free/used/total bytes for one volume, once per tick
pub trait DiskProbe: Send + Sync {
    fn probe(&self) -> Result<DiskSnapshot>;
}

/// Default probe: prefers the `/` mount point, falling back to the
/// largest visible volume.
#[derive(Debug, Default)]
pub struct SystemDiskProbe;

impl DiskProbe for SystemDiskProbe {
    fn probe(&self) -> Result<DiskSnapshot> {
        let disks = Disks::new_with_refreshed_list();

        let disk = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new("/"))
            .or_else(|| disks.list().iter().max_by_key(|d| d.total_space()))
            .ok_or_else(|| MonitorError::DiskProbe("no disks visible".to_string()))?;

        let total = disk.total_space();
        let free = disk.available_space();
        Ok(DiskSnapshot {
            drive: disk.mount_point().display().to_string(),
            total,
            used: total.saturating_sub(free),
            free,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reports_consistent_totals() {
        // Skip silently on machines with no visible disks (containers)
        if let Ok(snapshot) = SystemDiskProbe.probe() {
            assert!(snapshot.total >= snapshot.free);
            assert_eq!(snapshot.used, snapshot.total - snapshot.free);
            assert!(!snapshot.drive.is_empty());
        }
    }
}
