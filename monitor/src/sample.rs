//! Sample data model and the stable structured record
//!
//! A `Sample` is one measurement produced per tick; `SampleRecord` is
//! the machine-readable envelope emitted in structured mode. Its field
//! names are part of the tool's stable output contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Memory breakdown for one sample, in bytes.
///
/// All five fields are meaningful only in self mode. For child and pid
/// targets the stats source reports a single aggregate figure, which
/// fills `heap_used`, `heap_total` and `rss` alike; `external` and
/// `array_buffers` stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBreakdown {
    pub heap_used: u64,
    pub heap_total: u64,
    pub rss: u64,
    pub external: u64,
    pub array_buffers: u64,
}

impl MemoryBreakdown {
    /// Collapse a single aggregate memory figure onto the breakdown,
    /// as used for child/pid targets.
    pub fn from_aggregate(bytes: u64) -> Self {
        Self {
            heap_used: bytes,
            heap_total: bytes,
            rss: bytes,
            external: 0,
            array_buffers: 0,
        }
    }
}

/// CPU usage for one sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStat {
    /// Percent of one core; may transiently exceed 100 on multi-core
    /// bursts.
    pub percent: f64,
}

/// Disk usage for the root volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub drive: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// One measurement of the target process
#[derive(Debug, Clone)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub pid: u32,
    pub memory: MemoryBreakdown,
    pub cpu: CpuStat,
    pub disk: Option<DiskSnapshot>,
}

/// Projection of a sample kept for charting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub at: DateTime<Utc>,
    pub heap_used: u64,
    pub rss: u64,
}

impl From<&Sample> for ChartPoint {
    fn from(sample: &Sample) -> Self {
        Self {
            at: sample.timestamp,
            heap_used: sample.memory.heap_used,
            rss: sample.memory.rss,
        }
    }
}

/// Human-readable byte strings carried alongside the raw figures in
/// structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedFields {
    pub heap_used: String,
    pub heap_total: String,
    pub rss: String,
    pub threshold: String,
}

/// The stable structured-mode record, one per tick
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRecord {
    /// RFC-3339 timestamp
    pub timestamp: String,
    pub pid: u32,
    pub memory: MemoryBreakdown,
    pub cpu: CpuStat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskSnapshot>,
    pub threshold: u64,
    pub breach_count: u64,
    pub is_breach: bool,
    /// `"self"`, `"child"` or `"pid"`
    pub mode: String,
    pub formatted: FormattedFields,
}

impl SampleRecord {
    pub fn new(sample: &Sample, threshold: u64, breach_count: u64, is_breach: bool, mode: &str) -> Self {
        Self {
            timestamp: sample.timestamp.to_rfc3339(),
            pid: sample.pid,
            memory: sample.memory,
            cpu: sample.cpu,
            disk: sample.disk.clone(),
            threshold,
            breach_count,
            is_breach,
            mode: mode.to_string(),
            formatted: FormattedFields {
                heap_used: format_bytes(sample.memory.heap_used),
                heap_total: format_bytes(sample.memory.heap_total),
                rss: format_bytes(sample.memory.rss),
                threshold: format_bytes(threshold),
            },
        }
    }
}

/// Format a byte count with binary units, two decimal places
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS` for log lines
pub fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_with_heap(heap_used: u64) -> Sample {
        Sample {
            timestamp: Utc::now(),
            pid: 4242,
            memory: MemoryBreakdown {
                heap_used,
                heap_total: heap_used * 2,
                rss: heap_used * 3,
                external: 0,
                array_buffers: 0,
            },
            cpu: CpuStat { percent: 12.5 },
            disk: None,
        }
    }

    #[test]
    fn aggregate_collapses_fields() {
        let memory = MemoryBreakdown::from_aggregate(1024);
        assert_eq!(memory.heap_used, 1024);
        assert_eq!(memory.heap_total, 1024);
        assert_eq!(memory.rss, 1024);
        assert_eq!(memory.external, 0);
        assert_eq!(memory.array_buffers, 0);
    }

    #[test]
    fn record_round_trip_preserves_breach_fields() {
        let record = SampleRecord::new(&sample_with_heap(52 * 1024 * 1024), 50 * 1024 * 1024, 7, true, "self");
        let json = serde_json::to_string(&record).unwrap();
        let parsed: SampleRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.threshold, record.threshold);
        assert_eq!(parsed.breach_count, 7);
        assert!(parsed.is_breach);
        assert_eq!(parsed.mode, "self");
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let record = SampleRecord::new(&sample_with_heap(1024), 2048, 0, false, "pid");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"heapUsed\""));
        assert!(json.contains("\"breachCount\""));
        assert!(json.contains("\"isBreach\""));
        // Absent disk info is omitted entirely
        assert!(!json.contains("\"disk\""));
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn chart_point_projection() {
        let sample = sample_with_heap(100);
        let point = ChartPoint::from(&sample);
        assert_eq!(point.heap_used, 100);
        assert_eq!(point.rss, 300);
        assert_eq!(point.at, sample.timestamp);
    }
}
