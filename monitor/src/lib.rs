//! memwatch monitor core
//!
//! A resource-sampling monitor: periodically measures memory and CPU of
//! a target process (itself, a spawned child, or an external pid),
//! compares each sample against a byte threshold, tracks breach history
//! and keeps a bounded sliding window of recent samples for charting.
//!
//! Rendering, argument parsing and signal wiring live in the CLI crate;
//! this library owns all state, timing and failure handling.

pub mod breach;
pub mod chart;
pub mod config;
pub mod disk;
pub mod error;
pub mod logfile;
pub mod monitor;
pub mod output;
pub mod sample;
pub mod snapshot;
pub mod stats;
pub mod target;

pub use config::{MonitorConfig, OutputMode, SnapshotRequest, TargetSpec, MAX_CHART_POINTS};
pub use error::{MonitorError, Result};
pub use monitor::{Monitor, SessionStatus};
pub use output::OutputSink;
pub use sample::{format_bytes, DiskSnapshot, MemoryBreakdown, Sample, SampleRecord};
