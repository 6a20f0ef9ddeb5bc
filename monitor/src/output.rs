//! Output sink contract
//!
//! The monitor core renders nothing itself; each tick's record (and
//! chart, when enabled) is handed to a sink supplied at construction.
//! The CLI provides human and structured implementations; tests supply
//! capturing sinks.

use crate::chart::ChartRender;
use crate::sample::SampleRecord;

/// Renders per-tick records and informational session events.
///
/// The monitor guarantees `emit` is never called after the session
/// reaches `Stopped`.
pub trait OutputSink: Send + Sync {
    /// Render one sample record; `chart` is present only when charting
    /// is enabled and at least two points are buffered.
    fn emit(&self, record: &SampleRecord, chart: Option<&ChartRender>);

    /// Render an informational event outside the tick cycle (child
    /// exit, snapshot notices).
    fn notify(&self, message: &str);
}
