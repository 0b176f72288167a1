//! The `OutputWriter` trait implemented by backend writers.

use des_sim::SimReport;

use crate::{EventRow, OutputResult, TickSummaryRow};

/// Sink for telemetry rows.
///
/// Errors are stored by the listener and retrieved with
/// [`TelemetryListener::take_error`][crate::TelemetryListener::take_error].
pub trait OutputWriter {
    /// Write a batch of event rows.
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()>;

    /// Write one tick summary row.
    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Write the counters of a finished run.
    fn write_report(&mut self, report: &SimReport) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Calls after the first are no-ops.
    fn finish(&mut self) -> OutputResult<()>;
}
