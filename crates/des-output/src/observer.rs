//! `TelemetryListener<W>` — bridges `SimListener` to an `OutputWriter`.

use tracing::warn;

use des_core::{SimClock, SimConfig, Tick};
use des_sim::{SimEvent, SimListener, SimReport};

use crate::row::{EventRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimListener`] that writes every telemetry event to an
/// [`OutputWriter`] backend.
///
/// Event rows are buffered and written in one batch per clock advance.
/// Errors from the writer are stored internally because listener methods
/// have no return value.  After `sim.run()` returns, check for errors with
/// [`take_error`][Self::take_error].
pub struct TelemetryListener<W: OutputWriter> {
    writer:     W,
    clock:      SimClock,
    pending:    Vec<EventRow>,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> TelemetryListener<W> {
    /// Create a listener backed by `writer`, using `config` for wall-clock
    /// conversion.
    pub fn new(writer: W, config: &SimConfig) -> Self {
        Self { writer, clock: config.make_clock(), pending: Vec::new(), last_error: None }
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn flush_pending(&mut self) -> usize {
        let n = self.pending.len();
        if n > 0 {
            let rows = std::mem::take(&mut self.pending);
            let result = self.writer.write_events(&rows);
            self.store_err(result);
        }
        n
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                warn!(error = %e, "telemetry write failed; further errors are dropped");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimListener for TelemetryListener<W> {
    fn on_event(&mut self, event: &SimEvent) {
        self.pending.push(EventRow::from_event(event, &self.clock));
    }

    fn on_time_advance(&mut self, now: Tick, released: usize) {
        let telemetry = self.flush_pending();
        let row = TickSummaryRow::new(now, &self.clock, released, telemetry);
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
    }

    fn on_sim_end(&mut self, report: &SimReport) {
        self.flush_pending();
        let result = self.writer.write_report(report);
        self.store_err(result);
        let result = self.writer.finish();
        self.store_err(result);
    }
}
