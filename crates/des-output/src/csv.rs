//! CSV output backend.
//!
//! Creates three files in the configured output directory:
//! - `events.csv`
//! - `tick_summaries.csv`
//! - `run_summary.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;
use des_sim::SimReport;

use crate::row::report_rows;
use crate::writer::OutputWriter;
use crate::{EventRow, OutputResult, TickSummaryRow};

const EVENT_HEADER: [&str; 8] =
    ["tick", "unix_time_secs", "kind", "element", "resource", "role", "activity", "value"];

/// Writes simulation telemetry to CSV files.
pub struct CsvWriter {
    events:    Writer<File>,
    summaries: Writer<File>,
    report:    Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create the CSV files in `dir` and write their header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut events = Writer::from_path(dir.join("events.csv"))?;
        events.write_record(EVENT_HEADER)?;

        let mut summaries = Writer::from_path(dir.join("tick_summaries.csv"))?;
        summaries.write_record(["tick", "unix_time_secs", "released_events", "telemetry"])?;

        let mut report = Writer::from_path(dir.join("run_summary.csv"))?;
        report.write_record(["counter", "value"])?;

        Ok(Self { events, summaries, report, finished: false })
    }
}

fn opt(v: Option<u32>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl OutputWriter for CsvWriter {
    fn write_events(&mut self, rows: &[EventRow]) -> OutputResult<()> {
        for row in rows {
            self.events.write_record(&[
                row.tick.to_string(),
                row.unix_time_secs.to_string(),
                row.kind.to_owned(),
                opt(row.element),
                opt(row.resource),
                opt(row.role),
                opt(row.activity),
                row.value.map(|v| v.to_string()).unwrap_or_default(),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.unix_time_secs.to_string(),
            row.released_events.to_string(),
            row.telemetry.to_string(),
        ])?;
        Ok(())
    }

    fn write_report(&mut self, report: &SimReport) -> OutputResult<()> {
        for (counter, value) in report_rows(report) {
            self.report.write_record(&[counter.to_owned(), value.to_string()])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.summaries.flush()?;
        self.report.flush()?;
        Ok(())
    }
}
