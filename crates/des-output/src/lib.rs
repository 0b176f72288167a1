//! `des-output` — telemetry writers for the des simulation kernel.
//!
//! | Backend | Files created                                          |
//! |---------|--------------------------------------------------------|
//! | CSV     | `events.csv`, `tick_summaries.csv`, `run_summary.csv`  |
//!
//! Backends implement [`OutputWriter`] and are driven by
//! [`TelemetryListener`], which implements `des_sim::SimListener`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use des_output::{CsvWriter, TelemetryListener};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut sim = SimulationBuilder::new(config.clone(), model)
//!     .listener(TelemetryListener::new(writer, &config))
//!     .build()?;
//! sim.run()?;
//! let mut telemetry = sim.into_listener();
//! if let Some(e) = telemetry.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use self::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::TelemetryListener;
pub use row::{EventRow, TickSummaryRow, report_rows};
pub use writer::OutputWriter;
