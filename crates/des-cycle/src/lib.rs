//! `des-cycle` — lazy, bounded, monotonic timestamp generators.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                       |
//! |------------|----------------------------------------------------------------|
//! | [`cycle`]  | `Cycle`, `Period`, `Termination`, `Rounding`, `Weekday`        |
//! | [`iter`]   | `CycleIterator`                                                |
//! | [`error`]  | `CycleError`, `CycleResult<T>`                                 |
//!
//! # Cycle model (summary)
//!
//! A cycle is a chain of levels: the root level emits timestamps inside
//! `[abs_start, abs_end)`, and every subcycle level is re-run inside the
//! window between its parent's current timestamp and the parent's next one.
//! Only the deepest level's timestamps are emitted:
//!
//! ```text
//! root   : 0 ─────────────── 100 ─────────────── 200 ──── (end 250)
//! sub    : 0, 10, 20         100, 110, 120       200, 210, 220
//! ```
//!
//! Resource timetables, cancellation calendars and element generators are all
//! driven by a `CycleIterator`, one event per emitted timestamp.

pub mod cycle;
pub mod error;
pub mod iter;


pub use cycle::{Cycle, Period, Rounding, RoundingMode, Termination, Weekday};
pub use error::{CycleError, CycleResult};
pub use iter::CycleIterator;
