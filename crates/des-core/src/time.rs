//! Simulation time model.
//!
//! # Design
//!
//! Virtual time is an integer `Tick`.  Unlike a fixed-step loop the kernel
//! does not visit every tick: the logical process jumps straight to the next
//! timestamp that has events.  The mapping to wall-clock time lives in
//! `SimClock`:
//!
//!   wall_time = start_unix_secs + tick * tick_duration_secs
//!
//! Integer ticks keep every cycle and duration computation exact.

use std::fmt;

use crate::{DesError, DesResult};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation timestamp.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Largest representable timestamp, used as "never expires".
    pub const MAX: Tick = Tick(u64::MAX);

    /// Return the tick `n` steps after `self`, saturating at [`Tick::MAX`].
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0.saturating_add(n))
    }

    /// Ticks elapsed from `earlier` to `self` (zero if `earlier` is later).
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        self.offset(rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.since(rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Converts between tick counts and Unix wall-clock seconds.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Unix timestamp (seconds since epoch) of tick 0.
    pub start_unix_secs: i64,
    /// How many real seconds one tick represents.
    pub tick_duration_secs: u32,
}

impl SimClock {
    pub fn new(start_unix_secs: i64, tick_duration_secs: u32) -> Self {
        Self { start_unix_secs, tick_duration_secs }
    }

    /// Unix timestamp corresponding to `tick`.
    #[inline]
    pub fn unix_secs(&self, tick: Tick) -> i64 {
        self.start_unix_secs + tick.0 as i64 * self.tick_duration_secs as i64
    }

    /// Break the elapsed time at `tick` into (day, hour, minute) components.
    pub fn elapsed_dhm(&self, tick: Tick) -> (u64, u32, u32) {
        let total_secs = tick.0.saturating_mul(self.tick_duration_secs as u64);
        let days = total_secs / 86_400;
        let hours = ((total_secs % 86_400) / 3_600) as u32;
        let minutes = ((total_secs % 3_600) / 60) as u32;
        (days, hours, minutes)
    }

    // ── Tick-count helpers ────────────────────────────────────────────────

    /// How many ticks span `secs` seconds? (rounds up)
    #[inline]
    pub fn ticks_for_secs(&self, secs: u64) -> u64 {
        secs.div_ceil(self.tick_duration_secs.max(1) as u64)
    }

    #[inline]
    pub fn ticks_for_hours(&self, hours: u64) -> u64 {
        self.ticks_for_secs(hours * 3_600)
    }

    #[inline]
    pub fn ticks_for_days(&self, days: u64) -> u64 {
        self.ticks_for_secs(days * 86_400)
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
///
/// Typically deserialized by the application (with the `serde` feature) and
/// passed to the simulation builder.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Unix timestamp for tick 0.
    pub start_unix_secs: i64,

    /// Seconds per tick.  Default: 60.
    pub tick_duration_secs: u32,

    /// The simulation horizon: the run ends once the clock reaches this tick.
    pub total_ticks: u64,

    /// Master RNG seed.  With a single worker the same seed always produces
    /// identical results.
    pub seed: u64,

    /// Worker count for same-tick event execution.  `Some(1)` runs fully
    /// sequentially; `None` uses all logical cores.
    pub num_workers: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_unix_secs:    0,
            tick_duration_secs: 60,
            total_ticks:        0,
            seed:               0,
            num_workers:        Some(1),
        }
    }
}

impl SimConfig {
    /// The tick at which the simulation ends.
    #[inline]
    pub fn horizon(&self) -> Tick {
        Tick(self.total_ticks)
    }

    /// Construct a `SimClock` for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.start_unix_secs, self.tick_duration_secs)
    }

    /// Reject configurations the kernel cannot run.
    pub fn validate(&self) -> DesResult<()> {
        if self.tick_duration_secs == 0 {
            return Err(DesError::Config("tick_duration_secs must be > 0".into()));
        }
        if self.num_workers == Some(0) {
            return Err(DesError::Config("num_workers must be > 0".into()));
        }
        Ok(())
    }
}
