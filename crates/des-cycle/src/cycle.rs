//! Cycle definitions: what a recurring schedule looks like.
//!
//! A [`Cycle`] is an immutable, cheaply cloneable description.  Iteration
//! state lives in [`CycleIterator`], built with [`Cycle::iter`].
//!
//! # Termination
//!
//! [`Termination::Until`] is an absolute timestamp for the root cycle and an
//! offset from the parent's timestamp for a subcycle.  Independently of the
//! termination, every level stops at the bound handed down by its parent (or
//! the iterator's absolute end for the root).

use std::fmt;
use std::sync::Arc;

use des_core::Tick;

use crate::{CycleError, CycleIterator, CycleResult};

// ── Period ────────────────────────────────────────────────────────────────────

/// Distance from one periodic timestamp to the next.
#[derive(Clone)]
pub enum Period {
    Fixed(u64),
    /// Time-dependent period: called with the timestamp just emitted.
    Variable(Arc<dyn Fn(Tick) -> u64 + Send + Sync>),
}

impl Period {
    #[inline]
    pub fn after(&self, ts: Tick) -> u64 {
        match self {
            Period::Fixed(p) => *p,
            Period::Variable(f) => f(ts),
        }
    }
}

impl fmt::Debug for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Fixed(p) => f.debug_tuple("Fixed").field(p).finish(),
            Period::Variable(_) => f.write_str("Variable(..)"),
        }
    }
}

// ── Termination ───────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Termination {
    /// Only the externally supplied bound ends the level.
    #[default]
    Infinite,
    /// Stop before this timestamp (see the module docs for subcycles).
    Until(Tick),
    /// Stop after this many timestamps.  `Iterations(0)` means infinite.
    Iterations(u32),
}

// ── Rounding ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoundingMode {
    /// Nearest multiple of the scale, halves rounding up.
    Round,
    Ceil,
    Floor,
}

/// Snap every emitted timestamp to a `scale` grid, then add `shift`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rounding {
    pub mode:  RoundingMode,
    pub scale: u64,
    pub shift: i64,
}

impl Rounding {
    pub fn apply(&self, value: u64) -> u64 {
        let s = self.scale;
        let snapped = match self.mode {
            RoundingMode::Round => value.saturating_add(s / 2) / s * s,
            RoundingMode::Ceil => value.div_ceil(s).saturating_mul(s),
            RoundingMode::Floor => value / s * s,
        };
        (snapped as i128 + self.shift as i128).clamp(0, u64::MAX as i128) as u64
    }
}

// ── Weekday ───────────────────────────────────────────────────────────────────

/// Day of the week, counted from the start of a weekly cycle's period.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    #[inline]
    pub fn index(self) -> u64 {
        self as u64
    }
}

// ── Cycle ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub(crate) enum Pattern {
    Periodic { start_offset: u64, period: Period },
    /// Ascending offsets relative to the level start.
    Table { offsets: Arc<[u64]> },
}

/// A composable recurring schedule.
#[derive(Clone, Debug)]
pub struct Cycle {
    pub(crate) pattern:     Pattern,
    pub(crate) termination: Termination,
    pub(crate) rounding:    Option<Rounding>,
    pub(crate) subcycle:    Option<Box<Cycle>>,
}

impl Cycle {
    /// Fixed-period cycle starting `start_offset` ticks after the level start.
    ///
    /// A zero period emits the start timestamp once.
    pub fn periodic(start_offset: u64, period: u64, termination: Termination) -> Self {
        Self::with_pattern(
            Pattern::Periodic { start_offset, period: Period::Fixed(period) },
            termination,
        )
    }

    /// Variable-period cycle: `period(ts)` is the gap after timestamp `ts`.
    pub fn variable<F>(start_offset: u64, period: F, termination: Termination) -> Self
    where
        F: Fn(Tick) -> u64 + Send + Sync + 'static,
    {
        Self::with_pattern(
            Pattern::Periodic { start_offset, period: Period::Variable(Arc::new(period)) },
            termination,
        )
    }

    /// Explicit list of ascending offsets relative to the level start.
    pub fn table(offsets: Vec<u64>) -> CycleResult<Self> {
        if offsets.is_empty() {
            return Err(CycleError::EmptyTable);
        }
        if let Some(w) = offsets.windows(2).find(|w| w[1] < w[0]) {
            return Err(CycleError::UnsortedTable { previous: w[0], offset: w[1] });
        }
        Ok(Self::with_pattern(
            Pattern::Table { offsets: offsets.into() },
            Termination::Infinite,
        ))
    }

    /// Weekly cycle: a 7-day periodic parent with one timestamp per listed
    /// weekday.  Day 0 of the parent period is `Weekday::Monday`.
    pub fn weekly(
        days:          &[Weekday],
        ticks_per_day: u64,
        start_offset:  u64,
        termination:   Termination,
    ) -> CycleResult<Self> {
        if days.is_empty() {
            return Err(CycleError::EmptyWeek);
        }
        if ticks_per_day == 0 {
            return Err(CycleError::ZeroDay);
        }
        let mut offsets: Vec<u64> = days.iter().map(|d| d.index() * ticks_per_day).collect();
        offsets.sort_unstable();
        offsets.dedup();

        let week = Cycle::periodic(start_offset, 7 * ticks_per_day, termination);
        Ok(week.with_subcycle(Cycle::table(offsets)?))
    }

    /// Replace this level's termination rule.
    pub fn terminating(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    /// Snap this level's timestamps to a grid (`mode(value, scale) + shift`).
    pub fn rounded(mut self, mode: RoundingMode, scale: u64, shift: i64) -> CycleResult<Self> {
        if scale == 0 {
            return Err(CycleError::ZeroScale);
        }
        self.rounding = Some(Rounding { mode, scale, shift });
        Ok(self)
    }

    /// Attach `subcycle` below the deepest level of this cycle.
    pub fn with_subcycle(mut self, subcycle: Cycle) -> Self {
        match self.subcycle {
            Some(inner) => self.subcycle = Some(Box::new(inner.with_subcycle(subcycle))),
            None => self.subcycle = Some(Box::new(subcycle)),
        }
        self
    }

    /// Number of levels (1 for a flat cycle).
    pub fn depth(&self) -> usize {
        1 + self.subcycle.as_ref().map_or(0, |s| s.depth())
    }

    /// Lazy iterator over the timestamps of this cycle in `[start, end)`.
    pub fn iter(&self, start: Tick, end: Tick) -> CycleIterator {
        CycleIterator::new(self, start, end)
    }

    fn with_pattern(pattern: Pattern, termination: Termination) -> Self {
        Self { pattern, termination, rounding: None, subcycle: None }
    }
}
