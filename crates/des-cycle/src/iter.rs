//! `CycleIterator` — forward-only walk over a cycle's timestamps.
//!
//! One [`Level`] per nesting depth.  `next()` pops the deepest level; when a
//! level runs dry the walk climbs to its parent, advances it, and resets every
//! level below against the parent's new window:
//!
//! ```text
//! child.reset(base = parent_ts, bound = parent.peek() or parent.end)
//! ```
//!
//! Iterators cannot be rewound.  Build a fresh one with [`Cycle::iter`] to
//! start over.

use std::iter::FusedIterator;

use des_core::Tick;

use crate::cycle::{Pattern, Rounding};
use crate::{Cycle, Termination};

// ── Level ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Cursor {
    Exhausted,
    Periodic { next: u64, emitted: u32 },
    Table { idx: usize },
}

#[derive(Clone, Debug)]
struct Level {
    pattern:     Pattern,
    termination: Termination,
    rounding:    Option<Rounding>,
    is_root:     bool,
    base:        u64,
    end:         u64,
    cursor:      Cursor,
}

impl Level {
    fn new(cycle: &Cycle, is_root: bool) -> Self {
        Self {
            pattern:     cycle.pattern.clone(),
            termination: cycle.termination,
            rounding:    cycle.rounding,
            is_root,
            base:        0,
            end:         0,
            cursor:      Cursor::Exhausted,
        }
    }

    /// Restart this level inside `[base, bound)`.
    fn reset(&mut self, base: u64, bound: u64) {
        let term_end = match self.termination {
            Termination::Until(t) if self.is_root => t.0,
            Termination::Until(t) => base.saturating_add(t.0),
            _ => u64::MAX,
        };
        self.base = base;
        self.end = bound.min(term_end);
        self.cursor = match &self.pattern {
            Pattern::Periodic { start_offset, .. } => Cursor::Periodic {
                next:    base.saturating_add(*start_offset),
                emitted: 0,
            },
            Pattern::Table { .. } => Cursor::Table { idx: 0 },
        };
    }

    fn iterations_left(&self, emitted: u64) -> bool {
        match self.termination {
            Termination::Iterations(n) if n > 0 => emitted < n as u64,
            _ => true,
        }
    }

    /// The raw (unrounded) timestamp the cursor points at.
    fn raw(&self) -> Option<u64> {
        match (&self.cursor, &self.pattern) {
            (Cursor::Periodic { next, emitted }, _) => {
                self.iterations_left(*emitted as u64).then_some(*next)
            }
            (Cursor::Table { idx }, Pattern::Table { offsets }) => {
                if !self.iterations_left(*idx as u64) {
                    return None;
                }
                offsets.get(*idx).map(|o| self.base.saturating_add(*o))
            }
            _ => None,
        }
    }

    /// The timestamp the next `advance` would return, without consuming it.
    fn peek(&self) -> Option<u64> {
        let raw = self.raw()?;
        if raw >= self.end {
            return None;
        }
        let ts = match self.rounding {
            Some(r) => r.apply(raw).max(self.base),
            None => raw,
        };
        (ts < self.end).then_some(ts)
    }

    fn advance(&mut self) -> Option<u64> {
        let Some(ts) = self.peek() else {
            self.cursor = Cursor::Exhausted;
            return None;
        };
        self.cursor = match (&self.cursor, &self.pattern) {
            (Cursor::Periodic { next, emitted }, Pattern::Periodic { period, .. }) => {
                match period.after(Tick(*next)) {
                    0 => Cursor::Exhausted,
                    p => Cursor::Periodic { next: next.saturating_add(p), emitted: emitted + 1 },
                }
            }
            (Cursor::Table { idx }, _) => Cursor::Table { idx: idx + 1 },
            _ => Cursor::Exhausted,
        };
        Some(ts)
    }
}

// ── CycleIterator ─────────────────────────────────────────────────────────────

/// Lazy iterator over a [`Cycle`]'s timestamps in `[start, end)`.
///
/// Emitted timestamps are non-decreasing and strictly below the active bound.
#[derive(Clone, Debug)]
pub struct CycleIterator {
    levels:    Vec<Level>,
    exhausted: bool,
}

impl CycleIterator {
    pub fn new(cycle: &Cycle, start: Tick, end: Tick) -> Self {
        let mut levels = Vec::with_capacity(cycle.depth());
        let mut current = Some(cycle);
        while let Some(c) = current {
            levels.push(Level::new(c, levels.is_empty()));
            current = c.subcycle.as_deref();
        }
        levels[0].reset(start.0, end.0);
        Self { levels, exhausted: start >= end }
    }

    /// `true` once `next()` has returned `None` (or would immediately).
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl Iterator for CycleIterator {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        if self.exhausted {
            return None;
        }
        let deepest = self.levels.len() - 1;
        let mut lvl = deepest;
        loop {
            match self.levels[lvl].advance() {
                Some(ts) if lvl == deepest => return Some(Tick(ts)),
                Some(ts) => {
                    let parent = &self.levels[lvl];
                    let bound = parent.peek().unwrap_or(parent.end);
                    self.levels[lvl + 1].reset(ts, bound);
                    lvl += 1;
                }
                None if lvl == 0 => {
                    self.exhausted = true;
                    return None;
                }
                None => lvl -= 1,
            }
        }
    }
}

impl FusedIterator for CycleIterator {}
