//! Events and the time-ordered wait queue.
//!
//! # Layout
//!
//! Events are grouped by timestamp in a `BTreeMap<Tick, Vec<_>>`.  The
//! advance step takes every event of the earliest pending timestamp in one
//! pop.  Insert and pop are O(log W), W being the number of distinct future
//! timestamps.

use std::collections::BTreeMap;

use des_core::{EntityId, Tick};

// ── Event ─────────────────────────────────────────────────────────────────────

/// A time-stamped action owned by one entity.
///
/// `A` is the handler's action sum type; the kernel never looks inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event<A> {
    pub ts:     Tick,
    pub owner:  EntityId,
    pub action: A,
}

impl<A> Event<A> {
    pub fn new(ts: Tick, owner: EntityId, action: A) -> Self {
        Self { ts, owner, action }
    }
}

// ── EventQueue ────────────────────────────────────────────────────────────────

/// Future events grouped by timestamp, plus the keep-alive sentinel.
///
/// The sentinel is not an event: it only guarantees that the queue is never
/// empty before the horizon, so the logical process always has a timestamp
/// to advance to.
pub struct EventQueue<A> {
    inner:     BTreeMap<Tick, Vec<Event<A>>>,
    /// Cached event count for O(1) `len()`.
    total:     usize,
    keepalive: Option<Tick>,
}

impl<A> Default for EventQueue<A> {
    fn default() -> Self {
        Self { inner: BTreeMap::new(), total: 0, keepalive: None }
    }
}

impl<A> EventQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event<A>) {
        self.inner.entry(event.ts).or_default().push(event);
        self.total += 1;
    }

    /// Install (or move) the keep-alive sentinel.
    pub fn push_keepalive(&mut self, ts: Tick) {
        self.keepalive = Some(ts);
    }

    /// The earliest timestamp holding an event or the sentinel.
    pub fn next_tick(&self) -> Option<Tick> {
        let first = self.inner.keys().next().copied();
        match (first, self.keepalive) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Remove and return every event at the earliest pending timestamp.
    ///
    /// Consumes the sentinel too when it sits at that timestamp; the returned
    /// batch is empty if the sentinel was alone there.
    pub fn pop_next(&mut self) -> Option<(Tick, Vec<Event<A>>)> {
        let ts = self.next_tick()?;
        if self.keepalive == Some(ts) {
            self.keepalive = None;
        }
        let events = self.inner.remove(&ts).unwrap_or_default();
        self.total -= events.len();
        Some((ts, events))
    }

    /// Number of queued events (the sentinel is not counted).
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0 && self.keepalive.is_none()
    }

    /// `true` when nothing but the keep-alive sentinel is left.
    pub fn only_keepalive(&self) -> bool {
        self.total == 0 && self.keepalive.is_some()
    }

    /// Number of distinct future timestamps with at least one event.
    pub fn tick_count(&self) -> usize {
        self.inner.len()
    }
}
