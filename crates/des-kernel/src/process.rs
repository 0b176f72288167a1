//! `LogicalProcess` — owns the clock and the wait queue and drives the tick
//! loop described in the crate docs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace, warn};

use des_core::{EntityId, Tick};

use crate::{
    CompletionLatch, Event, EventQueue, KernelError, KernelResult, LatchGuard, Task, WorkerPool,
    lock,
};

// ── EventHandler ──────────────────────────────────────────────────────────────

/// The model side of the kernel: interprets event actions and produces
/// per-tick work.
///
/// `handle` may be called concurrently for events of the same tick, so
/// implementations guard their mutable state with their own locks.
pub trait EventHandler: Sync {
    /// Tagged action carried by every event.
    type Action: Send;

    /// Fatal error type.  Kernel errors (causality) convert into it.
    type Error: From<KernelError> + Send;

    /// Schedule the first events of every entity.  Called once at clock 0.
    fn init(&self, sched: &Scheduler<Self::Action>) -> Result<(), Self::Error>;

    /// Execute one event.
    fn handle(
        &self,
        event: Event<Self::Action>,
        sched: &Scheduler<Self::Action>,
    ) -> Result<(), Self::Error>;

    /// Turn the signals accumulated during the tick into new events.
    ///
    /// Called once per tick after the ready set has drained.  `pool` may be
    /// used to run independent pieces of work concurrently.
    fn produce(
        &self,
        _now:  Tick,
        _sched: &Scheduler<Self::Action>,
        _pool: &dyn WorkerPool,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    /// `true` while the produce phase left work for the current tick, e.g.
    /// signals raised by events that `produce` itself scheduled at `now`.
    /// The loop then produces again before advancing.
    fn has_tick_work(&self) -> bool {
        false
    }

    /// Called after the clock moved to `now`, with the number of events
    /// released for that timestamp.
    fn on_advance(&self, _now: Tick, _released: usize) {}
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Thread-safe scheduling handle shared by every running event.
pub struct Scheduler<A> {
    now:     AtomicU64,
    horizon: Tick,
    ready:   Mutex<Vec<Event<A>>>,
    wait:    Mutex<EventQueue<A>>,
}

impl<A> Scheduler<A> {
    fn new(horizon: Tick) -> Self {
        Self {
            now:     AtomicU64::new(0),
            horizon,
            ready:   Mutex::new(Vec::new()),
            wait:    Mutex::new(EventQueue::new()),
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        Tick(self.now.load(Ordering::Acquire))
    }

    #[inline]
    pub fn horizon(&self) -> Tick {
        self.horizon
    }

    /// Schedule `event`.
    ///
    /// - `ts == now` → ready set, runs before the clock moves again.
    /// - `ts > now`  → wait queue.
    /// - `ts < now`  → [`KernelError::CausalityViolation`].
    pub fn add_event(&self, event: Event<A>) -> KernelResult<()> {
        let now = self.now();
        if event.ts < now {
            return Err(KernelError::CausalityViolation { ts: event.ts, now, owner: event.owner });
        }
        if event.ts == now {
            lock(&self.ready).push(event);
        } else {
            lock(&self.wait).push(event);
        }
        Ok(())
    }

    /// Shorthand for `add_event(Event::new(ts, owner, action))`.
    pub fn schedule(&self, ts: Tick, owner: EntityId, action: A) -> KernelResult<()> {
        self.add_event(Event::new(ts, owner, action))
    }

    /// Number of events waiting in the future queue.
    pub fn pending(&self) -> usize {
        lock(&self.wait).len()
    }

    fn take_ready(&self) -> Vec<Event<A>> {
        std::mem::take(&mut *lock(&self.ready))
    }
}

// ── LogicalProcess ────────────────────────────────────────────────────────────

/// States of the tick loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Running the events released by the last advance.
    Draining,
    /// Handler converts tick signals into events.
    ProducingTickWork,
    /// Running what the produce phase scheduled for the current tick.
    DrainingProduced,
    /// Moving the clock to the next pending timestamp.
    Advancing,
    Terminated,
}

/// Counters reported when the loop terminates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LpStats {
    pub final_tick: Tick,
    /// Number of advance steps (distinct timestamps visited after 0).
    pub advances:   u64,
    pub events:     u64,
    /// Events still queued past the horizon when the loop ended.
    pub dropped:    usize,
}

/// Drives one simulation region's clock.
///
/// # Example
///
/// ```rust,ignore
/// let lp = LogicalProcess::new(&handler, worker_pool(Some(1))?, Tick(1_000));
/// let stats = lp.run()?;
/// assert!(stats.final_tick >= Tick(1_000));
/// ```
pub struct LogicalProcess<'h, H: EventHandler> {
    handler: &'h H,
    pool:    Box<dyn WorkerPool>,
    sched:   Scheduler<H::Action>,
    latch:   Option<Arc<CompletionLatch>>,
}

impl<'h, H: EventHandler> LogicalProcess<'h, H> {
    pub fn new(handler: &'h H, pool: Box<dyn WorkerPool>, horizon: Tick) -> Self {
        Self { handler, pool, sched: Scheduler::new(horizon), latch: None }
    }

    /// Count `latch` down once when the loop terminates (successfully or not).
    pub fn with_latch(mut self, latch: Arc<CompletionLatch>) -> Self {
        self.latch = Some(latch);
        self
    }

    pub fn scheduler(&self) -> &Scheduler<H::Action> {
        &self.sched
    }

    /// Run the tick loop to the horizon.
    pub fn run(self) -> Result<LpStats, H::Error> {
        let _latch = LatchGuard::new(self.latch.as_deref());
        let result = self.run_loop();
        self.pool.shutdown();
        result
    }

    fn run_loop(&self) -> Result<LpStats, H::Error> {
        let horizon = self.sched.horizon;
        let mut stats = LpStats::default();

        self.handler.init(&self.sched)?;
        lock(&self.sched.wait).push_keepalive(horizon);

        let mut phase = Phase::Draining;
        loop {
            phase = match phase {
                Phase::Draining => {
                    stats.events += self.drain()?;
                    Phase::ProducingTickWork
                }
                Phase::ProducingTickWork => {
                    self.handler.produce(self.sched.now(), &self.sched, &*self.pool)?;
                    Phase::DrainingProduced
                }
                Phase::DrainingProduced => {
                    stats.events += self.drain()?;
                    if self.handler.has_tick_work() {
                        Phase::ProducingTickWork
                    } else if self.sched.now() >= horizon {
                        Phase::Terminated
                    } else {
                        Phase::Advancing
                    }
                }
                Phase::Advancing => match self.advance() {
                    Some(released) => {
                        stats.advances += 1;
                        self.handler.on_advance(self.sched.now(), released);
                        Phase::Draining
                    }
                    None => Phase::Terminated,
                },
                Phase::Terminated => break,
            };
        }

        stats.final_tick = self.sched.now();
        stats.dropped = self.sched.pending();
        if stats.dropped > 0 {
            warn!(dropped = stats.dropped, %horizon, "events left past the horizon");
        }
        debug!(?stats, "logical process terminated");
        Ok(stats)
    }

    /// Pop the earliest timestamp group, move the clock there and release
    /// its events.  Returns the number released, `None` if nothing is left.
    fn advance(&self) -> Option<usize> {
        let (ts, batch) = lock(&self.sched.wait).pop_next()?;
        self.sched.now.store(ts.0, Ordering::Release);
        let released = batch.len();
        trace!(%ts, released, "clock advanced");
        lock(&self.sched.ready).extend(batch);
        Some(released)
    }

    /// Run ready events batch by batch until the ready set stays empty.
    ///
    /// Events scheduled for the current tick while a batch runs form the
    /// next batch.  The first handler error of a batch is returned once the
    /// whole batch has finished.
    fn drain(&self) -> Result<u64, H::Error> {
        let mut executed = 0u64;
        loop {
            let batch = self.sched.take_ready();
            if batch.is_empty() {
                return Ok(executed);
            }
            executed += batch.len() as u64;

            let failure: Mutex<Option<H::Error>> = Mutex::new(None);
            let handler = self.handler;
            let sched = &self.sched;
            let failure_slot = &failure;
            let tasks: Vec<Task<'_>> = batch
                .into_iter()
                .map(|event| {
                    Box::new(move || {
                        trace!(ts = %event.ts, owner = %event.owner, "dispatch");
                        if let Err(e) = handler.handle(event, sched) {
                            let mut slot = lock(failure_slot);
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                        }
                    }) as Task<'_>
                })
                .collect();
            self.pool.run_batch(tasks);

            let failure = failure.into_inner().unwrap_or_else(PoisonError::into_inner);
            if let Some(e) = failure {
                return Err(e);
            }
        }
    }
}
