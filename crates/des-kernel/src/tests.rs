//! Unit tests for des-kernel.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use des_core::{EntityId, Tick};

use crate::{
    Event, EventHandler, KernelError, LogicalProcess, Scheduler, SingleWorker, WorkerPool, lock,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
enum Ping {
    /// Record the execution; reschedule `after` ticks later if set.
    Log { after: Option<u64> },
    /// Schedule a follow-up in the same tick.
    Chain,
    /// Schedule an event in the past.
    Rewind,
}

/// Handler that records `(now, event.ts)` for every executed event.
struct Recorder {
    initial:  Vec<(u64, Ping)>,
    log:      Mutex<Vec<(Tick, Tick)>>,
    produced: AtomicUsize,
}

impl Recorder {
    fn new(initial: Vec<(u64, Ping)>) -> Self {
        Self { initial, log: Mutex::new(Vec::new()), produced: AtomicUsize::new(0) }
    }

    fn executed(&self) -> Vec<(Tick, Tick)> {
        lock(&self.log).clone()
    }
}

impl EventHandler for Recorder {
    type Action = Ping;
    type Error = KernelError;

    fn init(&self, sched: &Scheduler<Ping>) -> Result<(), KernelError> {
        for (ts, action) in &self.initial {
            sched.schedule(Tick(*ts), EntityId::Kernel, action.clone())?;
        }
        Ok(())
    }

    fn handle(&self, event: Event<Ping>, sched: &Scheduler<Ping>) -> Result<(), KernelError> {
        lock(&self.log).push((sched.now(), event.ts));
        match event.action {
            Ping::Log { after: Some(d) } => {
                sched.schedule(event.ts + d, event.owner, Ping::Log { after: Some(d) })
            }
            Ping::Log { after: None } => Ok(()),
            Ping::Chain => sched.schedule(sched.now(), event.owner, Ping::Log { after: None }),
            Ping::Rewind => sched.schedule(Tick(0), event.owner, Ping::Log { after: None }),
        }
    }

    fn produce(
        &self,
        _now:  Tick,
        _sched: &Scheduler<Ping>,
        _pool: &dyn WorkerPool,
    ) -> Result<(), KernelError> {
        self.produced.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn run(handler: &Recorder, horizon: u64) -> Result<crate::LpStats, KernelError> {
    LogicalProcess::new(handler, Box::new(SingleWorker), Tick(horizon)).run()
}

// ── EventQueue ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod event_queue {
    use super::*;
    use crate::EventQueue;

    fn ev(ts: u64) -> Event<u32> {
        Event::new(Tick(ts), EntityId::Kernel, ts as u32)
    }

    #[test]
    fn pop_next_groups_by_tick() {
        let mut q = EventQueue::new();
        q.push(ev(5));
        q.push(ev(3));
        q.push(ev(5));
        assert_eq!(q.len(), 3);
        assert_eq!(q.tick_count(), 2);

        let (ts, batch) = q.pop_next().unwrap();
        assert_eq!(ts, Tick(3));
        assert_eq!(batch.len(), 1);

        let (ts, batch) = q.pop_next().unwrap();
        assert_eq!(ts, Tick(5));
        assert_eq!(batch.len(), 2);
        assert!(q.is_empty());
        assert!(q.pop_next().is_none());
    }

    #[test]
    fn keepalive_is_not_an_event() {
        let mut q: EventQueue<u32> = EventQueue::new();
        q.push_keepalive(Tick(100));
        assert_eq!(q.len(), 0);
        assert!(q.only_keepalive());
        assert_eq!(q.next_tick(), Some(Tick(100)));

        q.push(ev(10));
        assert!(!q.only_keepalive());
        assert_eq!(q.next_tick(), Some(Tick(10)));

        q.pop_next();
        let (ts, batch) = q.pop_next().unwrap();
        assert_eq!(ts, Tick(100));
        assert!(batch.is_empty());
        assert!(q.is_empty());
    }

    #[test]
    fn keepalive_shares_tick_with_events() {
        let mut q = EventQueue::new();
        q.push_keepalive(Tick(7));
        q.push(ev(7));
        let (ts, batch) = q.pop_next().unwrap();
        assert_eq!(ts, Tick(7));
        assert_eq!(batch.len(), 1);
        assert!(q.is_empty());
    }
}

// ── Tick loop ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick_loop {
    use super::*;

    #[test]
    fn empty_model_reaches_horizon() {
        let h = Recorder::new(vec![]);
        let stats = run(&h, 50).unwrap();
        assert_eq!(stats.final_tick, Tick(50));
        assert_eq!(stats.events, 0);
        // One jump straight to the keep-alive sentinel.
        assert_eq!(stats.advances, 1);
    }

    #[test]
    fn events_run_in_timestamp_order_and_never_early() {
        let h = Recorder::new(vec![
            (30, Ping::Log { after: None }),
            (10, Ping::Log { after: None }),
            (20, Ping::Log { after: None }),
        ]);
        let stats = run(&h, 100).unwrap();
        let log = h.executed();
        let ts: Vec<u64> = log.iter().map(|(_, ts)| ts.0).collect();
        assert_eq!(ts, vec![10, 20, 30]);
        assert!(log.iter().all(|(now, ts)| now == ts));
        assert_eq!(stats.final_tick, Tick(100));
        assert_eq!(stats.events, 3);
    }

    #[test]
    fn recurring_event_stops_at_horizon() {
        let h = Recorder::new(vec![(0, Ping::Log { after: Some(10) })]);
        let stats = run(&h, 45).unwrap();
        let ts: Vec<u64> = h.executed().iter().map(|(_, ts)| ts.0).collect();
        assert_eq!(ts, vec![0, 10, 20, 30, 40]);
        // The event at 50 is still queued past the horizon.
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.final_tick, Tick(45));
    }

    #[test]
    fn events_at_horizon_still_run() {
        let h = Recorder::new(vec![(45, Ping::Log { after: None })]);
        run(&h, 45).unwrap();
        assert_eq!(h.executed(), vec![(Tick(45), Tick(45))]);
    }

    #[test]
    fn same_tick_events_run_before_advance() {
        let h = Recorder::new(vec![(5, Ping::Chain), (6, Ping::Log { after: None })]);
        run(&h, 10).unwrap();
        assert_eq!(
            h.executed(),
            vec![(Tick(5), Tick(5)), (Tick(5), Tick(5)), (Tick(6), Tick(6))]
        );
    }

    #[test]
    fn causality_violation_aborts() {
        let h = Recorder::new(vec![(5, Ping::Rewind)]);
        let err = run(&h, 10).unwrap_err();
        match err {
            KernelError::CausalityViolation { ts, now, .. } => {
                assert_eq!(ts, Tick(0));
                assert_eq!(now, Tick(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn produce_runs_once_per_visited_tick() {
        let h = Recorder::new(vec![(3, Ping::Log { after: None }), (7, Ping::Log { after: None })]);
        let stats = run(&h, 10).unwrap();
        // Ticks 0, 3, 7 and the horizon.
        assert_eq!(stats.advances, 3);
        assert_eq!(h.produced.load(Ordering::Relaxed), 4);
    }

    /// Produces a same-tick event on its first two produce calls at tick 2.
    struct Cascade {
        rounds: AtomicUsize,
        seen:   Mutex<Vec<Tick>>,
    }

    impl EventHandler for Cascade {
        type Action = ();
        type Error = KernelError;

        fn init(&self, sched: &Scheduler<()>) -> Result<(), KernelError> {
            sched.schedule(Tick(2), EntityId::Kernel, ())
        }

        fn handle(&self, _event: Event<()>, sched: &Scheduler<()>) -> Result<(), KernelError> {
            lock(&self.seen).push(sched.now());
            Ok(())
        }

        fn produce(
            &self,
            now:   Tick,
            sched: &Scheduler<()>,
            _pool: &dyn WorkerPool,
        ) -> Result<(), KernelError> {
            if now == Tick(2) && self.rounds.fetch_add(1, Ordering::Relaxed) < 2 {
                sched.schedule(now, EntityId::Kernel, ())?;
            }
            Ok(())
        }

        fn has_tick_work(&self) -> bool {
            let r = self.rounds.load(Ordering::Relaxed);
            (1..3).contains(&r)
        }
    }

    #[test]
    fn tick_work_reruns_produce_before_advancing() {
        let h = Cascade { rounds: AtomicUsize::new(0), seen: Mutex::new(Vec::new()) };
        let stats = LogicalProcess::new(&h, Box::new(SingleWorker), Tick(4)).run().unwrap();
        assert_eq!(*lock(&h.seen), vec![Tick(2), Tick(2), Tick(2)]);
        assert_eq!(h.rounds.load(Ordering::Relaxed), 3);
        assert_eq!(stats.events, 3);
        assert_eq!(stats.final_tick, Tick(4));
    }

    #[test]
    fn latch_counted_down_on_termination() {
        use std::sync::Arc;

        use crate::CompletionLatch;

        let latch = Arc::new(CompletionLatch::new(1));
        let h = Recorder::new(vec![]);
        LogicalProcess::new(&h, Box::new(SingleWorker), Tick(5))
            .with_latch(Arc::clone(&latch))
            .run()
            .unwrap();
        assert_eq!(latch.remaining(), 0);
        latch.wait();
    }

    #[test]
    fn latch_counted_down_on_failure() {
        use std::sync::Arc;

        use crate::CompletionLatch;

        let latch = Arc::new(CompletionLatch::new(1));
        let h = Recorder::new(vec![(1, Ping::Rewind)]);
        let result = LogicalProcess::new(&h, Box::new(SingleWorker), Tick(5))
            .with_latch(Arc::clone(&latch))
            .run();
        assert!(result.is_err());
        assert_eq!(latch.remaining(), 0);
    }
}

// ── Worker pools ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod pools {
    use super::*;
    use crate::{Task, worker_pool};

    #[test]
    fn single_worker_runs_in_order() {
        let order = Mutex::new(Vec::new());
        let tasks: Vec<Task<'_>> = (0..5)
            .map(|i| {
                let order = &order;
                Box::new(move || lock(order).push(i)) as Task<'_>
            })
            .collect();
        SingleWorker.run_batch(tasks);
        assert_eq!(*lock(&order), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn factory_single_for_one_worker() {
        let pool = worker_pool(Some(1)).unwrap();
        assert_eq!(pool.workers(), 1);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn multi_worker_runs_every_task() {
        let pool = worker_pool(Some(4)).unwrap();
        assert_eq!(pool.workers(), 4);
        let count = AtomicUsize::new(0);
        let tasks: Vec<Task<'_>> = (0..100)
            .map(|_| {
                let count = &count;
                Box::new(move || {
                    count.fetch_add(1, Ordering::Relaxed);
                }) as Task<'_>
            })
            .collect();
        pool.run_batch(tasks);
        assert_eq!(count.load(Ordering::Relaxed), 100);
    }

    /// Every event of tick 1 must have finished before any event of tick 2
    /// starts, whatever the pool.
    #[cfg(feature = "parallel")]
    #[test]
    fn drain_barrier_holds_with_many_workers() {
        struct Barrier {
            tick_one_done: AtomicUsize,
            violations:    AtomicUsize,
        }

        impl EventHandler for Barrier {
            type Action = u8;
            type Error = KernelError;

            fn init(&self, sched: &Scheduler<u8>) -> Result<(), KernelError> {
                for _ in 0..64 {
                    sched.schedule(Tick(1), EntityId::Kernel, 1)?;
                    sched.schedule(Tick(2), EntityId::Kernel, 2)?;
                }
                Ok(())
            }

            fn handle(&self, event: Event<u8>, _sched: &Scheduler<u8>) -> Result<(), KernelError> {
                if event.action == 1 {
                    std::thread::yield_now();
                    self.tick_one_done.fetch_add(1, Ordering::SeqCst);
                } else if self.tick_one_done.load(Ordering::SeqCst) != 64 {
                    self.violations.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            }
        }

        let h = Barrier { tick_one_done: AtomicUsize::new(0), violations: AtomicUsize::new(0) };
        let stats = LogicalProcess::new(&h, worker_pool(Some(4)).unwrap(), Tick(3)).run().unwrap();
        assert_eq!(stats.events, 128);
        assert_eq!(h.violations.load(Ordering::SeqCst), 0);
    }
}
