//! `Engine`: the [`EventHandler`] that turns kernel events into model state
//! changes.
//!
//! # Event flow
//!
//! ```text
//! Generate        → spawn elements, request step 0, schedule next firing
//! RoleOn          → open role window, schedule RoleOff and next RoleOn
//! RoleOff         → close window (held → release fails softly later)
//! CancelOn/Off    → suspend / resume booking of the resource
//! produce         → execute_work on every signalled partition (in parallel),
//!                   schedule Finish or Interrupt at each start's end
//! FinishActivity  → release, re-signal pending items, advance the flow
//! InterruptActivity → release, save remaining time, re-queue the item
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace, warn};

use des_core::{
    ElementTypeId, EntityId, ManagerId, ResourceId, ResourceTypeId, Tick, WorkItemId, lock,
};
use des_kernel::{Event, EventHandler, LpStats, Scheduler, Task, WorkerPool};
use des_model::{
    Element, ModelError, ModelResult, Progress, Started, WorkItem, WorkOutcome, World,
};

use crate::{Action, SimError, SimEvent, SimListener, SimReport, SimResult};

#[derive(Debug, Default)]
struct Counters {
    elements_created:       AtomicU64,
    elements_finished:      AtomicU64,
    activities_started:     AtomicU64,
    activities_finished:    AtomicU64,
    activities_interrupted: AtomicU64,
    soft_release_failures:  AtomicU64,
}

pub(crate) struct Engine<'a, L> {
    world:        &'a World,
    listener:     Mutex<&'a mut L>,
    horizon:      Tick,
    /// Timetable entries per resource that can still open a window.
    live_entries: Vec<AtomicUsize>,
    retired:      Vec<AtomicBool>,
    counters:     Counters,
}

impl<'a, L: SimListener + Send> Engine<'a, L> {
    pub(crate) fn new(world: &'a World, listener: &'a mut L, horizon: Tick) -> Self {
        let n = world.resources().len();
        Self {
            world,
            listener: Mutex::new(listener),
            horizon,
            live_entries: (0..n).map(|_| AtomicUsize::new(0)).collect(),
            retired: (0..n).map(|_| AtomicBool::new(false)).collect(),
            counters: Counters::default(),
        }
    }

    pub(crate) fn report(&self, stats: &LpStats) -> SimReport {
        let c = &self.counters;
        SimReport {
            final_tick:             stats.final_tick,
            events:                 stats.events,
            dropped:                stats.dropped,
            elements_created:       c.elements_created.load(Ordering::Relaxed),
            elements_finished:      c.elements_finished.load(Ordering::Relaxed),
            activities_started:     c.activities_started.load(Ordering::Relaxed),
            activities_finished:    c.activities_finished.load(Ordering::Relaxed),
            activities_interrupted: c.activities_interrupted.load(Ordering::Relaxed),
            soft_release_failures:  c.soft_release_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn finish(&self, report: &SimReport) {
        lock(&self.listener).on_sim_end(report);
    }

    fn emit(&self, event: SimEvent) {
        lock(&self.listener).on_event(&event);
    }

    // ── Elements ──────────────────────────────────────────────────────────

    fn create_element(&self, element_type: ElementTypeId, now: Tick) -> SimResult<()> {
        let element = self.world.spawn_element(element_type, now)?;
        self.counters.elements_created.fetch_add(1, Ordering::Relaxed);
        self.emit(SimEvent::ElementCreated { ts: now, element: element.id, element_type });

        if self.world.element_type(element_type)?.steps.is_empty() {
            self.finish_element(&element, now);
        } else {
            self.world.request_step(&element, 0, now)?;
        }
        Ok(())
    }

    fn finish_element(&self, element: &Element, now: Tick) {
        if element.notify_end() {
            self.counters.elements_finished.fetch_add(1, Ordering::Relaxed);
            self.emit(SimEvent::ElementFinished { ts: now, element: element.id });
        }
    }

    /// Release everything `item` holds; soft failures are counted, not fatal.
    fn release(&self, item: &WorkItem, now: Tick) -> SimResult<()> {
        for (resource, ok) in self.world.release_caught(item)? {
            if !ok {
                self.counters.soft_release_failures.fetch_add(1, Ordering::Relaxed);
                warn!(%resource, item = %item.id, %now, "released a resource whose role timed out");
            }
            self.emit(SimEvent::ResourceReleased {
                ts: now,
                resource,
                element: item.element,
                activity: item.activity,
                ok,
            });
        }
        Ok(())
    }

    fn finish_activity(&self, element: &Element, item: WorkItemId, now: Tick) -> SimResult<()> {
        let Some(work) = element.take_active(item) else {
            trace!(element = %element.id, %item, "stale finish ignored");
            return Ok(());
        };
        self.release(&work.item, now)?;
        self.counters.activities_finished.fetch_add(1, Ordering::Relaxed);
        self.emit(SimEvent::ActivityFinished {
            ts:       now,
            element:  element.id,
            activity: work.item.activity,
            item,
        });

        let steps = self.world.element_type(element.element_type)?.steps.len();
        match element.complete(item, steps) {
            Progress::Waiting(_) => {
                self.world.notify_pending(element)?;
            }
            Progress::NextStep(step) => {
                self.world.request_step(element, step, now)?;
            }
            Progress::Finished => self.finish_element(element, now),
        }
        Ok(())
    }

    fn interrupt_activity(
        &self,
        element: &Element,
        item:    WorkItemId,
        now:     Tick,
    ) -> SimResult<()> {
        let Some(mut work) = element.take_active(item) else {
            trace!(element = %element.id, %item, "stale interrupt ignored");
            return Ok(());
        };
        self.release(&work.item, now)?;
        let remaining = work.due.since(now);
        work.item.remaining = Some(remaining);
        self.counters.activities_interrupted.fetch_add(1, Ordering::Relaxed);
        self.emit(SimEvent::ActivityInterrupted {
            ts:       now,
            element:  element.id,
            activity: work.item.activity,
            item,
            remaining,
        });

        self.world.requeue(work.item)?;
        self.world.notify_pending(element)?;
        Ok(())
    }

    /// Announce a started activity and schedule its end.
    fn start(&self, started: Started, sched: &Scheduler<Action>) -> SimResult<()> {
        let now = started.start;
        for &(resource, role) in &started.resources {
            self.emit(SimEvent::ResourceCaught {
                ts: now,
                resource,
                role,
                element: started.element,
                activity: started.activity,
            });
        }
        self.counters.activities_started.fetch_add(1, Ordering::Relaxed);
        self.emit(SimEvent::ActivityStarted {
            ts:       now,
            element:  started.element,
            activity: started.activity,
            item:     started.item,
            end:      started.end,
        });

        let (element, item) = (started.element, started.item);
        let action = if started.interrupts() {
            Action::InterruptActivity { element, item }
        } else {
            Action::FinishActivity { element, item }
        };
        sched.schedule(started.end, EntityId::Element(element), action)?;
        Ok(())
    }

    // ── Resources ─────────────────────────────────────────────────────────

    fn role_on(
        &self,
        resource: ResourceId,
        entry:    usize,
        now:      Tick,
        sched:    &Scheduler<Action>,
    ) -> SimResult<()> {
        let res = self.world.resource(resource)?;
        let window = res.timetable.get(entry).ok_or_else(|| {
            ModelError::Invalid(format!("{resource} has no timetable entry {entry}"))
        })?;
        res.role_on(self.world, window.role, now, window.duration)?;
        self.emit(SimEvent::RoleOn { ts: now, resource, role: window.role });

        let owner = EntityId::Resource(resource);
        sched.schedule(now + window.duration, owner, Action::RoleOff {
            resource,
            role: window.role,
        })?;
        match res.next_role_on(entry) {
            Some(ts) => sched.schedule(ts, owner, Action::RoleOn { resource, entry })?,
            None => {
                self.live_entries[resource.index()].fetch_sub(1, Ordering::AcqRel);
            }
        }
        Ok(())
    }

    fn role_off(
        &self,
        resource: ResourceId,
        role:     ResourceTypeId,
        now:      Tick,
    ) -> SimResult<()> {
        let res = self.world.resource(resource)?;
        let timed_out = res.role_off(self.world, role)?;
        if timed_out {
            debug!(%resource, %role, %now, "role closed while held");
        }
        self.emit(SimEvent::RoleOff { ts: now, resource, role, timed_out });

        let exhausted = self.live_entries[resource.index()].load(Ordering::Acquire) == 0;
        if exhausted
            && !res.roles().into_iter().any(|r| res.has_role(r))
            && !self.retired[resource.index()].swap(true, Ordering::AcqRel)
        {
            self.emit(SimEvent::ResourceRetired { ts: now, resource });
        }
        Ok(())
    }

    fn cancel_on(
        &self,
        resource: ResourceId,
        entry:    usize,
        now:      Tick,
        sched:    &Scheduler<Action>,
    ) -> SimResult<()> {
        let res = self.world.resource(resource)?;
        let period = res.cancellations.get(entry).ok_or_else(|| {
            ModelError::Invalid(format!("{resource} has no cancellation {entry}"))
        })?;
        res.cancel_on();
        self.emit(SimEvent::CancellationStart { ts: now, resource });

        let owner = EntityId::Resource(resource);
        sched.schedule(now + period.duration, owner, Action::CancelOff { resource })?;
        if let Some(ts) = res.next_cancel(entry) {
            sched.schedule(ts, owner, Action::CancelOn { resource, entry })?;
        }
        Ok(())
    }
}

// ── EventHandler ──────────────────────────────────────────────────────────────

impl<L: SimListener + Send> EventHandler for Engine<'_, L> {
    type Action = Action;
    type Error = SimError;

    fn init(&self, sched: &Scheduler<Action>) -> SimResult<()> {
        for generator in self.world.generators() {
            if let Some(ts) = generator.start(self.horizon) {
                let action = Action::Generate { generator: generator.id };
                sched.schedule(ts, EntityId::Generator(generator.id), action)?;
            }
        }
        for res in self.world.resources() {
            let owner = EntityId::Resource(res.id);
            let (roles, cancels) = res.start_calendars(self.horizon);
            self.live_entries[res.id.index()].store(roles.len(), Ordering::Release);
            for (entry, ts) in roles {
                sched.schedule(ts, owner, Action::RoleOn { resource: res.id, entry })?;
            }
            for (entry, ts) in cancels {
                sched.schedule(ts, owner, Action::CancelOn { resource: res.id, entry })?;
            }
        }
        debug!(pending = sched.pending(), "calendars started");
        Ok(())
    }

    fn handle(&self, event: Event<Action>, sched: &Scheduler<Action>) -> SimResult<()> {
        let now = event.ts;
        match event.action {
            Action::Generate { generator } => {
                let generator = self.world.generator(generator)?;
                for _ in 0..generator.count {
                    self.create_element(generator.element_type, now)?;
                }
                if let Some(ts) = generator.next_ts() {
                    sched.schedule(ts, event.owner, Action::Generate { generator: generator.id })?;
                }
                Ok(())
            }
            Action::RoleOn { resource, entry } => self.role_on(resource, entry, now, sched),
            Action::RoleOff { resource, role } => self.role_off(resource, role, now),
            Action::CancelOn { resource, entry } => self.cancel_on(resource, entry, now, sched),
            Action::CancelOff { resource } => {
                self.world.resource(resource)?.cancel_off(self.world)?;
                self.emit(SimEvent::CancellationEnd { ts: now, resource });
                Ok(())
            }
            Action::FinishActivity { element, item } => {
                let element = self.world.element(element)?;
                self.finish_activity(&element, item, now)
            }
            Action::InterruptActivity { element, item } => {
                let element = self.world.element(element)?;
                self.interrupt_activity(&element, item, now)
            }
        }
    }

    /// Run `execute_work` for every partition signalled this tick, one task
    /// per partition, then schedule what started in partition order.
    fn produce(
        &self,
        now:   Tick,
        sched: &Scheduler<Action>,
        pool:  &dyn WorkerPool,
    ) -> SimResult<()> {
        let signalled: Vec<_> = self.world.managers().iter().filter(|m| m.has_signals()).collect();
        if signalled.is_empty() {
            return Ok(());
        }

        let results: Mutex<Vec<(ManagerId, ModelResult<WorkOutcome>)>> =
            Mutex::new(Vec::with_capacity(signalled.len()));
        let world = self.world;
        let slot = &results;
        let tasks: Vec<Task<'_>> = signalled
            .into_iter()
            .map(|manager| {
                Box::new(move || {
                    let outcome = manager.execute_work(world, now);
                    lock(slot).push((manager.id, outcome));
                }) as Task<'_>
            })
            .collect();
        pool.run_batch(tasks);

        let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_by_key(|(id, _)| *id);
        for (_, outcome) in results {
            for started in outcome?.started {
                self.start(started, sched)?;
            }
        }
        Ok(())
    }

    fn has_tick_work(&self) -> bool {
        self.world.managers().iter().any(|m| m.has_signals())
    }

    fn on_advance(&self, now: Tick, released: usize) {
        debug!(%now, released, "clock advanced");
        lock(&self.listener).on_time_advance(now, released);
    }
}
