//! The `Simulation` struct and its blocking `run` entry point.

use std::any::Any;
use std::sync::Arc;
use std::thread;

use tracing::info;

use des_core::{SimConfig, Tick};
use des_kernel::{CompletionLatch, LogicalProcess, worker_pool};
use des_model::World;

use crate::engine::Engine;
use crate::{NoopListener, SimError, SimListener, SimResult};

/// Counters returned by [`Simulation::run`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimReport {
    pub final_tick:             Tick,
    /// Events executed, not counting the keep-alive sentinel.
    pub events:                 u64,
    /// Events still scheduled past the horizon.
    pub dropped:                usize,
    pub elements_created:       u64,
    pub elements_finished:      u64,
    pub activities_started:     u64,
    pub activities_finished:    u64,
    pub activities_interrupted: u64,
    /// Releases of resources whose role closed while they were held.
    pub soft_release_failures:  u64,
}

/// A built model ready to run once.
///
/// Create via [`SimulationBuilder`][crate::SimulationBuilder].
pub struct Simulation<L: SimListener + Send = NoopListener> {
    pub(crate) config:   SimConfig,
    pub(crate) world:    World,
    pub(crate) listener: L,
    pub(crate) ran:      bool,
}

impl<L: SimListener + Send> Simulation<L> {
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    /// Run the model to the horizon and block until the logical process has
    /// terminated.
    ///
    /// The logical process runs on its own scoped thread; this thread waits
    /// on the completion latch.  A simulation runs once: a second call
    /// returns [`SimError::AlreadyRun`].
    pub fn run(&mut self) -> SimResult<SimReport> {
        if std::mem::replace(&mut self.ran, true) {
            return Err(SimError::AlreadyRun);
        }

        let horizon = self.config.horizon();
        let pool = worker_pool(self.config.num_workers)?;
        info!(
            %horizon,
            workers = pool.workers(),
            managers = self.world.managers().len(),
            resources = self.world.resources().len(),
            "simulation starting"
        );

        let latch = Arc::new(CompletionLatch::new(1));
        let engine = Engine::new(&self.world, &mut self.listener, horizon);
        let joined = thread::scope(|s| {
            let lp = LogicalProcess::new(&engine, pool, horizon).with_latch(Arc::clone(&latch));
            let handle = s.spawn(move || lp.run());
            latch.wait();
            handle.join()
        });
        let stats = joined.map_err(|payload| SimError::Panicked(panic_message(&*payload)))??;

        let report = engine.report(&stats);
        engine.finish(&report);
        info!(
            final_tick = %report.final_tick,
            events = report.events,
            elements = report.elements_created,
            started = report.activities_started,
            interrupted = report.activities_interrupted,
            soft_failures = report.soft_release_failures,
            "simulation finished"
        );
        Ok(report)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
