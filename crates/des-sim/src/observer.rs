//! Simulation telemetry: the events a [`SimListener`] receives.

use des_core::{
    ActivityId, ElementId, ElementTypeId, ResourceId, ResourceTypeId, Tick, WorkItemId,
};

use crate::SimReport;

/// One observable state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    RoleOn {
        ts:       Tick,
        resource: ResourceId,
        role:     ResourceTypeId,
    },
    RoleOff {
        ts:        Tick,
        resource:  ResourceId,
        role:      ResourceTypeId,
        /// The role closed while the resource was held in it.
        timed_out: bool,
    },
    CancellationStart {
        ts:       Tick,
        resource: ResourceId,
    },
    CancellationEnd {
        ts:       Tick,
        resource: ResourceId,
    },
    ResourceCaught {
        ts:       Tick,
        resource: ResourceId,
        role:     ResourceTypeId,
        element:  ElementId,
        activity: ActivityId,
    },
    ResourceReleased {
        ts:       Tick,
        resource: ResourceId,
        element:  ElementId,
        activity: ActivityId,
        /// `false` when the release failed softly.
        ok:       bool,
    },
    ActivityStarted {
        ts:       Tick,
        element:  ElementId,
        activity: ActivityId,
        item:     WorkItemId,
        /// When the activity stops, by completion or interruption.
        end:      Tick,
    },
    ActivityFinished {
        ts:       Tick,
        element:  ElementId,
        activity: ActivityId,
        item:     WorkItemId,
    },
    ActivityInterrupted {
        ts:        Tick,
        element:   ElementId,
        activity:  ActivityId,
        item:      WorkItemId,
        remaining: u64,
    },
    ElementCreated {
        ts:           Tick,
        element:      ElementId,
        element_type: ElementTypeId,
    },
    ElementFinished {
        ts:      Tick,
        element: ElementId,
    },
    /// The resource has no open role and no timetable entry left to open one.
    ResourceRetired {
        ts:       Tick,
        resource: ResourceId,
    },
}

impl SimEvent {
    pub fn ts(&self) -> Tick {
        match self {
            SimEvent::RoleOn { ts, .. }
            | SimEvent::RoleOff { ts, .. }
            | SimEvent::CancellationStart { ts, .. }
            | SimEvent::CancellationEnd { ts, .. }
            | SimEvent::ResourceCaught { ts, .. }
            | SimEvent::ResourceReleased { ts, .. }
            | SimEvent::ActivityStarted { ts, .. }
            | SimEvent::ActivityFinished { ts, .. }
            | SimEvent::ActivityInterrupted { ts, .. }
            | SimEvent::ElementCreated { ts, .. }
            | SimEvent::ElementFinished { ts, .. }
            | SimEvent::ResourceRetired { ts, .. } => *ts,
        }
    }

    /// Short snake_case tag, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::RoleOn { .. } => "role_on",
            SimEvent::RoleOff { .. } => "role_off",
            SimEvent::CancellationStart { .. } => "cancellation_start",
            SimEvent::CancellationEnd { .. } => "cancellation_end",
            SimEvent::ResourceCaught { .. } => "resource_caught",
            SimEvent::ResourceReleased { .. } => "resource_released",
            SimEvent::ActivityStarted { .. } => "activity_started",
            SimEvent::ActivityFinished { .. } => "activity_finished",
            SimEvent::ActivityInterrupted { .. } => "activity_interrupted",
            SimEvent::ElementCreated { .. } => "element_created",
            SimEvent::ElementFinished { .. } => "element_finished",
            SimEvent::ResourceRetired { .. } => "resource_retired",
        }
    }
}

/// Callbacks invoked while [`Simulation::run`][crate::Simulation::run]
/// executes.
///
/// Events of one tick may be handled on several worker threads; the
/// simulation serialises the calls, but their order within a tick is only
/// deterministic with a single worker.
///
/// All methods have default no-op implementations.
///
/// # Example
///
/// ```rust,ignore
/// struct Starts(usize);
///
/// impl SimListener for Starts {
///     fn on_event(&mut self, event: &SimEvent) {
///         if let SimEvent::ActivityStarted { .. } = event {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait SimListener {
    fn on_event(&mut self, _event: &SimEvent) {}

    /// The clock moved to `now`, releasing `released` events.
    fn on_time_advance(&mut self, _now: Tick, _released: usize) {}

    /// Called once after the logical process terminated successfully.
    fn on_sim_end(&mut self, _report: &SimReport) {}
}

/// A [`SimListener`] that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SimListener for NoopListener {}

/// Keeps every event in memory.  Meant for tests and small runs.
#[derive(Debug, Default, Clone)]
pub struct CollectingListener {
    pub events:   Vec<SimEvent>,
    pub advances: Vec<Tick>,
    pub report:   Option<SimReport>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events of kind `kind` (see [`SimEvent::kind`]).
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a SimEvent> + 'a {
        self.events.iter().filter(move |e| e.kind() == kind)
    }
}

impl SimListener for CollectingListener {
    fn on_event(&mut self, event: &SimEvent) {
        self.events.push(event.clone());
    }

    fn on_time_advance(&mut self, now: Tick, _released: usize) {
        self.advances.push(now);
    }

    fn on_sim_end(&mut self, report: &SimReport) {
        self.report = Some(report.clone());
    }
}
