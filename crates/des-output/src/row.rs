//! Plain data row types written by output backends.

use des_core::{SimClock, Tick};
use des_sim::{SimEvent, SimReport};

/// One telemetry event, flattened.
///
/// Ids that do not apply to the event kind are `None`.  `value` carries the
/// kind-specific number: the end tick of a start, the remaining duration of
/// an interruption, `0`/`1` for a release's success or a role-off's
/// time-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub tick:           u64,
    pub unix_time_secs: i64,
    pub kind:           &'static str,
    pub element:        Option<u32>,
    pub resource:       Option<u32>,
    pub role:           Option<u32>,
    pub activity:       Option<u32>,
    pub value:          Option<u64>,
}

impl EventRow {
    pub fn from_event(event: &SimEvent, clock: &SimClock) -> Self {
        let ts = event.ts();
        let mut row = EventRow {
            tick:           ts.0,
            unix_time_secs: clock.unix_secs(ts),
            kind:           event.kind(),
            element:        None,
            resource:       None,
            role:           None,
            activity:       None,
            value:          None,
        };
        match *event {
            SimEvent::RoleOn { resource, role, .. } => {
                row.resource = Some(resource.0);
                row.role = Some(role.0);
            }
            SimEvent::RoleOff { resource, role, timed_out, .. } => {
                row.resource = Some(resource.0);
                row.role = Some(role.0);
                row.value = Some(timed_out as u64);
            }
            SimEvent::CancellationStart { resource, .. }
            | SimEvent::CancellationEnd { resource, .. }
            | SimEvent::ResourceRetired { resource, .. } => {
                row.resource = Some(resource.0);
            }
            SimEvent::ResourceCaught { resource, role, element, activity, .. } => {
                row.resource = Some(resource.0);
                row.role = Some(role.0);
                row.element = Some(element.0);
                row.activity = Some(activity.0);
            }
            SimEvent::ResourceReleased { resource, element, activity, ok, .. } => {
                row.resource = Some(resource.0);
                row.element = Some(element.0);
                row.activity = Some(activity.0);
                row.value = Some(ok as u64);
            }
            SimEvent::ActivityStarted { element, activity, end, .. } => {
                row.element = Some(element.0);
                row.activity = Some(activity.0);
                row.value = Some(end.0);
            }
            SimEvent::ActivityFinished { element, activity, .. } => {
                row.element = Some(element.0);
                row.activity = Some(activity.0);
            }
            SimEvent::ActivityInterrupted { element, activity, remaining, .. } => {
                row.element = Some(element.0);
                row.activity = Some(activity.0);
                row.value = Some(remaining);
            }
            SimEvent::ElementCreated { element, element_type, .. } => {
                row.element = Some(element.0);
                row.value = Some(u64::from(element_type.0));
            }
            SimEvent::ElementFinished { element, .. } => {
                row.element = Some(element.0);
            }
        }
        row
    }
}

/// Events released at one clock advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:            u64,
    pub unix_time_secs:  i64,
    pub released_events: u64,
    /// Telemetry events recorded while the previous tick ran.
    pub telemetry:       u64,
}

impl TickSummaryRow {
    pub fn new(now: Tick, clock: &SimClock, released: usize, telemetry: usize) -> Self {
        Self {
            tick:            now.0,
            unix_time_secs:  clock.unix_secs(now),
            released_events: released as u64,
            telemetry:       telemetry as u64,
        }
    }
}

/// `(counter, value)` pairs of a finished run.
pub fn report_rows(report: &SimReport) -> Vec<(&'static str, u64)> {
    vec![
        ("final_tick", report.final_tick.0),
        ("events", report.events),
        ("dropped", report.dropped as u64),
        ("elements_created", report.elements_created),
        ("elements_finished", report.elements_finished),
        ("activities_started", report.activities_started),
        ("activities_finished", report.activities_finished),
        ("activities_interrupted", report.activities_interrupted),
        ("soft_release_failures", report.soft_release_failures),
    ]
}
