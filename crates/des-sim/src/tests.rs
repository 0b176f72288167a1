//! Integration tests for des-sim.

use des_core::{ActivityId, ElementTypeId, ResourceTypeId, SimConfig, Tick};
use des_cycle::{Cycle, Termination};
use des_model::{
    Activity, ActivityDuration, ElementType, Generator, ModelBuilder, Resource, WorkGroup,
};

use crate::{CollectingListener, SimEvent, SimReport, Simulation, SimulationBuilder};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn config(horizon: u64) -> SimConfig {
    SimConfig { total_ticks: horizon, seed: 7, num_workers: Some(1), ..SimConfig::default() }
}

fn every(period: u64) -> Cycle {
    Cycle::periodic(0, period, Termination::Infinite)
}

/// Arrivals at tick 0 only (within any short horizon).
fn once() -> Cycle {
    Cycle::table(vec![0]).unwrap()
}

fn fixed(d: u64) -> WorkGroup {
    WorkGroup::new(ActivityDuration::Fixed(d))
}

/// Always-on resource for the whole of a short run.
fn always(name: &str, role: ResourceTypeId) -> Resource {
    Resource::new(name).role(every(10_000), 10_000, role)
}

fn run(model: ModelBuilder, horizon: u64) -> (SimReport, CollectingListener) {
    let mut sim = SimulationBuilder::new(config(horizon), model)
        .listener(CollectingListener::new())
        .build()
        .unwrap();
    let report = sim.run().unwrap();
    (report, sim.into_listener())
}

fn started_at(events: &CollectingListener, activity: ActivityId) -> Vec<Tick> {
    events
        .events
        .iter()
        .filter_map(|e| match e {
            SimEvent::ActivityStarted { ts, activity: a, .. } if *a == activity => Some(*ts),
            _ => None,
        })
        .collect()
}

/// One doctor, patients every `arrival` ticks, each visit `visit` ticks.
fn clinic(
    arrival:     Cycle,
    per_arrival: u32,
    visit:       u64,
) -> (ModelBuilder, ActivityId, ElementTypeId) {
    let mut m = ModelBuilder::new();
    let doctor = m.resource_type("doctor");
    let consult = m.activity(Activity::new("consult").work_group(fixed(visit).needs(doctor, 1)));
    m.resource(always("dr-1", doctor));
    let patient = m.element_type(ElementType::new("patient").step([consult]));
    m.generator(Generator::new(arrival, patient, per_arrival));
    (m, consult, patient)
}

// ── SimulationBuilder ─────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;
    use crate::SimError;

    #[test]
    fn zero_workers_rejected() {
        let (m, _, _) = clinic(every(10), 1, 5);
        let cfg = SimConfig { num_workers: Some(0), ..config(10) };
        let err = SimulationBuilder::new(cfg, m).build().err().unwrap();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn invalid_model_rejected() {
        let mut m = ModelBuilder::new();
        m.activity(Activity::new("nothing"));
        let err = SimulationBuilder::new(config(10), m).build().err().unwrap();
        assert!(matches!(err, SimError::Model(_)));
    }

    #[test]
    fn runs_only_once() {
        let (m, _, _) = clinic(every(10), 1, 5);
        let mut sim: Simulation = SimulationBuilder::new(config(20), m).build().unwrap();
        sim.run().unwrap();
        assert!(matches!(sim.run(), Err(SimError::AlreadyRun)));
    }
}

// ── Clock and causality ───────────────────────────────────────────────────────

#[cfg(test)]
mod clock {
    use super::*;

    #[test]
    fn reaches_horizon_with_exact_counts() {
        let (m, _, _) = clinic(every(10), 1, 5);
        let (report, events) = run(m, 50);

        assert_eq!(report.final_tick, Tick(50));
        assert_eq!(report.elements_created, 5);
        assert_eq!(report.elements_finished, 5);
        assert_eq!(report.activities_started, 5);
        assert_eq!(report.activities_finished, 5);
        assert_eq!(report.activities_interrupted, 0);
        assert_eq!(report.soft_release_failures, 0);
        // Five arrivals, one role-on, five finishes.
        assert_eq!(report.events, 11);
        // The role-off at 10 000.
        assert_eq!(report.dropped, 1);
        assert_eq!(events.report.as_ref(), Some(&report));
    }

    #[test]
    fn no_event_observed_before_its_tick() {
        let (m, _, _) = clinic(every(7), 2, 4);
        let (report, events) = run(m, 60);

        assert!(report.final_tick >= Tick(60));
        let ts: Vec<Tick> = events.events.iter().map(SimEvent::ts).collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]), "telemetry went back in time");
        assert!(events.advances.windows(2).all(|w| w[0] < w[1]));
        for t in ts {
            assert!(t == Tick(0) || events.advances.contains(&t));
        }
    }

    #[test]
    fn same_seed_same_trace() {
        let build = || {
            let mut m = ModelBuilder::new();
            let nurse = m.resource_type("nurse");
            let uniform = WorkGroup::new(ActivityDuration::Uniform { min: 2, max: 9 });
            let dress = m.activity(Activity::new("dress").work_group(uniform.needs(nurse, 1)));
            m.resource(always("n-1", nurse));
            m.resource(always("n-2", nurse));
            let patient = m.element_type(ElementType::new("patient").step([dress]));
            m.generator(Generator::new(every(3), patient, 1));
            m
        };
        let (a, ea) = run(build(), 80);
        let (b, eb) = run(build(), 80);
        assert_eq!(a, b);
        assert_eq!(ea.events, eb.events);
    }
}

// ── Resource contention ───────────────────────────────────────────────────────

#[cfg(test)]
mod contention {
    use super::*;

    #[test]
    fn second_patient_waits_for_release() {
        let (m, consult, _) = clinic(once(), 2, 5);
        let (report, events) = run(m, 30);

        assert_eq!(started_at(&events, consult), vec![Tick(0), Tick(5)]);
        assert_eq!(report.activities_finished, 2);
        let released: Vec<Tick> = events.of_kind("resource_released").map(SimEvent::ts).collect();
        assert_eq!(released, vec![Tick(5), Tick(10)]);
    }

    #[test]
    fn element_performs_one_activity_at_a_time() {
        let mut m = ModelBuilder::new();
        let xray = m.resource_type("xray");
        let lab = m.resource_type("lab");
        let scan = m.activity(Activity::new("scan").work_group(fixed(5).needs(xray, 1)));
        let blood = m.activity(Activity::new("blood").work_group(fixed(5).needs(lab, 1)));
        m.resource(always("xr", xray));
        m.resource(always("lb", lab));
        let patient = m.element_type(ElementType::new("patient").step([scan, blood]));
        m.generator(Generator::new(once(), patient, 1));
        let (report, events) = run(m, 30);

        assert_eq!(started_at(&events, scan), vec![Tick(0)]);
        assert_eq!(started_at(&events, blood), vec![Tick(5)]);
        let finished: Vec<Tick> = events.of_kind("element_finished").map(SimEvent::ts).collect();
        assert_eq!(finished, vec![Tick(10)]);
        assert_eq!(report.elements_finished, 1);
    }

    #[test]
    fn zero_duration_step_continues_in_same_tick() {
        let mut m = ModelBuilder::new();
        let nurse = m.resource_type("nurse");
        let doctor = m.resource_type("doctor");
        let triage = m.activity(Activity::new("triage").work_group(fixed(0).needs(nurse, 1)));
        let consult = m.activity(Activity::new("consult").work_group(fixed(5).needs(doctor, 1)));
        m.resource(always("n", nurse));
        m.resource(always("d", doctor));
        let patient = m.element_type(ElementType::new("patient").step([triage]).step([consult]));
        m.generator(Generator::new(once(), patient, 1));
        let (_, events) = run(m, 20);

        assert_eq!(started_at(&events, triage), vec![Tick(0)]);
        assert_eq!(started_at(&events, consult), vec![Tick(0)]);
        let finished: Vec<Tick> = events.of_kind("element_finished").map(SimEvent::ts).collect();
        assert_eq!(finished, vec![Tick(5)]);
    }

    #[test]
    fn stepless_element_ends_at_creation() {
        let mut m = ModelBuilder::new();
        let ghost = m.element_type(ElementType::new("ghost"));
        m.generator(Generator::new(every(4), ghost, 1));
        let (report, _) = run(m, 10);
        assert_eq!(report.elements_created, 3);
        assert_eq!(report.elements_finished, 3);
    }
}

// ── Timetables, cancellations and interruption ────────────────────────────────

#[cfg(test)]
mod calendars {
    use super::*;

    #[test]
    fn cancellation_delays_start() {
        let mut m = ModelBuilder::new();
        let doctor = m.resource_type("doctor");
        let consult = m.activity(Activity::new("consult").work_group(fixed(5).needs(doctor, 1)));
        m.resource(always("dr", doctor).cancellation(once(), 10));
        let patient = m.element_type(ElementType::new("patient").step([consult]));
        m.generator(Generator::new(once(), patient, 1));
        let (report, events) = run(m, 40);

        assert_eq!(started_at(&events, consult), vec![Tick(10)]);
        let start: Vec<Tick> = events.of_kind("cancellation_start").map(SimEvent::ts).collect();
        let end: Vec<Tick> = events.of_kind("cancellation_end").map(SimEvent::ts).collect();
        assert_eq!(start, vec![Tick(0)]);
        assert_eq!(end, vec![Tick(10)]);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn interruptible_work_resumes_with_remaining_time() {
        let mut m = ModelBuilder::new();
        let surgeon = m.resource_type("surgeon");
        let operate = m.activity(
            Activity::new("operate").interruptible().work_group(fixed(30).needs(surgeon, 1)),
        );
        // On duty 0-10, 20-30, 40-50, ...
        m.resource(Resource::new("s").role(every(20), 10, surgeon));
        let patient = m.element_type(ElementType::new("patient").step([operate]));
        m.generator(Generator::new(once(), patient, 1));
        let (report, events) = run(m, 100);

        assert_eq!(started_at(&events, operate), vec![Tick(0), Tick(20), Tick(40)]);
        let remaining: Vec<(Tick, u64)> = events
            .events
            .iter()
            .filter_map(|e| match e {
                SimEvent::ActivityInterrupted { ts, remaining, .. } => Some((*ts, *remaining)),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![(Tick(10), 20), (Tick(30), 10)]);

        assert_eq!(report.activities_started, 3);
        assert_eq!(report.activities_interrupted, 2);
        assert_eq!(report.activities_finished, 1);
        // The role closes just before each release at 10, 30 and 50.
        assert_eq!(report.soft_release_failures, 3);
        assert_eq!(report.elements_finished, 1);

        let timed_out = events
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::RoleOff { timed_out: true, .. }))
            .count();
        assert_eq!(timed_out, 3);
    }

    #[test]
    fn resource_retires_after_last_window() {
        let mut m = ModelBuilder::new();
        let porter = m.resource_type("porter");
        let r = m.resource(Resource::new("p").role(once(), 5, porter));
        let (_, events) = run(m, 20);

        let retired: Vec<&SimEvent> = events.of_kind("resource_retired").collect();
        assert_eq!(retired, vec![&SimEvent::ResourceRetired { ts: Tick(5), resource: r }]);
    }
}

// ── Parallel execution ────────────────────────────────────────────────────────

#[cfg(all(test, feature = "parallel"))]
mod parallel {
    use super::*;

    fn hospital() -> ModelBuilder {
        let mut m = ModelBuilder::new();
        let mut patients = Vec::new();
        for ward in 0..4 {
            let nurse = m.resource_type(format!("nurse-{ward}"));
            let care =
                m.activity(Activity::new(format!("care-{ward}")).work_group(fixed(3).needs(nurse, 1)));
            m.resource(always(&format!("n-{ward}a"), nurse));
            m.resource(always(&format!("n-{ward}b"), nurse));
            patients.push(m.element_type(ElementType::new(format!("p-{ward}")).step([care])));
        }
        for p in patients {
            m.generator(Generator::new(every(2), p, 2));
        }
        m
    }

    #[test]
    fn multi_worker_matches_single_worker_counts() {
        let (single, _) = run(hospital(), 60);

        let cfg = SimConfig { num_workers: Some(4), ..config(60) };
        let mut sim = SimulationBuilder::new(cfg, hospital()).build().unwrap();
        let multi = sim.run().unwrap();

        assert_eq!(multi.final_tick, single.final_tick);
        assert_eq!(multi.elements_created, single.elements_created);
        assert_eq!(multi.activities_started, single.activities_started);
        assert_eq!(multi.activities_finished, single.activities_finished);
        assert_eq!(multi.soft_release_failures, 0);
    }

    /// One element waiting on two partitions: `slow` can never start and
    /// holds the element's claim for a long scan, `quick` is always feasible.
    fn split_step() -> (ModelBuilder, ActivityId) {
        let mut m = ModelBuilder::new();
        let ghost = m.resource_type("ghost");
        let desk = m.resource_type("desk");
        let slow = (0..20_000)
            .fold(Activity::new("slow"), |a, _| a.work_group(fixed(1).needs(ghost, 1)));
        let slow = m.activity(slow);
        let quick = m.activity(Activity::new("quick").work_group(fixed(1).needs(desk, 1)));
        m.resource(always("clerk", desk));
        let visitor = m.element_type(ElementType::new("visitor").step([slow, quick]));
        m.generator(Generator::new(once(), visitor, 1));
        (m, quick)
    }

    #[test]
    fn contended_claim_across_partitions_still_starts() {
        let (m, quick) = split_step();
        let (_, events) = run(m, 20);
        assert_eq!(started_at(&events, quick), vec![Tick(0)]);

        for round in 0..40 {
            let (m, quick) = split_step();
            let cfg = SimConfig { num_workers: Some(4), ..config(20) };
            let mut sim = SimulationBuilder::new(cfg, m)
                .listener(CollectingListener::new())
                .build()
                .unwrap();
            sim.run().unwrap();
            let events = sim.into_listener();
            assert_eq!(started_at(&events, quick), vec![Tick(0)], "round {round}");
        }
    }
}
