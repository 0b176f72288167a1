//! clinic — a small outpatient clinic on the des simulation kernel.
//!
//! One tick is one minute.  Nurses triage every patient; doctors see them
//! on weekdays with a lunch break; a lab technician runs blood tests that
//! stop at the end of the shift and resume the next morning.
//!
//! `RUST_LOG=debug cargo run -p clinic` shows the clock advancing.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use des_core::{SimClock, SimConfig};
use des_cycle::{Cycle, Termination, Weekday};
use des_model::{
    Activity, ActivityDuration, ElementType, Generator, ModelBuilder, Resource, WorkGroup,
};
use des_output::{CsvWriter, TelemetryListener};
use des_sim::SimulationBuilder;

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:               u64  = 42;
const START_UNIX_SECS:    i64  = 1_700_438_400; // Monday 00:00 UTC
const TICK_DURATION_SECS: u32  = 60;            // 1 tick = 1 minute
const SIM_DAYS:           u64  = 14;
const OUTPUT_DIR:         &str = "output/clinic";

const WEEKDAYS: [Weekday; 5] =
    [Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday, Weekday::Thursday, Weekday::Friday];

// ── Model ─────────────────────────────────────────────────────────────────────

fn uniform(min: u64, max: u64) -> WorkGroup {
    WorkGroup::new(ActivityDuration::Uniform { min, max })
}

fn build_model(day: u64) -> Result<ModelBuilder> {
    // Every `day` ticks, starting `start` minutes after midnight.
    let daily = |start: u64| Cycle::periodic(start, day, Termination::Infinite);
    let mut m = ModelBuilder::new();

    let nurse = m.resource_type("nurse");
    let doctor = m.resource_type("doctor");
    let lab_tech = m.resource_type("lab technician");

    let triage = m.activity(Activity::new("triage").work_group(uniform(5, 10).needs(nurse, 1)));
    let consult = m.activity(
        Activity::new("consultation")
            .priority(1)
            .work_group(uniform(10, 20).needs(doctor, 1))
            .work_group(uniform(15, 25).needs(nurse, 2)),
    );
    let blood_test = m.activity(
        Activity::new("blood test")
            .interruptible()
            .work_group(uniform(20, 40).needs(lab_tech, 1)),
    );
    let review = m.activity(
        Activity::new("result review").work_group(uniform(5, 10).needs(doctor, 1).needs(nurse, 1)),
    );

    // 08:00-18:00 every day.
    for name in ["nurse-1", "nurse-2", "nurse-3"] {
        m.resource(Resource::new(name).role(daily(8 * 60), 10 * 60, nurse));
    }
    // 09:00-17:00 on weekdays, lunch at 12:30.
    let weekdays = Cycle::weekly(&WEEKDAYS, day, 9 * 60, Termination::Infinite)?;
    for name in ["dr-a", "dr-b"] {
        m.resource(
            Resource::new(name)
                .role(weekdays.clone(), 8 * 60, doctor)
                .cancellation(daily(12 * 60 + 30), 45),
        );
    }
    m.resource(Resource::new("lab-1").role(daily(10 * 60), 6 * 60, lab_tech));

    let walk_in = m.element_type(ElementType::new("walk-in").step([triage]).step([consult]));
    let lab_patient = m.element_type(
        ElementType::new("lab patient")
            .step([triage])
            .step([blood_test, consult])
            .step([review]),
    );

    // A walk-in every 20 minutes from 08:00, thirty per day.
    m.generator(Generator::new(
        daily(8 * 60).with_subcycle(Cycle::periodic(0, 20, Termination::Iterations(30))),
        walk_in,
        1,
    ));
    // Two lab patients every hour from 09:00 to 15:00.
    m.generator(Generator::new(
        daily(9 * 60).with_subcycle(Cycle::periodic(0, 60, Termination::Iterations(6))),
        lab_patient,
        2,
    ));

    Ok(m)
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let clock = SimClock::new(START_UNIX_SECS, TICK_DURATION_SECS);
    let config = SimConfig {
        start_unix_secs:    START_UNIX_SECS,
        tick_duration_secs: TICK_DURATION_SECS,
        total_ticks:        clock.ticks_for_days(SIM_DAYS),
        seed:               SEED,
        num_workers:        None, // all logical cores
    };
    println!("=== clinic — des simulation kernel ===");
    println!("Days: {SIM_DAYS}  |  Ticks: {}  |  Seed: {SEED}", config.total_ticks);
    println!();

    std::fs::create_dir_all(OUTPUT_DIR)?;
    let writer = CsvWriter::new(Path::new(OUTPUT_DIR))?;
    let mut sim = SimulationBuilder::new(config.clone(), build_model(clock.ticks_for_days(1))?)
        .listener(TelemetryListener::new(writer, &config))
        .build()?;
    info!(
        resources = sim.world().resources().len(),
        managers = sim.world().managers().len(),
        "model built"
    );

    let t0 = Instant::now();
    let report = sim.run()?;
    let elapsed = t0.elapsed();

    if let Some(e) = sim.into_listener().take_error() {
        eprintln!("output error: {e}");
    }

    println!("Simulation complete in {:.3} s", elapsed.as_secs_f64());
    println!("{:<24} {:>10}", "Counter", "Value");
    println!("{}", "-".repeat(35));
    for (counter, value) in des_output::report_rows(&report) {
        println!("{counter:<24} {value:>10}");
    }
    println!();
    println!("Telemetry written to {OUTPUT_DIR}/");

    Ok(())
}
