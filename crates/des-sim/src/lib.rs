//! `des-sim` — simulation orchestrator for the des simulation kernel.
//!
//! Wires a built [`des_model::World`] to a [`des_kernel::LogicalProcess`]:
//! every generator, timetable and cancellation becomes a stream of
//! [`Action`] events, and every tick the signalled activity managers start
//! whatever has become feasible.
//!
//! # Element flow
//!
//! ```text
//! created ──▶ step 0 requested ──▶ ... ──▶ last step done ──▶ ended
//!               │  one work item per activity of the step
//!               ▼
//!          queued ──catch──▶ active ──finish──▶ released, next item / step
//!             ▲                 │
//!             └───interrupt─────┘  (remaining time kept, arrival order kept)
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                         |
//! |--------------|--------------------------------------------------|
//! | [`action`]   | `Action`, the event payload                      |
//! | `engine`     | the `EventHandler` implementation                |
//! | [`observer`] | `SimListener`, `SimEvent`, stock listeners       |
//! | [`builder`]  | `SimulationBuilder`                              |
//! | [`sim`]      | `Simulation`, `SimReport`                        |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use des_core::SimConfig;
//! use des_model::ModelBuilder;
//! use des_sim::SimulationBuilder;
//!
//! let mut model = ModelBuilder::new();
//! // ... register resource types, activities, resources, element types ...
//! let mut sim = SimulationBuilder::new(config, model).build()?;
//! let report = sim.run()?;
//! ```

pub mod action;
pub mod builder;
mod engine;
pub mod error;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

pub use action::Action;
pub use builder::SimulationBuilder;
pub use error::{SimError, SimResult};
pub use observer::{CollectingListener, NoopListener, SimEvent, SimListener};
pub use sim::{SimReport, Simulation};
