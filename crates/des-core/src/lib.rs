//! `des-core` — foundational types for the `des` discrete-event kernel.
//!
//! This crate is a dependency of every other `des-*` crate.  It has no
//! `des-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                                        |
//! |-----------|-----------------------------------------------------------------|
//! | [`ids`]   | `ElementId`, `ActivityId`, `ResourceId`, `ResourceTypeId`, …    |
//! | [`time`]  | `Tick`, `SimClock`, `SimConfig`                                 |
//! | [`rng`]   | `ElementRng` (per-element duration sampling)                    |
//! | [`error`] | `DesError`, `DesResult`                                         |
//! | [`sync`]  | `lock`, `read`, `write` (poison-tolerant guards)                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod ids;
pub mod rng;
pub mod sync;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{DesError, DesResult};
pub use ids::{
    ActivityId, ElementId, ElementTypeId, EntityId, GeneratorId, ManagerId, ResourceId,
    ResourceTypeId, WorkItemId,
};
pub use rng::ElementRng;
pub use sync::lock;
pub use time::{SimClock, SimConfig, Tick};
