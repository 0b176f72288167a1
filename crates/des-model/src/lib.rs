//! `des-model` — the activity/resource model of the des simulation kernel.
//!
//! # Crate layout
//!
//! | Module            | Contents                                                  |
//! |-------------------|-----------------------------------------------------------|
//! | [`activity`]      | `Activity`, `WorkGroup`, `ActivityDuration`, `ElementType` |
//! | [`work_item`]     | `WorkItem`, `QueueKey`, `ConflictZones`                   |
//! | [`resource_type`] | `ResourceType` (book / reset / catch), `assign_slots`     |
//! | [`resource`]      | `Resource` (role windows, cancellations, release)         |
//! | [`element`]       | `Element`, `Claim`, `ActiveWork`, `Progress`              |
//! | [`generator`]     | `Generator`                                               |
//! | [`manager`]       | `ActivityManager`, `WorkOutcome`, `Started`               |
//! | [`partition`]     | `partition`, `Partition`, `PartitionGroup`                |
//! | [`world`]         | `World` (the entity arena)                                |
//! | [`builder`]       | `ModelBuilder`                                            |
//! | [`error`]         | `ModelError`, `ModelResult<T>`                            |
//!
//! # Lock order
//!
//! ```text
//! manager state ──▶ element state        (claim, begin, sample; released at once)
//! manager state ──▶ resource state       (book, catch, reset; one at a time)
//! manager state ──▶ resource-type set    (snapshot only)
//! ```
//!
//! No element or resource lock is ever held while another lock is taken.

pub mod activity;
pub mod builder;
pub mod element;
pub mod error;
pub mod generator;
pub mod manager;
pub mod partition;
pub mod resource;
pub mod resource_type;
pub mod work_item;
pub mod world;


pub use activity::{Activity, ActivityDuration, ElementType, WorkGroup};
pub use builder::ModelBuilder;
pub use element::{ActiveWork, Claim, Element, Progress};
pub use error::{ModelError, ModelResult};
pub use generator::Generator;
pub use manager::{ActivityManager, Started, WorkOutcome};
pub use partition::{Partition, PartitionGroup, partition};
pub use resource::{Cancellation, Resource, TimetableEntry};
pub use resource_type::{ResourceType, assign_slots};
pub use work_item::{ConflictZones, QueueKey, WorkItem};
pub use world::World;
