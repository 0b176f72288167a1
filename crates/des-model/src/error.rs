use thiserror::Error;

use des_core::{
    ActivityId, ElementId, ElementTypeId, GeneratorId, ManagerId, ResourceId, ResourceTypeId,
    WorkItemId,
};
use des_cycle::CycleError;

/// Errors raised while building or running the activity/resource model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A booking or holding invariant was broken.  Always a protocol bug.
    #[error("resource accounting violated by {item} on {resource:?}: {detail}")]
    ResourceAccounting {
        item:     WorkItemId,
        resource: Option<ResourceId>,
        detail:   String,
    },

    #[error("partitioning failed: {0}")]
    Partitioning(String),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("unknown activity {0}")]
    UnknownActivity(ActivityId),

    #[error("unknown element type {0}")]
    UnknownElementType(ElementTypeId),

    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("unknown resource type {0}")]
    UnknownResourceType(ResourceTypeId),

    #[error("unknown generator {0}")]
    UnknownGenerator(GeneratorId),

    #[error("unknown activity manager {0}")]
    UnknownManager(ManagerId),

    #[error("cycle error: {0}")]
    Cycle(#[from] CycleError),
}

pub type ModelResult<T> = Result<T, ModelError>;
