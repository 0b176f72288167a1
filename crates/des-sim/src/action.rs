//! The event payload: everything an active entity can schedule.

use des_core::{ElementId, GeneratorId, ResourceId, ResourceTypeId, WorkItemId};

/// Tagged action carried by every kernel event.
///
/// Timetable and cancellation entries are referenced by their index in the
/// resource's definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Create the generator's elements and schedule its next firing.
    Generate { generator: GeneratorId },
    /// Open a role window of timetable entry `entry`.
    RoleOn { resource: ResourceId, entry: usize },
    RoleOff { resource: ResourceId, role: ResourceTypeId },
    /// Enter cancellation period `entry`.
    CancelOn { resource: ResourceId, entry: usize },
    CancelOff { resource: ResourceId },
    /// The element's active work item ran to completion.
    FinishActivity { element: ElementId, item: WorkItemId },
    /// A caught role expired before the work item completed.
    InterruptActivity { element: ElementId, item: WorkItemId },
}
