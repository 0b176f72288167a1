//! Partitioner: split activities and resource types into independent
//! mutual-exclusion groups, one activity manager each.
//!
//! Vertices are resource types.  Edges join
//!
//! - every resource type an activity names, across all its work groups
//!   (one request's roles are resolved under one lock);
//! - every role a resource's timetable names (one resource's lock is only
//!   contended inside one partition).
//!
//! Connected components become partitions.  Activities that need no
//! resource at all get a singleton partition each.

use std::collections::VecDeque;

use tracing::debug;

use des_core::{ActivityId, ManagerId, ResourceTypeId};

use crate::{Activity, ModelError, ModelResult, Resource};

/// One component: the activities and resource types of one manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionGroup {
    pub activities:     Vec<ActivityId>,
    pub resource_types: Vec<ResourceTypeId>,
}

#[derive(Clone, Debug, Default)]
pub struct Partition {
    pub groups:           Vec<PartitionGroup>,
    /// Manager of each activity, indexed by `ActivityId`.
    pub activity_manager: Vec<ManagerId>,
    /// Manager of each resource type, indexed by `ResourceTypeId`.
    pub type_manager:     Vec<ManagerId>,
}

/// Partition `type_count` resource types and `activities`.
///
/// Fails with [`ModelError::Partitioning`] if an activity or a resource
/// timetable names a resource type outside `0..type_count`.
pub fn partition(
    activities: &[Activity],
    type_count: usize,
    resources:  &[Resource],
) -> ModelResult<Partition> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); type_count];
    let mut link = |chain: &[ResourceTypeId]| {
        for pair in chain.windows(2) {
            let (a, b) = (pair[0].index(), pair[1].index());
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
    };

    for activity in activities {
        let types = activity.resource_types();
        if let Some(bad) = types.iter().find(|rt| rt.index() >= type_count) {
            return Err(ModelError::Partitioning(format!(
                "activity {:?} needs unknown resource type {bad}",
                activity.name
            )));
        }
        link(&types);
    }
    for resource in resources {
        let roles: Vec<ResourceTypeId> = resource.roles().into_iter().collect();
        if let Some(bad) = roles.iter().find(|rt| rt.index() >= type_count) {
            return Err(ModelError::Partitioning(format!(
                "resource {:?} plays unknown resource type {bad}",
                resource.name
            )));
        }
        link(&roles);
    }

    // ── Connected components (BFS) ────────────────────────────────────────
    let mut label: Vec<Option<usize>> = vec![None; type_count];
    let mut groups: Vec<PartitionGroup> = Vec::new();
    for start in 0..type_count {
        if label[start].is_some() {
            continue;
        }
        let component = groups.len();
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        label[start] = Some(component);
        while let Some(v) = queue.pop_front() {
            members.push(v);
            for &w in &adjacency[v] {
                if label[w].is_none() {
                    label[w] = Some(component);
                    queue.push_back(w);
                }
            }
        }
        members.sort_unstable();
        groups.push(PartitionGroup {
            activities:     Vec::new(),
            resource_types: members.into_iter().map(|v| ResourceTypeId(v as u32)).collect(),
        });
    }

    // ── Assign activities ─────────────────────────────────────────────────
    let mut activity_manager = Vec::with_capacity(activities.len());
    for (i, activity) in activities.iter().enumerate() {
        let id = ActivityId(i as u32);
        let component = match activity.resource_types().first() {
            Some(rt) => label[rt.index()].unwrap_or(0),
            None => {
                groups.push(PartitionGroup::default());
                groups.len() - 1
            }
        };
        groups[component].activities.push(id);
        activity_manager.push(ManagerId(component as u32));
    }

    let type_manager =
        label.iter().map(|l| ManagerId(l.unwrap_or(0) as u32)).collect::<Vec<_>>();

    debug!(
        managers = groups.len(),
        resource_types = type_count,
        activities = activities.len(),
        "partitioned model"
    );
    Ok(Partition { groups, activity_manager, type_manager })
}
