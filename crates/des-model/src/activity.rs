//! Activities, their alternative work groups, and element types.
//!
//! An activity says *what* an element wants to do; each [`WorkGroup`] is one
//! way of doing it (a set of resource-type requirements plus a duration).
//! Work groups are tried in declaration order until one can be caught.

use des_core::{ActivityId, ElementRng, ElementTypeId, ManagerId, ResourceTypeId};

// ── ActivityDuration ──────────────────────────────────────────────────────────

/// How long a work group keeps its resources, in ticks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivityDuration {
    Fixed(u64),
    /// Uniform over `min..=max`, sampled from the element's own RNG.
    Uniform { min: u64, max: u64 },
}

impl ActivityDuration {
    pub fn sample(&self, rng: &mut ElementRng) -> u64 {
        match *self {
            ActivityDuration::Fixed(d) => d,
            ActivityDuration::Uniform { min, max } if max <= min => min,
            ActivityDuration::Uniform { min, max } => rng.gen_range(min..=max),
        }
    }
}

// ── WorkGroup ─────────────────────────────────────────────────────────────────

/// One alternative resource requirement for an activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkGroup {
    /// `(resource type, units)`; a resource fills at most one unit.
    pub needs:    Vec<(ResourceTypeId, u32)>,
    pub duration: ActivityDuration,
}

impl WorkGroup {
    pub fn new(duration: ActivityDuration) -> Self {
        Self { needs: Vec::new(), duration }
    }

    /// Require `count` resources playing role `rt`.
    pub fn needs(mut self, rt: ResourceTypeId, count: u32) -> Self {
        self.needs.push((rt, count));
        self
    }

    pub fn resource_types(&self) -> impl Iterator<Item = ResourceTypeId> + '_ {
        self.needs.iter().map(|&(rt, _)| rt)
    }
}

// ── Activity ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Activity {
    pub id:            ActivityId,
    pub name:          String,
    /// Lower values are served first.
    pub priority:      i32,
    /// Interruptible activities only catch resources whose role is still
    /// valid, and are cut short when the earliest role expires.
    pub interruptible: bool,
    pub work_groups:   Vec<WorkGroup>,
    /// Partition owning this activity; assigned when the model is built.
    pub manager:       ManagerId,
}

impl Activity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id:            ActivityId::INVALID,
            name:          name.into(),
            priority:      0,
            interruptible: false,
            work_groups:   Vec::new(),
            manager:       ManagerId::INVALID,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn interruptible(mut self) -> Self {
        self.interruptible = true;
        self
    }

    pub fn work_group(mut self, group: WorkGroup) -> Self {
        self.work_groups.push(group);
        self
    }

    /// Every resource type named by any work group, in declaration order,
    /// duplicates removed.
    pub fn resource_types(&self) -> Vec<ResourceTypeId> {
        let mut out: Vec<ResourceTypeId> = Vec::new();
        for rt in self.work_groups.iter().flat_map(WorkGroup::resource_types) {
            if !out.contains(&rt) {
                out.push(rt);
            }
        }
        out
    }
}

// ── ElementType ───────────────────────────────────────────────────────────────

/// The flow every element of this type walks through.
///
/// Each step is a set of activities requested together.  The element performs
/// them one at a time, in whatever order resources allow, and moves to the
/// next step once all are done.
#[derive(Clone, Debug)]
pub struct ElementType {
    pub id:    ElementTypeId,
    pub name:  String,
    pub steps: Vec<Vec<ActivityId>>,
}

impl ElementType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: ElementTypeId::INVALID, name: name.into(), steps: Vec::new() }
    }

    pub fn step(mut self, activities: impl IntoIterator<Item = ActivityId>) -> Self {
        self.steps.push(activities.into_iter().collect());
        self
    }
}
