//! Resource types (roles) and the role-level half of the two-phase
//! allocation protocol.
//!
//! | Step  | Operation            | Effect                                         |
//! |-------|----------------------|------------------------------------------------|
//! | Book  | [`get_available`]    | tentative hold on every free resource of role  |
//! | Match | [`assign_slots`]     | decide which booked resource fills which unit  |
//! | Catch | [`catch_resources`]  | commit matched bookings, drop the rest         |
//! | Reset | [`reset_available`]  | drop every booking of the item (rollback)      |
//!
//! [`get_available`]: ResourceType::get_available
//! [`catch_resources`]: ResourceType::catch_resources
//! [`reset_available`]: ResourceType::reset_available

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use des_core::{ManagerId, ResourceId, ResourceTypeId, Tick, WorkItemId, lock};

use crate::{ConflictZones, ModelError, ModelResult, WorkItem, World};

pub struct ResourceType {
    pub id:      ResourceTypeId,
    pub name:    String,
    /// Partition owning this role; assigned when the model is built.
    pub manager: ManagerId,
    /// Multiset of resources currently playing this role.
    available:   Mutex<BTreeMap<ResourceId, u32>>,
}

impl ResourceType {
    pub fn new(id: ResourceTypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            manager: ManagerId::INVALID,
            available: Mutex::new(BTreeMap::new()),
        }
    }

    // ── Availability multiset ─────────────────────────────────────────────

    pub fn add_available(&self, resource: ResourceId) {
        *lock(&self.available).entry(resource).or_insert(0) += 1;
    }

    /// Remove one occurrence; returns the occurrences left.
    pub fn remove_available(&self, resource: ResourceId) -> u32 {
        let mut available = lock(&self.available);
        let Some(count) = available.get_mut(&resource) else { return 0 };
        *count -= 1;
        let left = *count;
        if left == 0 {
            available.remove(&resource);
        }
        left
    }

    pub fn available_count(&self, resource: ResourceId) -> u32 {
        lock(&self.available).get(&resource).copied().unwrap_or(0)
    }

    /// Snapshot of the resources playing this role, in id order.
    pub fn available(&self) -> Vec<ResourceId> {
        lock(&self.available).keys().copied().collect()
    }

    // ── Two-phase protocol ────────────────────────────────────────────────

    /// Book every free resource of this role for `item`.
    ///
    /// Returns `(clean, conflicting)`: resources booked only for this role,
    /// and resources the item had already booked for another of its roles.
    /// Booking a resource another item has booked merges their conflict zones.
    ///
    /// The merge is structural only: bookings are dropped before an attempt
    /// returns and attempts on one partition hold its lock, so within a run
    /// no other item's booking is ever seen and zones stay singletons.
    pub fn get_available(
        &self,
        world:           &World,
        item:            &WorkItem,
        zones:           &mut ConflictZones,
        now:             Tick,
        restrict_expiry: bool,
    ) -> ModelResult<(u32, u32)> {
        zones.zone(item.id);
        let (mut clean, mut conflicting) = (0, 0);
        for r in self.available() {
            let Some(booked) = world.resource(r)?.book(item.id, self.id, now, restrict_expiry)
            else {
                continue;
            };
            if let Some(other) = booked.first_other {
                zones.merge(item.id, other);
            }
            if booked.conflicting {
                conflicting += 1;
            } else {
                clean += 1;
            }
        }
        Ok((clean, conflicting))
    }

    /// Drop `item`'s booking for this role on every resource.  Idempotent.
    pub fn reset_available(&self, world: &World, item: WorkItemId) -> ModelResult<()> {
        for r in self.available() {
            world.resource(r)?.unbook(item, self.id);
        }
        Ok(())
    }

    /// Hold the `n` resources matched to this role for `item` and drop the
    /// item's other bookings for the role.
    ///
    /// Returns the earliest role expiry among the caught resources
    /// ([`Tick::MAX`] when `n == 0`).  Catching fewer than `n` is a protocol
    /// bug.
    pub fn catch_resources(
        &self,
        world:           &World,
        n:               u32,
        item:            &mut WorkItem,
        now:             Tick,
        restrict_expiry: bool,
    ) -> ModelResult<Tick> {
        let mut left = n;
        let mut expiry = Tick::MAX;
        for r in self.available() {
            if let Some(until) = world.resource(r)?.take(item.id, self.id, left > 0, now, restrict_expiry)
            {
                left -= 1;
                expiry = expiry.min(until);
                item.caught.push((r, self.id));
            }
        }
        if left != 0 {
            return Err(ModelError::ResourceAccounting {
                item:     item.id,
                resource: None,
                detail:   format!("{left} of {n} {} units not caught", self.name),
            });
        }
        Ok(expiry)
    }
}

impl std::fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("manager", &self.manager)
            .finish()
    }
}

// ── Slot matching ─────────────────────────────────────────────────────────────

/// Match booked resources to requirement units.
///
/// `needs` expands into one slot per unit; each candidate resource may fill
/// at most one slot of a role it booked.  Returns `(resource, role)` for every
/// filled slot, or `None` if some slot cannot be filled.
///
/// Augmenting-path bipartite matching: a resource booked for two roles is
/// moved to its other role when that frees a slot.
pub fn assign_slots(
    needs:      &[(ResourceTypeId, u32)],
    candidates: &[(ResourceId, BTreeSet<ResourceTypeId>)],
) -> Option<Vec<(ResourceId, ResourceTypeId)>> {
    let slots: Vec<ResourceTypeId> = needs
        .iter()
        .flat_map(|&(rt, n)| std::iter::repeat_n(rt, n as usize))
        .collect();
    if slots.len() > candidates.len() {
        return None;
    }

    let mut owner: Vec<Option<usize>> = vec![None; candidates.len()];
    for slot in 0..slots.len() {
        let mut seen = vec![false; candidates.len()];
        if !augment(slot, &slots, candidates, &mut owner, &mut seen) {
            return None;
        }
    }

    Some(
        owner
            .iter()
            .enumerate()
            .filter_map(|(c, slot)| slot.map(|s| (candidates[c].0, slots[s])))
            .collect(),
    )
}

fn augment(
    slot:       usize,
    slots:      &[ResourceTypeId],
    candidates: &[(ResourceId, BTreeSet<ResourceTypeId>)],
    owner:      &mut [Option<usize>],
    seen:       &mut [bool],
) -> bool {
    for (c, (_, roles)) in candidates.iter().enumerate() {
        if seen[c] || !roles.contains(&slots[slot]) {
            continue;
        }
        seen[c] = true;
        let free = match owner[c] {
            None => true,
            Some(other) => augment(other, slots, candidates, owner, seen),
        };
        if free {
            owner[c] = Some(slot);
            return true;
        }
    }
    false
}
