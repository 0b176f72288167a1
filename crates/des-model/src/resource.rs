//! Concrete resources: timetabled roles, cancellation periods, and the
//! per-resource half of the book/catch/release protocol.
//!
//! # Role windows
//!
//! Each timetable entry `(cycle, duration, role)` opens a role window at every
//! cycle timestamp and closes it `duration` ticks later.  Windows of the same
//! role may overlap, so a role is tracked with a re-entrant count and the
//! latest expiry of its open windows.
//!
//! # Booking states
//!
//! ```text
//! free ──book──▶ booked ──catch──▶ held ──release──▶ free
//!                  │
//!                  └──reset──▶ free
//! ```
//!
//! A booking is never carried across attempts: it is either caught or reset
//! before the owning partition moves to the next work item.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use des_core::{ManagerId, ResourceId, ResourceTypeId, Tick, WorkItemId, lock};
use des_cycle::{Cycle, CycleIterator};

use crate::{ModelError, ModelResult, World};

// ── Calendar entries ──────────────────────────────────────────────────────────

/// The resource plays `role` for `duration` ticks at every `cycle` timestamp.
#[derive(Clone, Debug)]
pub struct TimetableEntry {
    pub cycle:    Cycle,
    pub duration: u64,
    pub role:     ResourceTypeId,
}

/// The resource is unavailable for `duration` ticks at every `cycle`
/// timestamp, whatever roles it plays.
#[derive(Clone, Debug)]
pub struct Cancellation {
    pub cycle:    Cycle,
    pub duration: u64,
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
struct RoleWindow {
    count:  u32,
    expiry: Tick,
}

#[derive(Debug, Default)]
struct Booking {
    roles:    BTreeSet<ResourceTypeId>,
    /// Role this resource will be caught for, once slots are matched.
    assigned: Option<ResourceTypeId>,
}

/// Result of booking one resource for one role.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Booked {
    /// The same item had already booked this resource for another role.
    pub conflicting: bool,
    /// First other item holding a booking on this resource.
    pub first_other: Option<WorkItemId>,
}

#[derive(Debug, Default)]
struct ResourceState {
    roles:        BTreeMap<ResourceTypeId, RoleWindow>,
    holder:       Option<(WorkItemId, ResourceTypeId)>,
    booked_by:    BTreeMap<WorkItemId, Booking>,
    /// Nesting depth of overlapping cancellation periods.
    cancelled:    u32,
    /// Set when the held role closed before release.
    timed_out:    bool,
    role_iters:   Vec<Option<CycleIterator>>,
    cancel_iters: Vec<Option<CycleIterator>>,
}

impl ResourceState {
    fn free_for(&self, role: ResourceTypeId, now: Tick, restrict_expiry: bool) -> bool {
        self.holder.is_none()
            && self.cancelled == 0
            && self
                .roles
                .get(&role)
                .is_some_and(|w| w.count > 0 && (!restrict_expiry || w.expiry > now))
    }

    fn unbook(&mut self, item: WorkItemId, role: ResourceTypeId) {
        if let Some(booking) = self.booked_by.get_mut(&item) {
            booking.roles.remove(&role);
            if booking.roles.is_empty() {
                self.booked_by.remove(&item);
            }
        }
    }
}

// ── Resource ──────────────────────────────────────────────────────────────────

pub struct Resource {
    pub id:            ResourceId,
    pub name:          String,
    pub timetable:     Vec<TimetableEntry>,
    pub cancellations: Vec<Cancellation>,
    state:             Mutex<ResourceState>,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id:            ResourceId::INVALID,
            name:          name.into(),
            timetable:     Vec::new(),
            cancellations: Vec::new(),
            state:         Mutex::new(ResourceState::default()),
        }
    }

    /// Play `role` for `duration` ticks at every timestamp of `cycle`.
    pub fn role(mut self, cycle: Cycle, duration: u64, role: ResourceTypeId) -> Self {
        self.timetable.push(TimetableEntry { cycle, duration, role });
        self
    }

    /// Be unavailable for `duration` ticks at every timestamp of `cycle`.
    pub fn cancellation(mut self, cycle: Cycle, duration: u64) -> Self {
        self.cancellations.push(Cancellation { cycle, duration });
        self
    }

    /// Distinct roles named by the timetable.
    pub fn roles(&self) -> BTreeSet<ResourceTypeId> {
        self.timetable.iter().map(|e| e.role).collect()
    }

    // ── Calendars ─────────────────────────────────────────────────────────

    /// Start every timetable and cancellation iterator over `[0, horizon)`.
    ///
    /// Returns the first timestamp of each timetable entry and each
    /// cancellation, by entry index.
    pub fn start_calendars(&self, horizon: Tick) -> (Vec<(usize, Tick)>, Vec<(usize, Tick)>) {
        let mut st = lock(&self.state);
        st.role_iters =
            self.timetable.iter().map(|e| Some(e.cycle.iter(Tick::ZERO, horizon))).collect();
        st.cancel_iters =
            self.cancellations.iter().map(|c| Some(c.cycle.iter(Tick::ZERO, horizon))).collect();

        let first = |iters: &mut Vec<Option<CycleIterator>>| -> Vec<(usize, Tick)> {
            iters
                .iter_mut()
                .enumerate()
                .filter_map(|(i, it)| it.as_mut().and_then(|it| it.next()).map(|ts| (i, ts)))
                .collect()
        };
        let roles = first(&mut st.role_iters);
        let cancels = first(&mut st.cancel_iters);
        (roles, cancels)
    }

    /// Next role-on timestamp of timetable entry `entry`.
    pub fn next_role_on(&self, entry: usize) -> Option<Tick> {
        let mut st = lock(&self.state);
        st.role_iters.get_mut(entry)?.as_mut()?.next()
    }

    /// Next cancellation start of cancellation `entry`.
    pub fn next_cancel(&self, entry: usize) -> Option<Tick> {
        let mut st = lock(&self.state);
        st.cancel_iters.get_mut(entry)?.as_mut()?.next()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Open a role window until `now + duration`, register availability with
    /// the resource type and signal its partition.
    pub fn role_on(
        &self,
        world:    &World,
        role:     ResourceTypeId,
        now:      Tick,
        duration: u64,
    ) -> ModelResult<()> {
        let rt = world.resource_type(role)?;
        {
            let mut st = lock(&self.state);
            let window = st.roles.entry(role).or_insert(RoleWindow { count: 0, expiry: now });
            window.count += 1;
            window.expiry = window.expiry.max(now + duration);
        }
        rt.add_available(self.id);
        world.manager(rt.manager)?.notify_resource();
        Ok(())
    }

    /// Close one window of `role`.
    ///
    /// Returns `true` if this closed the role while the resource was held in
    /// it; the holder's eventual release then fails softly.
    pub fn role_off(&self, world: &World, role: ResourceTypeId) -> ModelResult<bool> {
        let rt = world.resource_type(role)?;
        let timed_out = {
            let mut st = lock(&self.state);
            let Some(window) = st.roles.get_mut(&role) else {
                return Ok(false);
            };
            window.count -= 1;
            if window.count > 0 {
                false
            } else {
                st.roles.remove(&role);
                let held_in_role = st.holder.is_some_and(|(_, r)| r == role);
                if held_in_role {
                    st.timed_out = true;
                }
                held_in_role
            }
        };
        rt.remove_available(self.id);
        Ok(timed_out)
    }

    /// Enter a cancellation period.
    pub fn cancel_on(&self) {
        lock(&self.state).cancelled += 1;
    }

    /// Leave a cancellation period.  When the last one ends every partition
    /// owning one of the resource's roles rescans its queue.
    pub fn cancel_off(&self, world: &World) -> ModelResult<()> {
        let resumed = {
            let mut st = lock(&self.state);
            st.cancelled = st.cancelled.saturating_sub(1);
            st.cancelled == 0
        };
        if resumed {
            for manager in self.owning_managers(world)? {
                world.manager(manager)?.notify_resource();
            }
        }
        Ok(())
    }

    /// Partitions of every role this resource can play.
    pub fn owning_managers(&self, world: &World) -> ModelResult<BTreeSet<ManagerId>> {
        self.roles()
            .into_iter()
            .map(|rt| world.resource_type(rt).map(|t| t.manager))
            .collect()
    }

    /// Stop holding the resource for `item`.
    ///
    /// `Ok(false)` is a soft failure: the role timed out while held, so the
    /// caller must not assume the resource is available again in that role.
    pub fn release_resource(&self, item: WorkItemId) -> ModelResult<bool> {
        let mut st = lock(&self.state);
        match st.holder {
            Some((holder, _)) if holder == item => {}
            other => {
                return Err(ModelError::ResourceAccounting {
                    item,
                    resource: Some(self.id),
                    detail:   format!("release by non-holder (held by {:?})", other.map(|h| h.0)),
                });
            }
        }
        st.holder = None;
        Ok(!std::mem::take(&mut st.timed_out))
    }

    // ── Booking (partition-internal) ──────────────────────────────────────

    pub(crate) fn book(
        &self,
        item:            WorkItemId,
        role:            ResourceTypeId,
        now:             Tick,
        restrict_expiry: bool,
    ) -> Option<Booked> {
        let mut st = lock(&self.state);
        if !st.free_for(role, now, restrict_expiry) {
            return None;
        }
        let first_other = st.booked_by.keys().copied().find(|b| *b != item);
        let booking = st.booked_by.entry(item).or_default();
        let conflicting = !booking.roles.is_empty();
        booking.roles.insert(role);
        Some(Booked { conflicting, first_other })
    }

    pub(crate) fn unbook(&self, item: WorkItemId, role: ResourceTypeId) {
        lock(&self.state).unbook(item, role);
    }

    pub(crate) fn booked_roles(&self, item: WorkItemId) -> Option<BTreeSet<ResourceTypeId>> {
        lock(&self.state).booked_by.get(&item).map(|b| b.roles.clone())
    }

    pub(crate) fn assign(&self, item: WorkItemId, role: ResourceTypeId) {
        if let Some(booking) = lock(&self.state).booked_by.get_mut(&item) {
            booking.assigned = Some(role);
        }
    }

    /// Drop `item`'s booking for `role` and, if `want` and the booking was
    /// matched to `role`, hold the resource.  Freshness is re-checked here.
    ///
    /// Returns the role's expiry when the resource was caught.
    pub(crate) fn take(
        &self,
        item:            WorkItemId,
        role:            ResourceTypeId,
        want:            bool,
        now:             Tick,
        restrict_expiry: bool,
    ) -> Option<Tick> {
        let mut st = lock(&self.state);
        let matched = st
            .booked_by
            .get(&item)
            .is_some_and(|b| b.roles.contains(&role) && b.assigned == Some(role));
        st.unbook(item, role);
        if !(want && matched && st.free_for(role, now, restrict_expiry)) {
            return None;
        }
        st.holder = Some((item, role));
        st.roles.get(&role).map(|w| w.expiry)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn holder(&self) -> Option<WorkItemId> {
        lock(&self.state).holder.map(|(item, _)| item)
    }

    pub fn is_cancelled(&self) -> bool {
        lock(&self.state).cancelled > 0
    }

    pub fn is_timed_out(&self) -> bool {
        lock(&self.state).timed_out
    }

    pub fn has_role(&self, role: ResourceTypeId) -> bool {
        lock(&self.state).roles.contains_key(&role)
    }

    pub fn role_expiry(&self, role: ResourceTypeId) -> Option<Tick> {
        lock(&self.state).roles.get(&role).map(|w| w.expiry)
    }

    /// Number of work items currently holding a booking.
    pub fn booked_count(&self) -> usize {
        lock(&self.state).booked_by.len()
    }

    pub fn is_booked_by(&self, item: WorkItemId) -> bool {
        lock(&self.state).booked_by.contains_key(&item)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("timetable", &self.timetable.len())
            .field("cancellations", &self.cancellations.len())
            .finish()
    }
}
