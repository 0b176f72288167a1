//! `ActivityManager`: one mutual-exclusion partition of activities and
//! resource types, with their shared waiting queue.
//!
//! # Signals
//!
//! Event handlers never scan the queue themselves.  They leave O(1) signals
//! (`notify_element`, `notify_resource`) and the logical process drains them
//! once per tick through [`ActivityManager::execute_work`]:
//!
//! - a pending resource signal triggers a full feasibility scan
//!   ([`ActivityManager::available_resource`]), which covers every queued
//!   item anyway;
//! - otherwise each notified item is tried on its own.
//!
//! An item whose element is claimed by another partition's attempt is
//! signalled again, so the logical process produces once more before the
//! clock advances.
//!
//! # Scan
//!
//! ```text
//! for item in queue (priority, arrival):
//!     stop when useless >= queue size
//!     skip if its activity is already known infeasible
//!     skip if its element is busy or ended
//!     try to catch a work group
//!       caught     → useless += 1, commit after the scan
//!       not caught → useless += items of this activity left, activity infeasible
//! ```
//!
//! The infeasible shortcut assumes every queued item of one activity needs
//! the same resources.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use des_core::{
    ActivityId, ElementId, ManagerId, ResourceId, ResourceTypeId, Tick, WorkItemId, lock,
};

use crate::{
    ActiveWork, Claim, ConflictZones, ModelError, ModelResult, QueueKey, WorkGroup, WorkItem,
    World, assign_slots,
};

// ── Outcome types ─────────────────────────────────────────────────────────────

/// An activity started by `execute_work`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Started {
    pub element:   ElementId,
    pub item:      WorkItemId,
    pub activity:  ActivityId,
    pub resources: Vec<(ResourceId, ResourceTypeId)>,
    pub start:     Tick,
    /// When the activity stops (completion, or interruption if earlier).
    pub end:       Tick,
    /// When the activity would complete.
    pub due:       Tick,
}

impl Started {
    #[inline]
    pub fn interrupts(&self) -> bool {
        self.end < self.due
    }
}

#[derive(Clone, Debug, Default)]
pub struct WorkOutcome {
    pub started: Vec<Started>,
    /// Items whose resources were actually tried.
    pub visited: usize,
    /// `true` if a full feasibility scan ran.
    pub scanned: bool,
}

/// A successful catch, not yet committed.
#[derive(Copy, Clone, Debug)]
struct Caught {
    group:  usize,
    expiry: Tick,
}

enum Attempt {
    /// Element busy, ended, claimed elsewhere, or no longer waiting for the
    /// item.
    Skipped,
    Failed,
    Caught(Caught),
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Signals {
    resource: bool,
    elements: Vec<WorkItemId>,
}

#[derive(Default)]
struct ManagerState {
    queue:        BTreeMap<QueueKey, WorkItem>,
    index:        FxHashMap<WorkItemId, QueueKey>,
    per_activity: FxHashMap<ActivityId, usize>,
    zones:        ConflictZones,
}

impl ManagerState {
    fn insert(&mut self, item: WorkItem) {
        let key = item.key();
        *self.per_activity.entry(item.activity).or_insert(0) += 1;
        self.index.insert(item.id, key);
        self.queue.insert(key, item);
    }

    fn remove(&mut self, id: WorkItemId) -> Option<WorkItem> {
        let key = self.index.remove(&id)?;
        let item = self.queue.remove(&key)?;
        if let Some(n) = self.per_activity.get_mut(&item.activity) {
            *n -= 1;
            if *n == 0 {
                self.per_activity.remove(&item.activity);
            }
        }
        Some(item)
    }
}

// ── ActivityManager ───────────────────────────────────────────────────────────

pub struct ActivityManager {
    pub id:             ManagerId,
    pub activities:     Vec<ActivityId>,
    pub resource_types: Vec<ResourceTypeId>,
    state:              Mutex<ManagerState>,
    signals:            Mutex<Signals>,
}

impl ActivityManager {
    pub fn new(
        id:             ManagerId,
        activities:     Vec<ActivityId>,
        resource_types: Vec<ResourceTypeId>,
    ) -> Self {
        Self {
            id,
            activities,
            resource_types,
            state: Mutex::new(ManagerState::default()),
            signals: Mutex::new(Signals::default()),
        }
    }

    // ── Queue ─────────────────────────────────────────────────────────────

    pub fn queue_add(&self, item: WorkItem) {
        lock(&self.state).insert(item);
    }

    pub fn queue_remove(&self, item: WorkItemId) -> Option<WorkItem> {
        lock(&self.state).remove(item)
    }

    pub fn queue_len(&self) -> usize {
        lock(&self.state).queue.len()
    }

    pub fn is_queued(&self, item: WorkItemId) -> bool {
        lock(&self.state).index.contains_key(&item)
    }

    /// Queued items of `activity`.
    pub fn queued_for(&self, activity: ActivityId) -> usize {
        lock(&self.state).per_activity.get(&activity).copied().unwrap_or(0)
    }

    /// Queued item ids in service order.
    pub fn queued(&self) -> Vec<WorkItemId> {
        lock(&self.state).queue.keys().map(|k| k.item).collect()
    }

    // ── Signals ───────────────────────────────────────────────────────────

    /// `item` may have become startable (it was queued, or its element
    /// became free).
    pub fn notify_element(&self, item: WorkItemId) {
        lock(&self.signals).elements.push(item);
    }

    /// Some resource of this partition may have become available.
    pub fn notify_resource(&self) {
        lock(&self.signals).resource = true;
    }

    pub fn has_signals(&self) -> bool {
        let signals = lock(&self.signals);
        signals.resource || !signals.elements.is_empty()
    }

    // ── Work ──────────────────────────────────────────────────────────────

    /// Drain this tick's signals and start whatever has become feasible.
    pub fn execute_work(&self, world: &World, now: Tick) -> ModelResult<WorkOutcome> {
        let signals = std::mem::take(&mut *lock(&self.signals));
        let mut state = lock(&self.state);
        let mut out = WorkOutcome::default();

        if signals.resource {
            out.scanned = true;
            self.scan(world, now, &mut state, &mut out)?;
        } else {
            let mut seen = FxHashSet::default();
            for id in signals.elements {
                if !seen.insert(id) {
                    continue;
                }
                let Some(key) = state.index.get(&id).copied() else { continue };
                match self.attempt(world, now, &mut state, key)? {
                    Attempt::Skipped => {}
                    Attempt::Failed => out.visited += 1,
                    Attempt::Caught(caught) => {
                        out.visited += 1;
                        out.started.push(self.commit(world, now, &mut state, key, caught)?);
                    }
                }
            }
        }

        if !out.started.is_empty() || out.scanned {
            trace!(
                manager = %self.id,
                %now,
                scanned = out.scanned,
                visited = out.visited,
                started = out.started.len(),
                queued = state.queue.len(),
                "work executed"
            );
        }
        Ok(out)
    }

    /// Full feasibility scan of the waiting queue.
    pub fn available_resource(&self, world: &World, now: Tick) -> ModelResult<WorkOutcome> {
        let mut state = lock(&self.state);
        let mut out = WorkOutcome { scanned: true, ..WorkOutcome::default() };
        self.scan(world, now, &mut state, &mut out)?;
        Ok(out)
    }

    fn scan(
        &self,
        world: &World,
        now:   Tick,
        state: &mut ManagerState,
        out:   &mut WorkOutcome,
    ) -> ModelResult<()> {
        let total = state.queue.len();
        let mut left = state.per_activity.clone();
        let mut infeasible: FxHashSet<ActivityId> = FxHashSet::default();
        let mut useless = 0usize;
        let mut committed = Vec::new();

        let order: Vec<(QueueKey, ActivityId)> =
            state.queue.iter().map(|(k, item)| (*k, item.activity)).collect();
        for (key, activity) in order {
            if useless >= total {
                break;
            }
            let here = left.get(&activity).copied().unwrap_or(0);
            if let Some(n) = left.get_mut(&activity) {
                *n = n.saturating_sub(1);
            }
            if infeasible.contains(&activity) {
                continue;
            }
            match self.attempt(world, now, state, key)? {
                Attempt::Skipped => {}
                Attempt::Failed => {
                    out.visited += 1;
                    useless += here;
                    infeasible.insert(activity);
                }
                Attempt::Caught(caught) => {
                    out.visited += 1;
                    useless += 1;
                    committed.push((key, caught));
                }
            }
        }

        for (key, caught) in committed {
            out.started.push(self.commit(world, now, state, key, caught)?);
        }
        Ok(())
    }

    /// Claim the item's element and try each work group in order.  On
    /// success the claim is kept for [`commit`][Self::commit].
    fn attempt(
        &self,
        world: &World,
        now:   Tick,
        state: &mut ManagerState,
        key:   QueueKey,
    ) -> ModelResult<Attempt> {
        let ManagerState { queue, zones, .. } = state;
        let Some(item) = queue.get_mut(&key) else { return Ok(Attempt::Skipped) };
        let element = world.element(item.element)?;
        match element.try_claim(item.id) {
            Claim::Granted => {}
            // The other attempt may fail and free the element; try again in
            // the next produce round of this tick.
            Claim::Contended => {
                self.notify_element(item.id);
                return Ok(Attempt::Skipped);
            }
            Claim::Refused => return Ok(Attempt::Skipped),
        }

        let activity = world.activity(item.activity)?;
        let restrict = activity.interruptible;
        for (g, group) in activity.work_groups.iter().enumerate() {
            if let Some(expiry) = catch_group(world, now, zones, item, group, restrict)? {
                zones.detach(item.id);
                return Ok(Attempt::Caught(Caught { group: g, expiry }));
            }
        }
        zones.detach(item.id);
        element.release_claim(item.id);
        Ok(Attempt::Failed)
    }

    /// Move a caught item out of the queue and into its element.
    fn commit(
        &self,
        world:  &World,
        now:    Tick,
        state:  &mut ManagerState,
        key:    QueueKey,
        caught: Caught,
    ) -> ModelResult<Started> {
        let mut item = state.remove(key.item).ok_or_else(|| ModelError::ResourceAccounting {
            item:     key.item,
            resource: None,
            detail:   "caught item left the queue before commit".into(),
        })?;
        let activity = world.activity(item.activity)?;
        let element = world.element(item.element)?;

        let duration = match item.remaining.take() {
            Some(d) => d,
            None => activity
                .work_groups
                .get(caught.group)
                .map_or(0, |g| element.sample(&g.duration)),
        };
        let due = now + duration;
        let end = if activity.interruptible { due.min(caught.expiry) } else { due };
        item.work_group = Some(caught.group);

        let started = Started {
            element:   item.element,
            item:      item.id,
            activity:  item.activity,
            resources: item.caught.clone(),
            start:     now,
            end,
            due,
        };
        element.begin(ActiveWork { item, start: now, end, due });
        Ok(started)
    }
}

impl std::fmt::Debug for ActivityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityManager")
            .field("id", &self.id)
            .field("activities", &self.activities)
            .field("resource_types", &self.resource_types)
            .finish()
    }
}

// ── Work-group catch ──────────────────────────────────────────────────────────

/// Book, match and catch one work group for `item`.
///
/// Returns the earliest caught role expiry, or `None` after rolling every
/// booking of the group back.
fn catch_group(
    world:    &World,
    now:      Tick,
    zones:    &mut ConflictZones,
    item:     &mut WorkItem,
    group:    &WorkGroup,
    restrict: bool,
) -> ModelResult<Option<Tick>> {
    let mut enough = true;
    for &(rt, n) in &group.needs {
        let (clean, conflicting) =
            world.resource_type(rt)?.get_available(world, item, zones, now, restrict)?;
        if clean + conflicting < n {
            enough = false;
            break;
        }
    }

    let plan = if enough {
        let pool = candidates(world, item.id, group)?;
        assign_slots(&group.needs, &pool)
    } else {
        None
    };
    let Some(plan) = plan else {
        rollback(world, item.id, group)?;
        return Ok(None);
    };

    for &(r, rt) in &plan {
        world.resource(r)?.assign(item.id, rt);
    }
    let mut expiry = Tick::MAX;
    for &(rt, n) in &group.needs {
        let until = world.resource_type(rt)?.catch_resources(world, n, item, now, restrict)?;
        expiry = expiry.min(until);
    }
    rollback(world, item.id, group)?;
    Ok(Some(expiry))
}

/// Every resource `item` booked for this group, with the roles it booked.
fn candidates(
    world: &World,
    item:  WorkItemId,
    group: &WorkGroup,
) -> ModelResult<Vec<(ResourceId, BTreeSet<ResourceTypeId>)>> {
    let mut out: BTreeMap<ResourceId, BTreeSet<ResourceTypeId>> = BTreeMap::new();
    for rt in group.resource_types() {
        for r in world.resource_type(rt)?.available() {
            if let Some(roles) = world.resource(r)?.booked_roles(item) {
                out.entry(r).or_default().extend(roles);
            }
        }
    }
    Ok(out.into_iter().collect())
}

fn rollback(world: &World, item: WorkItemId, group: &WorkGroup) -> ModelResult<()> {
    for rt in group.resource_types() {
        world.resource_type(rt)?.reset_available(world, item)?;
    }
    Ok(())
}
