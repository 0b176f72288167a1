//! Work items, their queue ordering key, and booking conflict zones.

use rustc_hash::FxHashMap;

use des_core::{ActivityId, ElementId, ResourceId, ResourceTypeId, Tick, WorkItemId};

// ── WorkItem ──────────────────────────────────────────────────────────────────

/// A pending request of one element for one activity.
///
/// `priority`, `arrival_order` and `arrival_ts` are fixed at creation and
/// survive re-queueing after an interruption, so an interrupted item keeps
/// its place in line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub id:            WorkItemId,
    pub element:       ElementId,
    pub activity:      ActivityId,
    pub priority:      i32,
    pub arrival_order: u64,
    pub arrival_ts:    Tick,
    /// Resources held while the activity runs, with the role each fills.
    pub caught:        Vec<(ResourceId, ResourceTypeId)>,
    /// Index of the work group that was caught.
    pub work_group:    Option<usize>,
    /// Duration still owed after an interruption.
    pub remaining:     Option<u64>,
}

impl WorkItem {
    #[inline]
    pub fn key(&self) -> QueueKey {
        QueueKey { priority: self.priority, arrival_order: self.arrival_order, item: self.id }
    }
}

/// Waiting-queue order: priority, then arrival.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    pub priority:      i32,
    pub arrival_order: u64,
    pub item:          WorkItemId,
}

// ── ConflictZones ─────────────────────────────────────────────────────────────

/// Disjoint sets of work items whose bookings overlapped on some resource.
///
/// Booking a resource that another item already booked merges the two
/// items' zones.  Zones live only as long as the bookings that created them:
/// an item is detached once its attempt is caught or rolled back.
#[derive(Debug, Default)]
pub struct ConflictZones {
    zone_of: FxHashMap<WorkItemId, u64>,
    members: FxHashMap<u64, Vec<WorkItemId>>,
    next:    u64,
}

impl ConflictZones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zone of `item`, creating a singleton zone on first use.
    pub fn zone(&mut self, item: WorkItemId) -> u64 {
        if let Some(&z) = self.zone_of.get(&item) {
            return z;
        }
        let z = self.next;
        self.next += 1;
        self.zone_of.insert(item, z);
        self.members.insert(z, vec![item]);
        z
    }

    /// Merge the zones of `a` and `b` (smaller into larger).
    pub fn merge(&mut self, a: WorkItemId, b: WorkItemId) {
        let za = self.zone(a);
        let zb = self.zone(b);
        if za == zb {
            return;
        }
        let len = |z: u64, m: &FxHashMap<u64, Vec<WorkItemId>>| m.get(&z).map_or(0, Vec::len);
        let (keep, gone) = if len(za, &self.members) >= len(zb, &self.members) {
            (za, zb)
        } else {
            (zb, za)
        };
        let moved = self.members.remove(&gone).unwrap_or_default();
        for item in &moved {
            self.zone_of.insert(*item, keep);
        }
        self.members.entry(keep).or_default().extend(moved);
    }

    #[cfg(test)]
    pub(crate) fn same_zone(&self, a: WorkItemId, b: WorkItemId) -> bool {
        match (self.zone_of.get(&a), self.zone_of.get(&b)) {
            (Some(za), Some(zb)) => za == zb,
            _ => false,
        }
    }

    /// Number of items sharing `item`'s zone (0 if it has none).
    #[cfg(test)]
    pub(crate) fn zone_size(&self, item: WorkItemId) -> usize {
        self.zone_of
            .get(&item)
            .and_then(|z| self.members.get(z))
            .map_or(0, Vec::len)
    }

    /// Remove `item` from its zone; the rest of the zone stays merged.
    pub fn detach(&mut self, item: WorkItemId) {
        let Some(z) = self.zone_of.remove(&item) else { return };
        if let Some(members) = self.members.get_mut(&z) {
            members.retain(|m| *m != item);
            if members.is_empty() {
                self.members.remove(&z);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.zone_of.is_empty()
    }
}
