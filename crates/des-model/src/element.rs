//! Elements: the active entities that walk an element type's flow and
//! request activities.
//!
//! All mutable element state sits behind one lock.  Partitions take it only
//! for the short claim / begin / sample sections and never while holding a
//! resource lock, so an element can have items queued in several partitions
//! without deadlock.
//!
//! # Claim protocol
//!
//! An element performs at most one activity at a time.  A partition that
//! wants to start one of the element's items first claims the element; the
//! claim turns into the active work on success, or is released on failure.
//! Two partitions scanning concurrently therefore never start two activities
//! of the same element.

use std::collections::BTreeMap;
use std::sync::Mutex;

use des_core::{ActivityId, ElementId, ElementRng, ElementTypeId, Tick, WorkItemId, lock};

use crate::{ActivityDuration, WorkItem};

/// The activity an element is currently performing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveWork {
    pub item:  WorkItem,
    pub start: Tick,
    /// Tick at which the activity stops, by completion or interruption.
    pub end:   Tick,
    /// Tick at which the work would be complete.
    pub due:   Tick,
}

impl ActiveWork {
    /// `true` if a caught role expires before the work is done.
    #[inline]
    pub fn interrupts(&self) -> bool {
        self.end < self.due
    }
}

/// What an element does after finishing one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Other items of the current step are still pending.
    Waiting(Vec<WorkItemId>),
    /// The step is complete; request step `n`.
    NextStep(usize),
    /// The last step is complete.
    Finished,
}

/// Result of [`Element::try_claim`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Claim {
    Granted,
    /// Another attempt holds the claim.  It is released or turned into active
    /// work before the produce phase ends.
    Contended,
    /// Ended, busy, or no longer waiting for the item.
    Refused,
}

struct ElementState {
    claim:   Option<WorkItemId>,
    active:  Option<ActiveWork>,
    /// Items of the current step not yet finished (queued or active).
    pending: BTreeMap<WorkItemId, ActivityId>,
    step:    usize,
    ended:   bool,
    rng:     ElementRng,
}

pub struct Element {
    pub id:           ElementId,
    pub element_type: ElementTypeId,
    pub created:      Tick,
    state:            Mutex<ElementState>,
}

impl Element {
    pub fn new(id: ElementId, element_type: ElementTypeId, created: Tick, seed: u64) -> Self {
        Self {
            id,
            element_type,
            created,
            state: Mutex::new(ElementState {
                claim:   None,
                active:  None,
                pending: BTreeMap::new(),
                step:    0,
                ended:   false,
                rng:     ElementRng::new(seed, id),
            }),
        }
    }

    // ── Claim / begin ─────────────────────────────────────────────────────

    /// Reserve the element for an attempt on `item`.
    pub fn try_claim(&self, item: WorkItemId) -> Claim {
        let mut st = lock(&self.state);
        if st.ended || st.active.is_some() || !st.pending.contains_key(&item) {
            return Claim::Refused;
        }
        if st.claim.is_some() {
            return Claim::Contended;
        }
        st.claim = Some(item);
        Claim::Granted
    }

    pub fn release_claim(&self, item: WorkItemId) {
        let mut st = lock(&self.state);
        if st.claim == Some(item) {
            st.claim = None;
        }
    }

    /// Turn the claim into active work.
    pub fn begin(&self, work: ActiveWork) {
        let mut st = lock(&self.state);
        st.claim = None;
        st.active = Some(work);
    }

    /// Stop the active work if it belongs to `item`.
    pub fn take_active(&self, item: WorkItemId) -> Option<ActiveWork> {
        let mut st = lock(&self.state);
        if st.active.as_ref().is_some_and(|w| w.item.id == item) {
            st.active.take()
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.state).active.is_some()
    }

    /// Draw a duration from the element's own RNG stream.
    pub fn sample(&self, duration: &ActivityDuration) -> u64 {
        duration.sample(&mut lock(&self.state).rng)
    }

    // ── Flow ──────────────────────────────────────────────────────────────

    /// Enter step `step` waiting for `items`.
    pub fn enter_step(&self, step: usize, items: &[(WorkItemId, ActivityId)]) {
        let mut st = lock(&self.state);
        st.step = step;
        st.pending = items.iter().copied().collect();
    }

    /// Mark `item` done and report how the flow continues.
    ///
    /// `steps` is the number of steps of the element's type.
    pub fn complete(&self, item: WorkItemId, steps: usize) -> Progress {
        let mut st = lock(&self.state);
        st.pending.remove(&item);
        if !st.pending.is_empty() {
            return Progress::Waiting(st.pending.keys().copied().collect());
        }
        if st.step + 1 < steps {
            Progress::NextStep(st.step + 1)
        } else {
            Progress::Finished
        }
    }

    pub fn pending(&self) -> Vec<WorkItemId> {
        lock(&self.state).pending.keys().copied().collect()
    }

    pub fn pending_items(&self) -> Vec<(WorkItemId, ActivityId)> {
        lock(&self.state).pending.iter().map(|(&id, &a)| (id, a)).collect()
    }

    pub fn step(&self) -> usize {
        lock(&self.state).step
    }

    /// Mark the element ended.  Returns `true` only the first time.
    pub fn notify_end(&self) -> bool {
        let mut st = lock(&self.state);
        !std::mem::replace(&mut st.ended, true)
    }

    pub fn is_ended(&self) -> bool {
        lock(&self.state).ended
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("element_type", &self.element_type)
            .field("created", &self.created)
            .finish()
    }
}
