//! `World`: the arena owning every model entity.
//!
//! Static entities (activities, resource types, resources, managers,
//! generators, element types) are fixed when the model is built and indexed
//! directly by their id.  Elements are created while the simulation runs and
//! live behind an `RwLock`ed table.
//!
//! Cross-references are ids resolved here; no entity holds a reference to
//! another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use des_core::sync::{read, write};
use des_core::{
    ActivityId, ElementId, ElementTypeId, GeneratorId, ManagerId, ResourceId, ResourceTypeId,
    Tick, WorkItemId,
};

use crate::{
    Activity, ActivityManager, Element, ElementType, Generator, ModelError, ModelResult, Resource,
    ResourceType, WorkItem,
};

pub struct World {
    pub(crate) activities:     Vec<Activity>,
    pub(crate) element_types:  Vec<ElementType>,
    pub(crate) resource_types: Vec<ResourceType>,
    pub(crate) resources:      Vec<Resource>,
    pub(crate) managers:       Vec<ActivityManager>,
    pub(crate) generators:     Vec<Generator>,
    elements:                  RwLock<Vec<Arc<Element>>>,
    next_item:                 AtomicU64,
    next_arrival:              AtomicU64,
    seed:                      u64,
}

impl World {
    pub(crate) fn new(
        activities:     Vec<Activity>,
        element_types:  Vec<ElementType>,
        resource_types: Vec<ResourceType>,
        resources:      Vec<Resource>,
        managers:       Vec<ActivityManager>,
        generators:     Vec<Generator>,
        seed:           u64,
    ) -> Self {
        Self {
            activities,
            element_types,
            resource_types,
            resources,
            managers,
            generators,
            elements:     RwLock::new(Vec::new()),
            next_item:    AtomicU64::new(0),
            next_arrival: AtomicU64::new(0),
            seed,
        }
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    pub fn activity(&self, id: ActivityId) -> ModelResult<&Activity> {
        self.activities.get(id.index()).ok_or(ModelError::UnknownActivity(id))
    }

    pub fn element_type(&self, id: ElementTypeId) -> ModelResult<&ElementType> {
        self.element_types.get(id.index()).ok_or(ModelError::UnknownElementType(id))
    }

    pub fn resource_type(&self, id: ResourceTypeId) -> ModelResult<&ResourceType> {
        self.resource_types.get(id.index()).ok_or(ModelError::UnknownResourceType(id))
    }

    pub fn resource(&self, id: ResourceId) -> ModelResult<&Resource> {
        self.resources.get(id.index()).ok_or(ModelError::UnknownResource(id))
    }

    pub fn manager(&self, id: ManagerId) -> ModelResult<&ActivityManager> {
        self.managers.get(id.index()).ok_or(ModelError::UnknownManager(id))
    }

    pub fn generator(&self, id: GeneratorId) -> ModelResult<&Generator> {
        self.generators.get(id.index()).ok_or(ModelError::UnknownGenerator(id))
    }

    pub fn element(&self, id: ElementId) -> ModelResult<Arc<Element>> {
        read(&self.elements)
            .get(id.index())
            .cloned()
            .ok_or(ModelError::UnknownElement(id))
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn resource_types(&self) -> &[ResourceType] {
        &self.resource_types
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn managers(&self) -> &[ActivityManager] {
        &self.managers
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn element_count(&self) -> usize {
        read(&self.elements).len()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // ── Elements and work items ───────────────────────────────────────────

    /// Create an element of type `element_type` at `now`.
    pub fn spawn_element(
        &self,
        element_type: ElementTypeId,
        now:          Tick,
    ) -> ModelResult<Arc<Element>> {
        self.element_type(element_type)?;
        let mut elements = write(&self.elements);
        let id = ElementId::try_from(elements.len())
            .map_err(|_| ModelError::Invalid("element id space exhausted".into()))?;
        let element = Arc::new(Element::new(id, element_type, now, self.seed));
        elements.push(Arc::clone(&element));
        Ok(element)
    }

    /// A fresh work item with the next arrival order.
    pub fn new_work_item(
        &self,
        element:  ElementId,
        activity: ActivityId,
        now:      Tick,
    ) -> ModelResult<WorkItem> {
        let priority = self.activity(activity)?.priority;
        Ok(WorkItem {
            id: WorkItemId(self.next_item.fetch_add(1, Ordering::Relaxed)),
            element,
            activity,
            priority,
            arrival_order: self.next_arrival.fetch_add(1, Ordering::Relaxed),
            arrival_ts: now,
            caught: Vec::new(),
            work_group: None,
            remaining: None,
        })
    }

    /// Queue one work item per activity of step `step` and signal their
    /// partitions.  Returns the number of items requested.
    pub fn request_step(&self, element: &Element, step: usize, now: Tick) -> ModelResult<usize> {
        let activities = self
            .element_type(element.element_type)?
            .steps
            .get(step)
            .cloned()
            .unwrap_or_default();

        let mut items = Vec::with_capacity(activities.len());
        for activity in activities {
            items.push(self.new_work_item(element.id, activity, now)?);
        }
        let ids: Vec<(WorkItemId, ActivityId)> = items.iter().map(|i| (i.id, i.activity)).collect();
        element.enter_step(step, &ids);

        let requested = items.len();
        for item in items {
            let manager = self.manager(self.activity(item.activity)?.manager)?;
            let id = item.id;
            manager.queue_add(item);
            manager.notify_element(id);
        }
        Ok(requested)
    }

    /// Put an interrupted item back in its partition's queue.
    pub fn requeue(&self, mut item: WorkItem) -> ModelResult<()> {
        item.caught.clear();
        item.work_group = None;
        let manager = self.manager(self.activity(item.activity)?.manager)?;
        let id = item.id;
        manager.queue_add(item);
        manager.notify_element(id);
        Ok(())
    }

    /// Signal the partitions of every item `element` is still waiting for.
    pub fn notify_pending(&self, element: &Element) -> ModelResult<usize> {
        let pending = element.pending_items();
        for &(id, activity) in &pending {
            self.manager(self.activity(activity)?.manager)?.notify_element(id);
        }
        Ok(pending.len())
    }

    /// Release every resource `item` holds and signal the partitions owning
    /// the released roles.
    ///
    /// Returns each released resource with `false` where the release failed
    /// softly.
    pub fn release_caught(&self, item: &WorkItem) -> ModelResult<Vec<(ResourceId, bool)>> {
        let mut out = Vec::with_capacity(item.caught.len());
        for &(r, rt) in &item.caught {
            let ok = self.resource(r)?.release_resource(item.id)?;
            self.manager(self.resource_type(rt)?.manager)?.notify_resource();
            out.push((r, ok));
        }
        Ok(out)
    }
}
