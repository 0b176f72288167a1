//! `ModelBuilder`: registration API for everything the kernel simulates.

use tracing::debug;

use des_core::{ActivityId, ElementTypeId, GeneratorId, ManagerId, ResourceId, ResourceTypeId};

use crate::{
    Activity, ActivityDuration, ActivityManager, ElementType, Generator, ModelError, ModelResult,
    Resource, ResourceType, World, partition,
};

/// Collects the model definition and validates it into a [`World`].
///
/// Registration methods hand back the id of the registered entity so later
/// definitions can refer to it.
///
/// # Example
///
/// ```rust,ignore
/// let mut model = ModelBuilder::new();
/// let doctor = model.resource_type("doctor");
/// let visit = model.activity(
///     Activity::new("visit")
///         .work_group(WorkGroup::new(ActivityDuration::Fixed(15)).needs(doctor, 1)),
/// );
/// model.resource(Resource::new("dr-1").role(Cycle::periodic(0, 1440, Termination::Infinite), 480, doctor));
/// let patient = model.element_type(ElementType::new("patient").step([visit]));
/// model.generator(Generator::new(Cycle::periodic(0, 30, Termination::Infinite), patient, 1));
/// let world = model.build(seed)?;
/// ```
#[derive(Default)]
pub struct ModelBuilder {
    resource_types: Vec<String>,
    activities:     Vec<Activity>,
    resources:      Vec<Resource>,
    element_types:  Vec<ElementType>,
    generators:     Vec<Generator>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource_type(&mut self, name: impl Into<String>) -> ResourceTypeId {
        self.resource_types.push(name.into());
        ResourceTypeId(self.resource_types.len() as u32 - 1)
    }

    pub fn activity(&mut self, mut activity: Activity) -> ActivityId {
        let id = ActivityId(self.activities.len() as u32);
        activity.id = id;
        self.activities.push(activity);
        id
    }

    pub fn resource(&mut self, mut resource: Resource) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        resource.id = id;
        self.resources.push(resource);
        id
    }

    pub fn element_type(&mut self, mut element_type: ElementType) -> ElementTypeId {
        let id = ElementTypeId(self.element_types.len() as u16);
        element_type.id = id;
        self.element_types.push(element_type);
        id
    }

    pub fn generator(&mut self, mut generator: Generator) -> GeneratorId {
        let id = GeneratorId(self.generators.len() as u32);
        generator.id = id;
        self.generators.push(generator);
        id
    }

    /// Validate the definition, partition it, and build the world.
    ///
    /// `seed` drives every element's duration sampling.
    pub fn build(self, seed: u64) -> ModelResult<World> {
        self.validate()?;

        let partition = partition(&self.activities, self.resource_types.len(), &self.resources)?;

        let mut activities = self.activities;
        for (activity, manager) in activities.iter_mut().zip(&partition.activity_manager) {
            activity.manager = *manager;
        }

        let resource_types: Vec<ResourceType> = self
            .resource_types
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let mut rt = ResourceType::new(ResourceTypeId(i as u32), name);
                rt.manager = partition.type_manager[i];
                rt
            })
            .collect();

        let managers: Vec<ActivityManager> = partition
            .groups
            .into_iter()
            .enumerate()
            .map(|(i, g)| ActivityManager::new(ManagerId(i as u32), g.activities, g.resource_types))
            .collect();

        debug!(
            activities = activities.len(),
            resource_types = resource_types.len(),
            resources = self.resources.len(),
            managers = managers.len(),
            "model built"
        );

        Ok(World::new(
            activities,
            self.element_types,
            resource_types,
            self.resources,
            managers,
            self.generators,
            seed,
        ))
    }

    fn validate(&self) -> ModelResult<()> {
        for activity in &self.activities {
            if activity.work_groups.is_empty() {
                return Err(ModelError::Invalid(format!(
                    "activity {:?} has no work group",
                    activity.name
                )));
            }
            for group in &activity.work_groups {
                if let ActivityDuration::Uniform { min, max } = group.duration {
                    if min > max {
                        return Err(ModelError::Invalid(format!(
                            "activity {:?}: uniform duration {min}..={max} is empty",
                            activity.name
                        )));
                    }
                }
                let mut seen = Vec::with_capacity(group.needs.len());
                for rt in group.resource_types() {
                    if seen.contains(&rt) {
                        return Err(ModelError::Invalid(format!(
                            "activity {:?} names {rt} twice in one work group",
                            activity.name
                        )));
                    }
                    seen.push(rt);
                }
            }
        }

        for et in &self.element_types {
            for step in &et.steps {
                if step.is_empty() {
                    return Err(ModelError::Invalid(format!(
                        "element type {:?} has an empty step",
                        et.name
                    )));
                }
                if let Some(bad) = step.iter().find(|a| a.index() >= self.activities.len()) {
                    return Err(ModelError::UnknownActivity(*bad));
                }
            }
        }

        for generator in &self.generators {
            if generator.element_type.index() >= self.element_types.len() {
                return Err(ModelError::UnknownElementType(generator.element_type));
            }
        }
        Ok(())
    }
}
