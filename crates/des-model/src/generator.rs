//! Element generators: create `count` elements of one type at every
//! timestamp of a cycle.

use std::sync::Mutex;

use des_core::{ElementTypeId, GeneratorId, Tick, lock};
use des_cycle::{Cycle, CycleIterator};

pub struct Generator {
    pub id:           GeneratorId,
    pub cycle:        Cycle,
    pub element_type: ElementTypeId,
    pub count:        u32,
    iter:             Mutex<Option<CycleIterator>>,
}

impl Generator {
    pub fn new(cycle: Cycle, element_type: ElementTypeId, count: u32) -> Self {
        Self {
            id: GeneratorId::INVALID,
            cycle,
            element_type,
            count,
            iter: Mutex::new(None),
        }
    }

    /// Start the cycle over `[0, horizon)` and return its first timestamp.
    pub fn start(&self, horizon: Tick) -> Option<Tick> {
        let mut iter = self.cycle.iter(Tick::ZERO, horizon);
        let first = iter.next();
        *lock(&self.iter) = Some(iter);
        first
    }

    pub fn next_ts(&self) -> Option<Tick> {
        lock(&self.iter).as_mut()?.next()
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("id", &self.id)
            .field("element_type", &self.element_type)
            .field("count", &self.count)
            .finish()
    }
}
