//! Strongly typed, zero-cost identifier wrappers.
//!
//! Every entity the kernel knows about lives in an id-keyed table owned by
//! the simulation context; cross-references between entities are always one
//! of these ids, never a pointer.  All ids are `Copy + Ord + Hash` so they
//! work as map keys and sorted-set members without ceremony.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// An element (the entity that requests activities).  Elements are
    /// created at run time by generators.
    pub struct ElementId(u32);
}

typed_id! {
    /// Index of an element type in the model registry.
    pub struct ElementTypeId(u16);
}

typed_id! {
    /// Index of an activity in the model registry.
    pub struct ActivityId(u32);
}

typed_id! {
    /// Index of a resource type (a "role" a resource can play).
    pub struct ResourceTypeId(u32);
}

typed_id! {
    /// Index of a concrete resource.
    pub struct ResourceId(u32);
}

typed_id! {
    /// Index of an activity manager (one mutual-exclusion partition).
    pub struct ManagerId(u32);
}

typed_id! {
    /// Index of an element generator.
    pub struct GeneratorId(u32);
}

typed_id! {
    /// A pending request of one element for one activity.  Allocated from a
    /// monotonically increasing counter, never reused within a run.
    pub struct WorkItemId(u64);
}

// ── EntityId ──────────────────────────────────────────────────────────────────

/// The owner of an event: which active entity scheduled it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityId {
    /// The kernel itself (keep-alive sentinel, bootstrap events).
    Kernel,
    Element(ElementId),
    Resource(ResourceId),
    Generator(GeneratorId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Kernel => f.write_str("Kernel"),
            EntityId::Element(id) => id.fmt(f),
            EntityId::Resource(id) => id.fmt(f),
            EntityId::Generator(id) => id.fmt(f),
        }
    }
}
