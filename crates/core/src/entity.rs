//! Entity trait: identity + continuity across state changes.

use std::collections::HashMap;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// Build an id lookup table from a list of entities.
pub fn index_by_id<E>(items: impl IntoIterator<Item = E>) -> HashMap<E::Id, E>
where
    E: Entity,
{
    items.into_iter().map(|e| (e.id(), e)).collect()
}
