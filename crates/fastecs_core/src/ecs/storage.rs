//! # Component Storage
//!
//! The seam between the engine and its two storage representations:
//!
//! - [`TableStorage`](super::TableStorage): one sorted `(id, value)` table per
//!   component type, for query-heavy workloads
//! - [`PackedStore`](super::PackedStore): every entity's components packed
//!   into one byte arena, with tombstones and compaction
//!
//! Both hand out ids in ascending order, which is all the merge join needs.

use super::component::{Component, ComponentId, ComponentInfo};
use super::entity::EntityId;
use super::registry::ComponentRegistry;
use crate::error::EcsResult;
use crate::memory::HeaderLayout;

/// Storage for the entities of one pool.
///
/// Values are plain data and are copied in and out; the packed form cannot
/// hand out aligned references into its byte buffer, so neither form does.
///
/// # Thread Safety
///
/// `&self` methods are called concurrently from parallel systems. Every
/// `&mut self` method runs in the single mutable phase.
pub trait Storage: Send + Sync + 'static {
    /// Ascending entity ids.
    type Ids<'a>: Iterator<Item = EntityId> + 'a
    where
        Self: 'a;

    /// Creates empty storage. Only the packed form reads `layout`.
    fn with_layout(layout: HeaderLayout) -> Self
    where
        Self: Sized;

    /// Starts tracking a freshly issued entity id.
    ///
    /// # Errors
    ///
    /// Fails if the id is already present.
    fn spawn(&mut self, id: EntityId) -> EcsResult<()>;

    /// Removes an entity and every component it carries, running each
    /// component's removal hook first.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or already removed.
    fn despawn(&mut self, id: EntityId, registry: &ComponentRegistry) -> EcsResult<()>;

    /// Returns `true` if the entity is present and not removed.
    fn contains_entity(&self, id: EntityId) -> bool;

    /// Number of live entities.
    fn entity_count(&self) -> usize;

    /// Attaches a component.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed, if a component of this type
    /// is already attached, or if a header would overflow.
    fn insert<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()>;

    /// Copies a component out, `None` if the entity has none of this type.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed.
    fn read<C: Component>(&self, id: EntityId) -> EcsResult<Option<C>>;

    /// Overwrites an attached component.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed, or has no such component.
    fn write<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()>;

    /// Detaches a component, running its removal hook.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed, or has no such component.
    fn remove(&mut self, id: EntityId, info: &ComponentInfo) -> EcsResult<()>;

    /// Returns `true` if the entity carries a component with this id.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed.
    fn contains(&self, id: EntityId, component: ComponentId) -> EcsResult<bool>;

    /// Borrows a component's payload bytes.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed.
    fn raw(&self, id: EntityId, component: ComponentId) -> EcsResult<Option<&[u8]>>;

    /// Every live entity, ascending.
    fn entity_ids(&self) -> Self::Ids<'_>;

    /// Every live entity carrying `component`, ascending.
    fn ids_with(&self, component: ComponentId) -> Self::Ids<'_>;

    /// Share of the storage occupied by tombstones, in `0.0..=1.0`.
    fn waste_ratio(&self) -> f32 {
        0.0
    }

    /// Physically drops tombstoned space, returning the bytes reclaimed.
    fn compact(&mut self) -> usize {
        0
    }
}
