//! # Component Tables
//!
//! One table per component type, holding `(entity id, value)` rows sorted
//! strictly ascending by id. Insert, lookup and removal are binary searches;
//! the id column doubles as the cursor sequence for merge joins.

use std::any::Any;
use std::collections::HashMap;

use super::component::{short_type_name, Component, ComponentId, ComponentInfo};
use super::entity::EntityId;
use super::registry::ComponentRegistry;
use super::storage::Storage;
use crate::error::{EcsError, EcsResult};
use crate::memory::HeaderLayout;

/// Sorted table of one component type.
///
/// Ids and values are kept in two parallel columns so the id column can be
/// scanned on its own.
///
/// # Example
///
/// ```rust,ignore
/// let mut table = ComponentTable::<Health>::new();
/// table.insert(EntityId::new(3), Health(10));
/// table.insert(EntityId::new(1), Health(5));
/// assert_eq!(table.ids(), &[EntityId::new(1), EntityId::new(3)]);
/// ```
#[derive(Debug, Clone)]
pub struct ComponentTable<C> {
    ids: Vec<EntityId>,
    values: Vec<C>,
}

impl<C> Default for ComponentTable<C> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<C: Component> ComponentTable<C> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the table has no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Inserts a row at its sorted position.
    ///
    /// Returns `false`, leaving the table untouched, if `id` already has a row.
    pub fn insert(&mut self, id: EntityId, value: C) -> bool {
        match self.ids.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                self.ids.insert(pos, id);
                self.values.insert(pos, value);
                self.debug_check_sorted();
                true
            }
        }
    }

    /// Borrows the value for `id`.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&C> {
        let pos = self.ids.binary_search(&id).ok()?;
        Some(&self.values[pos])
    }

    /// Mutably borrows the value for `id`.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut C> {
        let pos = self.ids.binary_search(&id).ok()?;
        Some(&mut self.values[pos])
    }

    /// Returns `true` if `id` has a row.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Removes and returns the row for `id`.
    pub fn remove(&mut self, id: EntityId) -> Option<C> {
        let pos = self.ids.binary_search(&id).ok()?;
        self.ids.remove(pos);
        let value = self.values.remove(pos);
        self.debug_check_sorted();
        Some(value)
    }

    /// The id column, ascending.
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Iterates rows in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &C)> {
        self.ids.iter().copied().zip(self.values.iter())
    }

    /// Iterates rows mutably in ascending id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut C)> {
        self.ids.iter().copied().zip(self.values.iter_mut())
    }

    #[inline]
    fn debug_check_sorted(&self) {
        debug_assert!(
            self.ids.windows(2).all(|w| w[0] < w[1]),
            "component table for '{}' lost its sort order",
            short_type_name::<C>()
        );
        debug_assert_eq!(self.ids.len(), self.values.len());
    }
}

/// Type-erased view of a [`ComponentTable`].
trait Column: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn ids(&self) -> &[EntityId];
    fn bytes(&self, id: EntityId) -> Option<&[u8]>;
    fn erase(&mut self, id: EntityId, info: Option<&ComponentInfo>) -> bool;
}

impl<C: Component> Column for ComponentTable<C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    fn bytes(&self, id: EntityId) -> Option<&[u8]> {
        self.get(id).map(bytemuck::bytes_of)
    }

    fn erase(&mut self, id: EntityId, info: Option<&ComponentInfo>) -> bool {
        let Some(value) = self.remove(id) else {
            return false;
        };
        if let Some(info) = info {
            info.removed(bytemuck::bytes_of(&value));
        }
        true
    }
}

/// Table-form storage for one pool.
///
/// Entities take no component storage until a component is added.
#[derive(Default)]
pub struct TableStorage {
    /// Live entity ids, ascending.
    alive: Vec<EntityId>,
    /// One table per component type that has ever been added.
    columns: HashMap<ComponentId, Box<dyn Column>>,
}

impl TableStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows the table for `C`, if any component of that type was added.
    #[must_use]
    pub fn table<C: Component>(&self) -> Option<&ComponentTable<C>> {
        self.columns
            .get(&C::ID)
            .and_then(|col| col.as_any().downcast_ref::<ComponentTable<C>>())
    }

    /// Mutably borrows the table for `C`.
    pub fn table_mut<C: Component>(&mut self) -> Option<&mut ComponentTable<C>> {
        self.columns
            .get_mut(&C::ID)
            .and_then(|col| col.as_any_mut().downcast_mut::<ComponentTable<C>>())
    }

    fn check_alive(&self, id: EntityId) -> EcsResult<()> {
        if self.contains_entity(id) {
            Ok(())
        } else {
            Err(EcsError::EntityNotFound(id))
        }
    }
}

impl Storage for TableStorage {
    type Ids<'a> = std::iter::Copied<std::slice::Iter<'a, EntityId>>;

    fn with_layout(_layout: HeaderLayout) -> Self {
        Self::new()
    }

    fn spawn(&mut self, id: EntityId) -> EcsResult<()> {
        match self.alive.binary_search(&id) {
            Ok(_) => Err(EcsError::EntityExists(id)),
            Err(pos) => {
                self.alive.insert(pos, id);
                Ok(())
            }
        }
    }

    fn despawn(&mut self, id: EntityId, registry: &ComponentRegistry) -> EcsResult<()> {
        let pos = self
            .alive
            .binary_search(&id)
            .map_err(|_| EcsError::EntityNotFound(id))?;
        self.alive.remove(pos);
        for (component, column) in &mut self.columns {
            column.erase(id, registry.get(*component));
        }
        Ok(())
    }

    fn contains_entity(&self, id: EntityId) -> bool {
        self.alive.binary_search(&id).is_ok()
    }

    fn entity_count(&self) -> usize {
        self.alive.len()
    }

    fn insert<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()> {
        self.check_alive(id)?;
        let table = self
            .columns
            .entry(C::ID)
            .or_insert_with(|| Box::new(ComponentTable::<C>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentTable<C>>()
            .ok_or(EcsError::UnregisteredComponent(short_type_name::<C>()))?;
        if table.insert(id, value) {
            Ok(())
        } else {
            Err(EcsError::DuplicateComponent {
                entity: id,
                component: short_type_name::<C>().into(),
            })
        }
    }

    fn read<C: Component>(&self, id: EntityId) -> EcsResult<Option<C>> {
        self.check_alive(id)?;
        Ok(self.table::<C>().and_then(|t| t.get(id)).copied())
    }

    fn write<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()> {
        self.check_alive(id)?;
        match self.table_mut::<C>().and_then(|t| t.get_mut(id)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EcsError::MissingComponent {
                entity: id,
                component: short_type_name::<C>().into(),
            }),
        }
    }

    fn remove(&mut self, id: EntityId, info: &ComponentInfo) -> EcsResult<()> {
        self.check_alive(id)?;
        let erased = self
            .columns
            .get_mut(&info.id)
            .is_some_and(|col| col.erase(id, Some(info)));
        if erased {
            Ok(())
        } else {
            Err(EcsError::MissingComponent {
                entity: id,
                component: info.name.into(),
            })
        }
    }

    fn contains(&self, id: EntityId, component: ComponentId) -> EcsResult<bool> {
        self.check_alive(id)?;
        Ok(self
            .columns
            .get(&component)
            .is_some_and(|col| col.ids().binary_search(&id).is_ok()))
    }

    fn raw(&self, id: EntityId, component: ComponentId) -> EcsResult<Option<&[u8]>> {
        self.check_alive(id)?;
        Ok(self.columns.get(&component).and_then(|col| col.bytes(id)))
    }

    fn entity_ids(&self) -> Self::Ids<'_> {
        self.alive.iter().copied()
    }

    fn ids_with(&self, component: ComponentId) -> Self::Ids<'_> {
        self.columns
            .get(&component)
            .map_or(&[][..], |col| col.ids())
            .iter()
            .copied()
    }
}
