//! # Component Registry
//!
//! The closed set of component types an engine works with, built once at
//! startup and read-only afterwards.

use std::collections::BTreeMap;

use super::component::{Component, ComponentId, ComponentInfo};
use crate::error::{EcsError, EcsResult};
use crate::memory::HeaderLayout;

/// Registry of component types, keyed by their id.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    infos: BTreeMap<ComponentId, ComponentInfo>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            infos: BTreeMap::new(),
        }
    }

    /// Registers a component type.
    ///
    /// Registering the same type again replaces its formatter and hook.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponentId`] if a different type already
    /// uses the same id.
    pub fn register(&mut self, info: ComponentInfo) -> EcsResult<()> {
        if let Some(existing) = self.infos.get(&info.id) {
            if existing.type_id != info.type_id {
                return Err(EcsError::DuplicateComponentId {
                    id: info.id,
                    first: existing.name,
                    second: info.name,
                });
            }
        }
        self.infos.insert(info.id, info);
        Ok(())
    }

    /// Looks up `C`, failing if it was never registered.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnregisteredComponent`] when `C` is not part of
    /// the registered set.
    pub fn info_of<C: Component>(&self) -> EcsResult<&ComponentInfo> {
        match self.infos.get(&C::ID) {
            Some(info) if info.is::<C>() => Ok(info),
            _ => Err(EcsError::UnregisteredComponent(
                super::component::short_type_name::<C>(),
            )),
        }
    }

    /// Looks up a component by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(&id)
    }

    /// Iterates registered components in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.values()
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Checks that `layout` can store every registered component.
    ///
    /// # Errors
    ///
    /// Propagates [`HeaderLayout::validate`] failures.
    pub fn validate(&self, layout: &HeaderLayout) -> EcsResult<()> {
        let max_size = self.infos.values().map(|i| i.size).max().unwrap_or(0);
        let max_id = self.infos.keys().next_back().copied().unwrap_or(0);
        layout.validate(max_size, max_id)
    }
}
