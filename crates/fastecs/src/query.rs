//! # Query Sets
//!
//! A tuple of component types names what a query asks for: `()` matches
//! every entity, `(Position,)` every entity with a position,
//! `(Position, Velocity)` every entity with both, up to six types.
//!
//! Fetching looks each component up optionally and AND-reduces the results,
//! so an entity missing any one of them is skipped, never an error.

use fastecs_core::{
    Component, ComponentId, ComponentRegistry, EcsResult, EntityId, Join, Storage,
};

/// A set of component types fetched and stored together.
pub trait ComponentSet: Sized {
    /// Ids of the types in the set, in declaration order.
    fn component_ids() -> Vec<ComponentId>;

    /// Fails unless every type in the set is registered.
    ///
    /// # Errors
    ///
    /// Returns the first [`EcsError::UnregisteredComponent`](fastecs_core::EcsError).
    fn check(registry: &ComponentRegistry) -> EcsResult<()>;

    /// Copies the set out for `id`, `None` if any member is missing.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed.
    fn fetch<S: Storage>(storage: &S, id: EntityId) -> EcsResult<Option<Self>>;

    /// Writes every member back.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown or removed, or lost a member.
    fn store<S: Storage>(self, storage: &mut S, id: EntityId) -> EcsResult<()>;
}

impl ComponentSet for () {
    fn component_ids() -> Vec<ComponentId> {
        Vec::new()
    }

    fn check(_registry: &ComponentRegistry) -> EcsResult<()> {
        Ok(())
    }

    fn fetch<S: Storage>(storage: &S, id: EntityId) -> EcsResult<Option<Self>> {
        Ok(storage.contains_entity(id).then_some(()))
    }

    fn store<S: Storage>(self, _storage: &mut S, _id: EntityId) -> EcsResult<()> {
        Ok(())
    }
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn component_ids() -> Vec<ComponentId> {
                vec![$($name::ID),+]
            }

            fn check(registry: &ComponentRegistry) -> EcsResult<()> {
                $(registry.info_of::<$name>()?;)+
                Ok(())
            }

            #[allow(non_snake_case)]
            fn fetch<S: Storage>(storage: &S, id: EntityId) -> EcsResult<Option<Self>> {
                $(let $name = storage.read::<$name>(id)?;)+
                Ok(match ($($name,)+) {
                    ($(Some($name),)+) => Some(($($name,)+)),
                    _ => None,
                })
            }

            #[allow(non_snake_case)]
            fn store<S: Storage>(self, storage: &mut S, id: EntityId) -> EcsResult<()> {
                let ($($name,)+) = self;
                $(storage.write(id, $name)?;)+
                Ok(())
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);

/// Ids in `storage` carrying every type in `types`, ascending.
pub(crate) fn join<'a, S: Storage>(storage: &'a S, types: &[ComponentId]) -> Join<S::Ids<'a>> {
    Join::new(
        || storage.entity_ids(),
        types.iter().map(|&c| storage.ids_with(c)).collect(),
    )
}
