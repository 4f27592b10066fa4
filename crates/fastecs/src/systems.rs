//! # System Registry
//!
//! Holds at most one instance per system type. Systems keep their own state
//! between runs; the engine only stores them and hands them the engine when
//! they run.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use fastecs_core::ecs::short_type_name;
use fastecs_core::{EcsError, EcsResult, Storage, TableStorage};

use crate::engine::Engine;

/// A unit of logic run under the mutable contract.
///
/// # Example
///
/// ```rust,ignore
/// struct Decay { rate: u32 }
///
/// impl System<World, Event> for Decay {
///     fn run(&mut self, engine: &mut Engine<World, Event>) -> EcsResult<()> {
///         engine.for_each_mut::<(Health,)>(|_, (hp,)| hp.0 = hp.0.saturating_sub(self.rate))
///     }
/// }
/// ```
pub trait System<G, M, S: Storage = TableStorage>: Send + Sync + 'static {
    /// Name used for timing and message expiry. Defaults to the type name.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Runs once.
    ///
    /// # Errors
    ///
    /// Usage errors raised against the engine are passed back to the caller
    /// of [`Engine::run_system`].
    fn run(&mut self, engine: &mut Engine<G, M, S>) -> EcsResult<()>;
}

/// Type-keyed system instances.
#[derive(Default)]
pub struct SystemRegistry {
    systems: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `system`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateSystem`] if one of this type is already
    /// stored.
    pub fn insert<T: Any + Send + Sync>(&mut self, system: T) -> EcsResult<()> {
        let key = TypeId::of::<T>();
        if self.systems.contains_key(&key) {
            return Err(EcsError::DuplicateSystem(short_type_name::<T>()));
        }
        self.systems.insert(key, Box::new(system));
        tracing::debug!(system = short_type_name::<T>(), "system registered");
        Ok(())
    }

    /// Borrows the system of type `T`.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.systems.get(&TypeId::of::<T>())?.downcast_ref()
    }

    /// Mutably borrows the system of type `T`.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.systems.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    /// Takes the system of type `T` out.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        let boxed = self.systems.remove(&TypeId::of::<T>())?;
        boxed.downcast::<T>().ok().map(|system| *system)
    }

    /// Returns `true` if a system of type `T` is stored.
    #[must_use]
    pub fn contains<T: Any>(&self) -> bool {
        self.systems.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("systems", &self.systems.len())
            .finish()
    }
}
