//! # Engine
//!
//! Composes storage, the component registry, messages, timers and systems
//! behind one handle:
//!
//! ```text
//!   Engine<G, M, S>
//!   ├─ pools:     PoolId -> S         (TableStorage or PackedStore)
//!   ├─ entities:  EntityId -> PoolId
//!   ├─ registry:  closed set of component types
//!   ├─ global:    G
//!   ├─ messages:  MessageQueue<M>
//!   ├─ timer:     FrameTimer
//!   └─ systems:   SystemRegistry
//! ```
//!
//! Component types are registered once, through [`EngineBuilder`]. Anything
//! that mutates storage needs `&mut Engine`, which parallel systems never get.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::marker::PhantomData;

use fastecs_core::ecs::short_type_name;
use fastecs_core::{
    Component, ComponentInfo, ComponentRegistry, EcsError, EcsResult, EntityAllocator, EntityId,
    FrameTimer, MessageKind, MessageQueue, PoolId, Storage, SystemHandle, SystemHandles,
    TableStorage,
};

use crate::config::{EngineConfig, Threading};
use crate::query::{self, ComponentSet};
use crate::systems::{System, SystemRegistry};

/// Formats the global value for the debug dump.
pub type GlobalFormatter<G> = fn(&G) -> String;

/// Builds an [`Engine`] from its configuration, global value and the closed
/// set of component types.
///
/// # Example
///
/// ```rust,ignore
/// let engine: Engine<World, Event> = EngineBuilder::new(World::default())
///     .threading(Threading::Single)
///     .component_debug::<Position>()
///     .component::<Velocity>()
///     .build()?;
/// ```
pub struct EngineBuilder<G, M, S: Storage = TableStorage> {
    config: EngineConfig,
    registry: ComponentRegistry,
    global: G,
    global_formatter: Option<GlobalFormatter<G>>,
    /// First registration failure, reported by `build`.
    error: Option<EcsError>,
    _marker: PhantomData<fn() -> (M, S)>,
}

impl<G, M, S: Storage> EngineBuilder<G, M, S> {
    /// Starts a builder around the global value.
    #[must_use]
    pub fn new(global: G) -> Self {
        Self {
            config: EngineConfig::default(),
            registry: ComponentRegistry::new(),
            global,
            global_formatter: None,
            error: None,
            _marker: PhantomData,
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the threading mode.
    #[must_use]
    pub fn threading(mut self, threading: Threading) -> Self {
        self.config.threading = threading;
        self
    }

    /// Registers `C` with no formatter.
    #[must_use]
    pub fn component<C: Component>(self) -> Self {
        self.register(ComponentInfo::of::<C>())
    }

    /// Registers `C`, formatted with its `Debug` impl in dumps.
    #[must_use]
    pub fn component_debug<C: Component + Debug>(self) -> Self {
        self.register(ComponentInfo::with_debug::<C>())
    }

    /// Registers a fully described component, e.g. one with a removal hook.
    #[must_use]
    pub fn register(mut self, info: ComponentInfo) -> Self {
        if let Err(e) = self.registry.register(info) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Formats the global value in dumps.
    #[must_use]
    pub fn global_formatter(mut self, formatter: GlobalFormatter<G>) -> Self {
        self.global_formatter = Some(formatter);
        self
    }

    /// Formats the global value with its `Debug` impl in dumps.
    #[must_use]
    pub fn global_debug(self) -> Self
    where
        G: Debug,
    {
        self.global_formatter(|global: &G| format!("{global:?}"))
    }

    /// Validates everything and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, an invalid configuration, or an
    /// [`EcsError::InvalidLayout`] when the packed headers cannot hold the
    /// largest component or type id.
    pub fn build(self) -> EcsResult<Engine<G, M, S>> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.config.validate()?;
        self.registry.validate(&self.config.layout)?;

        let mut pools = BTreeMap::new();
        pools.insert(PoolId::DEFAULT, S::with_layout(self.config.layout));

        tracing::debug!(
            components = self.registry.len(),
            threading = ?self.config.threading,
            "engine built"
        );

        Ok(Engine {
            config: self.config,
            registry: self.registry,
            allocator: EntityAllocator::new(),
            pools,
            entities: HashMap::new(),
            global: self.global,
            global_formatter: self.global_formatter,
            messages: MessageQueue::new(),
            handles: SystemHandles::new(),
            timer: FrameTimer::new(),
            systems: SystemRegistry::new(),
            active: None,
        })
    }
}

/// The entity component system.
///
/// # Type Parameters
///
/// * `G` - Global value, shared by every system
/// * `M` - Message type, usually an enum with one variant per message kind
/// * `S` - Storage form of every pool
///
/// # Thread Safety
///
/// `&Engine` is shared with parallel systems; storage, the global value and
/// the system registry are only reachable immutably through it. The message
/// queue, timer and system handles lock internally.
pub struct Engine<G, M, S: Storage = TableStorage> {
    pub(crate) config: EngineConfig,
    pub(crate) registry: ComponentRegistry,
    allocator: EntityAllocator,
    pub(crate) pools: BTreeMap<PoolId, S>,
    pub(crate) entities: HashMap<EntityId, PoolId>,
    pub(crate) global: G,
    pub(crate) global_formatter: Option<GlobalFormatter<G>>,
    pub(crate) messages: MessageQueue<M>,
    pub(crate) handles: SystemHandles,
    pub(crate) timer: FrameTimer,
    systems: SystemRegistry,
    /// Handle of the mutable system currently running, stamped on its posts.
    pub(crate) active: Option<SystemHandle>,
}

impl<G, M, S: Storage> Engine<G, M, S> {
    /// Shorthand for [`EngineBuilder::new`].
    #[must_use]
    pub fn builder(global: G) -> EngineBuilder<G, M, S> {
        EngineBuilder::new(global)
    }

    /// The configuration in use.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Switches the threading mode for later `run_mt` calls.
    pub fn set_threading(&mut self, threading: Threading) {
        self.config.threading = threading;
    }

    /// The registered component types.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity in the default pool.
    ///
    /// # Errors
    ///
    /// Fails only if the storage rejects a fresh record.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        self.create_entity_in(PoolId::DEFAULT)
    }

    /// Creates an entity in `pool`, creating the pool on first use.
    ///
    /// # Errors
    ///
    /// Fails only if the storage rejects a fresh record.
    pub fn create_entity_in(&mut self, pool: PoolId) -> EcsResult<EntityId> {
        let layout = self.config.layout;
        let storage = self
            .pools
            .entry(pool)
            .or_insert_with(|| S::with_layout(layout));
        let id = self.allocator.allocate();
        storage.spawn(id)?;
        self.entities.insert(id, pool);
        Ok(id)
    }

    /// Removes an entity and all its components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the id is unknown or already
    /// removed.
    pub fn remove_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let pool = self
            .entities
            .remove(&id)
            .ok_or(EcsError::EntityNotFound(id))?;
        let storage = self
            .pools
            .get_mut(&pool)
            .ok_or(EcsError::EntityNotFound(id))?;
        storage.despawn(id, &self.registry)?;
        tracing::debug!(entity = %id, %pool, "entity removed");
        Ok(())
    }

    /// Returns `true` if the entity exists.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// The pool an entity lives in.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for unknown ids.
    pub fn pool_of(&self, id: EntityId) -> EcsResult<PoolId> {
        self.entities
            .get(&id)
            .copied()
            .ok_or(EcsError::EntityNotFound(id))
    }

    /// Every pool that has been used, ascending, the default pool last.
    pub fn pools(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.pools.keys().copied()
    }

    /// Number of live entities across all pools.
    #[must_use]
    pub fn number_of_entities(&self) -> usize {
        self.entities.len()
    }

    /// Number of registered component types.
    #[must_use]
    pub fn number_of_components(&self) -> usize {
        self.registry.len()
    }

    pub(crate) fn storage(&self, id: EntityId) -> EcsResult<&S> {
        let pool = self.pool_of(id)?;
        self.pools.get(&pool).ok_or(EcsError::EntityNotFound(id))
    }

    fn storage_mut(&mut self, id: EntityId) -> EcsResult<&mut S> {
        let pool = self.pool_of(id)?;
        self.pools
            .get_mut(&pool)
            .ok_or(EcsError::EntityNotFound(id))
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches a component.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered, the entity is unknown, a `C` is already
    /// attached, or a packed header would overflow.
    pub fn add<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()> {
        self.registry.info_of::<C>()?;
        self.storage_mut(id)?.insert(id, value)
    }

    /// Copies a component out.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the entity has no `C`.
    pub fn get<C: Component>(&self, id: EntityId) -> EcsResult<C> {
        self.try_get::<C>(id)?
            .ok_or_else(|| EcsError::MissingComponent {
                entity: id,
                component: short_type_name::<C>().into(),
            })
    }

    /// Copies a component out, `None` if the entity has no `C`.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered or the entity is unknown.
    pub fn try_get<C: Component>(&self, id: EntityId) -> EcsResult<Option<C>> {
        self.registry.info_of::<C>()?;
        self.storage(id)?.read::<C>(id)
    }

    /// Returns `true` if the entity carries a `C`.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered or the entity is unknown.
    pub fn has<C: Component>(&self, id: EntityId) -> EcsResult<bool> {
        self.registry.info_of::<C>()?;
        self.storage(id)?.contains(id, C::ID)
    }

    /// Overwrites an attached component.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered, the entity is unknown, or has no `C`.
    pub fn set<C: Component>(&mut self, id: EntityId, value: C) -> EcsResult<()> {
        self.registry.info_of::<C>()?;
        self.storage_mut(id)?.write(id, value)
    }

    /// Edits a component in place and writes it back.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered, the entity is unknown, or has no `C`.
    pub fn modify<C: Component, R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut C) -> R,
    ) -> EcsResult<R> {
        let mut value = self.get::<C>(id)?;
        let result = f(&mut value);
        self.storage_mut(id)?.write(id, value)?;
        Ok(result)
    }

    /// Detaches a component, running its removal hook.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered, the entity is unknown, or has no `C`.
    pub fn remove<C: Component>(&mut self, id: EntityId) -> EcsResult<()> {
        let info = *self.registry.info_of::<C>()?;
        self.storage_mut(id)?.remove(id, &info)
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    fn matching<Q: ComponentSet>(
        &self,
        pools: impl IntoIterator<Item = PoolId>,
    ) -> EcsResult<Vec<(EntityId, PoolId)>> {
        Q::check(&self.registry)?;
        let types = Q::component_ids();
        let mut ids = Vec::new();
        let mut merged = 0;
        for pool in pools {
            if let Some(storage) = self.pools.get(&pool) {
                ids.extend(query::join(storage, &types).map(|id| (id, pool)));
                merged += 1;
            }
        }
        if merged > 1 {
            ids.sort_unstable_by_key(|&(id, _)| id);
        }
        Ok(ids)
    }

    fn fetch_all<Q: ComponentSet>(
        &self,
        pools: impl IntoIterator<Item = PoolId>,
    ) -> EcsResult<Vec<(EntityId, Q)>> {
        let mut out = Vec::new();
        for (id, pool) in self.matching::<Q>(pools)? {
            if let Some(storage) = self.pools.get(&pool) {
                if let Some(values) = Q::fetch(storage, id)? {
                    out.push((id, values));
                }
            }
        }
        Ok(out)
    }

    /// Ids of every entity carrying all of `Q`, across all pools, ascending.
    ///
    /// `()` matches every entity.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn entities<Q: ComponentSet>(&self) -> EcsResult<Vec<EntityId>> {
        self.entities_across::<Q>(self.pools.keys().copied())
    }

    /// Ids of every entity in `pool` carrying all of `Q`, ascending.
    ///
    /// An unused pool yields nothing.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn entities_in<Q: ComponentSet>(&self, pool: PoolId) -> EcsResult<Vec<EntityId>> {
        self.entities_across::<Q>([pool])
    }

    /// Ids of every entity in any of `pools` carrying all of `Q`, merged into
    /// one ascending sequence.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn entities_across<Q: ComponentSet>(
        &self,
        pools: impl IntoIterator<Item = PoolId>,
    ) -> EcsResult<Vec<EntityId>> {
        Ok(self
            .matching::<Q>(pools)?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    /// Copies of `Q` for every matching entity, ascending by id.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn view<Q: ComponentSet>(&self) -> EcsResult<Vec<(EntityId, Q)>> {
        self.fetch_all::<Q>(self.pools.keys().copied())
    }

    /// Copies of `Q` for every matching entity of `pool`.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn view_in<Q: ComponentSet>(&self, pool: PoolId) -> EcsResult<Vec<(EntityId, Q)>> {
        self.fetch_all::<Q>([pool])
    }

    /// Calls `f` with a copy of `Q` for every matching entity.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn for_each<Q: ComponentSet>(&self, mut f: impl FnMut(EntityId, Q)) -> EcsResult<()> {
        for (id, values) in self.view::<Q>()? {
            f(id, values);
        }
        Ok(())
    }

    /// Calls `f` with `Q` for every matching entity and writes the values
    /// back.
    ///
    /// # Errors
    ///
    /// Fails if a type in `Q` is unregistered.
    pub fn for_each_mut<Q: ComponentSet>(
        &mut self,
        mut f: impl FnMut(EntityId, &mut Q),
    ) -> EcsResult<()> {
        let matches = self.matching::<Q>(self.pools.keys().copied())?;
        for (id, pool) in matches {
            let Some(storage) = self.pools.get_mut(&pool) else {
                continue;
            };
            if let Some(mut values) = Q::fetch(&*storage, id)? {
                f(id, &mut values);
                values.store(storage, id)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Global
    // =========================================================================

    /// The global value.
    #[inline]
    #[must_use]
    pub const fn global(&self) -> &G {
        &self.global
    }

    /// The global value, mutably.
    #[inline]
    pub fn global_mut(&mut self) -> &mut G {
        &mut self.global
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Posts a message, stamped with the running mutable system if any.
    pub fn post(&self, message: M) {
        self.messages.post(message, self.active);
    }

    /// Copies out every queued message of kind `T`.
    #[must_use]
    pub fn messages<T: MessageKind<M>>(&self) -> Vec<T> {
        self.messages.read()
    }

    /// Copies out the messages of kind `T` posted by the system `name`.
    #[must_use]
    pub fn messages_from<T: MessageKind<M>>(&self, name: &str) -> Vec<T> {
        self.handles
            .get(name)
            .map(|handle| self.messages.read_from(handle))
            .unwrap_or_default()
    }

    /// Copies out and removes the messages of kind `T`.
    pub fn pop_messages<T: MessageKind<M>>(&self) -> Vec<T> {
        self.messages.pop()
    }

    /// Removes every message.
    pub fn clear_messages(&self) {
        self.messages.clear();
    }

    /// Removes the messages of kind `T`.
    pub fn clear_messages_of<T: MessageKind<M>>(&self) {
        self.messages.clear_of::<T>();
    }

    /// Removes the messages posted by the system `name`.
    pub fn clear_messages_from(&self, name: &str) {
        if let Some(handle) = self.handles.get(name) {
            self.messages.clear_from(handle);
        }
    }

    /// Number of queued messages.
    #[must_use]
    pub fn message_queue_size(&self) -> usize {
        self.messages.len()
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Stores a system instance, at most one per type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateSystem`] if one of this type is stored.
    pub fn add_system<T: Any + Send + Sync>(&mut self, system: T) -> EcsResult<()> {
        self.systems.insert(system)
    }

    /// Borrows the stored system of type `T`.
    #[must_use]
    pub fn system<T: Any>(&self) -> Option<&T> {
        self.systems.get()
    }

    /// Mutably borrows the stored system of type `T`.
    pub fn system_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.systems.get_mut()
    }

    /// Takes the stored system of type `T` out.
    pub fn remove_system<T: Any>(&mut self) -> Option<T> {
        self.systems.remove()
    }

    /// Runs the stored system `T` under the mutable contract.
    ///
    /// The system is taken out of the registry for the duration of the run,
    /// so it cannot look itself up.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotFound`] if no `T` is stored, or whatever
    /// the system's own run returns.
    pub fn run_system<T: System<G, M, S>>(&mut self) -> EcsResult<()> {
        let mut system = self
            .systems
            .remove::<T>()
            .ok_or(EcsError::SystemNotFound(short_type_name::<T>()))?;
        let result = self.run_mutable(system.name(), |engine| system.run(engine));
        self.systems.insert(system)?;
        result
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Compacts every pool, returning the bytes reclaimed.
    ///
    /// Does nothing for table storage.
    pub fn compact(&mut self) -> usize {
        self.pools.values_mut().map(Storage::compact).sum()
    }

    /// Compacts the pools whose tombstoned share exceeds the configured
    /// threshold.
    pub fn maintain(&mut self) -> usize {
        let threshold = self.config.compaction_threshold;
        self.pools
            .values_mut()
            .filter(|storage| storage.waste_ratio() > threshold)
            .map(Storage::compact)
            .sum()
    }
}

impl<G: Debug, M, S: Storage> Debug for Engine<G, M, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("entities", &self.entities.len())
            .field("pools", &self.pools.len())
            .field("components", &self.registry.len())
            .field("messages", &self.messages.len())
            .field("systems", &self.systems)
            .field("global", &self.global)
            .finish_non_exhaustive()
    }
}
