//! # FASTECS
//!
//! An embeddable entity component system: packed or tabular storage, sorted
//! merge-join queries and a three-contract scheduler.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                              Engine                               │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │  ┌─────────────────┐    ┌─────────────────┐    ┌───────────────┐  │
//! │  │   Storage       │    │   Scheduler     │    │   Messages    │  │
//! │  │                 │    │                 │    │               │  │
//! │  │  • PackedStore  │<───│  • run_mt       │───>│  • post       │  │
//! │  │  • TableStorage │    │  • run_st       │    │  • read/pop   │  │
//! │  │  • MergeJoin    │    │  • run_mutable  │    │  • expiry     │  │
//! │  └─────────────────┘    └─────────────────┘    └───────────────┘  │
//! │                                                                   │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: Threading mode, packed header layout, TOML loading
//! - `engine`: Entities, components, pools, messages, systems
//! - `query`: Component tuples fetched and stored together
//! - `scheduler`: Run contracts and the parallel phase
//! - `systems`: Type-keyed system instances
//! - `debug`: Text dumps of entities and the global value
//!
//! ## Example
//!
//! ```rust,ignore
//! use fastecs::prelude::*;
//!
//! let mut engine: Engine<World, Event> = EngineBuilder::new(World::default())
//!     .component_debug::<Position>()
//!     .component::<Velocity>()
//!     .build()?;
//!
//! let id = engine.create_entity()?;
//! engine.add(id, Position { x: 0.0, y: 0.0 })?;
//! engine.add(id, Velocity { x: 1.0, y: 0.0 })?;
//!
//! engine.start_frame();
//! engine.phase(|phase| {
//!     phase.run_mt("report", |view| {
//!         for (id, (pos,)) in view.view::<(Position,)>().unwrap_or_default() {
//!             view.post(Event::Seen(id, pos));
//!         }
//!     });
//! });
//! engine.run_mutable("integrate", |engine| {
//!     engine.for_each_mut::<(Position, Velocity)>(|_, (p, v)| p.x += v.x)
//! })?;
//! ```

#![deny(unsafe_code)]

pub mod config;
mod debug;
pub mod engine;
pub mod query;
pub mod scheduler;
pub mod systems;

pub use config::{EngineConfig, Threading};
pub use engine::{Engine, EngineBuilder, GlobalFormatter};
pub use query::ComponentSet;
pub use scheduler::{Phase, View};
pub use systems::{System, SystemRegistry};

pub use fastecs_core::{
    Component, ComponentId, ComponentInfo, EcsError, EcsResult, EntityId, HeaderLayout,
    MessageKind, PackedStore, PoolId, Storage, SystemHandle, SystemTime, TableStorage, Width,
};

/// Everything a typical embedder imports.
pub mod prelude {
    pub use crate::{
        Component, ComponentId, ComponentInfo, EcsError, EcsResult, Engine, EngineBuilder,
        EngineConfig, EntityId, MessageKind, PackedStore, PoolId, System, TableStorage, Threading,
        View,
    };
    pub use bytemuck::{Pod, Zeroable};
}
