//! # FASTECS Core
//!
//! The leaf subsystems of the FASTECS entity component system:
//!
//! - [`ecs::PackedStore`]: every entity's components in one byte arena, with
//!   in-place tombstones, slot reuse and compaction
//! - [`ecs::TableStorage`]: one sorted `(id, value)` table per component type
//! - [`ecs::MergeJoin`]: sorted intersection of per-type id sequences
//! - [`sync`]: the mutex-guarded message queue, system handles and frame timer
//!
//! ## Architecture Rules
//!
//! 1. **Offsets, not pointers** - the packed arena is addressed by integer
//!    offsets re-resolved at every access
//! 2. **Plain data** - components are `bytemuck::Pod`; no type punning
//! 3. **Fail loudly** - usage errors are returned, never coerced
//!
//! ## Example
//!
//! ```rust,ignore
//! use fastecs_core::{EntityId, MergeJoin, Storage, TableStorage};
//!
//! let mut storage = TableStorage::new();
//! storage.spawn(EntityId::new(0))?;
//! storage.insert(EntityId::new(0), Health(10))?;
//! let ids: Vec<_> = MergeJoin::new([storage.ids_with(Health::ID)]).collect();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ecs;
pub mod error;
pub mod memory;
pub mod sync;

pub use ecs::{
    Component, ComponentId, ComponentInfo, ComponentRegistry, ComponentTable, EntityAllocator,
    EntityId, Join, MergeJoin, PackedStore, PoolId, Storage, TableStorage,
};
pub use error::{EcsError, EcsResult, HeaderField};
pub use memory::{ByteArena, HeaderLayout, Width};
pub use sync::{FrameTimer, MessageKind, MessageQueue, SystemHandle, SystemHandles, SystemTime};
