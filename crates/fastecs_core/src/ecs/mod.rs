//! # Entity Component System
//!
//! Storage and iteration for plain-data components keyed by entity id.
//!
//! ## Design Philosophy
//!
//! - Components are `Pod` and are copied in and out of storage
//! - Two storage forms behind one [`Storage`] trait: sorted per-type tables
//!   and a packed byte arena with tombstones
//! - Every id sequence is ascending, so any set of component types is
//!   intersected by a single merge join
//! - No dynamic dispatch per entity in the hot paths

mod component;
mod entity;
mod join;
mod packed;
mod registry;
mod storage;
mod table;

pub use component::{
    read_payload, short_type_name, Component, ComponentId, ComponentInfo, DebugFn, RemoveHook,
};
pub use entity::{EntityAllocator, EntityId, PoolId};
pub use join::{Join, MergeJoin};
pub use packed::{PackedIds, PackedStore};
pub use registry::ComponentRegistry;
pub use storage::Storage;
pub use table::{ComponentTable, TableStorage};
