//! # Memory Management
//!
//! The byte arena behind the packed record store, and the fixed-width
//! header encoding written into it.
//!
//! ## Design Philosophy
//!
//! - One contiguous buffer, addressed by offsets only
//! - Header widths fixed at configuration time
//! - Overflow is an error, never a wrap

mod arena;
mod header;

pub use arena::ByteArena;
pub use header::{HeaderLayout, Width};
