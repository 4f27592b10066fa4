//! # Cross-System Coordination
//!
//! The only structures parallel systems mutate concurrently:
//!
//! ```text
//!   run_mt("physics")  ─┐
//!   run_mt("ai")       ─┼──▶  MessageQueue   (Mutex<Vec<envelope>>)
//!   run_st("audio")    ─┘     FrameTimer     (Mutex<per-system totals>)
//!                             SystemHandles  (Mutex<name -> handle>)
//! ```
//!
//! Storage itself is never behind a lock: parallel systems only get `&`
//! access to it, and `&mut` access waits until every worker has joined.

mod handles;
mod message_queue;
mod timer;

pub use handles::{SystemHandle, SystemHandles};
pub use message_queue::{MessageKind, MessageQueue};
pub use timer::{FrameTimer, SystemTime, MULTITHREADED};
