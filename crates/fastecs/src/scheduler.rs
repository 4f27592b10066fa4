//! # Scheduler
//!
//! Runs named systems under one of three contracts:
//!
//! | Contract   | Entry point                 | Access         | Thread            |
//! |------------|-----------------------------|----------------|-------------------|
//! | parallel   | [`Phase::run_mt`]           | [`View`]       | worker or inline  |
//! | read-only  | [`Engine::run_st`]          | [`View`]       | caller            |
//! | mutable    | [`Engine::run_mutable`]     | `&mut Engine`  | caller            |
//!
//! Parallel systems only exist inside [`Engine::phase`], which borrows the
//! engine immutably; the borrow checker keeps every mutable system out until
//! the phase has joined its workers.
//!
//! ## Frame Lifecycle
//!
//! ```text
//! start_frame()
//!   ├─ phase(|p| { p.run_mt("ai", ..); p.run_mt("physics", ..); })  // joins
//!   ├─ run_st("audit", ..)
//!   └─ run_mutable("apply", ..)
//! timer_st() / timer_mt()  ->  total / frames
//! ```
//!
//! Before a system runs, the messages it posted during its previous run are
//! discarded.

use std::ops::Deref;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Instant;

use fastecs_core::{Storage, SystemHandle, SystemTime, TableStorage};

use crate::config::Threading;
use crate::engine::Engine;

#[derive(Clone, Copy, Debug)]
enum Contract {
    Parallel,
    ReadOnly,
    Mutable,
}

/// Read-only access handed to `run_st` and `run_mt` systems.
///
/// Dereferences to the engine; anything reachable through `&Engine` is
/// available. Messages posted through the view carry the system's handle.
pub struct View<'e, G, M, S: Storage = TableStorage> {
    engine: &'e Engine<G, M, S>,
    handle: SystemHandle,
}

impl<G, M, S: Storage> View<'_, G, M, S> {
    /// Posts a message stamped with this system's handle.
    pub fn post(&self, message: M) {
        self.engine.messages.post(message, Some(self.handle));
    }

    /// The running system's handle.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> SystemHandle {
        self.handle
    }
}

impl<G, M, S: Storage> Deref for View<'_, G, M, S> {
    type Target = Engine<G, M, S>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.engine
    }
}

impl<G, M, S: Storage> Engine<G, M, S> {
    /// Assigns the handle and drops the system's previous messages.
    fn begin(&self, name: &str) -> SystemHandle {
        let handle = self.handles.handle(name);
        self.messages.clear_from(handle);
        handle
    }

    fn finish(&self, name: &str, handle: SystemHandle, started: Instant, contract: Contract) {
        let elapsed = started.elapsed();
        let threaded = matches!(contract, Contract::Parallel);
        self.timer.record(name, elapsed, threaded);
        tracing::trace!(system = name, %handle, ?contract, ?elapsed, "system finished");
    }

    /// Runs a read-only system inline.
    pub fn run_st<R>(&self, name: &str, f: impl FnOnce(&View<'_, G, M, S>) -> R) -> R {
        let handle = self.begin(name);
        let started = Instant::now();
        let result = f(&View {
            engine: self,
            handle,
        });
        self.finish(name, handle, started, Contract::ReadOnly);
        result
    }

    /// Runs a mutable system inline.
    ///
    /// Messages posted through [`Engine::post`] while `f` runs are stamped
    /// with this system's handle.
    pub fn run_mutable<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        let handle = self.begin(name);
        let previous = self.active.replace(handle);
        let started = Instant::now();
        let result = f(self);
        self.active = previous;
        self.finish(name, handle, started, Contract::Mutable);
        result
    }

    /// Opens a parallel phase.
    ///
    /// Every worker started with [`Phase::run_mt`] has finished when this
    /// returns. A worker panic is re-raised here.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// engine.phase(|phase| {
    ///     phase.run_mt("ai", |view| think(view));
    ///     phase.run_mt("physics", |view| integrate(view));
    /// });
    /// ```
    pub fn phase<'env, R>(
        &'env self,
        f: impl for<'scope> FnOnce(&mut Phase<'scope, 'env, G, M, S>) -> R,
    ) -> R
    where
        G: Sync,
        M: Send,
    {
        thread::scope(|scope| {
            let mut phase = Phase {
                scope,
                engine: self,
                workers: Vec::new(),
            };
            let result = f(&mut phase);
            phase.join();
            result
        })
    }

    /// Counts one more frame.
    pub fn start_frame(&self) {
        self.timer.start_frame();
    }

    /// Zeroes every timing total and the frame counter.
    pub fn reset_timer(&self) {
        self.timer.reset();
    }

    /// Frames counted since the last reset.
    #[must_use]
    pub fn frames(&self) -> u32 {
        self.timer.frames()
    }

    /// Per-frame averages of inline systems, plus the `multithreaded` total.
    #[must_use]
    pub fn timer_st(&self) -> Vec<SystemTime> {
        self.timer.single_threaded()
    }

    /// Per-frame averages of systems that ran on workers.
    #[must_use]
    pub fn timer_mt(&self) -> Vec<SystemTime> {
        self.timer.multi_threaded()
    }
}

/// A parallel phase: read-only systems running on scoped worker threads.
pub struct Phase<'scope, 'env, G, M, S: Storage = TableStorage> {
    scope: &'scope Scope<'scope, 'env>,
    engine: &'env Engine<G, M, S>,
    workers: Vec<(String, ScopedJoinHandle<'scope, ()>)>,
}

impl<'scope, 'env, G, M, S> Phase<'scope, 'env, G, M, S>
where
    G: Sync,
    M: Send,
    S: Storage,
{
    /// Runs a read-only system on its own worker thread, or inline when the
    /// engine is configured for single threading.
    ///
    /// The closure may only capture by value or by shared reference; several
    /// run at once.
    pub fn run_mt<F>(&mut self, name: &str, f: F)
    where
        F: FnOnce(&View<'_, G, M, S>) + Send + 'scope,
    {
        let engine = self.engine;
        if engine.config.threading == Threading::Single {
            engine.run_st(name, f);
            return;
        }

        let handle = engine.begin(name);
        let system = name.to_owned();
        let worker = self.scope.spawn({
            let system = system.clone();
            move || {
                let started = Instant::now();
                f(&View { engine, handle });
                engine.finish(&system, handle, started, Contract::Parallel);
            }
        });
        self.workers.push((system, worker));
    }

    /// Blocks until every outstanding worker has finished.
    ///
    /// # Panics
    ///
    /// Re-raises the panic of the first worker that panicked.
    pub fn join(&mut self) {
        for (system, worker) in self.workers.drain(..) {
            if let Err(payload) = worker.join() {
                tracing::warn!(system = %system, "worker panicked");
                std::panic::resume_unwind(payload);
            }
        }
    }

    /// Number of workers not yet joined.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.workers.len()
    }

    /// The engine, for reads between `run_mt` calls.
    #[inline]
    #[must_use]
    pub const fn engine(&self) -> &'env Engine<G, M, S> {
        self.engine
    }
}
