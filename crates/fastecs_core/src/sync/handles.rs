//! # System Handles
//!
//! Small stable integers naming systems. The first time a name is seen it
//! gets the next integer; afterwards it always maps to the same one.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

/// Stable integer naming one system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SystemHandle(u32);

impl SystemHandle {
    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name to handle table, shared by every worker of a phase.
#[derive(Debug, Default)]
pub struct SystemHandles {
    names: Mutex<HashMap<String, SystemHandle>>,
}

impl SystemHandles {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `name`, assigning the next one on first use.
    pub fn handle(&self, name: &str) -> SystemHandle {
        let mut names = self.names.lock();
        if let Some(&handle) = names.get(name) {
            return handle;
        }
        let handle = SystemHandle(names.len() as u32);
        names.insert(name.to_owned(), handle);
        handle
    }

    /// Looks up a handle without assigning one.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SystemHandle> {
        self.names.lock().get(name).copied()
    }

    /// Number of distinct systems seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.lock().len()
    }

    /// Returns `true` if no system has run yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }
}
