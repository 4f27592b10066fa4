//! # Message Queue
//!
//! Append-only list of messages, each stamped with the handle of the system
//! that posted it. Reads copy matching messages out and leave the queue
//! untouched; entries go away only through an explicit clear or through
//! self-expiry when their sender runs again.

use parking_lot::Mutex;

use super::handles::SystemHandle;

/// A message tag: one variant of the user's message type.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// enum Event { Hit(Hit), Spawned(EntityId) }
///
/// impl MessageKind<Event> for Hit {
///     fn extract(message: &Event) -> Option<Self> {
///         match message {
///             Event::Hit(hit) => Some(*hit),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait MessageKind<M>: Sized {
    /// Copies this variant out of `message`, `None` if it holds another one.
    fn extract(message: &M) -> Option<Self>;

    /// Returns `true` if `message` holds this variant.
    fn matches(message: &M) -> bool {
        Self::extract(message).is_some()
    }
}

/// Every message is its own tag.
impl<M: Clone> MessageKind<M> for M {
    fn extract(message: &M) -> Option<Self> {
        Some(message.clone())
    }
}

#[derive(Debug, Clone)]
struct Envelope<M> {
    message: M,
    sender: Option<SystemHandle>,
}

/// Mutex-guarded message queue.
///
/// # Thread Safety
///
/// All operations take `&self` and may be called from any worker of a
/// parallel phase.
#[derive(Debug)]
pub struct MessageQueue<M> {
    entries: Mutex<Vec<Envelope<M>>>,
}

impl<M> Default for MessageQueue<M> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<M> MessageQueue<M> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message. `sender` is `None` outside any system.
    pub fn post(&self, message: M, sender: Option<SystemHandle>) {
        self.entries.lock().push(Envelope { message, sender });
    }

    /// Copies out every message of kind `T`, oldest first.
    #[must_use]
    pub fn read<T: MessageKind<M>>(&self) -> Vec<T> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| T::extract(&e.message))
            .collect()
    }

    /// Copies out the messages of kind `T` posted by `sender`.
    #[must_use]
    pub fn read_from<T: MessageKind<M>>(&self, sender: SystemHandle) -> Vec<T> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.sender == Some(sender))
            .filter_map(|e| T::extract(&e.message))
            .collect()
    }

    /// Copies out the messages of kind `T` and removes them, atomically.
    pub fn pop<T: MessageKind<M>>(&self) -> Vec<T> {
        let mut entries = self.entries.lock();
        let popped = entries
            .iter()
            .filter_map(|e| T::extract(&e.message))
            .collect();
        entries.retain(|e| !T::matches(&e.message));
        popped
    }

    /// Removes everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Removes the messages posted by `sender`.
    ///
    /// Called before every system run, so a system never reads its own
    /// messages from a previous run.
    pub fn clear_from(&self, sender: SystemHandle) {
        self.entries.lock().retain(|e| e.sender != Some(sender));
    }

    /// Removes the messages of kind `T`.
    pub fn clear_of<T: MessageKind<M>>(&self) {
        self.entries.lock().retain(|e| !T::matches(&e.message));
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
