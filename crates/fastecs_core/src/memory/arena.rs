//! # Byte Arena
//!
//! A single growable byte buffer addressed only by integer offsets.

/// A growable byte arena.
///
/// Any insertion may relocate the backing storage, so callers keep offsets,
/// never references, across mutating calls and re-resolve them at use time.
///
/// # Thread Safety
///
/// Mutation needs `&mut self`; shared readers only ever see a settled buffer.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = ByteArena::with_capacity(1024);
/// let at = arena.append(&[1, 2, 3]);
/// arena.insert(at + 1, &[9]);
/// assert_eq!(arena.slice(at, 4), &[1, 9, 2, 3]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ByteArena {
    /// The backing storage.
    bytes: Vec<u8>,
}

impl ByteArena {
    /// Creates an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Creates an empty arena with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes in use.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the allocated capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Appends `data` at the end, returning the offset it was written at.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let offset = self.bytes.len();
        self.bytes.extend_from_slice(data);
        offset
    }

    /// Appends `len` zero bytes, returning their offset.
    pub fn append_zeroed(&mut self, len: usize) -> usize {
        let offset = self.bytes.len();
        self.bytes.resize(offset + len, 0);
        offset
    }

    /// Inserts `data` at `offset`, shifting everything after it.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is past the end of the arena.
    pub fn insert(&mut self, offset: usize, data: &[u8]) {
        self.bytes.splice(offset..offset, data.iter().copied());
    }

    /// Borrows `len` bytes starting at `offset`.
    #[inline]
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.bytes[offset..offset + len]
    }

    /// Mutably borrows `len` bytes starting at `offset`.
    #[inline]
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.bytes[offset..offset + len]
    }

    /// Borrows everything from `offset` to the end.
    #[inline]
    #[must_use]
    pub fn tail(&self, offset: usize) -> &[u8] {
        &self.bytes[offset..]
    }

    /// Overwrites `len` bytes at `offset` with zeroes.
    #[inline]
    pub fn zero(&mut self, offset: usize, len: usize) {
        self.bytes[offset..offset + len].fill(0);
    }

    /// Returns the whole buffer.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Swaps in a rebuilt buffer, returning the old one.
    pub fn replace(&mut self, bytes: Vec<u8>) -> Vec<u8> {
        std::mem::replace(&mut self.bytes, bytes)
    }

    /// Empties the arena, keeping its allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.bytes.clear();
    }
}
