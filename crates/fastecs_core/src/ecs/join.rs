//! # Merge Join
//!
//! Intersects several ascending id sequences with one cursor each. Cost is
//! linear in the total length of the inputs and no input is buffered.

use std::iter::Peekable;

use super::entity::EntityId;

/// Sorted-intersection of N ascending id sequences.
///
/// Each step takes the largest id under the cursors, advances every cursor
/// still below it, and emits the id once all cursors agree. The join ends as
/// soon as any input is exhausted.
///
/// # Example
///
/// ```rust,ignore
/// let a = [1, 3, 5].map(EntityId::new);
/// let b = [2, 3, 5, 7].map(EntityId::new);
/// let ids: Vec<_> = MergeJoin::new(vec![a.into_iter(), b.into_iter()]).collect();
/// assert_eq!(ids, [3, 5].map(EntityId::new));
/// ```
pub struct MergeJoin<I: Iterator<Item = EntityId>> {
    cursors: Vec<Peekable<I>>,
}

impl<I: Iterator<Item = EntityId>> MergeJoin<I> {
    /// Creates a join over `inputs`. Every input must be strictly ascending.
    ///
    /// With no inputs the join yields nothing; see [`Join`] for the
    /// zero-type case.
    #[must_use]
    pub fn new(inputs: impl IntoIterator<Item = I>) -> Self {
        Self {
            cursors: inputs.into_iter().map(Iterator::peekable).collect(),
        }
    }
}

impl<I: Iterator<Item = EntityId>> Iterator for MergeJoin<I> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        if self.cursors.is_empty() {
            return None;
        }
        loop {
            let mut max = None;
            for cursor in &mut self.cursors {
                let id = *cursor.peek()?;
                max = max.max(Some(id));
            }
            let max = max?;

            let mut aligned = true;
            for cursor in &mut self.cursors {
                while let Some(&id) = cursor.peek() {
                    if id >= max {
                        break;
                    }
                    cursor.next();
                }
                match cursor.peek() {
                    Some(&id) if id == max => {}
                    Some(_) => aligned = false,
                    None => return None,
                }
            }

            if aligned {
                for cursor in &mut self.cursors {
                    cursor.next();
                }
                return Some(max);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = self
            .cursors
            .iter()
            .map(|c| c.size_hint().1)
            .min()
            .flatten();
        (0, upper)
    }
}

/// Entity ids matching a set of requested component types.
///
/// Zero requested types bypasses the merge and passes the full id sequence
/// through.
pub enum Join<I: Iterator<Item = EntityId>> {
    /// Every live id.
    All(I),
    /// Ids carrying every requested type.
    Merge(MergeJoin<I>),
}

impl<I: Iterator<Item = EntityId>> Join<I> {
    /// Builds a join from the per-type sequences, or from `all` when no
    /// types are requested.
    pub fn new(all: impl FnOnce() -> I, per_type: Vec<I>) -> Self {
        if per_type.is_empty() {
            Self::All(all())
        } else {
            Self::Merge(MergeJoin::new(per_type))
        }
    }
}

impl<I: Iterator<Item = EntityId>> Iterator for Join<I> {
    type Item = EntityId;

    #[inline]
    fn next(&mut self) -> Option<EntityId> {
        match self {
            Self::All(ids) => ids.next(),
            Self::Merge(join) => join.next(),
        }
    }
}
