//! Immutable ordered sequences of invocations.
//!
//! An [`InvocationSequence`] never changes once built: [`InvocationSequence::tail`]
//! and [`InvocationSequence::snoc`] return new sequences and leave the receiver
//! untouched. Element storage is reference-counted and never mutated, so clones
//! and tails share it while `snoc` copies into a fresh allocation. No mutable
//! state is ever reachable from two sequences at once.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;

use crate::invocation::Invocation;

/// Separator placed between rendered elements.
pub const SEPARATOR: &str = "; ";

/// Precondition violations on sequence decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("{operation}() called on an empty invocation sequence")]
    Empty { operation: &'static str },
}

/// An immutable, ordered, finite list of invocations.
///
/// Generic over the element type so the list can carry any renderable call
/// descriptor; the default is [`Invocation`].
pub struct InvocationSequence<I = Invocation> {
    items: Arc<[I]>,
    start: usize,
}

impl<I> InvocationSequence<I> {
    /// The empty sequence.
    pub fn empty() -> Self {
        Self {
            items: Arc::from(Vec::new()),
            start: 0,
        }
    }

    /// Build a sequence from an ordered collection, taking a snapshot of it.
    pub fn new(invocations: impl IntoIterator<Item = I>) -> Self {
        let items: Vec<I> = invocations.into_iter().collect();
        Self {
            items: Arc::from(items),
            start: 0,
        }
    }

    /// Read-only view of the elements, in order.
    pub fn invocations(&self) -> &[I] {
        &self.items[self.start..]
    }

    pub fn len(&self) -> usize {
        self.items.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, I> {
        self.invocations().iter()
    }

    /// First element.
    ///
    /// # Errors
    /// [`SequenceError::Empty`] when the sequence has no elements.
    pub fn head(&self) -> Result<&I, SequenceError> {
        self.invocations()
            .first()
            .ok_or(SequenceError::Empty { operation: "head" })
    }

    /// Every element but the first, as a new sequence.
    ///
    /// # Errors
    /// [`SequenceError::Empty`] when the sequence has no elements.
    pub fn tail(&self) -> Result<Self, SequenceError> {
        if self.is_empty() {
            return Err(SequenceError::Empty { operation: "tail" });
        }
        Ok(Self {
            items: Arc::clone(&self.items),
            start: self.start + 1,
        })
    }
}

impl<I: Clone> InvocationSequence<I> {
    /// A new sequence equal to this one with `invocation` appended.
    pub fn snoc(&self, invocation: I) -> Self {
        let mut items = Vec::with_capacity(self.len() + 1);
        items.extend_from_slice(self.invocations());
        items.push(invocation);
        Self {
            items: Arc::from(items),
            start: 0,
        }
    }
}

impl<I> Clone for InvocationSequence<I> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            start: self.start,
        }
    }
}

impl<I> Default for InvocationSequence<I> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<I> From<Vec<I>> for InvocationSequence<I> {
    fn from(invocations: Vec<I>) -> Self {
        Self {
            items: Arc::from(invocations),
            start: 0,
        }
    }
}

impl<I: Clone> From<&[I]> for InvocationSequence<I> {
    fn from(invocations: &[I]) -> Self {
        Self {
            items: Arc::from(invocations),
            start: 0,
        }
    }
}

impl<I> FromIterator<I> for InvocationSequence<I> {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl<'a, I> IntoIterator for &'a InvocationSequence<I> {
    type Item = &'a I;
    type IntoIter = std::slice::Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<I: PartialEq> PartialEq for InvocationSequence<I> {
    fn eq(&self, other: &Self) -> bool {
        self.invocations() == other.invocations()
    }
}

impl<I: Eq> Eq for InvocationSequence<I> {}

impl<I: Hash> Hash for InvocationSequence<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.invocations().hash(state);
    }
}

impl<I: fmt::Debug> fmt::Debug for InvocationSequence<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.invocations()).finish()
    }
}

impl<I: fmt::Display> fmt::Display for InvocationSequence<I> {
    /// Elements joined by `"; "`; the empty sequence renders as `""`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, invocation) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(SEPARATOR)?;
            }
            write!(f, "{invocation}")?;
        }
        Ok(())
    }
}

impl<I: Serialize> Serialize for InvocationSequence<I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for invocation in self.iter() {
            seq.serialize_element(invocation)?;
        }
        seq.end()
    }
}
