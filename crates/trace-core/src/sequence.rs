//! # Ordered Sequences
//!
//! Append-only ordered lists used by the custody chain, the form trail, the
//! package-code list and the owner index.
//!
//! Two distinct append operations exist and must not be confused:
//!
//! | Operation           | Used by                              |
//! |---------------------|--------------------------------------|
//! | `append`            | custody chain, form trail, codes, owner index on create |
//! | `append_if_absent`  | owner index on transfer              |

use serde::{Deserialize, Serialize};

/// An ordered, append-only sequence.
///
/// Serializes as a plain JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedSeq<T>(Vec<T>);

impl<T> Default for OrderedSeq<T> {
    fn default() -> Self {
        OrderedSeq(Vec::new())
    }
}

impl<T> OrderedSeq<T> {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends unconditionally.
    pub fn append(&mut self, item: T) {
        self.0.push(item);
    }

    /// Appends every item in order.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.0.extend(items);
    }

    /// Last element, i.e. the most recent entry.
    pub fn last(&self) -> Option<&T> {
        self.0.last()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Most recent first.
    pub fn iter_recent_first(&self) -> std::iter::Rev<std::slice::Iter<'_, T>> {
        self.0.iter().rev()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T: PartialEq> OrderedSeq<T> {
    /// Appends only if an equal item is not already present.
    ///
    /// Returns `true` if the item was appended.
    pub fn append_if_absent(&mut self, item: T) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.0.push(item);
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.0.iter().any(|existing| existing == item)
    }
}

impl<T> From<Vec<T>> for OrderedSeq<T> {
    fn from(items: Vec<T>) -> Self {
        OrderedSeq(items)
    }
}

impl<T> FromIterator<T> for OrderedSeq<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        OrderedSeq(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a OrderedSeq<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
