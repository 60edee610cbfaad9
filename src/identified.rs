//! An ordered collection addressable by element id.
//!
//! [`IdentifiedVec`] keeps two structures in lock step: the order of ids,
//! and a map from id to element. Lookup by id and by position are both
//! O(1) on average. Reordering operations (`sort_by`, `shuffle`,
//! `reverse`, `move_offsets`) only touch the id order.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::ops::{Index, IndexMut, RangeBounds};

use rand::seq::SliceRandom;
use rand::Rng;

/// A value with a stable identity.
pub trait Identifiable {
    type Id: Hash + Eq + Clone + fmt::Debug + 'static;

    fn id(&self) -> Self::Id;
}

/// Ordered elements with O(1) lookup by id.
///
/// Ids normally appear once in the order. [`replace_subrange`] tolerates
/// repeated ids among the new elements: each occurrence keeps its own
/// position but all of them resolve to the last element written for that
/// id.
///
/// [`replace_subrange`]: IdentifiedVec::replace_subrange
pub struct IdentifiedVec<T: Identifiable> {
    ids: Vec<T::Id>,
    elements: HashMap<T::Id, T>,
}

impl<T: Identifiable> IdentifiedVec<T> {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            elements: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            elements: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in order.
    pub fn ids(&self) -> &[T::Id] {
        &self.ids
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ids: self.ids.iter(),
            elements: &self.elements,
        }
    }

    /// Mutable access to every stored element, in no particular order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.elements.values_mut()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.elements.get_mut(id)
    }

    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.ids.get(index).and_then(|id| self.elements.get(id))
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut T> {
        let id = self.ids.get(index)?;
        self.elements.get_mut(id)
    }

    /// Position of the first occurrence of `id`. Linear in the length.
    pub fn position(&self, id: &T::Id) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.elements.contains_key(id)
    }

    /// Append `element`, or update it in place if its id is present.
    ///
    /// Returns the element that was replaced.
    pub fn push(&mut self, element: T) -> Option<T> {
        let index = self.ids.len();
        self.insert(element, index)
    }

    /// Insert `element` at `index`, or update it in place if its id is
    /// present (its position is kept).
    ///
    /// # Panics
    /// Panics if `index > len` and the id is new.
    pub fn insert(&mut self, element: T, index: usize) -> Option<T> {
        let id = element.id();
        if let Some(existing) = self.elements.get_mut(&id) {
            return Some(std::mem::replace(existing, element));
        }
        self.ids.insert(index, id.clone());
        self.elements.insert(id, element);
        None
    }

    /// Insert `elements` starting at `index`, in order.
    ///
    /// Elements whose id is already present update the stored element and
    /// do not take up a new position.
    pub fn insert_many(&mut self, elements: impl IntoIterator<Item = T>, index: usize) {
        let mut at = index;
        for element in elements {
            if self.insert(element, at).is_none() {
                at += 1;
            }
        }
    }

    /// Remove the element with `id` and every position referencing it.
    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let removed = self.elements.remove(id)?;
        self.ids.retain(|candidate| candidate != id);
        Some(removed)
    }

    /// Remove the position `index`.
    ///
    /// Returns the element, unless another position still references the
    /// same id, in which case the element stays addressable and `None` is
    /// returned.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        let id = self.ids.remove(index);
        if self.ids.contains(&id) {
            return None;
        }
        self.elements.remove(&id)
    }

    /// Remove every element matching `predicate`.
    pub fn remove_all(&mut self, mut predicate: impl FnMut(&T) -> bool) {
        let doomed: HashSet<T::Id> = self
            .elements
            .iter()
            .filter(|(_, element)| predicate(element))
            .map(|(id, _)| id.clone())
            .collect();
        if doomed.is_empty() {
            return;
        }
        self.ids.retain(|id| !doomed.contains(id));
        self.elements.retain(|id, _| !doomed.contains(id));
    }

    /// Keep only elements matching `predicate`.
    pub fn retain(&mut self, mut predicate: impl FnMut(&T) -> bool) {
        self.remove_all(|element| !predicate(element));
    }

    /// Remove the elements at `offsets`. Duplicate offsets are ignored.
    ///
    /// # Panics
    /// Panics if any offset is out of bounds.
    pub fn remove_at_offsets(&mut self, offsets: impl IntoIterator<Item = usize>) {
        let mut offsets: Vec<usize> = offsets.into_iter().collect();
        offsets.sort_unstable();
        offsets.dedup();
        for offset in offsets.into_iter().rev() {
            self.remove_at(offset);
        }
    }

    /// Move the elements at `offsets` so they sit, in their current
    /// relative order, before the element that was at `destination`.
    ///
    /// `destination` is an offset in the collection before the move and
    /// may equal `len` to move to the end.
    ///
    /// # Panics
    /// Panics if any offset is out of bounds or `destination > len`.
    pub fn move_offsets(&mut self, offsets: impl IntoIterator<Item = usize>, destination: usize) {
        assert!(
            destination <= self.ids.len(),
            "move destination {destination} out of bounds for length {}",
            self.ids.len()
        );
        let mut offsets: Vec<usize> = offsets.into_iter().collect();
        offsets.sort_unstable();
        offsets.dedup();
        if let Some(&last) = offsets.last() {
            assert!(
                last < self.ids.len(),
                "move offset {last} out of bounds for length {}",
                self.ids.len()
            );
        }

        let before_destination = offsets.iter().filter(|&&offset| offset < destination).count();
        let mut moved = Vec::with_capacity(offsets.len());
        for &offset in offsets.iter().rev() {
            moved.push(self.ids.remove(offset));
        }
        moved.reverse();

        let tail = self.ids.split_off(destination - before_destination);
        self.ids.extend(moved);
        self.ids.extend(tail);
    }

    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        let elements = &self.elements;
        self.ids
            .sort_by(|a, b| match (elements.get(a), elements.get(b)) {
                (Some(a), Some(b)) => compare(a, b),
                _ => Ordering::Equal,
            });
    }

    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&T) -> K) {
        self.sort_by(|a, b| key(a).cmp(&key(b)));
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.ids.shuffle(rng);
    }

    pub fn reverse(&mut self) {
        self.ids.reverse();
    }

    /// Replace the positions in `range` with `elements`.
    ///
    /// New elements are written to the map last-write-wins; ids that no
    /// longer appear anywhere in the order are dropped from the map.
    ///
    /// # Panics
    /// Panics if `range` is out of bounds.
    pub fn replace_subrange<R>(&mut self, range: R, elements: impl IntoIterator<Item = T>)
    where
        R: RangeBounds<usize>,
    {
        let incoming: Vec<T> = elements.into_iter().collect();
        let new_ids: Vec<T::Id> = incoming.iter().map(|element| element.id()).collect();
        let removed: Vec<T::Id> = self.ids.splice(range, new_ids).collect();

        for element in incoming {
            self.elements.insert(element.id(), element);
        }

        if removed.is_empty() {
            return;
        }
        let remaining: HashSet<&T::Id> = self.ids.iter().collect();
        let orphaned: Vec<T::Id> = removed
            .into_iter()
            .filter(|id| !remaining.contains(id))
            .collect();
        for id in orphaned {
            self.elements.remove(&id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.elements.clear();
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let order: HashSet<&T::Id> = self.ids.iter().collect();
        let keys: HashSet<&T::Id> = self.elements.keys().collect();
        assert_eq!(order, keys, "id order and element map diverged");
    }
}

impl<T: Identifiable> Default for IdentifiedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identifiable + Clone> Clone for IdentifiedVec<T> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
            elements: self.elements.clone(),
        }
    }
}

impl<T: Identifiable + fmt::Debug> fmt::Debug for IdentifiedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Equal when both hold equal elements in the same order.
impl<T: Identifiable + PartialEq> PartialEq for IdentifiedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids && self.iter().eq(other.iter())
    }
}

impl<T: Identifiable + Eq> Eq for IdentifiedVec<T> {}

impl<T: Identifiable> Index<usize> for IdentifiedVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        let id = &self.ids[index];
        self.elements
            .get(id)
            .unwrap_or_else(|| panic!("no element stored for id {id:?} at position {index}"))
    }
}

impl<T: Identifiable> Index<&T::Id> for IdentifiedVec<T> {
    type Output = T;

    fn index(&self, id: &T::Id) -> &T {
        self.elements
            .get(id)
            .unwrap_or_else(|| panic!("no element with id {id:?}"))
    }
}

impl<T: Identifiable> IndexMut<&T::Id> for IdentifiedVec<T> {
    fn index_mut(&mut self, id: &T::Id) -> &mut T {
        self.elements
            .get_mut(id)
            .unwrap_or_else(|| panic!("no element with id {id:?}"))
    }
}

impl<T: Identifiable> FromIterator<T> for IdentifiedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

impl<T: Identifiable> Extend<T> for IdentifiedVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.push(element);
        }
    }
}

/// Borrowing iterator over an [`IdentifiedVec`], in order.
pub struct Iter<'a, T: Identifiable> {
    ids: std::slice::Iter<'a, T::Id>,
    elements: &'a HashMap<T::Id, T>,
}

impl<'a, T: Identifiable> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let elements = self.elements;
        self.ids.find_map(|id| elements.get(id))
    }

    // Every id in the order has an element.
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ids.len();
        (remaining, Some(remaining))
    }
}

impl<T: Identifiable> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T: Identifiable> IntoIterator for &'a IdentifiedVec<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Yields each element once, at the first position of its id.
impl<T: Identifiable> IntoIterator for IdentifiedVec<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(mut self) -> Self::IntoIter {
        let mut ordered = Vec::with_capacity(self.elements.len());
        for id in &self.ids {
            if let Some(element) = self.elements.remove(id) {
                ordered.push(element);
            }
        }
        ordered.into_iter()
    }
}
