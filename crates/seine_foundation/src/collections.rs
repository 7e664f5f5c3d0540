//! Persistent collections with structural sharing.
//!
//! Field values stored in a committed fact are frozen: these are thin wrappers
//! around the `im` crate's persistent data structures, so copying a fact for
//! `modify`/`duplicate` shares structure with the original instead of
//! deep-cloning nested collections.
//!
//! All three collections are totally ordered so that values can live inside
//! ordered network memories.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

/// Persistent vector with structural sharing.
///
/// Cloning is O(1). Modifications return a new vector sharing structure
/// with the original.
#[derive(Clone, Default)]
pub struct FrozenVec<T>(im::Vector<T>)
where
    T: Clone;

impl<T: Clone> FrozenVec<T> {
    /// Creates an empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self(im::Vector::new())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets an element by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }

    /// Returns a new vector with the element appended.
    #[must_use]
    pub fn push_back(&self, value: T) -> Self {
        let mut new = self.0.clone();
        new.push_back(value);
        Self(new)
    }

    /// Returns a new vector with the element at `index` replaced.
    ///
    /// Returns `None` if `index` is out of bounds.
    #[must_use]
    pub fn update(&self, index: usize, value: T) -> Option<Self> {
        if index >= self.len() {
            return None;
        }
        let mut new = self.0.clone();
        new.set(index, value);
        Some(Self(new))
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for FrozenVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone + PartialEq> PartialEq for FrozenVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Clone + Eq> Eq for FrozenVec<T> {}

impl<T: Clone + Ord> PartialOrd for FrozenVec<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Clone + Ord> Ord for FrozenVec<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Clone + Hash> Hash for FrozenVec<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for item in self.iter() {
            item.hash(state);
        }
    }
}

impl<T: Clone> FromIterator<T> for FrozenVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(im::Vector::from_iter(iter))
    }
}

impl<'a, T: Clone> IntoIterator for &'a FrozenVec<T> {
    type Item = &'a T;
    type IntoIter = im::vector::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Persistent ordered set with structural sharing.
#[derive(Clone, Default)]
pub struct FrozenSet<T>(im::OrdSet<T>)
where
    T: Clone + Ord;

impl<T: Clone + Ord> FrozenSet<T> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(im::OrdSet::new())
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the set contains the value.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    /// Returns a new set with the value inserted.
    #[must_use]
    pub fn insert(&self, value: T) -> Self {
        let mut new = self.0.clone();
        new.insert(value);
        Self(new)
    }

    /// Returns a new set with the value removed.
    #[must_use]
    pub fn remove(&self, value: &T) -> Self {
        let mut new = self.0.clone();
        new.remove(value);
        Self(new)
    }

    /// Returns an iterator over the elements in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Clone + Ord + fmt::Debug> fmt::Debug for FrozenSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Clone + Ord> PartialEq for FrozenSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Clone + Ord> Eq for FrozenSet<T> {}

impl<T: Clone + Ord> PartialOrd for FrozenSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Clone + Ord> Ord for FrozenSet<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Clone + Ord + Hash> Hash for FrozenSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Ordered iteration keeps the hash independent of insertion order
        self.len().hash(state);
        for item in self.iter() {
            item.hash(state);
        }
    }
}

impl<T: Clone + Ord> FromIterator<T> for FrozenSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(im::OrdSet::from_iter(iter))
    }
}

/// Persistent ordered map with structural sharing.
#[derive(Clone, Default)]
pub struct FrozenMap<K, V>(im::OrdMap<K, V>)
where
    K: Clone + Ord,
    V: Clone;

impl<K: Clone + Ord, V: Clone> FrozenMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(im::OrdMap::new())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets a value by key.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    /// Returns true if the map contains the key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }

    /// Returns a new map with the key-value pair inserted.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let mut new = self.0.clone();
        new.insert(key, value);
        Self(new)
    }

    /// Returns a new map with the key removed.
    #[must_use]
    pub fn remove(&self, key: &K) -> Self {
        let mut new = self.0.clone();
        new.remove(key);
        Self(new)
    }

    /// Returns an iterator over key-value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.0.iter()
    }

    /// Returns an iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.0.keys()
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.values()
    }
}

impl<K: Clone + Ord + fmt::Debug, V: Clone + fmt::Debug> fmt::Debug for FrozenMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone + Ord, V: Clone + PartialEq> PartialEq for FrozenMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Clone + Ord, V: Clone + Eq> Eq for FrozenMap<K, V> {}

impl<K: Clone + Ord, V: Clone + Ord> PartialOrd for FrozenMap<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Clone + Ord, V: Clone + Ord> Ord for FrozenMap<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: Clone + Ord + Hash, V: Clone + Hash> Hash for FrozenMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (k, v) in self.iter() {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<K: Clone + Ord, V: Clone> FromIterator<(K, V)> for FrozenMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(im::OrdMap::from_iter(iter))
    }
}
