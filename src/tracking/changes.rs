//! Batched trackable changes, as providers report them once per frame.

use std::fmt::Debug;
use std::hash::Hash;

/// Anything a tracking provider reports with a stable identifier.
pub trait Trackable: Clone + Send + 'static {
    type Id: Copy + Eq + Hash + Debug + Send + 'static;

    fn id(&self) -> Self::Id;
}

/// One frame's worth of changes for a trackable type.
///
/// Consumers handle `added`, then `updated`, then `removed`.
#[derive(Debug, Clone)]
pub struct ChangeSet<T: Trackable> {
    pub added: Vec<T>,
    pub updated: Vec<T>,
    pub removed: Vec<T::Id>,
}

impl<T: Trackable> ChangeSet<T> {
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn added(item: T) -> Self {
        let mut set = Self::new();
        set.added.push(item);
        set
    }

    pub fn updated(item: T) -> Self {
        let mut set = Self::new();
        set.updated.push(item);
        set
    }

    pub fn removed(id: T::Id) -> Self {
        let mut set = Self::new();
        set.removed.push(id);
        set
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// Added and updated items in delivery order.
    pub fn upserts(&self) -> impl Iterator<Item = &T> {
        self.added.iter().chain(self.updated.iter())
    }
}

impl<T: Trackable> Default for ChangeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
