//! Growable sequences with a documented maximum size.
//!
//! Driver enumerations (extensions, layers, surface formats, present modes,
//! swapchain images) are stored in a `BoundedList`. The list grows like a
//! `Vec`, but any attempt to exceed its capacity is rejected at the boundary
//! with [`Error::CapacityExceeded`] instead of overflowing.

use std::ops::Deref;

use crate::error::{Error, Result};

/// An ordered sequence that refuses to grow past `capacity` elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedList<T> {
    what: &'static str,
    capacity: usize,
    items: Vec<T>,
}

impl<T> BoundedList<T> {
    /// Create an empty list. `what` names the list in error messages.
    #[must_use]
    pub const fn new(what: &'static str, capacity: usize) -> Self {
        Self {
            what,
            capacity,
            items: Vec::new(),
        }
    }

    /// Build a list from an iterator, failing if it yields too many items.
    pub fn from_iter_checked<I>(what: &'static str, capacity: usize, iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut list = Self::new(what, capacity);
        list.extend_checked(iter)?;
        Ok(list)
    }

    /// Append an item.
    pub fn push(&mut self, item: T) -> Result<()> {
        if self.items.len() >= self.capacity {
            return Err(self.overflow(self.items.len() + 1));
        }
        self.items.push(item);
        Ok(())
    }

    /// Append every item of `iter`. On overflow the list is left unchanged.
    pub fn extend_checked<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        let incoming: Vec<T> = iter.into_iter().collect();
        let requested = self.items.len() + incoming.len();
        if requested > self.capacity {
            return Err(self.overflow(requested));
        }
        self.items.extend(incoming);
        Ok(())
    }

    /// Maximum number of items this list accepts.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Name used in diagnostics.
    #[must_use]
    pub const fn what(&self) -> &'static str {
        self.what
    }

    /// Borrow the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Borrow the items mutably. The length cannot change through this view.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Remove all items, keeping the capacity contract.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn overflow(&self, requested: usize) -> Error {
        Error::CapacityExceeded {
            what: self.what,
            capacity: self.capacity,
            requested,
        }
    }
}

impl<T: PartialEq> BoundedList<T> {
    /// Append `item` unless an equal item is already present.
    pub fn push_unique(&mut self, item: T) -> Result<()> {
        if self.items.contains(&item) {
            return Ok(());
        }
        self.push(item)
    }
}

impl<T> Deref for BoundedList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a BoundedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
