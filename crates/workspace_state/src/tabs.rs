//! Ordered tab list with a single active entry
//!
//! Shared by the document table and the terminal registry. At most one entry
//! is active at a time; removing the active entry hands activation to the
//! entry now at the same index, or to the new last entry.

use serde::Serialize;

pub trait Tab {
    fn id(&self) -> &str;
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TabList<T> {
    entries: Vec<T>,
}

impl<T> Default for TabList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Tab> TabList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entries.iter_mut().find(|entry| entry.id() == id)
    }

    pub fn active(&self) -> Option<&T> {
        self.entries.iter().find(|entry| entry.is_active())
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active().map(Tab::id)
    }

    /// Append `entry` and make it the only active one.
    pub fn insert_active(&mut self, entry: T) {
        self.entries.push(entry);
        let last = self.entries.len() - 1;
        self.activate_index(last);
    }

    /// Returns `false` and leaves the list untouched if `id` is unknown.
    pub fn activate(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.activate_index(index);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.position(id)?;
        let removed = self.entries.remove(index);

        if removed.is_active() && !self.entries.is_empty() {
            let next = index.min(self.entries.len() - 1);
            self.activate_index(next);
        }
        Some(removed)
    }

    pub fn drain(&mut self) -> Vec<T> {
        std::mem::take(&mut self.entries)
    }

    fn activate_index(&mut self, index: usize) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.set_active(i == index);
        }
    }
}
