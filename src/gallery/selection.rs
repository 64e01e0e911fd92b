use std::collections::BTreeSet;

/// Set of selected photo indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `index` if unselected, otherwise unselect it.
    pub fn toggle(&mut self, index: usize) {
        if !self.indices.remove(&index) {
            self.indices.insert(index);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Select `0..len`.
    pub fn select_all(&mut self, len: usize) {
        self.indices = (0..len).collect();
    }

    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether every one of `len` photos is selected. False when `len` is 0.
    pub fn covers(&self, len: usize) -> bool {
        len > 0 && self.indices.len() == len && self.indices.iter().all(|&i| i < len)
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}
