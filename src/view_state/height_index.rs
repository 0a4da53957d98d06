//! Prefix sums over row heights via a Fenwick tree.
//!
//! The virtualizer needs three operations fast on hundreds of thousands of
//! rows: total extent, offset of row i, and "which row contains vertical
//! offset y". All are O(log n) here (`lower_bound` is O(log² n)), and a
//! height correction (estimate → measurement) is a single O(log n) update
//! that consistently shifts every subsequent offset.

/// Fenwick-tree-backed cumulative row heights.
#[derive(Debug, Clone, Default)]
pub struct HeightIndex {
    /// Fenwick backing storage; 0-indexed API over the usual 1-indexed tree.
    tree: Vec<isize>,
    len: usize,
}

impl HeightIndex {
    /// Empty index with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: vec![0; capacity],
            len: 0,
        }
    }

    /// Append a row with the given height.
    pub fn push(&mut self, height: usize) {
        if self.len >= self.tree.len() {
            self.grow(self.tree.len().max(1) * 2);
        }
        let index = self.len;
        self.len += 1;
        fenwick::array::update(&mut self.tree, index, height as isize);
    }

    /// Grow the backing array.
    ///
    /// A Fenwick node's span is fixed by the array size, so nodes covering
    /// the new region cannot be extended in place; rebuild from the stored
    /// heights instead. Amortized O(log n) per push under doubling.
    fn grow(&mut self, new_capacity: usize) {
        let heights: Vec<usize> = (0..self.len).map(|i| self.height(i)).collect();
        self.tree = vec![0; new_capacity];
        for (index, height) in heights.into_iter().enumerate() {
            fenwick::array::update(&mut self.tree, index, height as isize);
        }
    }

    /// Replace the height of row `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn set(&mut self, index: usize, height: usize) {
        assert!(index < self.len, "row {index} out of bounds (len {})", self.len);
        let delta = height as isize - self.height(index) as isize;
        if delta != 0 {
            fenwick::array::update(&mut self.tree, index, delta);
        }
    }

    /// Height of row `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn height(&self, index: usize) -> usize {
        if index == 0 {
            self.prefix_sum(0)
        } else {
            self.prefix_sum(index) - self.prefix_sum(index - 1)
        }
    }

    /// Cumulative height up to and including row `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn prefix_sum(&self, index: usize) -> usize {
        assert!(index < self.len, "row {index} out of bounds (len {})", self.len);
        fenwick::array::prefix_sum(&self.tree, index).max(0) as usize
    }

    /// Vertical offset of the top of row `index` (0 for the first row).
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn offset_of(&self, index: usize) -> usize {
        if index == 0 {
            0
        } else {
            self.prefix_sum(index - 1)
        }
    }

    /// Row containing vertical offset `value`: the first index whose prefix
    /// sum exceeds it. `None` when `value >= total()` or the index is empty.
    pub fn lower_bound(&self, value: usize) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let mut left = 0;
        let mut right = self.len;
        while left < right {
            let mid = left + (right - left) / 2;
            if self.prefix_sum(mid) > value {
                right = mid;
            } else {
                left = mid + 1;
            }
        }
        (left < self.len).then_some(left)
    }

    /// Sum of all row heights.
    pub fn total(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.prefix_sum(self.len - 1)
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no rows have been pushed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
