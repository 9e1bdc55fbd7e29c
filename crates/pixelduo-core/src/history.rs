//! Bounded undo/redo history of grid snapshots.

use std::collections::VecDeque;

use crate::grid::Grid;

/// Maximum number of snapshots to keep.
pub const MAX_HISTORY: usize = 50;

/// Undo/redo log owned by a single view.
///
/// The entry at `index` is the state currently shown. Snapshots are pushed
/// after each local edit, so undoing moves to the state before that edit.
/// History is never sent over the network.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    snapshots: VecDeque<Grid>,
    index: usize,
    capacity: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStack {
    /// Create an empty history with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// Create an empty history holding at most `capacity` snapshots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            index: 0,
            capacity: capacity.max(1),
        }
    }

    /// Record a snapshot of `grid` as the newest state.
    ///
    /// Any redo branch beyond the current position is discarded.
    pub fn push(&mut self, grid: &Grid) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.index + 1);
        }
        self.snapshots.push_back(grid.clone());
        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.index = self.snapshots.len() - 1;
    }

    /// Drop all history and start over from `grid`.
    pub fn reset(&mut self, grid: &Grid) {
        self.snapshots.clear();
        self.snapshots.push_back(grid.clone());
        self.index = 0;
    }

    /// Step back one snapshot. Returns `None` if there is nothing to undo.
    pub fn undo(&mut self) -> Option<Grid> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.snapshots.get(self.index).cloned()
    }

    /// Step forward one snapshot. Returns `None` if there is nothing to redo.
    pub fn redo(&mut self) -> Option<Grid> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.snapshots.get(self.index).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Position of the current snapshot, if any.
    pub fn position(&self) -> Option<usize> {
        (!self.snapshots.is_empty()).then_some(self.index)
    }
}
