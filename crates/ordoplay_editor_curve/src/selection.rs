// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe selection state.
//!
//! Indices refer to slots of the owning [`crate::KeyframeSequence`]. The
//! editor remaps them whenever the sequence reorders or deletes keys, so
//! a selected index keeps pointing at the same key.

use crate::sequence::IndexRemap;
use indexmap::IndexSet;

/// In-progress box selection
#[derive(Debug, Clone, Default)]
struct BoxSelect {
    /// Selection when the box started
    prior: IndexSet<usize>,
    /// Keys currently inside the box
    pending: IndexSet<usize>,
}

/// Selected keyframe indices
#[derive(Debug, Clone, Default)]
pub struct Selection {
    indices: IndexSet<usize>,
    box_select: Option<BoxSelect>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selection from indices
    pub fn with_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            box_select: None,
        }
    }

    /// Whether an index is selected, counting keys inside an active box
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
            || self
                .box_select
                .as_ref()
                .is_some_and(|b| b.pending.contains(&index))
    }

    /// Select only this index
    pub fn select_solo(&mut self, index: usize) {
        self.indices.clear();
        self.indices.insert(index);
    }

    /// Add an index (idempotent)
    pub fn select_add(&mut self, index: usize) {
        self.indices.insert(index);
    }

    /// Remove an index
    pub fn deselect(&mut self, index: usize) {
        self.indices.shift_remove(&index);
    }

    /// Clear the selection
    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Committed selection, in selection order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Committed selection, ascending
    pub fn sorted(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.indices.iter().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Number of committed selected indices
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing is committed as selected
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether a box selection is in progress
    pub fn is_box_selecting(&self) -> bool {
        self.box_select.is_some()
    }

    /// Start a box selection; non-additive boxes clear the selection first
    pub fn begin_box(&mut self, additive: bool) {
        let prior = self.indices.clone();
        if !additive {
            self.indices.clear();
        }
        self.box_select = Some(BoxSelect {
            prior,
            pending: IndexSet::new(),
        });
    }

    /// Re-test every candidate against the box; safe to call every frame
    pub fn update_box(&mut self, count: usize, mut inside: impl FnMut(usize) -> bool) {
        let Some(state) = self.box_select.as_mut() else {
            return;
        };
        for index in 0..count {
            if inside(index) {
                state.pending.insert(index);
            } else {
                state.pending.shift_remove(&index);
            }
        }
        state.pending.retain(|&i| i < count);
    }

    /// Merge the box into the selection
    pub fn commit_box(&mut self) {
        if let Some(state) = self.box_select.take() {
            self.indices.extend(state.pending);
        }
    }

    /// Drop the box and restore the selection from before it
    pub fn cancel_box(&mut self) {
        if let Some(state) = self.box_select.take() {
            self.indices = state.prior;
        }
    }

    /// Follow an index shift, dropping indices of removed keys
    pub fn remap(&mut self, remap: &IndexRemap) {
        remap_set(&mut self.indices, remap);
        if let Some(state) = self.box_select.as_mut() {
            remap_set(&mut state.prior, remap);
            remap_set(&mut state.pending, remap);
        }
    }
}

fn remap_set(set: &mut IndexSet<usize>, remap: &IndexRemap) {
    *set = set.iter().filter_map(|&i| remap.map(i)).collect();
}
