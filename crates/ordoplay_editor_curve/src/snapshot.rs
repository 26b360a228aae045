// SPDX-License-Identifier: MIT OR Apache-2.0
//! Immutable curve editing snapshots.
//!
//! A [`Snapshot`] is a self-contained copy of a curve's wrap modes,
//! keyframes, and selection. Snapshots are the unit of change notification:
//! an edit bracket yields one [`SnapshotPair`] that a host pushes onto its
//! own undo stack. Tangents inside a snapshot are final values, so
//! restoring one never re-runs the solver.

use crate::keyframe::{Keyframe, WrapMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Snapshot and configuration (de)serialization errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// RON serialization error
    #[error("RON serialization error: {0}")]
    Ron(#[from] ron::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// Binary serialization error
    #[error("Binary serialization error: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Result type for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Full curve editing state at one point in time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Extrapolation before the first key
    pub pre_wrap: WrapMode,
    /// Extrapolation after the last key
    pub post_wrap: WrapMode,
    /// Keys in time order
    pub keyframes: Vec<Keyframe>,
    /// Selected key indices
    pub selected: Vec<usize>,
}

impl Snapshot {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize to a compact binary form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from the binary form
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

/// Before/after states of one committed edit
#[derive(Debug, Clone)]
pub struct SnapshotPair {
    /// Human-readable description
    pub description: String,
    /// State before the edit (for undo)
    pub before: Arc<Snapshot>,
    /// State after the edit (for redo)
    pub after: Arc<Snapshot>,
}

impl SnapshotPair {
    /// Create a new pair
    pub fn new(
        description: impl Into<String>,
        before: Arc<Snapshot>,
        after: Arc<Snapshot>,
    ) -> Self {
        Self {
            description: description.into(),
            before,
            after,
        }
    }

    /// Whether the edit changed anything
    pub fn is_change(&self) -> bool {
        !Arc::ptr_eq(&self.before, &self.after) && self.before != self.after
    }
}
