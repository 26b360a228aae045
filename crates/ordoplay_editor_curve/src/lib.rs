// SPDX-License-Identifier: MIT OR Apache-2.0
//! Curve editor core for OrdoPlay Editor.
//!
//! This crate provides the editing engine behind animation curves:
//! - Keyframes with weighted in/out tangents
//! - Tangent solving (linear, free, weighted, auto-smoothing)
//! - Tangent mode state machine with neighbor propagation
//! - Sorted, collision-free keyframe storage
//! - Keyframe selection with box select
//! - Immutable snapshots for undo/redo
//!
//! ## Architecture
//!
//! The engine is built on:
//! - A plain keyframe array addressed by index, with stable ids
//! - Pure tangent solver functions
//! - Snapshots as the unit of change notification
//!
//! Rendering, handle layout, and the undo stack itself live in the host.

pub mod config;
pub mod editor;
pub mod keyframe;
pub mod selection;
pub mod sequence;
pub mod snapshot;
pub mod tangent;
pub mod tangent_mode;

pub use config::CurveEditorConfig;
pub use editor::{CurveEditor, SharedCurveEditor};
pub use keyframe::{
    BrokenMode, Curve, CurveKey, KeyModes, Keyframe, KeyframeId, Side, TangentMode, WeightedMode,
    WrapMode,
};
pub use selection::Selection;
pub use sequence::{IndexRemap, KeyframeSequence};
pub use snapshot::{Snapshot, SnapshotError, SnapshotPair};
pub use tangent_mode::{EditOutcome, EditRequest, HandleLocks, SolverSettings};
