// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tangent mode state machine.
//!
//! Every edit of a key runs through [`reevaluate`]:
//!
//! 1. Mode guard: conflicting handle locks force the key to `Broken`
//! 2. Retime: apply the authored position, letting the sequence reorder
//! 3. Solve the in-tangent against the left neighbor
//! 4. Solve the out-tangent against the right neighbor
//! 5. Propagate to neighbors with linear sides or auto tangents
//! 6. Re-solve the key that slid into the vacated slot after a reorder
//!
//! Propagation is bounded to a single hop per direction.

use crate::keyframe::{BrokenMode, CurveKey, KeyModes, Keyframe, Side, TangentMode};
use crate::sequence::{IndexRemap, KeyframeSequence};
use crate::tangent::{
    auto_tangent, clamp_handle_time, free_tangent_from_handle, linear_tangent,
    weighted_free_tangent, CONSTANT_TANGENT,
};

/// Neighbor re-evaluations allowed from the edited key
const PROPAGATION_HOPS: u8 = 1;

/// Slope tolerance used when recognizing linear tangents on load
const INFER_TOLERANCE: f32 = 1e-4;

/// An edit applied to one key
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditRequest {
    /// Move the key to a new position
    Retime {
        /// New time
        time: f32,
        /// New value
        value: f32,
    },
    /// Drag the in-tangent handle
    EditInTangent {
        /// Handle position as `[time, value]`
        handle: [f32; 2],
    },
    /// Drag the out-tangent handle
    EditOutTangent {
        /// Handle position as `[time, value]`
        handle: [f32; 2],
    },
    /// Drag both handles at once
    EditBoth {
        /// In-handle position
        in_handle: [f32; 2],
        /// Out-handle position
        out_handle: [f32; 2],
    },
    /// Recompute mode-derived tangents without any drag
    Refresh,
}

impl EditRequest {
    /// Handle dragged on a side, if any
    pub fn handle(&self, side: Side) -> Option<[f32; 2]> {
        match (*self, side) {
            (Self::EditInTangent { handle }, Side::In)
            | (Self::EditOutTangent { handle }, Side::Out) => Some(handle),
            (Self::EditBoth { in_handle, .. }, Side::In) => Some(in_handle),
            (Self::EditBoth { out_handle, .. }, Side::Out) => Some(out_handle),
            _ => None,
        }
    }

    /// Whether the request drags a side's handle
    pub fn edits(&self, side: Side) -> bool {
        self.handle(side).is_some()
    }
}

/// Per-side handle locks held by the user during an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleLocks {
    /// In-handle locked
    pub in_side: bool,
    /// Out-handle locked
    pub out_side: bool,
}

impl HandleLocks {
    /// No locks
    pub const NONE: Self = Self {
        in_side: false,
        out_side: false,
    };

    /// Lock state of a side
    pub fn locked(&self, side: Side) -> bool {
        match side {
            Side::In => self.in_side,
            Side::Out => self.out_side,
        }
    }
}

/// Solver constants resolved for the current view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Weight given to a side that becomes weighted
    pub default_weight: f32,
    /// Auto-tangent falloff
    pub falloff: f32,
    /// Handle padding in seconds
    pub pad: f32,
}

/// Result of a successful re-evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    /// Slot of the edited key after the edit
    pub index: usize,
    /// Index shift caused by a retime, if the key changed slots
    pub remap: Option<IndexRemap>,
}

/// Apply an edit to the key at `index` and keep its neighbors consistent.
///
/// Returns `None` if `index` is out of range.
pub fn reevaluate(
    sequence: &mut KeyframeSequence,
    index: usize,
    request: EditRequest,
    locks: HandleLocks,
    settings: &SolverSettings,
) -> Option<EditOutcome> {
    reevaluate_inner(sequence, index, request, locks, settings, PROPAGATION_HOPS, false)
}

/// Re-solve a key whose neighbors changed and propagate one hop
pub(crate) fn refresh_neighborhood(
    sequence: &mut KeyframeSequence,
    index: usize,
    settings: &SolverSettings,
) {
    refresh(sequence, index, settings, PROPAGATION_HOPS, true);
}

fn refresh(
    sequence: &mut KeyframeSequence,
    index: usize,
    settings: &SolverSettings,
    hops: u8,
    moved: bool,
) {
    let request = EditRequest::Refresh;
    reevaluate_inner(sequence, index, request, HandleLocks::NONE, settings, hops, moved);
}

fn reevaluate_inner(
    sequence: &mut KeyframeSequence,
    index: usize,
    request: EditRequest,
    locks: HandleLocks,
    settings: &SolverSettings,
    hops: u8,
    neighborhood_changed: bool,
) -> Option<EditOutcome> {
    let key = sequence.get_mut(index)?;

    let both_locked = request.edits(Side::In)
        && locks.in_side
        && request.edits(Side::Out)
        && locks.out_side;
    let auto_half_locked = key.tangent_mode == TangentMode::Auto && locks.in_side != locks.out_side;
    if (both_locked || auto_half_locked) && key.tangent_mode != TangentMode::Broken {
        tracing::trace!("Breaking tangents of key {:?}", key.id);
        key.tangent_mode = TangentMode::Broken;
    }

    let mut index = index;
    let mut remap = None;
    let mut moved = neighborhood_changed;
    if let EditRequest::Retime { time, value } = request {
        let before = key.position();
        key.value = value;
        let new_index = sequence.retime(index, time)?;
        if new_index != index {
            tracing::trace!("Key moved from slot {} to {}", index, new_index);
            remap = Some(IndexRemap::Moved {
                from: index,
                to: new_index,
            });
        }
        index = new_index;
        moved |= sequence.get(index).map(Keyframe::position) != Some(before);
    }

    solve_side(sequence, index, Side::In, request.handle(Side::In), settings);
    solve_side(sequence, index, Side::Out, request.handle(Side::Out), settings);

    if hops > 0 {
        propagate(sequence, index, moved, settings, hops - 1);
        if let Some(IndexRemap::Moved { from, .. }) = remap {
            refresh(sequence, from, settings, hops, true);
        }
    }

    Some(EditOutcome { index, remap })
}

fn solve_side(
    sequence: &mut KeyframeSequence,
    index: usize,
    side: Side,
    handle: Option<[f32; 2]>,
    settings: &SolverSettings,
) {
    let (left, right) = sequence.neighbors(index);
    let (left, right) = (left.copied(), right.copied());
    let neighbor = match side {
        Side::In => left,
        Side::Out => right,
    };
    let Some(neighbor) = neighbor else {
        return;
    };
    let Some(key) = sequence.get_mut(index) else {
        return;
    };

    match key.tangent_mode {
        TangentMode::Broken => match key.broken_mode(side) {
            BrokenMode::Linear => {
                let slope = linear_tangent(key, &neighbor);
                key.set_side(side, slope, 0.0);
            }
            BrokenMode::Constant => key.set_tangent(side, CONSTANT_TANGENT),
            BrokenMode::Free => {
                if let Some(handle) = handle {
                    apply_free_handle(key, side, handle, &neighbor, settings);
                }
            }
        },
        TangentMode::Auto => {
            let slope = match (left, right) {
                (Some(l), Some(r)) => {
                    auto_tangent(key.value, l.time, l.value, r.time, r.value, settings.falloff)
                }
                _ => 0.0,
            };
            key.set_tangent(side, slope);
        }
        TangentMode::Smooth => {
            if let Some(handle) = handle {
                apply_free_handle(key, side, handle, &neighbor, settings);
                let slope = key.tangent(side);
                key.set_tangent(opposite(side), slope);
            }
        }
        TangentMode::Flat => {
            if let Some(handle) = handle {
                let weight = if key.weighted.has(side) {
                    let x = clamp_for_side(handle[0], key, side, &neighbor, settings.pad);
                    weighted_free_tangent([x, handle[1]], key, neighbor.time).0
                } else {
                    settings.default_weight
                };
                key.set_side(side, 0.0, weight);
            } else {
                key.set_tangent(side, 0.0);
            }
        }
    }
}

fn apply_free_handle(
    key: &mut Keyframe,
    side: Side,
    handle: [f32; 2],
    neighbor: &Keyframe,
    settings: &SolverSettings,
) {
    if key.weighted.has(side) {
        let x = clamp_for_side(handle[0], key, side, neighbor, settings.pad);
        let (weight, slope) = weighted_free_tangent([x, handle[1]], key, neighbor.time);
        key.set_side(side, slope, weight);
    } else {
        let slope = free_tangent_from_handle(handle, key.position());
        key.set_tangent(side, slope);
    }
}

fn clamp_for_side(x: f32, key: &Keyframe, side: Side, neighbor: &Keyframe, pad: f32) -> f32 {
    match side {
        Side::In => clamp_handle_time(x, neighbor.time, key.time, pad),
        Side::Out => clamp_handle_time(x, key.time, neighbor.time, pad),
    }
}

fn propagate(
    sequence: &mut KeyframeSequence,
    index: usize,
    moved: bool,
    settings: &SolverSettings,
    hops: u8,
) {
    let Some(key) = sequence.get(index).copied() else {
        return;
    };

    let neighbors = [
        (index.checked_sub(1), Side::Out),
        (Some(index + 1), Side::In),
    ];
    for (slot, adjoining) in neighbors {
        let Some(slot) = slot else {
            continue;
        };
        let Some(neighbor) = sequence.get_mut(slot) else {
            continue;
        };
        if neighbor.is_linear(adjoining) {
            let slope = linear_tangent(neighbor, &key);
            neighbor.set_side(adjoining, slope, 0.0);
        }
        if moved && neighbor.tangent_mode == TangentMode::Auto {
            refresh(sequence, slot, settings, hops, false);
        }
    }
}

/// Switch a key's tangent mode; returns `false` for an invalid index
pub fn set_tangent_mode(
    sequence: &mut KeyframeSequence,
    index: usize,
    mode: TangentMode,
    settings: &SolverSettings,
) -> bool {
    let Some(key) = sequence.get_mut(index) else {
        return false;
    };
    key.tangent_mode = mode;
    match mode {
        TangentMode::Flat => {
            key.in_tangent = 0.0;
            key.out_tangent = 0.0;
        }
        TangentMode::Smooth => {
            let slope = match (key.in_tangent.is_finite(), key.out_tangent.is_finite()) {
                (true, true) => (key.in_tangent + key.out_tangent) * 0.5,
                (true, false) => key.in_tangent,
                (false, true) => key.out_tangent,
                (false, false) => 0.0,
            };
            key.in_tangent = slope;
            key.out_tangent = slope;
        }
        TangentMode::Broken | TangentMode::Auto => {}
    }
    reevaluate(sequence, index, EditRequest::Refresh, HandleLocks::NONE, settings);
    true
}

/// Break a key and set one side's sub-mode; returns `false` for an invalid index
pub fn set_broken_mode(
    sequence: &mut KeyframeSequence,
    index: usize,
    side: Side,
    mode: BrokenMode,
    settings: &SolverSettings,
) -> bool {
    let (left, right) = sequence.neighbors(index);
    let neighbor = match side {
        Side::In => left.copied(),
        Side::Out => right.copied(),
    };
    let Some(key) = sequence.get_mut(index) else {
        return false;
    };
    key.tangent_mode = TangentMode::Broken;
    key.set_broken_mode(side, mode);
    match mode {
        BrokenMode::Constant => key.set_tangent(side, CONSTANT_TANGENT),
        BrokenMode::Free if key.tangent(side).is_infinite() => {
            let slope = neighbor.map_or(0.0, |n| linear_tangent(key, &n));
            key.set_tangent(side, slope);
        }
        BrokenMode::Free | BrokenMode::Linear => {}
    }
    reevaluate(sequence, index, EditRequest::Refresh, HandleLocks::NONE, settings);
    true
}

/// Toggle weighting on one side; returns `false` for an invalid index
pub fn set_weighted(
    sequence: &mut KeyframeSequence,
    index: usize,
    side: Side,
    on: bool,
    settings: &SolverSettings,
) -> bool {
    let Some(key) = sequence.get_mut(index) else {
        return false;
    };
    key.weighted = key.weighted.with(side, on);
    if on && key.weight(side) <= 0.0 {
        let slope = key.tangent(side);
        key.set_side(side, slope, settings.default_weight);
    }
    true
}

/// Best-effort mode guess for a key loaded without persisted modes.
///
/// Raw slopes cannot always distinguish modes: a free tangent that happens
/// to match the chord reads back as linear.
pub fn infer_modes(key: &CurveKey, left: Option<&CurveKey>, right: Option<&CurveKey>) -> KeyModes {
    let in_inf = key.in_tangent.is_infinite();
    let out_inf = key.out_tangent.is_infinite();
    if in_inf && out_inf {
        return KeyModes {
            tangent_mode: TangentMode::Broken,
            in_broken_mode: BrokenMode::Constant,
            out_broken_mode: BrokenMode::Constant,
        };
    }
    if !in_inf && key.in_tangent == key.out_tangent {
        let tangent_mode = if key.in_tangent == 0.0 {
            TangentMode::Flat
        } else {
            TangentMode::Smooth
        };
        return KeyModes {
            tangent_mode,
            ..KeyModes::default()
        };
    }
    KeyModes {
        tangent_mode: TangentMode::Broken,
        in_broken_mode: infer_side(key.in_tangent, key.in_weight, key, left),
        out_broken_mode: infer_side(key.out_tangent, key.out_weight, key, right),
    }
}

fn infer_side(slope: f32, weight: f32, key: &CurveKey, neighbor: Option<&CurveKey>) -> BrokenMode {
    if slope.is_infinite() {
        return BrokenMode::Constant;
    }
    let Some(neighbor) = neighbor else {
        return BrokenMode::Free;
    };
    let dt = neighbor.time - key.time;
    let chord = if dt == 0.0 {
        0.0
    } else {
        (neighbor.value - key.value) / dt
    };
    if weight == 0.0 && (slope - chord).abs() <= INFER_TOLERANCE {
        BrokenMode::Linear
    } else {
        BrokenMode::Free
    }
}

fn opposite(side: Side) -> Side {
    match side {
        Side::In => Side::Out,
        Side::Out => Side::In,
    }
}
