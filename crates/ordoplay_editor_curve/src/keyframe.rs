// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions for the curve editor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyframeId(pub Uuid);

impl KeyframeId {
    /// Create a new random keyframe ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

/// How a keyframe's in/out tangents relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TangentMode {
    /// In and out tangents are computed independently per side
    Broken,
    /// Computed from the neighbors to avoid overshoot
    #[default]
    Auto,
    /// Hand-authored, in and out kept equal
    Smooth,
    /// Both slopes zero
    Flat,
}

/// Per-side behavior of a broken tangent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BrokenMode {
    /// Hand-authored slope
    #[default]
    Free,
    /// Points straight at the neighbor on this side
    Linear,
    /// Step (infinite slope)
    Constant,
}

/// Which tangent sides carry a weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeightedMode {
    /// Neither side weighted
    None,
    /// Only the in-tangent
    In,
    /// Only the out-tangent
    Out,
    /// Both sides
    #[default]
    Both,
}

impl WeightedMode {
    /// Whether the in-tangent is weighted
    pub fn has_in(self) -> bool {
        matches!(self, Self::In | Self::Both)
    }

    /// Whether the out-tangent is weighted
    pub fn has_out(self) -> bool {
        matches!(self, Self::Out | Self::Both)
    }

    /// Whether the given side is weighted
    pub fn has(self, side: Side) -> bool {
        match side {
            Side::In => self.has_in(),
            Side::Out => self.has_out(),
        }
    }

    /// Build from per-side flags
    pub fn from_sides(in_side: bool, out_side: bool) -> Self {
        match (in_side, out_side) {
            (false, false) => Self::None,
            (true, false) => Self::In,
            (false, true) => Self::Out,
            (true, true) => Self::Both,
        }
    }

    /// Copy with one side switched
    pub fn with(self, side: Side, on: bool) -> Self {
        match side {
            Side::In => Self::from_sides(on, self.has_out()),
            Side::Out => Self::from_sides(self.has_in(), on),
        }
    }
}

/// Tangent side of a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Incoming segment (towards the left neighbor)
    In,
    /// Outgoing segment (towards the right neighbor)
    Out,
}

/// Extrapolation outside the keyed range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WrapMode {
    /// Hold the end value
    #[default]
    Clamp,
    /// Repeat the curve
    Loop,
    /// Repeat, alternating direction
    PingPong,
    /// Hold the end value without ever ending
    ClampForever,
    /// Play once, then reset
    Once,
}

/// Edit-time tangent metadata of a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct KeyModes {
    /// Tangent mode
    pub tangent_mode: TangentMode,
    /// In-side sub-mode, used under [`TangentMode::Broken`]
    pub in_broken_mode: BrokenMode,
    /// Out-side sub-mode, used under [`TangentMode::Broken`]
    pub out_broken_mode: BrokenMode,
}

/// A keyframe on a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Unique keyframe ID
    pub id: KeyframeId,
    /// Time in seconds
    pub time: f32,
    /// Value at this keyframe
    pub value: f32,
    /// Incoming slope; infinite for a step
    pub in_tangent: f32,
    /// Outgoing slope; infinite for a step
    pub out_tangent: f32,
    /// Incoming weight in `[0, 1]`
    pub in_weight: f32,
    /// Outgoing weight in `[0, 1]`
    pub out_weight: f32,
    /// Which sides are weighted
    pub weighted: WeightedMode,
    /// Tangent mode
    pub tangent_mode: TangentMode,
    /// In-side broken sub-mode (remembered outside Broken)
    pub in_broken_mode: BrokenMode,
    /// Out-side broken sub-mode (remembered outside Broken)
    pub out_broken_mode: BrokenMode,
}

impl Keyframe {
    /// Create a keyframe with zero slopes, both sides weighted at `weight`
    pub fn new(time: f32, value: f32, mode: TangentMode, weight: f32) -> Self {
        Self {
            id: KeyframeId::new(),
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
            in_weight: weight,
            out_weight: weight,
            weighted: WeightedMode::Both,
            tangent_mode: mode,
            in_broken_mode: BrokenMode::Free,
            out_broken_mode: BrokenMode::Free,
        }
    }

    /// Position on the curve as `[time, value]`
    pub fn position(&self) -> [f32; 2] {
        [self.time, self.value]
    }

    /// Edit-time metadata
    pub fn modes(&self) -> KeyModes {
        KeyModes {
            tangent_mode: self.tangent_mode,
            in_broken_mode: self.in_broken_mode,
            out_broken_mode: self.out_broken_mode,
        }
    }

    /// Replace the edit-time metadata
    pub fn set_modes(&mut self, modes: KeyModes) {
        self.tangent_mode = modes.tangent_mode;
        self.in_broken_mode = modes.in_broken_mode;
        self.out_broken_mode = modes.out_broken_mode;
    }

    /// Broken sub-mode of a side
    pub fn broken_mode(&self, side: Side) -> BrokenMode {
        match side {
            Side::In => self.in_broken_mode,
            Side::Out => self.out_broken_mode,
        }
    }

    /// Whether a side is effectively linear (broken + linear)
    pub fn is_linear(&self, side: Side) -> bool {
        self.tangent_mode == TangentMode::Broken && self.broken_mode(side) == BrokenMode::Linear
    }

    /// Slope of a side
    pub fn tangent(&self, side: Side) -> f32 {
        match side {
            Side::In => self.in_tangent,
            Side::Out => self.out_tangent,
        }
    }

    /// Weight of a side
    pub fn weight(&self, side: Side) -> f32 {
        match side {
            Side::In => self.in_weight,
            Side::Out => self.out_weight,
        }
    }

    pub(crate) fn set_side(&mut self, side: Side, tangent: f32, weight: f32) {
        match side {
            Side::In => {
                self.in_tangent = tangent;
                self.in_weight = weight;
            }
            Side::Out => {
                self.out_tangent = tangent;
                self.out_weight = weight;
            }
        }
    }

    pub(crate) fn set_tangent(&mut self, side: Side, tangent: f32) {
        match side {
            Side::In => self.in_tangent = tangent,
            Side::Out => self.out_tangent = tangent,
        }
    }

    pub(crate) fn set_broken_mode(&mut self, side: Side, mode: BrokenMode) {
        match side {
            Side::In => self.in_broken_mode = mode,
            Side::Out => self.out_broken_mode = mode,
        }
    }
}

/// A key in the external curve representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Time in seconds
    pub time: f32,
    /// Value
    pub value: f32,
    /// Incoming slope
    pub in_tangent: f32,
    /// Outgoing slope
    pub out_tangent: f32,
    /// Incoming weight
    pub in_weight: f32,
    /// Outgoing weight
    pub out_weight: f32,
    /// Weighted sides
    pub weighted: WeightedMode,
    /// Edit-time metadata, if it was persisted
    #[serde(default)]
    pub modes: Option<KeyModes>,
}

impl CurveKey {
    /// Unweighted key with the given slopes and no persisted modes
    pub fn new(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent,
            out_tangent,
            in_weight: 0.0,
            out_weight: 0.0,
            weighted: WeightedMode::None,
            modes: None,
        }
    }
}

impl From<&Keyframe> for CurveKey {
    fn from(key: &Keyframe) -> Self {
        Self {
            time: key.time,
            value: key.value,
            in_tangent: key.in_tangent,
            out_tangent: key.out_tangent,
            in_weight: key.in_weight,
            out_weight: key.out_weight,
            weighted: key.weighted,
            modes: Some(key.modes()),
        }
    }
}

/// A curve in the form consumed by evaluators
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    /// Extrapolation before the first key
    pub pre_wrap: WrapMode,
    /// Extrapolation after the last key
    pub post_wrap: WrapMode,
    /// Keys sorted by time
    pub keys: Vec<CurveKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_mode_sides() {
        assert!(WeightedMode::Both.has_in() && WeightedMode::Both.has_out());
        assert!(!WeightedMode::Out.has_in());
        assert_eq!(WeightedMode::None.with(Side::Out, true), WeightedMode::Out);
        assert_eq!(WeightedMode::Both.with(Side::In, false), WeightedMode::Out);
        assert_eq!(WeightedMode::In.with(Side::In, false), WeightedMode::None);
    }

    #[test]
    fn test_linear_only_under_broken() {
        let mut key = Keyframe::new(0.0, 0.0, TangentMode::Auto, 1.0 / 3.0);
        key.out_broken_mode = BrokenMode::Linear;
        assert!(!key.is_linear(Side::Out));
        key.tangent_mode = TangentMode::Broken;
        assert!(key.is_linear(Side::Out));
        assert!(!key.is_linear(Side::In));
    }

    #[test]
    fn test_curve_key_carries_modes() {
        let mut key = Keyframe::new(1.0, 2.0, TangentMode::Broken, 0.5);
        key.in_broken_mode = BrokenMode::Constant;
        let curve_key = CurveKey::from(&key);
        assert_eq!(curve_key.modes, Some(key.modes()));
        assert_eq!(curve_key.weighted, WeightedMode::Both);
    }
}
