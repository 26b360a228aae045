// SPDX-License-Identifier: MIT OR Apache-2.0
//! Curve editor configuration.
//!
//! Host-tunable constants used by the tangent solver and the keyframe
//! sequence. A config value is handed to [`crate::CurveEditor`] at
//! construction; there is no process-wide default instance.

use crate::keyframe::TangentMode;
use crate::snapshot::Result;
use serde::{Deserialize, Serialize};

/// Default tangent weight for newly weighted sides
pub const DEFAULT_TANGENT_WEIGHT: f32 = 1.0 / 3.0;

/// Default auto-tangent falloff
pub const DEFAULT_AUTO_FALLOFF: f32 = 1.0 / 3.0;

/// Default handle padding, as a fraction of the visible time range
pub const DEFAULT_TIME_PAD_FRACTION: f32 = 0.001;

/// Default nudge applied when two keys would share a time
pub const DEFAULT_COLLISION_EPSILON: f32 = 1e-4;

/// Curve editor settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveEditorConfig {
    /// Weight assigned to a side when weighting is (re)enabled
    pub default_weight: f32,
    /// Auto-tangent falloff in `(0, 1]`
    pub auto_falloff: f32,
    /// Handle padding around neighbor times, relative to the visible range
    pub time_pad_fraction: f32,
    /// Time nudge used to keep key times unique
    pub collision_epsilon: f32,
    /// Tangent mode given to inserted keys
    pub default_tangent_mode: TangentMode,
}

impl Default for CurveEditorConfig {
    fn default() -> Self {
        Self {
            default_weight: DEFAULT_TANGENT_WEIGHT,
            auto_falloff: DEFAULT_AUTO_FALLOFF,
            time_pad_fraction: DEFAULT_TIME_PAD_FRACTION,
            collision_epsilon: DEFAULT_COLLISION_EPSILON,
            default_tangent_mode: TangentMode::Auto,
        }
    }
}

impl CurveEditorConfig {
    /// Falloff clamped into the range the auto solver accepts
    pub fn effective_falloff(&self) -> f32 {
        if self.auto_falloff.is_nan() {
            return DEFAULT_AUTO_FALLOFF;
        }
        self.auto_falloff.clamp(f32::EPSILON, 1.0)
    }

    /// Handle padding in seconds for a visible span
    pub fn time_padding(&self, visible_span: f32) -> f32 {
        (self.time_pad_fraction * visible_span.abs()).max(0.0)
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON format; missing fields take their defaults
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CurveEditorConfig::default();
        assert!((config.default_weight - 1.0 / 3.0).abs() < 1e-6);
        assert!((config.auto_falloff - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(config.collision_epsilon, 1e-4);
        assert_eq!(config.default_tangent_mode, TangentMode::Auto);
    }

    #[test]
    fn test_falloff_clamped() {
        let mut config = CurveEditorConfig::default();
        config.auto_falloff = 0.0;
        assert!(config.effective_falloff() > 0.0);
        config.auto_falloff = 4.0;
        assert_eq!(config.effective_falloff(), 1.0);
    }

    #[test]
    fn test_ron_partial_config() {
        let config = CurveEditorConfig::from_ron("(collision_epsilon: 0.01)").unwrap();
        assert_eq!(config.collision_epsilon, 0.01);
        assert_eq!(config.default_weight, DEFAULT_TANGENT_WEIGHT);

        let text = config.to_ron().unwrap();
        assert_eq!(CurveEditorConfig::from_ron(&text).unwrap(), config);
    }
}
