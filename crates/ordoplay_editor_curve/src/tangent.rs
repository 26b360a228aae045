// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tangent solver.
//!
//! Stateless slope/weight computations shared by every tangent mode.
//! Every division is guarded: degenerate geometry (coincident times, a
//! vertical handle, a zero-width value range) yields a slope of `0.0`,
//! never `NaN` or an unintended infinity.

use crate::keyframe::Keyframe;

/// Slope of a constant (step) tangent
pub const CONSTANT_TANGENT: f32 = f32::INFINITY;

/// Clamp into `[0, 1]`, mapping `NaN` to `0`
#[inline]
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Slope of the straight line from `key` to `neighbor`
pub fn linear_tangent(key: &Keyframe, neighbor: &Keyframe) -> f32 {
    let dt = neighbor.time - key.time;
    if dt == 0.0 {
        return 0.0;
    }
    finite_or_zero((neighbor.value - key.value) / dt)
}

/// Slope of the direction from the key to a handle
pub fn free_tangent_from_handle(handle: [f32; 2], key_pos: [f32; 2]) -> f32 {
    let dx = handle[0] - key_pos[0];
    let dy = handle[1] - key_pos[1];
    if dx == 0.0 {
        return 0.0;
    }
    finite_or_zero(dy / dx)
}

/// Weight and slope of a weighted handle, as `(weight, slope)`.
///
/// The weight is the handle's share of the time gap towards the neighbor,
/// clamped into `[0, 1]`. Works for either side: for an in-tangent the
/// neighbor time lies to the left and both offsets are negative.
pub fn weighted_free_tangent(handle: [f32; 2], key: &Keyframe, neighbor_time: f32) -> (f32, f32) {
    let span = neighbor_time - key.time;
    if span == 0.0 {
        return (0.0, 0.0);
    }
    let weight = clamp01((handle[0] - key.time) / span);
    if weight == 0.0 {
        return (weight, 0.0);
    }
    let slope = (handle[1] - key.value) / (span * weight);
    (weight, finite_or_zero(slope))
}

/// Anti-overshoot auto tangent.
///
/// Starts from the chord slope between the two neighbors and scales it down
/// as `value` approaches either neighbor's value. A key at the midpoint of
/// the neighbors' value range keeps the full chord; a key flush with or
/// beyond a neighbor's value gets a flat tangent. `falloff` in `(0, 1]`
/// sets how much of the range, measured from the edges, is attenuated.
pub fn auto_tangent(
    value: f32,
    left_time: f32,
    left_value: f32,
    right_time: f32,
    right_value: f32,
    falloff: f32,
) -> f32 {
    let dt = right_time - left_time;
    let dv = right_value - left_value;
    if dt == 0.0 || dv == 0.0 {
        return 0.0;
    }
    let chord = dv / dt;

    let normalized = (value - left_value) / dv;
    let dist = clamp01((normalized - 0.5).abs() / 0.5);
    if dist >= 1.0 {
        return 0.0;
    }

    let falloff = if falloff > 0.0 { falloff.min(1.0) } else { f32::EPSILON };
    let mul = clamp01(1.0 - (dist - (1.0 - falloff)).max(0.0) / falloff);

    finite_or_zero(chord * mul)
}

/// Clamp a handle time strictly inside `(lo + pad, hi - pad)`.
///
/// Falls back to the midpoint when the padded interval is empty.
pub fn clamp_handle_time(x: f32, lo: f32, hi: f32, pad: f32) -> f32 {
    let min = lo + pad;
    let max = hi - pad;
    if min < max {
        x.clamp(min, max)
    } else {
        (lo + hi) * 0.5
    }
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::TangentMode;

    fn key(time: f32, value: f32) -> Keyframe {
        Keyframe::new(time, value, TangentMode::Broken, 1.0 / 3.0)
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_linear_tangent() {
        assert!(approx(linear_tangent(&key(0.0, 0.0), &key(1.0, 10.0)), 10.0));
        assert!(approx(linear_tangent(&key(1.0, 10.0), &key(0.0, 0.0)), 10.0));
        assert_eq!(linear_tangent(&key(1.0, 0.0), &key(1.0, 5.0)), 0.0);
    }

    #[test]
    fn test_free_tangent_vertical_handle() {
        assert!(approx(free_tangent_from_handle([2.0, 3.0], [1.0, 1.0]), 2.0));
        assert_eq!(free_tangent_from_handle([1.0, 3.0], [1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_weighted_free_tangent_out_side() {
        let k = key(0.0, 0.0);
        let (weight, slope) = weighted_free_tangent([0.5, 1.0], &k, 1.0);
        assert!(approx(weight, 0.5));
        assert!(approx(slope, 2.0));
    }

    #[test]
    fn test_weighted_free_tangent_in_side() {
        let k = key(1.0, 0.0);
        let (weight, slope) = weighted_free_tangent([0.75, -1.0], &k, 0.0);
        assert!(approx(weight, 0.25));
        assert!(approx(slope, 4.0));
    }

    #[test]
    fn test_weighted_free_tangent_degenerate() {
        let k = key(1.0, 0.0);
        assert_eq!(weighted_free_tangent([2.0, 5.0], &k, 1.0), (0.0, 0.0));
        // handle on the wrong side of the key collapses to zero weight
        let (weight, slope) = weighted_free_tangent([0.5, 5.0], &k, 2.0);
        assert_eq!(weight, 0.0);
        assert_eq!(slope, 0.0);
    }

    #[test]
    fn test_auto_tangent_midpoint() {
        let slope = auto_tangent(5.0, 0.0, 0.0, 2.0, 10.0, 1.0 / 3.0);
        assert!(approx(slope, 5.0));
    }

    #[test]
    fn test_auto_tangent_flush_and_beyond() {
        assert_eq!(auto_tangent(0.0, 0.0, 0.0, 2.0, 10.0, 1.0 / 3.0), 0.0);
        assert_eq!(auto_tangent(10.0, 0.0, 0.0, 2.0, 10.0, 1.0 / 3.0), 0.0);
        assert_eq!(auto_tangent(12.0, 0.0, 0.0, 2.0, 10.0, 1.0 / 3.0), 0.0);
        assert_eq!(auto_tangent(-3.0, 0.0, 0.0, 2.0, 10.0, 1.0 / 3.0), 0.0);
    }

    #[test]
    fn test_auto_tangent_falloff_band() {
        // normalized 0.9 -> dist 0.8, inside the outer third
        let slope = auto_tangent(9.0, 0.0, 0.0, 2.0, 10.0, 1.0 / 3.0);
        let mul = 1.0 - (0.8 - 2.0 / 3.0) / (1.0 / 3.0);
        assert!(approx(slope, 5.0 * mul));
        // normalized 0.7 -> dist 0.4, untouched
        assert!(approx(auto_tangent(7.0, 0.0, 0.0, 2.0, 10.0, 1.0 / 3.0), 5.0));
    }

    #[test]
    fn test_auto_tangent_descending() {
        let slope = auto_tangent(5.0, 0.0, 10.0, 2.0, 0.0, 1.0 / 3.0);
        assert!(approx(slope, -5.0));
    }

    #[test]
    fn test_auto_tangent_degenerate() {
        assert_eq!(auto_tangent(1.0, 1.0, 0.0, 1.0, 5.0, 0.5), 0.0);
        assert_eq!(auto_tangent(1.0, 0.0, 3.0, 1.0, 3.0, 0.5), 0.0);
        assert!(auto_tangent(5.0, 0.0, 0.0, 2.0, 10.0, 0.0).is_finite());
    }

    #[test]
    fn test_clamp_handle_time() {
        assert_eq!(clamp_handle_time(-1.0, 0.0, 1.0, 0.01), 0.01);
        assert_eq!(clamp_handle_time(0.5, 0.0, 1.0, 0.01), 0.5);
        assert_eq!(clamp_handle_time(0.5, 0.0, 1.0, 0.6), 0.5);
    }
}
