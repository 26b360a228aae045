// SPDX-License-Identifier: MIT OR Apache-2.0
//! Curve editor engine.
//!
//! [`CurveEditor`] owns one curve's keyframe sequence and selection and is
//! the only way to mutate them: every operation keeps keys sorted and
//! collision-free, re-solves affected tangents, and remaps the selection
//! before it returns. Out-of-range indices are ignored rather than treated
//! as errors, since UI round trips can deliver indices one frame stale.

use crate::config::CurveEditorConfig;
use crate::keyframe::{
    BrokenMode, Curve, CurveKey, Keyframe, KeyframeId, Side, TangentMode, WrapMode,
};
use crate::selection::Selection;
use crate::sequence::{IndexRemap, KeyframeSequence};
use crate::snapshot::{Snapshot, SnapshotPair};
use crate::tangent_mode::{self, infer_modes, EditOutcome, EditRequest, HandleLocks, SolverSettings};
use parking_lot::Mutex;
use std::sync::Arc;

/// Curve editor shared between threads; calls are serialized by the lock
pub type SharedCurveEditor = Arc<Mutex<CurveEditor>>;

/// Editing engine for one curve
#[derive(Debug)]
pub struct CurveEditor {
    config: CurveEditorConfig,
    sequence: KeyframeSequence,
    selection: Selection,
    pre_wrap: WrapMode,
    post_wrap: WrapMode,
    /// Width of the visible time range, used for handle padding
    visible_span: f32,
    /// Cached capture, cleared by every mutation
    cached: Option<Arc<Snapshot>>,
    /// State captured by the first `mark_pending` of an open bracket
    pending_before: Option<Arc<Snapshot>>,
}

impl CurveEditor {
    /// Create an editor with an empty curve
    pub fn new(config: CurveEditorConfig) -> Self {
        Self {
            config,
            sequence: KeyframeSequence::new(config.collision_epsilon),
            selection: Selection::new(),
            pre_wrap: WrapMode::default(),
            post_wrap: WrapMode::default(),
            visible_span: 1.0,
            cached: None,
            pending_before: None,
        }
    }

    /// Load an external curve.
    ///
    /// Keys are sorted and colliding times nudged apart. Persisted modes are
    /// kept; keys without them get a best-effort guess. Tangent values are
    /// taken as-is.
    pub fn from_curve(curve: &Curve, config: CurveEditorConfig) -> Self {
        let mut sorted: Vec<CurveKey> = curve.keys.clone();
        sorted.sort_by(|a, b| a.time.total_cmp(&b.time));

        let keys = sorted
            .iter()
            .enumerate()
            .map(|(i, ck)| {
                let modes = ck.modes.unwrap_or_else(|| {
                    let left = i.checked_sub(1).and_then(|l| sorted.get(l));
                    infer_modes(ck, left, sorted.get(i + 1))
                });
                let mut key = Keyframe::new(ck.time, ck.value, modes.tangent_mode, 0.0);
                key.in_tangent = ck.in_tangent;
                key.out_tangent = ck.out_tangent;
                key.in_weight = ck.in_weight;
                key.out_weight = ck.out_weight;
                key.weighted = ck.weighted;
                key.set_modes(modes);
                key
            })
            .collect();

        let mut editor = Self::new(config);
        editor.sequence = KeyframeSequence::from_keys(keys, config.collision_epsilon);
        editor.pre_wrap = curve.pre_wrap;
        editor.post_wrap = curve.post_wrap;
        tracing::debug!("Loaded curve with {} keys", editor.sequence.len());
        editor
    }

    /// Export the curve with modes persisted on every key
    pub fn to_curve(&self) -> Curve {
        Curve {
            pre_wrap: self.pre_wrap,
            post_wrap: self.post_wrap,
            keys: self.sequence.keys().iter().map(CurveKey::from).collect(),
        }
    }

    /// Wrap the editor for use from several threads
    pub fn into_shared(self) -> SharedCurveEditor {
        Arc::new(Mutex::new(self))
    }

    /// Keyframes in time order
    pub fn keys(&self) -> &[Keyframe] {
        self.sequence.keys()
    }

    /// Key at an index
    pub fn key(&self, index: usize) -> Option<&Keyframe> {
        self.sequence.get(index)
    }

    /// Current slot of a key
    pub fn index_of(&self, id: KeyframeId) -> Option<usize> {
        self.sequence.index_of(id)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the curve has no keys
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Extrapolation modes as `(pre, post)`
    pub fn wrap_modes(&self) -> (WrapMode, WrapMode) {
        (self.pre_wrap, self.post_wrap)
    }

    /// Set the extrapolation modes
    pub fn set_wrap_modes(&mut self, pre: WrapMode, post: WrapMode) {
        if (pre, post) != (self.pre_wrap, self.post_wrap) {
            self.pre_wrap = pre;
            self.post_wrap = post;
            self.mark_dirty();
        }
    }

    /// Tell the engine which time range is on screen; drives handle padding
    pub fn set_visible_range(&mut self, start: f32, end: f32) {
        let span = (end - start).abs();
        if span.is_finite() && span > 0.0 {
            self.visible_span = span;
        }
    }

    fn settings(&self) -> SolverSettings {
        SolverSettings {
            default_weight: self.config.default_weight,
            falloff: self.config.effective_falloff(),
            pad: self.config.time_padding(self.visible_span),
        }
    }

    fn mark_dirty(&mut self) {
        self.cached = None;
    }

    fn apply_remap(&mut self, remap: &IndexRemap) {
        self.selection.remap(remap);
    }

    // Keyframe sequence

    /// Insert a key using the configured default tangent mode; returns its slot
    pub fn insert_key(&mut self, time: f32, value: f32) -> usize {
        let index = self.sequence.insert(
            time,
            value,
            self.config.default_tangent_mode,
            self.config.default_weight,
        );
        self.apply_remap(&IndexRemap::Inserted { index });
        let settings = self.settings();
        tangent_mode::refresh_neighborhood(&mut self.sequence, index, &settings);
        self.mark_dirty();
        if let Some(key) = self.sequence.get(index) {
            tracing::debug!("Inserted key at slot {} (t = {})", index, key.time);
        }
        index
    }

    /// Delete a key; out-of-range indices are ignored
    pub fn delete_key(&mut self, index: usize) -> Option<Keyframe> {
        let Some(removed) = self.sequence.delete(index) else {
            tracing::trace!("Ignoring delete of stale index {}", index);
            return None;
        };
        self.apply_remap(&IndexRemap::Removed { index });
        let settings = self.settings();
        if index > 0 {
            tangent_mode::refresh_neighborhood(&mut self.sequence, index - 1, &settings);
        }
        if index < self.sequence.len() {
            tangent_mode::refresh_neighborhood(&mut self.sequence, index, &settings);
        }
        self.mark_dirty();
        tracing::debug!("Deleted key at slot {}", index);
        Some(removed)
    }

    /// Delete every selected key; returns how many were removed
    pub fn delete_selected(&mut self) -> usize {
        let mut indices = self.selection.sorted();
        indices.reverse();
        indices
            .into_iter()
            .filter(|&index| self.delete_key(index).is_some())
            .count()
    }

    /// Move a key to a new time, keeping its value; returns its new slot
    pub fn retime_key(&mut self, index: usize, time: f32) -> Option<usize> {
        let value = self.sequence.get(index)?.value;
        self.edit_key(index, EditRequest::Retime { time, value }, HandleLocks::NONE)
    }

    /// Run an edit through the tangent state machine; returns the key's new slot
    pub fn edit_key(
        &mut self,
        index: usize,
        request: EditRequest,
        locks: HandleLocks,
    ) -> Option<usize> {
        let settings = self.settings();
        let Some(EditOutcome { index, remap }) =
            tangent_mode::reevaluate(&mut self.sequence, index, request, locks, &settings)
        else {
            tracing::trace!("Ignoring edit of stale index {}", index);
            return None;
        };
        if let Some(remap) = remap {
            self.apply_remap(&remap);
        }
        self.mark_dirty();
        Some(index)
    }

    /// Offset every selected key in time and value.
    ///
    /// Keys are processed in the direction of motion so selected keys do
    /// not bump into each other, and tracked by id across reorders.
    pub fn move_selected(&mut self, delta_time: f32, delta_value: f32) {
        let mut ids: Vec<KeyframeId> = self
            .selection
            .sorted()
            .into_iter()
            .filter_map(|i| self.sequence.get(i).map(|k| k.id))
            .collect();
        if delta_time > 0.0 {
            ids.reverse();
        }
        for id in ids {
            let Some(index) = self.sequence.index_of(id) else {
                continue;
            };
            let Some(key) = self.sequence.get(index) else {
                continue;
            };
            let request = EditRequest::Retime {
                time: key.time + delta_time,
                value: key.value + delta_value,
            };
            self.edit_key(index, request, HandleLocks::NONE);
        }
    }

    // Tangent modes

    /// Set a key's tangent mode
    pub fn set_tangent_mode(&mut self, index: usize, mode: TangentMode) {
        let settings = self.settings();
        if tangent_mode::set_tangent_mode(&mut self.sequence, index, mode, &settings) {
            tracing::debug!("Key {} tangent mode -> {:?}", index, mode);
            self.mark_dirty();
        }
    }

    /// Break a key and set one side's sub-mode
    pub fn set_broken_mode(&mut self, index: usize, side: Side, mode: BrokenMode) {
        let settings = self.settings();
        if tangent_mode::set_broken_mode(&mut self.sequence, index, side, mode, &settings) {
            tracing::debug!("Key {} {:?} broken mode -> {:?}", index, side, mode);
            self.mark_dirty();
        }
    }

    /// Toggle weighting on one side of a key
    pub fn set_weighted(&mut self, index: usize, side: Side, on: bool) {
        let settings = self.settings();
        if tangent_mode::set_weighted(&mut self.sequence, index, side, on, &settings) {
            self.mark_dirty();
        }
    }

    /// Set the tangent mode of every selected key
    pub fn set_tangent_mode_selected(&mut self, mode: TangentMode) {
        for index in self.selection.sorted() {
            self.set_tangent_mode(index, mode);
        }
    }

    /// Set one side's broken sub-mode on every selected key
    pub fn set_broken_mode_selected(&mut self, side: Side, mode: BrokenMode) {
        for index in self.selection.sorted() {
            self.set_broken_mode(index, side, mode);
        }
    }

    /// Toggle weighting of one side on every selected key
    pub fn set_weighted_selected(&mut self, side: Side, on: bool) {
        for index in self.selection.sorted() {
            self.set_weighted(index, side, on);
        }
    }

    // Selection

    /// Select only this key
    pub fn select_solo(&mut self, index: usize) {
        if index < self.sequence.len() {
            self.selection.select_solo(index);
            self.mark_dirty();
        }
    }

    /// Add a key to the selection
    pub fn select_add(&mut self, index: usize) {
        if index < self.sequence.len() {
            self.selection.select_add(index);
            self.mark_dirty();
        }
    }

    /// Remove a key from the selection
    pub fn deselect(&mut self, index: usize) {
        if index < self.sequence.len() {
            self.selection.deselect(index);
            self.mark_dirty();
        }
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.mark_dirty();
    }

    /// Start a box selection
    pub fn begin_box_select(&mut self, additive: bool) {
        self.selection.begin_box(additive);
        self.mark_dirty();
    }

    /// Re-test every key against the box; call once per drag frame
    pub fn update_box_select(&mut self, mut inside: impl FnMut(&Keyframe) -> bool) {
        let keys = self.sequence.keys();
        self.selection.update_box(keys.len(), |i| inside(&keys[i]));
        self.mark_dirty();
    }

    /// Merge the box into the selection
    pub fn commit_box_select(&mut self) {
        self.selection.commit_box();
        self.mark_dirty();
    }

    /// Abandon the box and restore the previous selection
    pub fn cancel_box_select(&mut self) {
        self.selection.cancel_box();
        self.mark_dirty();
    }

    // Snapshots

    /// Capture the current state; cached until the next mutation
    pub fn capture(&mut self) -> Arc<Snapshot> {
        if let Some(cached) = &self.cached {
            return cached.clone();
        }
        let snapshot = Arc::new(Snapshot {
            pre_wrap: self.pre_wrap,
            post_wrap: self.post_wrap,
            keyframes: self.sequence.keys().to_vec(),
            selected: self.selection.indices().collect(),
        });
        self.cached = Some(snapshot.clone());
        snapshot
    }

    /// Open an edit bracket; only the first call of a bracket captures
    pub fn mark_pending(&mut self) {
        if self.pending_before.is_none() {
            self.pending_before = Some(self.capture());
        }
    }

    /// Whether an edit bracket is open
    pub fn has_pending(&self) -> bool {
        self.pending_before.is_some()
    }

    /// Close the bracket and return its before/after pair.
    ///
    /// Returns `None` without an open bracket or when nothing changed.
    pub fn commit(&mut self, description: impl Into<String>) -> Option<SnapshotPair> {
        let before = self.pending_before.take()?;
        let after = self.capture();
        let pair = SnapshotPair::new(description, before, after);
        if !pair.is_change() {
            return None;
        }
        tracing::debug!("Committed edit: {}", pair.description);
        Some(pair)
    }

    /// Close the bracket by restoring the state it started from
    pub fn abort_pending(&mut self) {
        if let Some(before) = self.pending_before.take() {
            self.restore(&before);
        }
    }

    /// Replace the editing state with a snapshot without re-solving tangents.
    ///
    /// Imported snapshots may break the sort order or name keys that do not
    /// exist; keys are re-sorted and nudged apart and stale selection entries
    /// dropped. Any open edit bracket is discarded.
    pub fn restore(&mut self, snapshot: &Arc<Snapshot>) {
        self.pre_wrap = snapshot.pre_wrap;
        self.post_wrap = snapshot.post_wrap;
        self.sequence =
            KeyframeSequence::from_keys(snapshot.keyframes.clone(), self.config.collision_epsilon);
        let len = self.sequence.len();
        self.selection =
            Selection::with_indices(snapshot.selected.iter().copied().filter(|&i| i < len));
        self.pending_before = None;
        self.cached = None;
        if *self.capture() == **snapshot {
            self.cached = Some(snapshot.clone());
        } else {
            tracing::warn!("Restored snapshot was not canonical; keys or selection adjusted");
        }
        tracing::debug!("Restored snapshot with {} keys", len);
    }
}

impl Default for CurveEditor {
    fn default() -> Self {
        Self::new(CurveEditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(points: &[(f32, f32)]) -> CurveEditor {
        let mut editor = CurveEditor::default();
        for &(t, v) in points {
            editor.insert_key(t, v);
        }
        editor
    }

    #[test]
    fn test_insert_solves_auto_neighbors() {
        let mut editor = editor(&[(0.0, 0.0), (2.0, 10.0)]);
        let index = editor.insert_key(1.0, 5.0);
        assert_eq!(index, 1);
        assert!((editor.key(1).unwrap().out_tangent - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_insert_shifts_selection() {
        let mut editor = editor(&[(1.0, 0.0), (2.0, 0.0)]);
        editor.select_solo(1);
        editor.insert_key(0.0, 0.0);
        assert_eq!(editor.selection().sorted(), vec![2]);
    }

    #[test]
    fn test_stale_indices_ignored() {
        let mut editor = editor(&[(0.0, 0.0)]);
        assert!(editor.delete_key(4).is_none());
        assert!(editor.retime_key(4, 1.0).is_none());
        editor.select_solo(4);
        editor.set_tangent_mode(4, TangentMode::Flat);
        assert!(editor.selection().is_empty());
        assert_eq!(editor.len(), 1);
    }

    #[test]
    fn test_capture_cached_until_dirty() {
        let mut editor = editor(&[(0.0, 0.0)]);
        let a = editor.capture();
        let b = editor.capture();
        assert!(Arc::ptr_eq(&a, &b));
        editor.insert_key(1.0, 1.0);
        assert!(!Arc::ptr_eq(&a, &editor.capture()));
    }

    #[test]
    fn test_commit_without_change() {
        let mut editor = editor(&[(0.0, 0.0)]);
        assert!(editor.commit("nothing open").is_none());
        editor.mark_pending();
        assert!(editor.commit("no change").is_none());
        assert!(!editor.has_pending());
    }

    #[test]
    fn test_abort_pending_restores() {
        let mut editor = editor(&[(0.0, 0.0), (1.0, 1.0)]);
        let before = editor.capture();
        editor.mark_pending();
        editor.delete_key(0);
        editor.abort_pending();
        assert_eq!(*editor.capture(), *before);
    }

    #[test]
    fn test_restore_closes_bracket() {
        let mut editor = editor(&[(0.0, 0.0)]);
        let start = editor.capture();
        editor.mark_pending();
        editor.insert_key(1.0, 1.0);
        editor.restore(&start);
        assert!(!editor.has_pending());
        editor.insert_key(2.0, 2.0);
        assert!(editor.commit("after restore").is_none());
    }

    #[test]
    fn test_delete_resolves_gap_neighbors() {
        let mut editor = editor(&[(0.0, 0.0), (1.0, 5.0), (2.0, 10.0), (3.0, 0.0)]);
        assert!((editor.key(1).unwrap().out_tangent - 5.0).abs() < 1e-4);
        editor.delete_key(2);
        let auto = editor.key(1).unwrap();
        assert_eq!(auto.in_tangent, 0.0);
        assert_eq!(auto.out_tangent, 0.0);

        let mut editor = self::editor(&[(0.0, 0.0), (1.0, 1.0), (2.0, 4.0)]);
        editor.set_broken_mode(0, Side::Out, BrokenMode::Linear);
        editor.set_broken_mode(2, Side::In, BrokenMode::Linear);
        assert!((editor.key(0).unwrap().out_tangent - 1.0).abs() < 1e-4);
        assert!((editor.key(2).unwrap().in_tangent - 3.0).abs() < 1e-4);
        editor.delete_key(1);
        assert!((editor.key(0).unwrap().out_tangent - 2.0).abs() < 1e-4);
        assert!((editor.key(1).unwrap().in_tangent - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_shared_editor() {
        let shared = editor(&[(0.0, 0.0)]).into_shared();
        shared.lock().insert_key(1.0, 2.0);
        assert_eq!(shared.lock().len(), 2);
    }
}
