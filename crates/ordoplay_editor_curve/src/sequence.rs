// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered keyframe storage for one curve.
//!
//! Keys are kept strictly ascending by time. Time collisions are resolved
//! by nudging the incoming time forward, so tangent formulas never divide
//! by a zero time gap. The sequence also owns the id -> slot table that UI
//! layers use to map their handles back to keys.

use crate::keyframe::{Keyframe, KeyframeId, TangentMode};
use indexmap::{IndexMap, IndexSet};

/// How indices shifted after a sequence mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRemap {
    /// A key was inserted; later indices moved up by one
    Inserted {
        /// Slot of the new key
        index: usize,
    },
    /// A key moved and the keys in between rotated by one slot
    Moved {
        /// Old slot of the moved key
        from: usize,
        /// New slot of the moved key
        to: usize,
    },
    /// A key was removed; later indices moved down by one
    Removed {
        /// Slot of the removed key
        index: usize,
    },
}

impl IndexRemap {
    /// Map an index from before the mutation to after it.
    ///
    /// Returns `None` for the removed key.
    pub fn map(&self, old: usize) -> Option<usize> {
        match *self {
            Self::Inserted { index } => Some(if old >= index { old + 1 } else { old }),
            Self::Removed { index } => match old.cmp(&index) {
                std::cmp::Ordering::Less => Some(old),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(old - 1),
            },
            Self::Moved { from, to } => Some(if old == from {
                to
            } else if from < to && old > from && old <= to {
                old - 1
            } else if to < from && old >= to && old < from {
                old + 1
            } else {
                old
            }),
        }
    }
}

/// Keyframes of one curve, sorted by time
#[derive(Debug, Clone, Default)]
pub struct KeyframeSequence {
    keys: Vec<Keyframe>,
    slots: IndexMap<KeyframeId, usize>,
    epsilon: f32,
}

impl KeyframeSequence {
    /// Create an empty sequence using `epsilon` to separate colliding times
    pub fn new(epsilon: f32) -> Self {
        Self {
            keys: Vec::new(),
            slots: IndexMap::new(),
            epsilon,
        }
    }

    /// Build from arbitrary keys: sorts them, nudges duplicate times apart,
    /// and gives repeated ids fresh ones
    pub fn from_keys(mut keys: Vec<Keyframe>, epsilon: f32) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        for i in 1..keys.len() {
            let prev = keys[i - 1].time;
            if keys[i].time <= prev {
                keys[i].time = nudge(prev, epsilon);
            }
        }
        let mut seen = IndexSet::with_capacity(keys.len());
        for key in &mut keys {
            if !seen.insert(key.id) {
                key.id = KeyframeId::new();
            }
        }
        let mut sequence = Self {
            keys,
            slots: IndexMap::new(),
            epsilon,
        };
        sequence.refresh_slots();
        sequence
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there are no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// All keys in time order
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Key at an index
    pub fn get(&self, index: usize) -> Option<&Keyframe> {
        self.keys.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Keyframe> {
        self.keys.get_mut(index)
    }

    /// Current slot of a key
    pub fn index_of(&self, id: KeyframeId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// Adjacent keys in time order
    pub fn neighbors(&self, index: usize) -> (Option<&Keyframe>, Option<&Keyframe>) {
        if index >= self.keys.len() {
            return (None, None);
        }
        let left = index.checked_sub(1).and_then(|i| self.keys.get(i));
        (left, self.keys.get(index + 1))
    }

    /// Push `time` forward until no key other than `ignore` occupies it
    pub fn resolve_collision(&self, mut time: f32, ignore: Option<usize>) -> f32 {
        if !time.is_finite() {
            return time;
        }
        // Each nudge moves strictly forward, so every key can collide at most once.
        while self
            .keys
            .iter()
            .enumerate()
            .any(|(i, k)| Some(i) != ignore && k.time == time)
        {
            time = nudge(time, self.epsilon);
        }
        time
    }

    /// Insert a key with default tangent data; returns its slot
    pub fn insert(&mut self, time: f32, value: f32, mode: TangentMode, weight: f32) -> usize {
        self.insert_key(Keyframe::new(time, value, mode, weight))
    }

    /// Insert a prepared key, resolving its time first; returns its slot
    pub fn insert_key(&mut self, mut key: Keyframe) -> usize {
        let requested = key.time;
        key.time = self.resolve_collision(key.time, None);
        if key.time != requested {
            tracing::trace!("Nudged inserted key from {} to {}", requested, key.time);
        }
        let index = self.keys.partition_point(|k| k.time < key.time);
        self.keys.insert(index, key);
        self.refresh_slots();
        index
    }

    /// Move a key to a new time; returns its resulting slot.
    ///
    /// Keys between the old and new slots rotate by one instead of
    /// re-sorting the whole sequence. Returns `None` for an invalid index.
    pub fn retime(&mut self, index: usize, new_time: f32) -> Option<usize> {
        if index >= self.keys.len() {
            return None;
        }
        let time = self.resolve_collision(new_time, Some(index));
        self.keys[index].time = time;

        let mut target = index;
        while target + 1 < self.keys.len() && self.keys[target + 1].time < time {
            target += 1;
        }
        while target > 0 && self.keys[target - 1].time > time {
            target -= 1;
        }

        if target > index {
            self.keys[index..=target].rotate_left(1);
            self.refresh_range(index, target);
        } else if target < index {
            self.keys[target..=index].rotate_right(1);
            self.refresh_range(target, index);
        }
        Some(target)
    }

    /// Remove a key; `None` for an invalid index
    pub fn delete(&mut self, index: usize) -> Option<Keyframe> {
        if index >= self.keys.len() {
            return None;
        }
        let key = self.keys.remove(index);
        self.refresh_slots();
        Some(key)
    }

    fn refresh_range(&mut self, from: usize, to: usize) {
        for i in from..=to {
            self.slots.insert(self.keys[i].id, i);
        }
    }

    fn refresh_slots(&mut self) {
        self.slots.clear();
        for (i, key) in self.keys.iter().enumerate() {
            self.slots.insert(key.id, i);
        }
    }
}

/// Advance a time by `epsilon`, or by one ulp where `epsilon` is lost to rounding
fn nudge(time: f32, epsilon: f32) -> f32 {
    let next = time + epsilon.abs();
    if next > time {
        return next;
    }
    if time == 0.0 {
        return f32::from_bits(1);
    }
    let bits = time.to_bits();
    if time > 0.0 {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}
