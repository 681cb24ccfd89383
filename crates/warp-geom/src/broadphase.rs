// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Two-dimensional sweep-and-prune broadphase: tracks axis-aligned boxes and
//! reports gained/lost overlap pairs as boxes move.

use std::collections::BTreeSet;

use warp_core::Pair;

use crate::axis::Axis;

/// Tracks a set of 2D axis-aligned boxes, each identified by an opaque key,
/// and reports which pairs start or stop overlapping as boxes are inserted,
/// erased, or moved.
#[derive(Debug, Clone)]
pub struct Broadphase2D<K> {
    x: Axis<K>,
    y: Axis<K>,
}

impl<K: Copy + Eq + Ord> Default for Broadphase2D<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Ord> Broadphase2D<K> {
    /// An empty broadphase.
    pub fn new() -> Self {
        Self {
            x: Axis::new(),
            y: Axis::new(),
        }
    }

    /// Inserts a new box. Returns the pairs newly overlapping `key`.
    pub fn insert(&mut self, key: K, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Vec<Pair<K>> {
        let x_overlap = self.x.overlap_set(min_x, max_x);
        let y_overlap = self.y.overlap_set(min_y, max_y);
        self.x.insert(key, min_x, max_x);
        self.y.insert(key, min_y, max_y);
        x_overlap
            .intersection(&y_overlap)
            .map(|&other| Pair::new(key, other))
            .collect()
    }

    /// Removes `key`'s box. `old_min_x`/`old_min_y` are unused beyond
    /// asserting consistency with what this axis already recorded — the
    /// structure tracks each key's own extent, so only the key is strictly
    /// required to locate and remove it. Returns the pairs that stop
    /// overlapping.
    pub fn erase(&mut self, key: K, old_min_x: f32, old_min_y: f32) -> Vec<Pair<K>> {
        let (x_min, x_max) = self.x.extent(key);
        let (y_min, y_max) = self.y.extent(key);
        debug_assert!((x_min - old_min_x).abs() < f32::EPSILON);
        debug_assert!((y_min - old_min_y).abs() < f32::EPSILON);
        self.x.remove(key);
        self.y.remove(key);
        let x_overlap = self.x.overlap_set(x_min, x_max);
        let y_overlap = self.y.overlap_set(y_min, y_max);
        x_overlap
            .intersection(&y_overlap)
            .map(|&other| Pair::new(key, other))
            .collect()
    }

    /// Moves `key`'s box from its current extent to
    /// `[new_min, new_max)`. Returns `(gained, lost)` pairs.
    #[allow(clippy::too_many_arguments)]
    pub fn reinsert(
        &mut self,
        key: K,
        old_min_x: f32,
        old_min_y: f32,
        new_min_x: f32,
        new_min_y: f32,
        new_max_x: f32,
        new_max_y: f32,
    ) -> (Vec<Pair<K>>, Vec<Pair<K>>) {
        let (x_min, x_max) = self.x.extent(key);
        let (y_min, y_max) = self.y.extent(key);
        debug_assert!((x_min - old_min_x).abs() < f32::EPSILON);
        debug_assert!((y_min - old_min_y).abs() < f32::EPSILON);

        self.x.remove(key);
        self.y.remove(key);

        let x_before = self.x.overlap_set(x_min, x_max);
        let y_before = self.y.overlap_set(y_min, y_max);

        self.x.insert(key, new_min_x, new_max_x);
        self.y.insert(key, new_min_y, new_max_y);

        let x_after = self.x.overlap_set(new_min_x, new_max_x);
        let y_after = self.y.overlap_set(new_min_y, new_max_y);

        let mut candidates: BTreeSet<K> = BTreeSet::new();
        candidates.extend(x_before.iter().copied());
        candidates.extend(y_before.iter().copied());
        candidates.extend(x_after.iter().copied());
        candidates.extend(y_after.iter().copied());

        let mut gained = Vec::new();
        let mut lost = Vec::new();
        for other in candidates {
            let before = x_before.contains(&other) && y_before.contains(&other);
            let after = x_after.contains(&other) && y_after.contains(&other);
            if after && !before {
                gained.push(Pair::new(key, other));
            } else if before && !after {
                lost.push(Pair::new(key, other));
            }
        }
        (gained, lost)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy)]
    struct Box2D {
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
    }

    fn overlaps(a: Box2D, b: Box2D) -> bool {
        a.min_x < b.max_x && b.min_x < a.max_x && a.min_y < b.max_y && b.min_y < a.max_y
    }

    fn brute_force_pairs(boxes: &[(u32, Box2D)]) -> BTreeSet<Pair<u32>> {
        let mut pairs = BTreeSet::new();
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                if overlaps(boxes[i].1, boxes[j].1) {
                    pairs.insert(Pair::new(boxes[i].0, boxes[j].0));
                }
            }
        }
        pairs
    }

    fn arb_box() -> impl Strategy<Value = Box2D> {
        (0.0f32..20.0, 0.0f32..20.0, 0.1f32..5.0, 0.1f32..5.0).prop_map(
            |(min_x, min_y, w, h)| Box2D {
                min_x,
                min_y,
                max_x: min_x + w,
                max_y: min_y + h,
            },
        )
    }

    proptest! {
        #[test]
        fn insert_only_matches_brute_force(boxes in prop::collection::vec(arb_box(), 0..12)) {
            let mut bp: Broadphase2D<u32> = Broadphase2D::new();
            let mut outstanding: BTreeSet<Pair<u32>> = BTreeSet::new();
            let mut placed = Vec::new();
            for (i, b) in boxes.into_iter().enumerate() {
                let key = i as u32;
                let gained = bp.insert(key, b.min_x, b.min_y, b.max_x, b.max_y);
                for p in gained {
                    outstanding.insert(p);
                }
                placed.push((key, b));
                prop_assert_eq!(&outstanding, &brute_force_pairs(&placed));
            }
        }

        #[test]
        fn reinsert_deltas_match_brute_force(
            initial in prop::collection::vec(arb_box(), 1..6),
            moves in prop::collection::vec((0usize..6, arb_box()), 0..10),
        ) {
            let mut bp: Broadphase2D<u32> = Broadphase2D::new();
            let mut state: Vec<(u32, Box2D)> = Vec::new();
            let mut outstanding: BTreeSet<Pair<u32>> = BTreeSet::new();
            for (i, b) in initial.into_iter().enumerate() {
                let key = i as u32;
                let gained = bp.insert(key, b.min_x, b.min_y, b.max_x, b.max_y);
                for p in gained {
                    outstanding.insert(p);
                }
                state.push((key, b));
            }
            prop_assert_eq!(&outstanding, &brute_force_pairs(&state));

            for (idx, new_box) in moves {
                if state.is_empty() {
                    continue;
                }
                let slot = idx % state.len();
                let (key, old_box) = state[slot];
                let (gained, lost) = bp.reinsert(
                    key,
                    old_box.min_x,
                    old_box.min_y,
                    new_box.min_x,
                    new_box.min_y,
                    new_box.max_x,
                    new_box.max_y,
                );
                for p in gained {
                    outstanding.insert(p);
                }
                for p in lost {
                    outstanding.remove(&p);
                }
                state[slot].1 = new_box;
                prop_assert_eq!(&outstanding, &brute_force_pairs(&state));
            }
        }
    }
}
