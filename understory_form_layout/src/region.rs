// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cached per-axis geometry of intervals.
//!
//! A [`Region`] stores, for each [`Axis`], the pixel positions of the
//! leading edge, trailing edge, center, and (vertically) baseline of an
//! interval. Any slot may be [`UNKNOWN`]. Regions are caches recomputed from
//! the interval tree; the tree is always the source of truth.

use kurbo::Rect;

use crate::types::{Alignment, Axis, INFINITE_SIZE, Motion, NO_SIZE};

/// Sentinel for a coordinate that has not been computed.
pub const UNKNOWN: i32 = i32::MIN;

/// Absolute value of a distance, treating [`UNKNOWN`] as infinitely far.
#[inline]
pub(crate) fn abs_distance(d: i32) -> i32 {
    if d == UNKNOWN { i32::MAX } else { d.abs() }
}

/// Distance from `leading` to `trailing`, or [`UNKNOWN`] if either is unknown.
#[inline]
pub(crate) fn span(leading: i32, trailing: i32) -> i32 {
    if leading == UNKNOWN || trailing == UNKNOWN {
        UNKNOWN
    } else {
        trailing - leading
    }
}

/// Returns true if `pos` is a real coordinate (neither unknown nor a size sentinel).
#[inline]
pub fn is_valid_coordinate(pos: i32) -> bool {
    pos > NO_SIZE && pos < INFINITE_SIZE
}

/// Axis-indexed rectangle with center and baseline slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    positions: [[i32; 4]; 2],
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl Region {
    /// A region with every slot unknown.
    pub const fn new() -> Self {
        Self {
            positions: [[UNKNOWN; 4]; 2],
        }
    }

    /// Region covering `rect`, with an optional baseline offset from its top.
    pub fn from_rect(rect: Rect, baseline: Option<i32>) -> Self {
        let mut region = Self::new();
        region.set_rect(rect, baseline);
        region
    }

    /// Sets both axes from `rect`; the baseline (offset from the top) is only
    /// kept when positive.
    pub fn set_rect(&mut self, rect: Rect, baseline: Option<i32>) {
        let r = rect.round();
        let (x0, y0, x1, y1) = (px(r.x0), px(r.y0), px(r.x1), px(r.y1));
        self.set_axis(Axis::Horizontal, x0, x1);
        self.set_axis(Axis::Vertical, y0, y1);
        self.positions[1][Alignment::Baseline.index()] = match baseline {
            Some(b) if b > 0 => y0 + b,
            _ => UNKNOWN,
        };
    }

    /// Position of `point` on `axis`.
    #[inline]
    pub fn pos(&self, axis: Axis, point: Alignment) -> i32 {
        self.positions[axis.index()][point.index()]
    }

    /// Overwrites a single slot without recomputing the center.
    #[inline]
    pub fn set_pos(&mut self, axis: Axis, point: Alignment, value: i32) {
        self.positions[axis.index()][point.index()] = value;
    }

    /// Sets the edges of one axis; the center follows and the baseline is cleared.
    pub fn set_axis(&mut self, axis: Axis, leading: i32, trailing: i32) {
        let pos = &mut self.positions[axis.index()];
        pos[0] = leading;
        pos[1] = trailing;
        pos[2] = if leading != UNKNOWN && trailing != UNKNOWN {
            leading + (trailing - leading) / 2
        } else {
            UNKNOWN
        };
        pos[3] = UNKNOWN;
    }

    /// Copies every slot of `axis` from `other`.
    #[inline]
    pub fn copy_axis(&mut self, axis: Axis, other: &Self) {
        self.positions[axis.index()] = other.positions[axis.index()];
    }

    /// Forgets all positions.
    pub fn reset(&mut self) {
        self.positions = [[UNKNOWN; 4]; 2];
    }

    /// Whether both edges are known on both axes.
    pub fn is_set(&self) -> bool {
        self.is_axis_set(Axis::Horizontal) && self.is_axis_set(Axis::Vertical)
    }

    /// Whether both edges are known on `axis`.
    pub fn is_axis_set(&self, axis: Axis) -> bool {
        let pos = &self.positions[axis.index()];
        pos[0] != UNKNOWN && pos[1] != UNKNOWN
    }

    /// Extent along `axis`, or [`UNKNOWN`].
    pub fn size(&self, axis: Axis) -> i32 {
        if self.is_axis_set(axis) {
            let pos = &self.positions[axis.index()];
            pos[1] - pos[0]
        } else {
            UNKNOWN
        }
    }

    /// Grows this region on both axes to also cover `other`.
    pub fn expand(&mut self, other: &Self) {
        for axis in Axis::BOTH {
            self.expand_axis(other, axis);
        }
    }

    /// Grows this region along `axis` to also cover `other`.
    ///
    /// Unknown edges of `other` are ignored. The baseline survives only when
    /// both regions agree on it (or this region was empty).
    pub fn expand_axis(&mut self, other: &Self, axis: Axis) {
        let was_set = self.is_axis_set(axis);
        let src = other.positions[axis.index()];
        let pos = &mut self.positions[axis.index()];
        if src[0] != UNKNOWN && (pos[0] == UNKNOWN || src[0] < pos[0]) {
            pos[0] = src[0];
        }
        if src[1] != UNKNOWN && (pos[1] == UNKNOWN || src[1] > pos[1]) {
            pos[1] = src[1];
        }
        if pos[0] != UNKNOWN && pos[1] != UNKNOWN {
            pos[2] = pos[0] + (pos[1] - pos[0]) / 2;
        }
        if axis == Axis::Vertical && (!was_set || pos[3] != src[3]) {
            pos[3] = if was_set { UNKNOWN } else { src[3] };
        }
    }

    /// Shifts the points affected by `motion` on `axis` by `offset`.
    pub fn reshape(&mut self, axis: Axis, motion: Motion, offset: i32) {
        if offset == UNKNOWN {
            return;
        }
        let pos = &mut self.positions[axis.index()];
        match motion {
            Motion::Move => {
                for p in pos.iter_mut() {
                    if *p != UNKNOWN {
                        *p += offset;
                    }
                }
            }
            Motion::Resize(edge) => {
                let i = edge.index();
                if pos[i] != UNKNOWN {
                    pos[i] += offset;
                }
                if edge == Alignment::Leading && pos[3] != UNKNOWN {
                    pos[3] += offset;
                }
                if pos[0] != UNKNOWN && pos[1] != UNKNOWN {
                    pos[2] = pos[0] + (pos[1] - pos[0]) / 2;
                }
            }
            Motion::Fixed => {}
        }
    }

    /// Converts the horizontal and vertical extents into a rectangle.
    pub fn to_rect(&self) -> Rect {
        let [h, v] = self.positions;
        Rect::new(
            f64::from(h[0]),
            f64::from(v[0]),
            f64::from(h[1]),
            f64::from(v[1]),
        )
    }

    /// Signed distance from `p1` of `r1` to `p2` of `r2` (`r2[p2] - r1[p1]`),
    /// or [`UNKNOWN`] if either point is unknown.
    pub fn distance(r1: &Self, r2: &Self, axis: Axis, p1: Alignment, p2: Alignment) -> i32 {
        let a = r1.pos(axis, p1);
        let b = r2.pos(axis, p2);
        if a == UNKNOWN || b == UNKNOWN {
            UNKNOWN
        } else {
            b - a
        }
    }

    /// Signed distance between the closest edges of the two regions; negative
    /// when they overlap, [`INFINITE_SIZE`] when either region is unknown.
    pub fn min_distance(r1: &Self, r2: &Self, axis: Axis) -> i32 {
        if !r1.is_axis_set(axis) || !r2.is_axis_set(axis) {
            return INFINITE_SIZE;
        }
        let [l1, t1, ..] = r1.positions[axis.index()];
        let [l2, t2, ..] = r2.positions[axis.index()];
        (l2 - t1).max(l1 - t2)
    }

    /// Distance between the regions if they do not overlap on `axis`, otherwise 0.
    pub fn non_overlap_distance(r1: &Self, r2: &Self, axis: Axis) -> i32 {
        Self::min_distance(r1, r2, axis).max(0)
    }

    /// Whether the regions overlap on `axis`, widening `r1` by `margin`.
    pub fn overlap(r1: &Self, r2: &Self, axis: Axis, margin: i32) -> bool {
        if !r1.is_axis_set(axis) || !r2.is_axis_set(axis) {
            return false;
        }
        let [l1, t1, ..] = r1.positions[axis.index()];
        let [l2, t2, ..] = r2.positions[axis.index()];
        t1 + margin > l2 && l1 - margin < t2
    }

    /// Whether the regions overlap on both axes.
    pub fn overlap_both(r1: &Self, r2: &Self) -> bool {
        Self::overlap(r1, r2, Axis::Horizontal, 0) && Self::overlap(r1, r2, Axis::Vertical, 0)
    }

    /// Whether `point` of `space` lies within `in_space` on `axis`.
    ///
    /// A leading edge may touch the leading border and a trailing edge the
    /// trailing border; other points may touch either.
    pub fn point_inside(space: &Self, point: Alignment, in_space: &Self, axis: Axis) -> bool {
        let p = space.pos(axis, point);
        let l = in_space.pos(axis, Alignment::Leading);
        let t = in_space.pos(axis, Alignment::Trailing);
        if p == UNKNOWN || l == UNKNOWN || t == UNKNOWN {
            return false;
        }
        match point {
            Alignment::Leading => p >= l && p < t,
            Alignment::Trailing => p > l && p <= t,
            _ => p >= l && p <= t,
        }
    }

    /// Whether both regions have identical edges on `axis`.
    pub fn same_space(r1: &Self, r2: &Self, axis: Axis) -> bool {
        r1.pos(axis, Alignment::Leading) == r2.pos(axis, Alignment::Leading)
            && r1.pos(axis, Alignment::Trailing) == r2.pos(axis, Alignment::Trailing)
    }
}

#[inline]
#[allow(
    clippy::cast_possible_truncation,
    reason = "layout coordinates are small integers; the value is rounded first."
)]
pub(crate) fn px(v: f64) -> i32 {
    v as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x0: i32, y0: i32, x1: i32, y1: i32) -> Region {
        let mut r = Region::new();
        r.set_axis(Axis::Horizontal, x0, x1);
        r.set_axis(Axis::Vertical, y0, y1);
        r
    }

    #[test]
    fn from_rect_sets_center_and_baseline() {
        let r = Region::from_rect(Rect::new(10.0, 20.0, 110.0, 40.0), Some(15));
        assert_eq!(r.pos(Axis::Horizontal, Alignment::Center), 60);
        assert_eq!(r.pos(Axis::Vertical, Alignment::Baseline), 35);
        assert_eq!(r.size(Axis::Vertical), 20);
        let no_baseline = Region::from_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Some(0));
        assert_eq!(no_baseline.pos(Axis::Vertical, Alignment::Baseline), UNKNOWN);
    }

    #[test]
    fn unknown_region_has_unknown_size() {
        let r = Region::new();
        assert!(!r.is_set());
        assert_eq!(r.size(Axis::Horizontal), UNKNOWN);
        assert_eq!(
            Region::distance(&r, &region(0, 0, 1, 1), Axis::Horizontal, Alignment::Leading, Alignment::Leading),
            UNKNOWN
        );
    }

    #[test]
    fn expand_ignores_unknown() {
        let mut r = Region::new();
        r.expand(&region(10, 10, 20, 20));
        r.expand(&region(0, 15, 15, 30));
        assert_eq!(r, region(0, 10, 20, 30));
    }

    #[test]
    fn reshape_moves_or_resizes() {
        let mut r = region(0, 0, 100, 20);
        r.reshape(Axis::Horizontal, Motion::Move, 5);
        assert_eq!(r.pos(Axis::Horizontal, Alignment::Leading), 5);
        assert_eq!(r.pos(Axis::Horizontal, Alignment::Trailing), 105);
        r.reshape(Axis::Horizontal, Motion::Resize(Alignment::Trailing), -25);
        assert_eq!(r.size(Axis::Horizontal), 75);
        assert_eq!(r.pos(Axis::Horizontal, Alignment::Center), 42);
        r.reshape(Axis::Vertical, Motion::Fixed, 100);
        assert_eq!(r.pos(Axis::Vertical, Alignment::Leading), 0);
    }

    #[test]
    fn distances_and_overlap() {
        let a = region(0, 0, 100, 20);
        let b = region(108, 0, 150, 20);
        assert_eq!(
            Region::distance(&a, &b, Axis::Horizontal, Alignment::Trailing, Alignment::Leading),
            8
        );
        assert_eq!(Region::min_distance(&a, &b, Axis::Horizontal), 8);
        assert!(!Region::overlap(&a, &b, Axis::Horizontal, 0));
        assert!(Region::overlap(&a, &b, Axis::Horizontal, 9));
        assert!(Region::overlap(&a, &b, Axis::Vertical, 0));
        assert_eq!(Region::non_overlap_distance(&a, &b, Axis::Vertical), 0);
    }

    #[test]
    fn point_inside_respects_edges() {
        let outer = region(0, 0, 100, 100);
        let inner = region(0, 10, 100, 20);
        assert!(Region::point_inside(&inner, Alignment::Leading, &outer, Axis::Horizontal));
        assert!(Region::point_inside(&inner, Alignment::Trailing, &outer, Axis::Horizontal));
        let outside = region(100, 0, 120, 10);
        assert!(!Region::point_inside(&outside, Alignment::Leading, &outer, Axis::Horizontal));
        assert!(Region::same_space(&outer, &inner, Axis::Horizontal));
    }
}
