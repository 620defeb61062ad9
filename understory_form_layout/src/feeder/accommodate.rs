// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Making room for an interval that sticks out of its enclosing groups.

use super::Insertion;
use crate::model::IntervalId;
use crate::region::UNKNOWN;
use crate::types::{Alignment, Axis, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE};

impl Insertion<'_> {
    /// The inserted `interval` may reach past the `alignment` edge of its
    /// parallel parents. Walk up and shrink the gaps of the enclosing
    /// sequences by the overreach so the rest of the layout stays put.
    pub(super) fn accommodate_out_position(&mut self, interval: IntervalId, alignment: Alignment) {
        if !alignment.is_edge() {
            return;
        }
        let axis = self.axis;
        let pos = self.model().space(interval).pos(axis, alignment);
        if pos == UNKNOWN {
            return;
        }
        let d = alignment.sign();
        // `None` until a parallel parent has been measured.
        let mut size_increment: Option<i32> = None;
        let mut group_pos: Option<IntervalId> = None;
        let mut interval = interval;
        let Some(mut parent) = self.model().parent(interval) else {
            return;
        };
        let mut prev: Option<IntervalId> = None;
        loop {
            if self.model().is_sequential(parent) {
                if let Some(increment) = size_increment.filter(|&inc| inc > 0)
                    && let Some(lower) = prev
                {
                    let accommodated =
                        self.accommodate_size_in_sequence(interval, lower, increment, alignment);
                    size_increment = Some(increment - accommodated);
                    if let Some(group) = group_pos {
                        let space = self.model_mut().space_mut(group);
                        let p = space.pos(axis, alignment);
                        if p != UNKNOWN {
                            space.set_pos(axis, alignment, p + accommodated * d);
                        }
                    }
                }
                let model = self.model();
                if model
                    .direct_neighbor(interval, alignment, false)
                    .is_some_and(|n| !model.is_gap(n) || model.can_resize(n))
                {
                    return;
                }
                prev = Some(interval);
            } else {
                let parent_pos = self.model().space(parent).pos(axis, alignment);
                if parent_pos != UNKNOWN {
                    group_pos = Some(parent);
                    let increment = (pos - parent_pos) * d;
                    size_increment = Some(increment);
                    if increment > 0 {
                        let space = self.model_mut().space_mut(interval);
                        if !space.is_axis_set(axis) || space.pos(axis, alignment) * d < parent_pos * d
                        {
                            space.set_pos(axis, alignment, parent_pos);
                        }
                    }
                } else {
                    group_pos = None;
                }
                if !self.model().is_sequential(interval) || prev.is_none() {
                    prev = Some(interval);
                }
            }
            interval = parent;
            let model = self.model();
            let Some(next) = model.parent(interval) else {
                return;
            };
            parent = next;
            if size_increment.is_some_and(|inc| inc <= 0)
                || (model.is_parallel(parent) && model.alignment(interval) == Some(alignment))
            {
                return;
            }
        }
    }

    /// Shrink the gaps of the sequence holding `interval` on its `alignment`
    /// side by up to `size_increment`. Content of the sequence that does not
    /// overlap `lower` on the other axis is moved in parallel instead.
    /// Returns how much was accommodated.
    fn accommodate_size_in_sequence(
        &mut self,
        interval: IntervalId,
        lower: IntervalId,
        size_increment: i32,
        alignment: Alignment,
    ) -> i32 {
        let axis = self.axis;
        let model = self.model();
        let Some(parent) = model.parent(interval) else {
            return 0;
        };
        debug_assert!(model.is_sequential(parent));
        let space = *model.space(lower);
        let mut increment = size_increment;
        let mut interval = interval;
        let pos = model.space(interval).pos(axis, alignment);
        let out_pos = model
            .parent(parent)
            .map_or(pos, |p| model.space(p).pos(axis, alignment));
        let mut parallel = false;
        let d = alignment.step();
        let start = model.index_of(parent, interval).unwrap_or(0) as isize;
        let mut end: isize = if model.is_component(lower) { start } else { -1 };
        let mut n = model.child_count(parent) as isize;
        let mut i = start + d;
        while i >= 0 && i < n {
            let model = self.model();
            let li = model.child(parent, i as usize);
            if end != -1 {
                let mut end_pos = None;
                if !model.is_gap(li) {
                    if model.content_overlap_space(&space, li, None, axis.other()) {
                        if end != start {
                            end = i - d;
                            end_pos = Some(model.space(li).pos(axis, alignment.opposite()));
                        } else {
                            end = -1;
                        }
                    } else {
                        end = i;
                        if !parallel && model.content_overlap_space(&space, li, None, axis) {
                            parallel = true;
                        }
                    }
                }
                if (i == 0 || i + d == n) && end_pos.is_none() && end != -1 {
                    if end != start && (parallel || axis == Axis::Horizontal) {
                        end = i;
                        end_pos = Some(out_pos);
                    } else {
                        end = -1;
                    }
                }
                if let Some(end_pos) = end_pos {
                    self.parallelize_lower(lower, alignment, end.max(0) as usize);
                    let new_n = self.model().child_count(parent) as isize;
                    if alignment == Alignment::Trailing {
                        i -= n - new_n;
                    }
                    n = new_n;
                    end = -1;
                    if end_pos != UNKNOWN && pos != UNKNOWN {
                        increment = (increment - (end_pos - pos).abs()).max(0);
                    }
                } else if end == -1 {
                    i = start;
                }
            } else if model.is_gap(li) && model.pref_size(li) != NOT_EXPLICITLY_DEFINED {
                let pad = self.determine_padding(interval, model.padding_type(li), alignment);
                let Some(current_size) = model.known_current_size(li, axis) else {
                    break;
                };
                let mut size = current_size - increment;
                if size <= pad {
                    size = NOT_EXPLICITLY_DEFINED;
                    increment -= current_size - pad;
                } else {
                    increment = 0;
                }
                self.ops.resize_interval(li, size);
                let model = self.model();
                if model.want_resize(li) && model.want_resize(interval) {
                    let (min, pref) = (model.min_size(li), model.pref_size(li));
                    self.model_mut()
                        .set_interval_size(li, min, pref, USE_PREFERRED_SIZE);
                }
                break;
            } else {
                interval = li;
            }
            i += d;
        }
        size_increment - increment
    }

    /// Give `lower` (or the sequence holding it) a trailing gap if needed and
    /// parallelize it with its parent sequence up to `end`.
    fn parallelize_lower(&mut self, lower: IntervalId, alignment: Alignment, end: usize) {
        let axis = self.axis;
        let model = self.model();
        let Some(lower_parent) = model.parent(lower) else {
            return;
        };
        let mut to_par = if model.is_sequential(lower_parent) {
            lower_parent
        } else {
            lower
        };
        let end_gap = model.direct_neighbor(lower, alignment, false);
        debug_assert!(end_gap.is_none_or(|g| model.is_gap(g)));
        if end_gap.is_none() && !model.is_aligned_at_border(to_par, alignment) {
            let model = self.model_mut();
            let gap = model.new_default_gap();
            if !model.is_sequential(to_par) {
                let seq = model.new_sequential();
                let at = model.remove_interval(lower);
                model.add_interval(seq, lower_parent, Some(at));
                let lower_alignment = model.raw_alignment(lower);
                model.set_interval_alignment(seq, lower_alignment);
                model.set_interval_alignment(lower, None);
                model.add_interval(lower, seq, Some(0));
                to_par = seq;
            }
            let at = (alignment == Alignment::Leading).then_some(0);
            model.add_interval(gap, to_par, at);
        }
        self.ops.parallelize_with_parent_sequence(to_par, Some(end), axis);
    }
}
