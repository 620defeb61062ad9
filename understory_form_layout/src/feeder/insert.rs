// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placing the adding interval at the chosen inclusion.

use alloc::vec::Vec;

use kurbo::Size;

use super::analyze::{add_direction, can_subst_align_with_parent, flipped_edge};
use super::{IncId, Insertion};
use crate::model::{GroupKind, IntervalId, LayoutModel};
use crate::ops::RemainderList;
use crate::region::{Region, UNKNOWN};
use crate::types::{
    Alignment, Attributes, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, PaddingType,
    USE_PREFERRED_SIZE,
};
use crate::utils::size_of_default_gap;

/// Position the layout is perceived to end at, used to decide which side
/// of a centered component is closer.
const NO_POSITION: i32 = i32::MIN;

/// Whether the `alignment` edge of the parallel group holding `interval`
/// is determined by `interval` or fixed by the group itself.
fn is_significant_group_edge(model: &LayoutModel, interval: IntervalId, alignment: Alignment) -> bool {
    let Some(group) = model.parent(interval) else {
        return false;
    };
    debug_assert!(model.is_parallel(group));
    if model.alignment(interval) == Some(alignment) || model.want_resize(interval) {
        return true;
    }
    if !model.is_closed_group(group, alignment) {
        return false;
    }
    if !model.is_explicitly_closed_group(group)
        && model
            .neighbor(group, alignment, false, true, true)
            .is_some_and(|g| model.is_default_padding(g))
    {
        return false;
    }
    true
}

/// The `alignment` edge of the content of `neighbor` that faces `space`.
fn perceived_neighbor_position(
    model: &LayoutModel,
    neighbor: IntervalId,
    space: &Region,
    axis: Axis,
    alignment: Alignment,
) -> i32 {
    debug_assert!(!model.is_gap(neighbor));
    if model.is_component(neighbor) {
        return model.space(neighbor).pos(axis, alignment);
    }
    let children = model.children(neighbor);
    let reversed = !model.is_parallel(neighbor) && alignment != Alignment::Leading;
    let mut best = NO_POSITION;
    let ordered: Vec<IntervalId> = if reversed {
        children.iter().rev().copied().collect()
    } else {
        children.to_vec()
    };
    for sub in ordered {
        if model.is_gap(sub)
            || (model.is_component(sub)
                && !Region::overlap(space, model.space(sub), axis.other(), 0))
        {
            continue;
        }
        let pos = perceived_neighbor_position(model, sub, space, axis, alignment);
        if pos == NO_POSITION {
            continue;
        }
        if model.is_sequential(neighbor) {
            return pos;
        }
        let d = if reversed { -1 } else { 1 };
        if best == NO_POSITION || pos * d < best * d {
            best = pos;
        }
    }
    best
}

/// Where the enclosing layout visually ends at `alignment` for an interval
/// placed as `interval` into `parent`.
fn perceived_parent_position(
    model: &LayoutModel,
    interval: IntervalId,
    parent: IntervalId,
    space: &Region,
    axis: Axis,
    alignment: Alignment,
) -> i32 {
    let (mut interval, mut parent) = (interval, parent);
    loop {
        if model.is_sequential(parent) {
            interval = parent;
            let Some(p) = model.parent(interval) else {
                return model.space(interval).pos(axis, alignment);
            };
            parent = p;
        }
        let mut neighbor = None;
        while neighbor.is_none() && model.parent(parent).is_some() {
            let significant = if model.parent(interval).is_some() {
                is_significant_group_edge(model, interval, alignment)
            } else {
                model.is_closed_group(parent, alignment)
            };
            if significant {
                break;
            }
            neighbor = model.direct_neighbor(parent, alignment, true);
            if neighbor.is_none() {
                interval = parent;
                let Some(p) = model.parent(interval) else {
                    break;
                };
                parent = p;
                if model.is_sequential(parent) {
                    interval = parent;
                    let Some(p) = model.parent(interval) else {
                        break;
                    };
                    parent = p;
                }
            }
        }
        let Some(mut n) = neighbor else {
            return model.space(parent).pos(axis, alignment);
        };
        loop {
            let pos = perceived_neighbor_position(model, n, space, axis, alignment.opposite());
            if pos != NO_POSITION {
                return pos;
            }
            match model.direct_neighbor(n, alignment, true) {
                Some(next) => n = next,
                None => break,
            }
        }
        interval = parent;
        match model.parent(interval) {
            Some(p) => parent = p,
            None => return model.space(interval).pos(axis, alignment),
        }
    }
}

/// The only non-gap interval of a sequence, or `interval` itself if it is
/// not a sequence.
fn one_non_empty(model: &LayoutModel, interval: IntervalId) -> Option<IntervalId> {
    if !model.is_sequential(interval) {
        return Some(interval);
    }
    let mut non_empty = None;
    for &li in model.children(interval) {
        if !model.is_gap(li) {
            if non_empty.is_some() {
                return None;
            }
            non_empty = Some(li);
        }
    }
    non_empty
}

impl Insertion<'_> {
    /// Add the interval center or baseline aligned with the snapped
    /// interval, creating a group with that alignment if needed.
    pub(super) fn add_simply_aligned(&mut self) {
        let Some(alignment) = self.a_edge else {
            return;
        };
        debug_assert!(matches!(alignment, Alignment::Center | Alignment::Baseline));
        let adding = self.adding_interval;
        self.model_mut()
            .set_interval_alignment(adding, Some(alignment));
        if self.model().parent(adding).is_some() {
            return;
        }
        let Some(snapped) = self.a_snapped_parallel else {
            debug_assert!(false, "simple alignment without a target");
            return;
        };
        let model = self.model();
        if model.is_parallel(snapped) && model.group_alignment(snapped) == alignment {
            self.model_mut().add_interval(adding, snapped, None);
            return;
        }
        let Some(parent) = model.parent(snapped) else {
            if model.is_parallel(snapped) {
                self.model_mut().add_interval(adding, snapped, None);
            }
            return;
        };
        if model.is_parallel(parent) && model.group_alignment(parent) == alignment {
            self.model_mut().add_interval(adding, parent, None);
            return;
        }
        let parent_is_parallel = model.is_parallel(parent);
        let model = self.model_mut();
        let align_index = model.remove_interval(snapped);
        let sub_group = model.new_parallel(alignment);
        if parent_is_parallel {
            let snapped_alignment = model.raw_alignment(snapped);
            model.set_interval_alignment(sub_group, snapped_alignment);
        }
        model.set_interval_alignment(snapped, Some(alignment));
        model.add_interval(snapped, sub_group, None);
        model.add_interval(adding, sub_group, None);
        model.add_interval(sub_group, parent, Some(align_index));
    }

    /// Insert according to `inc1` (and the opposite-edge `inc2`), then align
    /// and tidy up around the new interval.
    pub(super) fn add_interval(&mut self, inc1: IncId, inc2: Option<IncId>) {
        let axis = self.axis;
        let adding = self.adding_interval;
        self.add_to_group(inc1, inc2, true);

        if let Some(i2) = inc2
            && let Some(snapped) = self.inc(i2).snapped_parallel
            && let Some(edge) = self.inc(i2).alignment.filter(|a| a.is_edge())
        {
            self.align_in_parallel(adding, snapped, edge);
        }
        if let Some(snapped) = self.inc(inc1).snapped_parallel
            && let Some(edge) = self.inc(inc1).alignment.filter(|a| a.is_edge())
        {
            self.align_in_parallel(adding, snapped, edge);
        }
        self.check_parallel_resizing(adding, inc1, inc2);

        let model = self.model();
        let Some(parent) = model.parent(adding) else {
            return;
        };
        let accommodate = if model.is_sequential(parent) {
            let try_align = if model.alignment(parent) != Some(Alignment::Trailing) {
                Alignment::Trailing
            } else {
                Alignment::Leading
            };
            if model.direct_neighbor(adding, try_align, true).is_none() {
                Some(try_align)
            } else if model
                .direct_neighbor(adding, try_align.opposite(), true)
                .is_none()
            {
                Some(try_align.opposite())
            } else {
                None
            }
        } else {
            flipped_edge(model.alignment(adding))
        };
        if let Some(alignment) = accommodate {
            self.accommodate_out_position(adding, alignment);
        }
        if self.dragger.is_resizing_axis(axis) && self.model().want_resize(adding) {
            self.ops.suppress_resizing_of_surrounding_gaps(adding);
        }
        if let Some(group) = self.model().first_parent(adding, GroupKind::Parallel) {
            self.ops.optimize_gaps(group, axis);
        }
        if let Some(parent) = self.model().parent(adding)
            && self.model().is_sequential(parent)
            && self.model().count(parent, None, true) > 1
            && axis == Axis::Horizontal
        {
            self.ops.move_inside_sequential(parent, axis);
        }
        if let Some(group) = self.model().first_parent(adding, GroupKind::Parallel) {
            self.ops.merge_parallel_groups(group);
        }
    }

    /// Put the adding interval into the inclusion's group: into the sequence
    /// at its index, into a new sequence with its neighbor, or alone. Gaps
    /// on both sides keep it at its dragged position.
    ///
    /// With `definite` unset the tree is not restructured beyond the group.
    pub(super) fn add_to_group(&mut self, inc1: IncId, inc2: Option<IncId>, definite: bool) {
        let axis = self.axis;
        let adding = self.adding_interval;
        let space = self.adding_space;
        let d1 = self.inc(inc1).clone();
        debug_assert!(inc2.is_none_or(|i2| {
            let d2 = self.inc(i2);
            d1.parent == d2.parent && d1.new_sub_group == d2.new_sub_group && d1.neighbor == d2.neighbor
        }));

        let mut parent = d1.parent;
        let mut seq = None;
        let mut index = 0;
        if self.model().is_sequential(parent) {
            if d1.new_sub_group
                && let Some(sub_group) =
                    self.extract_parallel_sequence(parent, &space, false, d1.alignment)
            {
                seq = Some(self.model_mut().new_sequential());
                parent = sub_group;
            }
            if seq.is_none() {
                seq = Some(parent);
                parent = self.model().parent(parent).unwrap_or(parent);
                index = d1.index;
            }
        } else if let Some(neighbor) = d1.neighbor {
            debug_assert_eq!(self.model().parent(neighbor), Some(parent));
            let model = self.model_mut();
            let s = model.new_sequential();
            let at = model.remove_interval(neighbor);
            model.add_interval(s, parent, Some(at));
            let neighbor_alignment = model.raw_alignment(neighbor);
            model.set_interval_alignment(s, neighbor_alignment);
            model.set_interval_alignment(neighbor, None);
            model.add_interval(neighbor, s, Some(0));
            seq = Some(s);
            index = d1.index;
        } else {
            let s = self.model_mut().new_sequential();
            self.model_mut().set_interval_alignment(s, d1.alignment);
            seq = Some(s);
        }
        let Some(seq) = seq else {
            return;
        };
        debug_assert!(self.model().is_parallel(parent));

        let mut neighbors: [Option<IntervalId>; 2] = [None; 2];
        let mut gaps: [Option<IntervalId>; 2] = [None; 2];
        let mut original_gap = None;
        let mut center_dst = [0_i32; 2];
        let count = self.model().child_count(seq);
        let index = index.min(count);
        for edge in Alignment::EDGES {
            let i = edge.index();
            let (idx1, idx2) = match edge {
                Alignment::Leading => (index.checked_sub(1), index.checked_sub(2)),
                _ => (Some(index), Some(index + 1)),
            };
            let model = self.model();
            if let Some(idx1) = idx1.filter(|&x| x < count) {
                let li = model.child(seq, idx1);
                if model.is_gap(li) {
                    original_gap = Some(li);
                    if let Some(idx2) = idx2.filter(|&x| x < count) {
                        neighbors[i] = Some(model.child(seq, idx2));
                    }
                } else {
                    neighbors[i] = Some(li);
                }
            }
            if d1.alignment.is_none() {
                let perceived = match neighbors[i] {
                    Some(n) => perceived_neighbor_position(model, n, &space, axis, edge.opposite()),
                    None => perceived_parent_position(model, seq, parent, &space, axis, edge),
                };
                let dst = space.pos(axis, Alignment::Center).saturating_sub(perceived);
                center_dst[i] = if edge == Alignment::Trailing {
                    dst.saturating_neg()
                } else {
                    dst
                };
            }
        }

        let mut edges = 2;
        let mut edge = Alignment::Leading;
        while edges > 0 {
            'edge: {
                let i = edge.index();
                gaps[i] = None;
                let model = self.model();
                let outer_neighbor = if neighbors[i].is_none() {
                    model.neighbor(parent, edge, false, true, false)
                } else {
                    None
                };
                let ii = if d1.alignment.is_none() || d1.alignment == Some(edge) {
                    Some(inc1)
                } else {
                    inc2
                };
                let other = if ii == Some(inc1) { inc2 } else { Some(inc1) };
                if neighbors[i].is_none()
                    && let Some(ii) = ii
                {
                    let ii = self.inc(ii);
                    if ii.snapped_next_to.is_some()
                        && outer_neighbor.is_some_and(|n| model.is_default_padding(n))
                    {
                        break 'edge;
                    }
                    if ii
                        .snapped_parallel
                        .is_some_and(|sp| !model.is_parent_of(seq, sp) || original_gap.is_none())
                    {
                        break 'edge;
                    }
                }

                let aligned = if d1.alignment.is_none() {
                    let opposite = edge.opposite().index();
                    center_dst[i] < center_dst[opposite]
                        || (center_dst[i] == center_dst[opposite] && edge == Alignment::Leading)
                } else if inc2.is_some() {
                    ii.is_some_and(|ii| self.inc(ii).fixed_position)
                        || (edge == Alignment::Leading && self.original_l_fixed)
                        || (edge == Alignment::Trailing && self.original_t_fixed)
                } else if self
                    .inc(inc1)
                    .snapped_parallel
                    .is_none_or(|sp| !model.is_parent_of(seq, sp))
                {
                    d1.alignment == Some(edge)
                } else {
                    flipped_edge(d1.alignment) == Some(edge)
                };

                let mut minor_gap = false;
                if !aligned && neighbors[i].is_none() && original_gap.is_none() {
                    let parallel = other.and_then(|o| self.inc(o).snapped_parallel);
                    if parallel.is_none()
                        && model.child_count(seq) == 0
                        && model.alignment(seq) != Some(edge.opposite())
                    {
                        self.model_mut()
                            .set_interval_alignment(seq, Some(edge.opposite()));
                    }
                    let model = self.model();
                    if outer_neighbor.is_some_and(|n| model.is_gap(n)) {
                        break 'edge;
                    }
                    minor_gap = parallel.is_some_and(|p| model.parent(p).is_some())
                        || (model.parent(parent).is_some()
                            && model.count(parent, Some(edge.opposite()), true) > 0);
                }

                let model = self.model();
                let mut fixed_gap = aligned;
                if !fixed_gap {
                    let neighbor_aligned = neighbors[i].is_some_and(|n| {
                        model.effective_alignment_at(n, edge.opposite()) == Some(edge.opposite())
                    });
                    if minor_gap || model.want_resize(adding) {
                        fixed_gap = true;
                    } else if let Some(og) = original_gap {
                        if !model.can_resize(og)
                            && (other.is_none_or(|o| self.inc(o).snapped_parallel.is_none())
                                || neighbors[i].is_none()
                                || neighbor_aligned)
                        {
                            fixed_gap = true;
                        }
                    } else if neighbor_aligned || model.want_resize(seq) {
                        fixed_gap = true;
                    }
                }

                let (mut min, mut pref, mut max) =
                    (NOT_EXPLICITLY_DEFINED, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE);
                let mut padding_type = None;
                if !minor_gap {
                    let ii_inc = ii.map(|ii| self.inc(ii).clone());
                    if ii_inc.as_ref().is_none_or(|d| d.snapped_next_to.is_none()) {
                        let target = match ii_inc.as_ref().and_then(|d| d.snapped_parallel) {
                            Some(sp) => *model.space(sp),
                            None => space,
                        };
                        let mut distance = match neighbors[i] {
                            Some(n) => {
                                Region::distance(model.space(n), &target, axis, edge.opposite(), edge)
                            }
                            None => Region::distance(model.space(parent), &target, axis, edge, edge),
                        };
                        if edge == Alignment::Trailing && distance != UNKNOWN {
                            distance = -distance;
                        }
                        if distance > 0 {
                            let pad = if neighbors[i].is_some()
                                || model.neighbor(parent, edge, false, true, false).is_none()
                            {
                                self.determine_expecting_padding(adding, neighbors[i], seq, edge)
                            } else {
                                i32::from(i16::MIN)
                            };
                            if distance > pad || (fixed_gap && distance != pad) {
                                pref = distance;
                                if fixed_gap {
                                    min = USE_PREFERRED_SIZE;
                                    max = USE_PREFERRED_SIZE;
                                }
                            }
                        }
                    } else {
                        padding_type = ii_inc.and_then(|d| d.padding_type);
                    }
                }
                if !fixed_gap {
                    max = INFINITE_SIZE;
                }
                let gap = self.model_mut().new_gap(min, pref, max);
                if padding_type.is_some() {
                    self.model_mut().set_padding_type(gap, padding_type);
                }
                if !fixed_gap
                    && definite
                    && neighbors[i].is_some()
                    && self.model().parent(parent).is_some()
                    && other.is_none_or(|o| self.inc(o).alignment.is_none())
                    && !is_significant_group_edge(self.model(), seq, edge.opposite())
                {
                    parent = self.separate_sequence(seq, edge.opposite());
                    if edge == Alignment::Trailing {
                        edges += 1;
                    }
                }
                gaps[i] = Some(gap);
            }
            edge = edge.opposite();
            edges -= 1;
        }

        if self.model().parent(seq).is_none() {
            debug_assert_eq!(self.model().child_count(seq), 0);
            if gaps == [None, None] {
                let alignment = self.model().raw_alignment(seq);
                let model = self.model_mut();
                model.set_interval_alignment(adding, alignment);
                model.add_interval(adding, parent, None);
                model.discard(seq);
                return;
            }
            self.model_mut().add_interval(seq, parent, None);
        }
        if self
            .inc(inc1)
            .snapped_parallel
            .is_some_and(|sp| self.model().is_parent_of(seq, sp))
        {
            self.inc_mut(inc1).snapped_parallel = None;
        }
        let model = self.model_mut();
        let mut index = if let Some(og) = original_gap {
            model.remove_interval(og)
        } else if let Some(n) = neighbors[1] {
            model.index_of(seq, n).unwrap_or(0)
        } else if neighbors[0].is_some() {
            model.child_count(seq)
        } else {
            0
        };
        if let Some(gap) = gaps[0] {
            model.add_interval(gap, seq, Some(index));
            index += 1;
        }
        model.set_interval_alignment(adding, None);
        model.add_interval(adding, seq, Some(index));
        index += 1;
        if let Some(gap) = gaps[1] {
            model.add_interval(gap, seq, Some(index));
        }
    }

    /// Cut the part of `seq` that the formation overlaps on the other axis
    /// out into a new parallel group (returned), or return `seq`'s parent
    /// when the whole sequence is involved.
    ///
    /// With `close` the cut is limited to the formation's extent on this axis.
    pub(super) fn extract_parallel_sequence(
        &mut self,
        seq: IntervalId,
        space: &Region,
        close: bool,
        alignment: Option<Alignment>,
    ) -> Option<IntervalId> {
        let axis = self.axis;
        let model = self.model();
        let count = model.child_count(seq);
        let mut start_index = 0_usize;
        let mut end_index = count as isize - 1;
        let mut start_pos = model.space(seq).pos(axis, Alignment::Leading);
        let mut end_pos = model.space(seq).pos(axis, Alignment::Trailing);
        let point = alignment.unwrap_or(Alignment::Center);

        for i in 0..count {
            let li = model.child(seq, i);
            if model.is_gap(li) {
                continue;
            }
            let sub = *model.space(li);
            let forced_parallel =
                !self.solve_overlap && model.content_overlap_space(space, li, None, axis);
            if !forced_parallel && model.content_overlap_space(space, li, None, axis.other()) {
                if add_direction(space, &sub, axis, point) == Alignment::Leading {
                    end_index = i as isize - 1;
                    end_pos = sub.pos(axis, Alignment::Leading);
                    break;
                }
                start_index = i + 1;
                start_pos = sub.pos(axis, Alignment::Trailing);
            } else if close {
                let (dl, dt) = (
                    space.pos(axis, Alignment::Leading),
                    space.pos(axis, Alignment::Trailing),
                );
                let (sl, st) = (sub.pos(axis, Alignment::Leading), sub.pos(axis, Alignment::Trailing));
                if dl >= st {
                    start_index = i + 1;
                    start_pos = st;
                } else if dl >= sl {
                    start_index = i;
                    start_pos = sl;
                } else if dt <= st {
                    if dt > sl {
                        end_index = i as isize;
                        end_pos = st;
                    } else {
                        end_index = i as isize - 1;
                        end_pos = sl;
                    }
                    break;
                }
            }
        }

        if start_index as isize > end_index {
            return None;
        }
        let end_index = end_index as usize;
        if start_index == 0 && end_index + 1 == count {
            return model.parent(seq);
        }
        let group_alignment = alignment.unwrap_or(Alignment::Leading);
        let model = self.model_mut();
        let group = model.new_parallel(group_alignment);
        if start_index == end_index {
            let li = model.remove_interval_at(seq, start_index);
            model.add_interval(li, group, Some(0));
        } else {
            let inter_seq = model.new_sequential();
            model.add_interval(inter_seq, group, Some(0));
            for _ in start_index..=end_index {
                let li = model.remove_interval_at(seq, start_index);
                model.add_interval(li, inter_seq, None);
            }
        }
        model.add_interval(group, seq, Some(start_index));
        model.space_mut(group).set_axis(axis, start_pos, end_pos);
        Some(group)
    }

    /// Split the sequence containing the parallel group of `seq` so that
    /// `seq` gets its own parallel branch reaching up to the next overlapping
    /// content at `alignment`. Returns the new parallel parent of `seq`.
    fn separate_sequence(&mut self, seq: IntervalId, alignment: Alignment) -> IntervalId {
        let axis = self.axis;
        let model = self.model();
        let Some(mut par) = model.parent(seq) else {
            return seq;
        };
        debug_assert!(model.is_parallel(par));
        let parent_seq = loop {
            match model.parent(par) {
                Some(p) if model.is_sequential(p) => break p,
                Some(p) => par = p,
                None => return model.parent(seq).unwrap_or(seq),
            }
        };
        let d = alignment.step();
        let count = model.child_count(parent_seq) as isize;
        let mut end = model.index_of(parent_seq, par).unwrap_or(0) as isize + d;
        while end >= 0 && end < count {
            let sub = model.child(parent_seq, end as usize);
            if !model.is_gap(sub)
                && model.content_overlap_space(&self.adding_space, sub, None, axis.other())
            {
                break;
            }
            end += d;
        }
        let end_pos = if end >= 0 && end < count {
            model
                .space(model.child(parent_seq, end as usize))
                .pos(axis, alignment.opposite())
        } else {
            let outer = model.parent(parent_seq).unwrap_or(parent_seq);
            model.space(outer).pos(axis, alignment)
        };
        let end = (end - d).max(0) as usize;
        self.ops.parallelize_with_parent_sequence(seq, Some(end), axis);
        let par = self.model().parent(seq).unwrap_or(seq);
        self.model_mut().space_mut(par).set_pos(axis, alignment, end_pos);
        par
    }

    /// Align `interval` at `alignment` with `to_align_with` by putting both
    /// into a common parallel group. Returns the group, or `None` when the
    /// two cannot be aligned without breaking other alignments.
    pub(super) fn align_in_parallel(
        &mut self,
        interval: IntervalId,
        to_align_with: IntervalId,
        alignment: Alignment,
    ) -> Option<IntervalId> {
        debug_assert!(alignment.is_edge());
        let axis = self.axis;
        let model = self.model();
        if model.is_parent_of(to_align_with, interval) || model.is_parent_of(interval, to_align_with)
        {
            return None;
        }
        match model.common_parent(interval, to_align_with) {
            Some(cp) if !model.is_sequential(cp) => {}
            _ => return None,
        }

        let resizing = model.want_resize(interval);
        let mut aligning = interval;
        let mut par_parent = model.first_parent(interval, GroupKind::Parallel)?;
        while !self.model().is_parent_of(par_parent, to_align_with) {
            if !self
                .model()
                .is_aligned_at_border_in(aligning, par_parent, alignment)
            {
                return None;
            }
            if resizing && !self.model().can_resize(par_parent) {
                self.ops.enable_group_resizing(par_parent);
            }
            aligning = par_parent;
            par_parent = self.model().first_parent(aligning, GroupKind::Parallel)?;
        }

        let resizing_op = self.dragger.is_resizing_axis(axis);
        let mut temp_removed = aligning;
        while let Some(p) = self.model().parent(temp_removed)
            && p != par_parent
        {
            temp_removed = p;
        }
        let removed_index = self.model_mut().remove_interval(temp_removed);
        let mut align_with_parent = false;
        let mut to_align_with = to_align_with;
        let align_parent = loop {
            let model = self.model();
            let Some(align_parent) = model.first_parent(to_align_with, GroupKind::Parallel) else {
                self.model_mut()
                    .add_interval(temp_removed, par_parent, Some(removed_index));
                return None;
            };
            if can_subst_align_with_parent(model, to_align_with, axis, alignment, resizing_op) {
                if align_parent == par_parent {
                    if model.neighbor(aligning, alignment, false, true, false).is_none() {
                        align_with_parent = true;
                    }
                } else {
                    to_align_with = align_parent;
                }
            }
            if to_align_with != align_parent {
                break align_parent;
            }
        };
        self.model_mut()
            .add_interval(temp_removed, par_parent, Some(removed_index));
        if align_parent != par_parent {
            return None;
        }

        if aligning != interval {
            if !self.model().is_aligned_at_border(to_align_with, alignment) {
                let model = self.model();
                let dst = Region::distance(
                    model.space(aligning),
                    model.space(to_align_with),
                    axis,
                    alignment,
                    alignment,
                ) * -alignment.sign();
                if dst > 0 {
                    let mut removed = interval;
                    while let Some(p) = self.model().parent(removed)
                        && p != aligning
                    {
                        removed = p;
                    }
                    let index = self.model_mut().remove_interval(removed);
                    self.ops.cut_starting_gap(aligning, dst, axis, alignment);
                    self.model_mut().add_interval(removed, aligning, Some(index));
                }
            }
            self.outcome.optimize_structure = true;
        }

        let eff_align1 = self.model().effective_alignment_at(to_align_with, alignment);
        let mut aligned_list: Vec<IntervalId> = Vec::with_capacity(2);
        let mut remainder: Vec<RemainderList> = Vec::new();
        let original_count = self.model().child_count(par_parent);
        let ext_align1 =
            self.extract_for_alignment(to_align_with, &mut aligned_list, &mut remainder, alignment);
        self.extract_for_alignment(aligning, &mut aligned_list, &mut remainder, alignment);
        debug_assert!(!align_with_parent || remainder.is_empty());

        let model = self.model();
        let indent = Region::distance(
            model.space(to_align_with),
            model.space(interval),
            axis,
            alignment,
            alignment,
        );
        if indent != 0 && indent != UNKNOWN {
            let size = indent.abs();
            let model = self.model_mut();
            let gap = model.new_gap(size, size, size);
            let parent = match model.parent(interval) {
                Some(p) if model.is_sequential(p) => p,
                parent => {
                    let seq = model.new_sequential();
                    if let Some(p) = parent {
                        let at = model.remove_interval(interval);
                        model.add_interval(seq, p, Some(at));
                    }
                    model.set_interval_alignment(interval, None);
                    model.add_interval(interval, seq, Some(0));
                    seq
                }
            };
            let at = (alignment == Alignment::Leading).then_some(0);
            model.add_interval(gap, parent, at);
            if interval == aligning
                && let Some(last) = aligned_list.last_mut()
            {
                *last = parent;
            }
        }

        let (group, common_seq) = if align_with_parent
            || (original_count == 2 && self.model().parent(par_parent).is_some())
        {
            let group = par_parent;
            let common_seq = if remainder.is_empty() {
                None
            } else {
                let model = self.model_mut();
                let group_parent = model.parent(group).unwrap_or(group);
                if model.is_sequential(group_parent) {
                    Some(group_parent)
                } else {
                    let at = model.remove_interval(group);
                    let seq = model.new_sequential();
                    let group_alignment = model.raw_alignment(group);
                    model.set_interval_alignment(seq, group_alignment);
                    model.add_interval(seq, group_parent, Some(at));
                    model.set_interval_alignment(group, None);
                    model.add_interval(group, seq, None);
                    Some(seq)
                }
            };
            (group, common_seq)
        } else {
            let align_pos = self.model().space(to_align_with).pos(axis, alignment);
            let outer_pos = self.model().space(par_parent).pos(axis, alignment.opposite());
            let model = self.model_mut();
            let group = model.new_parallel(alignment);
            let eff_edge = eff_align1.filter(|a| a.is_edge());
            let common_seq = if remainder.is_empty() {
                if eff_edge.is_some() {
                    model.set_interval_alignment(group, eff_edge);
                }
                model.add_interval(group, par_parent, None);
                None
            } else {
                let seq = model.new_sequential();
                model.add_interval(group, seq, Some(0));
                if eff_edge.is_some() {
                    model.set_interval_alignment(seq, eff_edge);
                }
                model.add_interval(seq, par_parent, None);
                Some(seq)
            };
            let (l, t) = if alignment == Alignment::Leading {
                (align_pos, outer_pos)
            } else {
                (outer_pos, align_pos)
            };
            model.space_mut(group).set_axis(axis, l, t);
            (group, common_seq)
        };

        let (Some(&aligning1), Some(&aligning2)) = (aligned_list.first(), aligned_list.get(1)) else {
            return Some(group);
        };
        let model = self.model_mut();
        if model.parent(aligning2) != Some(group) {
            if model.parent(aligning2).is_some() {
                model.remove_interval(aligning2);
            }
            model.add_interval(aligning2, group, None);
        }
        if !model.is_aligned_at_border(aligning2, alignment) {
            model.set_interval_alignment(aligning2, Some(alignment));
        }
        if model.parent(aligning1) != Some(group) {
            if model.parent(aligning1).is_some() {
                model.set_interval_alignment(aligning1, ext_align1);
                model.remove_interval(aligning1);
            }
            model.add_interval(aligning1, group, None);
        }
        if !resizing_op
            && model.child_count(group) == 2
            && !model.is_aligned_at_border(aligning1, alignment)
            && !model.is_aligned_at_border(aligning2, alignment.opposite())
        {
            model.set_interval_alignment(aligning1, Some(alignment));
        }

        if !remainder.is_empty()
            && let Some(common_seq) = common_seq
        {
            let mut index = self.model().index_of(common_seq, group).unwrap_or(0);
            if alignment == Alignment::Trailing {
                index += 1;
            }
            if let Some(side) = self
                .ops
                .add_group_content(remainder, common_seq, index, axis, alignment)
            {
                let pos1 = self.model().space(par_parent).pos(axis, alignment);
                let pos2 = self.model().space(to_align_with).pos(axis, alignment);
                let (l, t) = if alignment == Alignment::Leading {
                    (pos1, pos2)
                } else {
                    (pos2, pos1)
                };
                self.model_mut().space_mut(side).set_axis(axis, l, t);
                self.ops.optimize_gaps(side, axis);
                self.ops.merge_parallel_groups(side);
            }
        }
        Some(group)
    }

    /// Cut `interval` (with everything towards the opposite edge) out of its
    /// sequence for aligning at `alignment`. The piece to align goes to
    /// `to_align`, the cut-off rest to `to_remain`. Returns the effective
    /// alignment `interval` had.
    fn extract_for_alignment(
        &mut self,
        interval: IntervalId,
        to_align: &mut Vec<IntervalId>,
        to_remain: &mut Vec<RemainderList>,
        alignment: Alignment,
    ) -> Option<Alignment> {
        let eff_align = self.model().effective_alignment_at(interval, alignment);
        match self.model().parent(interval) {
            Some(parent) if self.model().is_sequential(parent) => {
                let mut unused = Vec::new();
                let count = if alignment == Alignment::Leading {
                    self.ops
                        .extract(interval, interval, Some(alignment), false, to_remain, &mut unused)
                } else {
                    self.ops
                        .extract(interval, interval, Some(alignment), false, &mut unused, to_remain)
                };
                if count == 1 {
                    if eff_align.is_some_and(Alignment::is_edge) {
                        self.model_mut().set_interval_alignment(interval, eff_align);
                    }
                    self.model_mut().remove_interval(parent);
                    to_align.push(interval);
                } else {
                    to_align.push(parent);
                }
            }
            _ => to_align.push(interval),
        }
        eff_align
    }

    /// Make the parallel group holding `interval` resize with it when the
    /// interval became resizable, or suppress group resizing when the
    /// group's other content would not follow.
    fn check_parallel_resizing(&mut self, interval: IntervalId, inc1: IncId, inc2: Option<IncId>) {
        let axis = self.axis;
        let model = self.model();
        let Some(group) = model.parent(interval) else {
            return;
        };
        let (parallel_int, group) = if model.is_sequential(group) {
            match model.parent(group) {
                Some(g) => (group, g),
                None => return,
            }
        } else {
            (interval, group)
        };
        if model.parent(group).is_none() {
            return;
        }

        let next_to_root =
            |id: IncId| self.inc(id).snapped_next_to.is_some_and(|n| model.parent(n).is_none());
        let mut root_align = None;
        let mut both_edges = false;
        if next_to_root(inc1) {
            root_align = self.inc(inc1).alignment;
        }
        if let Some(i2) = inc2
            && next_to_root(i2)
        {
            if root_align.is_none() {
                root_align = self.inc(i2).alignment;
            } else {
                both_edges = true;
            }
        }
        if !both_edges && let Some(edge) = root_align.filter(|a| a.is_edge()) {
            let removed_index = self.model_mut().remove_interval(parallel_int);
            let model = self.model();
            let opposite = edge.opposite();
            let neighbor = model.neighbor(group, opposite, false, true, true);
            both_edges = match neighbor {
                Some(n) => {
                    model.pref_size(n) == NOT_EXPLICITLY_DEFINED
                        && model
                            .parent(n)
                            .is_some_and(|p| model.is_aligned_at_border_in(p, model.root_of(n), opposite))
                }
                None => model.is_aligned_at_border_in(group, model.root_of(group), opposite),
            };
            self.model_mut()
                .add_interval(parallel_int, group, Some(removed_index));
        }
        if both_edges {
            return;
        }

        let model = self.model();
        let mut neighbor_gap = None;
        if interval != parallel_int {
            debug_assert!(model.is_sequential(parallel_int));
            neighbor_gap = Alignment::EDGES.into_iter().find_map(|edge| {
                model
                    .direct_neighbor(interval, edge, false)
                    .filter(|&g| model.is_gap(g) && model.can_resize(g))
            });
        }
        if model.want_resize(interval) {
            if !self.dragger.is_resizing_axis(axis) {
                return;
            }
        } else if neighbor_gap.is_none() {
            return;
        }

        let next_to_outside = |id: IncId| {
            self.inc(id)
                .snapped_next_to
                .is_some_and(|n| !model.is_parent_of(group, n))
        };
        if !model.can_resize(group) && (next_to_outside(inc1) || inc2.is_some_and(next_to_outside))
        {
            self.ops.enable_group_resizing(group);
        }
        let model = self.model();
        if model.can_resize(group) && model.parent(group).is_some() {
            let mut content_resizing = false;
            let mut same_position = false;
            for &li in model.children(group) {
                if li == parallel_int {
                    continue;
                }
                if model.want_resize(li) {
                    content_resizing = true;
                    break;
                }
                if !same_position
                    && let Some(align) = model.alignment(li).filter(|a| a.is_edge())
                {
                    same_position = self.expected_border_position(parallel_int, align.opposite())
                        == self.expected_border_position(li, align.opposite());
                }
            }
            if !content_resizing && same_position {
                self.ops.suppress_group_resizing(group);
            }
        }

        if !self.model().can_resize(group) {
            self.model_mut()
                .change_interval_attribute(parallel_int, Attributes::FILL, true);
            if let Some(gap) = neighbor_gap {
                self.model_mut().set_interval_size(
                    gap,
                    NOT_EXPLICITLY_DEFINED,
                    NOT_EXPLICITLY_DEFINED,
                    INFINITE_SIZE,
                );
            } else if let Some(comp) = self.model().component_of(interval) {
                let model = self.model();
                let id = model.component_id(comp);
                let mapper = self.ops.mapper();
                let limit = if model.is_container(comp) {
                    mapper.component_minimum_size(id)
                } else {
                    mapper.component_preferred_size(id)
                }
                .unwrap_or(Size::ZERO);
                let extent = match axis {
                    Axis::Horizontal => limit.width,
                    Axis::Vertical => limit.height,
                };
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "Component sizes are whole pixels well within i32."
                )]
                let pref = extent.round() as i32;
                let (min, max) = (model.min_size(interval), model.max_size(interval));
                if model.pref_size(interval) < pref {
                    self.model_mut().set_interval_size(interval, 0, 0, max);
                } else {
                    let min = if min != USE_PREFERRED_SIZE {
                        min
                    } else {
                        NOT_EXPLICITLY_DEFINED
                    };
                    self.model_mut()
                        .set_interval_size(interval, min, NOT_EXPLICITLY_DEFINED, max);
                }
            }
        }

        let model = self.model();
        if model.is_component(interval)
            && neighbor_gap.is_none()
            && (parallel_int == interval || model.count(parallel_int, None, true) == 1)
        {
            self.set_parallel_same_size(group, parallel_int);
        }
    }

    /// Make the siblings of `aligned` that occupy exactly its space resize
    /// along with it.
    fn set_parallel_same_size(&mut self, group: IntervalId, aligned: IntervalId) {
        let axis = self.axis;
        let Some(aligned_comp) = one_non_empty(self.model(), aligned) else {
            return;
        };
        let aligned_alignment = self.model().alignment(aligned);
        for li in self.model().children(group).to_vec() {
            if li == aligned {
                continue;
            }
            if self.model().is_parallel(li) {
                self.set_parallel_same_size(li, aligned_comp);
                continue;
            }
            let model = self.model();
            let Some(sub) = one_non_empty(model, li) else {
                continue;
            };
            if !Region::same_space(model.space(aligned_comp), model.space(sub), axis)
                || model.want_resize(li)
            {
                continue;
            }
            if model.is_parallel(sub) {
                self.set_parallel_same_size(sub, aligned_comp);
            } else {
                let min = model.min_size(sub);
                let pref = model.pref_size(sub);
                let model = self.model_mut();
                model.set_interval_alignment(li, aligned_alignment);
                let min = if min != USE_PREFERRED_SIZE {
                    min
                } else {
                    NOT_EXPLICITLY_DEFINED
                };
                model.set_interval_size(sub, min, pref, INFINITE_SIZE);
                model.change_interval_attribute(sub, Attributes::FILL, true);
            }
        }
    }

    /// Where the `alignment` edge of `interval`'s content would be laid
    /// out, counting its own border gap.
    fn expected_border_position(&self, interval: IntervalId, alignment: Alignment) -> i32 {
        let model = self.model();
        let axis = self.axis;
        let Some(comp) = model.outermost_component(interval, axis, alignment) else {
            return UNKNOWN;
        };
        let mut pos = model.space(comp).pos(axis, alignment);
        if let Some(neighbor) = model.neighbor(comp, alignment, false, true, false)
            && model.is_gap(neighbor)
            && model.is_parent_of(interval, neighbor)
        {
            let mut diff = model.pref_size(neighbor);
            if diff == NOT_EXPLICITLY_DEFINED {
                diff = size_of_default_gap(model, neighbor, self.ops.mapper());
            }
            pos += diff * alignment.sign();
        }
        pos
    }

    /// Default padding between `interval` and its neighbor at `alignment`.
    pub(super) fn determine_padding(
        &self,
        interval: IntervalId,
        padding_type: Option<PaddingType>,
        alignment: Alignment,
    ) -> i32 {
        let model = self.model();
        let neighbor = model.neighbor(interval, alignment, true, true, false);
        self.dragger
            .find_paddings(
                model,
                self.ops.mapper(),
                neighbor,
                interval,
                Some(padding_type.unwrap_or(PaddingType::Related)),
                alignment,
            )
            .first()
            .copied()
            .unwrap_or(0)
    }

    /// Related padding expected between `adding` and `base` (or whatever
    /// precedes `base_parent` at `alignment`).
    fn determine_expecting_padding(
        &self,
        adding: IntervalId,
        base: Option<IntervalId>,
        base_parent: IntervalId,
        alignment: Alignment,
    ) -> i32 {
        let model = self.model();
        let base = base.or_else(|| model.neighbor_in(base_parent, GroupKind::Sequential, alignment));
        self.dragger
            .find_paddings(
                model,
                self.ops.mapper(),
                base,
                adding,
                Some(PaddingType::Related),
                alignment,
            )
            .first()
            .copied()
            .unwrap_or(0)
    }
}
