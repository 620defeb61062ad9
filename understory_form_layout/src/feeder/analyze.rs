// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collecting and reconciling inclusion candidates.

use alloc::vec::Vec;

use super::{IncId, Inclusion, Insertion};
use crate::model::{GroupKind, IntervalId, LayoutModel};
use crate::ops::RemainderList;
use crate::region::{Region, UNKNOWN};
use crate::types::{Alignment, Axis};

/// Opposite of an edge; `None` for anything else.
pub(super) fn flipped_edge(alignment: Option<Alignment>) -> Option<Alignment> {
    alignment.filter(|a| a.is_edge()).map(Alignment::opposite)
}

/// Which side of `existing` the `point` of `adding` falls on.
pub(super) fn add_direction(adding: &Region, existing: &Region, axis: Axis, point: Alignment) -> Alignment {
    if Region::distance(adding, existing, axis, point, Alignment::Center) > 0 {
        Alignment::Leading
    } else {
        Alignment::Trailing
    }
}

/// The parallel group an inclusion into `parent` would end up in.
fn parallel_of(model: &LayoutModel, parent: IntervalId) -> IntervalId {
    if model.is_sequential(parent) {
        model.parent(parent).unwrap_or(parent)
    } else {
        parent
    }
}

/// Whether `interval` may stand in for its first parallel parent when
/// aligning at `alignment`.
///
/// With `placed_at_border_enough` an interval merely touching the parent's
/// border qualifies; otherwise the parent border must be otherwise fixed.
pub(super) fn can_subst_align_with_parent(
    model: &LayoutModel,
    interval: IntervalId,
    axis: Axis,
    alignment: Alignment,
    placed_at_border_enough: bool,
) -> bool {
    let Some(parent) = model.first_parent(interval, GroupKind::Parallel) else {
        return false;
    };
    let mut aligned = model.is_aligned_at_border_in(interval, parent, alignment);
    if !aligned
        && model.direct_neighbor(interval, alignment, false).is_none()
        && model.is_placed_at_border_in(interval, parent, axis, alignment)
    {
        aligned = placed_at_border_enough
            || model.direct_neighbor(parent, alignment, true).is_some()
            || model.is_closed_group(parent, alignment);
        if !aligned {
            let mut all_touching = true;
            for &li in model.children(parent) {
                if model.alignment(li) == Some(alignment) || model.want_resize(li) {
                    aligned = true;
                    break;
                } else if all_touching && !model.is_placed_at_border(li, axis, alignment) {
                    all_touching = false;
                }
            }
            if all_touching {
                aligned = true;
            }
        }
    }
    aligned
}

impl Insertion<'_> {
    pub(super) fn analyze_parallel(&mut self, group: IntervalId, inclusions: &mut Vec<IncId>) {
        let axis = self.axis;
        let children = self.model().children(group).to_vec();
        for sub in children {
            let model = self.model();
            if model.is_gap(sub) {
                continue;
            }
            let (parallel, sequential) = (model.is_parallel(sub), model.is_sequential(sub));
            let sub_space = *model.space(sub);
            if parallel && self.point_inside_group(sub) && self.should_enter_group(sub) {
                self.analyze_parallel(sub, inclusions);
            } else if sequential {
                self.analyze_sequential(sub, inclusions);
            } else if self.orthogonal_overlap(sub) {
                let dim_overlap = Region::overlap(&self.adding_space, &sub_space, axis, 0);
                if dim_overlap && !self.solve_overlap && !self.overlap_expected_at(sub) {
                    continue;
                }
                if dim_overlap {
                    self.outcome.impose_size = true;
                }
                let mut distance = UNKNOWN;
                if let Some(next_to) = self.a_snapped_next_to {
                    let model = self.model();
                    let neighbor = self
                        .a_edge
                        .filter(|a| a.is_edge())
                        .and_then(|edge| model.neighbor(sub, edge, true, true, false));
                    if sub == next_to
                        || model.is_parent_of(sub, next_to)
                        || model.parent(next_to).is_none()
                        || neighbor.is_some_and(|n| n == next_to || model.is_parent_of(n, next_to))
                    {
                        distance = -1;
                    }
                }
                if distance != -1 {
                    distance = if dim_overlap {
                        0
                    } else {
                        let space = &self.adding_space;
                        let leading = Region::distance(
                            &sub_space,
                            space,
                            axis,
                            Alignment::Trailing,
                            Alignment::Leading,
                        );
                        let trailing = Region::distance(
                            space,
                            &sub_space,
                            axis,
                            Alignment::Trailing,
                            Alignment::Leading,
                        );
                        if leading >= 0 { leading } else { trailing }
                    };
                }
                if let Some(id) = self.add_inclusion(group, false, distance, 0, inclusions) {
                    let point = self.a_edge.unwrap_or(Alignment::Center);
                    let side = add_direction(&self.adding_space, &sub_space, axis, point);
                    let inc = self.inc_mut(id);
                    inc.neighbor = Some(sub);
                    inc.index = if side == Alignment::Leading { 0 } else { 1 };
                }
            }
        }

        let model = self.model();
        if inclusions.is_empty()
            && model.parent(group).is_none()
            && self
                .a_snapped_parallel
                .is_none_or(|sp| self.can_align_with(sp, group, self.a_edge))
        {
            let distance = if self.a_snapped_next_to == Some(group) {
                -1
            } else {
                i32::MAX
            };
            self.add_inclusion(group, false, distance, i32::MAX, inclusions);
        }
    }

    /// An overlap with `sub` outside the overlap-solving axis is only
    /// acceptable where the resized interval already sat next to it.
    fn overlap_expected_at(&self, sub: IntervalId) -> bool {
        let Some(original) = self.original1[self.axis.index()] else {
            return false;
        };
        let original = self.inc(original);
        let flipped = flipped_edge(self.a_edge);
        flipped.is_some()
            && flipped == original.alignment
            && (original.parent == sub || self.model().is_parent_of(sub, original.parent))
    }

    pub(super) fn analyze_sequential(&mut self, group: IntervalId, inclusions: &mut Vec<IncId>) {
        let axis = self.axis;
        let mut in_sequence = false;
        let mut parallel_with_sequence = false;
        let mut index = None;
        let mut distance = i32::MAX;
        let mut ort_distance = i32::MAX;

        let count = self.model().child_count(group);
        for i in 0..count {
            let sub = self.model().child(group, i);
            if self.model().is_gap(sub) {
                if index == Some(i) {
                    index = Some(i + 1);
                }
                continue;
            }
            let sub_space = *self.model().space(sub);
            if self.model().is_parallel(sub)
                && self.point_inside_group(sub)
                && self.should_enter_group(sub)
            {
                let before = inclusions.len();
                self.analyze_parallel(sub, inclusions);
                if inclusions.len() > before {
                    return;
                }
            }

            let ort_overlap = self.orthogonal_overlap(sub);
            let margin = if axis == Axis::Vertical && !ort_overlap {
                self.dragger.tuning().vertical_overlap_margin
            } else {
                0
            };
            let dim_overlap = Region::overlap(&self.adding_space, &sub_space, axis, margin);
            if ort_overlap || (axis == Axis::Vertical && !dim_overlap && !parallel_with_sequence) {
                if dim_overlap {
                    if !self.solve_overlap && !self.overlap_expected_at(sub) {
                        return;
                    }
                    if ort_overlap {
                        self.outcome.impose_size = true;
                    }
                    in_sequence = true;
                    distance = 0;
                    ort_distance = 0;
                } else {
                    let space = &self.adding_space;
                    let dst_l =
                        Region::distance(&sub_space, space, axis, Alignment::Trailing, Alignment::Leading);
                    let dst_t =
                        Region::distance(space, &sub_space, axis, Alignment::Trailing, Alignment::Leading);
                    if dst_l >= 0 && dst_l < distance {
                        distance = dst_l;
                    }
                    if dst_t >= 0 && dst_t < distance {
                        distance = dst_t;
                    }
                    if ort_overlap {
                        ort_distance = 0;
                        in_sequence = true;
                    } else {
                        let other = axis.other();
                        let dst_l = Region::distance(
                            &sub_space,
                            space,
                            other,
                            Alignment::Trailing,
                            Alignment::Leading,
                        );
                        let dst_t = Region::distance(
                            space,
                            &sub_space,
                            other,
                            Alignment::Trailing,
                            Alignment::Leading,
                        );
                        if dst_l > 0 && dst_l < ort_distance {
                            ort_distance = dst_l;
                        }
                        if dst_t > 0 && dst_t < ort_distance {
                            ort_distance = dst_t;
                        }
                    }
                }
                let point = self.a_edge.unwrap_or(Alignment::Center);
                if add_direction(&self.adding_space, &sub_space, axis, point) == Alignment::Leading {
                    if self.a_edge != Some(Alignment::Leading) {
                        index = Some(i);
                    }
                    break;
                }
                parallel_with_sequence = false;
                if self.a_edge == Some(Alignment::Leading) {
                    index = Some(i + 1);
                }
            } else {
                parallel_with_sequence = true;
            }
        }

        if in_sequence || (axis == Axis::Vertical && !parallel_with_sequence) {
            let model = self.model();
            if self
                .a_snapped_next_to
                .is_some_and(|nt| model.is_parent_of(group, nt) || model.parent(nt).is_none())
            {
                distance = -1;
            }
            if let Some(id) =
                self.add_inclusion(group, parallel_with_sequence, distance, ort_distance, inclusions)
            {
                let index = index.unwrap_or(if self.a_edge == Some(Alignment::Leading) {
                    0
                } else {
                    count
                });
                self.inc_mut(id).index = index;
            }
        }
    }

    /// Whether the snapped point (or, unsnapped, enough of the formation)
    /// lies inside `group`.
    fn point_inside_group(&self, group: IntervalId) -> bool {
        let model = self.model();
        let (space, axis) = (&self.adding_space, self.axis);
        let group_space = model.space(group);
        if let Some(edge) = self.a_edge {
            return Region::point_inside(space, edge, group_space, axis);
        }
        let leading = Region::point_inside(space, Alignment::Leading, group_space, axis);
        let trailing = Region::point_inside(space, Alignment::Trailing, group_space, axis);
        (leading && trailing)
            || (leading && !model.is_closed_group(group, Alignment::Trailing))
            || (trailing && !model.is_closed_group(group, Alignment::Leading))
    }

    /// Whether the formation overlaps `interval` on the other axis in a way
    /// that forces them into one sequence.
    fn orthogonal_overlap(&self, interval: IntervalId) -> bool {
        let model = self.model();
        let axis = self.axis;
        if !self.solve_overlap
            && model.is_overlap_prevented_in_other_axis(self.adding_interval, interval, axis)
        {
            return false;
        }
        let mut overlap = model.content_overlap_space(&self.adding_space, interval, None, axis.other());
        if overlap
            && self.dragger.is_resizing_axis(axis)
            && !self.dragger.is_resizing_axis(axis.other())
            && let Some(original) = self.original1[axis.index()]
        {
            let original = self.inc(original);
            let parent = original.parent;
            if model.is_parent_of(parent, interval) {
                if model.is_parallel(parent)
                    && original
                        .neighbor
                        .is_none_or(|n| n != interval && !model.is_parent_of(n, interval))
                {
                    overlap = false;
                }
            } else if parent == interval {
                if model.is_parallel(parent) && original.neighbor.is_none() {
                    overlap = false;
                }
            } else if !model.is_parent_of(interval, parent)
                && model
                    .common_parent(parent, interval)
                    .is_some_and(|cp| model.is_parallel(cp))
            {
                overlap = false;
            }
        }
        overlap
    }

    /// Record a candidate unless a better one found earlier wins; a worse
    /// earlier candidate is dropped.
    fn add_inclusion(
        &mut self,
        parent: IntervalId,
        sub_group: bool,
        distance: i32,
        ort_distance: i32,
        inclusions: &mut Vec<IncId>,
    ) -> Option<IncId> {
        if let Some(&last_id) = inclusions.last() {
            let last = self.inc(last_id);
            let ort1 = last.ort_distance == 0;
            let ort2 = ort_distance == 0;
            let (mut use_last, mut use_new) = if ort1 != ort2 {
                (ort1, ort2)
            } else if ort1 {
                (true, true)
            } else if last.ort_distance != ort_distance {
                (last.ort_distance < ort_distance, ort_distance < last.ort_distance)
            } else if last.distance != distance {
                (last.distance < distance, distance < last.distance)
            } else {
                (false, false)
            };
            if !use_last && !use_new {
                let model = self.model();
                let par_parent = if model.is_parallel(last.parent) {
                    Some(last.parent)
                } else {
                    model.parent(last.parent)
                };
                use_new = par_parent.is_some_and(|pp| model.is_parent_of(pp, parent));
                use_last = !use_new;
            }
            if !use_last {
                inclusions.pop();
            }
            if !use_new {
                return None;
            }
        }

        let mut inc = Inclusion::new(parent);
        inc.new_sub_group = sub_group;
        inc.alignment = self.a_edge;
        inc.snapped_parallel = self.a_snapped_parallel;
        if distance == -1 {
            inc.snapped_next_to = self.a_snapped_next_to;
            inc.padding_type = self.a_padding_type;
            inc.fixed_position = true;
        }
        inc.distance = distance;
        inc.ort_distance = ort_distance;
        let id = self.alloc(inc);
        inclusions.push(id);
        Some(id)
    }

    /// Make sure some candidate can align with the snapped-parallel interval;
    /// otherwise put one in its parallel parent first.
    pub(super) fn add_aligning_inclusion(&mut self, inclusions: &mut Vec<IncId>) -> Option<IncId> {
        let snapped = self.a_snapped_parallel?;
        let compatible = inclusions
            .iter()
            .any(|&id| self.can_align_with(snapped, self.inc(id).parent, self.a_edge));
        if compatible {
            return None;
        }
        let model = self.model();
        let parent = if model.parent(snapped).is_some() {
            model
                .first_parent(snapped, GroupKind::Parallel)
                .unwrap_or(snapped)
        } else {
            snapped
        };
        let mut inc = Inclusion::new(parent);
        inc.snapped_parallel = Some(snapped);
        inc.alignment = self.a_edge;
        let id = self.alloc(inc);
        inclusions.insert(0, id);
        Some(id)
    }

    /// Whether a sub-group should be entered during analysis, i.e. the
    /// snapped-parallel interval is reachable through aligned borders.
    fn should_enter_group(&self, group: IntervalId) -> bool {
        let Some(snapped) = self.a_snapped_parallel else {
            return true;
        };
        let model = self.model();
        if group == snapped || model.is_parent_of(group, snapped) {
            return true;
        }
        let Some(edge) = self.a_edge.filter(|a| a.is_edge()) else {
            return false;
        };
        let mut interval = snapped;
        let mut parent = model.first_parent(snapped, GroupKind::Parallel);
        while let Some(p) = parent {
            if !model.is_aligned_at_border_in(interval, p, edge) {
                break;
            }
            if model.is_parent_of(p, group) && model.is_aligned_at_border_in(group, p, edge) {
                return true;
            }
            interval = p;
            parent = model.first_parent(p, GroupKind::Parallel);
        }
        false
    }

    /// Whether `interval` can be aligned at `alignment` with something
    /// placed in `group`.
    pub(super) fn can_align_with(
        &self,
        interval: IntervalId,
        group: IntervalId,
        alignment: Option<Alignment>,
    ) -> bool {
        let model = self.model();
        let group = if model.is_sequential(group) {
            model.parent(group).unwrap_or(group)
        } else {
            group
        };
        if interval == group {
            return true;
        }
        let Some(alignment) = alignment.filter(|a| a.is_edge()) else {
            return false;
        };
        let resizing = self.dragger.is_resizing_axis(self.axis);
        let mut interval = interval;
        let mut parent = match model.parent(interval) {
            None => Some(interval),
            Some(p) if model.is_sequential(p) => model.parent(p),
            Some(p) => Some(p),
        };
        while let Some(p) = parent {
            if p == group || model.is_parent_of(p, group) {
                break;
            }
            if can_subst_align_with_parent(model, interval, self.axis, alignment, resizing) {
                interval = p;
                parent = model.first_parent(interval, GroupKind::Parallel);
            } else {
                parent = None;
            }
        }
        match parent {
            None => false,
            Some(p) if p == group => true,
            Some(p) => model.is_aligned_at_border_in(group, p, alignment),
        }
    }

    /// Whether the inclusion lies at the border of its group on its own
    /// alignment, so it can be combined with another one at the opposite
    /// edge.
    fn is_border_inclusion(&self, id: IncId) -> bool {
        let inc = self.inc(id);
        let Some(edge) = inc.alignment.filter(|a| a.is_edge()) else {
            return false;
        };
        let model = self.model();
        if model.is_sequential(inc.parent) {
            let count = model.child_count(inc.parent);
            if count == 0 {
                return true;
            }
            let (start, end) = if edge == Alignment::Leading {
                (inc.index, count - 1)
            } else {
                if inc.index == 0 {
                    return true;
                }
                (0, (inc.index - 1).min(count - 1))
            };
            return start > end
                || !model.content_overlap_space(
                    &self.adding_space,
                    inc.parent,
                    Some((start, end)),
                    self.axis.other(),
                );
        }
        inc.neighbor.is_none()
            || (edge == Alignment::Leading && inc.index >= 1)
            || (edge == Alignment::Trailing && inc.index == 0)
    }

    pub(super) fn can_combine(&self, id1: IncId, id2: IncId) -> bool {
        let model = self.model();
        let (p1, p2) = (self.inc(id1).parent, self.inc(id2).parent);
        if p1 == p2 {
            return true;
        }
        if model.is_parent_of(p1, p2) {
            return self.is_border_inclusion(id2);
        }
        if model.is_parent_of(p2, p1) {
            return self.is_border_inclusion(id1);
        }
        let pp1 = if model.is_parallel(p1) {
            Some(p1)
        } else {
            model.parent(p1)
        };
        let pp2 = if model.is_parallel(p2) {
            Some(p2)
        } else {
            model.parent(p2)
        };
        let (Some(pp1), Some(pp2)) = (pp1, pp2) else {
            return false;
        };
        let Some(edge) = self.inc(id1).alignment.filter(|a| a.is_edge()) else {
            return false;
        };
        model.parent(pp1) == model.parent(pp2)
            && self.is_border_inclusion(id1)
            && self.is_border_inclusion(id2)
            && model.direct_neighbor(pp1, edge.opposite(), true) == Some(pp2)
    }

    /// Reduce parallel candidates to the single best one, moving the
    /// neighbors of compatible outer candidates into the chosen group.
    pub(super) fn merge_parallel_inclusions(
        &mut self,
        inclusions: &mut Vec<IncId>,
        original: Option<IncId>,
        preserve_original: bool,
    ) {
        let mut best: Option<IncId> = None;
        let mut best_original = false;
        for &id in inclusions.iter() {
            if let Some(o) = original
                && preserve_original
                && !self.can_combine(id, o)
            {
                continue;
            }
            let orig_compatible = original
                .is_some_and(|o| !preserve_original && self.inc(id).parent == self.inc(o).parent);
            let Some(b) = best else {
                best = Some(id);
                best_original = orig_compatible;
                continue;
            };
            if !best_original && orig_compatible {
                best = Some(id);
                best_original = true;
            } else if best_original == orig_compatible {
                let model = self.model();
                let g1 = parallel_of(model, self.inc(b).parent);
                let g2 = parallel_of(model, self.inc(id).parent);
                if model.is_parent_of(g1, g2)
                    || (!model.is_parent_of(g2, g1) && self.inc(id).distance < self.inc(b).distance)
                {
                    best = Some(id);
                }
            }
        }
        let Some(best) = best else {
            debug_assert!(preserve_original);
            inclusions.clear();
            inclusions.extend(original);
            return;
        };

        let mut common_group = parallel_of(self.model(), self.inc(best).parent);
        for id in inclusions.clone() {
            if id == best {
                continue;
            }
            if !self.compatible_inclusions(id, best) {
                inclusions.retain(|&x| x != id);
                continue;
            }
            let group = parallel_of(self.model(), self.inc(id).parent);
            if self.model().is_parent_of(group, common_group) {
                let inc = self.inc(id);
                let neighbor = if self.model().is_sequential(inc.parent) {
                    Some(inc.parent)
                } else {
                    inc.neighbor
                };
                if let Some(neighbor) = neighbor {
                    self.model_mut().remove_interval(neighbor);
                    self.model_mut().add_interval(neighbor, common_group, None);
                }
                if self.model().child_count(group) == 1
                    && let Some(parent) = self.model().parent(group)
                {
                    let last = self.model_mut().remove_interval_at(group, 0);
                    let index = self.model_mut().remove_interval(group);
                    self.ops.add_content(last, parent, Some(index));
                    if common_group == last && self.model().parent(common_group).is_none() {
                        common_group = parent;
                    }
                    self.update_replaced_original_group(common_group, None);
                }
                if self.inc(id).parent == group {
                    self.inc_mut(id).parent = common_group;
                }
            }
        }

        if self.model().is_parallel(self.inc(best).parent)
            && self.inc(best).snapped_parallel.is_some()
            && self.inc(best).ort_distance != 0
            && inclusions.len() > 1
        {
            inclusions.retain(|&x| x != best);
            if inclusions.len() == 1 {
                return;
            }
        }
        if inclusions.len() <= 1 {
            return;
        }

        self.merge_sequential_candidates(inclusions, best, common_group);
    }

    /// Several compatible candidates remain: build a common sequence in
    /// `common_group` holding the separated neighbors and the formation.
    fn merge_sequential_candidates(
        &mut self,
        inclusions: &mut Vec<IncId>,
        best: IncId,
        common_group: IntervalId,
    ) {
        let axis = self.axis;
        let adding = self.adding_interval;
        let mut common_group = common_group;
        let mut sub_group: Option<IntervalId> = None;
        let mut next_to = None;
        let mut sep_leading: Vec<RemainderList> = Vec::new();
        let mut sep_trailing: Vec<RemainderList> = Vec::new();

        for id in inclusions.clone() {
            let inc = self.inc(id).clone();
            if !(self.model().is_sequential(inc.parent) && inc.new_sub_group) {
                continue;
            }
            let space = self.adding_space;
            let Some(par_seq) = self.extract_parallel_sequence(inc.parent, &space, false, inc.alignment)
            else {
                continue;
            };
            if self.model().parent(par_seq) != Some(inc.parent) {
                continue;
            }
            match sub_group {
                None => sub_group = Some(par_seq),
                Some(group) => {
                    let sub = self.model_mut().remove_interval_at(par_seq, 0);
                    self.model_mut().add_interval(sub, group, None);
                }
            }
            self.ops.extract(
                par_seq,
                par_seq,
                None,
                true,
                &mut sep_leading,
                &mut sep_trailing,
            );
            self.model_mut().remove_interval(par_seq);
            self.model_mut().remove_interval(inc.parent);
        }

        let mut extract_align = None;
        if sub_group.is_some() {
            if sep_leading.is_empty() {
                extract_align = Some(Alignment::Trailing);
            }
            if sep_trailing.is_empty() {
                extract_align = Some(Alignment::Leading);
            }
        }

        let mut subsub_group: Option<IntervalId> = None;
        for id in inclusions.clone() {
            let inc = self.inc(id).clone();
            if self.model().is_parallel(inc.parent) || !inc.new_sub_group {
                self.add_to_group(id, None, false);
                match self.model().parent(adding) {
                    Some(parent) if self.model().is_sequential(parent) => {
                        self.ops.extract(
                            adding,
                            adding,
                            extract_align,
                            extract_align.is_none(),
                            &mut sep_leading,
                            &mut sep_trailing,
                        );
                        self.model_mut().remove_interval(adding);
                        self.model_mut().remove_interval(parent);
                        if let Some(align) = extract_align
                            && self.model().count(parent, None, true) >= 1
                        {
                            let subsub = match subsub_group {
                                Some(g) => g,
                                None => {
                                    let g = self.model_mut().new_parallel(align);
                                    subsub_group = Some(g);
                                    g
                                }
                            };
                            self.ops.add_content(parent, subsub, None);
                        }
                    }
                    Some(_) => {
                        self.model_mut().remove_interval(adding);
                    }
                    None => {}
                }
            }
            if self.inc(id).snapped_next_to.is_some() {
                next_to = self.inc(id).snapped_next_to;
            }
            if id != best {
                inclusions.retain(|&x| x != id);
            }
        }

        let border_pos = *self.model().space(common_group);
        let neighbor_pos = *self.model().space(sub_group.unwrap_or(adding));
        let (common_seq, mut index) = if self.model().child_count(common_group) == 0
            && let Some(parent) = self.model().parent(common_group)
        {
            let index = self.model_mut().remove_interval(common_group);
            if self.model().is_sequential(parent) {
                common_group = self.model().parent(parent).unwrap_or(parent);
                (parent, index)
            } else {
                let seq = self.model_mut().new_sequential();
                let alignment = self.model().raw_alignment(common_group);
                self.model_mut().set_interval_alignment(seq, alignment);
                self.model_mut().add_interval(seq, parent, Some(index));
                common_group = parent;
                (seq, 0)
            }
        } else {
            let seq = self.model_mut().new_sequential();
            self.model_mut().add_interval(seq, common_group, None);
            (seq, 0)
        };
        if self.model().child_count(common_seq) == 0 {
            let group_space = *self.model().space(common_group);
            self.model_mut().space_mut(common_seq).copy_axis(axis, &group_space);
        }
        self.update_replaced_original_group(common_group, Some(common_seq));

        let mut side_leading = None;
        if !sep_leading.is_empty() {
            let before = self.model().child_count(common_seq);
            side_leading =
                self.ops
                    .add_group_content(sep_leading, common_seq, index, axis, Alignment::Leading);
            index += self.model().child_count(common_seq) - before;
        }
        let mut side_trailing = None;
        if !sep_trailing.is_empty() {
            side_trailing =
                self.ops
                    .add_group_content(sep_trailing, common_seq, index, axis, Alignment::Trailing);
        }
        if let Some(side) = side_leading {
            let before = self.model().child_count(common_seq);
            self.model_mut().space_mut(side).set_axis(
                axis,
                border_pos.pos(axis, Alignment::Leading),
                neighbor_pos.pos(axis, Alignment::Leading),
            );
            self.ops.optimize_gaps(side, axis);
            index = (index + self.model().child_count(common_seq)).saturating_sub(before);
        }
        if let Some(side) = side_trailing {
            self.model_mut().space_mut(side).set_axis(
                axis,
                neighbor_pos.pos(axis, Alignment::Trailing),
                border_pos.pos(axis, Alignment::Trailing),
            );
            self.ops.optimize_gaps(side, axis);
        }
        {
            let inc = self.inc_mut(best);
            inc.parent = common_seq;
            inc.new_sub_group = false;
            inc.neighbor = None;
        }

        let count = self.model().child_count(common_seq);
        let mut gap_idx = index;
        let mut separating_gap = None;
        if count > 0 {
            if gap_idx >= count {
                gap_idx = count - 1;
                separating_gap = Some(self.model().child(common_seq, gap_idx));
            } else {
                let li = self.model().child(common_seq, gap_idx);
                separating_gap = Some(li);
                if !self.model().is_gap(li) && gap_idx > 0 {
                    gap_idx -= 1;
                    if gap_idx > 0 {
                        separating_gap = Some(self.model().child(common_seq, gap_idx));
                    }
                }
            }
        }
        let mut separating_gap = separating_gap.filter(|&g| self.model().is_gap(g));
        if let Some(gap) = separating_gap
            && sub_group.is_none()
        {
            index = gap_idx;
            let model = self.model();
            if (index == 0 && !model.is_aligned_at_border(common_seq, Alignment::Leading))
                || (index + 1 == count
                    && !model.is_aligned_at_border(common_seq, Alignment::Trailing))
            {
                self.model_mut().remove_interval(gap);
                separating_gap = None;
            }
        }

        self.inc_mut(best).snapped_next_to = next_to;
        if next_to.is_some() {
            self.inc_mut(best).fixed_position = true;
        }

        if let Some(group) = sub_group {
            if let Some(gap) = separating_gap
                && (extract_align.is_none()
                    || (extract_align == Some(Alignment::Leading) && index > gap_idx)
                    || (extract_align == Some(Alignment::Trailing) && index <= gap_idx))
            {
                self.model_mut().remove_interval(gap);
                if index >= gap_idx && index > 0 {
                    index -= 1;
                }
            }
            let sub_idx = index;
            if let Some(subsub) = subsub_group
                && self.model().child_count(subsub) > 0
            {
                let seq = self.model_mut().new_sequential();
                let alignment = self.inc(best).alignment;
                self.model_mut().set_interval_alignment(seq, alignment);
                self.ops.add_content(subsub, seq, Some(0));
                self.model_mut().add_interval(seq, group, None);
                self.inc_mut(best).parent = seq;
                index = if extract_align == Some(Alignment::Leading) {
                    0
                } else {
                    self.model().child_count(seq)
                };
            } else {
                self.inc_mut(best).new_sub_group = true;
            }
            self.ops.add_content(group, common_seq, Some(sub_idx));
            self.update_moved_original_neighbor();
        }
        self.inc_mut(best).index = index;
        inclusions.clear();
        inclusions.push(best);
    }

    /// Whether the neighbor of the outer of the two candidates fits inside
    /// the group of the inner one.
    fn compatible_inclusions(&self, id1: IncId, id2: IncId) -> bool {
        let model = self.model();
        let (mut i1, mut i2) = (id1, id2);
        let mut g1 = parallel_of(model, self.inc(i1).parent);
        let mut g2 = parallel_of(model, self.inc(i2).parent);
        if g1 == g2 {
            return true;
        }
        if model.is_parent_of(g1, g2) {
            core::mem::swap(&mut i1, &mut i2);
            core::mem::swap(&mut g1, &mut g2);
        } else if !model.is_parent_of(g2, g1) {
            return false;
        }
        let (inc1, inc2) = (self.inc(i1), self.inc(i2));
        let neighbor = if model.is_sequential(inc2.parent) {
            if model.is_parent_of(inc2.parent, inc1.parent) {
                return false;
            }
            Some(inc2.parent)
        } else {
            inc2.neighbor
        };
        let Some(neighbor) = neighbor else {
            return false;
        };
        let held = model.space(neighbor);
        let available = model.space(g1);
        Region::point_inside(held, Alignment::Leading, available, self.axis)
            && Region::point_inside(held, Alignment::Trailing, available, self.axis)
    }

    /// Original positions whose group was replaced by `new_group` (or
    /// wrapped in `new_seq`) follow the replacement.
    pub(super) fn update_replaced_original_group(
        &mut self,
        new_group: IntervalId,
        new_seq: Option<IntervalId>,
    ) {
        for id in self.originals() {
            let parent = self.inc(id).parent;
            let model = self.model();
            if model.root_of(new_group) == model.root_of(parent) {
                continue;
            }
            if model.is_parallel(parent) {
                self.inc_mut(id).parent = new_group;
            } else if let Some(seq) = new_seq {
                self.inc_mut(id).parent = seq;
            }
        }
    }

    pub(super) fn update_moved_original_neighbor(&mut self) {
        for id in self.originals() {
            if let Some(neighbor) = self.inc(id).neighbor {
                if let Some(parent) = self.model().first_parent(neighbor, GroupKind::Parallel) {
                    self.inc_mut(id).parent = parent;
                }
                self.correct_neighbor_in_sequence(id);
            }
        }
    }

    /// Reconcile the two edge inclusions of a component spanning between
    /// two places. Returns false when the second inclusion has to be
    /// dropped.
    pub(super) fn merge_sequential_inclusions(
        &mut self,
        id1: IncId,
        id2: Option<IncId>,
    ) -> bool {
        let Some(id2) = id2 else {
            return false;
        };
        if !self.can_combine(id1, id2) {
            return false;
        }
        let (p1, p2) = (self.inc(id1).parent, self.inc(id2).parent);
        if p1 == p2 {
            return true;
        }
        let model = self.model();
        let (common_group, next_to) = if model.is_parent_of(p1, p2) {
            let (inc1, inc2) = (self.inc(id1), self.inc(id2));
            (
                Some(p1),
                inc1.neighbor.is_some() || inc2.snapped_next_to.is_some() || model.is_sequential(p2),
            )
        } else if model.is_parent_of(p2, p1) {
            let (inc1, inc2) = (self.inc(id1), self.inc(id2));
            (
                Some(p2),
                inc2.neighbor.is_some() || inc1.snapped_next_to.is_some() || model.is_sequential(p1),
            )
        } else {
            (model.first_parent(p1, GroupKind::Sequential), false)
        };
        let Some(common_group) = common_group else {
            return false;
        };

        if self.model().is_sequential(common_group) || next_to {
            let (i1, i2) = if self.inc(id1).alignment == Some(Alignment::Trailing) {
                (id2, id1)
            } else {
                (id1, id2)
            };
            self.merge_in_sequence(common_group, i1, i2);
            return true;
        }

        let (mut i1, mut i2) = (id1, id2);
        let align_with_first = |this: &Self, i1: IncId, i2: IncId| {
            this.inc(i2)
                .snapped_parallel
                .is_none_or(|sp| this.can_align_with(sp, this.inc(i1).parent, this.inc(i2).alignment))
        };
        if (self.inc(i2).snapped_next_to.is_none() && self.inc(i2).snapped_parallel.is_none())
            || (self.inc(i2).snapped_parallel.is_some() && align_with_first(self, i1, i2))
        {
            self.inc_mut(i2).parent = self.inc(i1).parent;
            return true;
        }
        if self.inc(i2).parent == common_group {
            core::mem::swap(&mut i1, &mut i2);
        }
        if self.inc(i2).snapped_parallel == Some(self.inc(i2).parent) {
            let parent = self.inc(i2).parent;
            if let Some(p) = self.model().first_parent(parent, GroupKind::Parallel) {
                self.inc_mut(i2).parent = p;
            }
            if self.inc(i2).parent == self.inc(i1).parent {
                return true;
            }
        }
        if align_with_first(self, i1, i2) {
            self.inc_mut(i2).parent = self.inc(i1).parent;
            return true;
        }
        let (p1, p2) = (self.inc(i1).parent, self.inc(i2).parent);
        if let Some(edge) = self.inc(i1).alignment.filter(|a| a.is_edge())
            && self.model().is_aligned_at_border_in(p2, p1, edge)
        {
            self.inc_mut(i1).parent = p2;
            return true;
        }
        if let Some(seq) = self.model().parent(p2)
            && self.model().is_sequential(seq)
            && self.model().parent(seq) == Some(p1)
            && let Some(edge) = self.inc(i1).alignment.filter(|a| a.is_edge())
        {
            let model = self.model();
            let count = model.child_count(seq);
            let position = model.index_of(seq, p2).unwrap_or(0);
            let index = if edge == Alignment::Leading {
                position.checked_sub(1)
            } else {
                Some(position + 1)
            };
            let gap = index
                .filter(|&i| i == 0 || i + 1 == count)
                .filter(|&i| i < count)
                .map(|i| model.child(seq, i));
            if let Some(gap) = gap
                && model.is_fixed_default_padding(gap)
                && self.inc(i1).snapped_next_to == Some(p1)
                && model.want_resize(seq)
            {
                let inc = self.inc_mut(i1);
                inc.parent = p2;
                inc.snapped_next_to = None;
                inc.snapped_parallel = Some(p2);
                return true;
            }
            if let Some(gap) = gap
                && model.is_gap(gap)
                && self.inc(i1).snapped_parallel == Some(p1)
            {
                let size = model.known_current_size(gap, self.axis).unwrap_or(0);
                self.copy_gap_inside_group(gap, size, p2, edge);
                self.model_mut().remove_interval(gap);
                self.inc_mut(i1).parent = p2;
                return true;
            }
        }
        self.inc_mut(i2).parent = self.inc(i1).parent;
        true
    }

    /// Bring the leading inclusion `i1` and trailing inclusion `i2` into one
    /// sequence under `common_group`.
    fn merge_in_sequence(&mut self, common_group: IntervalId, i1: IncId, i2: IncId) {
        let axis = self.axis;
        let mut start_index = 0;
        let mut end_index = 0;
        let mut start_gap = false;
        let mut end_gap = false;
        let mut ext1 = None;
        let mut ext2 = None;

        if self.model().is_sequential(common_group) {
            let model = self.model();
            let count = model.child_count(common_group);
            let inc1 = self.inc(i1);
            if model.is_parent_of(common_group, inc1.parent) {
                (ext1, start_index) = self.extension_in(common_group, i1);
            } else {
                start_index = inc1.index.min(count.saturating_sub(1));
                start_gap = count > 0 && model.is_gap(model.child(common_group, start_index));
            }
            let inc2 = self.inc(i2);
            if model.is_parent_of(common_group, inc2.parent) {
                (ext2, end_index) = self.extension_in(common_group, i2);
            } else {
                end_index = inc2.index;
                if inc2
                    .snapped_parallel
                    .is_none_or(|sp| !model.is_parent_of(common_group, sp))
                    && end_index > 0
                {
                    end_index -= 1;
                    end_gap = model.is_gap(model.child(common_group, end_index));
                }
                end_index = end_index.min(count.saturating_sub(1));
            }
        }

        let spans = end_index > start_index + 1
            || (end_index == start_index + 1 && !start_gap && !end_gap);
        if spans
            && ((ext1.is_some() && !self.inc(i1).new_sub_group)
                || (ext2.is_some() && !self.inc(i2).new_sub_group))
        {
            let count = self.model().child_count(common_group);
            let par_group = if start_index == 0 && end_index + 1 == count {
                self.model().parent(common_group).unwrap_or(common_group)
            } else {
                let group = self.model_mut().new_parallel(Alignment::Leading);
                let par_seq = self.model_mut().new_sequential();
                self.model_mut().add_interval(par_seq, group, Some(0));
                let model = self.model();
                let leading = model.visual_position(
                    model.child(common_group, start_index),
                    axis,
                    Alignment::Leading,
                );
                let trailing = model.visual_position(
                    model.child(common_group, end_index),
                    axis,
                    Alignment::Trailing,
                );
                self.model_mut().space_mut(group).set_axis(axis, leading, trailing);
                for _ in start_index..=end_index {
                    let li = self.model_mut().remove_interval_at(common_group, start_index);
                    self.model_mut().add_interval(li, par_seq, None);
                }
                self.model_mut()
                    .add_interval(group, common_group, Some(start_index));
                group
            };
            let ext_seq = self.model_mut().new_sequential();
            self.model_mut().add_interval(ext_seq, par_group, None);
            if let Some(e1) = ext1 {
                self.detach_collapsing(e1);
                self.ops.add_content(e1, ext_seq, Some(0));
                if let Some(e2) = ext2 {
                    let size = Region::distance(
                        self.model().space(e1),
                        self.model().space(e2),
                        axis,
                        Alignment::Trailing,
                        Alignment::Leading,
                    )
                    .max(0);
                    let gap = self.model_mut().new_gap(size, size, size);
                    self.model_mut().add_interval(gap, ext_seq, None);
                    let index = self.model().index_of(ext_seq, gap).unwrap_or(0);
                    self.inc_mut(i1).index = index;
                    self.inc_mut(i2).index = index;
                } else {
                    let count = self.model().child_count(ext_seq);
                    self.inc_mut(i1).index = count;
                    self.inc_mut(i2).index = count;
                }
            } else {
                self.inc_mut(i1).index = 0;
                self.inc_mut(i2).index = 0;
            }
            if let Some(e2) = ext2 {
                self.detach_collapsing(e2);
                self.ops.add_content(e2, ext_seq, None);
            }
            for id in [i1, i2] {
                let inc = self.inc_mut(id);
                inc.parent = ext_seq;
                inc.new_sub_group = false;
                inc.neighbor = None;
            }
        } else {
            let model = self.model();
            let (p1, p2) = (self.inc(i1).parent, self.inc(i2).parent);
            if model.is_parent_of(p2, p1) {
                let src = self.inc(i1).clone();
                let inc2 = self.inc_mut(i2);
                inc2.parent = src.parent;
                inc2.index = src.index;
                inc2.new_sub_group = src.new_sub_group;
                inc2.neighbor = src.neighbor;
                if end_gap {
                    inc2.fixed_position = false;
                }
            } else if model.is_parent_of(p1, p2) {
                let src = self.inc(i2).clone();
                let inc1 = self.inc_mut(i1);
                inc1.parent = src.parent;
                inc1.index = src.index;
                inc1.new_sub_group = src.new_sub_group;
                inc1.neighbor = src.neighbor;
                if start_gap {
                    inc1.fixed_position = false;
                }
            }
        }
    }

    /// The interval extending the inclusion out of `seq` (a direct child of
    /// one of `seq`'s parallel children), with the index of that child.
    fn extension_in(&self, seq: IntervalId, id: IncId) -> (Option<IntervalId>, usize) {
        let model = self.model();
        let inc = self.inc(id);
        let ext = if model.is_sequential(inc.parent) {
            Some(inc.parent)
        } else {
            inc.neighbor
        };
        match ext {
            Some(mut ext) => {
                while let Some(p) = model.parent(ext)
                    && model.parent(p) != Some(seq)
                {
                    ext = p;
                }
                let in_seq = model.parent(ext).unwrap_or(ext);
                (Some(ext), model.index_of(seq, in_seq).unwrap_or(0))
            }
            None => {
                let mut in_common = inc.parent;
                while let Some(p) = model.parent(in_common)
                    && p != seq
                {
                    in_common = p;
                }
                (None, model.index_of(seq, in_common).unwrap_or(0))
            }
        }
    }

    /// Remove `interval` from its parent, dissolving the parent when only
    /// one interval stays in it.
    fn detach_collapsing(&mut self, interval: IntervalId) {
        let Some(parent) = self.model().parent(interval) else {
            return;
        };
        self.model_mut().remove_interval(interval);
        if self.model().child_count(parent) == 1
            && let Some(grand) = self.model().parent(parent)
        {
            let last = self.model_mut().remove_interval_at(parent, 0);
            let index = self.model_mut().remove_interval(parent);
            self.ops.add_content(last, grand, Some(index));
        }
    }

    /// Move the gap in front of `group` (at `alignment`) into each of its
    /// sub-intervals so `group` can be aligned with its parallel sibling.
    fn copy_gap_inside_group(
        &mut self,
        gap: IntervalId,
        gap_size: i32,
        group: IntervalId,
        alignment: Alignment,
    ) {
        let axis = self.axis;
        let size = if alignment == Alignment::Leading {
            -gap_size
        } else {
            gap_size
        };
        let shift = |space: &mut Region| {
            let pos = space.pos(axis, alignment);
            if pos != UNKNOWN {
                space.set_pos(axis, alignment, pos + size);
            }
        };
        shift(self.model_mut().space_mut(group));
        for sub in self.model().children(group).to_vec() {
            let clone = self.model_mut().clone_interval(gap);
            if self.model().is_sequential(sub) {
                shift(self.model_mut().space_mut(sub));
                let index = if alignment == Alignment::Leading {
                    0
                } else {
                    self.model().child_count(sub)
                };
                self.ops.insert_gap_into_sequence(clone, sub, index, axis);
            } else {
                let seq = self.model_mut().new_sequential();
                let mut space = *self.model().space(sub);
                shift(&mut space);
                self.model_mut().space_mut(seq).copy_axis(axis, &space);
                let alignment_of_sub = self.model().raw_alignment(sub);
                self.model_mut().set_interval_alignment(seq, alignment_of_sub);
                let index = self.model_mut().remove_interval(sub);
                self.model_mut().add_interval(seq, group, Some(index));
                self.model_mut().set_interval_alignment(sub, None);
                self.model_mut().add_interval(sub, seq, Some(0));
                let gap_index = if alignment == Alignment::Leading { 0 } else { 1 };
                self.model_mut().add_interval(clone, seq, Some(gap_index));
            }
        }
    }
}
