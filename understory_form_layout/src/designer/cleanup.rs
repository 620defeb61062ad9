// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structure cleanup: redundant groups, gaps, and the holes left by removals.

use alloc::vec::Vec;

use hashbrown::HashSet;

use super::Upkeep;
use crate::model::{ComponentKey, IntervalId};
use crate::region::{Region, UNKNOWN};
use crate::types::{
    Alignment, Attributes, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE,
};

impl Upkeep<'_> {
    /// Dissolve redundant groups in every layer of every container,
    /// recording the containers that changed.
    pub(super) fn destroy_all_redundant_groups(&mut self, updated: &mut HashSet<ComponentKey>) {
        let containers: Vec<ComponentKey> = self
            .model()
            .all_components()
            .filter(|&c| self.model().is_container(c))
            .collect();
        for container in containers {
            let mut changed = false;
            for roots in self.model().layout_roots(container).to_vec() {
                for root in roots {
                    changed |= self.destroy_redundant_groups(root);
                }
            }
            if changed {
                updated.insert(container);
            }
        }
    }

    /// Returns true if a group below `interval` went away.
    pub(super) fn destroy_redundant_groups(&mut self, interval: IntervalId) -> bool {
        let mut updated = false;
        let mut i = self.model().child_count(interval);
        while i > 0 {
            i -= 1;
            if i >= self.model().child_count(interval) {
                continue;
            }
            let sub = self.model().child(interval, i);
            if self.model().is_group(sub) {
                updated |= self.destroy_redundant_groups(sub);
                self.destroy_group_if_redundant(sub, Some(interval));
                updated |= self.model().parent(sub).is_none();
            }
        }
        updated
    }

    /// Take out an empty group or dissolve a redundant one, then retry on
    /// its parent, stopping at `boundary`.
    pub(crate) fn destroy_group_if_redundant(&mut self, group: IntervalId, boundary: Option<IntervalId>) {
        let m = self.model();
        if !m.is_alive(group) || !m.is_group(group) || Some(group) == boundary {
            return;
        }
        let Some(parent) = m.parent(group) else {
            return;
        };
        if m.count(group, None, true) == 0 {
            self.take_out_interval(group, boundary);
            return;
        }
        if self.ops.dissolve_redundant_group(group) {
            self.destroy_group_if_redundant(parent, boundary);
        }
    }

    /// Remove `interval` together with the gaps around it.
    ///
    /// When it sat between two gaps in a longer sequence, one gap spanning
    /// the whole hole takes their place.
    pub(super) fn take_out_interval(&mut self, interval: IntervalId, boundary: Option<IntervalId>) {
        let m = self.model();
        let Some(parent) = m.parent(interval) else {
            return;
        };
        let Some(index) = m.index_of(parent, interval) else {
            return;
        };
        let mut to_remove = alloc::vec![interval];
        if m.is_sequential(parent) {
            let count = m.child_count(parent);
            if index > 0 && m.is_gap(m.child(parent, index - 1)) {
                to_remove.push(m.child(parent, index - 1));
            }
            if index + 1 < count && m.is_gap(m.child(parent, index + 1)) {
                to_remove.push(m.child(parent, index + 1));
            }
            if to_remove.len() == 3 && count > 3 {
                let vertical_component = m.component_of(interval).is_some_and(|comp| {
                    m.component_interval(comp, Axis::Vertical) == interval
                });
                let sizes = vertical_component.then(|| {
                    let size: i32 = to_remove
                        .iter()
                        .filter_map(|&li| m.known_current_size(li, Axis::Vertical))
                        .sum();
                    let max = if m.effective_alignment(interval) == Some(Alignment::Trailing) {
                        INFINITE_SIZE
                    } else {
                        USE_PREFERRED_SIZE
                    };
                    (size, max)
                });
                let model = self.model_mut();
                let gap = match sizes {
                    Some((size, max)) => model.new_gap(NOT_EXPLICITLY_DEFINED, size, max),
                    None => model.new_default_gap(),
                };
                model.add_interval(gap, parent, Some(index));
            }
        }
        for li in to_remove {
            self.model_mut().remove_interval(li);
        }
        self.destroy_group_if_redundant(parent, boundary);
    }

    /// Hoist shared gaps out of the parallel `group`, and collapse it when
    /// it holds at most one real child.
    ///
    /// Returns the group's former index in its parent when the group was
    /// restructured there.
    pub(super) fn optimize_gaps(&mut self, group: IntervalId, axis: Axis, recursive: bool) -> Option<usize> {
        debug_assert!(self.model().is_parallel(group));
        if recursive {
            let mut i = 0;
            while i < self.model().child_count(group) {
                let li = self.model().child(group, i);
                if self.model().is_parallel(li) {
                    self.optimize_gaps(li, axis, true);
                } else if self.model().is_sequential(li) {
                    let mut ii = 0;
                    while ii < self.model().child_count(li) {
                        let sub = self.model().child(li, ii);
                        if self.model().is_parallel(sub)
                            && let Some(idx) = self.optimize_gaps(sub, axis, true)
                        {
                            ii = idx;
                        }
                        ii += 1;
                    }
                }
                i += 1;
            }
        }
        let m = self.model();
        if m.group_alignment(group) == Alignment::Baseline {
            return None;
        }
        if m.count(group, None, true) > 1 {
            return self.ops.optimize_gaps(group, axis);
        }
        let Some(parent) = m.parent(group) else {
            let count = m.child_count(group);
            if count > 1 {
                if let Some(i) = (0..count).rev().find(|&i| m.is_gap(m.child(group, i))) {
                    self.model_mut().remove_interval_at(group, i);
                }
            } else if count == 0 {
                self.prop_empty_container(group, axis);
            }
            return None;
        };
        if m.child_count(group) != 1 {
            return None;
        }
        let alignment = m.raw_alignment(group);
        let model = self.model_mut();
        let interval = model.remove_interval_at(group, 0);
        model.set_interval_alignment(interval, alignment);
        let index = model.remove_interval(group);
        if model.is_sequential(parent) && model.is_sequential(interval) {
            while model.child_count(interval) > 0 {
                let last = model.child_count(interval) - 1;
                let sub = model.remove_interval_at(interval, last);
                model.add_interval(sub, parent, Some(index));
            }
            self.eliminate_consecutive_gaps(parent, 0, axis);
        } else {
            model.add_interval(interval, parent, Some(index));
        }
        None
    }

    /// Merge neighboring gaps in the sequence `group`, starting just before `index`.
    pub(super) fn eliminate_consecutive_gaps(&mut self, group: IntervalId, index: usize, axis: Axis) {
        debug_assert!(self.model().is_sequential(group));
        let mut index = index.saturating_sub(1);
        while index + 1 < self.model().child_count(group) {
            let m = self.model();
            let current = m.child(group, index);
            let next = m.child(group, index + 1);
            if !(m.is_gap(current) && m.is_gap(next)) {
                index += 1;
                continue;
            }
            let (lr, la) = if index > 0 {
                (*m.space(m.child(group, index - 1)), Alignment::Trailing)
            } else {
                (*m.space(group), Alignment::Leading)
            };
            let (tr, ta) = if index + 2 < m.child_count(group) {
                (*m.space(m.child(group, index + 2)), Alignment::Leading)
            } else {
                (*m.space(group), Alignment::Trailing)
            };
            let size = Region::distance(&lr, &tr, axis, la, ta);
            self.ops.eat_gap(current, next, size);
        }
    }

    /// Make the parallel `group` keep its current size after a child
    /// shrank or went away, by aligning it further up or padding it with a gap.
    ///
    /// `excluded` is a child whose size is taken as `excluded_size`
    /// instead of its current space.
    fn maintain_size(
        &mut self,
        group: IntervalId,
        was_resizing: bool,
        axis: Axis,
        excluded: Option<IntervalId>,
        excluded_size: i32,
    ) {
        let m = self.model();
        debug_assert!(m.is_parallel(group));
        let group_space = *m.space(group);
        if !group_space.is_axis_set(axis) || (excluded.is_some() && excluded_size == UNKNOWN) {
            return;
        }
        let group_size = group_space.size(axis);
        let group_lead = group_space.pos(axis, Alignment::Leading);
        let group_trail = group_space.pos(axis, Alignment::Trailing);
        let mut lead_align = false;
        let mut trail_align = false;
        let mut lead_comp_pos = i32::MAX;
        let mut trail_comp_pos = i32::MIN;
        let mut sub_size = i32::MIN;
        for &li in m.children(group) {
            let align = m.alignment(li);
            let (l, t) = if Some(li) != excluded {
                let size = m.space(li).size(axis);
                if size == UNKNOWN || size >= group_size {
                    return;
                }
                sub_size = sub_size.max(size);
                let edge_pos = |edge: Alignment| {
                    let outer = m.outermost_component(li, axis, edge).unwrap_or(li);
                    m.space(outer).pos(axis, edge)
                };
                let (l, t) = (edge_pos(Alignment::Leading), edge_pos(Alignment::Trailing));
                if l == UNKNOWN || t == UNKNOWN {
                    return;
                }
                (l, t)
            } else {
                sub_size = sub_size.max(excluded_size);
                if align == Some(Alignment::Leading) {
                    (group_lead, group_lead + excluded_size)
                } else {
                    (group_trail - excluded_size, group_trail)
                }
            };
            lead_comp_pos = lead_comp_pos.min(l);
            trail_comp_pos = trail_comp_pos.max(t);
            if align == Some(Alignment::Leading) {
                lead_align = true;
            } else {
                trail_align = true;
            }
        }
        if lead_align && trail_align {
            self.optimize_gaps(group, axis, false);
            return;
        }
        let was_resizing = was_resizing && m.can_resize(group);
        let resizing = m.want_resize(group);
        let parent = m.parent(group);
        let new_lead = if trail_align { lead_comp_pos } else { group_lead };
        let new_trail = if lead_align { trail_comp_pos } else { group_trail };
        let edge = if lead_align {
            Alignment::Leading
        } else {
            Alignment::Trailing
        };
        if let Some(p) = parent
            && m.is_parallel(p)
            && m.alignment(group) == Some(edge)
        {
            self.maintain_size(p, was_resizing && !resizing, axis, Some(group), sub_size);
            self.model_mut().space_mut(group).set_axis(axis, new_lead, new_trail);
            return;
        }
        if sub_size == i32::MIN {
            return;
        }
        let increment = group_size - sub_size;
        debug_assert!(increment > 0);
        let (min, max) = if !resizing && (was_resizing || parent.is_none()) {
            (NOT_EXPLICITLY_DEFINED, INFINITE_SIZE)
        } else {
            (USE_PREFERRED_SIZE, USE_PREFERRED_SIZE)
        };
        let gap = self.model_mut().new_gap(min, increment, max);
        let (pos, side) = if lead_align {
            (trail_comp_pos, Alignment::Trailing)
        } else {
            (lead_comp_pos, Alignment::Leading)
        };
        self.ops.insert_gap(gap, group, pos, axis, side);
        if self.model().is_alive(group) {
            self.model_mut().space_mut(group).set_axis(axis, new_lead, new_trail);
        }
        if let Some(mut p) = parent {
            let m = self.model();
            if m.is_sequential(p)
                && let Some(pp) = m.parent(p)
            {
                p = pp;
            }
            if self.model().is_alive(p) && self.model().is_parallel(p) {
                self.optimize_gaps(p, axis, false);
            }
        }
    }

    /// Keep a center or baseline group from collapsing onto its shrunk
    /// content by turning the overlapping neighbors into a sequence with it.
    fn prevent_parallel_collapse(&mut self, group: IntervalId, axis: Axis) {
        let m = self.model();
        let group_space = *m.space(group);
        let mut reduced = Region::new();
        for &li in m.children(group) {
            reduced.expand_axis(m.space(li), axis);
        }
        if reduced.size(axis) >= group_space.size(axis) {
            return;
        }
        let mut seq_list_l: Vec<IntervalId> = Vec::new();
        let mut seq_list_t: Vec<IntervalId> = Vec::new();
        let mut min_dist_l = i32::MAX;
        let mut min_dist_t = i32::MAX;
        let mut found = None;
        let mut parent = m.parent(group);
        while let Some(p) = parent {
            if m.is_parallel(p) {
                if matches!(m.group_alignment(p), Alignment::Center | Alignment::Baseline) {
                    break;
                }
                for &li in m.children(p) {
                    if li == group || m.is_parent_of(li, group) {
                        continue;
                    }
                    let neighbor = m.space(li);
                    if Region::overlap(neighbor, &group_space, axis.other(), 0)
                        && Region::overlap(neighbor, &group_space, axis, 0)
                        && !Region::overlap(neighbor, &reduced, axis, 0)
                    {
                        let dist =
                            Region::distance(neighbor, &reduced, axis, Alignment::Trailing, Alignment::Leading);
                        if dist >= 0 {
                            seq_list_l.push(li);
                            min_dist_l = min_dist_l.min(dist);
                        } else {
                            let dist = Region::distance(
                                &reduced,
                                neighbor,
                                axis,
                                Alignment::Trailing,
                                Alignment::Leading,
                            );
                            seq_list_t.push(li);
                            min_dist_t = min_dist_t.min(dist);
                        }
                    }
                }
                if !seq_list_l.is_empty() || !seq_list_t.is_empty() {
                    found = Some(p);
                    break;
                }
            }
            parent = m.parent(p);
        }
        let Some(found) = found else {
            return;
        };
        let Some(group_parent) = m.parent(group) else {
            return;
        };
        tracing::trace!(?axis, "preventing parallel collapse");

        let seq = if m.is_parallel(group_parent) {
            let alignment = m.raw_alignment(group);
            let model = self.model_mut();
            let index = model.remove_interval(group);
            let seq = model.new_sequential();
            model.set_interval_alignment(seq, alignment);
            model.set_interval_alignment(group, None);
            model.add_interval(seq, group_parent, Some(index));
            model.add_interval(group, seq, None);
            seq
        } else {
            let mut index_in_seq = 0;
            let mut seq = None;
            let mut p = group;
            while let Some(pp) = m.parent(p) {
                if m.is_sequential(pp) {
                    index_in_seq = m.index_of(pp, p).unwrap_or(0);
                    seq = Some(pp);
                    break;
                }
                if pp == found {
                    break;
                }
                p = pp;
            }
            let Some(seq) = seq else {
                return;
            };
            let model = self.model_mut();
            if !seq_list_l.is_empty() {
                let mut sub = None;
                while index_in_seq > 0 {
                    let li = model.remove_interval_at(seq, 0);
                    index_in_seq -= 1;
                    if !model.is_gap(li) || index_in_seq > 0 {
                        let s = *sub.get_or_insert_with(|| {
                            let s = model.new_sequential();
                            seq_list_l.push(s);
                            s
                        });
                        model.add_interval(li, s, None);
                    }
                }
            }
            if !seq_list_t.is_empty() {
                let mut sub = None;
                while index_in_seq + 1 < model.child_count(seq) {
                    let last = model.child_count(seq) - 1;
                    let li = model.remove_interval_at(seq, last);
                    if !model.is_gap(li) || index_in_seq + 1 < model.child_count(seq) {
                        let s = *sub.get_or_insert_with(|| {
                            let s = model.new_sequential();
                            seq_list_t.push(s);
                            s
                        });
                        model.add_interval(li, s, Some(0));
                    }
                }
            }
            seq
        };
        if let Some(leading) = self.interval_from_list(&seq_list_l, Alignment::Leading) {
            let model = self.model_mut();
            let gap = model.new_gap(min_dist_l, min_dist_l, min_dist_l);
            model.add_interval(gap, seq, Some(0));
            model.set_interval_alignment(leading, None);
            self.ops.add_content(leading, seq, Some(0));
        }
        if let Some(trailing) = self.interval_from_list(&seq_list_t, Alignment::Trailing) {
            let model = self.model_mut();
            let gap = model.new_gap(min_dist_t, min_dist_t, min_dist_t);
            model.add_interval(gap, seq, None);
            model.set_interval_alignment(trailing, None);
            self.ops.add_content(trailing, seq, None);
        }
    }

    /// Detach the intervals of `list` and combine them: the interval itself
    /// if there is one, otherwise a parallel group with `alignment`.
    fn interval_from_list(&mut self, list: &[IntervalId], alignment: Alignment) -> Option<IntervalId> {
        let model = self.model_mut();
        match list {
            [] => None,
            [li] => {
                if model.parent(*li).is_some() {
                    model.remove_interval(*li);
                }
                Some(*li)
            }
            _ => {
                let group = model.new_parallel(alignment);
                for &li in list {
                    if model.parent(li).is_some() {
                        model.remove_interval(li);
                    }
                    model.add_interval(li, group, None);
                }
                Some(group)
            }
        }
    }

    /// Repair `parent` after the child at `index` went away.
    ///
    /// Surrounding gaps are merged into one gap spanning the hole so the
    /// remaining intervals keep their positions; emptied groups go away.
    pub(super) fn interval_removed(
        &mut self,
        parent: IntervalId,
        index: usize,
        primary: bool,
        was_resizing: bool,
        axis: Axis,
    ) {
        if self.model().is_sequential(parent) {
            self.removed_from_sequence(parent, index, was_resizing, axis);
            return;
        }
        let m = self.model();
        let Some(super_parent) = m.parent(parent) else {
            return;
        };
        if m.child_count(parent) == 0 {
            let idx = self.model_mut().remove_interval(parent);
            self.interval_removed(super_parent, idx, false, was_resizing, axis);
            return;
        }
        if primary {
            match m.group_alignment(parent) {
                Alignment::Leading | Alignment::Trailing => {
                    self.maintain_size(parent, was_resizing, axis, None, 0);
                }
                _ => self.prevent_parallel_collapse(parent, axis),
            }
        }
        let m = self.model();
        if !m.is_alive(parent) {
            return;
        }
        let Some(super_parent) = m.parent(parent) else {
            return;
        };
        if m.child_count(parent) == 1 {
            let alignment = m.raw_alignment(parent);
            let parent_can_resize = m.can_resize(parent);
            let model = self.model_mut();
            let remaining = model.remove_interval_at(parent, 0);
            model.set_interval_alignment(remaining, alignment);
            if model.want_resize(remaining) && !parent_can_resize {
                if model.is_group(remaining) {
                    self.ops.suppress_group_resizing(remaining);
                } else {
                    let pref = model.pref_size(remaining);
                    model.set_interval_size(remaining, USE_PREFERRED_SIZE, pref, USE_PREFERRED_SIZE);
                }
            }
            let i = self.model_mut().remove_interval(parent);
            self.ops.add_content(remaining, super_parent, Some(i));
            let m = self.model();
            if m.is_sequential(remaining) && m.is_sequential(super_parent) {
                self.eliminate_consecutive_gaps(super_parent, i, axis);
            }
        } else if was_resizing && !m.content_want_resize(parent) {
            self.ops.enable_group_resizing(parent);
        }
    }

    fn removed_from_sequence(&mut self, parent: IntervalId, index: usize, was_resizing: bool, axis: Axis) {
        let mut index = index;
        let mut leading_gap = None;
        let mut leading_neighbor = None;
        if index > 0 {
            let li = self.model().child(parent, index - 1);
            if self.model().is_gap(li) {
                leading_gap = Some(li);
                self.model_mut().remove_interval(li);
                index -= 1;
                leading_neighbor = (index > 0).then(|| self.model().child(parent, index - 1));
            } else {
                leading_neighbor = Some(li);
            }
        }
        let mut trailing_gap = None;
        let mut trailing_neighbor = None;
        if index < self.model().child_count(parent) {
            let li = self.model().child(parent, index);
            if self.model().is_gap(li) {
                trailing_gap = Some(li);
                self.model_mut().remove_interval(li);
                let m = self.model();
                trailing_neighbor = (index < m.child_count(parent)).then(|| m.child(parent, index));
            } else {
                trailing_neighbor = Some(li);
            }
        }
        let m = self.model();
        let was_resizing = was_resizing
            || leading_gap.is_some_and(|g| m.can_resize(g))
            || trailing_gap.is_some_and(|g| m.can_resize(g));
        let Some(super_parent) = m.parent(parent) else {
            return;
        };
        if m.child_count(parent) == 0 {
            let idx = self.model_mut().remove_interval(parent);
            if self.model().parent(super_parent).is_some() {
                self.interval_removed(super_parent, idx, false, was_resizing, axis);
            }
            return;
        }

        let rest_resizing = m.content_want_resize(parent);
        if was_resizing && !rest_resizing {
            if leading_neighbor.is_none() && m.alignment(parent) == Some(Alignment::Leading) {
                self.model_mut()
                    .set_interval_alignment(parent, Some(Alignment::Trailing));
            }
            if trailing_neighbor.is_none()
                && self.model().alignment(parent) == Some(Alignment::Trailing)
            {
                self.model_mut()
                    .set_interval_alignment(parent, Some(Alignment::Leading));
            }
        }
        let m = self.model();
        let cut_size = Region::distance(
            m.space(leading_neighbor.unwrap_or(parent)),
            m.space(trailing_neighbor.unwrap_or(parent)),
            axis,
            if leading_neighbor.is_some() {
                Alignment::Trailing
            } else {
                Alignment::Leading
            },
            if trailing_neighbor.is_some() {
                Alignment::Leading
            } else {
                Alignment::Trailing
            },
        );
        let keep_hole = (leading_neighbor.is_some() && trailing_neighbor.is_some())
            || m.parent(super_parent).is_none()
            || leading_neighbor.is_some_and(|n| {
                m.effective_alignment_at(n, Alignment::Trailing) == Some(Alignment::Trailing)
            })
            || trailing_neighbor.is_some_and(|n| {
                m.effective_alignment_at(n, Alignment::Leading) == Some(Alignment::Leading)
            });
        if keep_hole {
            let (min, max) = if was_resizing && !rest_resizing {
                (NOT_EXPLICITLY_DEFINED, INFINITE_SIZE)
            } else {
                (USE_PREFERRED_SIZE, USE_PREFERRED_SIZE)
            };
            let model = self.model_mut();
            let gap = model.new_gap(min, cut_size.max(0), max);
            model.add_interval(gap, parent, Some(index));
        } else {
            if m.child_count(parent) == 1 {
                let alignment = m.raw_alignment(parent);
                let model = self.model_mut();
                let last = model.remove_interval_at(parent, 0);
                let at = model.remove_interval(parent);
                model.add_interval(last, super_parent, Some(at));
                model.set_interval_alignment(last, alignment);
            } else {
                let lead_src = match (leading_neighbor, trailing_neighbor) {
                    (None, Some(t)) => t,
                    _ => parent,
                };
                let trail_src = match (leading_neighbor, trailing_neighbor) {
                    (Some(l), None) => l,
                    _ => parent,
                };
                let l = m.space(lead_src).pos(axis, Alignment::Leading);
                let t = m.space(trail_src).pos(axis, Alignment::Trailing);
                self.model_mut().space_mut(parent).set_axis(axis, l, t);
            }
            let remaining_size = self
                .model()
                .known_current_size(parent, axis)
                .map_or(UNKNOWN, |size| size - cut_size);
            self.maintain_size(
                super_parent,
                was_resizing || rest_resizing,
                axis,
                Some(parent),
                remaining_size,
            );
        }
        if was_resizing && !rest_resizing && self.model().is_alive(super_parent) {
            self.ops.enable_group_resizing(super_parent);
        }
    }

    /// Make a gap or component resizable or fixed, remembering a fill
    /// attribute across the switch.
    pub(super) fn set_interval_resizing(&mut self, interval: IntervalId, resizable: bool) {
        self.switch_fill_attribute(interval, resizable);
        let model = self.model_mut();
        let pref = model.pref_size(interval);
        if resizable {
            model.set_interval_size(interval, NOT_EXPLICITLY_DEFINED, pref, INFINITE_SIZE);
        } else {
            model.set_interval_size(interval, USE_PREFERRED_SIZE, pref, USE_PREFERRED_SIZE);
        }
    }

    pub(super) fn switch_fill_attribute(&mut self, interval: IntervalId, resizable: bool) {
        let model = self.model_mut();
        let (from, to) = if resizable {
            (Attributes::FILL, Attributes::FORMER_FILL)
        } else {
            (Attributes::FORMER_FILL, Attributes::FILL)
        };
        if model.has_attribute(interval, from) {
            model.change_interval_attribute(interval, to, true);
            model.change_interval_attribute(interval, from, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use hashbrown::HashSet;

    use super::super::Upkeep;
    use crate::mapper::{Paddings, TableMapper};
    use crate::model::LayoutModel;
    use crate::types::{Alignment, Attributes, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE};

    fn mapper() -> TableMapper {
        TableMapper::new(Paddings {
            related: 6,
            unrelated: 12,
            separate: 18,
            indent: 12,
            container: 10,
        })
    }

    #[test]
    fn single_child_groups_dissolve() {
        let mut model = LayoutModel::new();
        let form = model.create_component("form", true);
        model.add_root_component(form);
        let a = model.create_component("a", false);
        model.add_component(a, form, None).unwrap();
        let root = model.default_root(form, Axis::Horizontal).unwrap();
        let a_int = model.component_interval(a, Axis::Horizontal);
        let seq = model.new_sequential();
        let par = model.new_parallel(Alignment::Leading);
        model.add_interval(a_int, par, None);
        model.add_interval(par, seq, None);
        model.add_interval(seq, root, None);

        let mapper = mapper();
        let mut updated = HashSet::new();
        let mut upkeep = Upkeep::new(&mut model, &mapper, false);
        upkeep.destroy_all_redundant_groups(&mut updated);
        assert!(updated.contains(&form));
        assert_eq!(model.parent(a_int), Some(root));
        model.check_integrity().unwrap();
    }

    #[test]
    fn gap_only_group_is_taken_out() {
        let mut model = LayoutModel::new();
        let form = model.create_component("form", true);
        model.add_root_component(form);
        let a = model.create_component("a", false);
        model.add_component(a, form, None).unwrap();
        let root = model.default_root(form, Axis::Horizontal).unwrap();
        let a_int = model.component_interval(a, Axis::Horizontal);
        model.add_interval(a_int, root, None);
        let seq = model.new_sequential();
        let gap = model.new_gap(10, 10, 10);
        model.add_interval(gap, seq, None);
        model.add_interval(seq, root, None);
        assert_eq!(model.child_count(root), 2);

        let mapper = mapper();
        let mut upkeep = Upkeep::new(&mut model, &mapper, false);
        assert!(upkeep.destroy_redundant_groups(root));
        assert_eq!(model.children(root), [a_int]);
        assert!(model.parent(seq).is_none());
    }

    #[test]
    fn consecutive_gaps_merge() {
        let mut model = LayoutModel::new();
        let form = model.create_component("form", true);
        model.add_root_component(form);
        let root = model.default_root(form, Axis::Horizontal).unwrap();
        let seq = model.new_sequential();
        let g1 = model.new_gap(10, 10, 10);
        let g2 = model.new_gap(15, 15, 15);
        model.add_interval(g1, seq, None);
        model.add_interval(g2, seq, None);
        model.add_interval(seq, root, None);

        let mapper = mapper();
        let mut upkeep = Upkeep::new(&mut model, &mapper, false);
        upkeep.eliminate_consecutive_gaps(seq, 0, Axis::Horizontal);
        assert_eq!(model.child_count(seq), 1);
        assert!(model.is_gap(model.child(seq, 0)));
    }

    #[test]
    fn fill_survives_a_resizing_round_trip() {
        let mut model = LayoutModel::new();
        let gap = model.new_gap(NOT_EXPLICITLY_DEFINED, 20, USE_PREFERRED_SIZE);
        model.change_interval_attribute(gap, Attributes::FILL, true);
        let mapper = mapper();
        let mut upkeep = Upkeep::new(&mut model, &mapper, false);
        upkeep.set_interval_resizing(gap, true);
        assert!(upkeep.model().has_attribute(gap, Attributes::FORMER_FILL));
        assert!(!upkeep.model().has_attribute(gap, Attributes::FILL));
        assert_eq!(upkeep.model().max_size(gap), INFINITE_SIZE);
        upkeep.set_interval_resizing(gap, false);
        assert!(model.has_attribute(gap, Attributes::FILL));
        assert_eq!(model.min_size(gap), USE_PREFERRED_SIZE);
        assert_eq!(model.pref_size(gap), 20);
    }
}
