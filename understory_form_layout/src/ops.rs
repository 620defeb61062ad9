// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural edits shared by the insertion engine and the designer.
//!
//! Every edit goes through the [`LayoutModel`]; the [`VisualMapper`] is only
//! consulted for default padding sizes. Operations assume a consistent tree:
//! precondition violations trip a `debug_assert!` and otherwise leave the
//! model alone.

use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::mapper::VisualMapper;
use crate::model::{ComponentKey, IntervalId, LayoutModel};
use crate::region::{Region, UNKNOWN, abs_distance, is_valid_coordinate, span};
use crate::types::{
    Alignment, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
};
use crate::utils::size_of_default_gap;

/// A run of sibling intervals cut out of a sequence by [`Operations::extract`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemainderList {
    /// Effective alignment of the first interval of the run before it was cut.
    pub alignment: Option<Alignment>,
    /// The detached intervals, in their former order.
    pub intervals: Vec<IntervalId>,
}

impl RemainderList {
    fn is_single_gap(&self, model: &LayoutModel) -> bool {
        self.intervals.len() == 1 && model.is_gap(self.intervals[0])
    }
}

/// Tree edits on a model, measuring default gaps through a mapper.
pub struct Operations<'a> {
    model: &'a mut LayoutModel,
    mapper: &'a dyn VisualMapper,
}

impl core::fmt::Debug for Operations<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Operations")
            .field("change_mark", &self.model.change_mark())
            .finish_non_exhaustive()
    }
}

impl<'a> Operations<'a> {
    /// Operate on `model`.
    pub fn new(model: &'a mut LayoutModel, mapper: &'a dyn VisualMapper) -> Self {
        Self { model, mapper }
    }

    /// The model being edited.
    pub fn model(&self) -> &LayoutModel {
        self.model
    }

    /// Mutable access to the model being edited.
    pub fn model_mut(&mut self) -> &mut LayoutModel {
        self.model
    }

    /// The mapper used for default padding sizes.
    pub fn mapper(&self) -> &'a dyn VisualMapper {
        self.mapper
    }

    // --- extraction ---

    /// Cut the siblings around `leading..=trailing` out of their sequence.
    ///
    /// Without `closed`, an edge `alignment` keeps everything from the pivot
    /// towards the opposite edge in the sequence. The cut runs are appended
    /// to `rest_leading` and `rest_trailing`. Returns how many intervals
    /// stay in the sequence.
    pub fn extract(
        &mut self,
        leading: IntervalId,
        trailing: IntervalId,
        alignment: Option<Alignment>,
        closed: bool,
        rest_leading: &mut Vec<RemainderList>,
        rest_trailing: &mut Vec<RemainderList>,
    ) -> usize {
        let Some(seq) = self.model.parent(leading) else {
            debug_assert!(false, "extracting a detached interval");
            return 0;
        };
        debug_assert!(self.model.is_sequential(seq));
        let count = self.model.child_count(seq);
        let leading_index = self.model.index_of(seq, leading).unwrap_or(0);
        let trailing_index = self.model.index_of(seq, trailing).unwrap_or(leading_index);
        let extract_count = if closed {
            (trailing_index + 1).saturating_sub(leading_index)
        } else {
            match alignment {
                Some(Alignment::Leading) => count - leading_index,
                Some(Alignment::Trailing) => leading_index + 1,
                _ => 1,
            }
        };
        if extract_count >= count {
            return extract_count;
        }

        #[allow(
            clippy::cast_possible_wrap,
            reason = "Child counts are far below isize::MAX."
        )]
        let (start, end) = {
            let (li, ti, n) = (
                leading_index as isize,
                trailing_index as isize,
                extract_count as isize,
            );
            if alignment == Some(Alignment::Leading) {
                (li, ti + n - 1)
            } else {
                (li - n + 1, ti)
            }
        };
        let mut before: Option<RemainderList> = None;
        let mut after: Option<RemainderList> = None;
        for (idx, &li) in self.model.children(seq).iter().enumerate() {
            #[allow(
                clippy::cast_possible_wrap,
                reason = "Child counts are far below isize::MAX."
            )]
            let idx = idx as isize;
            let run = if idx < start {
                &mut before
            } else if idx > end {
                &mut after
            } else {
                continue;
            };
            run.get_or_insert_with(|| RemainderList {
                alignment: self.model.effective_alignment(li),
                intervals: Vec::new(),
            })
            .intervals
            .push(li);
        }
        for (run, rest) in [(before, rest_leading), (after, rest_trailing)] {
            if let Some(run) = run {
                for &li in &run.intervals {
                    self.model.remove_interval(li);
                }
                rest.push(run);
            }
        }
        extract_count
    }

    /// Put runs cut by [`extract`](Self::extract) back into `seq` at `index`.
    ///
    /// Lone gaps merge into one gap; a single run goes straight into the
    /// sequence; several runs become a parallel group, which is returned.
    /// `position` is the side of the pivot the runs came from.
    pub fn add_group_content(
        &mut self,
        mut list: Vec<RemainderList>,
        seq: IntervalId,
        index: usize,
        axis: Axis,
        position: Alignment,
    ) -> Option<IntervalId> {
        debug_assert!(self.model.is_sequential(seq) && position.is_edge());
        let mut resizing_fill_gap = false;
        let mut common_gap: Option<IntervalId> = None;
        let mut only_gaps = true;
        for i in (0..list.len()).rev() {
            debug_assert!(!list[i].intervals.is_empty());
            if list[i].is_single_gap(self.model) {
                let gap = list[i].intervals[0];
                if common_gap.is_none_or(|g| self.model.pref_size(gap) > self.model.pref_size(g)) {
                    common_gap = Some(gap);
                }
                if self.model.can_resize(gap) {
                    resizing_fill_gap = true;
                }
                list.remove(i);
            } else {
                only_gaps = false;
            }
        }

        if only_gaps {
            if let Some(gap) = common_gap {
                if resizing_fill_gap && !self.model.can_resize(gap) {
                    let pref = self.model.pref_size(gap);
                    self.model
                        .set_interval_size(gap, NOT_EXPLICITLY_DEFINED, pref, INFINITE_SIZE);
                }
                self.insert_gap_into_sequence(gap, seq, index, axis);
            }
            return None;
        }

        if list.len() == 1 {
            let run = &list[0].intervals;
            let n = run.len();
            for i in (0..n).rev() {
                let li = run[i];
                self.fill_gap_if_needed(li, resizing_fill_gap, i, n, position);
                if i == 0 && self.model.is_gap(li) {
                    self.insert_gap_into_sequence(li, seq, index, axis);
                } else {
                    self.model.add_interval(li, seq, Some(index));
                }
            }
            return None;
        }

        let group = self.model.new_parallel(Alignment::Leading);
        for run in &list {
            let interval = if run.intervals.len() == 1 {
                let li = run.intervals[0];
                if run.alignment.is_some_and(Alignment::is_edge) {
                    self.model.set_interval_alignment(li, run.alignment);
                }
                li
            } else {
                let sub = self.model.new_sequential();
                if run.alignment.is_some_and(Alignment::is_edge) {
                    self.model.set_interval_alignment(sub, run.alignment);
                }
                let n = run.intervals.len();
                for (i, &li) in run.intervals.iter().enumerate() {
                    self.fill_gap_if_needed(li, resizing_fill_gap, i, n, position);
                    self.model.add_interval(li, sub, None);
                }
                sub
            };
            self.model.add_interval(interval, group, None);
        }
        self.model.add_interval(group, seq, Some(index));
        Some(group)
    }

    /// Make the outer gap of a run resizing when a resizing lone gap was absorbed.
    fn fill_gap_if_needed(
        &mut self,
        li: IntervalId,
        resizing_fill_gap: bool,
        i: usize,
        n: usize,
        position: Alignment,
    ) {
        if resizing_fill_gap
            && self.model.is_gap(li)
            && !self.model.can_resize(li)
            && ((i == 0 && position == Alignment::Trailing)
                || (i + 1 == n && position == Alignment::Leading))
        {
            let pref = self.model.pref_size(li);
            self.model
                .set_interval_size(li, NOT_EXPLICITLY_DEFINED, pref, INFINITE_SIZE);
        }
    }

    /// Put `interval` into `target` at `index` (append when `None`), merging
    /// compatible groups instead of nesting them.
    ///
    /// Returns true if `interval` was dissolved into `target`.
    pub fn add_content(
        &mut self,
        interval: IntervalId,
        target: IntervalId,
        index: Option<usize>,
    ) -> bool {
        if self.model.is_group(interval) && self.model.child_count(interval) == 1 {
            let only = self.model.remove_interval_at(interval, 0);
            return self.add_content(only, target, index);
        }
        let m = &*self.model;
        if m.is_sequential(interval) && m.is_sequential(target) {
            let mut index = index.unwrap_or(m.child_count(target));
            while self.model.child_count(interval) > 0 {
                let li = self.model.remove_interval_at(interval, 0);
                self.model.add_interval(li, target, Some(index));
                index += 1;
            }
            return true;
        }
        if m.is_parallel(interval) && m.is_parallel(target) {
            let align = m
                .alignment(interval)
                .unwrap_or_else(|| m.group_alignment(target));
            let mut same_align = true;
            for &li in m.children(interval) {
                if m.want_resize(li) {
                    same_align = true;
                    break;
                }
                if m.alignment(li) != Some(align) {
                    same_align = false;
                }
            }
            if same_align
                && (m.can_resize(interval) || !m.can_resize(target) || !m.want_resize(target))
            {
                debug_assert!(m.parent(interval).is_none());
                let regroup = m.group_alignment(interval) != m.group_alignment(target);
                let mut index = index;
                while self.model.child_count(interval) > 0 {
                    let li = self.model.child(interval, 0);
                    if regroup && self.model.raw_alignment(li).is_none() {
                        let effective = self.model.alignment(li);
                        self.model.set_interval_alignment(li, effective);
                    }
                    self.model.remove_interval(li);
                    self.model.add_interval(li, target, index);
                    if let Some(i) = index.as_mut() {
                        *i += 1;
                    }
                }
                if !self.model.can_resize(interval) && self.model.can_resize(target) {
                    self.suppress_group_resizing(target);
                }
                return true;
            }
            self.model.add_interval(interval, target, index);
            return false;
        }
        if m.is_sequential(target) && m.raw_alignment(interval).is_some() {
            self.model.set_interval_alignment(interval, None);
        }
        self.model.add_interval(interval, target, index);
        false
    }

    // --- sizes ---

    /// Set the preferred size of an interval, keeping a fixed interval fixed.
    pub fn resize_interval(&mut self, interval: IntervalId, size: i32) {
        debug_assert!(size >= 0 || size == NOT_EXPLICITLY_DEFINED);
        let m = &*self.model;
        let (min, pref, max) = (m.min_size(interval), m.pref_size(interval), m.max_size(interval));
        let new_min = if min == pref && max < INFINITE_SIZE {
            size
        } else {
            min
        };
        let new_max = if max == pref {
            if size == NOT_EXPLICITLY_DEFINED {
                USE_PREFERRED_SIZE
            } else {
                size
            }
        } else {
            max
        };
        self.model.set_interval_size(interval, new_min, size, new_max);
    }

    /// Keep a non-root group at its preferred size.
    pub fn suppress_group_resizing(&mut self, group: IntervalId) {
        if self.model.parent(group).is_some() {
            let (min, pref) = (self.model.min_size(group), self.model.pref_size(group));
            self.model
                .set_interval_size(group, min, pref, USE_PREFERRED_SIZE);
        }
    }

    /// Let a group grow with its content again.
    pub fn enable_group_resizing(&mut self, group: IntervalId) {
        let (min, pref) = (self.model.min_size(group), self.model.pref_size(group));
        self.model
            .set_interval_size(group, min, pref, NOT_EXPLICITLY_DEFINED);
    }

    /// Fix every resizing gap around `interval` up to the first fixed parallel ancestor.
    pub fn suppress_resizing_of_surrounding_gaps(&mut self, interval: IntervalId) {
        let mut interval = interval;
        while let Some(parent) = self.model.parent(interval) {
            if self.model.is_sequential(parent) {
                for sub in self.model.children(parent).to_vec() {
                    if sub != interval && self.model.is_gap(sub) && self.model.can_resize(sub) {
                        let pref = self.model.pref_size(sub);
                        let min = if self.model.min_size(sub) == pref {
                            pref
                        } else {
                            USE_PREFERRED_SIZE
                        };
                        self.model
                            .set_interval_size(sub, min, pref, USE_PREFERRED_SIZE);
                    }
                }
            } else if !self.model.can_resize(parent) {
                break;
            }
            interval = parent;
        }
    }

    // --- dissolving ---

    /// Dissolve redundant parallel subgroups of `group`, deepest first.
    pub fn merge_parallel_groups(&mut self, group: IntervalId) {
        debug_assert!(self.model.is_parallel(group));
        if !self.model.is_parallel(group) {
            return;
        }
        let mut i = self.model.child_count(group);
        while i > 0 {
            i -= 1;
            if i >= self.model.child_count(group) {
                continue;
            }
            let sub = self.model.child(group, i);
            if self.model.is_parallel(sub) {
                self.merge_parallel_groups(sub);
                self.dissolve_redundant_group(sub);
            }
        }
    }

    /// Move the children of `group` into its parent if the group adds nothing.
    ///
    /// That is the case for a single child, a sequence in a sequence, and a
    /// parallel group whose alignment and resizing fit the parallel parent.
    pub fn dissolve_redundant_group(&mut self, group: IntervalId) -> bool {
        let Some(parent) = self.model.parent(group) else {
            return false;
        };
        let m = &*self.model;
        let dissolve = if m.child_count(group) == 1
            || (m.is_sequential(group) && m.is_sequential(parent))
        {
            true
        } else if m.is_parallel(group) && m.is_parallel(parent) {
            let align = m.alignment(group);
            let several = m.child_count(group) > 1;
            let mut same_align = true;
            let mut sub_resizing = false;
            for &li in m.children(group) {
                if !sub_resizing && m.want_resize(li) {
                    sub_resizing = true;
                }
                if several && m.alignment(li) != align {
                    same_align = false;
                }
            }
            if sub_resizing && (same_align || m.group_alignment(group) != Alignment::Baseline) {
                let mut compatible = false;
                if m.can_resize(group) || !m.can_resize(parent) {
                    compatible = m
                        .children(parent)
                        .iter()
                        .any(|&li| li != group && m.want_resize(li));
                    if !compatible {
                        let neighbor = align
                            .filter(|a| a.is_edge())
                            .and_then(|a| m.neighbor(parent, a.opposite(), false, true, true));
                        compatible = neighbor.is_some_and(|n| {
                            m.is_gap(n) && m.pref_size(n) == NOT_EXPLICITLY_DEFINED
                        });
                    }
                }
                compatible
            } else {
                same_align
            }
        } else {
            false
        };
        if !dissolve {
            return false;
        }

        let mut index = self.model.remove_interval(group);
        let parent_parallel = self.model.is_parallel(parent);
        let group_parallel = self.model.is_parallel(group);
        let regroup = self.model.group_alignment(group) != self.model.group_alignment(parent);
        let group_alignment = self.model.raw_alignment(group);
        while self.model.child_count(group) > 0 {
            let li = self.model.child(group, 0);
            if parent_parallel {
                if group_parallel {
                    if self.model.raw_alignment(li).is_none() && regroup {
                        let effective = self.model.alignment(li);
                        self.model.set_interval_alignment(li, effective);
                    }
                } else {
                    self.model.set_interval_alignment(li, group_alignment);
                }
            } else if self.model.raw_alignment(li).is_some() {
                self.model.set_interval_alignment(li, None);
            }
            self.model.remove_interval(li);
            self.model.add_interval(li, parent, Some(index));
            index += 1;
        }
        true
    }

    // --- sequence restructuring ---

    /// Pull the content following a parallel group in `parent` inside the
    /// group, next to the member it lines up with.
    ///
    /// Tried from the trailing end first, then from the leading end.
    pub fn move_inside_sequential(&mut self, parent: IntervalId, axis: Axis) {
        debug_assert!(self.model.is_sequential(parent));
        if !self.model.is_sequential(parent) {
            return;
        }
        let mut alignment = Alignment::Leading;
        loop {
            let mut extend = self.find_interval_to_extend(parent, axis, alignment);
            if extend.is_none() && alignment == Alignment::Leading {
                alignment = Alignment::Trailing;
                extend = self.find_interval_to_extend(parent, axis, alignment);
            }
            let Some(mut extend) = extend else {
                break;
            };
            let Some(in_group) = self.model.parent(extend) else {
                break;
            };
            let mut out_group = in_group;
            while let Some(p) = self.model.parent(out_group) {
                if p == parent {
                    break;
                }
                out_group = p;
            }
            let Some(index) = self.model.index_of(parent, out_group) else {
                debug_assert!(false, "extended interval is not inside the sequence");
                break;
            };
            let d = alignment.step();
            let far = alignment.opposite();

            let mut common_ending_gap = true;
            let n = self.model.child_count(parent);
            let mut i = index as isize - d;
            while i >= 0 && (i as usize) < n {
                let li = self.model.child(parent, i as usize);
                let next = i - d;
                if (!self.model.is_gap(li) || (next >= 0 && (next as usize) < n))
                    && self.model.want_resize(li)
                {
                    let end_gap = if alignment == Alignment::Leading {
                        self.model.child(parent, n - 1)
                    } else {
                        self.model.child(parent, 0)
                    };
                    if self.model.pref_size(end_gap) != NOT_EXPLICITLY_DEFINED {
                        common_ending_gap = false;
                        let border_pos = self.model.space(parent).pos(axis, far);
                        let mut closing = extend;
                        loop {
                            let Some(par) = self.model.parent(closing) else {
                                break;
                            };
                            if self.model.is_parallel(par) {
                                self.separate_group_content(closing, border_pos, axis, far);
                            }
                            closing = par;
                            if closing == out_group {
                                break;
                            }
                        }
                    }
                    break;
                }
                i -= d;
            }

            let extend_pos = self.model.space(extend).pos(axis, far);
            if !self.model.is_sequential(extend) {
                let seq = self.model.new_sequential();
                let align = self.model.alignment(extend);
                self.model.set_interval_alignment(seq, align);
                let Some(extend_parent) = self.model.parent(extend) else {
                    break;
                };
                let at = self.model.remove_interval(extend);
                self.model.add_interval(seq, extend_parent, Some(at));
                self.model.set_interval_alignment(extend, None);
                self.model.add_interval(extend, seq, Some(0));
                extend = seq;
            }

            let mut connecting_gap: Option<IntervalId> = None;
            let (mut idx, mut add_idx) = if alignment == Alignment::Leading {
                (index as isize + 1, self.model.child_count(extend))
            } else {
                (index as isize - 1, 0)
            };
            while idx >= 0 && (idx as usize) < self.model.child_count(parent) {
                let li = self.model.child(parent, idx as usize);
                if self.model.is_gap(li) {
                    if connecting_gap.is_none() {
                        let beyond = idx - d;
                        if extend_pos != self.model.space(out_group).pos(axis, far)
                            && beyond >= 0
                            && (beyond as usize) < self.model.child_count(parent)
                        {
                            let neighbor = self.model.child(parent, beyond as usize);
                            let neighbor_pos = self.model.space(neighbor).pos(axis, alignment);
                            let distance = alignment.sign() * (extend_pos - neighbor_pos);
                            if distance > 0 {
                                self.resize_interval(li, distance);
                            }
                        }
                        connecting_gap = Some(li);
                    } else if (idx == 0 || idx as usize == self.model.child_count(parent) - 1)
                        && common_ending_gap
                    {
                        break;
                    }
                }
                self.model.remove_interval(li);
                self.model.add_interval(li, extend, Some(add_idx));
                if alignment == Alignment::Leading {
                    add_idx += 1;
                } else {
                    idx -= 1;
                }
            }

            if self.model.child_count(parent) == 1 {
                debug_assert_eq!(self.model.child(parent, 0), out_group);
                let Some(super_parent) = self.model.parent(parent) else {
                    break;
                };
                self.model.remove_interval(out_group);
                let at = self.model.remove_interval(parent);
                self.add_content(out_group, super_parent, Some(at));
                break;
            }
        }
    }

    /// Find a member of a parallel group inside `parent` that lines up with
    /// the content after the group on the `alignment` side.
    fn find_interval_to_extend(
        &mut self,
        parent: IntervalId,
        axis: Axis,
        alignment: Alignment,
    ) -> Option<IntervalId> {
        let count = self.model.child_count(parent);
        let d = alignment.step();
        let mut idx = if alignment == Alignment::Leading {
            count as isize - 1
        } else {
            0
        };
        let mut at_border = true;
        let mut gap = false;
        while idx >= 0 && (idx as usize) < self.model.child_count(parent) {
            let sub = self.model.child(parent, idx as usize);
            if self.model.is_gap(sub) {
                gap = true;
            } else {
                if !at_border
                    && gap
                    && self.model.is_parallel(sub)
                    && !self.model.is_closed_group(sub, alignment.opposite())
                {
                    let last = self.model.child_count(parent) - 1;
                    let (start, end) = if alignment == Alignment::Leading {
                        (idx as usize + 1, last)
                    } else {
                        (0, idx as usize - 1)
                    };
                    if let Some(extend) = self.prepare_group_extension(
                        sub,
                        parent,
                        start,
                        end,
                        axis,
                        alignment.opposite(),
                    ) {
                        return Some(extend);
                    }
                }
                gap = false;
                at_border = false;
            }
            idx += d;
        }
        None
    }

    /// Pick the members of `group` overlapping, on the other axis, the
    /// children `start..=end` of `parent`; several get wrapped in a subgroup.
    ///
    /// Returns nothing when no member or every member overlaps.
    fn prepare_group_extension(
        &mut self,
        group: IntervalId,
        parent: IntervalId,
        start: usize,
        end: usize,
        axis: Axis,
        alignment: Alignment,
    ) -> Option<IntervalId> {
        let mut all_overlapping = true;
        let mut overlaps: Vec<IntervalId> = Vec::new();
        for &li in self.model.children(group) {
            if self.model.is_gap(li) {
                continue;
            }
            if self
                .model
                .content_overlap(li, parent, Some((start, end)), axis.other())
            {
                overlaps.push(li);
            } else {
                all_overlapping = false;
            }
        }
        if all_overlapping || overlaps.is_empty() {
            return None;
        }

        if overlaps.len() > 1 {
            let sub_group = self.model.new_parallel(alignment.opposite());
            self.model
                .set_interval_alignment(sub_group, Some(alignment.opposite()));
            let mut index = None;
            for li in overlaps {
                let idx = self.model.remove_interval(li);
                index.get_or_insert(idx);
                self.model.add_interval(li, sub_group, None);
                let space = *self.model.space(li);
                self.model.space_mut(sub_group).expand(&space);
            }
            self.model.add_interval(sub_group, group, index);
            return Some(sub_group);
        }

        let single = overlaps[0];
        let sub_parallel = if self.model.is_sequential(single) {
            let n = self.model.child_count(single);
            let edge_child = if alignment == Alignment::Leading {
                self.model.child(single, 0)
            } else {
                self.model.child(single, n - 1)
            };
            Some(edge_child).filter(|&c| self.model.is_parallel(c))
        } else if self.model.is_parallel(single) {
            Some(single)
        } else {
            None
        };
        if let Some(sub_parallel) = sub_parallel {
            if !self.model.is_closed_group(sub_parallel, alignment) {
                if let Some(sub_overlap) = self.prepare_group_extension(
                    sub_parallel,
                    parent,
                    start,
                    end,
                    axis,
                    alignment,
                ) {
                    return Some(sub_overlap);
                }
            }
        }
        Some(single)
    }

    /// Move every sibling of `separate` into one remainder, kept apart from
    /// the `alignment` edge by a gap ending at `out_pos` (or by the gap
    /// already following the group).
    fn separate_group_content(
        &mut self,
        separate: IntervalId,
        out_pos: i32,
        axis: Axis,
        alignment: Alignment,
    ) {
        let Some(group) = self.model.parent(separate) else {
            return;
        };
        debug_assert!(self.model.is_parallel(group));
        let mut remainder: Option<IntervalId> = None;
        let mut remainder_group: Option<IntervalId> = None;
        let mut remainder_space: Option<Region> = None;
        let mut i = 0;
        while i < self.model.child_count(group) {
            let li = self.model.child(group, i);
            if li == separate {
                i += 1;
                continue;
            }
            self.model.remove_interval(li);
            match (remainder, remainder_group) {
                (None, _) => remainder = Some(li),
                (Some(first), None) => {
                    let rg = self.model.new_parallel(alignment.opposite());
                    self.model
                        .set_interval_alignment(rg, Some(alignment.opposite()));
                    self.model.add_interval(first, rg, Some(0));
                    self.model.add_interval(li, rg, None);
                    remainder = Some(rg);
                    remainder_group = Some(rg);
                }
                (Some(_), Some(rg)) => {
                    self.model.add_interval(li, rg, None);
                }
            }
            if !self.model.is_gap(li) {
                let space = *self.model.space(li);
                remainder_space
                    .get_or_insert_with(Region::new)
                    .expand(&space);
            }
        }
        let Some(remainder) = remainder else {
            return;
        };
        let Some(remainder_space) = remainder_space else {
            self.model.add_interval(remainder, group, None);
            return;
        };
        *self.model.space_mut(remainder) = remainder_space;

        let remainder_pos = remainder_space.pos(axis, alignment);
        let gap_size = |out: i32| {
            if alignment == Alignment::Leading {
                remainder_pos - out
            } else {
                out - remainder_pos
            }
        };
        let mut out_pos = out_pos;
        let remainder_gap = if is_valid_coordinate(out_pos) {
            Some(
                self.model
                    .new_gap(NOT_EXPLICITLY_DEFINED, gap_size(out_pos), INFINITE_SIZE),
            )
        } else {
            match self.model.direct_neighbor(group, alignment, false) {
                Some(gap) if self.model.is_gap(gap) => {
                    self.model.remove_interval(gap);
                    out_pos = match self.model.direct_neighbor(group, alignment, true) {
                        Some(neighbor) => self.model.space(neighbor).pos(axis, alignment.opposite()),
                        None => match self.model.parent(group) {
                            Some(p) => self.model.space(p).pos(axis, alignment),
                            None => remainder_pos,
                        },
                    };
                    self.resize_interval(gap, gap_size(out_pos).max(0));
                    Some(gap)
                }
                _ => None,
            }
        };

        if let Some(gap) = remainder_gap {
            let seq = if self.model.is_sequential(remainder) {
                remainder
            } else {
                let seq = self.model.new_sequential();
                self.model.set_interval_alignment(remainder, None);
                self.model.add_interval(remainder, seq, Some(0));
                seq
            };
            let at = if alignment == Alignment::Leading {
                Some(0)
            } else {
                None
            };
            self.model.add_interval(gap, seq, at);
            self.model.add_interval(seq, group, None);
            self.model.space_mut(group).set_pos(axis, alignment, out_pos);
        } else {
            self.model.add_interval(remainder, group, None);
        }
    }

    /// Take `interval` out of its parallel group and place it in parallel
    /// with the nearest enclosing sequence, spanning from the group's
    /// position to `end_index` (the sequence end when `None`).
    pub fn parallelize_with_parent_sequence(
        &mut self,
        interval: IntervalId,
        end_index: Option<usize>,
        axis: Axis,
    ) {
        let Some(parent) = self.model.parent(interval) else {
            return;
        };
        debug_assert!(self.model.is_parallel(parent));
        let mut par_parent = parent;
        let parent_seq = loop {
            match self.model.parent(par_parent) {
                Some(p) if self.model.is_sequential(p) => break p,
                Some(p) => par_parent = p,
                None => return,
            }
        };
        let Some(mut start) = self.model.index_of(parent_seq, par_parent) else {
            return;
        };
        let mut end = match end_index {
            None => self.model.child_count(parent_seq) - 1,
            Some(end) => end,
        };
        if start > end {
            core::mem::swap(&mut start, &mut end);
        }
        self.model.remove_interval(interval);
        if self.model.raw_alignment(interval).is_none() {
            let align = self.model.group_alignment(parent);
            self.model.set_interval_alignment(interval, Some(align));
        }
        self.add_parallel_with_sequence(interval, parent_seq, start, end, axis);

        match self.model.child_count(parent) {
            1 => {
                let only = self.model.remove_interval_at(parent, 0);
                if let Some(super_parent) = self.model.parent(parent) {
                    let at = self.model.remove_interval(parent);
                    self.add_content(only, super_parent, Some(at));
                }
            }
            0 => {
                if self.model.parent(parent).is_some() {
                    self.model.remove_interval(parent);
                }
            }
            _ => {}
        }
    }

    /// Place `interval` in parallel with children `start..=end` of `seq`,
    /// wrapping them in a new parallel group unless they span the whole sequence.
    pub fn add_parallel_with_sequence(
        &mut self,
        interval: IntervalId,
        seq: IntervalId,
        start: usize,
        end: usize,
        axis: Axis,
    ) {
        let count = self.model.child_count(seq);
        let group = if start > 0 || end + 1 < count {
            let group = self.model.new_parallel(Alignment::Leading);
            if let Some(align) = self.model.raw_alignment(interval) {
                self.model.set_group_alignment(group, align);
            }
            let start_pos = self
                .model
                .visual_position(self.model.child(seq, start), axis, Alignment::Leading);
            let end_pos = self
                .model
                .visual_position(self.model.child(seq, end), axis, Alignment::Trailing);
            self.model.space_mut(group).set_axis(axis, start_pos, end_pos);
            if start != end {
                let sub_seq = self.model.new_sequential();
                let align = self.model.alignment(seq);
                self.model.set_interval_alignment(sub_seq, align);
                for _ in start..=end {
                    let li = self.model.remove_interval_at(seq, start);
                    self.model.add_interval(li, sub_seq, None);
                }
                self.model.add_interval(sub_seq, group, Some(0));
            } else {
                let li = self.model.remove_interval_at(seq, start);
                self.model.add_interval(li, group, Some(0));
            }
            self.model.add_interval(group, seq, Some(start));
            group
        } else {
            match self.model.parent(seq) {
                Some(p) => p,
                None => return,
            }
        };
        self.model.add_interval(interval, group, None);
    }

    // --- gaps ---

    /// Hoist gaps shared by the children of parallel `group` out of it.
    ///
    /// Gaps directly in the group are dropped. When every child starts
    /// (or ends) with a gap, those gaps are replaced by a single gap outside
    /// the group, or by a filler gap when no child is anchored to that edge.
    /// Returns the group's index in its parent when a gap was placed.
    pub fn optimize_gaps(&mut self, group: IntervalId, axis: Axis) -> Option<usize> {
        let mut any_aligned_leading = false;
        let mut any_aligned_trailing = false;
        let mut any_aligned_both = false;
        let mut any_gap_leading = false;
        let mut any_gap_trailing = false;
        let mut same_min_gap_leading = true;
        let mut same_min_gap_trailing = true;
        let mut common_gap_leading_size: Option<i32> = None;
        let mut common_gap_trailing_size: Option<i32> = None;

        let mut i = 0;
        while i < self.model.child_count(group) {
            let li = self.model.child(group, i);
            i += 1;
            if self.model.is_gap(li) && self.model.child_count(group) > 1 {
                i -= 1;
                self.model.remove_interval_at(group, i);
                continue;
            }
            let m = &*self.model;
            let mut leading_align = false;
            let mut trailing_align = false;
            let mut leading_gap = None;
            let mut trailing_gap = None;
            let mut content_resizing = false;
            let mut no_resizing = false;
            if m.is_sequential(li) {
                let mut lead_gap_res = false;
                let mut trail_gap_res = false;
                let subs = m.children(li);
                for (j, &sub) in subs.iter().enumerate() {
                    if j == 0 && m.is_gap(sub) {
                        leading_gap = Some(sub);
                        lead_gap_res = m.want_resize(sub);
                    } else if j + 1 == subs.len() && m.is_gap(sub) {
                        trailing_gap = Some(sub);
                        trail_gap_res = m.want_resize(sub);
                    } else if !content_resizing && m.want_resize(sub) {
                        content_resizing = true;
                    }
                }
                if !content_resizing {
                    if lead_gap_res || trail_gap_res {
                        leading_align = trail_gap_res && !lead_gap_res;
                        trailing_align = lead_gap_res && !trail_gap_res;
                    } else {
                        no_resizing = true;
                    }
                }
            } else if m.want_resize(li) {
                content_resizing = true;
            } else {
                no_resizing = true;
            }
            if content_resizing {
                leading_align = true;
                trailing_align = true;
            } else if no_resizing {
                let alignment = m.alignment(li);
                leading_align = alignment == Some(Alignment::Leading);
                trailing_align = alignment == Some(Alignment::Trailing);
            }
            if leading_align {
                any_aligned_leading = true;
                if trailing_align {
                    any_aligned_both = true;
                }
            }
            if trailing_align {
                any_aligned_trailing = true;
            }

            let min_or_pref = |gap: IntervalId, aligned: bool| {
                if aligned || m.min_size(gap) == USE_PREFERRED_SIZE {
                    m.pref_size(gap)
                } else {
                    m.min_size(gap)
                }
            };
            match leading_gap {
                Some(gap) => {
                    any_gap_leading = true;
                    if same_min_gap_leading {
                        let size = min_or_pref(gap, leading_align);
                        match common_gap_leading_size {
                            Some(common) if common != size => same_min_gap_leading = false,
                            Some(_) => {}
                            None => common_gap_leading_size = Some(size),
                        }
                    }
                }
                None => same_min_gap_leading = false,
            }
            match trailing_gap {
                Some(gap) => {
                    any_gap_trailing = true;
                    if same_min_gap_trailing {
                        let size = min_or_pref(gap, trailing_align);
                        match common_gap_trailing_size {
                            Some(common) if common != size => same_min_gap_trailing = false,
                            Some(_) => {}
                            None => common_gap_trailing_size = Some(size),
                        }
                    }
                }
                None => same_min_gap_trailing = false,
            }
        }

        if self.model.child_count(group) <= 1 || (!any_gap_leading && !any_gap_trailing) {
            return None;
        }
        if !any_aligned_both {
            if any_aligned_trailing {
                same_min_gap_leading = false;
            }
            if any_aligned_leading {
                same_min_gap_trailing = false;
            }
        }

        let outer = *self.model.space(group);
        let inner_leading = self
            .model
            .outermost_component(group, axis, Alignment::Leading)
            .map(|c| self.model.space(c).pos(axis, Alignment::Leading))?;
        let inner_trailing = self
            .model
            .outermost_component(group, axis, Alignment::Trailing)
            .map(|c| self.model.space(c).pos(axis, Alignment::Trailing))?;
        if inner_leading == UNKNOWN || inner_trailing == UNKNOWN {
            return None;
        }

        let mut default_gap = [false, false];
        let mut default_padding: [Option<PaddingType>; 2] = [None, None];
        let mut resizing_gap = [false, false];
        let any_gap = [any_gap_leading, any_gap_trailing];
        let any_aligned = [any_aligned_leading, any_aligned_trailing];
        let same_min_gap = [same_min_gap_leading, same_min_gap_trailing];

        let mut i = 0;
        while i < self.model.child_count(group) {
            let li = self.model.child(group, i);
            if self.model.is_sequential(li) {
                for edge in Alignment::EDGES {
                    let e = edge.index();
                    if !any_gap[e] {
                        continue;
                    }
                    let n = self.model.child_count(li);
                    if n == 0 {
                        continue;
                    }
                    let mut gap = Some(if edge == Alignment::Leading {
                        self.model.child(li, 0)
                    } else {
                        self.model.child(li, n - 1)
                    })
                    .filter(|&g| self.model.is_gap(g));
                    let Some(g) = gap else {
                        continue;
                    };
                    if self.model.pref_size(g) == NOT_EXPLICITLY_DEFINED {
                        let neighbor = self.model.neighbor(g, edge, false, true, false);
                        if neighbor.is_some_and(|n| {
                            self.model.is_gap(n)
                                && self.model.pref_size(n) == NOT_EXPLICITLY_DEFINED
                        }) {
                            self.model.remove_interval(g);
                            gap = None;
                        }
                    }
                    let Some(g) = gap else {
                        continue;
                    };
                    if !any_aligned[e] || same_min_gap[e] {
                        if self.model.pref_size(g) == NOT_EXPLICITLY_DEFINED
                            && self.is_ending_default_gap_effective(li, axis, edge)
                        {
                            // Gaps at the container border stay untyped.
                            let border = self.model.neighbor(g, edge, true, true, false).is_none();
                            default_gap[e] = true;
                            default_padding[e] = self
                                .model
                                .padding_type(g)
                                .or((!border).then_some(PaddingType::Related));
                        }
                        if self.model.max_size(g) >= INFINITE_SIZE {
                            if self.model.alignment(li) == Some(edge) {
                                self.model
                                    .set_interval_alignment(li, Some(edge.opposite()));
                            }
                            if !any_aligned[e] {
                                resizing_gap[e] = true;
                            }
                        }
                        self.model.remove_interval(g);
                    }
                }
                if self.model.child_count(li) == 1 {
                    self.model.remove_interval_at(group, i);
                    let sub = self.model.remove_interval_at(li, 0);
                    let align = self.model.raw_alignment(li);
                    self.model.set_interval_alignment(sub, align);
                    self.model.add_interval(sub, group, Some(i));
                }
            }
            i += 1;
        }

        let inner = [inner_leading, inner_trailing];
        let common_size = [common_gap_leading_size, common_gap_trailing_size];
        let mut new_gaps: [Option<IntervalId>; 2] = [None, None];
        for edge in Alignment::EDGES {
            let e = edge.index();
            if !any_gap[e] {
                continue;
            }
            if !any_aligned[e] {
                let size = if edge == Alignment::Leading {
                    span(outer.pos(axis, edge), inner[e])
                } else {
                    span(inner[e], outer.pos(axis, edge))
                };
                if size > 0 || default_gap[e] {
                    let gap = self.model.new_default_gap();
                    if default_gap[e] {
                        self.model.set_padding_type(gap, default_padding[e]);
                    } else {
                        let min = if resizing_gap[e] {
                            NOT_EXPLICITLY_DEFINED
                        } else {
                            USE_PREFERRED_SIZE
                        };
                        self.model
                            .set_interval_size(gap, min, size, USE_PREFERRED_SIZE);
                    }
                    if resizing_gap[e] {
                        let (min, pref) = (self.model.min_size(gap), self.model.pref_size(gap));
                        self.model.set_interval_size(gap, min, pref, INFINITE_SIZE);
                    }
                    new_gaps[e] = Some(gap);
                }
            } else if same_min_gap[e] {
                let size = common_size[e].unwrap_or(NOT_EXPLICITLY_DEFINED);
                let gap = self.model.new_gap(size, size, USE_PREFERRED_SIZE);
                if size == NOT_EXPLICITLY_DEFINED {
                    self.model.set_padding_type(gap, default_padding[e]);
                }
                new_gaps[e] = Some(gap);
            }
        }

        if new_gaps == [None, None] {
            return None;
        }
        {
            let space = self.model.space_mut(group);
            for edge in Alignment::EDGES {
                let e = edge.index();
                if new_gaps[e].is_some() || !is_valid_coordinate(outer.pos(axis, edge)) {
                    space.set_pos(axis, edge, inner[e]);
                }
            }
            space.set_pos(axis, Alignment::Center, (inner_leading + inner_trailing) / 2);
        }
        let mut group = group;
        for edge in Alignment::EDGES {
            if let Some(gap) = new_gaps[edge.index()] {
                group = self.insert_gap(gap, group, inner[edge.index()], axis, edge);
            }
        }
        let parent = self.model.parent(group)?;
        self.model.index_of(parent, group)
    }

    /// Whether the default gap at the `edge` end of `seq` really separates
    /// its neighbor from whatever lies beyond.
    fn is_ending_default_gap_effective(&self, seq: IntervalId, axis: Axis, edge: Alignment) -> bool {
        debug_assert!(self.model.is_sequential(seq) && edge.is_edge());
        let n = self.model.child_count(seq);
        if n < 2 {
            return true;
        }
        let (gap, neighbor) = if edge == Alignment::Leading {
            (self.model.child(seq, 0), self.model.child(seq, 1))
        } else {
            (self.model.child(seq, n - 1), self.model.child(seq, n - 2))
        };
        if self.model.effective_alignment_at(neighbor, edge) == Some(edge) {
            return true;
        }
        let pref_distance = size_of_default_gap(self.model, gap, self.mapper);
        let pos1 = self.model.space(neighbor).pos(axis, edge);
        let pos2 = match self.model.neighbor(gap, edge, true, true, false) {
            Some(outer) => self.model.space(outer).pos(axis, edge.opposite()),
            None => self.model.space(self.model.root_of(seq)).pos(axis, edge),
        };
        let current_distance = if edge == Alignment::Leading {
            span(pos2, pos1)
        } else {
            span(pos1, pos2)
        };
        current_distance != UNKNOWN && current_distance <= pref_distance
    }

    /// Shorten the gap at the `edge` end of `group` (or of its single
    /// sequence) by `size`; returns false if there is no such gap or it is
    /// too small.
    pub fn cut_starting_gap(
        &mut self,
        group: IntervalId,
        size: i32,
        axis: Axis,
        edge: Alignment,
    ) -> bool {
        debug_assert!(self.model.is_group(group) && size > 0 && edge.is_edge());
        let seq = if self.model.is_sequential(group) {
            Some(group)
        } else if self.model.child_count(group) == 1 {
            let li = self.model.child(group, 0);
            (self.model.is_sequential(li) && self.model.is_aligned_at_border(li, edge))
                .then_some(li)
        } else {
            None
        };
        let Some(seq) = seq.filter(|&s| self.model.child_count(s) > 1) else {
            return false;
        };
        let n = self.model.child_count(seq);
        let gap = if edge == Alignment::Leading {
            self.model.child(seq, 0)
        } else {
            self.model.child(seq, n - 1)
        };
        if !self.model.is_gap(gap) {
            return false;
        }
        let Some(neighbor) = self.model.direct_neighbor(gap, edge.opposite(), true) else {
            return false;
        };
        let mut current_size = self.model.pref_size(gap);
        if current_size == NOT_EXPLICITLY_DEFINED {
            let distance = Region::distance(
                self.model.space(group),
                self.model.space(neighbor),
                axis,
                edge,
                edge,
            );
            if !is_valid_coordinate(distance) {
                return false;
            }
            current_size = if edge == Alignment::Trailing {
                -distance
            } else {
                distance
            };
        }
        if current_size < size {
            return false;
        }
        if current_size > size {
            self.resize_interval(gap, current_size - size);
        } else {
            self.model.remove_interval(gap);
        }
        true
    }

    /// Put `gap` at the `edge` side of `interval` (not a sequence), whose
    /// content starts at `pos`; an existing gap there absorbs it.
    ///
    /// Returns the interval the gap now borders, which differs from
    /// `interval` when a root had to be restructured.
    pub fn insert_gap(
        &mut self,
        gap: IntervalId,
        interval: IntervalId,
        pos: i32,
        axis: Axis,
        edge: Alignment,
    ) -> IntervalId {
        debug_assert!(edge.is_edge());
        debug_assert!(!self.model.is_sequential(interval));
        debug_assert!(self.model.is_gap(gap));
        let edges = |m: &LayoutModel, of: IntervalId| {
            let space = m.space(of);
            if edge == Alignment::Leading {
                (pos, space.pos(axis, Alignment::Trailing))
            } else {
                (space.pos(axis, Alignment::Leading), pos)
            }
        };

        let mut interval = interval;
        let parent = match self.model.parent(interval) {
            Some(parent) => parent,
            None => {
                debug_assert!(self.model.is_parallel(interval));
                let root = interval;
                if self.model.child_count(root) > 1 {
                    let seq = self.model.new_sequential();
                    let (l, t) = edges(self.model, root);
                    self.model.space_mut(seq).set_axis(axis, l, t);
                    self.model.add_interval(seq, root, None);
                    interval = self.model.new_parallel(Alignment::Leading);
                    let root_space = *self.model.space(root);
                    self.model.space_mut(interval).copy_axis(axis, &root_space);
                    self.model.add_interval(interval, seq, Some(0));
                    while self.model.child_count(root) > 1 {
                        let li = self.model.remove_interval_at(root, 0);
                        self.model.add_interval(li, interval, None);
                    }
                    seq
                } else if self.model.child_count(root) == 1 {
                    interval = self.model.child(root, 0);
                    if self.model.is_sequential(interval) {
                        let seq = interval;
                        let n = self.model.child_count(seq);
                        let mut sub_idx = if edge == Alignment::Leading { 0 } else { n - 1 };
                        interval = self.model.child(seq, sub_idx);
                        if self.model.is_gap(interval) {
                            let neighbor = if edge == Alignment::Leading {
                                sub_idx += 1;
                                (sub_idx < n).then(|| self.model.child(seq, sub_idx))
                            } else {
                                sub_idx.checked_sub(1).map(|i| self.model.child(seq, i))
                            };
                            let outer = *self.model.space(root);
                            let other_pos = match neighbor {
                                Some(nb) => self.model.space(nb).pos(axis, edge),
                                None => outer.pos(axis, edge.opposite()),
                            };
                            let merged_size = if edge == Alignment::Leading {
                                span(outer.pos(axis, edge), other_pos)
                            } else {
                                span(other_pos, outer.pos(axis, edge))
                            };
                            self.eat_gap(interval, gap, merged_size);
                            return neighbor.unwrap_or(interval);
                        }
                        seq
                    } else {
                        let seq = self.model.new_sequential();
                        let (l, t) = edges(self.model, interval);
                        self.model.space_mut(seq).set_axis(axis, l, t);
                        self.model.add_interval(seq, root, None);
                        self.model.remove_interval(interval);
                        self.model.add_interval(interval, seq, None);
                        seq
                    }
                } else {
                    self.model.add_interval(gap, root, None);
                    return root;
                }
            }
        };

        if self.model.is_sequential(parent) {
            match self.model.direct_neighbor(interval, edge, false) {
                Some(neighbor) if self.model.is_gap(neighbor) => {
                    let other_pos = match self.model.direct_neighbor(neighbor, edge, false) {
                        Some(next) => self.model.space(next).pos(axis, edge.opposite()),
                        None => self.model.space(parent).pos(axis, edge),
                    };
                    let merged_size = if edge == Alignment::Leading {
                        span(other_pos, pos)
                    } else {
                        span(pos, other_pos)
                    };
                    self.eat_gap(neighbor, gap, merged_size);
                }
                _ => {
                    let idx = self.model.index_of(parent, interval).unwrap_or(0)
                        + usize::from(edge == Alignment::Trailing);
                    self.model.add_interval(gap, parent, Some(idx));
                }
            }
        } else {
            let seq = self.model.new_sequential();
            let idx = self.model.remove_interval(interval);
            let align = self.model.raw_alignment(interval);
            self.model.set_interval_alignment(seq, align);
            let (l, t) = edges(self.model, interval);
            self.model.space_mut(seq).set_axis(axis, l, t);
            self.model.add_interval(seq, parent, Some(idx));
            self.model.set_interval_alignment(interval, None);
            self.model.add_interval(interval, seq, Some(0));
            let at = if edge == Alignment::Leading { 0 } else { 1 };
            self.model.add_interval(gap, seq, Some(at));
        }
        interval
    }

    /// Insert `gap` into `seq` at `index`, merging it with a gap already
    /// there; returns the index of the resulting gap.
    pub fn insert_gap_into_sequence(
        &mut self,
        gap: IntervalId,
        seq: IntervalId,
        index: usize,
        axis: Axis,
    ) -> usize {
        debug_assert!(self.model.is_gap(gap));
        let count = self.model.child_count(seq);
        let mut other = None;
        if index < count {
            let li = self.model.child(seq, index);
            if self.model.is_gap(li) {
                other = Some((li, Alignment::Trailing));
            }
        }
        if other.is_none() && index > 0 && index <= count {
            let li = self.model.child(seq, index - 1);
            if self.model.is_gap(li) {
                other = Some((li, Alignment::Leading));
            }
        }
        let Some((other_gap, alignment)) = other else {
            return self.model.add_interval(gap, seq, Some(index));
        };
        let pos1 = match self.model.direct_neighbor(other_gap, alignment, true) {
            Some(nb) => self.model.space(nb).pos(axis, alignment.opposite()),
            None => self.model.space(seq).pos(axis, alignment),
        };
        let pos2 = match self.model.direct_neighbor(other_gap, alignment.opposite(), true) {
            Some(nb) => self.model.space(nb).pos(axis, alignment),
            None => self.model.space(seq).pos(axis, alignment.opposite()),
        };
        let merged = if is_valid_coordinate(pos1) && is_valid_coordinate(pos2) {
            abs_distance(pos2 - pos1)
        } else {
            NOT_EXPLICITLY_DEFINED
        };
        self.eat_gap(other_gap, gap, merged);
        if alignment == Alignment::Leading {
            index - 1
        } else {
            index
        }
    }

    /// Merge gap `eaten` into gap `main`, removing `eaten` from its parent.
    ///
    /// Explicit sizes add up; a default-sized operand makes the result
    /// `current_merged_size`. The result resizes if either gap did.
    pub fn eat_gap(&mut self, main: IntervalId, eaten: IntervalId, current_merged_size: i32) {
        let m = &*self.model;
        let effective_min = |g: IntervalId| {
            let min = m.min_size(g);
            if min == USE_PREFERRED_SIZE {
                m.pref_size(g)
            } else {
                min
            }
        };
        let (min1, min2) = (effective_min(main), effective_min(eaten));
        let min = if min1 == 0 {
            min2
        } else if min2 == 0 {
            min1
        } else if !m.can_resize(main) && !m.can_resize(eaten) {
            USE_PREFERRED_SIZE
        } else if min1 == NOT_EXPLICITLY_DEFINED || min2 == NOT_EXPLICITLY_DEFINED {
            NOT_EXPLICITLY_DEFINED
        } else {
            min1 + min2
        };
        let (pref1, pref2) = (m.pref_size(main), m.pref_size(eaten));
        let pref = if pref1 == 0 {
            pref2
        } else if pref2 == 0 {
            pref1
        } else if pref1 == NOT_EXPLICITLY_DEFINED || pref2 == NOT_EXPLICITLY_DEFINED {
            if current_merged_size == UNKNOWN {
                NOT_EXPLICITLY_DEFINED
            } else {
                current_merged_size
            }
        } else {
            pref1 + pref2
        };
        let max = if m.max_size(main) >= INFINITE_SIZE || m.max_size(eaten) >= INFINITE_SIZE {
            INFINITE_SIZE
        } else {
            USE_PREFERRED_SIZE
        };
        self.model.set_interval_size(main, min, pref, max);
        if self.model.parent(eaten).is_some() {
            self.model.remove_interval(eaten);
        }
    }

    /// Merge neighboring gaps in every container; updated containers are
    /// added to `updated`.
    pub fn merge_adjacent_gaps(&mut self, updated: &mut HashSet<ComponentKey>) {
        let containers: Vec<ComponentKey> = self
            .model
            .all_components()
            .filter(|&c| self.model.is_container(c))
            .collect();
        for container in containers {
            let roots = self.model.layout_roots(container).to_vec();
            let mut changed = false;
            for pair in roots {
                for root in pair {
                    changed |= self.merge_adjacent_gaps_in(root);
                }
            }
            if changed {
                updated.insert(container);
            }
        }
    }

    /// Merge neighboring gaps below `root`; returns true if anything merged.
    pub fn merge_adjacent_gaps_in(&mut self, root: IntervalId) -> bool {
        debug_assert!(self.model.is_group(root));
        let mut updated = false;
        if self.model.is_sequential(root) {
            let mut i = 0;
            while i + 1 < self.model.child_count(root) {
                let current = self.model.child(root, i);
                let next = self.model.child(root, i + 1);
                if self.model.is_gap(current) && self.model.is_gap(next) {
                    self.eat_gap(current, next, NOT_EXPLICITLY_DEFINED);
                    updated = true;
                } else {
                    i += 1;
                }
            }
        }
        for sub in self.model.children(root).to_vec() {
            if self.model.is_group(sub) {
                updated |= self.merge_adjacent_gaps_in(sub);
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use hashbrown::HashSet;
    use kurbo::Rect;

    use super::{Operations, RemainderList};
    use crate::mapper::TableMapper;
    use crate::model::{ComponentKey, IntervalId, LayoutModel};
    use crate::types::{
        Alignment, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
    };

    struct Form {
        model: LayoutModel,
        cont: ComponentKey,
        root: IntervalId,
    }

    fn form() -> Form {
        let mut model = LayoutModel::new();
        let cont = model.create_component("form", true);
        model.add_root_component(cont);
        let root = model.default_root(cont, Axis::Horizontal).unwrap();
        model.space_mut(root).set_axis(Axis::Horizontal, 0, 400);
        Form { model, cont, root }
    }

    /// A component spanning `x0..x1` horizontally; returns its horizontal interval.
    fn comp(f: &mut Form, id: &str, x0: f64, x1: f64) -> IntervalId {
        let key = f.model.create_component(id, false);
        f.model.add_component(key, f.cont, None).unwrap();
        f.model
            .set_current_bounds(key, Rect::new(x0, 0.0, x1, 20.0), None);
        f.model.component_interval(key, Axis::Horizontal)
    }

    fn seq_of(f: &mut Form, parent: IntervalId, items: &[IntervalId]) -> IntervalId {
        let seq = f.model.new_sequential();
        f.model.add_interval(seq, parent, None);
        for &li in items {
            f.model.add_interval(li, seq, None);
        }
        seq
    }

    #[test]
    fn eaten_fixed_gaps_add_up() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 0.0, 50.0);
        let g1 = f.model.new_gap(10, 10, 10);
        let g2 = f.model.new_gap(5, 5, 5);
        let root = f.root;
        let seq = seq_of(&mut f, root, &[a, g1, g2]);
        let mut ops = Operations::new(&mut f.model, &mapper);
        ops.eat_gap(g1, g2, NOT_EXPLICITLY_DEFINED);
        let m = ops.model();
        assert_eq!(m.children(seq), [a, g1]);
        assert_eq!(
            (m.min_size(g1), m.pref_size(g1), m.max_size(g1)),
            (USE_PREFERRED_SIZE, 15, USE_PREFERRED_SIZE)
        );
    }

    #[test]
    fn default_gap_merge_takes_the_live_distance() {
        let mut f = form();
        let mapper = TableMapper::default();
        let main = f.model.new_default_gap();
        let eaten = f.model.new_gap(NOT_EXPLICITLY_DEFINED, 20, INFINITE_SIZE);
        let mut ops = Operations::new(&mut f.model, &mapper);
        ops.eat_gap(main, eaten, 37);
        assert_eq!(ops.model().pref_size(main), 37);
        assert_eq!(ops.model().max_size(main), INFINITE_SIZE);
    }

    #[test]
    fn inserted_gap_joins_its_neighbor() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 0.0, 50.0);
        let gap = f.model.new_gap(10, 10, 10);
        let root = f.root;
        let seq = seq_of(&mut f, root, &[a, gap]);
        let extra = f.model.new_gap(5, 5, 5);
        let mut ops = Operations::new(&mut f.model, &mapper);
        assert_eq!(ops.insert_gap_into_sequence(extra, seq, 2, Axis::Horizontal), 1);
        assert_eq!(ops.model().children(seq), [a, gap]);
        assert_eq!(ops.model().pref_size(gap), 15);
    }

    #[test]
    fn single_child_group_dissolves_with_its_alignment() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 0.0, 50.0);
        let group = f.model.new_parallel(Alignment::Trailing);
        f.model.add_interval(group, f.root, None);
        f.model.add_interval(a, group, None);
        let mut ops = Operations::new(&mut f.model, &mapper);
        assert!(ops.dissolve_redundant_group(group));
        let m = ops.model();
        assert_eq!(m.parent(a), Some(f.root));
        assert_eq!(m.raw_alignment(a), Some(Alignment::Trailing));
        m.check_integrity().unwrap();
    }

    #[test]
    fn nested_sequence_is_flattened() {
        let mut f = form();
        let mapper = TableMapper::default();
        let x = comp(&mut f, "x", 0.0, 20.0);
        let a = comp(&mut f, "a", 30.0, 50.0);
        let b = comp(&mut f, "b", 60.0, 90.0);
        let root = f.root;
        let outer = seq_of(&mut f, root, &[x]);
        let inner = seq_of(&mut f, outer, &[a, b]);
        let mut ops = Operations::new(&mut f.model, &mapper);
        assert!(ops.dissolve_redundant_group(inner));
        assert_eq!(ops.model().children(outer), [x, a, b]);
    }

    #[test]
    fn compatible_parallel_groups_merge() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 0.0, 50.0);
        let b = comp(&mut f, "b", 0.0, 80.0);
        let c = comp(&mut f, "c", 0.0, 30.0);
        f.model.add_interval(a, f.root, None);
        let group = f.model.new_parallel(Alignment::Leading);
        f.model.add_interval(b, group, None);
        f.model.add_interval(c, group, None);
        let mut ops = Operations::new(&mut f.model, &mapper);
        assert!(ops.add_content(group, f.root, None));
        assert_eq!(ops.model().children(f.root), [a, b, c]);
    }

    #[test]
    fn extract_cuts_the_leading_run() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 0.0, 20.0);
        let b = comp(&mut f, "b", 40.0, 60.0);
        let c = comp(&mut f, "c", 80.0, 100.0);
        let g1 = f.model.new_gap(20, 20, 20);
        let g2 = f.model.new_gap(20, 20, 20);
        let root = f.root;
        let seq = seq_of(&mut f, root, &[a, g1, b, g2, c]);
        let mut ops = Operations::new(&mut f.model, &mapper);
        let (mut lead, mut trail) = (Vec::new(), Vec::new());
        let kept = ops.extract(b, b, Some(Alignment::Leading), false, &mut lead, &mut trail);
        assert_eq!(kept, 3);
        assert_eq!(
            lead,
            vec![RemainderList {
                alignment: Some(Alignment::Leading),
                intervals: vec![a, g1],
            }]
        );
        assert!(trail.is_empty());
        assert_eq!(ops.model().children(seq), [b, g2, c]);

        ops.add_group_content(lead, seq, 0, Axis::Horizontal, Alignment::Leading);
        assert_eq!(ops.model().children(seq), [a, g1, b, g2, c]);
    }

    #[test]
    fn adjacent_gaps_are_merged() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 0.0, 20.0);
        let b = comp(&mut f, "b", 36.0, 60.0);
        let g1 = f.model.new_gap(10, 10, 10);
        let g2 = f.model.new_gap(6, 6, 6);
        let root = f.root;
        let seq = seq_of(&mut f, root, &[a, g1, g2, b]);
        let mut ops = Operations::new(&mut f.model, &mapper);
        let mut updated = HashSet::new();
        ops.merge_adjacent_gaps(&mut updated);
        assert!(updated.contains(&f.cont));
        assert_eq!(ops.model().children(seq), [a, g1, b]);
        assert_eq!(ops.model().pref_size(g1), 16);
        assert!(!ops.merge_adjacent_gaps_in(f.root));
    }

    #[test]
    fn common_leading_gap_moves_out_of_the_group() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 10.0, 60.0);
        let b = comp(&mut f, "b", 10.0, 80.0);
        let root = f.root;
        let outer = seq_of(&mut f, root, &[]);
        let group = f.model.new_parallel(Alignment::Leading);
        f.model.add_interval(group, outer, None);
        f.model.space_mut(group).set_axis(Axis::Horizontal, 0, 80);
        let ga = f.model.new_gap(10, 10, 10);
        let gb = f.model.new_gap(10, 10, 10);
        seq_of(&mut f, group, &[ga, a]);
        seq_of(&mut f, group, &[gb, b]);

        let mut ops = Operations::new(&mut f.model, &mapper);
        assert_eq!(ops.optimize_gaps(group, Axis::Horizontal), Some(1));
        let m = ops.model();
        assert_eq!(m.child_count(outer), 2);
        let gap = m.child(outer, 0);
        assert!(m.is_gap(gap));
        assert_eq!(m.pref_size(gap), 10);
        assert_eq!(m.children(group), [a, b]);
        assert_eq!(m.space(group).pos(Axis::Horizontal, Alignment::Leading), 10);
        m.check_integrity().unwrap();
    }

    /// Hoist the default leading gaps of a two-row group placed after `before`.
    fn hoisted_default_gap(before: Option<(f64, f64)>) -> Option<PaddingType> {
        let mut f = form();
        let mapper = TableMapper::default();
        let start = before.map_or(10.0, |(_, x1)| x1 + 6.0);
        let a = comp(&mut f, "a", start, start + 50.0);
        let b = comp(&mut f, "b", start, start + 70.0);
        let lead: Vec<IntervalId> = before
            .map(|(x0, x1)| comp(&mut f, "x", x0, x1))
            .into_iter()
            .collect();
        let root = f.root;
        let outer = seq_of(&mut f, root, &lead);
        let group = f.model.new_parallel(Alignment::Leading);
        f.model.add_interval(group, outer, None);
        let group_start = before.map_or(0, |_| 20);
        f.model
            .space_mut(group)
            .set_axis(Axis::Horizontal, group_start, 100);
        let ga = f.model.new_default_gap();
        let gb = f.model.new_default_gap();
        seq_of(&mut f, group, &[ga, a]);
        seq_of(&mut f, group, &[gb, b]);

        let mut ops = Operations::new(&mut f.model, &mapper);
        assert!(ops.optimize_gaps(group, Axis::Horizontal).is_some());
        let m = ops.model();
        let at = lead.len();
        let gap = m.child(outer, at);
        assert!(m.is_gap(gap));
        assert_eq!(m.pref_size(gap), NOT_EXPLICITLY_DEFINED);
        assert_eq!(m.children(group), [a, b]);
        m.check_integrity().unwrap();
        m.padding_type(gap)
    }

    #[test]
    fn hoisted_border_gap_stays_untyped() {
        assert_eq!(hoisted_default_gap(None), None);
        assert_eq!(
            hoisted_default_gap(Some((0.0, 20.0))),
            Some(PaddingType::Related)
        );
    }

    #[test]
    fn resize_keeps_fixed_intervals_fixed() {
        let mut f = form();
        let mapper = TableMapper::default();
        let gap = f.model.new_gap(10, 10, 10);
        let flexible = f.model.new_gap(NOT_EXPLICITLY_DEFINED, 10, INFINITE_SIZE);
        let mut ops = Operations::new(&mut f.model, &mapper);
        ops.resize_interval(gap, 24);
        ops.resize_interval(flexible, 24);
        let m = ops.model();
        assert_eq!((m.min_size(gap), m.pref_size(gap), m.max_size(gap)), (24, 24, 24));
        assert_eq!(
            (m.min_size(flexible), m.pref_size(flexible), m.max_size(flexible)),
            (NOT_EXPLICITLY_DEFINED, 24, INFINITE_SIZE)
        );
    }

    #[test]
    fn parallelized_interval_spans_the_sequence() {
        let mut f = form();
        let mapper = TableMapper::default();
        let a = comp(&mut f, "a", 0.0, 20.0);
        let b = comp(&mut f, "b", 40.0, 60.0);
        let c = comp(&mut f, "c", 0.0, 60.0);
        let gap = f.model.new_gap(20, 20, 20);
        let group = f.model.new_parallel(Alignment::Leading);
        let root = f.root;
        let seq = seq_of(&mut f, root, &[a, gap]);
        f.model.add_interval(group, seq, None);
        f.model.add_interval(b, group, None);
        f.model.add_interval(c, group, None);
        let mut ops = Operations::new(&mut f.model, &mapper);
        ops.parallelize_with_parent_sequence(c, Some(0), Axis::Horizontal);
        let m = ops.model();
        // `c` now sits next to the span a..b, and the emptied group dissolved.
        assert_eq!(m.parent(b), Some(seq));
        assert_eq!(m.children(seq), [a, gap, b]);
        assert_eq!(m.parent(c), Some(f.root));
        m.check_integrity().unwrap();
    }
}
