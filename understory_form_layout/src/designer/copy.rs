// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Verbs that create layout from existing layout: copying a selection,
//! duplicating it next to itself, enclosing it in a new container, and
//! adding components with no positioning information.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};

use super::{Designer, Upkeep, active_roots, size_extent};
use crate::error::{LayoutError, Result};
use crate::mapper::VisualMapper;
use crate::model::{ComponentKey, IntervalId, LayoutModel};
use crate::region::{Region, UNKNOWN, span};
use crate::types::{
    Alignment, Attributes, Axis, INFINITE_SIZE, Motion, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE,
};

type ComponentMap = HashMap<ComponentKey, ComponentKey>;

/// A component interval waiting to be put into a copied group.
struct Placement {
    interval: IntervalId,
    parent: IntervalId,
    alignment: Option<Alignment>,
    index: usize,
}

impl Upkeep<'_> {
    /// Copy the part of the tree under `interval` that holds the components
    /// of `map` (keys), using the mapped components (values) in the copy.
    ///
    /// Gaps are kept where they fall into `space`, and clipped to it. When a
    /// component maps to itself its interval is moved into the copy and the
    /// hole it leaves is repaired.
    pub(super) fn restricted_copy(
        &mut self,
        interval: IntervalId,
        map: &ComponentMap,
        space: &Region,
        axis: Axis,
    ) -> Option<IntervalId> {
        let mut pending = Vec::new();
        self.copy_restricted(interval, map, space, axis, &mut pending, true)
    }

    fn copy_restricted(
        &mut self,
        interval: IntervalId,
        map: &ComponentMap,
        space: &Region,
        axis: Axis,
        pending: &mut Vec<Placement>,
        top: bool,
    ) -> Option<IntervalId> {
        if self.model().is_component(interval) {
            let comp = self.model().component_of(interval)?;
            let &target = map.get(&comp)?;
            if target == comp {
                return Some(interval);
            }
            let copy = self.model().component_interval(target, axis);
            self.model_mut().copy_interval_properties(interval, copy);
            return Some(copy);
        }
        if self.model().is_gap(interval) {
            return self.copy_gap(interval, space, axis);
        }

        let parallel = self.model().is_parallel(interval);
        let copy = self.model_mut().clone_interval(interval);
        let range_start = space.pos(axis, Alignment::Leading);
        let mut comp_count = 0;
        let mut include_gap = false;
        let mut first_gap_to_include = 0;
        let mut gap_start = self.model().space(interval).pos(axis, Alignment::Leading);
        for sub in self.model().children(interval).to_vec() {
            let Some(sub_copy) = self.copy_restricted(sub, map, space, axis, pending, false) else {
                include_gap |= !parallel;
                continue;
            };
            if !self.model().is_gap(sub) {
                if include_gap {
                    gap_start = gap_start.max(range_start);
                    let size = span(gap_start, self.model().space(sub).pos(axis, Alignment::Leading));
                    self.integrate_gap(copy, size, first_gap_to_include);
                    include_gap = false;
                }
                gap_start = self.model().space(sub).pos(axis, Alignment::Trailing);
                first_gap_to_include = self.model().child_count(copy);
            }
            if self.model().is_component(sub) {
                pending.push(Placement {
                    interval: sub_copy,
                    parent: copy,
                    alignment: self.model().raw_alignment(sub_copy),
                    index: self.model().child_count(copy) + comp_count,
                });
                comp_count += 1;
            } else {
                self.model_mut().add_interval(sub_copy, copy, None);
            }
        }
        if include_gap {
            gap_start = gap_start.max(range_start);
            let gap_end = space
                .pos(axis, Alignment::Trailing)
                .min(self.model().space(interval).pos(axis, Alignment::Trailing));
            self.integrate_gap(copy, span(gap_start, gap_end), first_gap_to_include);
        }
        if self.model().child_count(copy) + comp_count == 0 {
            self.model_mut().discard(copy);
            return None;
        }
        if top {
            self.place_pending(pending);
            comp_count = 0;
        }
        if comp_count == 0 && self.model().child_count(copy) == 1 {
            let _session = self.model().edit_session();
            let sub = self.model_mut().remove_interval_at(copy, 0);
            let alignment = self.model().alignment(copy);
            self.model_mut().set_interval_alignment(sub, alignment);
            let drop_sub = self.model().is_sequential(copy) && self.model().is_gap(sub);
            self.model_mut().discard(copy);
            if drop_sub {
                self.model_mut().discard(sub);
                return None;
            }
            return Some(sub);
        }
        Some(copy)
    }

    fn copy_gap(&mut self, interval: IntervalId, space: &Region, axis: Axis) -> Option<IntervalId> {
        let (leading, trailing) = self.empty_space_bounds(interval, axis);
        let range_start = space.pos(axis, Alignment::Leading);
        let range_end = space.pos(axis, Alignment::Trailing);
        if leading >= range_end || trailing <= range_start {
            return None;
        }
        let model = self.model();
        let (min, pref, max) = (model.min_size(interval), model.pref_size(interval), model.max_size(interval));
        let attributes = model.attributes(interval) & Attributes::PERSISTENT;
        let padding = model.padding_type(interval);
        let gap = self.model_mut().new_gap(min, pref, max);
        self.model_mut().set_attributes(gap, attributes);
        let clipped = span(leading.max(range_start), trailing.min(range_end));
        if clipped != UNKNOWN && (leading < range_start || trailing > range_end) {
            let clip = |size: i32| if size >= 0 { USE_PREFERRED_SIZE } else { size };
            self.model_mut().set_interval_size(gap, clip(min), clipped, clip(max));
        } else {
            self.model_mut().set_padding_type(gap, padding);
        }
        Some(gap)
    }

    /// Put component intervals collected by a restricted copy into their
    /// copied groups, then dissolve groups left with a single child.
    fn place_pending(&mut self, pending: &[Placement]) {
        for p in pending {
            if self.model().parent(p.interval).is_some() {
                self.model_mut().remove_interval(p.interval);
                self.process_removals();
            }
            self.model_mut().set_interval_alignment(p.interval, p.alignment);
            self.model_mut().add_interval(p.interval, p.parent, Some(p.index));
        }
        let _session = self.model().edit_session();
        for p in pending {
            let mut group = p.parent;
            if !self.model().is_alive(group) {
                continue;
            }
            let Some(parent) = self.model().parent(group) else {
                continue;
            };
            while self.model().is_group(group) && self.model().child_count(group) == 1 {
                let sub = self.model_mut().remove_interval_at(group, 0);
                let alignment = self.model().alignment(group);
                let index = self.model_mut().remove_interval(group);
                self.model_mut().set_interval_alignment(sub, alignment);
                self.model_mut().add_interval(sub, parent, Some(index));
                self.model_mut().discard(group);
                group = sub;
            }
        }
    }

    /// Replace trailing gaps of `seq` past `boundary` by one fixed gap.
    fn integrate_gap(&mut self, seq: IntervalId, size: i32, boundary: usize) {
        loop {
            let count = self.model().child_count(seq);
            if count <= boundary || !self.model().is_gap(self.model().child(seq, count - 1)) {
                break;
            }
            let gap = self.model_mut().remove_interval_at(seq, count - 1);
            self.model_mut().discard(gap);
        }
        if size > 0 {
            let gap = self.model_mut().new_gap(size, size, size);
            self.model_mut().add_interval(gap, seq, None);
        }
    }

    /// Positions of the neighbors (or the parent's edges) around a gap.
    fn empty_space_bounds(&self, gap: IntervalId, axis: Axis) -> (i32, i32) {
        let model = self.model();
        let Some(parent) = model.parent(gap) else {
            let space = model.space(gap);
            return (space.pos(axis, Alignment::Leading), space.pos(axis, Alignment::Trailing));
        };
        let index = model.index_of(parent, gap).unwrap_or(0);
        let leading = if index == 0 {
            model.space(parent).pos(axis, Alignment::Leading)
        } else {
            model.space(model.child(parent, index - 1)).pos(axis, Alignment::Trailing)
        };
        let trailing = if index + 1 == model.child_count(parent) {
            model.space(parent).pos(axis, Alignment::Trailing)
        } else {
            model.space(model.child(parent, index + 1)).pos(axis, Alignment::Leading)
        };
        (leading, trailing)
    }

    /// Build a fresh pair of trees placing components at their bounds,
    /// measured from `origin`.
    ///
    /// On each axis components that do not overlap are chained in sequences
    /// with fixed gaps; the chains run in parallel.
    pub(super) fn intervals_from_bounds(
        &mut self,
        placed: &[(ComponentKey, Region)],
        origin: [i32; 2],
    ) -> [IntervalId; 2] {
        Axis::BOTH.map(|axis| {
            let mut items: Vec<(i32, i32, ComponentKey)> = placed
                .iter()
                .map(|(comp, region)| {
                    (
                        region.pos(axis, Alignment::Leading) - origin[axis.index()],
                        region.pos(axis, Alignment::Trailing) - origin[axis.index()],
                        *comp,
                    )
                })
                .collect();
            items.sort_by_key(|&(leading, trailing, _)| (leading, trailing));
            let mut chains: Vec<(i32, Vec<(i32, i32, ComponentKey)>)> = Vec::new();
            for item in items {
                match chains.iter_mut().find(|(end, _)| *end <= item.0) {
                    Some(chain) => {
                        chain.0 = item.1;
                        chain.1.push(item);
                    }
                    None => chains.push((item.1, vec![item])),
                }
            }
            let group = self.model_mut().new_parallel(Alignment::Leading);
            for (_, chain) in chains {
                let seq = self.model_mut().new_sequential();
                let mut pos = 0;
                for (leading, trailing, comp) in chain {
                    if leading > pos {
                        let size = leading - pos;
                        let gap = self.model_mut().new_gap(size, size, size);
                        self.model_mut().add_interval(gap, seq, None);
                    }
                    let li = self.model().component_interval(comp, axis);
                    if let Some((_, region)) = placed.iter().find(|(c, _)| *c == comp) {
                        self.model_mut().space_mut(li).copy_axis(axis, region);
                    }
                    self.model_mut().add_interval(li, seq, None);
                    pos = trailing;
                }
                if self.model().child_count(seq) == 1 {
                    let li = self.model_mut().remove_interval_at(seq, 0);
                    self.model_mut().discard(seq);
                    self.model_mut().add_interval(li, group, None);
                } else {
                    self.model_mut().add_interval(seq, group, None);
                }
            }
            group
        })
    }

    /// Give `comp` an explicit preferred size where `space` differs from
    /// what the mapper reports.
    pub(super) fn set_preferred_from_space(&mut self, comp: ComponentKey, space: &Region) {
        let preferred = self
            .mapper()
            .component_preferred_size(self.model().component_id(comp));
        for axis in Axis::BOTH {
            let size = space.size(axis);
            if preferred.is_none_or(|p| size_extent(p, axis) != size) {
                let li = self.model().component_interval(comp, axis);
                let (min, max) = (self.model().min_size(li), self.model().max_size(li));
                self.model_mut().set_interval_size(li, min, size, max);
            }
        }
    }

    /// Place `components` into a new layer of `target`, centered between
    /// flexible gaps.
    fn add_unspecified(
        &mut self,
        components: &[ComponentKey],
        target: ComponentKey,
        adding: [IntervalId; 2],
    ) -> Result<()> {
        for &comp in components {
            self.model_mut().add_component(comp, target, None)?;
        }
        let roots = self.model_mut().add_new_layout_roots(target);
        for axis in Axis::BOTH {
            let interval = adding[axis.index()];
            let model = self.model_mut();
            let seq = if model.is_sequential(interval) {
                interval
            } else {
                model.new_sequential()
            };
            let resizing = model.want_resize(interval);
            let new_gap = |model: &mut LayoutModel| {
                let gap = model.new_default_gap();
                if !resizing {
                    model.set_interval_size(gap, 0, 0, INFINITE_SIZE);
                }
                gap
            };
            let gap = new_gap(model);
            model.add_interval(gap, seq, Some(0));
            if interval != seq {
                model.add_interval(interval, seq, None);
                model.set_interval_alignment(interval, None);
            }
            let gap = new_gap(model);
            model.add_interval(gap, seq, None);
            model.add_interval(seq, roots[axis.index()], None);
        }
        Ok(())
    }

    /// Place `components` into the default layer of the empty `target`.
    fn add_to_empty(
        &mut self,
        components: &[ComponentKey],
        target: ComponentKey,
        adding: [IntervalId; 2],
    ) -> Result<()> {
        debug_assert!(self.model().subcomponents(target).is_empty());
        for &comp in components {
            self.model_mut().add_component(comp, target, None)?;
        }
        let roots = active_roots(self.model(), target);
        let _session = self.model().edit_session();
        for axis in Axis::BOTH {
            let root = roots[axis.index()];
            let interval = adding[axis.index()];
            let model = self.model_mut();
            if model.is_parallel(interval) {
                while model.child_count(interval) > 0 {
                    let sub = model.remove_interval_at(interval, 0);
                    model.add_interval(sub, root, None);
                }
                model.discard(interval);
            } else {
                model.add_interval(interval, root, None);
            }
        }
        Ok(())
    }

    /// Insert copies of the selected intervals next to them along `axis`.
    fn duplicate_sequentially(
        &mut self,
        intervals: &[IntervalId],
        map: &ComponentMap,
        axis: Axis,
        direction: Alignment,
    ) {
        let mut dup_roots: Vec<IntervalId> = Vec::new();
        for &interval in intervals {
            let model = self.model();
            let mut li = interval;
            let mut parent = model.parent(li);
            while let Some(p) = parent {
                if dup_roots.contains(&p) {
                    break;
                }
                parent = model.parent(p);
            }
            if parent.is_some() {
                continue;
            }
            parent = model.parent(li);
            while let Some(p) = parent {
                if should_duplicate_whole_group(model, p, Some(li), intervals) {
                    li = p;
                    parent = model.parent(li);
                } else {
                    if model.is_group(li) {
                        dup_roots.retain(|&d| !model.is_parent_of(li, d));
                    }
                    if !dup_roots.contains(&li) {
                        dup_roots.push(li);
                    }
                    break;
                }
            }
            if parent.is_none() {
                dup_roots.clear();
                dup_roots.push(li);
                break;
            }
        }

        for &d_root in &dup_roots {
            let model = self.model_mut();
            let seq = match model.parent(d_root) {
                Some(_) if model.is_sequential(d_root) => d_root,
                Some(parent) if model.is_sequential(parent) => parent,
                Some(parent) => {
                    let seq = model.new_sequential();
                    let index = model.remove_interval(d_root);
                    model.add_interval(seq, parent, Some(index));
                    model.add_interval(d_root, seq, None);
                    seq
                }
                None => {
                    let group = model.new_parallel(model.group_alignment(d_root));
                    while model.child_count(d_root) > 0 {
                        let sub = model.remove_interval_at(d_root, 0);
                        model.add_interval(sub, group, None);
                    }
                    let seq = model.new_sequential();
                    model.add_interval(seq, d_root, None);
                    model.add_interval(group, seq, None);
                    seq
                }
            };
            let Some(seq_parent) = self.model().parent(seq) else {
                continue;
            };
            let space = *self.model().space(seq_parent);
            let whole_seq = dup_roots.contains(&seq);
            let mut start: Option<usize> = None;
            let mut i = 0;
            while i < self.model().child_count(seq) {
                let model = self.model();
                let sub = model.child(seq, i);
                let duplicate = !model.is_gap(sub) && (whole_seq || dup_roots.contains(&sub));
                let last = i + 1 == model.child_count(seq);
                if duplicate && start.is_none() {
                    start = Some(i);
                }
                if let Some(s) = start
                    && ((!duplicate && !model.is_gap(sub)) || last)
                {
                    let mut count = i - s;
                    if last && duplicate {
                        count += 1;
                    } else if model.is_gap(model.child(seq, i - 1)) {
                        count -= 1;
                    }
                    if count > 0 {
                        i += self.duplicate_run(seq, s, count, map, &space, axis, direction);
                    }
                    start = None;
                }
                i += 1;
            }
        }
    }

    /// Copy `count` children of `seq` from `start` next to themselves and
    /// separate the copies by a gap; returns how many intervals were added.
    fn duplicate_run(
        &mut self,
        seq: IntervalId,
        start: usize,
        count: usize,
        map: &ComponentMap,
        space: &Region,
        axis: Axis,
        direction: Alignment,
    ) -> usize {
        let mut inserted = 0;
        for k in 0..count {
            let (source, index) = if direction == Alignment::Leading {
                (start + inserted + k, start + inserted)
            } else {
                (start + k, start + count + inserted)
            };
            let li = self.model().child(seq, source);
            if let Some(copy) = self.restricted_copy(li, map, space, axis) {
                self.model_mut().add_interval(copy, seq, Some(index));
                inserted += 1;
            }
        }
        let (neighbor, gap_index) = if direction == Alignment::Leading {
            let start = start + inserted;
            let next = start + count;
            let gap = (next < self.model().child_count(seq)).then(|| self.model().child(seq, next));
            (gap, start)
        } else {
            let gap = start.checked_sub(1).map(|prev| self.model().child(seq, prev));
            (gap, start + count)
        };
        let model = self.model_mut();
        let gap = match neighbor {
            Some(gap) if model.is_gap(gap) => model.clone_interval(gap),
            _ => model.new_default_gap(),
        };
        model.add_interval(gap, seq, Some(gap_index));
        inserted + 1
    }

    /// Put the copies of the selected intervals in parallel with them on `axis`.
    fn duplicate_in_parallel(&mut self, intervals: &[IntervalId], map: &ComponentMap, axis: Axis) {
        let mut int_map: HashMap<IntervalId, IntervalId> = intervals
            .iter()
            .filter_map(|&li| {
                let comp = self.model().component_of(li)?;
                let &target = map.get(&comp)?;
                Some((li, self.model().component_interval(target, axis)))
            })
            .collect();
        for &li in intervals {
            let Some(&copy) = int_map.get(&li) else {
                continue;
            };
            let Some(parent) = self.model().parent(li) else {
                continue;
            };
            if self.model().is_parallel(parent) {
                let model = self.model_mut();
                model.copy_interval_properties(li, copy);
                let alignment = model.raw_alignment(li);
                model.set_interval_alignment(copy, alignment);
                model.add_interval(copy, parent, None);
                continue;
            }
            let Some(index) = self.model().index_of(parent, li) else {
                continue;
            };
            let start = duplication_boundary(self.model(), parent, index, Alignment::Leading);
            let end = duplication_boundary(self.model(), parent, index, Alignment::Trailing);
            let mut gap_start =
                self.model()
                    .visual_position(self.model().child(parent, start), axis, Alignment::Leading);
            let mut normal_gap = None;
            let mut subst_gap = false;
            let par_seq = self.model_mut().new_sequential();
            for i in start..=end {
                let model = self.model_mut();
                let sub = model.child(parent, i);
                if let Some(copy) = int_map.remove(&sub) {
                    model.copy_interval_properties(sub, copy);
                    if let Some(gap) = normal_gap.take() {
                        let gap = model.clone_interval(gap);
                        model.add_interval(gap, par_seq, None);
                    } else if subst_gap {
                        let size = span(gap_start, model.space(sub).pos(axis, Alignment::Leading));
                        if size > 0 {
                            let gap = model.new_gap(size, size, size);
                            model.add_interval(gap, par_seq, None);
                        }
                        subst_gap = false;
                    }
                    model.add_interval(copy, par_seq, None);
                    gap_start = model.space(sub).pos(axis, Alignment::Trailing);
                } else if !model.is_gap(sub) {
                    normal_gap = None;
                    subst_gap = true;
                } else if !subst_gap {
                    normal_gap = Some(sub);
                }
            }
            let model = self.model_mut();
            if let Some(gap) = normal_gap {
                let gap = model.clone_interval(gap);
                model.add_interval(gap, par_seq, None);
            } else if subst_gap {
                let last = model.child(parent, end);
                let size = model.visual_position(last, axis, Alignment::Trailing) - gap_start;
                if size > 0 {
                    let gap = model.new_gap(size, size, size);
                    model.add_interval(gap, par_seq, None);
                }
            }
            self.ops
                .add_parallel_with_sequence(par_seq, parent, start, end, axis);
        }
    }
}

/// Whether duplicating `known_sub` should take the whole `group` along.
fn should_duplicate_whole_group(
    model: &LayoutModel,
    group: IntervalId,
    known_sub: Option<IntervalId>,
    selected: &[IntervalId],
) -> bool {
    debug_assert!(model.is_group(group));
    for &sub in model.children(group) {
        if Some(sub) == known_sub || model.is_gap(sub) {
            continue;
        }
        let included = if model.is_group(sub) {
            should_duplicate_whole_group(model, sub, None, selected)
        } else {
            selected.contains(&sub)
        };
        if included && model.is_parallel(group) {
            return true;
        }
        if !included && model.is_sequential(group) {
            return false;
        }
    }
    model.is_sequential(group)
}

/// Extent of the run around `index` in `seq` not broken by a parallel group.
fn duplication_boundary(model: &LayoutModel, seq: IntervalId, index: usize, direction: Alignment) -> usize {
    debug_assert!(model.is_sequential(seq));
    let count = model.child_count(seq);
    let mut index = index;
    loop {
        let next = match direction {
            Alignment::Leading => index.checked_sub(1),
            _ => Some(index + 1).filter(|&n| n < count),
        };
        match next {
            Some(n) if !model.is_parallel(model.child(seq, n)) => index = n,
            _ => return index,
        }
    }
}

/// Whether some of `components` touches the `edge` of the layer root, or is
/// separated from it only by a fixed default padding.
fn is_any_component_snapped_to_root(
    model: &LayoutModel,
    components: &[ComponentKey],
    axis: Axis,
    edge: Alignment,
) -> bool {
    let Some(&first) = components.first() else {
        return false;
    };
    let root = model.root_of(model.component_interval(first, axis));
    components.iter().any(|&comp| {
        let interval = model.component_interval(comp, axis);
        model.is_placed_at_border_in(interval, root, axis, edge)
            || is_snapped_next_to_in_parent(model, interval, root, axis, edge)
    })
}

fn is_snapped_next_to_in_parent(
    model: &LayoutModel,
    interval: IntervalId,
    parent: IntervalId,
    axis: Axis,
    edge: Alignment,
) -> bool {
    let Some(gap) = model.neighbor(interval, edge, false, true, false) else {
        return false;
    };
    if !model.is_fixed_default_padding(gap) || !model.is_parent_of(parent, gap) {
        return false;
    }
    let back = model.direct_neighbor(gap, edge.opposite(), true);
    let attached = back == Some(interval)
        || back.is_some_and(|b| model.is_placed_at_border_in(interval, b, axis, edge));
    attached
        && model.neighbor(gap, edge, true, true, false).is_none()
        && model
            .parent(gap)
            .is_some_and(|p| model.is_placed_at_border_in(p, parent, axis, edge))
}

impl<M: VisualMapper> Designer<M> {
    /// Copy the layout of components into `target_container`.
    ///
    /// Each pair maps a placed source component to the id of the component
    /// that takes its place; missing targets are created. Copying every
    /// subcomponent of a container into an empty one copies (or, when the ids
    /// map to themselves, moves) the whole layout. Otherwise the copies go
    /// to a new layer, shifted so they do not cover the sources.
    pub fn copy_layout(&mut self, pairs: &[(&str, &str)], target_container: &str) -> Result<()> {
        let Some(&(first_source, _)) = pairs.first() else {
            return Ok(());
        };
        let target = self.resolve_container(target_container)?;
        let mut sources = Vec::with_capacity(pairs.len());
        for &(source_id, _) in pairs {
            sources.push(self.resolve(source_id)?);
        }
        let Some(source_container) = self.model.component_parent(sources[0]) else {
            return Err(LayoutError::NotPlaced {
                id: first_source.into(),
            });
        };
        if sources
            .iter()
            .any(|&s| self.model.component_parent(s) != Some(source_container))
        {
            return Err(LayoutError::DifferentContainers);
        }

        if source_container != target
            && self.model.subcomponents(source_container).len() == pairs.len()
            && self.model.subcomponents(target).is_empty()
        {
            if pairs.iter().all(|(s, t)| s == t) {
                self.model.move_container_layout(source_container, target)?;
            } else {
                let id_map: Vec<(String, String)> = pairs
                    .iter()
                    .map(|&(s, t)| (String::from(s), String::from(t)))
                    .collect();
                self.model.copy_container_layout(source_container, &id_map, target)?;
            }
            self.visual_state_up_to_date = false;
            tracing::debug!(count = pairs.len(), "copied container layout");
            return Ok(());
        }

        for &(_, target_id) in pairs {
            if let Some(existing) = self.model.component(target_id)
                && self.model.component_parent(existing) == Some(target)
            {
                return Err(LayoutError::AlreadyPlaced {
                    id: target_id.into(),
                });
            }
        }
        let mut map = HashMap::new();
        let mut targets = Vec::with_capacity(pairs.len());
        let mut bounds = Vec::with_capacity(pairs.len());
        let mut overall = Region::new();
        let mut common: [Option<IntervalId>; 2] = [None; 2];
        for (&(_, target_id), &source) in pairs.iter().zip(&sources) {
            let is_container = self.model.is_container(source);
            let copy = match self.model.component(target_id) {
                Some(existing) => existing,
                None => self.model.create_component(target_id, is_container),
            };
            map.insert(source, copy);
            targets.push(copy);
            let space = *self.model.space(self.model.component_interval(source, Axis::Horizontal));
            overall.expand(&space);
            bounds.push(space.to_rect());
            for axis in Axis::BOTH {
                let li = self.model.component_interval(source, axis);
                let slot = &mut common[axis.index()];
                *slot = Some(match *slot {
                    None => li,
                    Some(c) => self.model.common_parent(c, li).unwrap_or(c),
                });
            }
        }
        let mut adding = [None; 2];
        {
            let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
            for axis in Axis::BOTH {
                if let Some(parent) = common[axis.index()] {
                    adding[axis.index()] = upkeep.restricted_copy(parent, &map, &overall, axis);
                }
            }
        }
        let [Some(h), Some(v)] = adding else {
            debug_assert!(false, "selection copied to nothing");
            return Ok(());
        };
        let adding = [h, v];

        let shift = self.copy_shift(&sources, target, &overall, source_container == target);
        if let Some(shift) = shift {
            if targets.len() > 1 {
                for &comp in &targets {
                    if self.model.component_parent(comp).is_some() {
                        self.model.remove_component(comp, false);
                    }
                }
            }
            let mut dragger = self.new_dragger(targets.clone(), &bounds, Point::ZERO, [Motion::Move; 2]);
            let roots = self.target_roots_for_copy(target);
            dragger.set_target_container(Some((target, roots)));
            dragger.move_to(&self.model, &self.mapper, shift, false, false);
            self.add_components(&dragger, target, adding, false)?;
        } else {
            for &comp in &targets {
                if self.model.component_parent(comp).is_some() {
                    self.model.remove_component_and_intervals(comp, false);
                }
            }
            self.process_removals();
            Upkeep::new(&mut self.model, &self.mapper, false).add_unspecified(&targets, target, adding)?;
        }
        self.visual_state_up_to_date = false;
        tracing::debug!(count = pairs.len(), shifted = shift.is_some(), "copied layout");
        Ok(())
    }

    /// Add components known only by their bounds into `target_container`.
    ///
    /// Into an empty container the bounds are taken as absolute positions
    /// in its default layer unless `relative` is set; otherwise the
    /// components form a new layer keeping their relative positions.
    pub fn copy_layout_from_outside(
        &mut self,
        entries: &[(&str, Rect)],
        target_container: &str,
        relative: bool,
    ) -> Result<()> {
        if entries.is_empty() {
            return Err(LayoutError::EmptySelection);
        }
        let target = self.resolve_container(target_container)?;
        let relative = relative || !self.model.subcomponents(target).is_empty();
        for &(id, _) in entries {
            if let Some(existing) = self.model.component(id)
                && self.model.component_parent(existing).is_some()
            {
                return Err(LayoutError::AlreadyPlaced { id: id.into() });
            }
        }
        let mut placed = Vec::with_capacity(entries.len());
        let mut origin = [i32::MAX; 2];
        let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
        for &(id, rect) in entries {
            let comp = match upkeep.model().component(id) {
                Some(existing) => existing,
                None => upkeep.model_mut().create_component(id, false),
            };
            let space = Region::from_rect(rect, None);
            upkeep.set_preferred_from_space(comp, &space);
            for axis in Axis::BOTH {
                let o = &mut origin[axis.index()];
                *o = (*o).min(space.pos(axis, Alignment::Leading));
            }
            placed.push((comp, space));
        }
        if !relative {
            origin = [0; 2];
        }
        let adding = upkeep.intervals_from_bounds(&placed, origin);
        let components: Vec<ComponentKey> = placed.iter().map(|&(c, _)| c).collect();
        if relative {
            upkeep.add_unspecified(&components, target, adding)?;
        } else {
            upkeep.add_to_empty(&components, target, adding)?;
        }
        self.visual_state_up_to_date = false;
        tracing::debug!(count = entries.len(), relative, "copied layout from outside");
        Ok(())
    }

    /// Duplicate components next to themselves.
    ///
    /// The copies (`targets`, created when missing) are put in sequence with
    /// the sources along `axis` on the `direction` side, and in parallel with
    /// them on the other axis. Defaults to below the sources.
    pub fn duplicate_layout(
        &mut self,
        sources: &[&str],
        targets: &[&str],
        axis: Option<Axis>,
        direction: Option<Alignment>,
    ) -> Result<()> {
        if sources.len() != targets.len() {
            return Err(LayoutError::MismatchedLengths {
                ids: sources.len(),
                bounds: targets.len(),
            });
        }
        let Some(&first) = sources.first() else {
            return Err(LayoutError::EmptySelection);
        };
        let source_keys = sources
            .iter()
            .map(|id| self.resolve(id))
            .collect::<Result<Vec<_>>>()?;
        let Some(container) = self.model.component_parent(source_keys[0]) else {
            return Err(LayoutError::NotPlaced { id: first.into() });
        };
        if source_keys
            .iter()
            .any(|&s| self.model.component_parent(s) != Some(container))
        {
            return Err(LayoutError::DifferentContainers);
        }
        for &id in targets {
            if let Some(existing) = self.model.component(id)
                && self.model.component_parent(existing).is_some()
            {
                return Err(LayoutError::AlreadyPlaced { id: id.into() });
            }
        }

        let mut map = HashMap::new();
        for (&source, &id) in source_keys.iter().zip(targets) {
            let copy = match self.model.component(id) {
                Some(existing) => existing,
                None => self.model.create_component(id, false),
            };
            self.model.add_component(copy, container, None)?;
            map.insert(source, copy);
        }
        let seq_axis = axis.unwrap_or(Axis::Vertical);
        let direction = direction.unwrap_or(Alignment::Trailing);
        let intervals = Axis::BOTH.map(|axis| {
            source_keys
                .iter()
                .map(|&s| self.model.component_interval(s, axis))
                .collect::<Vec<_>>()
        });

        let _session = self.model.edit_session();
        let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
        upkeep.duplicate_sequentially(&intervals[seq_axis.index()], &map, seq_axis, direction);
        let par_axis = seq_axis.other();
        upkeep.duplicate_in_parallel(&intervals[par_axis.index()], &map, par_axis);
        self.visual_state_up_to_date = false;
        self.optimize_structure = true;
        self.update_container_design(container);
        tracing::debug!(count = sources.len(), ?seq_axis, ?direction, "duplicated layout");
        Ok(())
    }

    /// Move components into a new container placed where they were.
    ///
    /// The container is created when `container_id` is unknown; an existing
    /// one must be empty and unplaced. A component that cannot hold a layout
    /// just takes the place of the selection.
    pub fn enclose_in_container(&mut self, ids: &[&str], container_id: &str) -> Result<()> {
        let Some(&first) = ids.first() else {
            return Err(LayoutError::EmptySelection);
        };
        let components = ids
            .iter()
            .map(|id| self.resolve(id))
            .collect::<Result<Vec<_>>>()?;
        let Some(parent_container) = self.model.component_parent(components[0]) else {
            return Err(LayoutError::NotPlaced { id: first.into() });
        };
        if components
            .iter()
            .any(|&c| self.model.component_parent(c) != Some(parent_container))
        {
            return Err(LayoutError::DifferentContainers);
        }
        let enclosing = match self.model.component(container_id) {
            Some(existing) if self.model.component_parent(existing).is_some() => {
                return Err(LayoutError::AlreadyPlaced {
                    id: container_id.into(),
                });
            }
            Some(existing) if !self.model.subcomponents(existing).is_empty() => {
                return Err(LayoutError::ContainerNotEmpty {
                    id: container_id.into(),
                });
            }
            Some(existing) => existing,
            None => self.model.create_component(container_id, true),
        };

        let map: ComponentMap = components.iter().map(|&c| (c, c)).collect();
        let mut overall = Region::new();
        let mut common: [Option<IntervalId>; 2] = [None; 2];
        for &comp in &components {
            let space = *self.model.space(self.model.component_interval(comp, Axis::Horizontal));
            overall.expand(&space);
            for axis in Axis::BOTH {
                let li = self.model.component_interval(comp, axis);
                let slot = &mut common[axis.index()];
                *slot = Some(match *slot {
                    None => li,
                    Some(c) => self.model.common_parent(c, li).unwrap_or(c),
                });
            }
        }
        let [Some(common_h), Some(common_v)] = common else {
            return Err(LayoutError::EmptySelection);
        };
        let common = [common_h, common_v];
        let parent_roots = self.model.parent_roots(components[0]);
        let resizing = common.map(|c| self.model.want_resize(c));

        if self.model.is_container(enclosing) {
            let mut extracted = [None; 2];
            {
                let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
                for axis in Axis::BOTH {
                    let extract = common[axis.index()];
                    extracted[axis.index()] = if upkeep.model().is_component(extract) {
                        upkeep.model_mut().remove_interval(extract);
                        upkeep.process_removals();
                        Some(extract)
                    } else {
                        upkeep.restricted_copy(extract, &map, &overall, axis)
                    };
                }
            }
            for &comp in &components {
                self.model.remove_component(comp, false);
                self.model.add_component(comp, enclosing, None)?;
            }
            let _session = self.model.edit_session();
            for axis in Axis::BOTH {
                let Some(content) = extracted[axis.index()] else {
                    continue;
                };
                let Some(root) = self.model.default_root(enclosing, axis) else {
                    continue;
                };
                while self.model.child_count(root) > 0 {
                    let old = self.model.remove_interval_at(root, 0);
                    self.model.discard(old);
                }
                let seq = self.model.new_sequential();
                let leading = self.model.new_default_gap();
                self.model.add_interval(leading, seq, None);
                self.model.add_interval(content, seq, None);
                let trailing = self.model.new_default_gap();
                self.model.add_interval(trailing, seq, None);
                self.model.add_interval(seq, root, None);
            }
        } else {
            for &comp in &components {
                let from_model = !self.model.is_container(comp);
                self.model.remove_component_and_intervals(comp, from_model);
            }
            self.process_removals();
        }

        let adding = Axis::BOTH.map(|axis| {
            let interval = self.model.component_interval(enclosing, axis);
            let max = if resizing[axis.index()] {
                INFINITE_SIZE
            } else {
                USE_PREFERRED_SIZE
            };
            self.model
                .set_interval_size(interval, USE_PREFERRED_SIZE, NOT_EXPLICITLY_DEFINED, max);
            interval
        });
        let mut dragger = self.new_dragger(
            vec![enclosing],
            &[overall.to_rect()],
            Point::ZERO,
            [Motion::Move; 2],
        );
        dragger.set_target_container(Some((parent_container, parent_roots)));
        dragger.move_to(&self.model, &self.mapper, [10, 10], true, false);
        dragger.move_to(&self.model, &self.mapper, [0, 0], true, false);
        self.add_components(&dragger, parent_container, adding, false)?;
        self.visual_state_up_to_date = false;
        tracing::debug!(count = ids.len(), container = container_id, "enclosed in container");
        Ok(())
    }

    /// Add a component without positioning information.
    ///
    /// It goes centered into a new layer of `target_container`, taking the
    /// interval properties of `source_id` when that component exists, or
    /// `size` as an explicit preferred size where it differs from the
    /// preferred size. Without a container the component becomes a
    /// top-level container of the model.
    pub fn add_unspecified_component(
        &mut self,
        target_id: &str,
        source_id: Option<&str>,
        size: Option<Size>,
        target_container: Option<&str>,
    ) -> Result<()> {
        let Some(container_id) = target_container else {
            let comp = match self.model.component(target_id) {
                Some(existing) if self.model.component_parent(existing).is_some() => {
                    return Err(LayoutError::AlreadyPlaced {
                        id: target_id.into(),
                    });
                }
                Some(existing) => existing,
                None => self.model.create_component(target_id, true),
            };
            self.model.add_root_component(comp);
            tracing::debug!(id = target_id, "added top-level component");
            return Ok(());
        };
        let container = self.resolve_container(container_id)?;
        let comp = match self.model.component(target_id) {
            None => self.model.create_component(target_id, false),
            Some(existing) => match self.model.component_parent(existing) {
                None => existing,
                Some(parent) if parent != container && source_id == Some(target_id) => {
                    self.model.remove_component_and_intervals(existing, false);
                    self.process_removals();
                    existing
                }
                Some(_) => {
                    return Err(LayoutError::AlreadyPlaced {
                        id: target_id.into(),
                    });
                }
            },
        };
        let source = source_id.and_then(|id| self.model.component(id));
        let preferred = size.and_then(|_| self.mapper.component_preferred_size(target_id));
        let adding = Axis::BOTH.map(|axis| {
            let li = self.model.component_interval(comp, axis);
            if let Some(source) = source {
                let source_li = self.model.component_interval(source, axis);
                if source_li != li {
                    self.model.copy_interval_properties(source_li, li);
                }
            } else if let (Some(size), Some(preferred)) = (size, preferred) {
                let (size, preferred) = (size_extent(size, axis), size_extent(preferred, axis));
                if size != preferred {
                    let (min, max) = (self.model.min_size(li), self.model.max_size(li));
                    self.model.set_interval_size(li, min, size, max);
                }
            }
            li
        });
        Upkeep::new(&mut self.model, &self.mapper, false).add_unspecified(&[comp], container, adding)?;
        self.visual_state_up_to_date = false;
        tracing::debug!(id = target_id, container = container_id, "added unspecified component");
        Ok(())
    }

    /// Suggested shift along `axis` for pasting copies of `ids` next to them.
    ///
    /// Moves towards the side where no component is snapped to the layer
    /// border; zero when both sides are taken.
    pub fn suggest_copy_shift(&self, ids: &[&str], axis: Axis) -> Result<i32> {
        let components = ids
            .iter()
            .map(|id| self.resolve(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.copy_shift_along(&components, axis))
    }

    fn copy_shift_along(&self, components: &[ComponentKey], axis: Axis) -> i32 {
        let shift = self.tuning.copy_shift;
        if !is_any_component_snapped_to_root(&self.model, components, axis, Alignment::Trailing) {
            shift
        } else if !is_any_component_snapped_to_root(&self.model, components, axis, Alignment::Leading) {
            -shift
        } else {
            0
        }
    }

    /// Offset for pasted copies occupying `space`: next to the sources within
    /// their own container, centered in a different one.
    fn copy_shift(
        &self,
        sources: &[ComponentKey],
        target: ComponentKey,
        space: &Region,
        same_container: bool,
    ) -> Option<[i32; 2]> {
        let container_space = self.container_space(target);
        if !space.is_set() || !container_space.is_set() {
            return None;
        }
        if same_container {
            let shift = Axis::BOTH.map(|axis| self.copy_shift_along(sources, axis));
            if shift == [0, 0] {
                return Some([self.tuning.copy_shift; 2]);
            }
            return Some(shift);
        }
        Some(Axis::BOTH.map(|axis| {
            (container_space.size(axis) - space.size(axis)) / 2 - space.pos(axis, Alignment::Leading)
                + container_space.pos(axis, Alignment::Leading)
        }))
    }

    /// A new layer of `container` covering its whole space.
    fn target_roots_for_copy(&mut self, container: ComponentKey) -> [IntervalId; 2] {
        let space = self.container_space(container);
        let roots = self.model.add_new_layout_roots(container);
        for root in roots {
            *self.model.space_mut(root) = space;
        }
        roots
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size};

    use super::super::tests::{designer, drop_new};
    use crate::error::LayoutError;
    use crate::types::Axis;

    fn add_panel(d: &mut super::Designer<crate::mapper::TableMapper>) {
        let panel = d.model_mut().create_component("panel", true);
        d.model_mut().add_root_component(panel);
        d.mapper_mut()
            .set_interior("panel", Rect::new(0.0, 0.0, 300.0, 200.0));
        d.update_current_state();
    }

    #[test]
    fn whole_container_copy_keeps_the_structure() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        drop_new(&mut d, "b", Rect::new(10.0, 40.0, 110.0, 60.0));
        add_panel(&mut d);
        d.copy_layout(&[("a", "a2"), ("b", "b2")], "panel").unwrap();
        let m = d.model();
        let panel = m.component("panel").unwrap();
        let form = m.component("form").unwrap();
        for (source, copy) in [("a", "a2"), ("b", "b2")] {
            let source = m.component(source).unwrap();
            let copy = m.component(copy).unwrap();
            assert_eq!(m.component_parent(copy), Some(panel));
            assert_eq!(m.component_parent(source), Some(form));
            for axis in Axis::BOTH {
                let li = m.component_interval(copy, axis);
                assert_eq!(
                    m.pref_size(li),
                    m.pref_size(m.component_interval(source, axis))
                );
            }
        }
        m.check_integrity().unwrap();
    }

    #[test]
    fn pasted_copy_lands_in_a_new_layer() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        drop_new(&mut d, "b", Rect::new(10.0, 40.0, 110.0, 60.0));
        d.copy_layout(&[("a", "a2")], "form").unwrap();
        let m = d.model();
        let form = m.component("form").unwrap();
        let a2 = m.component("a2").unwrap();
        assert_eq!(m.component_parent(a2), Some(form));
        assert_eq!(m.layout_roots(form).len(), 2);
        assert!(d.is_unplaced_component("a2"));
        assert!(!d.is_unplaced_component("a"));
        m.check_integrity().unwrap();
    }

    #[test]
    fn outside_bounds_fill_an_empty_container() {
        let mut d = designer();
        d.copy_layout_from_outside(
            &[
                ("a", Rect::new(20.0, 20.0, 120.0, 40.0)),
                ("b", Rect::new(140.0, 20.0, 200.0, 40.0)),
            ],
            "form",
            false,
        )
        .unwrap();
        let m = d.model();
        let form = m.component("form").unwrap();
        assert_eq!(m.layout_roots(form).len(), 1);
        let a = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
        let b = m.component_interval(m.component("b").unwrap(), Axis::Horizontal);
        assert_eq!(m.parent(a), m.parent(b));
        assert!(m.is_sequential(m.parent(a).unwrap()));
        assert!(!d.is_unplaced_component("a"));
        m.check_integrity().unwrap();

        assert_eq!(
            d.copy_layout_from_outside(&[("a", Rect::ZERO)], "form", false),
            Err(LayoutError::AlreadyPlaced { id: "a".into() })
        );
    }

    #[test]
    fn duplicate_goes_below_by_default() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        d.duplicate_layout(&["a"], &["a2"], None, None).unwrap();
        let m = d.model();
        let a = m.component("a").unwrap();
        let a2 = m.component("a2").unwrap();
        let (av, a2v) = (
            m.component_interval(a, Axis::Vertical),
            m.component_interval(a2, Axis::Vertical),
        );
        let seq = m.parent(av).unwrap();
        assert_eq!(m.parent(a2v), Some(seq));
        assert!(m.index_of(seq, a2v) > m.index_of(seq, av));
        let (ah, a2h) = (
            m.component_interval(a, Axis::Horizontal),
            m.component_interval(a2, Axis::Horizontal),
        );
        assert!(m.common_parent(ah, a2h).is_some_and(|p| m.is_parallel(p)));
        m.check_integrity().unwrap();
    }

    #[test]
    fn enclosing_moves_components_into_the_new_container() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        drop_new(&mut d, "b", Rect::new(10.0, 40.0, 110.0, 60.0));
        d.enclose_in_container(&["a", "b"], "panel").unwrap();
        let m = d.model();
        let form = m.component("form").unwrap();
        let panel = m.component("panel").unwrap();
        assert_eq!(m.component_parent(panel), Some(form));
        for id in ["a", "b"] {
            let comp = m.component(id).unwrap();
            assert_eq!(m.component_parent(comp), Some(panel));
            let root = m.root_of(m.component_interval(comp, Axis::Horizontal));
            assert_eq!(m.default_root(panel, Axis::Horizontal), Some(root));
        }
        m.check_integrity().unwrap();
    }

    #[test]
    fn unspecified_component_takes_an_explicit_size() {
        let mut d = designer();
        d.mapper_mut().set_preferred_size("c", Size::new(80.0, 20.0));
        d.add_unspecified_component("c", None, Some(Size::new(120.0, 20.0)), Some("form"))
            .unwrap();
        let m = d.model();
        let c = m.component("c").unwrap();
        assert_eq!(m.pref_size(m.component_interval(c, Axis::Horizontal)), 120);
        assert_eq!(
            m.pref_size(m.component_interval(c, Axis::Vertical)),
            crate::types::NOT_EXPLICITLY_DEFINED
        );
        m.check_integrity().unwrap();
    }

    #[test]
    fn copy_shift_moves_away_from_snapped_borders() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        assert_eq!(d.suggest_copy_shift(&["a"], Axis::Horizontal), Ok(10));
        assert!(d.suggest_copy_shift(&["nope"], Axis::Vertical).is_err());
    }
}
