// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recomputing cached geometry and writing pixel sizes back into the model.

use alloc::string::String;

use kurbo::Size;

use super::{Upkeep, active_roots, clean_design_attrs, size_extent};
use crate::dragger::SizeDef;
use crate::mapper::VisualMapper;
use crate::model::{ComponentKey, GroupKind, IntervalId, IntervalKind, LayoutModel};
use crate::region::{Region, UNKNOWN, abs_distance, span};
use crate::types::{
    Alignment, Attributes, Axis, INFINITE_SIZE, Motion, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE,
};
use crate::utils::size_of_default_gap;

/// Whether a gap may absorb the extra space of a resized container.
fn can_be_container_resizing_gap(model: &LayoutModel, li: IntervalId) -> bool {
    model.is_gap(li)
        && (model.pref_size(li) != NOT_EXPLICITLY_DEFINED || model.max_size(li) >= INFINITE_SIZE)
}

/// Candidate resizing gap of a parallel `group`: at the `edge` end of every
/// member sequence, or in the middle of a single sequence when `edge` is `None`.
fn container_resizing_gap_at(
    model: &LayoutModel,
    group: IntervalId,
    axis: Axis,
    edge: Option<Alignment>,
) -> Option<IntervalId> {
    debug_assert!(model.is_parallel(group));
    let mut the_gap = None;
    let mut gap_size = i32::MAX;
    for &seq in model.children(group) {
        if !model.is_sequential(seq) {
            return None;
        }
        let n = model.child_count(seq);
        let Some(edge) = edge else {
            for i in (1..n.saturating_sub(1)).rev() {
                let li = model.child(seq, i);
                if can_be_container_resizing_gap(model, li) && model.can_resize(li) {
                    return (model.child_count(group) == 1).then_some(li);
                }
            }
            return None;
        };
        let li = match edge {
            Alignment::Leading => model.child(seq, 0),
            _ => model.child(seq, n - 1),
        };
        let gap = if can_be_container_resizing_gap(model, li)
            && (model.want_resize(seq) || model.effective_alignment(li) == Some(edge.opposite()))
        {
            Some(li)
        } else if model.is_parallel(li) {
            container_resizing_gap_at(model, li, axis, Some(edge))
        } else {
            None
        };
        let gap = gap?;
        let neighbor = model.direct_neighbor(gap, edge.opposite(), false)?;
        let p1 = model.space(neighbor).pos(axis, edge);
        let p2 = model.space(group).pos(axis, edge);
        let size = abs_distance(span(p1, p2));
        if the_gap.is_none() || size < gap_size {
            the_gap = Some(gap);
            gap_size = size;
        }
    }
    the_gap
}

impl Upkeep<'_> {
    /// Recompute the cached region of `interval` on `axis` bottom-up from
    /// its children. With `impose_gaps` the measured gap sizes are written
    /// into the gaps.
    pub(super) fn update_layout_structure(&mut self, interval: IntervalId, axis: Axis, impose_gaps: bool) {
        let model = self.model();
        let children = model.children(interval).to_vec();
        let sequential = model.is_sequential(interval);
        let mut baseline =
            model.is_parallel(interval) && model.group_alignment(interval) == Alignment::Baseline;
        let mut first = true;
        let mut first_resizing_space = false;
        let mut leading_space = 0;
        let mut skip_next = false;
        let n = children.len();

        for (i, &sub) in children.iter().enumerate() {
            let has_next = i + 1 < n;
            if self.model().is_gap(sub) {
                if !sequential {
                    debug_assert!(self.model().parent(interval).is_none());
                    let space = *self.model().space(interval);
                    if impose_gaps && space.is_axis_set(axis) {
                        self.impose_current_gap_size(sub, space.size(axis));
                    }
                } else if first || !has_next {
                    let m = self.model();
                    let min = m.min_size_at(sub, true);
                    let pref = m.pref_size(sub);
                    let max = m.max_size_at(sub, true);
                    if (min == pref || min == USE_PREFERRED_SIZE)
                        && (pref == max || max == USE_PREFERRED_SIZE)
                        && pref != NOT_EXPLICITLY_DEFINED
                    {
                        if first {
                            leading_space = pref;
                        } else {
                            self.reshape(interval, axis, Alignment::Trailing, pref);
                        }
                    } else {
                        let edge = if first {
                            Alignment::Leading
                        } else {
                            Alignment::Trailing
                        };
                        let trailing = m.space(interval).pos(axis, Alignment::Trailing);
                        let mut current_pref = UNKNOWN;
                        match m.neighbor_in(sub, GroupKind::Sequential, edge) {
                            None => {
                                let root_space = *m.space(m.root_of(interval));
                                if first {
                                    let pos = root_space.pos(axis, Alignment::Leading);
                                    if pos != UNKNOWN {
                                        first_resizing_space = true;
                                        leading_space = -pos;
                                    }
                                } else {
                                    current_pref = span(trailing, root_space.pos(axis, Alignment::Trailing));
                                    self.reshape(interval, axis, Alignment::Trailing, current_pref);
                                }
                            }
                            Some(sibling) if m.is_gap(sibling) => {
                                let mut parent = m.parent(interval);
                                let mut aligned_parent = parent;
                                while let Some(p) = parent
                                    && m.is_aligned_at_border_in(interval, p, edge)
                                {
                                    aligned_parent = Some(p);
                                    parent = m.parent(p);
                                }
                                let outer = aligned_parent
                                    .and_then(|p| m.outermost_component(p, axis, edge))
                                    .map(|c| *m.space(c));
                                if let Some(par_space) = outer {
                                    if first {
                                        let pos = par_space.pos(axis, Alignment::Leading);
                                        if pos != UNKNOWN {
                                            first_resizing_space = true;
                                            leading_space = -pos;
                                        }
                                    } else {
                                        current_pref =
                                            span(trailing, par_space.pos(axis, Alignment::Trailing));
                                        self.reshape(interval, axis, Alignment::Trailing, current_pref);
                                    }
                                }
                            }
                            Some(sibling) => {
                                if first {
                                    let pos = m.space(sibling).pos(axis, Alignment::Trailing);
                                    if pos != UNKNOWN {
                                        first_resizing_space = true;
                                        leading_space = -pos;
                                    }
                                } else {
                                    if !m.is_component(sibling) {
                                        self.model_mut().space_mut(sibling).reset();
                                        self.update_layout_structure(sibling, axis, impose_gaps);
                                        skip_next = true;
                                    }
                                    let sib_pos = self.model().space(sibling).pos(axis, Alignment::Leading);
                                    current_pref = span(trailing, sib_pos);
                                    self.reshape(interval, axis, Alignment::Trailing, current_pref);
                                }
                            }
                        }
                        if impose_gaps && current_pref != UNKNOWN {
                            self.impose_current_gap_size(sub, current_pref);
                        }
                    }
                } else if impose_gaps
                    && let Some(sibling) = self.model().direct_neighbor(sub, Alignment::Trailing, false)
                {
                    debug_assert!(!self.model().is_gap(sibling));
                    if !self.model().is_component(sibling) {
                        self.model_mut().space_mut(sibling).reset();
                        self.update_layout_structure(sibling, axis, impose_gaps);
                        skip_next = true;
                    }
                    let m = self.model();
                    let current_size = Region::distance(
                        m.space(interval),
                        m.space(sibling),
                        axis,
                        Alignment::Trailing,
                        Alignment::Leading,
                    );
                    self.impose_current_gap_size(sub, current_size);
                }
                first = false;
                continue;
            }

            if skip_next {
                skip_next = false;
            } else if self.model().is_group(sub) {
                debug_assert!(self.model().child_count(sub) > 0);
                self.model_mut().space_mut(sub).reset();
                self.update_layout_structure(sub, axis, impose_gaps);
            }
            let sub_space = *self.model().space(sub);
            self.model_mut().space_mut(interval).expand(&sub_space);
            if baseline && self.model().is_component(sub) {
                let baseline_pos = sub_space.pos(axis, Alignment::Baseline);
                if baseline_pos != UNKNOWN {
                    self.model_mut()
                        .space_mut(interval)
                        .set_pos(axis, Alignment::Baseline, baseline_pos);
                    baseline = false;
                }
            }
            if first_resizing_space {
                let leading = self.model().space(interval).pos(axis, Alignment::Leading);
                first_resizing_space = false;
                if leading == UNKNOWN {
                    leading_space = 0;
                } else {
                    leading_space += leading;
                    if impose_gaps {
                        self.impose_current_gap_size(children[0], leading_space);
                    }
                }
            }
            first = false;
        }
        if leading_space != 0 {
            self.reshape(interval, axis, Alignment::Leading, -leading_space);
        }
    }

    fn reshape(&mut self, interval: IntervalId, axis: Axis, edge: Alignment, offset: i32) {
        self.model_mut()
            .space_mut(interval)
            .reshape(axis, Motion::Resize(edge), offset);
    }

    /// Write the measured size of a gap back, as default padding when it matches.
    pub(super) fn impose_current_gap_size(&mut self, gap: IntervalId, current_size: i32) {
        let m = self.model();
        let mapper = self.mapper();
        let mut pad = None;
        let mut min = m.min_size(gap);
        let mut pref = m.pref_size(gap);
        if pref == NOT_EXPLICITLY_DEFINED {
            if !m.want_resize_in_layout(gap) {
                return;
            }
            let p = size_of_default_gap(m, gap, mapper);
            pad = Some(p);
            pref = p;
        } else if pref < 0 {
            let p = size_of_default_gap(m, gap, mapper);
            pad = Some(p);
            pref = p;
        }
        if current_size == pref || current_size == UNKNOWN {
            return;
        }
        if min == NOT_EXPLICITLY_DEFINED {
            min = *pad.get_or_insert_with(|| size_of_default_gap(m, gap, mapper));
        } else if min == USE_PREFERRED_SIZE {
            min = pref;
        }
        let current = current_size.max(min).max(0);
        let size = if Some(current) == pad {
            NOT_EXPLICITLY_DEFINED
        } else {
            current
        };
        self.ops.resize_interval(gap, size);
    }

    /// Record the current size of a component that resizes in the layout
    /// as its explicit preferred size.
    pub(super) fn impose_current_component_size(&mut self, comp: ComponentKey) {
        let mapper = self.mapper();
        let preferred = mapper
            .component_preferred_size(self.model().component_id(comp))
            .unwrap_or(Size::ZERO);
        for axis in Axis::BOTH {
            let m = self.model();
            let li = m.component_interval(comp, axis);
            let mut def_pref = m.pref_size(li);
            if !m.has_attribute(li, Attributes::FORCED_DEFAULT)
                && m.want_resize_in_layout(li)
                && def_pref != 0
            {
                let current = m.space(li).size(axis);
                let pref = size_extent(preferred, axis);
                if def_pref == NOT_EXPLICITLY_DEFINED {
                    def_pref = pref;
                }
                if def_pref != current && current != UNKNOWN {
                    let size = if current != pref {
                        current
                    } else {
                        NOT_EXPLICITLY_DEFINED
                    };
                    self.ops.resize_interval(li, size);
                }
            }
            self.model_mut().unset_attribute(li, Attributes::FORCED_DEFAULT);
        }
    }

    /// Refresh a container from the mapper and write its current pixel
    /// sizes into its layout. Returns false if the mapper does not know
    /// the container.
    ///
    /// `sizes` carries the reference sizes of a resize gesture that just
    /// ended on this container.
    pub(super) fn impose_current_container_size(
        &mut self,
        container: ComponentKey,
        sizes: Option<[Option<SizeDef>; 2]>,
        recursive: bool,
    ) -> bool {
        debug_assert!(self.model().is_container(container));
        let mapper = self.mapper();
        let id: String = self.model().component_id(container).into();
        let Some(interior) = mapper.container_interior(&id) else {
            return false;
        };
        self.model_mut().set_current_interior(container, interior);
        let placed = self.model().component_parent(container).is_some();
        if placed {
            self.refresh_bounds(container);
        }
        for sub in self.model().subcomponents(container).to_vec() {
            self.refresh_bounds(sub);
            if self.model().is_container(sub) {
                if recursive {
                    self.impose_current_container_size(sub, None, true);
                }
            } else {
                self.impose_current_component_size(sub);
            }
        }

        let mut metrics: Option<(Size, Size)> = None;
        for axis in Axis::BOTH {
            let i = axis.index();
            let m = self.model();
            let outer = m.component_interval(container, axis);
            let current_size = m.space(outer).size(axis);
            let default_root = active_roots(m, container)[i];
            for roots in m.layout_roots(container).to_vec() {
                let root = roots[i];
                let empty = self.model().child_count(root) == 0;
                if root == default_root {
                    if empty {
                        self.prop_empty_container(root, axis);
                    } else if let Some(def) = sizes.and_then(|s| s[i]) {
                        let m = self.model();
                        let gap = def
                            .resizing_gap
                            .filter(|&g| m.is_alive(g) && m.parent(g).is_some());
                        match (gap, def.resizing_gap_size(current_size)) {
                            (Some(gap), Some(size)) => self.apply_resizing_gap_size(root, gap, size),
                            _ if !m.want_resize(root) => {
                                let min_size = self.compute_minimum_design_size(root);
                                let growth = self
                                    .model()
                                    .known_current_size(root, axis)
                                    .map_or(0, |size| size - min_size);
                                if growth > 0 {
                                    let model = self.model_mut();
                                    let end_gap =
                                        model.new_gap(NOT_EXPLICITLY_DEFINED, growth, INFINITE_SIZE);
                                    self.ops
                                        .insert_gap(end_gap, root, min_size, axis, Alignment::Trailing);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                if !empty {
                    self.update_layout_structure(root, axis, true);
                }
            }
            if placed && current_size != UNKNOWN {
                let (minimum, preferred) = *metrics.get_or_insert_with(|| {
                    (
                        mapper.component_minimum_size(&id).unwrap_or(Size::ZERO),
                        mapper.component_preferred_size(&id).unwrap_or(Size::ZERO),
                    )
                });
                let min = size_extent(minimum, axis);
                let external = (mapper.has_explicit_preferred_size(&id)
                    && current_size != size_extent(preferred, axis))
                    || current_size < min
                    || (current_size > min && !self.model().want_resize(default_root));
                let size = if external {
                    current_size
                } else {
                    NOT_EXPLICITLY_DEFINED
                };
                self.ops.resize_interval(outer, size);
            }
        }
        true
    }

    fn apply_resizing_gap_size(&mut self, root: IntervalId, res_gap: IntervalId, size: i32) {
        if size != 0 {
            self.ops.resize_interval(res_gap, size);
            let m = self.model();
            if size == NOT_EXPLICITLY_DEFINED && m.can_resize(res_gap) {
                let (min, pref) = (m.min_size(res_gap), m.pref_size(res_gap));
                let model = self.model_mut();
                model.set_interval_size(res_gap, min, pref, USE_PREFERRED_SIZE);
                let layout_resizing = model.want_resize(root);
                model.set_interval_size(res_gap, min, pref, INFINITE_SIZE);
                if layout_resizing {
                    model.set_interval_size(
                        res_gap,
                        NOT_EXPLICITLY_DEFINED,
                        NOT_EXPLICITLY_DEFINED,
                        USE_PREFERRED_SIZE,
                    );
                }
            }
            return;
        }
        let Some(gap_parent) = self.model().parent(res_gap) else {
            return;
        };
        debug_assert!(self.model().is_sequential(gap_parent));
        let resizable = self.model().can_resize(res_gap);
        let index = self.model_mut().remove_interval(res_gap);
        let m = self.model();
        let count = m.child_count(gap_parent);
        if count == 1 {
            if let Some(outer) = m.parent(gap_parent) {
                let model = self.model_mut();
                let last = model.remove_interval_at(gap_parent, 0);
                let at = model.remove_interval(gap_parent);
                self.ops.add_content(last, outer, Some(at));
            }
        } else if count > 1 && resizable && !m.want_resize(root) {
            let other = m.child(gap_parent, if index == 0 { count - 1 } else { 0 });
            if m.is_gap(other) {
                let pref = m.pref_size(other);
                self.model_mut()
                    .set_interval_size(other, NOT_EXPLICITLY_DEFINED, pref, INFINITE_SIZE);
            }
        }
    }

    /// Fill an empty root with a gap that keeps the container at its size.
    pub(super) fn prop_empty_container(&mut self, root: IntervalId, axis: Axis) {
        let m = self.model();
        debug_assert!(m.parent(root).is_none() && m.child_count(root) == 0);
        let size = m.space(root).size(axis).max(0);
        let model = self.model_mut();
        let gap = model.new_gap(0, size, INFINITE_SIZE);
        model.add_interval(gap, root, Some(0));
    }

    /// Smallest size `interval` can take at design time.
    pub(super) fn compute_minimum_design_size(&self, interval: IntervalId) -> i32 {
        minimum_design_size(self.model(), self.mapper(), interval)
    }

    /// Preferred size of `interval`, resolving default sizes through the
    /// mapper. Link-sized components take the largest size of their group.
    pub(super) fn pref_size_of_interval(&self, interval: IntervalId) -> i32 {
        let m = self.model();
        let mapper = self.mapper();
        let component_pref = |comp: ComponentKey, axis: Axis| -> i32 {
            let pref = m.pref_size(m.component_interval(comp, axis));
            if pref != NOT_EXPLICITLY_DEFINED {
                return pref;
            }
            let size = mapper
                .component_preferred_size(m.component_id(comp))
                .unwrap_or(Size::ZERO);
            size_extent(size, axis)
        };
        if let Some(comp) = m.component_of(interval) {
            let axis = m.component_axis(interval);
            if let Some(link) = m.link_size_id(comp, axis) {
                let groups = m.link_size_groups(axis);
                if let Some(linked) = groups.get(&link) {
                    return linked
                        .iter()
                        .map(|&c| component_pref(c, axis))
                        .max()
                        .unwrap_or(0);
                }
            }
            return component_pref(comp, axis);
        }
        let pref = m.pref_size(interval);
        if pref != NOT_EXPLICITLY_DEFINED {
            return pref;
        }
        match m.kind(interval) {
            IntervalKind::Sequential { children } => children
                .iter()
                .map(|&li| self.pref_size_of_interval(li))
                .sum(),
            IntervalKind::Parallel { children, .. } => children
                .iter()
                .map(|&li| self.pref_size_of_interval(li))
                .max()
                .unwrap_or(0),
            _ => size_of_default_gap(m, interval, mapper),
        }
    }

    /// Clean the design attributes below `root` and pick the gap that
    /// absorbs the container's extra space.
    pub(super) fn update_design_modifications(&mut self, root: IntervalId, axis: Axis) {
        clean_design_attrs(self.model_mut(), root);
        self.find_container_resizing_gap(root, axis);
    }

    fn find_container_resizing_gap(&mut self, root: IntervalId, axis: Axis) {
        let m = self.model();
        if !m.want_resize(root) && m.current_size(root, axis) != self.pref_size_of_interval(root) {
            return;
        }
        let at = |edge| container_resizing_gap_at(m, root, axis, edge);
        let mut position = Some(Alignment::Trailing);
        let res_gap = match at(position) {
            None => {
                position = Some(Alignment::Leading);
                match at(position) {
                    Some(gap) => gap,
                    None => {
                        position = None;
                        let Some(gap) = at(None) else {
                            return;
                        };
                        gap
                    }
                }
            }
            Some(gap) if !m.can_resize(gap) => {
                if let Some(leading) = at(Some(Alignment::Leading)).filter(|&g| m.can_resize(g)) {
                    position = Some(Alignment::Leading);
                    leading
                } else if let Some(middle) = at(None).filter(|&g| m.can_resize(g)) {
                    position = None;
                    middle
                } else {
                    gap
                }
            }
            Some(gap) => gap,
        };
        tracing::trace!(?axis, ?position, "container resizing gap");

        let mut marks = alloc::vec![(
            res_gap,
            Attributes::DESIGN_CONTAINER_GAP | Attributes::DESIGN_RESIZING
        )];
        let mut sub = res_gap;
        let mut parent = m.parent(res_gap);
        while let Some(p) = parent {
            for &interval in m.children(p) {
                if interval == sub {
                    continue;
                }
                if m.is_sequential(p) || !m.is_sequential(interval) {
                    marks.push((interval, Attributes::DESIGN_SUPPRESSED_RESIZING));
                    continue;
                }
                let n = m.child_count(interval);
                for (i, &li) in m.children(interval).iter().enumerate() {
                    let at_edge = (i == 0 && position == Some(Alignment::Leading))
                        || (i + 1 == n && position == Some(Alignment::Trailing));
                    let attr = if at_edge && can_be_container_resizing_gap(m, li) {
                        Attributes::DESIGN_RESIZING
                    } else {
                        Attributes::DESIGN_SUPPRESSED_RESIZING
                    };
                    marks.push((li, attr));
                }
            }
            sub = p;
            parent = m.parent(p);
        }
        let model = self.model_mut();
        for (interval, attr) in marks {
            model.set_attribute(interval, attr);
        }
    }

    /// Reset every resizable leaf below `interval` to its default size.
    pub(super) fn set_default_size_in_container(&mut self, interval: IntervalId) {
        let m = self.model();
        if m.is_group(interval) {
            for li in m.children(interval).to_vec() {
                self.set_default_size_in_container(li);
            }
        } else if m.can_resize(interval) {
            let min = m.min_size(interval);
            let size = if min != USE_PREFERRED_SIZE && min >= 0 {
                min
            } else {
                NOT_EXPLICITLY_DEFINED
            };
            self.ops.resize_interval(interval, size);
            self.model_mut()
                .set_attribute(interval, Attributes::FORCED_DEFAULT);
        }
    }
}

/// Smallest size `interval` can take at design time.
pub(super) fn minimum_design_size(m: &LayoutModel, mapper: &dyn VisualMapper, interval: IntervalId) -> i32 {
    match m.kind(interval) {
        IntervalKind::Gap { .. } | IntervalKind::Component(_) => {
            let min = m.min_size_at(interval, true);
            let size = if min == USE_PREFERRED_SIZE {
                m.pref_size(interval)
            } else {
                min
            };
            if size != NOT_EXPLICITLY_DEFINED {
                return size;
            }
            match m.component_of(interval) {
                Some(comp) => {
                    let id = m.component_id(comp);
                    let size = if min == USE_PREFERRED_SIZE {
                        mapper.component_preferred_size(id)
                    } else {
                        mapper.component_minimum_size(id)
                    };
                    size_extent(size.unwrap_or(Size::ZERO), m.component_axis(interval))
                }
                None => size_of_default_gap(m, interval, mapper),
            }
        }
        IntervalKind::Sequential { children } => children
            .iter()
            .map(|&li| minimum_design_size(m, mapper, li))
            .sum(),
        IntervalKind::Parallel { children, .. } => children
            .iter()
            .map(|&li| minimum_design_size(m, mapper, li))
            .max()
            .unwrap_or(0),
    }
}
