// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Alignment, resizability and default-size verbs.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Point, Size};

use super::geometry::minimum_design_size;
use super::{Designer, Upkeep, size_extent};
use crate::error::{LayoutError, Result};
use crate::mapper::VisualMapper;
use crate::model::{ComponentKey, GroupKind, IntervalId, LayoutModel};
use crate::types::{Alignment, Attributes, Axis, INFINITE_SIZE, Motion, NOT_EXPLICITLY_DEFINED};

/// How a component is anchored in its container along one axis, and which
/// anchors it can be switched to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AdjustableAlignment {
    /// The edge the component sticks to, `None` when it stretches or
    /// floats between both edges.
    pub current: Option<Alignment>,
    /// Whether it can be anchored to the leading edge.
    pub leading: bool,
    /// Whether it can be anchored to the trailing edge.
    pub trailing: bool,
}

/// Whether `interval` resizes only through fill gaps and groups of them.
fn fill_resizable(m: &LayoutModel, interval: IntervalId) -> bool {
    if !m.can_resize(interval) {
        return false;
    }
    if m.is_group(interval) {
        m.children(interval)
            .iter()
            .all(|&li| !m.want_resize(li) || fill_resizable(m, li))
    } else {
        m.has_attribute(interval, Attributes::FILL)
    }
}

impl<M: VisualMapper> Designer<M> {
    /// Where the component `id` is anchored along `axis`.
    ///
    /// Unknown or unplaced components report nothing adjustable.
    pub fn adjustable_component_alignment(&self, id: &str, axis: Axis) -> AdjustableAlignment {
        let m = &self.model;
        let Some(key) = m.component(id) else {
            return AdjustableAlignment::default();
        };
        let mut interval = m.component_interval(key, axis);
        if m.parent(interval).is_none() {
            return AdjustableAlignment::default();
        }
        let fixed = !m.want_resize(interval);
        let (mut leading_fixed, mut trailing_fixed) = (fixed, fixed);
        let (mut leading, mut trailing) = (fixed, fixed);
        while let Some(parent) = m.parent(interval) {
            if !m.can_resize(parent) {
                (leading_fixed, trailing_fixed, leading, trailing) = (true, true, true, true);
            } else if m.is_parallel(parent) {
                if m.want_resize(parent) && !m.want_resize(interval) {
                    match m.alignment(interval) {
                        Some(Alignment::Leading) => trailing_fixed = false,
                        Some(Alignment::Trailing) => leading_fixed = false,
                        _ => {}
                    }
                }
            } else {
                let mut before = true;
                for &li in m.children(parent) {
                    if li == interval {
                        before = false;
                    } else if m.want_resize(li) {
                        let gap = m.is_gap(li);
                        if before {
                            leading_fixed = false;
                            leading &= gap;
                        } else {
                            trailing_fixed = false;
                            trailing &= gap;
                        }
                    }
                }
            }
            interval = parent;
        }
        if leading_fixed && trailing_fixed {
            if m.group_alignment(interval) == Alignment::Leading {
                trailing_fixed = false;
            } else {
                leading_fixed = false;
            }
        }
        let current = if leading_fixed {
            Some(Alignment::Leading)
        } else if trailing_fixed {
            Some(Alignment::Trailing)
        } else {
            None
        };
        AdjustableAlignment {
            current,
            leading,
            trailing,
        }
    }

    /// Anchor the component `id` to the `alignment` edge along `axis`,
    /// keeping its current position.
    pub fn adjust_component_alignment(&mut self, id: &str, axis: Axis, alignment: Alignment) -> Result<()> {
        let key = self.resolve(id)?;
        if self.model.component_parent(key).is_none() {
            return Err(LayoutError::NotPlaced { id: id.into() });
        }
        if !alignment.is_edge() {
            tracing::debug!(?alignment, "only edges can anchor a component");
            return Ok(());
        }
        let m = &self.model;
        let mut interval = m.component_interval(key, axis);
        let mut parent = m.parent(interval);
        while let Some(p) = parent {
            if !m.can_resize(p) {
                interval = p;
            }
            parent = m.parent(p);
        }
        if m.want_resize(interval) {
            return Ok(());
        }
        let _session = self.model.edit_session();
        let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
        let root = upkeep.adjust_alignment(interval, axis, alignment);
        upkeep.update_design_modifications(root, axis);
        self.visual_state_up_to_date = false;
        tracing::debug!(id, ?axis, ?alignment, "adjusted alignment");
        Ok(())
    }

    /// Whether the component `id` stretches along `axis`.
    pub fn is_component_resizing(&self, id: &str, axis: Axis) -> Result<bool> {
        let key = self.resolve(id)?;
        let interval = self.model.component_interval(key, axis);
        if self.model.has_attribute(interval, Attributes::FILL) {
            return Ok(false);
        }
        Ok(self.model.want_resize_in_layout(interval))
    }

    /// Make the component `id` stretch along `axis`, or fix it at its
    /// current size, adapting the surrounding gaps to keep the layout.
    pub fn set_component_resizing(&mut self, id: &str, axis: Axis, resizing: bool) -> Result<()> {
        let key = self.resolve(id)?;
        let Some(container) = self.model.component_parent(key) else {
            return Err(LayoutError::NotPlaced { id: id.into() });
        };
        {
            let _session = self.model.edit_session();
            let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
            upkeep.set_component_resizing(key, axis, resizing);
        }
        self.visual_state_up_to_date = false;
        self.update_container_design(container);
        tracing::debug!(id, ?axis, resizing, "changed resizability");
        Ok(())
    }

    /// Whether the components can be aligned with each other: at least two,
    /// all placed in the same layer of one container.
    pub fn can_align(&self, ids: &[&str]) -> bool {
        if ids.len() < 2 {
            return false;
        }
        let mut common = None;
        for id in ids {
            let Some(key) = self.model.component(id) else {
                return false;
            };
            if self.model.component_parent(key).is_none() {
                return false;
            }
            let root = self
                .model
                .root_of(self.model.component_interval(key, Axis::Horizontal));
            match common {
                None => common = Some(root),
                Some(c) if c != root => return false,
                Some(_) => {}
            }
        }
        true
    }

    /// Align the components at `alignment` along `axis`.
    ///
    /// The component furthest out at the edge (the first one for center
    /// and baseline) stays put; every other one is dragged onto it. With
    /// `closed` the group holding them is closed at that edge.
    pub fn align(&mut self, ids: &[&str], closed: bool, axis: Axis, alignment: Alignment) -> Result<()> {
        if ids.len() < 2 {
            return Err(LayoutError::EmptySelection);
        }
        if !self.can_align(ids) {
            return Err(LayoutError::DifferentContainers);
        }
        if alignment == Alignment::Baseline && axis != Axis::Vertical {
            return Ok(());
        }
        let components = ids
            .iter()
            .map(|id| self.resolve(id))
            .collect::<Result<Vec<_>>>()?;
        let pos = |d: &Self, c: ComponentKey| {
            d.model
                .space(d.model.component_interval(c, axis))
                .pos(axis, alignment)
        };
        let target = match alignment {
            Alignment::Leading => components.iter().map(|&c| pos(self, c)).min(),
            Alignment::Trailing => components.iter().map(|&c| pos(self, c)).max(),
            _ => Some(pos(self, components[0])),
        };
        let Some(target) = target else {
            return Ok(());
        };

        for &comp in &components {
            let delta = target - pos(self, comp);
            if delta == 0 {
                continue;
            }
            let Some(container) = self.model.component_parent(comp) else {
                continue;
            };
            let space = *self
                .model
                .space(self.model.component_interval(comp, Axis::Horizontal));
            let corner = Axis::BOTH.map(|a| space.pos(a, Alignment::Leading));
            let mut cursor = corner;
            cursor[axis.index()] += delta;
            let mut motions = [Motion::Fixed; 2];
            motions[axis.index()] = Motion::Move;
            let hotspot = Point::new(f64::from(corner[0]), f64::from(corner[1]));
            let mut dragger = self.new_dragger(vec![comp], &[space.to_rect()], hotspot, motions);
            dragger.set_target_container(Some((container, self.model.parent_roots(comp))));
            dragger.move_to(&self.model, &self.mapper, cursor, true, false);
            self.commit_into(&dragger, container)?;
        }

        if closed {
            let intervals: Vec<IntervalId> = components
                .iter()
                .map(|&c| self.model.component_interval(c, axis))
                .collect();
            let group = self.model.common_parent_of(&intervals).and_then(|p| {
                if self.model.is_parallel(p) {
                    Some(p)
                } else {
                    self.model.first_parent(p, GroupKind::Parallel)
                }
            });
            if let Some(group) = group {
                self.model
                    .change_interval_attribute(group, Attributes::CLOSED_GROUP, true);
            }
        }
        self.visual_state_up_to_date = false;
        self.require_structure_optimization();
        tracing::debug!(count = ids.len(), ?axis, ?alignment, closed, "aligned components");
        Ok(())
    }

    /// Drop the explicit sizes of the component `id`. For a container this
    /// resets every resizable piece of its layout, recursively.
    pub fn set_default_size(&mut self, id: &str) -> Result<()> {
        let key = self.resolve(id)?;
        self.set_default_size_of(key);
        tracing::debug!(id, "reset to default size");
        Ok(())
    }

    fn set_default_size_of(&mut self, key: ComponentKey) {
        self.impose_size = true;
        if !self.model.is_container(key) {
            let mut upkeep = self.upkeep();
            for axis in Axis::BOTH {
                let interval = upkeep.model().component_interval(key, axis);
                upkeep.ops.resize_interval(interval, NOT_EXPLICITLY_DEFINED);
            }
            return;
        }
        for sub in self.model.subcomponents(key).to_vec() {
            if self.model.is_container(sub) {
                self.set_default_size_of(sub);
            }
        }
        let layers = self.model.layout_roots(key).to_vec();
        {
            let mut upkeep = self.upkeep();
            for root in layers.into_iter().flatten() {
                upkeep.set_default_size_in_container(root);
            }
        }
        self.update_container_design(key);
    }

    /// Smallest size the active layout of `container_id` can shrink to.
    pub fn computed_minimum_design_size(&self, container_id: &str) -> Result<Size> {
        let container = self.resolve_container(container_id)?;
        let roots = self.active_layout_roots(container);
        let [w, h] = Axis::BOTH.map(|axis| minimum_design_size(&self.model, &self.mapper, roots[axis.index()]));
        Ok(Size::new(f64::from(w), f64::from(h)))
    }
}

impl Upkeep<'_> {
    /// Re-anchor `interval` and its ancestors to `alignment`; returns the
    /// layout root.
    fn adjust_alignment(&mut self, mut interval: IntervalId, axis: Axis, alignment: Alignment) -> IntervalId {
        let mut changed = false;
        while let Some(parent) = self.model().parent(interval) {
            if self.model().is_parallel(parent) {
                let m = self.model();
                if m.want_resize(parent) && !m.want_resize(interval) {
                    let current = m.alignment(interval);
                    if current != Some(alignment) {
                        let size = m
                            .known_current_size(parent, axis)
                            .zip(m.known_current_size(interval, axis))
                            .map_or(0, |(group, sub)| group - sub);
                        if size > 0 {
                            let model = self.model_mut();
                            if !model.is_sequential(interval) {
                                let seq = model.new_sequential();
                                model.set_interval_alignment(interval, None);
                                let index = model.remove_interval(interval);
                                model.add_interval(interval, seq, None);
                                model.add_interval(seq, parent, Some(index));
                                interval = seq;
                            }
                            let index = if current == Some(Alignment::Leading) {
                                None
                            } else {
                                Some(0)
                            };
                            let gap = model.new_gap(size, size, size);
                            model.add_interval(gap, interval, index);
                        }
                        self.model_mut()
                            .set_interval_alignment(interval, Some(alignment));
                    }
                    changed = true;
                }
            } else {
                let mut before = true;
                let mut seq_changed = false;
                let mut i = 0;
                while i < self.model().child_count(parent) {
                    let li = self.model().child(parent, i);
                    if li == interval {
                        before = false;
                    } else if self.model().want_resize(li)
                        && ((before && alignment == Alignment::Leading)
                            || (!before && alignment == Alignment::Trailing))
                    {
                        debug_assert!(self.model().is_gap(li));
                        self.set_interval_resizing(li, false);
                        seq_changed = true;
                        if self.model().pref_size(li) == 0 {
                            let model = self.model_mut();
                            model.remove_interval(li);
                            model.discard(li);
                            continue;
                        }
                    }
                    i += 1;
                }
                if !changed && seq_changed {
                    let m = self.model();
                    let index = m.index_of(parent, interval).unwrap_or(0);
                    let (neighbor, insert_at) = if alignment == Alignment::Leading {
                        let next = (index + 1 < m.child_count(parent)).then(|| m.child(parent, index + 1));
                        (next, index + 1)
                    } else {
                        let prev = index.checked_sub(1).map(|p| m.child(parent, p));
                        (prev, index)
                    };
                    let gap = neighbor.filter(|&g| m.is_gap(g));
                    match gap {
                        Some(gap) => self.set_interval_resizing(gap, true),
                        None => {
                            let model = self.model_mut();
                            let gap = model.new_gap(0, 0, INFINITE_SIZE);
                            model.add_interval(gap, parent, Some(insert_at));
                        }
                    }
                    changed = true;
                }
            }
            interval = parent;
        }
        interval
    }

    /// Switch the resizability of a component interval and rebalance the
    /// gaps and siblings around it so the layout keeps its current look.
    pub(super) fn set_component_resizing(&mut self, key: ComponentKey, axis: Axis, resizing: bool) {
        let interval = self.model().component_interval(key, axis);
        if resizing && self.model().is_link_sized(key, axis) {
            self.fix_linked_sizes(key, axis);
        }
        let mut parent = self.model().parent(interval);
        let m = self.model();
        if m.attributes(interval)
            .intersects(Attributes::FILL | Attributes::FORMER_FILL)
        {
            self.switch_fill_attribute(interval, resizing);
        } else {
            self.set_interval_resizing(interval, resizing);
        }

        let mut delta = 0;
        if !resizing {
            if let Some(current) = self.model().known_current_size(interval, axis) {
                delta = current - self.pref_size_of_interval(interval);
                if delta != 0 {
                    self.set_pref(interval, current);
                }
            }
        }

        let mut intr = interval;
        let mut par = parent;
        while let Some(p) = par {
            let m = self.model();
            if resizing && m.is_parallel(p) {
                let sizes = m.known_current_size(p, axis).zip(m.known_current_size(intr, axis));
                if let Some((group_size, size)) = sizes
                    && group_size != size
                {
                    self.pad_in_parallel(intr, p, axis, group_size - size);
                }
            } else if m.is_sequential(p) {
                let parent_seq = parent == Some(p);
                let alignment = if parent_seq {
                    m.effective_alignment(interval)
                } else {
                    None
                };
                let mut resizable = Vec::new();
                let mut leading_gap: Option<IntervalId> = None;
                let mut trailing_gap: Option<IntervalId> = None;
                let mut after_defining = false;
                for candidate in m.children(p).to_vec() {
                    if candidate == interval {
                        after_defining = true;
                    }
                    let m = self.model();
                    if !m.is_gap(candidate) {
                        if m.max_size(candidate) == INFINITE_SIZE {
                            resizable.push(candidate);
                        }
                        continue;
                    }
                    if resizing {
                        self.set_interval_resizing(candidate, false);
                        let current = self.model().known_current_size(candidate, axis);
                        let pref = self.pref_size_of_interval(candidate);
                        if let Some(current) = current
                            && current != pref
                        {
                            self.set_pref(candidate, current);
                            delta += current - pref;
                        }
                    } else if parent_seq {
                        let former_fill = |g: Option<IntervalId>| g.is_some_and(|g| m.has_attribute(g, Attributes::FORMER_FILL));
                        let was_fill = m.has_attribute(candidate, Attributes::FORMER_FILL);
                        let glue = m.pref_size(candidate) != NOT_EXPLICITLY_DEFINED;
                        if was_fill {
                            trailing_gap = Some(candidate);
                        } else if !former_fill(trailing_gap)
                            && (glue
                                || (after_defining
                                    && trailing_gap.is_none_or(|g| m.pref_size(g) == NOT_EXPLICITLY_DEFINED)))
                        {
                            trailing_gap = Some(candidate);
                        }
                        if leading_gap.is_none() && !after_defining {
                            leading_gap = Some(candidate);
                        } else if (was_fill && !former_fill(leading_gap))
                            || (glue
                                && leading_gap.is_none_or(|g| {
                                    !m.has_attribute(g, Attributes::FORMER_FILL)
                                        && m.pref_size(g) == NOT_EXPLICITLY_DEFINED
                                }))
                        {
                            leading_gap = Some(candidate);
                        }
                    }
                }

                if !resizable.is_empty() {
                    let count = i32::try_from(resizable.len()).unwrap_or(i32::MAX);
                    if let Some(group_size) = self.model().known_current_size(p, axis) {
                        delta = (group_size - self.pref_size_of_interval(p) + delta) / count;
                    }
                    for candidate in resizable {
                        if self.model().is_group(candidate) {
                            continue;
                        }
                        if candidate == interval {
                            if delta != 0 {
                                let pref = self.pref_size_of_interval(candidate);
                                self.set_pref(candidate, (pref - delta).max(0));
                            }
                        } else {
                            if let Some(current) = self.model().known_current_size(candidate, axis) {
                                self.set_pref(candidate, (current - delta).max(0));
                            }
                        }
                    }
                }

                if parent_seq {
                    if !self.model().want_resize(p) {
                        let gap = match alignment {
                            Some(Alignment::Trailing) => leading_gap,
                            Some(Alignment::Leading) => trailing_gap,
                            _ => None,
                        };
                        if let Some(gap) = gap {
                            self.set_interval_resizing(gap, !resizing);
                            self.model_mut()
                                .change_interval_attribute(gap, Attributes::FILL, true);
                            let pref = self.model().pref_size(gap);
                            if delta != 0 && pref != NOT_EXPLICITLY_DEFINED {
                                self.set_pref(gap, (pref - delta).max(0));
                            }
                        }
                    }
                    parent = self.model().parent(p);
                }
            }
            intr = p;
            par = self.model().parent(p);
        }

        if resizing {
            self.model_mut().unset_same_size(&[key], axis);
            while let Some(p) = parent {
                if !self.model().can_resize(p) {
                    self.ops.enable_group_resizing(p);
                }
                parent = self.model().parent(p);
            }
        } else {
            while let Some(p) = parent {
                if !fill_resizable(self.model(), p) {
                    break;
                }
                self.ops.suppress_group_resizing(p);
                parent = self.model().parent(p);
            }
        }
    }

    /// Pin the current size of a link-sized component (of both members when
    /// it is linked with just one other).
    fn fix_linked_sizes(&mut self, key: ComponentKey, axis: Axis) {
        let m = self.model();
        let linked = m
            .link_size_id(key, axis)
            .and_then(|id| m.link_size_groups(axis).remove(&id))
            .unwrap_or_default();
        let to_change = if linked.len() == 2 { linked } else { vec![key] };
        for comp in to_change {
            let m = self.model();
            let interval = m.component_interval(comp, axis);
            let pref = self
                .mapper()
                .component_preferred_size(m.component_id(comp))
                .map_or(0, |s| size_extent(s, axis));
            let mut current = m.space(interval).size(axis);
            if current == pref {
                current = NOT_EXPLICITLY_DEFINED;
            }
            self.set_pref(interval, current);
        }
    }

    /// Fill the `extra` space `interval` leaves in the parallel `group` with
    /// a fixed gap on its free side.
    fn pad_in_parallel(&mut self, interval: IntervalId, group: IntervalId, axis: Axis, extra: i32) {
        let model = self.model_mut();
        let alignment = model.alignment(interval);
        let leading = alignment == Some(Alignment::Leading);
        let mut size = extra;
        let seq = if model.is_sequential(interval) {
            let count = model.child_count(interval);
            if count > 0 {
                let adjacent = model.child(interval, if leading { count - 1 } else { 0 });
                if model.is_gap(adjacent) {
                    size += model.known_current_size(adjacent, axis).unwrap_or(0);
                    model.remove_interval(adjacent);
                    model.discard(adjacent);
                }
            }
            interval
        } else {
            let seq = model.new_sequential();
            model.set_interval_alignment(interval, None);
            model.set_interval_alignment(seq, alignment);
            let index = model.remove_interval(interval);
            model.add_interval(interval, seq, None);
            model.add_interval(seq, group, Some(index));
            seq
        };
        let gap = model.new_gap(size, size, size);
        model.add_interval(gap, seq, if leading { None } else { Some(0) });
        let group_space = *model.space(group);
        model.space_mut(seq).copy_axis(axis, &group_space);
    }

    fn set_pref(&mut self, interval: IntervalId, pref: i32) {
        let model = self.model_mut();
        let (min, max) = (model.min_size(interval), model.max_size(interval));
        model.set_interval_size(interval, min, pref, max);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use super::AdjustableAlignment;
    use super::super::tests::{designer, drop_new};
    use crate::types::{Alignment, Axis, NOT_EXPLICITLY_DEFINED};

    #[test]
    fn dropped_component_holds_to_the_leading_edge() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        let adjustable = d.adjustable_component_alignment("a", Axis::Horizontal);
        assert_eq!(adjustable.current, Some(Alignment::Leading));
        assert!(adjustable.leading);
        assert_eq!(
            d.adjustable_component_alignment("missing", Axis::Horizontal),
            AdjustableAlignment::default()
        );
    }

    #[test]
    fn resizability_toggles_back_and_forth() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        assert!(!d.is_component_resizing("a", Axis::Horizontal).unwrap());

        d.set_component_resizing("a", Axis::Horizontal, true).unwrap();
        assert!(d.is_component_resizing("a", Axis::Horizontal).unwrap());
        assert!(!d.is_component_resizing("a", Axis::Vertical).unwrap());
        d.model().check_integrity().unwrap();
        d.update_current_state();

        d.set_component_resizing("a", Axis::Horizontal, false).unwrap();
        assert!(!d.is_component_resizing("a", Axis::Horizontal).unwrap());
        d.model().check_integrity().unwrap();
        assert!(d.set_component_resizing("missing", Axis::Horizontal, true).is_err());
    }

    #[test]
    fn anchoring_to_the_trailing_edge() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        drop_new(&mut d, "b", Rect::new(20.0, 60.0, 380.0, 80.0));
        d.set_component_resizing("b", Axis::Horizontal, true).unwrap();
        d.update_current_state();

        d.adjust_component_alignment("a", Axis::Horizontal, Alignment::Trailing)
            .unwrap();
        let adjustable = d.adjustable_component_alignment("a", Axis::Horizontal);
        assert_eq!(adjustable.current, Some(Alignment::Trailing));
        d.model().check_integrity().unwrap();
    }

    #[test]
    fn alignment_needs_two_placed_components() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        drop_new(&mut d, "b", Rect::new(60.0, 60.0, 160.0, 80.0));
        assert!(d.can_align(&["a", "b"]));
        assert!(!d.can_align(&["a"]));
        assert!(!d.can_align(&["a", "missing"]));
        assert!(
            d.align(&["a"], false, Axis::Horizontal, Alignment::Leading)
                .is_err()
        );
    }

    #[test]
    fn aligned_components_share_a_parallel_group() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        drop_new(&mut d, "b", Rect::new(60.0, 60.0, 160.0, 80.0));
        d.align(&["a", "b"], false, Axis::Horizontal, Alignment::Leading)
            .unwrap();
        let m = d.model();
        let a = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
        let b = m.component_interval(m.component("b").unwrap(), Axis::Horizontal);
        let common = m.common_parent(a, b).unwrap();
        assert!(m.is_parallel(common));
        m.check_integrity().unwrap();
    }

    #[test]
    fn default_size_drops_the_explicit_size() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        d.start_resizing(
            &["a"],
            &[Rect::new(10.0, 10.0, 110.0, 30.0)],
            Point::new(110.0, 20.0),
            [Some(Alignment::Trailing), None],
            true,
        )
        .unwrap();
        d.move_to(Point::new(170.0, 20.0), Some("form"), false, false)
            .unwrap();
        d.end_moving(true).unwrap();
        let m = d.model();
        let h = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
        assert_eq!(m.pref_size(h), 160);

        d.set_default_size("a").unwrap();
        assert_eq!(d.model().pref_size(h), NOT_EXPLICITLY_DEFINED);
        assert!(d.set_default_size("missing").is_err());
    }

    #[test]
    fn minimum_design_size_covers_the_content() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        let min = d.computed_minimum_design_size("form").unwrap();
        assert!(min.width >= 100.0);
        assert!(min.height >= 20.0);
        assert!(d.computed_minimum_design_size("a").is_err());
    }
}
