// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stateful facade a host drives.
//!
//! A [`Designer`] owns the [`LayoutModel`] and a [`VisualMapper`]. The host
//! calls gesture verbs while the user drags, commits or cancels them, and
//! calls [`Designer::update_current_state`] after every real layout pass so
//! the model learns the actual pixel geometry again.
//!
//! ## State pull
//!
//! Two flags ask for more than a geometry refresh: *impose size* (the
//! current pixel sizes should be written back into the model as explicit
//! sizes) and *optimize structure* (redundant groups and gaps should be
//! cleaned up). Both start set. While either is set the pull opens an edit
//! session, cleans up, imposes sizes, asks the mapper to rebuild the
//! containers it touched, and then refreshes the geometry once more.
//!
//! ## Removal cleanup
//!
//! Component intervals removed outside an edit session are queued by the
//! model. The designer drains that queue after its own removals and at the
//! start of every pull, repairing the structure around each hole so the
//! remaining components keep their positions.

mod adjust;
mod cleanup;
mod copy;
mod geometry;
mod gesture;
mod paint;

pub use adjust::AdjustableAlignment;
pub use gesture::DragStep;

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashSet;
use kurbo::{Rect, Size};

use crate::config::Tuning;
use crate::dragger::Dragger;
use crate::error::{LayoutError, Result};
use crate::mapper::VisualMapper;
use crate::model::{ComponentKey, IntervalId, LayoutModel, RemovedInterval};
use crate::ops::Operations;
use crate::region::{Region, px};
use crate::types::Axis;

/// Interactive layout designer over one model.
#[derive(Debug)]
pub struct Designer<M> {
    model: LayoutModel,
    mapper: M,
    tuning: Tuning,
    dragger: Option<Dragger>,
    impose_size: bool,
    optimize_structure: bool,
    visual_state_up_to_date: bool,
}

impl<M: VisualMapper> Designer<M> {
    /// Create a designer with the default [`Tuning`].
    pub fn new(model: LayoutModel, mapper: M) -> Self {
        Self::with_tuning(model, mapper, Tuning::default())
    }

    /// Create a designer with explicit snapping thresholds.
    pub fn with_tuning(model: LayoutModel, mapper: M, tuning: Tuning) -> Self {
        Self {
            model,
            mapper,
            tuning,
            dragger: None,
            impose_size: true,
            optimize_structure: true,
            visual_state_up_to_date: false,
        }
    }

    /// The layout model.
    pub fn model(&self) -> &LayoutModel {
        &self.model
    }

    /// Mutable access to the layout model.
    ///
    /// Component intervals removed through it are repaired on the next
    /// [`update_current_state`](Self::update_current_state).
    pub fn model_mut(&mut self) -> &mut LayoutModel {
        &mut self.model
    }

    /// The visual mapper.
    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Mutable access to the visual mapper.
    pub fn mapper_mut(&mut self) -> &mut M {
        &mut self.mapper
    }

    /// Snapping thresholds used for new gestures.
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Give back the model and the mapper.
    pub fn into_parts(self) -> (LayoutModel, M) {
        (self.model, self.mapper)
    }

    /// Whether the cached geometry matches the last real layout pass.
    ///
    /// Drag steps are ignored while it does not.
    pub fn is_visual_state_up_to_date(&self) -> bool {
        self.visual_state_up_to_date
    }

    /// The gesture in progress, if any.
    pub fn dragger(&self) -> Option<&Dragger> {
        self.dragger.as_ref()
    }

    // --- state pull ---

    /// Synchronize the model with the pixel geometry reported by the mapper.
    ///
    /// Returns true if the model changed, in which case the host should run
    /// its layout again and call this once more.
    pub fn update_current_state(&mut self) -> bool {
        let mark = self.model.change_mark();
        self.process_removals();
        let change_required = self.impose_size || self.optimize_structure;
        let mut updated = HashSet::new();
        {
            let _session = change_required.then(|| self.model.edit_session());
            if change_required {
                let mut upkeep = self.upkeep();
                upkeep.destroy_all_redundant_groups(&mut updated);
                upkeep.ops.merge_adjacent_gaps(&mut updated);
            }
            self.update_positions(change_required.then_some(&mut updated));
        }
        if change_required {
            self.impose_size = false;
            self.optimize_structure = false;
            let rebuilt: Vec<String> = self
                .model
                .all_components()
                .filter(|c| updated.contains(c))
                .map(|c| self.model.component_id(c).into())
                .collect();
            for id in &rebuilt {
                self.mapper.rebuild_layout(id);
            }
            self.update_positions(None);
        }
        if self.dragger.is_none() {
            let freed = self.model.collect_detached();
            tracing::trace!(freed, "collected detached intervals");
        }
        self.visual_state_up_to_date = true;
        let changed = self.model.change_mark() != mark;
        tracing::debug!(changed, updated = updated.len(), "pulled current state");
        changed
    }

    /// The host resized something outside of a gesture; the next pull
    /// writes the new sizes into the model.
    pub fn external_size_change_happened(&mut self) {
        self.impose_size = true;
        self.visual_state_up_to_date = false;
    }

    /// Ask the next pull to clean up the structure of every container.
    pub fn require_structure_optimization(&mut self) {
        self.optimize_structure = true;
        self.visual_state_up_to_date = false;
        for container in self.containers() {
            for root in self.active_layout_roots(container) {
                clean_design_attrs(&mut self.model, root);
            }
        }
    }

    fn update_positions(&mut self, mut updated: Option<&mut HashSet<ComponentKey>>) {
        for container in self.containers() {
            if self.optimize_structure || self.impose_size {
                let optimize = self.optimize_structure;
                let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
                if !upkeep.impose_current_container_size(container, None, false) {
                    continue;
                }
                if let Some(updated) = updated.as_deref_mut() {
                    updated.insert(container);
                }
                if optimize {
                    for roots in upkeep.model().layout_roots(container).to_vec() {
                        for axis in Axis::BOTH {
                            let root = roots[axis.index()];
                            upkeep.optimize_gaps(root, axis, true);
                            upkeep.destroy_redundant_groups(root);
                        }
                    }
                }
                if let Some(roots) = upkeep.model().layout_roots(container).first().copied() {
                    for axis in Axis::BOTH {
                        upkeep.update_design_modifications(roots[axis.index()], axis);
                    }
                }
            } else {
                let id = self.model.component_id(container);
                let Some(interior) = self.mapper.container_interior(id) else {
                    continue;
                };
                let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
                upkeep.model_mut().set_current_interior(container, interior);
                for sub in upkeep.model().subcomponents(container).to_vec() {
                    upkeep.refresh_bounds(sub);
                }
                for roots in upkeep.model().layout_roots(container).to_vec() {
                    for axis in Axis::BOTH {
                        upkeep.update_layout_structure(roots[axis.index()], axis, false);
                    }
                }
            }
        }
    }

    // --- queries ---

    /// The subset of `ids` that can be dragged together.
    ///
    /// All of them must sit in one container; when they span several
    /// layers only those in the topmost layer are returned.
    pub fn draggable_components(&self, ids: &[&str]) -> Vec<String> {
        let mut container = None;
        let mut draggable = Vec::new();
        let mut common_layer = None;
        for &id in ids {
            let Some(comp) = self.model.component(id) else {
                continue;
            };
            let Some(parent) = self.model.component_parent(comp) else {
                continue;
            };
            match container {
                None => container = Some(parent),
                Some(c) if c != parent => return Vec::new(),
                Some(_) => {}
            }
            let interval = self.model.component_interval(comp, Axis::Horizontal);
            let Some(layer) = self.model.layout_roots_index(parent, interval) else {
                continue;
            };
            if common_layer.is_none_or(|common| layer >= common) {
                if common_layer.is_some_and(|common| layer > common) {
                    draggable.clear();
                }
                common_layer = Some(layer);
                draggable.push(String::from(id));
            }
        }
        draggable
    }

    /// Whether the component sits in a container but outside its default layer.
    pub fn is_unplaced_component(&self, id: &str) -> bool {
        let Some(comp) = self.model.component(id) else {
            return false;
        };
        let Some(container) = self.model.component_parent(comp) else {
            return false;
        };
        Some(self.model.parent_roots(comp)[Axis::Horizontal.index()])
            != self.model.default_root(container, Axis::Horizontal)
    }

    /// Codes describing where the gesture in progress would place the
    /// formation, one per axis; empty when no gesture is active.
    pub fn position_codes(&self) -> Vec<String> {
        self.dragger
            .as_ref()
            .map(|d| d.position_codes(&self.model))
            .unwrap_or_default()
    }

    // --- removal ---

    /// Remove a component and its intervals from its container, repairing
    /// the layout around the hole.
    ///
    /// The component stays registered unless `from_model` is set.
    pub fn remove_component(&mut self, id: &str, from_model: bool) -> Result<()> {
        let comp = self.resolve(id)?;
        self.model.remove_component_and_intervals(comp, from_model);
        self.process_removals();
        self.visual_state_up_to_date = false;
        tracing::debug!(id, "removed component");
        Ok(())
    }

    // --- helpers shared by the verbs ---

    fn upkeep(&mut self) -> Upkeep<'_> {
        let resizing = self.dragger.as_ref().is_some_and(Dragger::is_resizing);
        Upkeep::new(&mut self.model, &self.mapper, resizing)
    }

    /// Repair the layout around component intervals removed outside an
    /// edit session.
    fn process_removals(&mut self) {
        let keep = self.dragger.as_ref().and_then(Dragger::target_roots);
        let mut upkeep = self.upkeep();
        upkeep.keep_roots = keep;
        upkeep.process_removals();
    }

    fn resolve(&self, id: &str) -> Result<ComponentKey> {
        self.model.component(id).ok_or_else(|| LayoutError::unknown(id))
    }

    fn resolve_container(&self, id: &str) -> Result<ComponentKey> {
        let key = self
            .model
            .component(id)
            .ok_or_else(|| LayoutError::UnknownContainer { id: id.into() })?;
        if !self.model.is_container(key) {
            return Err(LayoutError::NotAContainer { id: id.into() });
        }
        Ok(key)
    }

    fn containers(&self) -> Vec<ComponentKey> {
        self.model
            .all_components()
            .filter(|&c| self.model.is_container(c))
            .collect()
    }

    fn active_layout_roots(&self, container: ComponentKey) -> [IntervalId; 2] {
        active_roots(&self.model, container)
    }

    /// Refresh the design attributes of the active layer of `container`;
    /// while a pull is owed they are only cleared.
    fn update_container_design(&mut self, container: ComponentKey) {
        let roots = active_roots(&self.model, container);
        let refresh = !self.impose_size && !self.optimize_structure;
        let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, false);
        for axis in Axis::BOTH {
            let root = roots[axis.index()];
            if refresh {
                upkeep.update_design_modifications(root, axis);
            } else {
                clean_design_attrs(upkeep.model_mut(), root);
            }
        }
    }

    fn container_space(&self, container: ComponentKey) -> Region {
        self.model
            .default_root(container, Axis::Horizontal)
            .map(|root| *self.model.space(root))
            .unwrap_or_default()
    }
}

/// Roots of the layer new content goes to.
pub(crate) fn active_roots(model: &LayoutModel, container: ComponentKey) -> [IntervalId; 2] {
    model.layout_roots(container)[0]
}

/// Drop all design-time attributes below `group`.
pub(crate) fn clean_design_attrs(model: &mut LayoutModel, group: IntervalId) {
    let mut stack = alloc::vec![group];
    while let Some(interval) = stack.pop() {
        model.unset_attribute(interval, crate::types::Attributes::DESIGN_ATTRS);
        stack.extend_from_slice(model.children(interval));
    }
}

/// Width and height of a rectangle in whole pixels.
fn rect_size(rect: Rect) -> (i32, i32) {
    (px(rect.width().round()), px(rect.height().round()))
}

/// Extent of a size along `axis` in whole pixels.
fn size_extent(size: Size, axis: Axis) -> i32 {
    match axis {
        Axis::Horizontal => px(size.width.round()),
        Axis::Vertical => px(size.height.round()),
    }
}

/// Tree upkeep shared by the designer verbs.
///
/// Needs the mapper for default gap sizes and component metrics, but none of
/// the designer's own state.
pub(crate) struct Upkeep<'a> {
    ops: Operations<'a>,
    /// Whether the gesture being committed resizes a component.
    resizing: bool,
    /// Layout roots that must survive even when they become empty.
    keep_roots: Option<[IntervalId; 2]>,
}

impl<'a> Upkeep<'a> {
    pub(crate) fn new(model: &'a mut LayoutModel, mapper: &'a dyn VisualMapper, resizing: bool) -> Self {
        Self {
            ops: Operations::new(model, mapper),
            resizing,
            keep_roots: None,
        }
    }

    fn model(&self) -> &LayoutModel {
        self.ops.model()
    }

    fn model_mut(&mut self) -> &mut LayoutModel {
        self.ops.model_mut()
    }

    fn mapper(&self) -> &'a dyn VisualMapper {
        self.ops.mapper()
    }

    /// Read the bounds and baseline of a component from the mapper.
    fn refresh_bounds(&mut self, key: ComponentKey) {
        let mapper = self.mapper();
        let id = self.model().component_id(key);
        let Some(bounds) = mapper.component_bounds(id) else {
            return;
        };
        let (w, h) = rect_size(bounds);
        let baseline = mapper.baseline_position(id, w, h);
        self.model_mut().set_current_bounds(key, bounds, baseline);
    }

    /// Drain the removal queue and repair around every removed interval.
    pub(crate) fn process_removals(&mut self) {
        if self.model().in_edit_session() {
            return;
        }
        let removed = self.model_mut().take_removed_intervals();
        if removed.is_empty() {
            return;
        }
        let _session = self.model().edit_session();
        for event in removed {
            self.layout_changed(event);
        }
    }

    fn layout_changed(&mut self, event: RemovedInterval) {
        let model = self.model();
        let Some(container) = event.container else {
            return;
        };
        if !model.is_alive(event.parent) || !model.is_container(container) {
            return;
        }
        let root = model.root_of(event.parent);
        if model.layout_roots_index(container, root).is_none() {
            return;
        }
        let axis = event.axis;
        tracing::trace!(?axis, index = event.index, "repairing after removal");
        let index = event.index.min(model.child_count(event.parent));
        self.interval_removed(event.parent, index, true, event.want_resize, axis);

        let model = self.model();
        if !model.is_alive(root) || model.child_count(root) > 0 {
            return;
        }
        if self.keep_roots.is_some_and(|keep| keep.contains(&root)) {
            return;
        }
        let layers = model.layout_roots(container).len();
        if active_roots(model, container)[axis.index()] == root && (layers != 2 || self.resizing) {
            self.prop_empty_container(root, axis);
        } else if !self.resizing {
            self.model_mut().remove_layout_roots(container, root);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use kurbo::{Point, Rect};

    use super::Designer;
    use crate::mapper::{Paddings, TableMapper};
    use crate::model::LayoutModel;
    use crate::types::{Alignment, Axis, NOT_EXPLICITLY_DEFINED};

    pub(super) fn designer() -> Designer<TableMapper> {
        let mut model = LayoutModel::new();
        let form = model.create_component("form", true);
        model.add_root_component(form);
        let mut mapper = TableMapper::new(Paddings {
            related: 8,
            unrelated: 16,
            separate: 24,
            indent: 16,
            container: 10,
        });
        mapper.set_interior("form", Rect::new(0.0, 0.0, 400.0, 300.0));
        Designer::new(model, mapper)
    }

    /// Add a fresh component through a full drag gesture and sync the mapper.
    pub(super) fn drop_new(d: &mut Designer<TableMapper>, id: &str, bounds: Rect) {
        d.mapper_mut().set_preferred_size(id, bounds.size());
        d.update_current_state();
        d.start_adding(&[(id, false)], &[bounds], Point::ZERO, Some("form"))
            .unwrap();
        let step = d.move_to(Point::ZERO, Some("form"), false, false).unwrap();
        assert!(step.is_some());
        d.end_moving(true).unwrap();
        d.mapper_mut().set_bounds(id, bounds);
        d.update_current_state();
    }

    #[test]
    fn pull_is_idempotent() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        d.update_current_state();
        assert!(!d.update_current_state());
        assert!(d.is_visual_state_up_to_date());
        d.model().check_integrity().unwrap();
    }

    #[test]
    fn pull_refreshes_component_positions() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        let trailing = |d: &Designer<TableMapper>| {
            let m = d.model();
            let a = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
            m.space(a).pos(Axis::Horizontal, Alignment::Trailing)
        };
        assert_eq!(trailing(&d), 120);

        d.mapper_mut().set_bounds("a", Rect::new(20.0, 20.0, 140.0, 40.0));
        d.update_current_state();
        assert_eq!(trailing(&d), 140);

        d.mapper_mut().set_bounds("a", Rect::new(20.0, 20.0, 160.0, 40.0));
        d.external_size_change_happened();
        d.update_current_state();
        assert_eq!(trailing(&d), 160);
    }

    #[test]
    fn snapped_neighbor_gets_a_default_gap() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(0.0, 10.0, 100.0, 30.0));
        let b = Rect::new(108.0, 10.0, 158.0, 30.0);
        d.mapper_mut().set_preferred_size("b", b.size());
        d.start_adding(&[("b", false)], &[b], Point::ZERO, Some("form"))
            .unwrap();
        d.move_to(Point::ZERO, Some("form"), true, false).unwrap();
        {
            let m = d.model();
            let a = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
            let h = d.dragger().unwrap().positions()[0].as_ref().unwrap();
            assert_eq!(h.interval, a);
            assert_eq!((h.alignment, h.distance), (Alignment::Leading, 0));
            assert!(h.next_to);
            assert_eq!(d.position_codes()[0], "nextToRelatedHorizontalLeading");
        }
        d.end_moving(true).unwrap();
        d.mapper_mut().set_bounds("b", b);
        d.update_current_state();

        let m = d.model();
        let a = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
        let b = m.component_interval(m.component("b").unwrap(), Axis::Horizontal);
        let gap = m.direct_neighbor(a, Alignment::Trailing, false).unwrap();
        assert!(m.is_gap(gap));
        assert_eq!(m.pref_size(gap), NOT_EXPLICITLY_DEFINED);
        assert_eq!(m.direct_neighbor(gap, Alignment::Trailing, false), Some(b));
        assert_eq!(crate::utils::size_of_default_gap(m, gap, d.mapper()), 8);
        m.check_integrity().unwrap();
    }

    #[test]
    fn resized_component_stays_inside_its_groups() {
        let mut d = designer();
        let bounds = Rect::new(10.0, 10.0, 110.0, 30.0);
        drop_new(&mut d, "a", bounds);
        drop_new(&mut d, "b", Rect::new(10.0, 60.0, 90.0, 80.0));
        let hotspot = Point::new(bounds.x1, bounds.center().y);
        d.start_resizing(&["a"], &[bounds], hotspot, [Some(Alignment::Trailing), None], true)
            .unwrap();
        let step = d
            .move_to(Point::new(150.0, hotspot.y), Some("form"), false, false)
            .unwrap();
        d.end_moving(true).unwrap();
        let resized = step.map_or(bounds, |s| s.bounds[0]);
        assert_eq!(resized.x1, 150.0);
        d.mapper_mut().set_bounds("a", resized);
        d.update_current_state();

        let m = d.model();
        m.check_integrity().unwrap();
        let a = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
        let trailing = m.space(a).pos(Axis::Horizontal, Alignment::Trailing);
        assert_eq!(trailing, 150);
        let mut interval = a;
        while let Some(parent) = m.parent(interval) {
            let space = m.space(parent);
            assert!(space.is_axis_set(Axis::Horizontal));
            assert!(space.pos(Axis::Horizontal, Alignment::Trailing) >= trailing);
            interval = parent;
        }
    }

    #[test]
    fn draggable_keeps_topmost_layer() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        d.add_unspecified_component("c", None, None, Some("form"))
            .unwrap();
        let ids: Vec<String> = d.draggable_components(&["a", "c", "missing"]);
        assert_eq!(ids, ["c"]);
        assert!(d.is_unplaced_component("c"));
        assert!(!d.is_unplaced_component("a"));
        assert!(!d.is_unplaced_component("missing"));
    }

    #[test]
    fn removal_repairs_the_hole() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        drop_new(&mut d, "b", Rect::new(118.0, 10.0, 218.0, 30.0));
        drop_new(&mut d, "c", Rect::new(226.0, 10.0, 326.0, 30.0));
        d.remove_component("b", true).unwrap();
        d.update_current_state();
        let m = d.model();
        assert!(m.component("b").is_none());
        let form = m.component("form").unwrap();
        for id in ["a", "c"] {
            let key = m.component(id).unwrap();
            assert_eq!(m.component_parent(key), Some(form));
            for axis in Axis::BOTH {
                assert!(m.parent(m.component_interval(key, axis)).is_some());
            }
        }
        assert_eq!(m.subcomponents(form).len(), 2);
        m.check_integrity().unwrap();
        assert!(d.remove_component("b", false).is_err());
    }

    #[test]
    fn emptied_container_gets_a_filler_gap() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        d.remove_component("a", true).unwrap();
        let m = d.model();
        let form = m.component("form").unwrap();
        let root = m.default_root(form, Axis::Horizontal).unwrap();
        assert_eq!(m.child_count(root), 1);
        assert!(m.is_gap(m.child(root, 0)));
        assert_eq!(m.min_size(m.child(root, 0)), 0);
    }
}
