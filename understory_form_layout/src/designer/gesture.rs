// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use super::{Designer, Upkeep, active_roots, rect_size};
use crate::dragger::Dragger;
use crate::error::{LayoutError, Result};
use crate::feeder::Feeder;
use crate::mapper::VisualMapper;
use crate::model::{ComponentKey, IntervalId};
use crate::region::{Region, px};
use crate::types::{Alignment, Axis, Motion, NOT_EXPLICITLY_DEFINED};

/// Outcome of one [`Designer::move_to`] step.
#[derive(Clone, Debug, PartialEq)]
pub struct DragStep {
    /// The cursor corrected by the chosen snap.
    pub cursor: Point,
    /// Bounds of the dragged components after the step, in gesture order.
    pub bounds: Vec<Rect>,
}

fn point_px(p: Point) -> [i32; 2] {
    [px(p.x.round()), px(p.y.round())]
}

impl<M: VisualMapper> Designer<M> {
    /// Start dragging new components into the layout.
    ///
    /// Each entry is a component id and whether it is a container. Ids not
    /// known to the model are created; known ones must not be placed yet.
    pub fn start_adding(
        &mut self,
        components: &[(&str, bool)],
        bounds: &[Rect],
        hotspot: Point,
        default_container: Option<&str>,
    ) -> Result<()> {
        check_lengths(components.len(), bounds.len())?;
        let container = default_container
            .map(|id| self.resolve_container(id))
            .transpose()?;
        for &(id, _) in components {
            if let Some(key) = self.model.component(id)
                && self.model.component_parent(key).is_some()
            {
                return Err(LayoutError::AlreadyPlaced { id: id.into() });
            }
        }
        let keys = components
            .iter()
            .map(|&(id, is_container)| match self.model.component(id) {
                Some(key) => key,
                None => self.model.create_component(id, is_container),
            })
            .collect();
        self.prepare_dragger(keys, bounds, hotspot, [Motion::Move; 2]);
        if container.is_some() {
            self.set_drag_target(container, false);
        }
        tracing::debug!(count = components.len(), "started adding");
        Ok(())
    }

    /// Start moving placed components; they must share one container.
    pub fn start_moving(&mut self, ids: &[&str], bounds: &[Rect], hotspot: Point) -> Result<()> {
        check_lengths(ids.len(), bounds.len())?;
        let keys = self.resolve_siblings(ids)?;
        let container = self.model.component_parent(keys[0]);
        self.prepare_dragger(keys, bounds, hotspot, [Motion::Move; 2]);
        self.set_drag_target(container, false);
        tracing::debug!(count = ids.len(), "started moving");
        Ok(())
    }

    /// Start resizing components at the given edge per axis.
    ///
    /// An axis with no edge (or a non-edge alignment) keeps its size. With
    /// `in_layout` the gesture commits into the component's layer;
    /// otherwise only the component's own interior is updated.
    pub fn start_resizing(
        &mut self,
        ids: &[&str],
        bounds: &[Rect],
        hotspot: Point,
        edges: [Option<Alignment>; 2],
        in_layout: bool,
    ) -> Result<()> {
        check_lengths(ids.len(), bounds.len())?;
        let keys = self.resolve_siblings(ids)?;
        let container = self.model.component_parent(keys[0]);
        let motions = edges.map(|edge| match edge {
            Some(edge) if edge.is_edge() => Motion::Resize(edge),
            _ => Motion::Fixed,
        });
        self.prepare_dragger(keys, bounds, hotspot, motions);
        self.set_drag_target(container.filter(|_| in_layout), true);
        tracing::debug!(?edges, in_layout, "started resizing");
        Ok(())
    }

    fn resolve_siblings(&self, ids: &[&str]) -> Result<Vec<ComponentKey>> {
        let keys = ids
            .iter()
            .map(|id| self.resolve(id))
            .collect::<Result<Vec<_>>>()?;
        let container = self.model.component_parent(keys[0]);
        if keys
            .iter()
            .any(|&k| self.model.component_parent(k) != container)
        {
            return Err(LayoutError::DifferentContainers);
        }
        Ok(keys)
    }

    fn prepare_dragger(
        &mut self,
        components: Vec<ComponentKey>,
        bounds: &[Rect],
        hotspot: Point,
        motions: [Motion; 2],
    ) {
        self.dragger = Some(self.new_dragger(components, bounds, hotspot, motions));
    }

    pub(super) fn new_dragger(
        &self,
        components: Vec<ComponentKey>,
        bounds: &[Rect],
        hotspot: Point,
        motions: [Motion; 2],
    ) -> Dragger {
        let formation = components
            .iter()
            .zip(bounds)
            .map(|(&comp, &rect)| {
                let (w, h) = rect_size(rect);
                let baseline = self
                    .mapper
                    .baseline_position(self.model.component_id(comp), w, h);
                Region::from_rect(rect, baseline)
            })
            .collect();
        Dragger::new(
            &self.model,
            &self.mapper,
            components,
            formation,
            point_px(hotspot),
            motions,
            self.tuning,
        )
    }

    /// Point the gesture at `target`, hiding content of other layers.
    fn set_drag_target(&mut self, target: Option<ComponentKey>, resizing: bool) {
        let Some(dragger) = &self.dragger else {
            return;
        };
        let moving = dragger.moving_components().to_vec();
        let previous = dragger.target_container();
        let roots = target.map(|c| (c, self.target_roots(c, &moving, resizing)));
        if let Some(dragger) = self.dragger.as_mut() {
            dragger.set_target_container(roots);
        }
        if previous != target {
            self.update_dragging_visibility(previous, &moving, resizing, false);
            self.update_dragging_visibility(target, &moving, resizing, true);
        }
    }

    fn target_roots(&self, container: ComponentKey, moving: &[ComponentKey], resizing: bool) -> [IntervalId; 2] {
        match moving.first() {
            Some(&first) if resizing => self.model.parent_roots(first),
            _ => active_roots(&self.model, container),
        }
    }

    /// Hide (or show again) the components of `container` that live in a
    /// different layer than the one the gesture works in.
    fn update_dragging_visibility(
        &mut self,
        container: Option<ComponentKey>,
        moving: &[ComponentKey],
        resizing: bool,
        dragging_in: bool,
    ) {
        let Some(container) = container else {
            return;
        };
        let roots = self.target_roots(container, moving, resizing);
        let other_layer: Vec<String> = self
            .model
            .subcomponents(container)
            .iter()
            .filter(|c| !moving.contains(c))
            .filter(|&&c| {
                let interval = self.model.component_interval(c, Axis::Horizontal);
                self.model.root_of(interval) != roots[Axis::Horizontal.index()]
            })
            .map(|&c| self.model.component_id(c).into())
            .collect();
        for id in &other_layer {
            self.mapper.set_component_visibility(id, !dragging_in);
        }
    }

    /// Move the gesture to `cursor`, over the container `container`.
    ///
    /// Returns `None` when the visual state is stale, in which case the
    /// step is ignored. With `lock` the container of a move is kept once
    /// chosen, and the axis already aligned stays put.
    pub fn move_to(
        &mut self,
        cursor: Point,
        container: Option<&str>,
        auto: bool,
        lock: bool,
    ) -> Result<Option<DragStep>> {
        let Some(dragger) = &self.dragger else {
            return Err(LayoutError::NoActiveGesture);
        };
        if !self.visual_state_up_to_date {
            return Ok(None);
        }
        if !dragger.is_resizing() && (!lock || dragger.target_container().is_none()) {
            let target = container
                .and_then(|id| self.model.component(id))
                .filter(|&c| self.model.is_container(c));
            self.set_drag_target(target, false);
        }
        let Some(dragger) = self.dragger.as_mut() else {
            return Err(LayoutError::NoActiveGesture);
        };
        let [x, y] = dragger.move_to(&self.model, &self.mapper, point_px(cursor), auto, lock);
        let bounds = dragger.moving_bounds().iter().map(Region::to_rect).collect();
        tracing::trace!(x, y, auto, "drag step");
        Ok(Some(DragStep {
            cursor: Point::new(f64::from(x), f64::from(y)),
            bounds,
        }))
    }

    /// Finish the gesture, committing its last step into the model or
    /// dropping it.
    ///
    /// Cancelling without a gesture is a no-op; committing without one is
    /// an error.
    pub fn end_moving(&mut self, commit: bool) -> Result<()> {
        let Some(dragger) = self.drop_gesture() else {
            return if commit {
                Err(LayoutError::NoActiveGesture)
            } else {
                Ok(())
            };
        };
        if !commit {
            tracing::debug!("gesture cancelled");
            return Ok(());
        }
        let components = dragger.moving_components();
        let Some(&first) = components.first() else {
            return Ok(());
        };
        if let Some(target) = dragger.target_container() {
            self.commit_into(&dragger, target)?;
        } else if dragger.is_resizing() {
            let space = dragger.moving_bounds()[0];
            let _session = self.model.edit_session();
            for axis in Axis::BOTH {
                let interval = self.model.component_interval(first, axis);
                *self.model.space_mut(interval) = space;
            }
            if self.model.is_container(first) {
                let sizes = *dragger.sizes();
                let mut upkeep = self.upkeep_for(&dragger);
                upkeep.impose_current_container_size(first, Some(sizes), true);
            }
        }
        if dragger.is_resizing() && self.model.is_container(first) {
            self.update_container_design(first);
        }
        self.visual_state_up_to_date = false;
        tracing::debug!(
            operation = ?dragger.operation(),
            count = components.len(),
            "gesture committed"
        );
        Ok(())
    }

    /// Take the dragger out and show the components it hid.
    fn drop_gesture(&mut self) -> Option<Dragger> {
        let dragger = self.dragger.take()?;
        self.update_dragging_visibility(
            dragger.target_container(),
            dragger.moving_components(),
            dragger.is_resizing(),
            false,
        );
        Some(dragger)
    }

    /// Upkeep that treats the gesture's target layer as protected.
    pub(super) fn upkeep_for(&mut self, dragger: &Dragger) -> Upkeep<'_> {
        let mut upkeep = Upkeep::new(&mut self.model, &self.mapper, dragger.is_resizing());
        upkeep.keep_roots = dragger.target_roots();
        upkeep
    }

    pub(super) fn commit_into(&mut self, dragger: &Dragger, target: ComponentKey) -> Result<()> {
        let components = dragger.moving_components();
        let new_components = self.model.component_parent(components[0]).is_none();
        let adding = if components.len() > 1 {
            if new_components {
                let origin = *dragger.moving_space();
                let placed: Vec<(ComponentKey, Region)> = components
                    .iter()
                    .copied()
                    .zip(dragger.moving_bounds().iter().copied())
                    .collect();
                let origin = Axis::BOTH.map(|axis| origin.pos(axis, Alignment::Leading));
                self.upkeep_for(dragger).intervals_from_bounds(&placed, origin)
            } else {
                let mut common: [Option<IntervalId>; 2] = [None; 2];
                let mut orig_space = Region::new();
                for &comp in components {
                    for axis in Axis::BOTH {
                        let li = self.model.component_interval(comp, axis);
                        let slot = &mut common[axis.index()];
                        *slot = Some(match *slot {
                            None => li,
                            Some(c) => self.model.common_parent(c, li).unwrap_or(c),
                        });
                    }
                    let h = self.model.component_interval(comp, Axis::Horizontal);
                    orig_space.expand(self.model.space(h));
                }
                let map: HashMap<ComponentKey, ComponentKey> =
                    components.iter().map(|&c| (c, c)).collect();
                let mut upkeep = self.upkeep_for(dragger);
                let mut adding = [None; 2];
                for axis in Axis::BOTH {
                    if let Some(parent) = common[axis.index()] {
                        adding[axis.index()] = upkeep.restricted_copy(parent, &map, &orig_space, axis);
                    }
                }
                let [Some(h), Some(v)] = adding else {
                    return Ok(());
                };
                for &comp in components {
                    upkeep.model_mut().remove_component(comp, false);
                }
                [h, v]
            }
        } else {
            let comp = components[0];
            [
                self.model.component_interval(comp, Axis::Horizontal),
                self.model.component_interval(comp, Axis::Vertical),
            ]
        };
        if new_components {
            let mut upkeep = self.upkeep_for(dragger);
            for (&comp, space) in components.iter().zip(dragger.moving_bounds()) {
                upkeep.set_preferred_from_space(comp, space);
            }
        }
        self.add_components(dragger, target, adding, new_components)
    }

    /// Insert `adding` for the gesture's components into `target`.
    pub(super) fn add_components(
        &mut self,
        dragger: &Dragger,
        target: ComponentKey,
        adding: [IntervalId; 2],
        fresh: bool,
    ) -> Result<()> {
        let components = dragger.moving_components();
        let feeder = Feeder::new(&self.model, dragger, adding);
        if dragger.is_resizing() {
            debug_assert_eq!(components.len(), 1);
            for interval in adding {
                if self.model.parent(interval).is_some()
                    && !matches!(
                        self.model.alignment(interval),
                        Some(Alignment::Center | Alignment::Baseline)
                    )
                {
                    self.model.remove_interval(interval);
                }
            }
            for &comp in components {
                for axis in Axis::BOTH {
                    if dragger.is_resizing_axis(axis) {
                        self.model.remove_component_from_link_sized_group(comp, axis);
                    }
                }
            }
        } else {
            for &comp in components {
                if self.model.component_parent(comp).is_some() {
                    self.model.remove_component_and_intervals(comp, false);
                }
            }
        }
        self.upkeep_for(dragger).process_removals();

        let _session = self.model.edit_session();
        if !dragger.is_resizing() {
            for &comp in components {
                self.model.add_component(comp, target, None)?;
            }
        }
        let outcome = feeder.add(&mut self.model, &self.mapper, dragger);
        self.impose_size |= outcome.impose_size;
        self.optimize_structure |= outcome.optimize_structure;

        let mut upkeep = self.upkeep_for(dragger);
        for interval in adding {
            let parent = upkeep.model().parent(interval);
            upkeep.destroy_group_if_redundant(interval, parent);
        }
        for &comp in components {
            if (fresh || dragger.is_resizing()) && upkeep.model().is_container(comp) {
                upkeep.impose_current_container_size(comp, Some(*dragger.sizes()), true);
            } else if dragger.is_resizing() {
                for axis in Axis::BOTH {
                    if dragger.snapped_to_default_size(axis) {
                        let interval = upkeep.model().component_interval(comp, axis);
                        upkeep.ops.resize_interval(interval, NOT_EXPLICITLY_DEFINED);
                    }
                }
            }
        }
        self.update_container_design(target);
        tracing::debug!(
            impose_size = outcome.impose_size,
            optimize_structure = outcome.optimize_structure,
            "inserted formation"
        );
        Ok(())
    }

    /// Remove the components of the gesture in progress from the layout
    /// and cancel the gesture. Non-container components are also
    /// unregistered.
    pub fn remove_dragged_components(&mut self) {
        let Some(dragger) = &self.dragger else {
            return;
        };
        let components = dragger.moving_components().to_vec();
        for comp in components {
            let from_model = !self.model.is_container(comp);
            self.model.remove_component_and_intervals(comp, from_model);
        }
        self.process_removals();
        self.drop_gesture();
        self.visual_state_up_to_date = false;
        tracing::debug!("removed dragged components");
    }
}

fn check_lengths(ids: usize, bounds: usize) -> Result<()> {
    if ids != bounds {
        return Err(LayoutError::MismatchedLengths { ids, bounds });
    }
    if ids == 0 {
        return Err(LayoutError::EmptySelection);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::{Point, Rect, Size};

    use super::super::tests::{designer, drop_new};
    use crate::error::LayoutError;
    use crate::types::{Alignment, Axis, NOT_EXPLICITLY_DEFINED};

    #[test]
    fn simple_add_round_trips_its_bounds() {
        let mut d = designer();
        let bounds = Rect::new(30.0, 40.0, 130.0, 62.0);
        drop_new(&mut d, "a", bounds);
        let m = d.model();
        let a = m.component("a").unwrap();
        let form = m.component("form").unwrap();
        assert_eq!(m.component_parent(a), Some(form));
        let h = m.component_interval(a, Axis::Horizontal);
        assert_eq!(m.space(h).to_rect(), bounds);
        assert_eq!(m.pref_size(h), NOT_EXPLICITLY_DEFINED);
        m.check_integrity().unwrap();
    }

    #[test]
    fn cancel_leaves_the_model_alone() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        let mark = d.model().change_mark();
        d.start_moving(&["a"], &[Rect::new(10.0, 10.0, 110.0, 30.0)], Point::new(20.0, 20.0))
            .unwrap();
        d.move_to(Point::new(80.0, 90.0), Some("form"), true, false)
            .unwrap();
        d.end_moving(false).unwrap();
        assert!(d.dragger().is_none());
        assert_eq!(d.model().change_mark(), mark);
        assert!(d.mapper().hidden().is_empty());
    }

    #[test]
    fn moving_places_the_component_at_the_new_spot() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        let start = Rect::new(10.0, 10.0, 110.0, 30.0);
        d.start_moving(&["a"], &[start], Point::new(20.0, 20.0)).unwrap();
        let step = d
            .move_to(Point::new(120.0, 120.0), Some("form"), false, false)
            .unwrap()
            .unwrap();
        assert_eq!(step.bounds, vec![Rect::new(110.0, 110.0, 210.0, 130.0)]);
        d.end_moving(true).unwrap();
        d.mapper_mut().set_bounds("a", step.bounds[0]);
        d.update_current_state();
        let m = d.model();
        let a = m.component("a").unwrap();
        let v = m.component_interval(a, Axis::Vertical);
        assert_eq!(m.space(v).pos(Axis::Vertical, Alignment::Leading), 110);
        m.check_integrity().unwrap();
    }

    #[test]
    fn resizing_records_an_explicit_size() {
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
        let step = d
            .move_to(Point::new(170.0, 20.0), Some("form"), false, false)
            .unwrap()
            .unwrap();
        assert_eq!(step.bounds[0].width(), 160.0);
        d.end_moving(true).unwrap();
        d.mapper_mut().set_bounds("a", step.bounds[0]);
        d.update_current_state();
        let m = d.model();
        let h = m.component_interval(m.component("a").unwrap(), Axis::Horizontal);
        assert_eq!(m.pref_size(h), 160);
        m.check_integrity().unwrap();
    }

    #[test]
    fn stale_state_ignores_steps() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        d.mapper_mut().set_preferred_size("b", Size::new(40.0, 20.0));
        d.start_adding(&[("b", false)], &[Rect::new(0.0, 0.0, 40.0, 20.0)], Point::ZERO, None)
            .unwrap();
        d.external_size_change_happened();
        assert_eq!(d.move_to(Point::ZERO, Some("form"), false, false), Ok(None));
        d.end_moving(false).unwrap();
    }

    #[test]
    fn verbs_check_their_arguments() {
        let mut d = designer();
        assert_eq!(
            d.start_adding(&[("a", false)], &[], Point::ZERO, None),
            Err(LayoutError::MismatchedLengths { ids: 1, bounds: 0 })
        );
        assert_eq!(
            d.start_moving(&[], &[], Point::ZERO),
            Err(LayoutError::EmptySelection)
        );
        assert_eq!(d.end_moving(true), Err(LayoutError::NoActiveGesture));
        assert_eq!(d.end_moving(false), Ok(()));
        assert_eq!(
            d.move_to(Point::ZERO, None, false, false),
            Err(LayoutError::NoActiveGesture)
        );
        assert!(matches!(
            d.start_adding(&[("x", false)], &[Rect::ZERO], Point::ZERO, Some("nope")),
            Err(LayoutError::UnknownContainer { .. })
        ));
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        assert!(matches!(
            d.start_adding(&[("a", false)], &[Rect::ZERO], Point::ZERO, Some("form")),
            Err(LayoutError::AlreadyPlaced { .. })
        ));
    }

    #[test]
    fn removing_dragged_components_repairs_the_layout() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(10.0, 10.0, 110.0, 30.0));
        drop_new(&mut d, "b", Rect::new(10.0, 40.0, 110.0, 60.0));
        d.start_moving(&["b"], &[Rect::new(10.0, 40.0, 110.0, 60.0)], Point::ZERO)
            .unwrap();
        d.remove_dragged_components();
        assert!(d.dragger().is_none());
        let m = d.model();
        assert!(m.component("b").is_none());
        assert!(m.component("a").is_some());
        m.check_integrity().unwrap();
    }
}
