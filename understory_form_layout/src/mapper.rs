// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boundaries to the host: the visual oracle and the feedback surface.
//!
//! The engine never looks at real widgets. It asks a [`VisualMapper`] for
//! sizes, bounds, baselines, and platform paddings, and describes guide
//! lines to a [`FeedbackPainter`].
//!
//! [`TableMapper`] is a [`VisualMapper`] answering from explicit tables; it
//! suits headless hosts and tests. A `Vec<FeedbackShape>` records painting.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};

use crate::types::{Alignment, Axis, PaddingType};

/// Pixel geometry and platform metrics of components, supplied by the host.
pub trait VisualMapper {
    /// Current bounds of a component in its container's coordinates.
    fn component_bounds(&self, id: &str) -> Option<Rect>;

    /// Bounds of the area inside a container where components are laid out.
    fn container_interior(&self, id: &str) -> Option<Rect>;

    /// Baseline offset from the top for a component of the given size.
    fn baseline_position(&self, id: &str, width: i32, height: i32) -> Option<i32>;

    /// Preferred space between two components placed next to each other.
    ///
    /// `edge` is the side of `source` that faces `target`.
    fn preferred_padding(
        &self,
        source: &str,
        target: &str,
        axis: Axis,
        edge: Alignment,
        padding: PaddingType,
    ) -> i32;

    /// Preferred space between a component and the `edge` of its container.
    fn preferred_padding_in_parent(
        &self,
        container: &str,
        component: &str,
        axis: Axis,
        edge: Alignment,
    ) -> i32;

    /// Preferred size of a component.
    fn component_preferred_size(&self, id: &str) -> Option<Size>;

    /// Minimum size of a component.
    fn component_minimum_size(&self, id: &str) -> Option<Size>;

    /// Whether the component may be resized on each axis, horizontal first.
    fn component_resizability(&self, id: &str) -> [bool; 2] {
        let _ = id;
        [true, true]
    }

    /// Whether the preferred size of a component was set explicitly.
    fn has_explicit_preferred_size(&self, id: &str) -> bool {
        let _ = id;
        false
    }

    /// Re-run the real layout of a container after the model changed.
    fn rebuild_layout(&mut self, container: &str) {
        let _ = container;
    }

    /// Show or hide a component during a drag.
    fn set_component_visibility(&mut self, id: &str, visible: bool) {
        let _ = (id, visible);
    }
}

/// Which axes a link badge refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BadgeAxes {
    /// Linked on one axis.
    One(Axis),
    /// Linked on both axes.
    Both,
}

/// Drawing primitives for guide lines and badges.
pub trait FeedbackPainter {
    /// A straight guide line.
    fn draw_line(&mut self, from: Point, to: Point);

    /// A filled half disc marking an anchored edge.
    fn fill_arc(&mut self, bounds: Rect, start_angle: f64, sweep_angle: f64);

    /// A badge marking a component with a linked size.
    fn draw_link_badge(&mut self, at: Point, axes: BadgeAxes);
}

/// One painted primitive, as recorded by `Vec<FeedbackShape>`.
#[derive(Clone, Debug, PartialEq)]
pub enum FeedbackShape {
    /// See [`FeedbackPainter::draw_line`].
    Line(Point, Point),
    /// See [`FeedbackPainter::fill_arc`].
    Arc(Rect, f64, f64),
    /// See [`FeedbackPainter::draw_link_badge`].
    LinkBadge(Point, BadgeAxes),
}

impl FeedbackPainter for Vec<FeedbackShape> {
    fn draw_line(&mut self, from: Point, to: Point) {
        self.push(FeedbackShape::Line(from, to));
    }

    fn fill_arc(&mut self, bounds: Rect, start_angle: f64, sweep_angle: f64) {
        self.push(FeedbackShape::Arc(bounds, start_angle, sweep_angle));
    }

    fn draw_link_badge(&mut self, at: Point, axes: BadgeAxes) {
        self.push(FeedbackShape::LinkBadge(at, axes));
    }
}

/// Platform paddings used by [`TableMapper`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Paddings {
    /// Related components.
    pub related: i32,
    /// Unrelated components.
    pub unrelated: i32,
    /// Separated sections.
    pub separate: i32,
    /// Indentation.
    pub indent: i32,
    /// Component to container border.
    pub container: i32,
}

impl Default for Paddings {
    fn default() -> Self {
        Self {
            related: 6,
            unrelated: 12,
            separate: 18,
            indent: 12,
            container: 10,
        }
    }
}

/// A [`VisualMapper`] that answers from explicit tables.
///
/// Components that were never given bounds report `None`; preferred sizes
/// fall back to the current bounds.
#[derive(Clone, Debug, Default)]
pub struct TableMapper {
    /// Platform paddings.
    pub paddings: Paddings,
    bounds: HashMap<String, Rect>,
    interiors: HashMap<String, Rect>,
    preferred: HashMap<String, Size>,
    minimum: HashMap<String, Size>,
    baselines: HashMap<String, i32>,
    resizability: HashMap<String, [bool; 2]>,
    explicit_preferred: HashMap<String, bool>,
    hidden: Vec<String>,
    rebuilt: Vec<String>,
}

impl TableMapper {
    /// Empty tables with the given paddings.
    pub fn new(paddings: Paddings) -> Self {
        Self {
            paddings,
            ..Self::default()
        }
    }

    /// Set the current bounds of a component.
    pub fn set_bounds(&mut self, id: &str, bounds: Rect) {
        self.bounds.insert(id.into(), bounds);
    }

    /// Set the interior of a container.
    pub fn set_interior(&mut self, id: &str, interior: Rect) {
        self.interiors.insert(id.into(), interior);
    }

    /// Set the preferred size of a component.
    pub fn set_preferred_size(&mut self, id: &str, size: Size) {
        self.preferred.insert(id.into(), size);
    }

    /// Set the minimum size of a component.
    pub fn set_minimum_size(&mut self, id: &str, size: Size) {
        self.minimum.insert(id.into(), size);
    }

    /// Set the baseline offset of a component.
    pub fn set_baseline(&mut self, id: &str, baseline: i32) {
        self.baselines.insert(id.into(), baseline);
    }

    /// Set which axes a component may be resized on.
    pub fn set_resizability(&mut self, id: &str, resizability: [bool; 2]) {
        self.resizability.insert(id.into(), resizability);
    }

    /// Mark the preferred size of a component as explicitly set.
    pub fn set_explicit_preferred_size(&mut self, id: &str, explicit: bool) {
        self.explicit_preferred.insert(id.into(), explicit);
    }

    /// Containers whose layout was rebuilt, oldest first.
    pub fn rebuilt(&self) -> &[String] {
        &self.rebuilt
    }

    /// Components currently hidden by a drag.
    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }
}

impl VisualMapper for TableMapper {
    fn component_bounds(&self, id: &str) -> Option<Rect> {
        self.bounds.get(id).copied()
    }

    fn container_interior(&self, id: &str) -> Option<Rect> {
        self.interiors.get(id).copied()
    }

    fn baseline_position(&self, id: &str, _width: i32, height: i32) -> Option<i32> {
        self.baselines.get(id).copied().filter(|&b| b > 0 && b < height)
    }

    fn preferred_padding(
        &self,
        _source: &str,
        _target: &str,
        _axis: Axis,
        _edge: Alignment,
        padding: PaddingType,
    ) -> i32 {
        match padding {
            PaddingType::Related => self.paddings.related,
            PaddingType::Unrelated => self.paddings.unrelated,
            PaddingType::Separate => self.paddings.separate,
            PaddingType::Indent => self.paddings.indent,
        }
    }

    fn preferred_padding_in_parent(
        &self,
        _container: &str,
        _component: &str,
        _axis: Axis,
        _edge: Alignment,
    ) -> i32 {
        self.paddings.container
    }

    fn component_preferred_size(&self, id: &str) -> Option<Size> {
        self.preferred
            .get(id)
            .copied()
            .or_else(|| self.bounds.get(id).map(Rect::size))
    }

    fn component_minimum_size(&self, id: &str) -> Option<Size> {
        self.minimum.get(id).copied().or(Some(Size::ZERO))
    }

    fn component_resizability(&self, id: &str) -> [bool; 2] {
        self.resizability.get(id).copied().unwrap_or([true, true])
    }

    fn has_explicit_preferred_size(&self, id: &str) -> bool {
        self.explicit_preferred.get(id).copied().unwrap_or(false)
    }

    fn rebuild_layout(&mut self, container: &str) {
        self.rebuilt.push(container.into());
    }

    fn set_component_visibility(&mut self, id: &str, visible: bool) {
        self.hidden.retain(|h| h != id);
        if !visible {
            self.hidden.push(id.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_mapper_falls_back_to_bounds() {
        let mut mapper = TableMapper::new(Paddings::default());
        mapper.set_bounds("a", Rect::new(0.0, 0.0, 80.0, 20.0));
        assert_eq!(mapper.component_preferred_size("a"), Some(Size::new(80.0, 20.0)));
        assert_eq!(mapper.component_bounds("b"), None);
        assert_eq!(
            mapper.preferred_padding("a", "b", Axis::Horizontal, Alignment::Trailing, PaddingType::Unrelated),
            12
        );
        mapper.set_baseline("a", 15);
        assert_eq!(mapper.baseline_position("a", 80, 20), Some(15));
        assert_eq!(mapper.baseline_position("a", 80, 10), None);
    }

    #[test]
    fn visibility_and_rebuilds_are_recorded() {
        let mut mapper = TableMapper::default();
        mapper.set_component_visibility("a", false);
        assert_eq!(mapper.hidden(), ["a"]);
        mapper.set_component_visibility("a", true);
        assert!(mapper.hidden().is_empty());
        mapper.rebuild_layout("form");
        assert_eq!(mapper.rebuilt(), ["form"]);
    }

    #[test]
    fn shapes_are_recorded_in_order() {
        let mut shapes: Vec<FeedbackShape> = Vec::new();
        shapes.draw_line(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        shapes.draw_link_badge(Point::new(5.0, 5.0), BadgeAxes::Both);
        assert_eq!(shapes.len(), 2);
        assert!(matches!(shapes[1], FeedbackShape::LinkBadge(_, BadgeAxes::Both)));
    }
}
