// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Design-time decorations: anchoring guides and size links of a selected
//! component, and the feedback of an active gesture.

use alloc::vec::Vec;

use kurbo::Rect;

use super::Designer;
use crate::dragger::{guide_line, point};
use crate::mapper::{BadgeAxes, FeedbackPainter, VisualMapper};
use crate::model::{ComponentKey, GroupKind, IntervalId, LayoutModel};
use crate::region::UNKNOWN;
use crate::types::{Alignment, Axis};

const PAINT_LIMIT: i32 = i16::MAX as i32;

impl<M: VisualMapper> Designer<M> {
    /// Draw the guide lines of the gesture in progress, if any.
    pub fn paint_move_feedback(&self, painter: &mut dyn FeedbackPainter) {
        if let Some(dragger) = &self.dragger {
            dragger.paint_move_feedback(&self.model, painter);
        }
    }

    /// Draw how the component `id` is anchored in its container, and badges
    /// on the components it shares a size with.
    pub fn paint_selection(&self, painter: &mut dyn FeedbackPainter, id: &str) {
        let m = &self.model;
        let Some(key) = m.component(id) else {
            return;
        };
        if m.component_parent(key).is_none() {
            return;
        }
        if Axis::BOTH.iter().any(|&axis| m.is_link_sized(key, axis)) {
            paint_links(m, painter, key);
        }
        for axis in Axis::BOTH {
            paint_anchors(m, painter, key, axis);
        }
    }
}

fn paint_anchors(m: &LayoutModel, painter: &mut dyn FeedbackPainter, key: ComponentKey, axis: Axis) {
    let mut interval = m.component_interval(key, axis);
    if m.alignment(interval) == Some(Alignment::Baseline)
        && let Some(parent) = m.parent(interval)
    {
        let region = m.space(parent);
        let x = region.pos(axis, Alignment::Baseline);
        let y1 = region.pos(axis.other(), Alignment::Leading);
        let y2 = region.pos(axis.other(), Alignment::Trailing);
        if y1 != UNKNOWN && y2 != UNKNOWN {
            guide_line(painter, axis, x, y1, y2);
        }
    }

    let mut last = None;
    while let Some(parent) = m.parent(interval) {
        if m.is_sequential(parent) {
            let effective = m.effective_alignment(interval);
            if effective.is_some_and(Alignment::is_edge) {
                last = effective;
            }
            let index = m.index_of(parent, interval).unwrap_or(0);
            let children = m.children(parent);
            let range = match last {
                Some(Alignment::Leading) => &children[..index],
                Some(Alignment::Trailing) => &children[index + 1..],
                _ => children,
            };
            for &candidate in range {
                if m.is_gap(candidate) {
                    paint_alignment(m, painter, candidate, axis, m.effective_alignment(candidate));
                }
            }
        } else {
            if !m.want_resize_in_layout(interval) {
                last = m.alignment(interval);
            }
            paint_alignment(m, painter, interval, axis, last);
        }
        interval = parent;
    }
}

fn paint_links(m: &LayoutModel, painter: &mut dyn FeedbackPainter, key: ComponentKey) {
    let linked = |axis: Axis| -> Vec<ComponentKey> {
        m.link_size_id(key, axis)
            .and_then(|id| m.link_size_groups(axis).remove(&id))
            .unwrap_or_default()
    };
    let horizontal = linked(Axis::Horizontal);
    let vertical = linked(Axis::Vertical);
    let mut merged: Vec<ComponentKey> = Vec::new();
    for &comp in horizontal.iter().chain(&vertical) {
        if !merged.contains(&comp) {
            merged.push(comp);
        }
    }
    for comp in merged {
        let axes = match (horizontal.contains(&comp), vertical.contains(&comp)) {
            (true, true) => BadgeAxes::Both,
            (true, false) => BadgeAxes::One(Axis::Horizontal),
            _ => BadgeAxes::One(Axis::Vertical),
        };
        let region = m.space(m.component_interval(comp, Axis::Horizontal));
        let at = (
            region.pos(Axis::Horizontal, Alignment::Trailing),
            region.pos(Axis::Vertical, Alignment::Trailing),
        );
        painter.draw_link_badge(point(at), axes);
    }
}

/// Draw the anchor of `interval` in its parent: a dimension line from the
/// edge it holds to, ending in a half disc.
fn paint_alignment(
    m: &LayoutModel,
    painter: &mut dyn FeedbackPainter,
    interval: IntervalId,
    axis: Axis,
    alignment: Option<Alignment>,
) {
    let Some(parent) = m.parent(interval) else {
        return;
    };
    let baseline = m.is_parallel(parent) && m.group_alignment(parent) == Alignment::Baseline;
    let group = m.space(parent);
    let opposite = axis.other();
    let x1;
    let mut x2;
    let y;
    if m.is_gap(interval) {
        let index = m.index_of(parent, interval).unwrap_or(0);
        let nested = || {
            m.first_parent(interval, GroupKind::Parallel)
                .is_some_and(|p| m.parent(p).is_some())
        };
        let (ya, x1_group);
        if index == 0 {
            let edge = if baseline {
                Alignment::Baseline
            } else {
                Alignment::Leading
            };
            x1 = group.pos(axis, edge);
            ya = visual_interval_position(m, parent, opposite, Alignment::Leading);
            x1_group = nested();
        } else {
            let prev = m.child(parent, index - 1);
            x1 = match edge_position(m, prev, axis, Alignment::Trailing) {
                Some(x) => x,
                None => return,
            };
            ya = visual_interval_position(m, prev, opposite, Alignment::Trailing);
            x1_group = m.is_group(prev);
        }
        let (yb, x2_group);
        if index + 1 == m.child_count(parent) {
            let edge = if baseline {
                Alignment::Baseline
            } else {
                Alignment::Trailing
            };
            x2 = group.pos(axis, edge);
            yb = visual_interval_position(m, parent, opposite, Alignment::Trailing);
            x2_group = nested();
        } else {
            let next = m.child(parent, index + 1);
            x2 = match edge_position(m, next, axis, Alignment::Leading) {
                Some(x) => x,
                None => return,
            };
            yb = visual_interval_position(m, next, opposite, Alignment::Leading);
            x2_group = m.is_group(next);
        }
        if x1 == UNKNOWN || x2 == UNKNOWN || ya.contains(&UNKNOWN) || yb.contains(&UNKNOWN) {
            return;
        }
        y = (ya[1].min(yb[1]) + ya[0].max(yb[0])) / 2;
        if ya[1] < yb[0] || yb[1] < ya[0] {
            guide_line(painter, axis, x1, ya[0], y);
            guide_line(painter, axis, x1, ya[0], ya[1]);
            guide_line(painter, axis, x2, yb[0], y);
            guide_line(painter, axis, x2, yb[0], yb[1]);
        } else {
            if x1_group {
                guide_line(painter, axis, x1, ya[0], ya[1]);
            }
            if x2_group {
                guide_line(painter, axis, x2, yb[0], yb[1]);
            }
        }
    } else {
        let Some(edge) = alignment.filter(|a| a.is_edge()) else {
            return;
        };
        x1 = group.pos(axis, if baseline { Alignment::Baseline } else { edge });
        x2 = if m.is_parallel(interval) && m.alignment(interval) == Some(Alignment::Baseline) {
            m.space(interval).pos(axis, Alignment::Baseline)
        } else {
            m.space(interval).pos(axis, edge)
        };
        if x1 == UNKNOWN || x2 == UNKNOWN {
            return;
        }
        let pos = visual_interval_position(m, parent, opposite, edge);
        if pos.contains(&UNKNOWN) {
            return;
        }
        y = (pos[0] + pos[1]) / 2;
        if m.parent(parent).is_some() {
            guide_line(painter, axis, group.pos(axis, edge), pos[0], pos[1]);
        }
    }

    if x2 - x1 > 1 && y.abs() <= PAINT_LIMIT && x1.abs() <= PAINT_LIMIT && x2.abs() <= PAINT_LIMIT {
        let leading = alignment == Some(Alignment::Leading);
        let (x, mut angle) = if leading { (x1, 180.0) } else { (x2, 0.0) };
        x2 -= 1;
        let diam = (x2 - x1).min(4);
        guide_line(painter, opposite, y, x1, x2);
        let (cx, cy) = match axis {
            Axis::Horizontal => {
                angle += 90.0;
                (x, y)
            }
            Axis::Vertical => (y, x),
        };
        if alignment.is_some_and(Alignment::is_edge) {
            let bounds = Rect::new(
                f64::from(cx - diam),
                f64::from(cy - diam),
                f64::from(cx + diam),
                f64::from(cy + diam),
            );
            painter.fill_arc(bounds, angle, 180.0);
        }
    }
}

/// Position of `edge` of a neighbor of a gap; baseline groups report their
/// baseline and adjacent gaps report nothing.
fn edge_position(m: &LayoutModel, neighbor: IntervalId, axis: Axis, edge: Alignment) -> Option<i32> {
    if m.is_parallel(neighbor) && m.group_alignment(neighbor) == Alignment::Baseline {
        Some(m.space(neighbor).pos(axis, Alignment::Baseline))
    } else if m.is_gap(neighbor) {
        None
    } else {
        Some(m.space(neighbor).pos(axis, edge))
    }
}

/// Extent of `interval` on `axis` as it shows at its `edge` on the other
/// axis: a parallel group only counts the children that reach that edge.
fn visual_interval_position(m: &LayoutModel, interval: IntervalId, axis: Axis, edge: Alignment) -> [i32; 2] {
    let mut min = PAINT_LIMIT;
    let mut max = i32::from(i16::MIN);
    let parallel = m.is_parallel(interval);
    if parallel && m.group_alignment(interval) != Alignment::Baseline {
        for &sub in m.children(interval) {
            if !m.is_placed_at_border(sub, axis.other(), edge) || m.is_gap(sub) {
                continue;
            }
            let [lo, hi] = if m.is_parallel(sub) {
                visual_interval_position(m, sub, axis, edge)
            } else {
                let region = m.space(sub);
                [
                    region.pos(axis, Alignment::Leading),
                    region.pos(axis, Alignment::Trailing),
                ]
            };
            if lo == UNKNOWN || hi == UNKNOWN {
                continue;
            }
            min = min.min(lo);
            max = max.max(hi);
        }
    }
    if !parallel || min == PAINT_LIMIT {
        let region = m.space(interval);
        return [
            region.pos(axis, Alignment::Leading),
            region.pos(axis, Alignment::Trailing),
        ];
    }
    [min, max]
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::{Point, Rect};

    use super::super::tests::{designer, drop_new};
    use crate::mapper::{BadgeAxes, FeedbackShape};
    use crate::types::Axis;

    #[test]
    fn selection_of_a_placed_component_draws_guides() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        let mut shapes: Vec<FeedbackShape> = Vec::new();
        d.paint_selection(&mut shapes, "a");
        assert!(shapes.iter().any(|s| matches!(s, FeedbackShape::Line(..))));
        assert!(
            !shapes
                .iter()
                .any(|s| matches!(s, FeedbackShape::LinkBadge(..)))
        );

        let mut none: Vec<FeedbackShape> = Vec::new();
        d.paint_selection(&mut none, "missing");
        assert!(none.is_empty());
    }

    #[test]
    fn unknown_group_geometry_draws_nothing() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        let key = d.model().component("a").unwrap();
        for axis in Axis::BOTH {
            let mut interval = d.model().component_interval(key, axis);
            while let Some(parent) = d.model().parent(interval) {
                d.model_mut().space_mut(parent).reset();
                interval = parent;
            }
        }
        let mut shapes: Vec<FeedbackShape> = Vec::new();
        d.paint_selection(&mut shapes, "a");
        assert!(shapes.is_empty());
    }

    #[test]
    fn linked_components_get_badges() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        drop_new(&mut d, "b", Rect::new(20.0, 60.0, 90.0, 80.0));
        let keys = ["a", "b"].map(|id| d.model().component(id).unwrap());
        d.model_mut().set_same_size(&keys, Axis::Horizontal);

        let mut shapes: Vec<FeedbackShape> = Vec::new();
        d.paint_selection(&mut shapes, "a");
        let badges: Vec<_> = shapes
            .iter()
            .filter_map(|s| match s {
                FeedbackShape::LinkBadge(at, axes) => Some((*at, *axes)),
                _ => None,
            })
            .collect();
        assert_eq!(badges.len(), 2);
        assert!(
            badges
                .iter()
                .all(|(_, axes)| *axes == BadgeAxes::One(Axis::Horizontal))
        );
        assert!(badges.contains(&(Point::new(120.0, 40.0), BadgeAxes::One(Axis::Horizontal))));
    }

    #[test]
    fn move_feedback_needs_a_gesture() {
        let mut d = designer();
        drop_new(&mut d, "a", Rect::new(20.0, 20.0, 120.0, 40.0));
        let mut shapes: Vec<FeedbackShape> = Vec::new();
        d.paint_move_feedback(&mut shapes);
        assert!(shapes.is_empty());

        let b = Rect::new(20.0, 48.0, 80.0, 68.0);
        d.mapper_mut().set_preferred_size("b", b.size());
        d.start_adding(&[("b", false)], &[b], Point::ZERO, Some("form"))
            .unwrap();
        d.move_to(Point::ZERO, Some("form"), true, false).unwrap();
        d.paint_move_feedback(&mut shapes);
        assert!(!shapes.is_empty());
        d.end_moving(false).unwrap();
    }
}
