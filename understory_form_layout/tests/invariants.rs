// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Random gesture sequences against a scripted host.
//!
//! After every committed gesture and state pull:
//!
//! 1. the interval trees pass the model's integrity check,
//! 2. every placed component has intervals attached on both axes,
//! 3. a second pull right after the first changes nothing.

use kurbo::{Point, Rect};
use proptest::prelude::*;
use understory_form_layout::{Alignment, Axis, Designer, LayoutModel, Paddings, TableMapper, VisualMapper};

const WIDTH: f64 = 400.0;
const HEIGHT: f64 = 300.0;

#[derive(Clone, Debug)]
enum Step {
    Add { x: u16, y: u16, w: u16, h: u16, snap: bool },
    Move { pick: usize, dx: i16, dy: i16, snap: bool },
    Resize { pick: usize, grow: i16 },
    ToggleResizing { pick: usize, vertical: bool },
    Remove { pick: usize },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0u16..300, 0u16..260, 20u16..100, 16u16..32, any::<bool>())
            .prop_map(|(x, y, w, h, snap)| Step::Add { x, y, w, h, snap }),
        2 => (any::<usize>(), -60i16..60, -40i16..40, any::<bool>())
            .prop_map(|(pick, dx, dy, snap)| Step::Move { pick, dx, dy, snap }),
        1 => (any::<usize>(), -30i16..60).prop_map(|(pick, grow)| Step::Resize { pick, grow }),
        1 => (any::<usize>(), any::<bool>())
            .prop_map(|(pick, vertical)| Step::ToggleResizing { pick, vertical }),
        1 => any::<usize>().prop_map(|pick| Step::Remove { pick }),
    ]
}

fn designer() -> Designer<TableMapper> {
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
    mapper.set_interior("form", Rect::new(0.0, 0.0, WIDTH, HEIGHT));
    let mut d = Designer::new(model, mapper);
    d.update_current_state();
    d
}

/// Shift `bounds` by at most `(dx, dy)` while keeping it inside the form.
fn clamped_offset(bounds: Rect, dx: f64, dy: f64) -> (f64, f64) {
    let dx = dx.clamp(-bounds.x0, WIDTH - bounds.x1);
    let dy = dy.clamp(-bounds.y0, HEIGHT - bounds.y1);
    (dx, dy)
}

fn apply(d: &mut Designer<TableMapper>, placed: &mut Vec<String>, next: &mut usize, step: &Step) {
    match *step {
        Step::Add { x, y, w, h, snap } => {
            let id = format!("c{next}");
            *next += 1;
            let (x, y) = (f64::from(x), f64::from(y));
            let bounds = Rect::new(x, y, x + f64::from(w), y + f64::from(h));
            d.mapper_mut().set_preferred_size(&id, bounds.size());
            d.start_adding(&[(&id, false)], &[bounds], Point::ZERO, Some("form"))
                .unwrap();
            let moved = d.move_to(Point::ZERO, Some("form"), snap, false).unwrap();
            d.end_moving(true).unwrap();
            let dropped = moved.map_or(bounds, |s| s.bounds[0]);
            d.mapper_mut().set_bounds(&id, dropped);
            placed.push(id);
        }
        Step::Move { pick, dx, dy, snap } if !placed.is_empty() => {
            let id = placed[pick % placed.len()].clone();
            let Some(bounds) = d.mapper().component_bounds(&id) else {
                return;
            };
            let (dx, dy) = clamped_offset(bounds, f64::from(dx), f64::from(dy));
            let hotspot = bounds.origin();
            d.start_moving(&[&id], &[bounds], hotspot).unwrap();
            let cursor = Point::new(hotspot.x + dx, hotspot.y + dy);
            let moved = d.move_to(cursor, Some("form"), snap, false).unwrap();
            d.end_moving(true).unwrap();
            if let Some(moved) = moved {
                d.mapper_mut().set_bounds(&id, moved.bounds[0]);
            }
        }
        Step::Resize { pick, grow } if !placed.is_empty() => {
            let id = placed[pick % placed.len()].clone();
            let Some(bounds) = d.mapper().component_bounds(&id) else {
                return;
            };
            let grow = f64::from(grow)
                .max(10.0 - bounds.width())
                .min(WIDTH - bounds.x1);
            let hotspot = Point::new(bounds.x1, bounds.center().y);
            d.start_resizing(&[&id], &[bounds], hotspot, [Some(Alignment::Trailing), None], true)
                .unwrap();
            let cursor = Point::new(hotspot.x + grow, hotspot.y);
            let resized = d.move_to(cursor, Some("form"), true, false).unwrap();
            d.end_moving(true).unwrap();
            if let Some(resized) = resized {
                d.mapper_mut().set_bounds(&id, resized.bounds[0]);
            }
        }
        Step::ToggleResizing { pick, vertical } if !placed.is_empty() => {
            let id = &placed[pick % placed.len()];
            let axis = if vertical { Axis::Vertical } else { Axis::Horizontal };
            let resizing = d.is_component_resizing(id, axis).unwrap();
            d.set_component_resizing(id, axis, !resizing).unwrap();
        }
        Step::Remove { pick } if !placed.is_empty() => {
            let id = placed.remove(pick % placed.len());
            d.remove_component(&id, true).unwrap();
        }
        _ => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn gestures_keep_the_trees_consistent(steps in prop::collection::vec(step_strategy(), 1..12)) {
        let mut d = designer();
        let mut placed = Vec::new();
        let mut next = 0;
        for step in &steps {
            apply(&mut d, &mut placed, &mut next, step);
            d.update_current_state();
            let integrity = d.model().check_integrity();
            prop_assert!(integrity.is_ok(), "after {:?}: {:?}", step, integrity);

            let m = d.model();
            for id in &placed {
                let key = m.component(id);
                prop_assert!(key.is_some(), "{} vanished after {:?}", id, step);
                let key = key.unwrap();
                for axis in Axis::BOTH {
                    let interval = m.component_interval(key, axis);
                    prop_assert!(m.parent(interval).is_some(), "{} detached on {:?}", id, axis);
                }
            }
        }
        d.update_current_state();
        prop_assert!(!d.update_current_state(), "second pull changed the model");
    }

    #[test]
    fn cancelled_gestures_change_nothing(steps in prop::collection::vec(step_strategy(), 1..6), dx in -50i16..50) {
        let mut d = designer();
        let mut placed = Vec::new();
        let mut next = 0;
        for step in &steps {
            apply(&mut d, &mut placed, &mut next, step);
            d.update_current_state();
        }
        d.update_current_state();
        let Some(id) = placed.first().cloned() else {
            return Ok(());
        };
        let mark = d.model().change_mark();
        let bounds = d.mapper().component_bounds(&id).unwrap();
        d.start_moving(&[&id], &[bounds], bounds.origin()).unwrap();
        let cursor = Point::new(bounds.x0 + f64::from(dx), bounds.y0);
        d.move_to(cursor, Some("form"), true, false).unwrap();
        d.end_moving(false).unwrap();
        prop_assert_eq!(d.model().change_mark(), mark);
    }
}
