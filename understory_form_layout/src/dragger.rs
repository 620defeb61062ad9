// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Position finder for a dragged or resized formation.
//!
//! A [`Dragger`] lives for one gesture. Every [`Dragger::move_to`] step
//! recomputes where the formation would land for the cursor position and,
//! with auto positioning, snaps it either *next to* a neighboring edge (at a
//! default padding distance) or *aligned* with an edge, center, or baseline
//! of existing content. The vertical axis is evaluated before the
//! horizontal one.
//!
//! The dragger only reads the model. Dropping it leaves the layout as it
//! was; committing its findings is the job of the insertion engine.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

use hashbrown::HashMap;
use kurbo::{Point, Size};
use smallvec::SmallVec;

use crate::config::Tuning;
use crate::mapper::{FeedbackPainter, VisualMapper};
use crate::model::{ComponentKey, GroupKind, IntervalId, LayoutModel};
use crate::region::{Region, UNKNOWN, abs_distance};
use crate::types::{
    Alignment, Attributes, Axis, Motion, NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
};
use crate::utils::{size_of_default_gap, sizes_of_default_gap};

/// What the gesture does with the moving components.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// New components, not yet placed in any container.
    Adding,
    /// Components already placed somewhere.
    Moving,
    /// One component changing its size.
    Resizing,
}

/// A snap candidate found on one axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionDef {
    /// The interval the formation is placed next to or aligned with.
    pub interval: IntervalId,
    /// Edge (or point) of the formation involved.
    pub alignment: Alignment,
    /// Signed correction that would make the position exact.
    pub distance: i32,
    /// Whether the formation sits next to `interval` rather than aligned with it.
    pub next_to: bool,
    /// Whether the distance was measured with snapping on.
    pub snapped: bool,
    /// Kind of default padding for next-to positions.
    pub padding_type: Option<PaddingType>,
    /// Pixel sizes of the padding kinds that were considered.
    pub padding_sizes: SmallVec<[i32; 4]>,
}

/// Reference sizes of a component being resized on one axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SizeDef {
    /// Size when the gesture started.
    pub original_size: i32,
    /// Size to snap to: the preferred size, or for a container the size with
    /// its resizing gap at default padding.
    pub preferred_size: i32,
    /// Size with the container resizing gap collapsed, when that gap can vanish.
    pub zero_preferred_size: Option<i32>,
    /// Design-time gap absorbing the container's extra space.
    pub resizing_gap: Option<IntervalId>,
    /// Current size of `resizing_gap` when the gesture started.
    pub original_gap_size: i32,
    /// Default padding size of `resizing_gap`.
    pub preferred_gap_size: i32,
}

impl SizeDef {
    /// Size the resizing gap should get for a container resized to `current`.
    ///
    /// [`NOT_EXPLICITLY_DEFINED`] means default padding; `None` means there
    /// is no resizing gap.
    pub fn resizing_gap_size(&self, current: i32) -> Option<i32> {
        self.resizing_gap?;
        if current == UNKNOWN {
            return None;
        }
        if Some(current) == self.zero_preferred_size {
            return Some(0);
        }
        let gap_size = self.original_gap_size - self.original_size + current;
        Some(if current == self.preferred_size || gap_size < 0 {
            NOT_EXPLICITLY_DEFINED
        } else {
            gap_size
        })
    }
}

/// Edges considered by a scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Edges {
    Both,
    One(Alignment),
}

impl Edges {
    fn of(motion: Motion) -> Option<Self> {
        match motion {
            Motion::Move => Some(Self::Both),
            Motion::Resize(edge) => Some(Self::One(edge)),
            Motion::Fixed => None,
        }
    }

    fn contains(self, point: Alignment) -> bool {
        match self {
            Self::Both => true,
            Self::One(edge) => edge == point,
        }
    }

    fn single(self) -> Option<Alignment> {
        match self {
            Self::Both => None,
            Self::One(edge) => Some(edge),
        }
    }
}

/// Whether a resized component can be placed next to an interval.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NextToFit {
    Yes,
    /// Not this interval, but possibly something inside it.
    NotHere,
    Never,
}

#[derive(Copy, Clone)]
struct Scan<'a> {
    model: &'a LayoutModel,
    mapper: &'a dyn VisualMapper,
    axis: Axis,
}

type Findings = [[Option<PositionDef>; 4]; 2];

/// Snap search state for one drag or resize gesture.
#[derive(Clone, Debug)]
pub struct Dragger {
    operation: Operation,
    components: Vec<ComponentKey>,
    motions: [Motion; 2],
    formation: Vec<Region>,
    start_cursor: [i32; 2],
    sizing: [Option<SizeDef>; 2],
    last_cursor: [i32; 2],
    move_direction: [Alignment; 2],
    locked_axis: Option<Axis>,
    target: Option<(ComponentKey, [IntervalId; 2])>,
    moving_bounds: Vec<Region>,
    moving_space: Region,
    best_positions: [Option<PositionDef>; 2],
    can_snap_to_baseline: bool,
    next_to: Findings,
    aligned: Findings,
    tuning: Tuning,
}

impl Dragger {
    /// Prepare a gesture for `components` whose regions form `formation`.
    ///
    /// `cursor` is where the gesture started; `motions` says per axis whether
    /// the formation moves, has one edge resized, or stays fixed.
    pub fn new(
        model: &LayoutModel,
        mapper: &dyn VisualMapper,
        components: Vec<ComponentKey>,
        formation: Vec<Region>,
        cursor: [i32; 2],
        motions: [Motion; 2],
        tuning: Tuning,
    ) -> Self {
        debug_assert_eq!(components.len(), formation.len());
        let operation = if motions.iter().any(|m| m.resizing_edge().is_some()) {
            Operation::Resizing
        } else if components
            .first()
            .is_some_and(|&c| model.component_parent(c).is_some())
        {
            Operation::Moving
        } else {
            Operation::Adding
        };

        let mut moving_space = Region::new();
        for region in &formation {
            moving_space.expand(region);
        }
        let can_snap_to_baseline = match components.as_slice() {
            [_] => true,
            [first, rest @ ..] => {
                let parent = model.parent(model.component_interval(*first, Axis::Vertical));
                parent.is_some_and(|p| {
                    model.is_parallel(p)
                        && model.group_alignment(p) == Alignment::Baseline
                        && rest.iter().all(|&c| {
                            model.parent(model.component_interval(c, Axis::Vertical)) == Some(p)
                        })
                })
            }
            [] => false,
        };

        let mut dragger = Self {
            operation,
            moving_bounds: alloc::vec![Region::new(); formation.len()],
            components,
            motions,
            formation,
            start_cursor: cursor,
            sizing: [None, None],
            last_cursor: [UNKNOWN, UNKNOWN],
            move_direction: [Alignment::Leading, Alignment::Leading],
            locked_axis: None,
            target: None,
            moving_space,
            best_positions: [None, None],
            can_snap_to_baseline,
            next_to: Findings::default(),
            aligned: Findings::default(),
            tuning,
        };
        if operation == Operation::Resizing {
            dragger.prepare_resizing(model, mapper);
        }
        dragger
    }

    fn prepare_resizing(&mut self, model: &LayoutModel, mapper: &dyn VisualMapper) {
        let Some(&comp) = self.components.first() else {
            return;
        };
        let space = self.formation[0];
        let id = model.component_id(comp);
        for axis in Axis::BOTH {
            if !self.is_resizing_axis(axis) {
                continue;
            }
            let original_size = space.size(axis);
            let mut def = SizeDef {
                original_size,
                preferred_size: original_size,
                zero_preferred_size: None,
                resizing_gap: None,
                original_gap_size: 0,
                preferred_gap_size: 0,
            };
            let gap = if model.is_container(comp) {
                model
                    .default_root(comp, axis)
                    .and_then(|root| find_resizing_gap(model, root))
            } else {
                None
            };
            let gap = gap.and_then(|gap| Some((gap, model.known_current_size(gap, axis)?)));
            if let Some((gap, gap_size)) = gap {
                def.resizing_gap = Some(gap);
                def.original_gap_size = gap_size;
                def.preferred_gap_size = size_of_default_gap(model, gap, mapper);
                def.preferred_size = original_size - def.original_gap_size + def.preferred_gap_size;
                if is_zero_resizing_gap(model, gap) {
                    def.zero_preferred_size = Some(original_size - def.original_gap_size);
                }
            } else {
                let size = if model.is_container(comp) {
                    mapper.component_minimum_size(id)
                } else {
                    mapper.component_preferred_size(id)
                }
                .unwrap_or(Size::ZERO);
                let extent = match axis {
                    Axis::Horizontal => size.width,
                    Axis::Vertical => size.height,
                };
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "Component sizes are whole pixels well within i32."
                )]
                let extent = extent.round() as i32;
                def.preferred_size = extent;
            }
            self.sizing[axis.index()] = Some(def);
        }
    }

    // --- accessors ---

    /// Set the container the formation is dragged over, with the roots to search.
    pub fn set_target_container(&mut self, target: Option<(ComponentKey, [IntervalId; 2])>) {
        self.target = target;
    }

    /// The container the formation is dragged over.
    pub fn target_container(&self) -> Option<ComponentKey> {
        self.target.map(|(c, _)| c)
    }

    /// The roots searched for positions.
    pub fn target_roots(&self) -> Option<[IntervalId; 2]> {
        self.target.map(|(_, roots)| roots)
    }

    /// What this gesture does.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Whether this gesture resizes.
    pub fn is_resizing(&self) -> bool {
        self.operation == Operation::Resizing
    }

    /// Whether `axis` is being resized.
    pub fn is_resizing_axis(&self, axis: Axis) -> bool {
        self.motions[axis.index()].resizing_edge().is_some()
    }

    /// The edge resized on `axis`.
    pub fn resizing_edge(&self, axis: Axis) -> Option<Alignment> {
        self.motions[axis.index()].resizing_edge()
    }

    /// Motion per axis.
    pub fn motions(&self) -> [Motion; 2] {
        self.motions
    }

    /// The dragged components.
    pub fn moving_components(&self) -> &[ComponentKey] {
        &self.components
    }

    /// Regions of the dragged components after the last step.
    pub fn moving_bounds(&self) -> &[Region] {
        &self.moving_bounds
    }

    /// Region covering the whole formation after the last step.
    pub fn moving_space(&self) -> &Region {
        &self.moving_space
    }

    /// Thresholds this gesture snaps with.
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Chosen position per axis.
    pub fn positions(&self) -> &[Option<PositionDef>; 2] {
        &self.best_positions
    }

    /// Reference sizes per resized axis.
    pub fn sizes(&self) -> &[Option<SizeDef>; 2] {
        &self.sizing
    }

    /// Whether the resized size on `axis` snapped to the preferred (or zero-gap) size.
    pub fn snapped_to_default_size(&self, axis: Axis) -> bool {
        if !self.is_resizing_axis(axis) || self.best_positions[axis.index()].is_some() {
            return false;
        }
        let Some(def) = &self.sizing[axis.index()] else {
            return false;
        };
        let size = self.moving_space.size(axis);
        size == def.preferred_size || Some(size) == def.zero_preferred_size
    }

    // --- moving ---

    /// Move the formation for the cursor at `cursor` and return the cursor
    /// position corrected by the chosen snap.
    ///
    /// With `lock_axis`, the axis that is already aligned and moved least
    /// stays where it is.
    pub fn move_to(
        &mut self,
        model: &LayoutModel,
        mapper: &dyn VisualMapper,
        cursor: [i32; 2],
        auto_positioning: bool,
        lock_axis: bool,
    ) -> [i32; 2] {
        let mut offset = [
            cursor[0] - self.start_cursor[0],
            cursor[1] - self.start_cursor[1],
        ];
        let mut lock_axis = lock_axis;
        let mut lock_candidate = None;
        let mut min_delta = i32::MAX;
        for axis in Axis::BOTH {
            let i = axis.index();
            let current = offset[i];
            let last = self.last_cursor[i];
            self.last_cursor[i] = current;
            if last == UNKNOWN {
                lock_axis = false;
                continue;
            }
            let delta = current - last;
            if delta != 0 {
                self.move_direction[i] = if delta > 0 {
                    Alignment::Trailing
                } else {
                    Alignment::Leading
                };
            }
            if self.motions[i] != Motion::Move {
                lock_axis = false;
            } else if self.locked_axis.is_none()
                && self.best_positions[i].as_ref().is_some_and(|p| !p.next_to)
                && delta < min_delta
            {
                lock_candidate = Some(axis);
                min_delta = delta;
            }
        }
        if !lock_axis {
            self.locked_axis = None;
        } else if self.locked_axis.is_none() {
            self.locked_axis = lock_candidate;
        }

        for (bounds, original) in self.moving_bounds.iter_mut().zip(&self.formation) {
            for axis in Axis::BOTH {
                if Some(axis) != self.locked_axis {
                    bounds.copy_axis(axis, original);
                    bounds.reshape(axis, self.motions[axis.index()], offset[axis.index()]);
                }
            }
        }
        self.moving_space = Region::new();
        for bounds in &self.moving_bounds {
            self.moving_space.expand(bounds);
        }
        if self.can_snap_to_baseline {
            let baseline = self
                .moving_bounds
                .first()
                .map_or(UNKNOWN, |b| b.pos(Axis::Vertical, Alignment::Baseline));
            if baseline > 0 {
                self.moving_space
                    .set_pos(Axis::Vertical, Alignment::Baseline, baseline);
            } else {
                self.can_snap_to_baseline = false;
            }
        }
        for axis in Axis::BOTH {
            if Some(axis) != self.locked_axis {
                let i = axis.index();
                self.best_positions[i] = None;
                self.next_to[i] = <[Option<PositionDef>; 4]>::default();
                self.aligned[i] = <[Option<PositionDef>; 4]>::default();
            }
        }

        if auto_positioning {
            for axis in [Axis::Vertical, Axis::Horizontal] {
                let motion = self.motions[axis.index()];
                if Some(axis) == self.locked_axis || motion == Motion::Fixed {
                    continue;
                }
                let cx = Scan {
                    model,
                    mapper,
                    axis,
                };
                let snap = self.find_best_position(&cx);
                if snap != UNKNOWN {
                    offset[axis.index()] -= snap;
                    for bounds in &mut self.moving_bounds {
                        bounds.reshape(axis, motion, -snap);
                    }
                    self.moving_space.reshape(axis, motion, -snap);
                }
            }
        }
        [
            offset[0] + self.start_cursor[0],
            offset[1] + self.start_cursor[1],
        ]
    }

    fn find_best_position(&mut self, cx: &Scan<'_>) -> i32 {
        let axis = cx.axis;
        let i = axis.index();
        let mut snap = UNKNOWN;
        let mut best = None;
        if let Some((_, roots)) = self.target {
            let root = roots[i];
            let Some(edges) = Edges::of(self.motions[i]) else {
                return UNKNOWN;
            };
            self.check_root_for_next_to(cx, root, edges);
            self.scan_layout_for_next_to(cx, root, edges);
            let best_next_to = self.choose_best_next_to(axis);
            self.check_root_for_aligned(cx, root, edges);
            self.scan_layout_for_aligned(cx, root, edges);
            let best_aligned = self.choose_best_aligned(cx);
            best = match (best_next_to, best_aligned) {
                (next_to, None) => next_to,
                (None, aligned) => aligned,
                (Some(next_to), Some(aligned)) => {
                    Some(self.pick_next_to_or_aligned(cx, next_to, aligned))
                }
            };
        }
        if let Some(def) = self.sizing[i] {
            let size = self.moving_space.size(axis);
            let pref_diff = size - def.preferred_size;
            let size_diff = match def.zero_preferred_size {
                Some(zero) if (size - zero).abs() < pref_diff.abs() => size - zero,
                _ => pref_diff,
            };
            let abs_diff = size_diff.abs();
            if abs_diff < self.tuning.snap_distance
                && best
                    .as_ref()
                    .is_none_or(|b: &PositionDef| abs_diff < abs_distance(b.distance))
            {
                best = None;
                snap = if self.resizing_edge(axis) == Some(Alignment::Leading) {
                    -size_diff
                } else {
                    size_diff
                };
            }
        }
        if let Some(b) = &best {
            snap = b.distance;
        }
        tracing::trace!(
            ?axis,
            position = ?best.as_ref().map(|b| (b.interval, b.alignment, b.next_to)),
            snap,
            "best position"
        );
        self.best_positions[i] = best;
        snap
    }

    fn pick_next_to_or_aligned(
        &self,
        cx: &Scan<'_>,
        next_to: PositionDef,
        aligned: PositionDef,
    ) -> PositionDef {
        let i = cx.axis.index();
        let snap = self.tuning.snap_distance;
        let preferred_next_to = self.is_preferred_next_to(cx, &aligned);
        let next_to_dst = smallest_distance(&self.next_to[i]);
        let mut aligned_dst = smallest_distance(&self.aligned[i]);
        if !related_positions(cx.model, &next_to, &aligned) {
            let ort = abs_distance(Region::non_overlap_distance(
                cx.model.space(aligned.interval),
                &self.moving_space,
                cx.axis.other(),
            ));
            aligned_dst = distance_score(aligned_dst, ort, snap);
        }
        let choose_aligned = if preferred_next_to {
            aligned_dst.saturating_mul(2) <= next_to_dst && next_to_dst - aligned_dst >= snap / 2
        } else {
            !(next_to_dst.saturating_mul(2) <= aligned_dst && aligned_dst - next_to_dst >= snap / 2)
        };
        if choose_aligned {
            return aligned;
        }
        self.aligned_equal_to_next_to(cx, &next_to)
            .unwrap_or(next_to)
    }

    // --- next-to positions ---

    fn check_root_for_next_to(&mut self, cx: &Scan<'_>, root: IntervalId, edges: Edges) {
        if self.operation == Operation::Resizing
            && edges
                .single()
                .is_none_or(|edge| self.valid_next_to_resizing(cx, root, edge) != NextToFit::Yes)
        {
            return;
        }
        let root_space = *cx.model.space(root);
        for edge in Alignment::EDGES {
            if !edges.contains(edge) {
                continue;
            }
            let distance = Region::distance(&root_space, &self.moving_space, cx.axis, edge, edge);
            if distance == UNKNOWN {
                continue;
            }
            let pad = self.find_paddings_in(cx, None, None, edge)[0];
            let distance = distance + edge.sign() * pad;
            if distance.abs() < self.tuning.snap_distance {
                self.next_to[cx.axis.index()][edge.index()] = Some(PositionDef {
                    interval: root,
                    alignment: edge,
                    distance,
                    next_to: true,
                    snapped: true,
                    padding_type: None,
                    padding_sizes: SmallVec::new(),
                });
            }
        }
    }

    /// Collect next-to candidates inside `interval`; returns the edges of
    /// `interval` itself that ended up next to the formation.
    fn scan_layout_for_next_to(
        &mut self,
        cx: &Scan<'_>,
        interval: IntervalId,
        edges: Edges,
    ) -> Option<Edges> {
        let model = cx.model;
        let mut group_outer = None;
        let children = model.children(interval);
        let count = children.len();
        for (idx, &sub) in children.iter().enumerate() {
            if model.is_gap(sub) || !self.orthogonal_overlap(cx, interval, idx) {
                continue;
            }
            let mut next_to_edges = None;
            if model.is_component(sub) {
                if self.is_valid_interval(cx, sub)
                    && (self.operation != Operation::Resizing
                        || edges.single().is_some_and(|edge| {
                            self.valid_next_to_resizing(cx, sub, edge) == NextToFit::Yes
                        }))
                {
                    next_to_edges = self.check_next_to_position(cx, sub, edges);
                }
            } else if model.is_sequential(sub) {
                next_to_edges = self.scan_layout_for_next_to(cx, sub, edges);
            } else {
                let valid_for_ref = self.is_valid_interval(cx, sub);
                let valid_resizing = match edges.single() {
                    Some(edge) if valid_for_ref && self.operation == Operation::Resizing => {
                        self.valid_next_to_resizing(cx, sub, edge)
                    }
                    _ => NextToFit::Yes,
                };
                let sub_outer = if valid_resizing != NextToFit::Never
                    && can_go_inside_for_next_to(model, sub, valid_for_ref)
                {
                    let mut inner = Some(edges);
                    for edge in Alignment::EDGES {
                        if !edges.contains(edge) {
                            continue;
                        }
                        let d = Region::distance(model.space(sub), &self.moving_space, cx.axis, edge, edge);
                        let outside = d == UNKNOWN || -edge.sign() * d < -self.tuning.snap_distance;
                        if outside {
                            inner = match inner {
                                Some(Edges::Both) => Some(Edges::One(edge.opposite())),
                                _ => None,
                            };
                        }
                    }
                    match inner {
                        Some(inner) => self.scan_layout_for_next_to(cx, sub, inner),
                        None => None,
                    }
                } else {
                    Some(edges)
                };
                if valid_for_ref && valid_resizing == NextToFit::Yes {
                    if let Some(outer) = sub_outer {
                        next_to_edges = self.check_next_to_position(cx, sub, outer);
                    }
                }
            }

            let Some(found) = next_to_edges else {
                continue;
            };
            if model.is_sequential(interval) {
                if group_outer.is_none() && (idx == 0 || idx + 1 == count) {
                    group_outer = if idx != 0 {
                        (found != Edges::One(Alignment::Trailing)).then_some(Edges::One(Alignment::Leading))
                    } else if idx + 1 != count {
                        (found != Edges::One(Alignment::Leading)).then_some(Edges::One(Alignment::Trailing))
                    } else {
                        Some(found)
                    };
                }
            } else if model.want_resize(sub) {
                if found == Edges::Both {
                    group_outer = Some(Edges::Both);
                } else if group_outer.is_none() {
                    group_outer = Some(found);
                }
            } else if group_outer.is_none() {
                let sub_alignment = model.alignment(sub).filter(|a| a.is_edge());
                let facing = match found {
                    Edges::Both => true,
                    Edges::One(edge) => Some(edge.opposite()) == sub_alignment,
                };
                if facing {
                    group_outer = sub_alignment.map(|a| Edges::One(a.opposite()));
                }
            }
        }
        group_outer
    }

    fn orthogonal_overlap(&self, cx: &Scan<'_>, interval: IntervalId, index: usize) -> bool {
        let model = cx.model;
        let sub = model.child(interval, index);
        let sub_space = model.space(sub);
        if Region::overlap(&self.moving_space, sub_space, cx.axis.other(), 0) {
            return true;
        }
        if cx.axis != Axis::Vertical {
            return false;
        }
        if model.is_sequential(sub) {
            return true;
        }
        if model
            .parent(interval)
            .is_some_and(|p| model.child_count(p) > 1)
        {
            return false;
        }
        if !Region::overlap(&self.moving_space, model.space(interval), cx.axis, 0) {
            return true;
        }
        if model.is_sequential(interval) {
            let children = model.children(interval);
            let blocked = |li: IntervalId| !model.is_gap(li) && self.is_valid_interval(cx, li);
            let before = Region::distance(&self.moving_space, sub_space, cx.axis, Alignment::Trailing, Alignment::Leading);
            let after = Region::distance(sub_space, &self.moving_space, cx.axis, Alignment::Trailing, Alignment::Leading);
            if before != UNKNOWN && before > 0 {
                return !children[..index].iter().any(|&li| blocked(li));
            } else if after != UNKNOWN && after > 0 {
                return !children[index + 1..].iter().any(|&li| blocked(li));
            }
        }
        false
    }

    fn check_next_to_position(&mut self, cx: &Scan<'_>, sub: IntervalId, edges: Edges) -> Option<Edges> {
        let model = cx.model;
        let mut found = None;
        let sub_space = *model.space(sub);
        for edge in Alignment::EDGES {
            if !edges.contains(edge) {
                continue;
            }
            let distance = Region::distance(&sub_space, &self.moving_space, cx.axis, edge.opposite(), edge);
            if distance == UNKNOWN {
                continue;
            }
            let mut padding_type = None;
            if let Some(gap) = model.neighbor(sub, edge.opposite(), false, true, false) {
                if model.is_fixed_default_padding(gap) {
                    let neighbor = model.neighbor(gap, edge.opposite(), true, true, false);
                    if neighbor.is_some_and(|n| self.is_valid_interval(cx, n)) {
                        padding_type = Some(model.padding_type(gap).unwrap_or(PaddingType::Related));
                    }
                }
            }
            let pads: SmallVec<[i32; 4]> =
                SmallVec::from_vec(self.find_paddings_in(cx, Some(sub), padding_type, edge));
            let orient = edge.sign();
            let mut pad_dst = distance + orient * pads[0];
            if padding_type.is_none() {
                padding_type = Some(PaddingType::Related);
                for (&kind, &pad) in PaddingType::ALL.iter().zip(&pads).skip(1) {
                    if kind == PaddingType::Indent {
                        continue;
                    }
                    let d = distance + orient * pad;
                    if d.abs() < pad_dst.abs() {
                        pad_dst = d;
                        padding_type = Some(kind);
                    }
                }
            }
            let distance = pad_dst;
            if distance.abs() >= self.tuning.snap_distance {
                continue;
            }
            found = Some(match found {
                None => Edges::One(edge),
                Some(_) => Edges::Both,
            });
            let slot = &self.next_to[cx.axis.index()][edge.index()];
            let better = match slot {
                None => true,
                Some(best) => self.compare_next_to_position(cx, sub, distance, best) == Ordering::Greater,
            };
            if better {
                self.next_to[cx.axis.index()][edge.index()] = Some(PositionDef {
                    interval: sub,
                    alignment: edge,
                    distance,
                    next_to: true,
                    snapped: true,
                    padding_type,
                    padding_sizes: pads,
                });
            }
        }
        found
    }

    fn compare_next_to_position(
        &self,
        cx: &Scan<'_>,
        candidate: IntervalId,
        distance: i32,
        best: &PositionDef,
    ) -> Ordering {
        let model = cx.model;
        let new_distance = distance.abs();
        let old_distance = abs_distance(best.distance);
        if new_distance != old_distance {
            return old_distance.cmp(&new_distance);
        }
        if model.is_parent_of(candidate, best.interval) {
            return Ordering::Greater;
        }
        let other = cx.axis.other();
        let new_ort = Region::min_distance(model.space(candidate), &self.moving_space, other).abs();
        let old_ort = Region::min_distance(model.space(best.interval), &self.moving_space, other).abs();
        old_ort.cmp(&new_ort)
    }

    fn choose_best_next_to(&self, axis: Axis) -> Option<PositionDef> {
        let mut best: Option<&PositionDef> = None;
        let mut best_dst = 0;
        for (i, pos) in self.next_to[axis.index()].iter().enumerate() {
            let Some(pos) = pos else { continue };
            let dst = abs_distance(pos.distance);
            if best.is_none()
                || dst < best_dst
                || (dst == best_dst && self.move_direction[axis.index()].index() == i)
            {
                best = Some(pos);
                best_dst = dst;
            }
        }
        best.cloned()
    }

    // --- aligned positions ---

    fn check_root_for_aligned(&mut self, cx: &Scan<'_>, root: IntervalId, edges: Edges) {
        if self.operation == Operation::Resizing
            && edges
                .single()
                .is_none_or(|edge| !self.valid_aligned_resizing(cx, root, edge))
        {
            return;
        }
        let root_space = *cx.model.space(root);
        for edge in Alignment::EDGES {
            if !edges.contains(edge) {
                continue;
            }
            let distance = Region::distance(&root_space, &self.moving_space, cx.axis, edge, edge);
            if distance != UNKNOWN && distance.abs() < self.tuning.snap_distance {
                self.aligned[cx.axis.index()][edge.index()] = Some(PositionDef {
                    interval: root,
                    alignment: edge,
                    distance,
                    next_to: false,
                    snapped: true,
                    padding_type: None,
                    padding_sizes: SmallVec::new(),
                });
            }
        }
    }

    fn scan_layout_for_aligned(&mut self, cx: &Scan<'_>, interval: IntervalId, edges: Edges) {
        let model = cx.model;
        for &sub in model.children(interval) {
            if model.is_gap(sub) {
                continue;
            }
            let alignable_closed_group = model.is_parallel(sub)
                && model.group_alignment(sub) == Alignment::Baseline
                && !self.can_snap_to_baseline
                && self.is_valid_interval(cx, sub);
            let candidate = (model.is_component(sub) && self.is_valid_interval(cx, sub))
                || alignable_closed_group;
            let resizing_ok = self.operation != Operation::Resizing
                || edges
                    .single()
                    .is_some_and(|edge| self.valid_aligned_resizing(cx, sub, edge));
            if candidate && resizing_ok {
                let sub_space = *model.space(sub);
                for &point in cx.axis.points() {
                    if !edges.contains(point) {
                        continue;
                    }
                    let indented = self.indented_distance(cx, sub, point);
                    let direct = self.direct_distance(cx, sub, point);
                    let distance = if abs_distance(indented) < abs_distance(direct) {
                        indented
                    } else {
                        direct
                    };
                    if !self.check_aligned_distance(cx, distance, &sub_space, point) {
                        continue;
                    }
                    let better = match &self.aligned[cx.axis.index()][point.index()] {
                        None => true,
                        Some(best) => self.compare_aligned_position(cx, sub, distance, best) != Ordering::Less,
                    };
                    if better {
                        self.aligned[cx.axis.index()][point.index()] = Some(PositionDef {
                            interval: sub,
                            alignment: point,
                            distance,
                            next_to: false,
                            snapped: true,
                            padding_type: None,
                            padding_sizes: SmallVec::new(),
                        });
                    }
                }
            }
            if model.child_count(sub) > 0
                && !alignable_closed_group
                && Region::overlap(model.space(sub), &self.moving_space, cx.axis, self.tuning.snap_distance / 2)
            {
                self.scan_layout_for_aligned(cx, sub, edges);
            }
        }
    }

    /// Distance to the position indented below `interval`, horizontal leading only.
    fn indented_distance(&self, cx: &Scan<'_>, interval: IntervalId, point: Alignment) -> i32 {
        if cx.axis != Axis::Horizontal || point != Alignment::Leading {
            return i32::MAX;
        }
        let (Some(main), Some(&indented)) = (cx.model.component_of(interval), self.components.first()) else {
            return i32::MAX;
        };
        let space = cx.model.space(interval);
        let vertical = Region::distance(space, &self.moving_space, Axis::Vertical, Alignment::Trailing, Alignment::Leading);
        if vertical == UNKNOWN || vertical < 0 || vertical >= 2 * self.tuning.snap_distance {
            return i32::MAX;
        }
        let indent = cx.mapper.preferred_padding(
            cx.model.component_id(main),
            cx.model.component_id(indented),
            cx.axis,
            point,
            PaddingType::Indent,
        );
        let distance = Region::distance(space, &self.moving_space, cx.axis, point, point);
        if indent > 0 && distance != UNKNOWN {
            distance - indent
        } else {
            i32::MAX
        }
    }

    fn direct_distance(&self, cx: &Scan<'_>, interval: IntervalId, point: Alignment) -> i32 {
        if self.check_valid_alignment(cx, interval, point) {
            Region::distance(cx.model.space(interval), &self.moving_space, cx.axis, point, point)
        } else {
            i32::MAX
        }
    }

    fn check_valid_alignment(&self, cx: &Scan<'_>, interval: IntervalId, point: Alignment) -> bool {
        let model = cx.model;
        let mut present = model.alignment(interval);
        if present.is_some() {
            let last_one = model.parent(interval).is_none_or(|p| {
                !model
                    .children(p)
                    .iter()
                    .any(|&li| li != interval && self.is_valid_interval(cx, li))
            });
            if last_one {
                present = None;
            }
        }
        match point {
            Alignment::Leading | Alignment::Trailing => {
                !matches!(present, Some(Alignment::Center | Alignment::Baseline))
            }
            Alignment::Center => present == Some(Alignment::Center),
            Alignment::Baseline => present != Some(Alignment::Center),
        }
    }

    fn check_aligned_distance(&self, cx: &Scan<'_>, distance: i32, examined: &Region, point: Alignment) -> bool {
        let snap = self.tuning.snap_distance;
        if distance == UNKNOWN || abs_distance(distance) >= snap {
            return false;
        }
        let Some((_, roots)) = self.target else {
            return false;
        };
        let axis = cx.axis;
        let other = axis.other();
        let moving = &self.moving_space;
        let positions = [
            moving.pos(axis, point),
            examined.pos(axis, point),
            moving.pos(other, Alignment::Leading),
            moving.pos(other, Alignment::Trailing),
            examined.pos(other, Alignment::Leading),
            examined.pos(other, Alignment::Trailing),
        ];
        if positions.contains(&UNKNOWN) {
            return false;
        }
        let indent = positions[0] - positions[1] - distance;
        let (x1, x2, mut y2) = if indent == 0 {
            (positions[1] - snap / 2, positions[1] + snap / 2, positions[2])
        } else {
            (positions[1], positions[1] + indent + snap / 2, positions[3])
        };
        let mut y1 = positions[5];
        if y1 > y2 {
            y1 = positions[3];
            y2 = positions[4];
            if y1 > y2 {
                return true;
            }
        }
        !self.content_overlap(cx, roots[axis.index()], [x1, x2, y1, y2])
    }

    /// Whether valid content of `group` intersects the rectangle
    /// `[x1, x2] x [y1, y2]` (x along the scanned axis).
    fn content_overlap(&self, cx: &Scan<'_>, group: IntervalId, rect: [i32; 4]) -> bool {
        let model = cx.model;
        let [x1, x2, y1, y2] = rect;
        let axis = cx.axis;
        let other = axis.other();
        let group_space = model.space(group);
        let children = model.children(group);
        let n = children.len();
        for (i, &li) in children.iter().enumerate() {
            let [sx1, sx2, sy1, sy2] = if model.is_gap(li) {
                if model.is_parallel(group) {
                    continue;
                }
                let sx1 = if i == 0 {
                    group_space.pos(axis, Alignment::Leading)
                } else {
                    model.space(children[i - 1]).pos(axis, Alignment::Trailing)
                };
                let sx2 = if i + 1 == n {
                    group_space.pos(axis, Alignment::Trailing)
                } else {
                    model.space(children[i + 1]).pos(axis, Alignment::Leading)
                };
                let mut gy1 = group_space.pos(other, Alignment::Leading);
                let mut gy2 = group_space.pos(other, Alignment::Trailing);
                if gy1 < y1 {
                    gy2 = gy1;
                } else if gy2 > y2 {
                    gy1 = gy2;
                }
                [sx1, sx2, gy1, gy2]
            } else {
                let space = model.space(li);
                [
                    space.pos(axis, Alignment::Leading),
                    space.pos(axis, Alignment::Trailing),
                    space.pos(other, Alignment::Leading),
                    space.pos(other, Alignment::Trailing),
                ]
            };
            if [sx1, sx2, sy1, sy2].contains(&UNKNOWN) {
                if model.is_group(li) && self.content_overlap(cx, li, rect) {
                    return true;
                }
                continue;
            }
            if !(sx1 < x2 && sx2 > x1 && sy1 < y2 && sy2 > y1) {
                continue;
            }
            if model.is_component(li) {
                if self.is_valid_interval(cx, li) {
                    return true;
                }
            } else if model.is_gap(li) {
                let default_size = |v: i32| v == NOT_EXPLICITLY_DEFINED || v == USE_PREFERRED_SIZE;
                if i > 0
                    && i + 1 < n
                    && default_size(model.min_size(li))
                    && model.pref_size(li) == NOT_EXPLICITLY_DEFINED
                    && default_size(model.max_size(li))
                {
                    let prev = children[i - 1];
                    let next = children[i + 1];
                    if (!model.is_component(prev) || self.is_valid_interval(cx, prev))
                        && (!model.is_component(next) || self.is_valid_interval(cx, next))
                    {
                        return true;
                    }
                }
                if sx1 >= x1 && sx2 <= x2 {
                    return false;
                }
            } else if self.content_overlap(cx, li, rect) {
                return true;
            }
        }
        false
    }

    fn compare_aligned_position(
        &self,
        cx: &Scan<'_>,
        candidate: IntervalId,
        distance: i32,
        best: &PositionDef,
    ) -> Ordering {
        let model = cx.model;
        let new_distance = abs_distance(distance);
        let old_distance = abs_distance(best.distance);
        if model.parent(candidate).is_none() {
            return if new_distance < old_distance {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        if model.parent(best.interval).is_none() {
            return if old_distance < new_distance {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        let other = cx.axis.other();
        let snap = self.tuning.snap_distance;
        let new_ort = abs_distance(Region::non_overlap_distance(model.space(candidate), &self.moving_space, other));
        let old_ort = abs_distance(Region::non_overlap_distance(model.space(best.interval), &self.moving_space, other));
        let new_score = distance_score(new_distance, new_ort, snap);
        let old_score = distance_score(old_distance, old_ort, snap);
        old_score.cmp(&new_score)
    }

    fn choose_best_aligned(&self, cx: &Scan<'_>) -> Option<PositionDef> {
        let mut best: Option<&PositionDef> = None;
        for pos in self.aligned[cx.axis.index()].iter().rev() {
            let Some(pos) = pos else { continue };
            if matches!(pos.alignment, Alignment::Baseline | Alignment::Center) {
                return Some(pos.clone());
            }
            match best {
                None => best = Some(pos),
                Some(current) => {
                    let mut c = self.compare_aligned_position(cx, pos.interval, pos.distance, current);
                    if c == Ordering::Equal {
                        c = self.compare_aligned_direction(cx, pos, current);
                    }
                    if c == Ordering::Greater {
                        best = Some(pos);
                    }
                }
            }
        }
        best.cloned()
    }

    fn compare_aligned_direction(&self, cx: &Scan<'_>, a: &PositionDef, b: &PositionDef) -> Ordering {
        let mut p1 = is_suitable_alignment(cx.model, a);
        let mut p2 = is_suitable_alignment(cx.model, b);
        if p1 == p2 {
            let direction = self.move_direction[cx.axis.index()];
            p1 = a.alignment == direction;
            p2 = b.alignment == direction;
            if p1 == p2 {
                return Ordering::Equal;
            }
        }
        if p1 { Ordering::Greater } else { Ordering::Less }
    }

    fn is_preferred_next_to(&self, cx: &Scan<'_>, aligned: &PositionDef) -> bool {
        let model = cx.model;
        if self.operation == Operation::Resizing {
            let (Some(&comp), Some(edge)) = (self.components.first(), self.resizing_edge(cx.axis)) else {
                return cx.axis == Axis::Horizontal;
            };
            let resizing = model.component_interval(comp, cx.axis);
            let fixed_edge = edge.opposite();
            if model.is_parent_of(aligned.interval, resizing) {
                if model.is_aligned_at_border_in(resizing, aligned.interval, fixed_edge) {
                    return false;
                }
            } else if let Some(common) = model.common_parent(resizing, aligned.interval) {
                if model.is_aligned_at_border_in(resizing, common, fixed_edge)
                    && model.is_aligned_at_border_in(aligned.interval, common, fixed_edge)
                {
                    return false;
                }
            }
            return true;
        }
        cx.axis == Axis::Horizontal
    }

    fn aligned_equal_to_next_to(&self, cx: &Scan<'_>, next_to: &PositionDef) -> Option<PositionDef> {
        if self.operation == Operation::Resizing || !next_to.snapped {
            return None;
        }
        let alternative = self.aligned[cx.axis.index()][next_to.alignment.index()].as_ref()?;
        if alternative.distance != next_to.distance {
            return None;
        }
        let neighbor = cx
            .model
            .neighbor(alternative.interval, next_to.alignment, true, true, false)?;
        (neighbor == next_to.interval || cx.model.is_parent_of(neighbor, next_to.interval))
            .then(|| alternative.clone())
    }

    // --- validity ---

    /// Whether `interval` may serve as a reference: it is not (only) made of
    /// the moving components.
    fn is_valid_interval(&self, cx: &Scan<'_>, interval: IntervalId) -> bool {
        if self.operation == Operation::Adding {
            return true;
        }
        let model = cx.model;
        if model.is_group(interval) {
            let sequential = model.is_sequential(interval);
            model
                .children(interval)
                .iter()
                .filter(|&&li| (!model.is_gap(li) || sequential) && self.is_valid_interval(cx, li))
                .nth(1)
                .is_some()
        } else {
            !self
                .components
                .iter()
                .any(|&c| model.component_interval(c, cx.axis) == interval)
        }
    }

    fn resizing_interval(&self, cx: &Scan<'_>) -> Option<IntervalId> {
        self.components
            .first()
            .map(|&c| cx.model.component_interval(c, cx.axis))
    }

    fn valid_next_to_resizing(&self, cx: &Scan<'_>, interval: IntervalId, edge: Alignment) -> NextToFit {
        let model = cx.model;
        let Some(resizing) = self.resizing_interval(cx) else {
            return NextToFit::Never;
        };
        if model.is_parent_of(interval, resizing) {
            let ok = model.parent(interval).is_none()
                && clear_way_to_parent(model, resizing, interval, cx.axis, edge).is_some()
                && (!self.too_deep_to_merge(model, resizing, interval, edge)
                    || model.neighbor(resizing, edge, true, true, false).is_none());
            return if ok { NextToFit::Yes } else { NextToFit::NotHere };
        }
        let Some(common) = model.common_parent(interval, resizing) else {
            return NextToFit::Never;
        };
        if !model.is_sequential(common) {
            return NextToFit::Never;
        }
        if self.too_deep_to_merge(model, resizing, common, edge)
            && model.neighbor(resizing, edge, true, true, false) != Some(interval)
        {
            return NextToFit::Never;
        }
        let Some(resizing) = clear_way_to_parent(model, resizing, common, cx.axis, edge) else {
            return NextToFit::Never;
        };
        let Some(interval) = child_under(model, interval, common) else {
            return NextToFit::Never;
        };
        let (first, last) = match edge {
            Alignment::Leading => (interval, resizing),
            _ => (resizing, interval),
        };
        let (Some(start), Some(end)) = (model.index_of(common, first), model.index_of(common, last)) else {
            return NextToFit::Never;
        };
        let (start, end) = (start + 1, end.checked_sub(1));
        if let Some(end) = end
            && start <= end
            && !model.content_overlap_space(&self.moving_space, common, Some((start, end)), cx.axis.other())
        {
            NextToFit::Yes
        } else {
            NextToFit::Never
        }
    }

    fn valid_aligned_resizing(&self, cx: &Scan<'_>, interval: IntervalId, edge: Alignment) -> bool {
        let model = cx.model;
        let dst = Region::distance(&self.moving_space, model.space(interval), cx.axis, edge.opposite(), edge);
        let facing = match edge {
            Alignment::Leading => dst != UNKNOWN && dst <= 0,
            _ => dst != UNKNOWN && dst >= 0,
        };
        if !facing {
            return false;
        }
        let Some(resizing) = self.resizing_interval(cx) else {
            return false;
        };
        if model.is_parent_of(interval, resizing) {
            if clear_way_to_parent(model, resizing, interval, cx.axis, edge).is_none() {
                return false;
            }
            if self.too_deep_to_merge(model, resizing, interval, edge) {
                let neighbor = model.neighbor(resizing, edge, true, true, false);
                if neighbor.is_some_and(|n| model.is_parent_of(interval, n)) {
                    return false;
                }
            }
            return true;
        }
        let Some(common) = model.common_parent(interval, resizing) else {
            return false;
        };
        if model.is_parallel(common) {
            return true;
        }
        if self.too_deep_to_merge(model, resizing, common, edge) {
            return false;
        }
        let Some(resizing) = clear_way_to_parent(model, resizing, common, cx.axis, edge) else {
            return false;
        };
        let Some(interval) = child_under(model, interval, common) else {
            return false;
        };
        let (Some(interval_index), Some(resizing_index)) =
            (model.index_of(common, interval), model.index_of(common, resizing))
        else {
            return false;
        };
        let range = if edge == Alignment::Leading {
            resizing_index.checked_sub(1).map(|end| (interval_index, end))
        } else {
            Some((resizing_index + 1, interval_index))
        };
        range.is_some_and(|(start, end)| {
            start <= end
                && !model.content_overlap_space(&self.moving_space, common, Some((start, end)), cx.axis.other())
        })
    }

    /// Whether reaching `parent` from `interval` crosses more unaligned
    /// parallel levels than allowed.
    fn too_deep_to_merge(&self, model: &LayoutModel, interval: IntervalId, parent: IntervalId, edge: Alignment) -> bool {
        let max = self.tuning.max_unaligned_depth;
        let mut level = 0;
        let mut alignment = None;
        let mut prev = interval;
        let mut interval = interval;
        let mut p = model.parent(interval);
        while let Some(current) = p {
            if current == parent {
                break;
            }
            if model.is_parallel(current) {
                match alignment {
                    None => {
                        alignment = model.alignment(interval);
                        if alignment != Some(edge) {
                            level += 1;
                        }
                    }
                    Some(a) => {
                        if !model.is_aligned_at_border_in(prev, current, a) {
                            level += 1;
                            if level > max {
                                return true;
                            }
                        }
                    }
                }
                prev = current;
            }
            interval = current;
            p = model.parent(current);
        }
        level > max
    }

    // --- paddings ---

    /// Default padding sizes between `interval` (or the container border for
    /// `None`) and `moving` at `edge` of `moving`, using the current moving
    /// bounds for the dragged components.
    ///
    /// Returns one size per padding kind, or only for `padding` when given.
    pub fn find_paddings(
        &self,
        model: &LayoutModel,
        mapper: &dyn VisualMapper,
        interval: Option<IntervalId>,
        moving: IntervalId,
        padding: Option<PaddingType>,
        edge: Alignment,
    ) -> Vec<i32> {
        let moving_comps = model.edge_sub_components(Some(moving), edge);
        let fixed_comps = model.edge_sub_components(interval, edge.opposite());
        let (sources, targets) = if edge == Alignment::Leading {
            (fixed_comps, moving_comps)
        } else {
            (moving_comps, fixed_comps)
        };
        let bounds: HashMap<ComponentKey, Region> = self
            .components
            .iter()
            .copied()
            .zip(self.moving_bounds.iter().copied())
            .collect();
        let container = self.target.map(|(c, _)| model.component_id(c));
        sizes_of_default_gap(
            model,
            sources.as_deref(),
            targets.as_deref(),
            padding,
            mapper,
            container,
            &bounds,
        )
    }

    fn find_paddings_in(
        &self,
        cx: &Scan<'_>,
        interval: Option<IntervalId>,
        padding: Option<PaddingType>,
        edge: Alignment,
    ) -> Vec<i32> {
        match self.resizing_interval(cx) {
            Some(moving) => self.find_paddings(cx.model, cx.mapper, interval, moving, padding, edge),
            None => alloc::vec![0],
        }
    }

    // --- feedback ---

    /// Draw guide lines for the current positions.
    pub fn paint_move_feedback(&self, model: &LayoutModel, painter: &mut dyn FeedbackPainter) {
        let overlap = self.tuning.feedback_overlap;
        for axis in Axis::BOTH {
            let i = axis.index();
            if let Some(position) = &self.best_positions[i] {
                let Some((_, roots)) = self.target else {
                    continue;
                };
                let dir = axis.other();
                let align = position.alignment;
                let in_root = model.parent(position.interval).is_none();
                let mut interval = position.interval;
                let mut parent = model.parent(interval);
                while let Some(p) = parent {
                    if !model.is_parallel(p) {
                        break;
                    }
                    let parent_used = if align.is_edge() {
                        !position.next_to
                            && Region::distance(model.space(p), &self.moving_space, axis, align, align) == 0
                    } else {
                        align == model.group_alignment(p)
                    };
                    if !parent_used {
                        break;
                    }
                    interval = p;
                    parent = model.first_parent(p, GroupKind::Parallel);
                }

                let pos_region = model.space(interval);
                let cont_region = model.space(roots[0]);
                if !pos_region.is_set() || !cont_region.is_set() || !self.moving_space.is_set() {
                    continue;
                }
                let cont_y1 = cont_region.pos(dir, Alignment::Leading);
                let cont_y2 = cont_region.pos(dir, Alignment::Trailing);
                let pos_point = if in_root || !position.next_to {
                    align
                } else {
                    align.opposite()
                };
                let pos_x = pos_region.pos(axis, pos_point);
                let pos_y1 = (pos_region.pos(dir, Alignment::Leading) - overlap).max(cont_y1);
                let pos_y2 = (pos_region.pos(dir, Alignment::Trailing) + overlap).min(cont_y2);
                let mut x = self.moving_space.pos(axis, align);
                let y1 = (self.moving_space.pos(dir, Alignment::Leading) - overlap).max(cont_y1);
                let y2 = (self.moving_space.pos(dir, Alignment::Trailing) + overlap).min(cont_y2);

                if position.next_to {
                    let mut pad_index = 0;
                    let mut painted_pad = 0;
                    if position.padding_sizes.len() > 1 {
                        if let Some(j) = position
                            .padding_type
                            .and_then(|t| PaddingType::ALL.iter().position(|&p| p == t))
                        {
                            pad_index = j;
                            if j > 0 {
                                painted_pad = position.padding_sizes.get(j).copied().unwrap_or(0);
                            }
                        }
                    }
                    guide_line(painter, axis, x, y1.min(pos_y1), y2.max(pos_y2));
                    while pad_index > 0 {
                        pad_index -= 1;
                        if PaddingType::ALL[pad_index] == PaddingType::Indent {
                            continue;
                        }
                        let pad = position.padding_sizes.get(pad_index).copied().unwrap_or(0);
                        let dx = painted_pad - pad;
                        x -= if align == Alignment::Leading { dx } else { -dx };
                        guide_line(painter, axis, x, y1.min(pos_y1), y2.max(pos_y2));
                        painted_pad = pad;
                    }
                } else if x == pos_x {
                    guide_line(painter, axis, pos_x, y1.min(pos_y1), y2.max(pos_y2));
                } else {
                    guide_line(painter, axis, pos_x, pos_y1, pos_y2);
                    guide_line(painter, axis, x, y1, y2);
                }
            } else if self.snapped_to_default_size(axis) {
                let Some(align) = self.resizing_edge(axis) else {
                    continue;
                };
                let x1 = self.moving_space.pos(axis, align);
                let x2 = self.moving_space.pos(axis, align.opposite());
                let y = self.moving_space.pos(axis.other(), Alignment::Center);
                let (from, to) = match axis {
                    Axis::Horizontal => ((x1, y), (x2, y)),
                    Axis::Vertical => ((y, x1), (y, x2)),
                };
                painter.draw_line(point(from), point(to));
            }
        }
    }

    /// Names of the current positioning situation, horizontal first, for
    /// status text.
    ///
    /// Always returns at least one code.
    pub fn position_codes(&self, model: &LayoutModel) -> Vec<String> {
        let mut codes = Vec::new();
        for axis in Axis::BOTH {
            let code = if let Some(position) = &self.best_positions[axis.index()] {
                let alignment = position.alignment;
                if position.next_to {
                    let padding = if model.parent(position.interval).is_none() {
                        "Container"
                    } else {
                        match position.padding_type {
                            Some(PaddingType::Unrelated) => "Unrelated",
                            Some(PaddingType::Separate) => "Separate",
                            _ => "Related",
                        }
                    };
                    Some(format!(
                        "nextTo{padding}{}{}",
                        axis_code(axis),
                        alignment_code(alignment)
                    ))
                } else {
                    let x = self.moving_space.pos(axis, alignment);
                    let pos_x = model.space(position.interval).pos(axis, alignment);
                    if x == pos_x {
                        Some(format!("align{}{}", axis_code(axis), alignment_code(alignment)))
                    } else {
                        Some("indent".into())
                    }
                }
            } else if self.snapped_to_default_size(axis) {
                Some(format!("snappedToDefault{}", axis_code(axis)))
            } else {
                None
            };
            codes.extend(code);
        }
        if codes.is_empty() {
            codes.push(if self.is_resizing() {
                "generalResizing".into()
            } else {
                "generalPosition".into()
            });
        }
        codes
    }
}

fn axis_code(axis: Axis) -> &'static str {
    match axis {
        Axis::Horizontal => "Horizontal",
        Axis::Vertical => "Vertical",
    }
}

fn alignment_code(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Leading => "Leading",
        Alignment::Trailing => "Trailing",
        Alignment::Center => "Center",
        Alignment::Baseline => "Baseline",
    }
}

pub(crate) fn point((x, y): (i32, i32)) -> Point {
    Point::new(f64::from(x), f64::from(y))
}

/// A guide line at `x` on `axis`, spanning `y1..y2` on the other axis.
pub(crate) fn guide_line(painter: &mut dyn FeedbackPainter, axis: Axis, x: i32, y1: i32, y2: i32) {
    match axis {
        Axis::Horizontal => painter.draw_line(point((x, y1)), point((x, y2))),
        Axis::Vertical => painter.draw_line(point((y1, x)), point((y2, x))),
    }
}

fn distance_score(direct: i32, ortho: i32, snap: i32) -> i32 {
    direct.saturating_add(ortho / snap.max(1))
}

fn smallest_distance(positions: &[Option<PositionDef>; 4]) -> i32 {
    positions
        .iter()
        .flatten()
        .map(|p| abs_distance(p.distance))
        .min()
        .unwrap_or(-1)
}

fn related_positions(model: &LayoutModel, next_to: &PositionDef, aligned: &PositionDef) -> bool {
    let neighbor = model.neighbor(aligned.interval, next_to.alignment, true, true, false);
    match neighbor {
        Some(n) => n == next_to.interval,
        None => model.parent(next_to.interval).is_none(),
    }
}

fn is_suitable_alignment(model: &LayoutModel, pos: &PositionDef) -> bool {
    debug_assert!(pos.alignment.is_edge());
    let Some(parent) = model.first_parent(pos.interval, GroupKind::Parallel) else {
        return true;
    };
    model.is_aligned_at_border_in(pos.interval, parent, pos.alignment)
        || !model.is_aligned_at_border_in(pos.interval, parent, pos.alignment.opposite())
}

fn can_go_inside_for_next_to(model: &LayoutModel, group: IntervalId, valid: bool) -> bool {
    model.is_sequential(group)
        || (model.is_parallel(group)
            && (!valid
                || !matches!(
                    model.group_alignment(group),
                    Alignment::Center | Alignment::Baseline
                )))
}

/// Depth-first search for the design-time gap absorbing a container's extra space.
pub(crate) fn find_resizing_gap(model: &LayoutModel, group: IntervalId) -> Option<IntervalId> {
    for &li in model.children(group) {
        if model.is_gap(li) && model.has_attribute(li, Attributes::DESIGN_CONTAINER_GAP) {
            return Some(li);
        }
        if model.is_group(li) {
            if let Some(gap) = find_resizing_gap(model, li) {
                return Some(gap);
            }
        }
    }
    None
}

fn is_zero_resizing_gap(model: &LayoutModel, gap: IntervalId) -> bool {
    model.neighbor(gap, Alignment::Leading, false, true, false).is_none()
        || model.neighbor(gap, Alignment::Trailing, false, true, false).is_none()
}

/// The ancestor of `interval` directly under `top`.
fn child_under(model: &LayoutModel, interval: IntervalId, top: IntervalId) -> Option<IntervalId> {
    let mut current = interval;
    loop {
        let parent = model.parent(current)?;
        if parent == top {
            return Some(current);
        }
        current = parent;
    }
}

/// Walk from `interval` up to `top` and return the ancestor directly under
/// `top`, unless some sequence on the way has content overlapping
/// `interval` orthogonally towards `edge`.
fn clear_way_to_parent(
    model: &LayoutModel,
    interval: IntervalId,
    top: IntervalId,
    axis: Axis,
    edge: Alignment,
) -> Option<IntervalId> {
    let space = *model.space(interval);
    let mut interval = interval;
    let mut parent = model.parent(interval)?;
    while parent != top {
        if model.is_sequential(parent) {
            let index = model.index_of(parent, interval)?;
            let range = if edge == Alignment::Leading {
                index.checked_sub(1).map(|end| (0, end))
            } else {
                let last = model.child_count(parent) - 1;
                (index < last).then_some((index + 1, last))
            };
            if let Some(range) = range {
                if model.content_overlap_space(&space, parent, Some(range), axis.other()) {
                    return None;
                }
            }
        }
        interval = parent;
        parent = model.parent(interval)?;
    }
    Some(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{FeedbackShape, Paddings, TableMapper};
    use kurbo::Rect;

    struct Form {
        model: LayoutModel,
        mapper: TableMapper,
        form: ComponentKey,
        roots: [IntervalId; 2],
    }

    fn form() -> Form {
        let mut model = LayoutModel::new();
        let form = model.create_component("form", true);
        model.add_root_component(form);
        model.set_current_interior(form, Rect::new(0.0, 0.0, 400.0, 300.0));
        let roots = model.layout_roots(form)[0];
        let mapper = TableMapper::new(Paddings {
            related: 8,
            unrelated: 16,
            separate: 24,
            indent: 16,
            container: 10,
        });
        Form {
            model,
            mapper,
            form,
            roots,
        }
    }

    fn place(f: &mut Form, id: &str, bounds: Rect) -> ComponentKey {
        let key = f.model.create_component(id, false);
        f.model.add_component(key, f.form, None).unwrap();
        for axis in Axis::BOTH {
            let li = f.model.component_interval(key, axis);
            f.model.add_interval(li, f.roots[axis.index()], None);
        }
        f.model.set_current_bounds(key, bounds, None);
        f.mapper.set_bounds(id, bounds);
        key
    }

    fn adding(f: &mut Form, id: &str, bounds: Rect, cursor: [i32; 2]) -> Dragger {
        let key = f.model.create_component(id, false);
        let mut dragger = Dragger::new(
            &f.model,
            &f.mapper,
            alloc::vec![key],
            alloc::vec![Region::from_rect(bounds, None)],
            cursor,
            [Motion::Move, Motion::Move],
            Tuning::default(),
        );
        dragger.set_target_container(Some((f.form, f.roots)));
        dragger
    }

    #[test]
    fn next_to_snaps_to_related_padding() {
        let mut f = form();
        let a = place(&mut f, "a", Rect::new(0.0, 0.0, 100.0, 20.0));
        let mut dragger = adding(&mut f, "b", Rect::new(100.0, 0.0, 142.0, 20.0), [100, 10]);
        let mark = f.model.change_mark();

        let cursor = dragger.move_to(&f.model, &f.mapper, [110, 10], true, false);

        assert_eq!(cursor, [108, 10]);
        let h = dragger.positions()[0].as_ref().unwrap();
        assert_eq!(h.interval, f.model.component_interval(a, Axis::Horizontal));
        assert_eq!(h.alignment, Alignment::Leading);
        assert_eq!(h.distance, 2);
        assert!(h.next_to && h.snapped);
        assert_eq!(h.padding_type, Some(PaddingType::Related));
        assert_eq!(dragger.moving_space().pos(Axis::Horizontal, Alignment::Leading), 108);
        let v = dragger.positions()[1].as_ref().unwrap();
        assert!(!v.next_to);
        assert_eq!(v.alignment, Alignment::Leading);
        assert_eq!(
            dragger.position_codes(&f.model),
            ["nextToRelatedHorizontalLeading", "alignVerticalLeading"]
        );
        assert_eq!(f.model.change_mark(), mark);
    }

    #[test]
    fn leading_edges_align_across_rows() {
        let mut f = form();
        let a = place(&mut f, "a", Rect::new(0.0, 0.0, 100.0, 20.0));
        let mut dragger = adding(&mut f, "b", Rect::new(0.0, 70.0, 48.0, 90.0), [10, 80]);

        let cursor = dragger.move_to(&f.model, &f.mapper, [12, 80], true, false);

        assert_eq!(cursor, [10, 80]);
        let h = dragger.positions()[0].as_ref().unwrap();
        assert_eq!(h.interval, f.model.component_interval(a, Axis::Horizontal));
        assert_eq!((h.alignment, h.distance, h.next_to), (Alignment::Leading, 2, false));
        assert!(dragger.positions()[1].is_none());
    }

    #[test]
    fn indented_position_below_a_component() {
        let mut f = form();
        place(&mut f, "a", Rect::new(0.0, 0.0, 100.0, 20.0));
        let mut dragger = adding(&mut f, "b", Rect::new(0.0, 28.0, 40.0, 48.0), [0, 30]);

        let cursor = dragger.move_to(&f.model, &f.mapper, [17, 30], true, false);

        assert_eq!(cursor, [16, 30]);
        assert_eq!(
            dragger.position_codes(&f.model),
            ["indent", "nextToRelatedVerticalLeading"]
        );
    }

    #[test]
    fn resizing_snaps_to_preferred_size() {
        let mut f = form();
        let a = place(&mut f, "a", Rect::new(0.0, 0.0, 100.0, 20.0));
        f.mapper.set_preferred_size("a", Size::new(80.0, 20.0));
        let mut dragger = Dragger::new(
            &f.model,
            &f.mapper,
            alloc::vec![a],
            alloc::vec![Region::from_rect(Rect::new(0.0, 0.0, 100.0, 20.0), None)],
            [100, 10],
            [Motion::Resize(Alignment::Trailing), Motion::Fixed],
            Tuning::default(),
        );
        dragger.set_target_container(Some((f.form, f.roots)));
        assert!(dragger.is_resizing());
        assert_eq!(dragger.sizes()[0].unwrap().preferred_size, 80);

        let cursor = dragger.move_to(&f.model, &f.mapper, [84, 10], true, false);

        assert_eq!(cursor, [80, 10]);
        assert!(dragger.positions()[0].is_none());
        assert!(dragger.snapped_to_default_size(Axis::Horizontal));
        assert_eq!(dragger.moving_bounds()[0].size(Axis::Horizontal), 80);
        assert_eq!(dragger.position_codes(&f.model), ["snappedToDefaultHorizontal"]);

        let mut shapes: Vec<FeedbackShape> = Vec::new();
        dragger.paint_move_feedback(&f.model, &mut shapes);
        assert_eq!(
            shapes,
            [FeedbackShape::Line(Point::new(80.0, 10.0), Point::new(0.0, 10.0))]
        );
    }

    #[test]
    fn without_auto_positioning_nothing_snaps() {
        let mut f = form();
        place(&mut f, "a", Rect::new(0.0, 0.0, 100.0, 20.0));
        let mut dragger = adding(&mut f, "b", Rect::new(100.0, 0.0, 142.0, 20.0), [100, 10]);

        let cursor = dragger.move_to(&f.model, &f.mapper, [110, 10], false, false);

        assert_eq!(cursor, [110, 10]);
        assert_eq!(dragger.positions(), &[None, None]);
        assert_eq!(dragger.position_codes(&f.model), ["generalPosition"]);
    }

    #[test]
    fn resizing_gap_size_follows_the_container() {
        let def = SizeDef {
            original_size: 200,
            preferred_size: 150,
            zero_preferred_size: Some(140),
            resizing_gap: Some(IntervalId::new(0, 0)),
            original_gap_size: 60,
            preferred_gap_size: 10,
        };
        assert_eq!(def.resizing_gap_size(140), Some(0));
        assert_eq!(def.resizing_gap_size(150), Some(NOT_EXPLICITLY_DEFINED));
        assert_eq!(def.resizing_gap_size(220), Some(80));
        assert_eq!(def.resizing_gap_size(100), Some(NOT_EXPLICITLY_DEFINED));
    }
}
