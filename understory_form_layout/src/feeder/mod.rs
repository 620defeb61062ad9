// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Insertion engine: commits a dragged formation into the interval tree.
//!
//! A [`Feeder`] is created from a finished [`Dragger`] gesture. For a
//! resize it first records where the resized component currently sits, so
//! the position can be preserved on the axes the gesture did not snap.
//! [`Feeder::add`] then processes both axes, starting with the one that
//! resolves overlaps:
//!
//! 1. analysis collects candidate *inclusions* (a group, an index in it and
//!    the neighbor the interval would share a sequence with),
//! 2. competing candidates are merged into one, restructuring the tree
//!    where two candidates must both hold,
//! 3. the interval is inserted with surrounding gaps, aligned in parallel
//!    with its snap target, and the tree around it is adjusted so the
//!    rest of the layout keeps its visual positions.
//!
//! Inclusions are kept in an arena owned by the insertion pass and are
//! referred to by index; the original positions of a resized component are
//! updated in place as the tree around them is restructured.

mod accommodate;
mod analyze;
mod insert;

use alloc::vec::Vec;

use crate::dragger::{Dragger, PositionDef};
use crate::mapper::VisualMapper;
use crate::model::{GroupKind, IntervalId, LayoutModel};
use crate::ops::Operations;
use crate::region::Region;
use crate::types::{
    Alignment, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
};

/// Handle of an [`Inclusion`] in the arena of one insertion pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct IncId(usize);

/// A place where the adding interval could be included on one axis.
#[derive(Clone, Debug)]
struct Inclusion {
    /// Group receiving the interval.
    parent: IntervalId,
    /// Index in `parent` when it is a sequence, or the side of `neighbor`
    /// (0 before, 1 after).
    index: usize,
    /// Whether a parallel sub-group must be cut out of the sequence `parent`.
    new_sub_group: bool,
    /// Interval of the parallel `parent` the adding interval forms a
    /// sequence with.
    neighbor: Option<IntervalId>,
    snapped_parallel: Option<IntervalId>,
    snapped_next_to: Option<IntervalId>,
    padding_type: Option<PaddingType>,
    alignment: Option<Alignment>,
    /// Whether the distance to the neighbor at `alignment` must not change.
    fixed_position: bool,
    distance: i32,
    ort_distance: i32,
}

impl Inclusion {
    fn new(parent: IntervalId) -> Self {
        Self {
            parent,
            index: 0,
            new_sub_group: false,
            neighbor: None,
            snapped_parallel: None,
            snapped_next_to: None,
            padding_type: None,
            alignment: None,
            fixed_position: false,
            distance: i32::MAX,
            ort_distance: i32::MAX,
        }
    }

    fn snapped(&self) -> bool {
        self.snapped_next_to.is_some() || self.snapped_parallel.is_some()
    }
}

/// Layout hints produced while inserting.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// The formation overlapped existing content, so the container should
    /// take its new size from the layout.
    pub impose_size: bool,
    /// Groups were aligned across levels and a structure optimization pass
    /// is worthwhile.
    pub optimize_structure: bool,
}

/// Commits the findings of a [`Dragger`] into the model.
#[derive(Clone, Debug)]
pub struct Feeder {
    adding: [IntervalId; 2],
    inclusions: Vec<Inclusion>,
    original1: [Option<IncId>; 2],
    original2: [Option<IncId>; 2],
    original_fixed: [[bool; 2]; 2],
    new_positions: [Option<PositionDef>; 2],
    become_resizing: [bool; 2],
}

impl Feeder {
    /// Prepare the insertion of `adding` (one interval per axis).
    ///
    /// For a resize, `adding` must still be in the tree: its current
    /// position is recorded here and it is expected to be removed before
    /// [`add`](Self::add).
    pub fn new(model: &LayoutModel, dragger: &Dragger, adding: [IntervalId; 2]) -> Self {
        let mut feeder = Self {
            adding,
            inclusions: Vec::new(),
            original1: [None; 2],
            original2: [None; 2],
            original_fixed: [[false; 2]; 2],
            new_positions: [None, None],
            become_resizing: [false; 2],
        };
        for axis in Axis::BOTH {
            let i = axis.index();
            let new_pos = dragger.positions()[i].clone();
            if !dragger.is_resizing() {
                feeder.new_positions[i] = new_pos;
                continue;
            }
            let interval = adding[i];
            if let Some(edge) = dragger.resizing_edge(axis) {
                let mut pos =
                    find_out_current_position(model, interval, axis, Some(edge.opposite()));
                if !new_pos.as_ref().is_some_and(|p| p.snapped) && !pos.snapped() {
                    pos.alignment = model.effective_alignment(interval);
                }
                feeder.original1[i] = Some(feeder.push(pos));
                feeder.become_resizing[i] =
                    check_resizing(model, dragger, interval, axis, new_pos.as_ref());
                feeder.new_positions[i] = new_pos;
            } else {
                let pos1 = find_out_current_position(model, interval, axis, None);
                let alignment = pos1.alignment;
                feeder.original1[i] = Some(feeder.push(pos1));
                if let Some(edge) = alignment.filter(|a| a.is_edge()) {
                    let pos2 =
                        find_out_current_position(model, interval, axis, Some(edge.opposite()));
                    if pos2.snapped() {
                        feeder.original2[i] = Some(feeder.push(pos2));
                    }
                }
            }
            feeder.original_fixed[i] = [
                is_fixed_relative_position(model, interval, Alignment::Leading),
                is_fixed_relative_position(model, interval, Alignment::Trailing),
            ];
        }
        feeder
    }

    fn push(&mut self, inclusion: Inclusion) -> IncId {
        self.inclusions.push(inclusion);
        IncId(self.inclusions.len() - 1)
    }

    /// Insert the adding intervals on both axes.
    pub fn add(
        self,
        model: &mut LayoutModel,
        mapper: &dyn VisualMapper,
        dragger: &Dragger,
    ) -> InsertOutcome {
        let mut pass = Insertion {
            ops: Operations::new(model, mapper),
            dragger,
            incs: self.inclusions,
            adding: self.adding,
            original1: self.original1,
            original2: self.original2,
            original_fixed: self.original_fixed,
            new_positions: self.new_positions,
            become_resizing: self.become_resizing,
            axis: Axis::Horizontal,
            adding_interval: self.adding[0],
            adding_space: *dragger.moving_space(),
            solve_overlap: false,
            original_l_fixed: false,
            original_t_fixed: false,
            a_edge: None,
            a_snapped_parallel: None,
            a_snapped_next_to: None,
            a_padding_type: None,
            outcome: InsertOutcome::default(),
        };
        pass.run();
        pass.outcome
    }
}

/// State of one [`Feeder::add`] call.
struct Insertion<'a> {
    ops: Operations<'a>,
    dragger: &'a Dragger,
    incs: Vec<Inclusion>,
    adding: [IntervalId; 2],
    original1: [Option<IncId>; 2],
    original2: [Option<IncId>; 2],
    original_fixed: [[bool; 2]; 2],
    new_positions: [Option<PositionDef>; 2],
    become_resizing: [bool; 2],

    axis: Axis,
    adding_interval: IntervalId,
    adding_space: Region,
    solve_overlap: bool,
    original_l_fixed: bool,
    original_t_fixed: bool,

    // Snap parameters of the inclusion currently being analyzed.
    a_edge: Option<Alignment>,
    a_snapped_parallel: Option<IntervalId>,
    a_snapped_next_to: Option<IntervalId>,
    a_padding_type: Option<PaddingType>,

    outcome: InsertOutcome,
}

impl Insertion<'_> {
    fn model(&self) -> &LayoutModel {
        self.ops.model()
    }

    fn model_mut(&mut self) -> &mut LayoutModel {
        self.ops.model_mut()
    }

    fn inc(&self, id: IncId) -> &Inclusion {
        &self.incs[id.0]
    }

    fn inc_mut(&mut self, id: IncId) -> &mut Inclusion {
        &mut self.incs[id.0]
    }

    fn alloc(&mut self, inclusion: Inclusion) -> IncId {
        self.incs.push(inclusion);
        IncId(self.incs.len() - 1)
    }

    fn originals(&self) -> impl Iterator<Item = IncId> + use<> {
        let i = self.axis.index();
        [self.original1[i], self.original2[i]].into_iter().flatten()
    }

    fn use_inclusion(&mut self, id: IncId) {
        let inc = &self.incs[id.0];
        self.a_edge = inc.alignment;
        self.a_snapped_parallel = inc.snapped_parallel;
        self.a_snapped_next_to = inc.snapped_next_to;
        self.a_padding_type = inc.padding_type;
    }

    fn use_position(&mut self, pos: &PositionDef) {
        self.a_edge = Some(pos.alignment);
        self.a_snapped_parallel = (!pos.next_to).then_some(pos.interval);
        self.a_snapped_next_to = (pos.snapped && pos.next_to).then_some(pos.interval);
        self.a_padding_type = pos.padding_type;
    }

    fn run(&mut self) {
        let overlap_axis = self.axis_solving_overlap();
        for axis in [overlap_axis, overlap_axis.other()] {
            self.add_on_axis(axis, overlap_axis == axis);
        }
    }

    fn add_on_axis(&mut self, axis: Axis, solve_overlap: bool) {
        let i = axis.index();
        self.axis = axis;
        self.adding_interval = self.adding[i];
        self.adding_space = *self.dragger.moving_space();
        let (adding, space) = (self.adding_interval, self.adding_space);
        *self.model_mut().space_mut(adding) = space;
        self.solve_overlap = solve_overlap;

        let original1 = self.original1[i];
        let original2 = self.original2[i];
        for original in [original1, original2].into_iter().flatten() {
            self.correct_neighbor_in_sequence(original);
        }
        if self.dragger.is_resizing() {
            [self.original_l_fixed, self.original_t_fixed] = self.original_fixed[i];
            if self.dragger.is_resizing_axis(axis) {
                let (min, max) = if self.become_resizing[i] {
                    (NOT_EXPLICITLY_DEFINED, INFINITE_SIZE)
                } else {
                    (USE_PREFERRED_SIZE, USE_PREFERRED_SIZE)
                };
                self.model_mut()
                    .set_interval_size(adding, min, space.size(axis), max);
            }
        }

        let new_pos = self.new_positions[i].clone();
        if let Some(pos) = &new_pos
            && matches!(pos.alignment, Alignment::Center | Alignment::Baseline)
        {
            self.a_edge = Some(pos.alignment);
            self.a_snapped_parallel = Some(pos.interval);
            self.add_simply_aligned();
            return;
        }
        if self.dragger.is_resizing()
            && let Some(original) = original1
            && matches!(
                self.inc(original).alignment,
                Some(Alignment::Center | Alignment::Baseline)
            )
        {
            self.a_edge = self.inc(original).alignment;
            self.a_snapped_parallel = self.inc(original).snapped_parallel;
            self.add_simply_aligned();
            return;
        }

        let mut preserve_original = false;
        if self.dragger.is_resizing_axis(axis.other())
            && let Some(original) = original1
        {
            self.use_inclusion(original);
        } else if let Some(pos) = &new_pos {
            self.use_position(pos);
            preserve_original = self.dragger.is_resizing_axis(axis);
        } else if self.dragger.is_resizing_axis(axis)
            && let Some(original) = original1
        {
            self.use_inclusion(original);
            preserve_original = true;
        } else {
            self.a_edge = None;
            self.a_snapped_parallel = None;
            self.a_snapped_next_to = None;
            self.a_padding_type = None;
        }

        let Some(roots) = self.dragger.target_roots() else {
            debug_assert!(false, "inserting without a target container");
            return;
        };
        let root = roots[i];
        let found = self.find_inclusion(root, original1, original1, preserve_original);

        let mut inclusion2 = None;
        let inclusion1 = if preserve_original && let Some(original) = original1 {
            if found != original {
                if new_pos.is_some() {
                    inclusion2 = Some(found);
                }
                let orig_parent = self.inc(original).parent;
                let found_inc = self.inc(found);
                if (found_inc.parent == orig_parent && found_inc.new_sub_group)
                    || (self.model().is_sequential(orig_parent)
                        && self.model().parent(orig_parent) == Some(found_inc.parent))
                {
                    self.inc_mut(original).new_sub_group = true;
                }
            }
            original
        } else {
            if self.dragger.is_resizing_axis(axis.other())
                && (new_pos.is_some() || original2.is_some())
            {
                if let Some(pos) = &new_pos {
                    debug_assert!(self.dragger.is_resizing_axis(axis));
                    self.use_position(pos);
                } else if let Some(original) = original2 {
                    self.use_inclusion(original);
                }
                inclusion2 =
                    Some(self.find_inclusion(root, original2, original2.or(original1), false));
            }
            found
        };

        tracing::trace!(
            ?axis,
            parent = ?self.inc(inclusion1).parent,
            index = self.inc(inclusion1).index,
            alignment = ?self.inc(inclusion1).alignment,
            second = ?inclusion2.map(|id| self.inc(id).parent),
            "inclusion chosen"
        );
        if !self.merge_sequential_inclusions(inclusion1, inclusion2) {
            inclusion2 = None;
        }
        self.add_interval(inclusion1, inclusion2);
    }

    /// Analyze `root` for the current snap parameters and reduce the
    /// candidates to one.
    ///
    /// `original` is reused when nothing is found and it matches the snap
    /// edge; `fallback` is preferred when merging competing candidates.
    fn find_inclusion(
        &mut self,
        root: IntervalId,
        original: Option<IncId>,
        fallback: Option<IncId>,
        preserve_original: bool,
    ) -> IncId {
        let mut inclusions = Vec::new();
        self.analyze_parallel(root, &mut inclusions);
        if inclusions.is_empty() {
            if let Some(o) = original
                && self.inc(o).alignment == self.a_edge
            {
                inclusions.push(o);
            } else {
                self.add_aligning_inclusion(&mut inclusions);
            }
        } else {
            let mut preferred = self.add_aligning_inclusion(&mut inclusions);
            if inclusions.len() > 1 {
                if preferred.is_none()
                    || (preserve_original
                        && fallback.is_some_and(|o| self.inc(o).alignment == self.a_edge))
                {
                    preferred = fallback;
                }
                self.merge_parallel_inclusions(&mut inclusions, preferred, preserve_original);
                debug_assert_eq!(inclusions.len(), 1);
            }
        }
        match inclusions.first() {
            Some(&id) => id,
            None => {
                let mut inc = Inclusion::new(root);
                inc.alignment = self.a_edge;
                inc.snapped_parallel = self.a_snapped_parallel;
                self.alloc(inc)
            }
        }
    }

    /// The axis processed first. It is the one on which overlaps are
    /// resolved by placing the formation in sequence.
    fn axis_solving_overlap(&self) -> Axis {
        use Axis::{Horizontal, Vertical};
        let dragger = self.dragger;
        if dragger.is_resizing_axis(Horizontal) && !dragger.is_resizing_axis(Vertical) {
            return Horizontal;
        }
        let model = self.model();
        let [h, v] = &self.new_positions;
        let snapped = |p: &Option<PositionDef>| p.as_ref().is_some_and(|p| p.snapped);
        if (dragger.is_resizing_axis(Vertical) && !dragger.is_resizing_axis(Horizontal))
            || (snapped(h) && !snapped(v))
            || v.as_ref().is_some_and(|v| {
                !v.next_to
                    && v.snapped
                    && model.parent(v.interval).is_none()
                    && !exists_component_placed_at_border(model, v.interval, Vertical, v.alignment)
            })
        {
            return Vertical;
        }
        let space = dragger.moving_space();
        if let Some(v) = v
            && v.next_to
            && v.snapped
            && model.parent(v.interval).is_none()
            && v.alignment.is_edge()
            && let Some(roots) = dragger.target_roots()
        {
            let sides = overlapping_gap_sides(model, roots[0], space);
            if sides[1][v.alignment.opposite().index()] != 0 && sides[1][v.alignment.index()] == 0
            {
                return Vertical;
            }
        }
        if !snapped(h)
            && !snapped(v)
            && let Some(roots) = dragger.target_roots()
        {
            let sides = overlapping_gap_sides(model, roots[0], space);
            let spanned = |s: [i8; 2]| s == [1, 1];
            if spanned(sides[1]) && !spanned(sides[0]) {
                return Vertical;
            }
        }
        Horizontal
    }

    /// A neighbor recorded for a parallel parent that has since been wrapped
    /// in a sequence becomes the sequence itself.
    fn correct_neighbor_in_sequence(&mut self, id: IncId) {
        let Some(neighbor) = self.inc(id).neighbor else {
            return;
        };
        if let Some(seq) = self.model().parent(neighbor)
            && self.model().is_sequential(seq)
        {
            debug_assert_eq!(self.model().parent(seq), Some(self.inc(id).parent));
            let inc = self.inc_mut(id);
            inc.parent = seq;
            inc.neighbor = None;
        }
    }
}

/// Describe where `interval` currently sits so the same position can be
/// rebuilt after it is reinserted.
fn find_out_current_position(
    model: &LayoutModel,
    interval: IntervalId,
    axis: Axis,
    alignment: Option<Alignment>,
) -> Inclusion {
    let mut alignment = alignment;
    let Some(mut parent) = model.parent(interval) else {
        let mut inc = Inclusion::new(interval);
        inc.alignment = alignment;
        return inc;
    };
    let mut non_empty = model.count(parent, None, true);
    let mut inc = Inclusion::new(parent);
    if model.is_sequential(parent) && non_empty > 1 {
        if alignment.is_none() {
            alignment = Some(Alignment::Leading);
        }
        if non_empty == 2 {
            inc.parent = model.parent(parent).unwrap_or(parent);
            let mut index = 0;
            for (i, &li) in model.children(parent).iter().enumerate().rev() {
                if li == interval {
                    index = i;
                } else if !model.is_gap(li) {
                    inc.neighbor = Some(li);
                    inc.index = index;
                    break;
                }
            }
        } else {
            inc.parent = parent;
            inc.index = model.index_of(parent, interval).unwrap_or(0);
        }
    } else {
        if model.is_sequential(parent) {
            parent = model.parent(parent).unwrap_or(parent);
            non_empty = model.count(parent, None, true);
            if alignment.is_none() {
                alignment = Some(Alignment::Leading);
            }
        } else {
            let current = model.alignment(interval);
            if alignment.is_none() || !current.is_some_and(Alignment::is_edge) {
                alignment = current;
            }
        }
        if non_empty <= 2
            && let Some(outer) = model.parent(parent)
        {
            let sub_group = parent;
            parent = outer;
            if model.is_sequential(parent) {
                let space = *model.space(interval);
                let ort_overlap = model.children(parent).iter().any(|&li| {
                    !model.is_gap(li)
                        && !model.is_parent_of(li, interval)
                        && Region::overlap(&space, model.space(li), axis.other(), 0)
                });
                if ort_overlap {
                    inc.new_sub_group = true;
                    inc.index = model.index_of(parent, sub_group).unwrap_or(0);
                } else {
                    parent = model.parent(parent).unwrap_or(parent);
                }
            }
        }
        inc.parent = parent;
    }

    let edge = alignment.filter(|a| a.is_edge());
    if let Some(edge) = edge {
        inc.fixed_position = is_fixed_relative_position(model, interval, edge);
    }
    inc.snapped_parallel = find_aligned_interval(model, interval, axis, alignment);
    if inc.snapped_parallel.is_none()
        && let Some(edge) = edge
        && let Some(gap) = model.neighbor(interval, edge, false, true, false)
        && model.is_fixed_default_padding(gap)
    {
        let prev = model.direct_neighbor(gap, edge.opposite(), true);
        let gap_parent = model.parent(gap);
        if prev.is_some_and(|p| p == interval || model.is_placed_at_border_in(interval, p, axis, edge))
            && let Some(gap_parent) = gap_parent
        {
            match model.neighbor(gap, edge, true, true, false) {
                Some(next) => {
                    if model.parent(next) == Some(gap_parent)
                        || model.space(next).pos(axis, edge.opposite())
                            == model.space(gap_parent).pos(axis, edge)
                    {
                        inc.snapped_next_to = Some(next);
                        inc.padding_type = model.padding_type(gap);
                    }
                }
                None => {
                    let root = model.root_of(interval);
                    if model.is_placed_at_border_in(gap_parent, root, axis, edge) {
                        inc.snapped_next_to = Some(root);
                    }
                }
            }
        }
    }
    inc.alignment = alignment;
    inc
}

/// Whether the distance of `interval` to whatever precedes it at `edge`
/// stays fixed when the layout is resized.
fn is_fixed_relative_position(model: &LayoutModel, interval: IntervalId, edge: Alignment) -> bool {
    debug_assert!(edge.is_edge());
    let mut interval = interval;
    loop {
        let Some(mut parent) = model.parent(interval) else {
            return true;
        };
        if model.is_sequential(parent) {
            if let Some(li) = model.direct_neighbor(interval, edge, false) {
                return !model.want_resize(li);
            }
            interval = parent;
            match model.parent(interval) {
                Some(p) => parent = p,
                None => return true,
            }
        }
        if !model.is_aligned_at_border_in(interval, parent, edge)
            && model.content_want_resize(parent)
        {
            return false;
        }
        interval = parent;
    }
}

/// The interval `interval` is aligned with at `alignment`, if any.
fn find_aligned_interval(
    model: &LayoutModel,
    interval: IntervalId,
    axis: Axis,
    alignment: Option<Alignment>,
) -> Option<IntervalId> {
    let edge = alignment.filter(|a| a.is_edge());
    let parent = model.parent(interval)?;
    let mut indent = false;
    if let Some(edge) = edge
        && model.is_sequential(parent)
        && model.count(parent, None, true) == 1
        && let Some(neighbor) = model.direct_neighbor(interval, edge, false)
        && model.is_gap(neighbor)
        && !model.can_resize(neighbor)
        && model
            .parent(parent)
            .is_some_and(|p| model.count(p, None, true) == 2)
    {
        indent = true;
    }

    let mut interval = interval;
    loop {
        let parent = model.first_parent(interval, GroupKind::Parallel)?;
        if !indent {
            let aligned = match edge {
                Some(edge) => model.is_aligned_at_border_in(interval, parent, edge),
                None => {
                    model.parent(interval) == Some(parent)
                        && alignment.is_some()
                        && model.alignment(interval) == alignment
                }
            };
            if !aligned {
                return None;
            }
            if model.parent(parent).is_none() {
                return Some(parent);
            }
        }
        let mut aligned_interval = None;
        for &sub in model.children(parent) {
            if model.is_gap(sub) || sub == interval || model.is_parent_of(sub, interval) {
                continue;
            }
            if let Some(edge) = edge {
                let Some(li) = model.outermost_component(sub, axis, edge) else {
                    continue;
                };
                if model.is_aligned_at_border_in(li, parent, edge)
                    || model.is_placed_at_border_in(li, parent, axis, edge)
                {
                    aligned_interval = Some(li);
                } else {
                    continue;
                }
            } else {
                aligned_interval = Some(sub);
            }
            break;
        }
        if indent {
            return aligned_interval;
        }
        if let Some(found) = aligned_interval {
            return Some(if model.child_count(parent) > 2 {
                parent
            } else {
                found
            });
        }
        interval = parent;
    }
}

/// Whether resizing `interval` on `axis` should make it resizable: the
/// resized edge snapped to a position whose alignment differs from the
/// fixed edge's.
fn check_resizing(
    model: &LayoutModel,
    dragger: &Dragger,
    interval: IntervalId,
    axis: Axis,
    new_pos: Option<&PositionDef>,
) -> bool {
    let Some(resizing_edge) = dragger.resizing_edge(axis) else {
        return false;
    };
    let fixed_edge = resizing_edge.opposite();
    let Some(pos) = new_pos.filter(|p| p.snapped) else {
        return false;
    };
    let (align1, align2) = if model.is_parent_of(pos.interval, interval) {
        let parent = model
            .first_parent(interval, GroupKind::Parallel)
            .filter(|&p| {
                Region::point_inside(dragger.moving_space(), resizing_edge, model.space(p), axis)
            })
            .unwrap_or(pos.interval);
        (
            model.effective_alignment_in_parent(interval, parent, fixed_edge),
            Some(resizing_edge),
        )
    } else {
        let Some(parent) = model.common_parent(interval, pos.interval) else {
            return false;
        };
        let align2 = if pos.next_to {
            model.effective_alignment_in_parent(pos.interval, parent, pos.alignment.opposite())
        } else {
            Some(resizing_edge)
        };
        (
            model.effective_alignment_in_parent(interval, parent, fixed_edge),
            align2,
        )
    };
    align1 != align2
        && align1.is_some_and(Alignment::is_edge)
        && align2.is_some_and(Alignment::is_edge)
}

/// Whether some component directly under `group` touches its `edge`.
fn exists_component_placed_at_border(
    model: &LayoutModel,
    group: IntervalId,
    axis: Axis,
    edge: Alignment,
) -> bool {
    model.children(group).iter().any(|&sub| {
        model.is_placed_at_border(sub, axis, edge)
            && (model.is_component(sub)
                || (model.is_group(sub) && exists_component_placed_at_border(model, sub, axis, edge)))
    })
}

/// Per axis and edge: whether components under `root` overlapping `region`
/// stick out of it only there (1), on both sides (-1 then 1), or not at all.
fn overlapping_gap_sides(model: &LayoutModel, root: IntervalId, region: &Region) -> [[i8; 2]; 2] {
    let mut sides = [[0_i8; 2]; 2];
    for comp in model.component_intervals(root) {
        let space = model.space(comp);
        if !Region::overlap_both(space, region) {
            continue;
        }
        for axis in Axis::BOTH {
            let edges = overlapping_sides(space, region, axis);
            let slot = &mut sides[axis.index()];
            for (j, &e) in edges.iter().enumerate() {
                if e == 1 {
                    slot[j] = 1;
                } else if e == -1 {
                    slot[j] = if slot[j] == 0 { -1 } else { 1 };
                }
            }
        }
    }
    sides
}

/// Which edges of `region` are crossed by `comp` on `axis`: 1 for one edge,
/// -1 on both when `comp` sits inside.
fn overlapping_sides(comp: &Region, region: &Region, axis: Axis) -> [i8; 2] {
    let cl = comp.pos(axis, Alignment::Leading);
    let ct = comp.pos(axis, Alignment::Trailing);
    let rl = region.pos(axis, Alignment::Leading);
    let rt = region.pos(axis, Alignment::Trailing);
    let mut sides = [0_i8; 2];
    if rl < ct && ct < rt {
        sides[0] = 1;
    }
    if rl < cl && cl < rt {
        sides[1] = 1;
    }
    if sides == [1, 1] {
        sides = [-1, -1];
    }
    sides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::mapper::{Paddings, TableMapper};
    use crate::model::ComponentKey;
    use crate::types::Motion;
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

    /// Drag a new component `id` from `bounds` to `cursor`, then feed it in.
    fn drop_new(f: &mut Form, id: &str, bounds: Rect, start: [i32; 2], cursor: [i32; 2]) -> ComponentKey {
        let key = f.model.create_component(id, false);
        let mut dragger = Dragger::new(
            &f.model,
            &f.mapper,
            alloc::vec![key],
            alloc::vec![Region::from_rect(bounds, None)],
            start,
            [Motion::Move, Motion::Move],
            Tuning::default(),
        );
        dragger.set_target_container(Some((f.form, f.roots)));
        if cursor != start {
            dragger.move_to(&f.model, &f.mapper, cursor, true, false);
        }
        let adding = [
            f.model.component_interval(key, Axis::Horizontal),
            f.model.component_interval(key, Axis::Vertical),
        ];
        let feeder = Feeder::new(&f.model, &dragger, adding);
        f.model.add_component(key, f.form, None).unwrap();
        feeder.add(&mut f.model, &f.mapper, &dragger);
        key
    }

    #[test]
    fn lone_component_keeps_its_offsets() {
        let mut f = form();
        let a = drop_new(&mut f, "a", Rect::new(150.0, 120.0, 250.0, 140.0), [200, 130], [200, 130]);

        let ah = f.model.component_interval(a, Axis::Horizontal);
        let seq = f.model.parent(ah).unwrap();
        assert!(f.model.is_sequential(seq));
        assert_eq!(f.model.parent(seq), Some(f.roots[0]));
        let leading = f.model.direct_neighbor(ah, Alignment::Leading, false).unwrap();
        assert!(f.model.is_gap(leading));
        assert_eq!(f.model.pref_size(leading), 150);
        assert!(!f.model.can_resize(leading));
        let trailing = f.model.direct_neighbor(ah, Alignment::Trailing, false).unwrap();
        assert!(f.model.is_gap(trailing) && f.model.can_resize(trailing));
        f.model.check_integrity().unwrap();
    }

    #[test]
    fn snapped_next_to_joins_the_neighbor_sequence() {
        let mut f = form();
        let a = place(&mut f, "a", Rect::new(0.0, 0.0, 100.0, 20.0));
        let b = drop_new(&mut f, "b", Rect::new(100.0, 0.0, 142.0, 20.0), [100, 10], [110, 10]);

        let ah = f.model.component_interval(a, Axis::Horizontal);
        let bh = f.model.component_interval(b, Axis::Horizontal);
        let seq = f.model.parent(bh).unwrap();
        assert!(f.model.is_sequential(seq));
        assert_eq!(f.model.parent(ah), Some(seq));
        let gap = f.model.direct_neighbor(bh, Alignment::Leading, false).unwrap();
        assert!(f.model.is_fixed_default_padding(gap));
        assert_eq!(
            f.model.direct_neighbor(bh, Alignment::Leading, true),
            Some(ah)
        );

        let av = f.model.component_interval(a, Axis::Vertical);
        let bv = f.model.component_interval(b, Axis::Vertical);
        let common = f.model.common_parent(av, bv).unwrap();
        assert!(f.model.is_parallel(common));
        f.model.check_integrity().unwrap();
    }

    #[test]
    fn current_position_of_a_sequence_member() {
        let mut f = form();
        let a = place(&mut f, "a", Rect::new(0.0, 0.0, 100.0, 20.0));
        let ah = f.model.component_interval(a, Axis::Horizontal);
        let model = &mut f.model;
        let seq = model.new_sequential();
        model.remove_interval(ah);
        let gap = model.new_gap(NOT_EXPLICITLY_DEFINED, 30, USE_PREFERRED_SIZE);
        model.add_interval(gap, seq, None);
        model.add_interval(ah, seq, None);
        model.add_interval(seq, f.roots[0], None);

        let pos = find_out_current_position(model, ah, Axis::Horizontal, Some(Alignment::Leading));

        assert_eq!(pos.parent, f.roots[0]);
        assert!(pos.neighbor.is_none());
        assert_eq!(pos.alignment, Some(Alignment::Leading));
        assert!(pos.fixed_position);
    }

    #[test]
    fn overlapping_sides_tell_inside_from_crossing() {
        let comp = Region::from_rect(Rect::new(10.0, 10.0, 50.0, 50.0), None);
        let wide = Region::from_rect(Rect::new(0.0, 20.0, 100.0, 30.0), None);
        assert_eq!(overlapping_sides(&comp, &wide, Axis::Horizontal), [-1, -1]);
        let right = Region::from_rect(Rect::new(30.0, 20.0, 100.0, 30.0), None);
        assert_eq!(overlapping_sides(&comp, &right, Axis::Horizontal), [1, 0]);
    }
}
