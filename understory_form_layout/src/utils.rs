// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometric helpers shared by the finder, the insertion engine, and the designer.

use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::mapper::VisualMapper;
use crate::model::{ComponentKey, GroupKind, IntervalId, IntervalKind, LayoutModel};
use crate::region::{Region, UNKNOWN};
use crate::types::{Alignment, Axis, PaddingType};

/// Depth-first iterator over the component leaves below an interval.
///
/// Walks an explicit stack, so deep trees do not grow the call stack.
#[derive(Debug)]
pub struct ComponentIntervals<'a> {
    model: &'a LayoutModel,
    single: Option<IntervalId>,
    stack: Vec<(IntervalId, usize, usize)>,
}

impl Iterator for ComponentIntervals<'_> {
    type Item = IntervalId;

    fn next(&mut self) -> Option<IntervalId> {
        if let Some(single) = self.single.take() {
            return Some(single);
        }
        while let Some(top) = self.stack.last_mut() {
            let (group, index, end) = *top;
            if index >= end {
                self.stack.pop();
                continue;
            }
            top.1 += 1;
            let sub = self.model.child(group, index);
            match self.model.kind(sub) {
                IntervalKind::Component(_) => return Some(sub),
                IntervalKind::Gap { .. } => {}
                _ => self.stack.push((sub, 0, self.model.child_count(sub))),
            }
        }
        None
    }
}

impl LayoutModel {
    /// Component leaves below `id` (or `id` itself if it is one).
    pub fn component_intervals(&self, id: IntervalId) -> ComponentIntervals<'_> {
        self.component_intervals_in(id, 0, self.child_count(id))
    }

    /// Component leaves below the children `start..end` of `id`.
    pub fn component_intervals_in(&self, id: IntervalId, start: usize, end: usize) -> ComponentIntervals<'_> {
        if self.is_group(id) {
            ComponentIntervals {
                model: self,
                single: None,
                stack: alloc::vec![(id, start, end.min(self.child_count(id)))],
            }
        } else {
            ComponentIntervals {
                model: self,
                single: self.is_component(id).then_some(id),
                stack: Vec::new(),
            }
        }
    }

    /// Gap next to a component at `edge`, if it really separates it from what follows.
    pub fn adjacent_empty_space(&self, comp: ComponentKey, axis: Axis, edge: Alignment) -> Option<IntervalId> {
        let interval = self.component_interval(comp, axis);
        let gap = self.neighbor(interval, edge, false, true, false)?;
        if !self.is_gap(gap) {
            return None;
        }
        let gap_neighbor = self.direct_neighbor(gap, edge.opposite(), true);
        match gap_neighbor {
            Some(n) if n == interval || self.is_placed_at_border_in(interval, n, axis, edge) => Some(gap),
            _ => None,
        }
    }

    /// Whether some component follows `comp` at `edge` in an enclosing sequence.
    pub fn has_adjacent_component(&self, comp: ComponentKey, axis: Axis, edge: Alignment) -> bool {
        self.neighbor(self.component_interval(comp, axis), edge, true, true, false)
            .is_some()
    }

    /// The component leaf that defines the `edge` of `id`.
    pub fn outermost_component(&self, id: IntervalId, axis: Axis, edge: Alignment) -> Option<IntervalId> {
        match self.kind(id) {
            IntervalKind::Component(_) => Some(id),
            IntervalKind::Gap { .. } => None,
            IntervalKind::Sequential { .. } => self
                .children_from(id, edge)
                .find(|&li| !self.is_gap(li))
                .and_then(|li| self.outermost_component(li, axis, edge)),
            IntervalKind::Parallel { children, .. } => {
                let mut best = None;
                let mut best_pos = i32::MAX;
                for &sub in children {
                    let Some(li) = self.outermost_component(sub, axis, edge) else {
                        continue;
                    };
                    if self.is_aligned_at_border_in(li, id, edge) {
                        return Some(li);
                    }
                    let p = self.space(li).pos(axis, edge);
                    let p = if edge == Alignment::Leading { p } else { -p };
                    if p < best_pos {
                        best = Some(li);
                        best_pos = p;
                    }
                }
                best
            }
        }
    }

    /// Pixel position of `edge` of an interval; gaps borrow it from their neighbor.
    pub fn visual_position(&self, id: IntervalId, axis: Axis, edge: Alignment) -> i32 {
        let (interval, edge) = if self.is_gap(id) {
            debug_assert!(edge.is_edge());
            match self.direct_neighbor(id, edge, false) {
                Some(neighbor) => (neighbor, edge.opposite()),
                None => match self.first_parent(id, GroupKind::Parallel) {
                    Some(parent) => (parent, edge),
                    None => return UNKNOWN,
                },
            }
        } else {
            (id, edge)
        };
        self.space(interval).pos(axis, edge)
    }

    /// Components of `root` lying at its `edge`; `None` for no root.
    pub fn edge_sub_components(&self, root: Option<IntervalId>, edge: Alignment) -> Option<Vec<IntervalId>> {
        let root = root?;
        let mut components = Vec::new();
        let mut candidates = alloc::collections::VecDeque::from([root]);
        while let Some(candidate) = candidates.pop_front() {
            match self.kind(candidate) {
                IntervalKind::Sequential { children } => {
                    let border = if edge == Alignment::Leading {
                        children.first()
                    } else {
                        children.last()
                    };
                    candidates.extend(border.copied());
                }
                IntervalKind::Parallel { children, .. } => candidates.extend(children.iter().copied()),
                IntervalKind::Component(_) => components.push(candidate),
                IntervalKind::Gap { .. } => {}
            }
        }
        Some(components)
    }

    /// Whether `space` overlaps real content of `id` on `axis`.
    ///
    /// Groups are searched below their possibly stale bounds; `range`
    /// restricts the search to children `start..=end` of `id`.
    pub fn content_overlap_space(
        &self,
        space: &Region,
        id: IntervalId,
        range: Option<(usize, usize)>,
        axis: Axis,
    ) -> bool {
        let examined = self.space(id);
        if !self.is_group(id) {
            return Region::overlap(space, examined, axis, 0);
        }
        if examined.is_axis_set(axis) && !Region::overlap(space, examined, axis, 0) {
            return false;
        }
        let children = self.children(id);
        if children.is_empty() {
            return false;
        }
        let (from, to) = range.unwrap_or((0, children.len() - 1));
        debug_assert!(from <= to);
        children[from..=to.min(children.len() - 1)]
            .iter()
            .any(|&li| !self.is_gap(li) && self.content_overlap_space(space, li, None, axis))
    }

    /// Whether some component of `a` overlaps some component of `b` on `axis`.
    ///
    /// `range` restricts `b` to its children `start..=end`.
    pub fn content_overlap(
        &self,
        a: IntervalId,
        b: IntervalId,
        range: Option<(usize, usize)>,
        axis: Axis,
    ) -> bool {
        let (a, b) = if !self.is_group(b) {
            if !self.is_group(a) {
                return Region::overlap(self.space(a), self.space(b), axis, 0);
            }
            (b, a)
        } else {
            (a, b)
        };
        let others: Vec<IntervalId> = match range {
            Some((start, end)) => self.component_intervals_in(b, start, end + 1).collect(),
            None => self.component_intervals(b).collect(),
        };
        self.component_intervals(a).any(|li| {
            others
                .iter()
                .any(|&other| Region::overlap(self.space(li), self.space(other), axis, 0))
        })
    }

    /// Whether every component of `id` is kept apart from `comp_interval`'s
    /// component by a sequence on the other axis.
    pub fn is_overlap_prevented_in_other_axis(
        &self,
        comp_interval: IntervalId,
        id: IntervalId,
        axis: Axis,
    ) -> bool {
        let other = axis.other();
        let Some(first) = self.component_intervals(comp_interval).next() else {
            return false;
        };
        let Some(component) = self.component_of(first) else {
            return false;
        };
        let other_comp = self.component_interval(component, other);
        let mut any = false;
        for li in self.component_intervals(id) {
            any = true;
            let Some(comp) = self.component_of(li) else {
                continue;
            };
            let other_interval = self.component_interval(comp, other);
            match self.common_parent(other_comp, other_interval) {
                Some(parent) if !self.is_parallel(parent) => {}
                _ => return false,
            }
        }
        debug_assert!(any);
        true
    }

    pub(crate) fn component_axis(&self, interval: IntervalId) -> Axis {
        match self.component_of(interval) {
            Some(comp) if self.component_interval(comp, Axis::Vertical) == interval => Axis::Vertical,
            _ => Axis::Horizontal,
        }
    }
}

/// Size of a default-padding gap computed from the components around it.
pub fn size_of_default_gap(model: &LayoutModel, gap: IntervalId, mapper: &dyn VisualMapper) -> i32 {
    debug_assert!(model.is_gap(gap));
    let Some(mut parent) = model.parent(gap) else {
        return 0;
    };
    if model.is_parallel(parent) {
        return model.pref_size(gap);
    }
    let mut candidate = gap;
    let mut source = None;
    let mut target = None;
    loop {
        let index = model.index_of(parent, candidate).unwrap_or(0);
        if source.is_none() && index > 0 {
            source = Some(model.child(parent, index - 1));
        }
        if target.is_none() && index + 1 < model.child_count(parent) {
            target = Some(model.child(parent, index + 1));
        }
        if source.is_some() && target.is_some() {
            break;
        }
        let mut next = Some(parent);
        loop {
            let Some(p) = next else { break };
            candidate = p;
            next = model.parent(p);
            if !next.is_some_and(|n| model.is_parallel(n)) {
                break;
            }
        }
        match next {
            Some(p) => parent = p,
            None => break,
        }
    }
    let sources = model.edge_sub_components(source, Alignment::Trailing);
    let targets = model.edge_sub_components(target, Alignment::Leading);
    sizes_of_default_gap(
        model,
        sources.as_deref(),
        targets.as_deref(),
        model.padding_type(gap),
        mapper,
        None,
        &HashMap::new(),
    )[0]
}

/// Preferred sizes of a gap between `sources` and `targets`, one per padding
/// kind (or only for `padding` when given).
///
/// `None` on one side means the gap touches the container border. Regions
/// in `bounds` override the cached space of the listed components.
pub fn sizes_of_default_gap(
    model: &LayoutModel,
    sources: Option<&[IntervalId]>,
    targets: Option<&[IntervalId]>,
    padding: Option<PaddingType>,
    mapper: &dyn VisualMapper,
    container: Option<&str>,
    bounds: &HashMap<ComponentKey, Region>,
) -> Vec<i32> {
    if sources.is_some_and(<[_]>::is_empty) || targets.is_some_and(<[_]>::is_empty) {
        return alloc::vec![0];
    }
    let sources = sources.unwrap_or(&[]);
    let targets = targets.unwrap_or(&[]);
    let (container_edge, sample) = match (sources.first(), targets.first()) {
        (None, None) => return alloc::vec![0],
        (None, Some(&t)) => (Some(Alignment::Leading), t),
        (Some(&s), None) => (Some(Alignment::Trailing), s),
        (Some(&s), Some(_)) => (None, s),
    };
    let axis = model.component_axis(sample);
    let region_of = |li: IntervalId| -> Region {
        model
            .component_of(li)
            .and_then(|c| bounds.get(&c).copied())
            .unwrap_or(*model.space(li))
    };

    let mut max = i32::from(i16::MIN);
    let mut min = i32::from(i16::MAX);
    let mut positions_unknown = false;
    for &source in sources {
        let trailing = region_of(source).pos(axis, Alignment::Trailing);
        if trailing == UNKNOWN {
            positions_unknown = true;
            break;
        }
        max = max.max(trailing);
    }
    for &target in targets {
        let leading = region_of(target).pos(axis, Alignment::Leading);
        if leading == UNKNOWN {
            positions_unknown = true;
            break;
        }
        min = min.min(leading);
    }

    if let Some(edge) = container_edge {
        let mut size = 0;
        let side = if sources.is_empty() { targets } else { sources };
        for &li in side {
            let Some(comp) = model.component_of(li) else {
                continue;
            };
            let parent_id = match container {
                Some(id) => id,
                None => match model.component_parent(comp) {
                    Some(p) => model.component_id(p),
                    None => continue,
                },
            };
            let mut pad = mapper.preferred_padding_in_parent(parent_id, model.component_id(comp), axis, edge);
            let position = region_of(li).pos(axis, edge);
            if !positions_unknown {
                pad -= if edge == Alignment::Leading {
                    position - min
                } else {
                    max - position
                };
            }
            size = size.max(pad);
        }
        return alloc::vec![size];
    }

    let kinds: &[PaddingType] = match padding {
        Some(ref p) => core::slice::from_ref(p),
        None => &PaddingType::ALL,
    };
    let mut sizes = alloc::vec![0; kinds.len()];
    for &source in sources {
        let Some(src_comp) = model.component_of(source) else {
            continue;
        };
        let src_delta = if positions_unknown {
            0
        } else {
            max - region_of(source).pos(axis, Alignment::Trailing)
        };
        for &target in targets {
            let Some(tgt_comp) = model.component_of(target) else {
                continue;
            };
            let tgt_delta = if positions_unknown {
                0
            } else {
                region_of(target).pos(axis, Alignment::Leading) - min
            };
            for (size, &kind) in sizes.iter_mut().zip(kinds) {
                let mut pad = mapper.preferred_padding(
                    model.component_id(src_comp),
                    model.component_id(tgt_comp),
                    axis,
                    Alignment::Leading,
                    kind,
                );
                if !positions_unknown {
                    pad -= src_delta + tgt_delta;
                }
                *size = (*size).max(pad);
            }
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{Paddings, TableMapper};
    use kurbo::Rect;

    /// form: H root -> seq[a, gap, par[b, c]]
    fn build() -> (LayoutModel, [IntervalId; 5]) {
        let mut m = LayoutModel::new();
        let form = m.create_component("form", true);
        m.add_root_component(form);
        let root = m.default_root(form, Axis::Horizontal).unwrap();
        let leaf = |m: &mut LayoutModel, id: &str, x0: f64, x1: f64| {
            let key = m.create_component(id, false);
            m.add_component(key, form, None).unwrap();
            m.set_current_bounds(key, Rect::new(x0, 0.0, x1, 20.0), None);
            m.component_interval(key, Axis::Horizontal)
        };
        let a = leaf(&mut m, "a", 0.0, 100.0);
        let b = leaf(&mut m, "b", 108.0, 150.0);
        let c = leaf(&mut m, "c", 108.0, 170.0);
        let seq = m.new_sequential();
        let gap = m.new_default_gap();
        let par = m.new_parallel(Alignment::Leading);
        m.add_interval(seq, root, None);
        m.add_interval(a, seq, None);
        m.add_interval(gap, seq, None);
        m.add_interval(par, seq, None);
        m.add_interval(b, par, None);
        m.add_interval(c, par, None);
        m.space_mut(par).set_axis(Axis::Horizontal, 108, 170);
        (m, [seq, a, gap, b, c])
    }

    #[test]
    fn component_iteration_is_depth_first() {
        let (m, [seq, a, _, b, c]) = build();
        let all: Vec<_> = m.component_intervals(seq).collect();
        assert_eq!(all, [a, b, c]);
        let tail: Vec<_> = m.component_intervals_in(seq, 1, 3).collect();
        assert_eq!(tail, [b, c]);
        assert_eq!(m.component_intervals(a).collect::<Vec<_>>(), [a]);
    }

    #[test]
    fn outermost_and_visual_positions() {
        let (m, [seq, a, gap, _, c]) = build();
        assert_eq!(m.outermost_component(seq, Axis::Horizontal, Alignment::Trailing), Some(c));
        assert_eq!(m.outermost_component(seq, Axis::Horizontal, Alignment::Leading), Some(a));
        assert_eq!(m.visual_position(gap, Axis::Horizontal, Alignment::Leading), 100);
        assert_eq!(m.visual_position(gap, Axis::Horizontal, Alignment::Trailing), 108);
        let edge = m.edge_sub_components(Some(seq), Alignment::Trailing).unwrap();
        assert_eq!(edge.len(), 2);
    }

    #[test]
    fn default_gap_size_comes_from_neighbors() {
        let (m, [_, _, gap, _, _]) = build();
        let mapper = TableMapper::new(Paddings {
            related: 8,
            ..Paddings::default()
        });
        assert_eq!(size_of_default_gap(&m, gap, &mapper), 8);
    }

    #[test]
    fn unplaced_components_still_get_padding() {
        let mut m = LayoutModel::new();
        let form = m.create_component("form", true);
        m.add_root_component(form);
        let mut leaf = |id: &str| {
            let key = m.create_component(id, false);
            m.add_component(key, form, None).unwrap();
            m.component_interval(key, Axis::Horizontal)
        };
        let a = leaf("a");
        let b = leaf("b");
        let mapper = TableMapper::new(Paddings {
            related: 8,
            ..Paddings::default()
        });
        let none = HashMap::new();
        let between = sizes_of_default_gap(
            &m,
            Some(&[a]),
            Some(&[b]),
            Some(PaddingType::Related),
            &mapper,
            None,
            &none,
        );
        assert_eq!(between, [8]);
        let border = sizes_of_default_gap(&m, Some(&[a, b]), None, None, &mapper, None, &none);
        assert_eq!(border, [10]);
    }

    #[test]
    fn content_overlap_looks_inside_groups() {
        let (m, [seq, a, _, b, _]) = build();
        let mut space = Region::new();
        space.set_axis(Axis::Horizontal, 101, 107);
        assert!(!m.content_overlap_space(&space, seq, None, Axis::Horizontal));
        space.set_axis(Axis::Horizontal, 90, 107);
        assert!(m.content_overlap_space(&space, seq, None, Axis::Horizontal));
        assert!(!m.content_overlap(a, b, None, Axis::Horizontal));
    }
}
