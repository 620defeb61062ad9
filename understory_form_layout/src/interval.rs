// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural queries over the interval trees.
//!
//! These are read-only; they derive effective alignment, neighborhood, and
//! resizing behavior from the tree shape and interval sizes.

use alloc::vec::Vec;

use crate::model::{ComponentKey, GroupKind, IntervalId, IntervalKind, LayoutModel};
use crate::region::{Region, UNKNOWN};
use crate::types::{
    Alignment, Attributes, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, PaddingType,
    USE_PREFERRED_SIZE,
};

impl LayoutModel {
    // --- accessors ---

    /// What the interval is.
    pub fn kind(&self, id: IntervalId) -> &IntervalKind {
        &self.node(id).kind
    }

    /// Owning group, or `None` for roots and detached intervals.
    pub fn parent(&self, id: IntervalId) -> Option<IntervalId> {
        self.node(id).parent
    }

    /// Children of a group; empty for leaves.
    pub fn children(&self, id: IntervalId) -> &[IntervalId] {
        self.node(id).kind.children()
    }

    /// Number of children of a group.
    pub fn child_count(&self, id: IntervalId) -> usize {
        self.children(id).len()
    }

    /// Child of `id` at `index`.
    pub fn child(&self, id: IntervalId, index: usize) -> IntervalId {
        self.children(id)[index]
    }

    /// Children of `id` starting from its `edge` side.
    pub(crate) fn children_from(
        &self,
        id: IntervalId,
        edge: Alignment,
    ) -> impl Iterator<Item = IntervalId> + '_ {
        let children = self.children(id);
        let n = children.len();
        (0..n).map(move |k| {
            if edge == Alignment::Leading {
                children[k]
            } else {
                children[n - 1 - k]
            }
        })
    }

    /// Position of `child` within `parent`.
    pub fn index_of(&self, parent: IntervalId, child: IntervalId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    /// The component a leaf belongs to.
    pub fn component_of(&self, id: IntervalId) -> Option<ComponentKey> {
        match self.node(id).kind {
            IntervalKind::Component(key) => Some(key),
            _ => None,
        }
    }

    /// Whether the interval is empty space.
    pub fn is_gap(&self, id: IntervalId) -> bool {
        matches!(self.node(id).kind, IntervalKind::Gap { .. })
    }

    /// Whether the interval is a component leaf.
    pub fn is_component(&self, id: IntervalId) -> bool {
        matches!(self.node(id).kind, IntervalKind::Component(_))
    }

    /// Whether the interval is a leaf (gap or component).
    pub fn is_single(&self, id: IntervalId) -> bool {
        !self.is_group(id)
    }

    /// Whether the interval is a group.
    pub fn is_group(&self, id: IntervalId) -> bool {
        matches!(
            self.node(id).kind,
            IntervalKind::Sequential { .. } | IntervalKind::Parallel { .. }
        )
    }

    /// Whether the interval is a sequential group.
    pub fn is_sequential(&self, id: IntervalId) -> bool {
        matches!(self.node(id).kind, IntervalKind::Sequential { .. })
    }

    /// Whether the interval is a parallel group.
    pub fn is_parallel(&self, id: IntervalId) -> bool {
        matches!(self.node(id).kind, IntervalKind::Parallel { .. })
    }

    pub(crate) fn is_kind(&self, id: IntervalId, kind: GroupKind) -> bool {
        match kind {
            GroupKind::Sequential => self.is_sequential(id),
            GroupKind::Parallel => self.is_parallel(id),
        }
    }

    /// Alignment as set on the interval, `None` meaning default.
    pub fn raw_alignment(&self, id: IntervalId) -> Option<Alignment> {
        self.node(id).alignment
    }

    /// Alignment in the parent; default alignment inherits a parallel parent's group alignment.
    pub fn alignment(&self, id: IntervalId) -> Option<Alignment> {
        let node = self.node(id);
        match (node.alignment, node.parent) {
            (None, Some(parent)) if self.is_parallel(parent) => Some(self.group_alignment(parent)),
            (alignment, _) => alignment,
        }
    }

    /// Group alignment of a parallel group; leading for anything else.
    pub fn group_alignment(&self, id: IntervalId) -> Alignment {
        match self.node(id).kind {
            IntervalKind::Parallel {
                group_alignment, ..
            } => group_alignment,
            _ => Alignment::Leading,
        }
    }

    /// Minimum size as stored.
    pub fn min_size(&self, id: IntervalId) -> i32 {
        self.node(id).min
    }

    /// Preferred size as stored.
    pub fn pref_size(&self, id: IntervalId) -> i32 {
        self.node(id).pref
    }

    /// Maximum size as stored.
    pub fn max_size(&self, id: IntervalId) -> i32 {
        self.node(id).max
    }

    /// Minimum size, honoring design-time resizing markers when `design` is set.
    pub fn min_size_at(&self, id: IntervalId, design: bool) -> i32 {
        let node = self.node(id);
        if !design {
            return node.min;
        }
        if node.attributes.contains(Attributes::DESIGN_SUPPRESSED_RESIZING) {
            debug_assert!(!node.attributes.contains(Attributes::DESIGN_RESIZING));
            return USE_PREFERRED_SIZE;
        }
        if node.attributes.contains(Attributes::DESIGN_RESIZING) {
            return if self.is_gap(id) && node.pref != 0 {
                NOT_EXPLICITLY_DEFINED
            } else {
                0
            };
        }
        node.min
    }

    /// Maximum size, honoring design-time resizing markers when `design` is set.
    pub fn max_size_at(&self, id: IntervalId, design: bool) -> i32 {
        let node = self.node(id);
        if !design {
            return node.max;
        }
        if node.attributes.contains(Attributes::DESIGN_SUPPRESSED_RESIZING) {
            return USE_PREFERRED_SIZE;
        }
        if node.attributes.contains(Attributes::DESIGN_RESIZING) {
            return INFINITE_SIZE;
        }
        node.max
    }

    /// Attribute set of the interval.
    pub fn attributes(&self, id: IntervalId) -> Attributes {
        self.node(id).attributes
    }

    /// Whether all bits of `attr` are set.
    pub fn has_attribute(&self, id: IntervalId, attr: Attributes) -> bool {
        self.node(id).attributes.contains(attr)
    }

    /// Padding classifier of a gap.
    pub fn padding_type(&self, id: IntervalId) -> Option<PaddingType> {
        match self.node(id).kind {
            IntervalKind::Gap { padding } => padding,
            _ => None,
        }
    }

    /// Cached geometry of the interval.
    pub fn space(&self, id: IntervalId) -> &Region {
        &self.node(id).space
    }

    // --- ancestry ---

    /// Whether `group` is a proper ancestor of `id`.
    pub fn is_parent_of(&self, group: IntervalId, id: IntervalId) -> bool {
        if !self.is_group(group) {
            return false;
        }
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == group {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Topmost ancestor of `id` (itself if detached).
    pub fn root_of(&self, id: IntervalId) -> IntervalId {
        let mut current = id;
        while let Some(p) = self.parent(current) {
            current = p;
        }
        current
    }

    /// Nearest ancestor of the given kind.
    pub fn first_parent(&self, id: IntervalId, kind: GroupKind) -> Option<IntervalId> {
        let mut parent = self.parent(id);
        while let Some(p) = parent {
            if self.is_kind(p, kind) {
                return Some(p);
            }
            parent = self.parent(p);
        }
        None
    }

    fn ancestry(&self, id: IntervalId) -> Vec<IntervalId> {
        let mut chain = alloc::vec![id];
        let mut current = id;
        while let Some(p) = self.parent(current) {
            chain.push(p);
            current = p;
        }
        chain.reverse();
        chain
    }

    /// Deepest interval that contains both `a` and `b`, or is one of them.
    pub fn common_parent(&self, a: IntervalId, b: IntervalId) -> Option<IntervalId> {
        let pa = self.ancestry(a);
        let pb = self.ancestry(b);
        let mut common = None;
        for (x, y) in pa.iter().zip(pb.iter()) {
            if x != y {
                break;
            }
            common = Some(*x);
        }
        common
    }

    /// Deepest group containing all of `ids`, starting from the parent of the first one.
    pub fn common_parent_of(&self, ids: &[IntervalId]) -> Option<IntervalId> {
        let (&first, rest) = ids.split_first()?;
        let mut parent = self.parent(first)?;
        for &id in rest {
            parent = self.common_parent(parent, id)?;
        }
        Some(parent)
    }

    // --- neighborhood ---

    /// Number of children of `group` attached at `alignment` (all when `None`);
    /// for a sequence every child counts. Gaps are skipped with `non_empty`.
    pub fn count(&self, group: IntervalId, alignment: Option<Alignment>, non_empty: bool) -> usize {
        let sequential = self.is_sequential(group);
        self.children(group)
            .iter()
            .filter(|&&li| {
                (sequential
                    || alignment.is_none()
                    || self.alignment(li) == alignment
                    || self.want_resize(li))
                    && (!non_empty || !self.is_gap(li))
            })
            .count()
    }

    /// Sibling next to `id` in a sequential parent, towards `edge`.
    pub fn direct_neighbor(&self, id: IntervalId, edge: Alignment, non_empty: bool) -> Option<IntervalId> {
        let parent = self.parent(id)?;
        if self.is_parallel(parent) {
            return None;
        }
        let children = self.children(parent);
        let index = self.index_of(parent, id)?;
        let mut found = None;
        if edge == Alignment::Leading {
            for &li in children[..index].iter().rev() {
                if !non_empty || !self.is_gap(li) {
                    found = Some(li);
                    break;
                }
            }
        } else {
            for &li in &children[index + 1..] {
                if !non_empty || !self.is_gap(li) {
                    found = Some(li);
                    break;
                }
            }
        }
        found
    }

    /// Neighbor of `id` in the nearest sequential ancestor, towards `edge`.
    ///
    /// With `out_of_parent` the search continues into outer sequences. With
    /// `aligned` it stops at a parallel group where the interval does not
    /// reach the edge.
    pub fn neighbor(
        &self,
        id: IntervalId,
        edge: Alignment,
        non_empty: bool,
        out_of_parent: bool,
        aligned: bool,
    ) -> Option<IntervalId> {
        debug_assert!(edge.is_edge());
        let mut parent = Some(id);
        let mut interval;
        loop {
            loop {
                interval = parent?;
                parent = self.parent(interval);
                if aligned
                    && parent.is_some_and(|p| self.is_parallel(p))
                    && !self.is_aligned_at_border(interval, edge)
                {
                    parent = None;
                }
                if !parent.is_some_and(|p| self.is_parallel(p)) {
                    break;
                }
            }
            parent?;
            let neighbor = self.direct_neighbor(interval, edge, non_empty);
            if neighbor.is_some() || !out_of_parent {
                return neighbor;
            }
        }
    }

    /// Sibling of `id` (or of its nearest ancestor under a group of `kind`) towards `edge`.
    pub fn neighbor_in(&self, id: IntervalId, kind: GroupKind, edge: Alignment) -> Option<IntervalId> {
        let mut interval = id;
        loop {
            let mut parent = self.parent(interval);
            while let Some(p) = parent {
                if self.is_kind(p, kind) {
                    break;
                }
                interval = p;
                parent = self.parent(p);
            }
            let p = parent?;
            let subs = self.children(p);
            let index = self.index_of(p, interval)?;
            let sibling = match edge {
                Alignment::Leading if index > 0 => Some(subs[index - 1]),
                Alignment::Trailing if index + 1 < subs.len() => Some(subs[index + 1]),
                _ => None,
            };
            if sibling.is_some() {
                return sibling;
            }
            interval = p;
        }
    }

    /// Whether the interval starts with a gap at `edge` (descending into groups).
    pub fn starts_with_empty_space(&self, id: IntervalId, edge: Alignment) -> bool {
        match &self.node(id).kind {
            IntervalKind::Gap { .. } => true,
            IntervalKind::Component(_) => false,
            IntervalKind::Sequential { children } => {
                let child = if edge == Alignment::Leading {
                    children.first()
                } else {
                    children.last()
                };
                child.is_some_and(|&c| self.starts_with_empty_space(c, edge))
            }
            IntervalKind::Parallel { children, .. } => children
                .iter()
                .any(|&c| self.starts_with_empty_space(c, edge)),
        }
    }

    /// Whether `id` reaches the `edge` of its parent.
    pub fn is_aligned_at_border(&self, id: IntervalId, edge: Alignment) -> bool {
        if !edge.is_edge() {
            return false;
        }
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if self.is_sequential(parent) {
            let children = self.children(parent);
            let border = if edge == Alignment::Leading {
                children.first()
            } else {
                children.last()
            };
            border == Some(&id)
        } else {
            self.alignment(id) == Some(edge) || self.want_resize(id)
        }
    }

    /// Whether `id` reaches the `edge` of the ancestor `parent` through every level.
    pub fn is_aligned_at_border_in(&self, id: IntervalId, parent: IntervalId, edge: Alignment) -> bool {
        let mut interval = id;
        loop {
            if !self.is_aligned_at_border(interval, edge) {
                return false;
            }
            match self.parent(interval) {
                Some(p) if p == parent => return true,
                Some(p) => interval = p,
                None => return false,
            }
        }
    }

    /// Whether `id` visually touches the `edge` of its parent.
    pub fn is_placed_at_border(&self, id: IntervalId, axis: Axis, edge: Alignment) -> bool {
        if !edge.is_edge() {
            return false;
        }
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if self.is_gap(id) {
            if self.is_sequential(parent) {
                let children = self.children(parent);
                let border = if edge == Alignment::Leading {
                    children.first()
                } else {
                    children.last()
                };
                border == Some(&id)
            } else {
                true
            }
        } else {
            Region::distance(self.space(id), self.space(parent), axis, edge, edge) == 0
        }
    }

    /// Whether `id` visually touches the `edge` of the ancestor `parent`.
    pub fn is_placed_at_border_in(
        &self,
        id: IntervalId,
        parent: IntervalId,
        axis: Axis,
        edge: Alignment,
    ) -> bool {
        if !edge.is_edge() {
            return false;
        }
        let mut interval = id;
        if self.is_gap(id) {
            let Some(p) = self.parent(id) else {
                return false;
            };
            if self.is_sequential(p) {
                let children = self.children(p);
                let border = if edge == Alignment::Leading {
                    children.first()
                } else {
                    children.last()
                };
                if border != Some(&id) {
                    return false;
                }
            }
            if p == parent {
                return true;
            }
            interval = p;
        }
        Region::distance(self.space(interval), self.space(parent), axis, edge, edge) == 0
            && self.is_parent_of(parent, interval)
    }

    /// Whether `id` is the outermost child of its parent at `edge`.
    ///
    /// Without `attached`, gaps between it and the border are skipped.
    pub fn is_border_interval(&self, id: IntervalId, edge: Alignment, attached: bool) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if !edge.is_edge() {
            return false;
        }
        if self.is_sequential(parent) {
            for li in self.children_from(parent, edge) {
                if li == id {
                    return true;
                } else if attached || !self.is_gap(li) {
                    return false;
                }
            }
            false
        } else {
            !attached || self.alignment(id) == Some(edge) || self.want_resize(id)
        }
    }

    /// Whether a parallel group's `edge` is defined by some child.
    pub fn is_closed_group(&self, group: IntervalId, edge: Alignment) -> bool {
        debug_assert!(self.is_parallel(group));
        if self.has_attribute(group, Attributes::CLOSED_GROUP)
            || matches!(
                self.group_alignment(group),
                Alignment::Center | Alignment::Baseline
            )
        {
            return true;
        }
        self.children(group)
            .iter()
            .any(|&li| self.alignment(li) == Some(edge) || self.want_resize(li))
    }

    /// Whether the group carries the explicit closed marker.
    pub fn is_explicitly_closed_group(&self, group: IntervalId) -> bool {
        self.has_attribute(group, Attributes::CLOSED_GROUP)
    }

    // --- sizing ---

    /// Whether a gap takes its size from a platform padding.
    pub fn is_default_padding(&self, id: IntervalId) -> bool {
        self.is_default_padding_at(id, false)
    }

    /// Like [`is_default_padding`](Self::is_default_padding), optionally at design time.
    pub fn is_default_padding_at(&self, id: IntervalId, design: bool) -> bool {
        self.is_gap(id)
            && (self.min_size_at(id, design) == NOT_EXPLICITLY_DEFINED
                || self.pref_size(id) == NOT_EXPLICITLY_DEFINED)
    }

    /// Whether a gap is a default padding that cannot resize.
    pub fn is_fixed_default_padding(&self, id: IntervalId) -> bool {
        let node = self.node(id);
        self.is_gap(id)
            && matches!(node.min, NOT_EXPLICITLY_DEFINED | USE_PREFERRED_SIZE)
            && node.pref == NOT_EXPLICITLY_DEFINED
            && matches!(node.max, NOT_EXPLICITLY_DEFINED | USE_PREFERRED_SIZE)
    }

    /// Whether the interval's own sizes allow it to grow.
    pub fn can_resize(&self, id: IntervalId) -> bool {
        let node = self.node(id);
        let (max, pref) = (node.max, node.pref);
        (max != pref && max != USE_PREFERRED_SIZE) || max == NOT_EXPLICITLY_DEFINED
    }

    /// Whether the interval grows with its parent.
    ///
    /// A group only does so when some child does.
    pub fn want_resize(&self, id: IntervalId) -> bool {
        self.can_resize(id) && (!self.is_group(id) || self.content_want_resize(id))
    }

    /// Whether the interval grows and every ancestor lets it.
    pub fn want_resize_in_layout(&self, id: IntervalId) -> bool {
        if !self.want_resize(id) {
            return false;
        }
        let mut current = id;
        while let Some(p) = self.parent(current) {
            if !self.can_resize(p) {
                return false;
            }
            current = p;
        }
        true
    }

    /// Whether any child of the group wants to resize.
    pub fn content_want_resize(&self, group: IntervalId) -> bool {
        self.children(group).iter().any(|&li| self.want_resize(li))
    }

    /// Current pixel extent of the interval; gaps are measured between their neighbors.
    pub fn current_size(&self, id: IntervalId, axis: Axis) -> i32 {
        if !self.is_gap(id) {
            return self.space(id).size(axis);
        }
        let Some(parent) = self.parent(id) else {
            return 0;
        };
        let (l, t) = if self.is_sequential(parent) {
            let children = self.children(parent);
            let index = self.index_of(parent, id).unwrap_or(0);
            let l = if index > 0 {
                self.space(children[index - 1]).pos(axis, Alignment::Trailing)
            } else {
                self.space(parent).pos(axis, Alignment::Leading)
            };
            let t = if index + 1 < children.len() {
                self.space(children[index + 1]).pos(axis, Alignment::Leading)
            } else {
                self.space(parent).pos(axis, Alignment::Trailing)
            };
            (l, t)
        } else {
            (
                self.space(parent).pos(axis, Alignment::Leading),
                self.space(parent).pos(axis, Alignment::Trailing),
            )
        };
        if l == UNKNOWN || t == UNKNOWN {
            return UNKNOWN;
        }
        t - l
    }

    /// [`current_size`](Self::current_size), or `None` while the geometry is unknown.
    pub fn known_current_size(&self, id: IntervalId, axis: Axis) -> Option<i32> {
        Some(self.current_size(id, axis)).filter(|&size| size != UNKNOWN)
    }

    // --- effective alignment ---

    /// The edge an interval effectively sticks to when its parent is resized.
    ///
    /// `None` when it is not anchored to a single edge.
    pub fn effective_alignment(&self, id: IntervalId) -> Option<Alignment> {
        let parent = self.parent(id)?;
        if self.is_parallel(parent) {
            return self.alignment(id);
        }
        if self.want_resize(id) {
            return None;
        }
        let mut before = true;
        let mut leading_fixed = true;
        let mut trailing_fixed = true;
        for &li in self.children(parent) {
            if li == id {
                before = false;
            } else if self.want_resize(li) {
                if before {
                    leading_fixed = false;
                } else {
                    trailing_fixed = false;
                }
            }
        }
        match (leading_fixed, trailing_fixed) {
            (true, false) => Some(Alignment::Leading),
            (false, true) => Some(Alignment::Trailing),
            (true, true) => self.alignment(parent),
            (false, false) => None,
        }
    }

    /// Effective alignment of `id` with respect to one `edge` of its parent.
    pub fn effective_alignment_at(&self, id: IntervalId, edge: Alignment) -> Option<Alignment> {
        debug_assert!(edge.is_edge());
        let want_resize = self.want_resize(id);
        let parent = self.parent(id)?;
        if self.is_parallel(parent) {
            return if want_resize { Some(edge) } else { self.alignment(id) };
        }
        let mut before = true;
        let mut before_fixed = true;
        let mut after_fixed = true;
        for li in self.children_from(parent, edge) {
            if li == id {
                before = false;
            } else if self.want_resize(li) {
                if before {
                    before_fixed = false;
                } else {
                    after_fixed = false;
                }
            }
        }
        match (before_fixed, after_fixed) {
            (true, false) => Some(edge),
            (false, true) => Some(edge.opposite()),
            (true, true) if want_resize => Some(edge),
            (true, true) => self.alignment(parent).filter(|a| a.is_edge()),
            (false, false) => None,
        }
    }

    /// Effective alignment of `id` at `edge`, followed up to the ancestor `parent`.
    pub fn effective_alignment_in_parent(
        &self,
        id: IntervalId,
        parent: IntervalId,
        edge: Alignment,
    ) -> Option<Alignment> {
        debug_assert!(self.is_parent_of(parent, id));
        let mut alignment = Some(edge);
        let mut interval = id;
        loop {
            let Some(edge) = alignment.filter(|a| a.is_edge()) else {
                break;
            };
            alignment = self.effective_alignment_at(interval, edge);
            interval = self.parent(interval)?;
            if interval == parent {
                return alignment;
            }
        }
        while interval != parent {
            if self.effective_alignment(interval) != alignment {
                return None;
            }
            interval = self.parent(interval)?;
        }
        alignment
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{ComponentKey, IntervalId, LayoutModel};
    use crate::region::UNKNOWN;
    use crate::types::{Alignment, Axis, INFINITE_SIZE, NOT_EXPLICITLY_DEFINED, USE_PREFERRED_SIZE};

    struct Fixture {
        model: LayoutModel,
        root: IntervalId,
        seq: IntervalId,
        a: IntervalId,
        gap: IntervalId,
        b: IntervalId,
    }

    /// root(parallel) -> seq[a, gap, b]
    fn fixture() -> Fixture {
        let mut model = LayoutModel::new();
        let cont = model.create_component("form", true);
        model.add_root_component(cont);
        let root = model.default_root(cont, Axis::Horizontal).unwrap();
        let seq = model.new_sequential();
        model.add_interval(seq, root, None);
        let comp = |model: &mut LayoutModel, id: &str| -> (ComponentKey, IntervalId) {
            let key = model.create_component(id, false);
            model.add_component(key, cont, None).unwrap();
            (key, model.component_interval(key, Axis::Horizontal))
        };
        let (_, a) = comp(&mut model, "a");
        let (_, b) = comp(&mut model, "b");
        let gap = model.new_default_gap();
        model.add_interval(a, seq, None);
        model.add_interval(gap, seq, None);
        model.add_interval(b, seq, None);
        Fixture {
            model,
            root,
            seq,
            a,
            gap,
            b,
        }
    }

    #[test]
    fn neighbors_in_sequence() {
        let f = fixture();
        let m = &f.model;
        assert_eq!(m.direct_neighbor(f.a, Alignment::Trailing, false), Some(f.gap));
        assert_eq!(m.direct_neighbor(f.a, Alignment::Trailing, true), Some(f.b));
        assert_eq!(m.direct_neighbor(f.a, Alignment::Leading, false), None);
        assert_eq!(m.neighbor(f.b, Alignment::Leading, true, true, false), Some(f.a));
        assert_eq!(m.neighbor(f.seq, Alignment::Leading, false, true, false), None);
        assert!(m.is_border_interval(f.a, Alignment::Leading, true));
        assert!(!m.is_border_interval(f.gap, Alignment::Trailing, true));
        assert!(m.is_border_interval(f.b, Alignment::Trailing, false));
    }

    #[test]
    fn default_alignment_follows_parallel_parent() {
        let mut f = fixture();
        assert_eq!(f.model.raw_alignment(f.seq), None);
        assert_eq!(f.model.alignment(f.seq), Some(Alignment::Leading));
        f.model.set_group_alignment(f.root, Alignment::Trailing);
        assert_eq!(f.model.alignment(f.seq), Some(Alignment::Trailing));
        assert_eq!(f.model.alignment(f.a), None);
        assert!(f.model.is_aligned_at_border(f.seq, Alignment::Trailing));
        assert!(f.model.is_aligned_at_border_in(f.b, f.root, Alignment::Trailing));
        assert!(!f.model.is_aligned_at_border_in(f.a, f.root, Alignment::Trailing));
    }

    #[test]
    fn resizing_propagates_from_content() {
        let mut f = fixture();
        assert!(!f.model.want_resize(f.seq));
        assert!(f.model.can_resize(f.seq));
        f.model
            .set_interval_size(f.gap, NOT_EXPLICITLY_DEFINED, NOT_EXPLICITLY_DEFINED, INFINITE_SIZE);
        assert!(f.model.want_resize(f.gap));
        assert!(f.model.want_resize(f.seq));
        assert!(f.model.want_resize_in_layout(f.gap));
        assert_eq!(f.model.effective_alignment(f.a), Some(Alignment::Leading));
        assert_eq!(f.model.effective_alignment(f.b), Some(Alignment::Trailing));
        assert_eq!(
            f.model.effective_alignment_in_parent(f.b, f.root, Alignment::Trailing),
            Some(Alignment::Trailing)
        );
        f.model.set_interval_size(f.gap, NOT_EXPLICITLY_DEFINED, 10, USE_PREFERRED_SIZE);
        assert!(!f.model.want_resize(f.seq));
        assert!(!f.model.is_fixed_default_padding(f.gap));
        assert!(f.model.is_default_padding(f.gap));
    }

    #[test]
    fn gap_size_is_unknown_until_neighbors_are_placed() {
        let mut f = fixture();
        assert_eq!(f.model.current_size(f.gap, Axis::Horizontal), UNKNOWN);
        assert_eq!(f.model.known_current_size(f.gap, Axis::Horizontal), None);

        f.model.space_mut(f.a).set_axis(Axis::Horizontal, 0, 40);
        assert_eq!(f.model.known_current_size(f.gap, Axis::Horizontal), None);
        f.model.space_mut(f.b).set_axis(Axis::Horizontal, 60, 90);
        assert_eq!(f.model.known_current_size(f.gap, Axis::Horizontal), Some(20));
    }

    #[test]
    fn common_parent_and_counts() {
        let f = fixture();
        let m = &f.model;
        assert_eq!(m.common_parent(f.a, f.b), Some(f.seq));
        assert_eq!(m.common_parent(f.seq, f.b), Some(f.seq));
        assert_eq!(m.common_parent_of(&[f.a, f.b]), Some(f.seq));
        assert_eq!(m.count(f.seq, None, true), 2);
        assert_eq!(m.count(f.root, Some(Alignment::Trailing), false), 0);
        assert_eq!(m.root_of(f.gap), f.root);
        assert!(m.is_parent_of(f.root, f.gap));
        assert!(!m.is_parent_of(f.a, f.gap));
    }
}
