// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout model: an arena of intervals plus the components that own them.
//!
//! Intervals are addressed by generational [`IntervalId`]s. Every structural
//! mutation goes through [`LayoutModel`] so parent links stay bidirectional
//! and the [change mark](LayoutModel::change_mark) moves with each edit.
//!
//! Removing a component's interval outside of an [`EditSession`] queues a
//! [`RemovedInterval`] record. The designer drains these to clean up the
//! neighborhood of the removed component.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use hashbrown::{HashMap, HashSet};
use kurbo::Rect;
use smallvec::SmallVec;

use crate::error::LayoutError;
use crate::region::Region;
use crate::types::{
    Alignment, Attributes, Axis, NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
};

/// Identifier for an interval in the model (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct IntervalId(pub(crate) u32, pub(crate) u32);

impl IntervalId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a component registered with the model.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ComponentKey(pub(crate) u32);

impl ComponentKey {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Child list of a group.
pub type Children = SmallVec<[IntervalId; 4]>;

/// Group flavor, for walks that look for the nearest ancestor of a kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Children follow each other along the axis.
    Sequential,
    /// Children share the same span along the axis.
    Parallel,
}

/// What an interval is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntervalKind {
    /// Empty space, optionally sized by a platform padding.
    Gap {
        /// Padding classifier used when the size is the default.
        padding: Option<PaddingType>,
    },
    /// One axis of a component.
    Component(ComponentKey),
    /// Children laid out one after another.
    Sequential {
        /// Ordered children.
        children: Children,
    },
    /// Children laid out over the same span.
    Parallel {
        /// Insertion-ordered children.
        children: Children,
        /// Alignment applied to children that do not set their own.
        group_alignment: Alignment,
    },
}

impl IntervalKind {
    pub(crate) fn children(&self) -> &[IntervalId] {
        match self {
            Self::Sequential { children } | Self::Parallel { children, .. } => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Self::Sequential { children } | Self::Parallel { children, .. } => Some(children),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct IntervalNode {
    generation: u32,
    pub(crate) kind: IntervalKind,
    pub(crate) parent: Option<IntervalId>,
    pub(crate) alignment: Option<Alignment>,
    pub(crate) min: i32,
    pub(crate) pref: i32,
    pub(crate) max: i32,
    pub(crate) attributes: Attributes,
    pub(crate) space: Region,
}

impl IntervalNode {
    fn new(generation: u32, kind: IntervalKind) -> Self {
        let max = match kind {
            IntervalKind::Sequential { .. } | IntervalKind::Parallel { .. } => {
                NOT_EXPLICITLY_DEFINED
            }
            _ => USE_PREFERRED_SIZE,
        };
        Self {
            generation,
            kind,
            parent: None,
            alignment: None,
            min: NOT_EXPLICITLY_DEFINED,
            pref: NOT_EXPLICITLY_DEFINED,
            max,
            attributes: Attributes::empty(),
            space: Region::new(),
        }
    }
}

impl Default for IntervalNode {
    /// An unattached gap with generation 0, which no live id carries.
    fn default() -> Self {
        Self::new(0, IntervalKind::Gap { padding: None })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ComponentNode {
    pub(crate) id: String,
    pub(crate) parent: Option<ComponentKey>,
    pub(crate) intervals: [IntervalId; 2],
    pub(crate) roots: Vec<[IntervalId; 2]>,
    pub(crate) subcomponents: Vec<ComponentKey>,
    pub(crate) resizability: Option<[bool; 2]>,
    pub(crate) link_size: [Option<u32>; 2],
    registered: bool,
}

/// A component interval that was taken out of the tree outside an edit session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RemovedInterval {
    /// The component whose interval was removed.
    pub component: ComponentKey,
    /// The container the component belonged to at removal time.
    pub container: Option<ComponentKey>,
    /// Axis of the removed interval.
    pub axis: Axis,
    /// Former parent group.
    pub parent: IntervalId,
    /// Former position within `parent`.
    pub index: usize,
    /// Whether the interval wanted to resize when it was removed.
    pub want_resize: bool,
}

/// Scope during which removals are not reported.
///
/// Sessions nest; reporting resumes when the last guard is dropped.
#[derive(Debug)]
pub struct EditSession {
    depth: Rc<Cell<u32>>,
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// The interval trees of all containers and the components placed in them.
#[derive(Debug, Default)]
pub struct LayoutModel {
    intervals: Vec<Option<IntervalNode>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    components: Vec<ComponentNode>,
    ids: HashMap<String, ComponentKey>,
    change_mark: u64,
    next_link_id: u32,
    session_depth: Rc<Cell<u32>>,
    removed: Vec<RemovedInterval>,
    // Stand-ins handed out for stale ids in release builds.
    detached: IntervalNode,
    scratch: IntervalNode,
}

impl LayoutModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    // --- arena ---

    fn insert(&mut self, kind: IntervalKind) -> IntervalId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.intervals[idx] = Some(IntervalNode::new(generation, kind));
            (idx, generation)
        } else {
            let generation = 1_u32;
            self.intervals.push(Some(IntervalNode::new(generation, kind)));
            self.generations.push(generation);
            (self.intervals.len() - 1, generation)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "IntervalId uses 32-bit indices by design."
        )]
        let idx = idx as u32;
        IntervalId::new(idx, generation)
    }

    /// Returns true if `id` refers to a live interval.
    pub fn is_alive(&self, id: IntervalId) -> bool {
        self.intervals
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    /// Access a node.
    ///
    /// A stale `id` trips a debug assertion; release builds read an empty
    /// detached gap instead.
    pub(crate) fn node(&self, id: IntervalId) -> &IntervalNode {
        match self.intervals.get(id.idx()).and_then(Option::as_ref) {
            Some(node) if node.generation == id.1 => node,
            _ => {
                debug_assert!(false, "stale interval id {id:?}");
                &self.detached
            }
        }
    }

    /// Access a node mutably.
    ///
    /// A stale `id` trips a debug assertion; release builds write into a
    /// scratch node that is reset on every use.
    pub(crate) fn node_mut(&mut self, id: IntervalId) -> &mut IntervalNode {
        match self.intervals.get_mut(id.idx()).and_then(Option::as_mut) {
            Some(node) if node.generation == id.1 => node,
            _ => {
                debug_assert!(false, "stale interval id {id:?}");
                self.scratch = IntervalNode::default();
                &mut self.scratch
            }
        }
    }

    /// Create a detached gap with the given sizes.
    pub fn new_gap(&mut self, min: i32, pref: i32, max: i32) -> IntervalId {
        let id = self.insert(IntervalKind::Gap { padding: None });
        let node = self.node_mut(id);
        node.min = min;
        node.pref = pref;
        node.max = max;
        id
    }

    /// Create a detached fixed gap of default padding.
    pub fn new_default_gap(&mut self) -> IntervalId {
        self.insert(IntervalKind::Gap { padding: None })
    }

    /// Create a detached, empty sequential group.
    pub fn new_sequential(&mut self) -> IntervalId {
        self.insert(IntervalKind::Sequential {
            children: Children::new(),
        })
    }

    /// Create a detached, empty parallel group.
    pub fn new_parallel(&mut self, group_alignment: Alignment) -> IntervalId {
        self.insert(IntervalKind::Parallel {
            children: Children::new(),
            group_alignment,
        })
    }

    /// Create a detached interval of the same kind as `source` with its
    /// alignment, sizes, and persistent attributes, but without children.
    ///
    /// Component intervals are cloned as gaps; the caller is expected to
    /// swap in the target component's own interval.
    pub fn clone_interval(&mut self, source: IntervalId) -> IntervalId {
        let src = self.node(source);
        let kind = match &src.kind {
            IntervalKind::Gap { padding } => IntervalKind::Gap {
                padding: if self.is_default_padding(source) {
                    *padding
                } else {
                    None
                },
            },
            IntervalKind::Component(_) => IntervalKind::Gap { padding: None },
            IntervalKind::Sequential { .. } => IntervalKind::Sequential {
                children: Children::new(),
            },
            IntervalKind::Parallel {
                group_alignment, ..
            } => IntervalKind::Parallel {
                children: Children::new(),
                group_alignment: *group_alignment,
            },
        };
        let alignment = self.alignment(source);
        let (min, pref, max) = (src.min, src.pref, src.max);
        let attributes = src.attributes & Attributes::PERSISTENT;
        let clone = self.insert(kind);
        let node = self.node_mut(clone);
        node.alignment = alignment;
        node.attributes = attributes;
        node.min = min;
        node.pref = pref;
        node.max = max;
        clone
    }

    /// Copy alignment, sizes, and persistent attributes of `source` onto `target`.
    pub(crate) fn copy_interval_properties(&mut self, source: IntervalId, target: IntervalId) {
        let alignment = self.alignment(source);
        let src = self.node(source);
        let (min, pref, max) = (src.min, src.pref, src.max);
        let attributes = src.attributes & Attributes::PERSISTENT;
        let node = self.node_mut(target);
        node.alignment = alignment;
        node.attributes = attributes;
        node.min = min;
        node.pref = pref;
        node.max = max;
    }

    /// Free a detached interval and its subtree.
    ///
    /// Component intervals are owned by their component and are only detached.
    /// Children that were moved elsewhere are left alone.
    pub fn discard(&mut self, id: IntervalId) {
        if !self.is_alive(id) {
            return;
        }
        debug_assert!(self.node(id).parent.is_none(), "discarding an attached interval");
        let mut stack = alloc::vec![id];
        while let Some(current) = stack.pop() {
            if matches!(self.node(current).kind, IntervalKind::Component(_)) {
                self.node_mut(current).parent = None;
                continue;
            }
            for child in self.node(current).kind.children().to_vec() {
                if self.is_alive(child) && self.node(child).parent == Some(current) {
                    stack.push(child);
                }
            }
            self.intervals[current.idx()] = None;
            self.free_list.push(current.idx());
        }
    }

    /// Free every group and gap that no layout root reaches; returns how many.
    ///
    /// Component intervals are never freed, only cut loose from dead parents.
    /// Must not run while detached intervals are still meant to be placed.
    pub fn collect_detached(&mut self) -> usize {
        let mut reachable: HashSet<IntervalId> = HashSet::new();
        let mut stack: Vec<IntervalId> = self
            .components
            .iter()
            .flat_map(|c| c.roots.iter().flatten().copied())
            .collect();
        while let Some(id) = stack.pop() {
            if reachable.insert(id) {
                stack.extend_from_slice(self.node(id).kind.children());
            }
        }
        let mut freed = 0;
        for idx in 0..self.intervals.len() {
            let Some(node) = self.intervals[idx].as_mut() else {
                continue;
            };
            #[allow(
                clippy::cast_possible_truncation,
                reason = "IntervalId uses 32-bit indices by design."
            )]
            let id = IntervalId::new(idx as u32, node.generation);
            if reachable.contains(&id) {
                continue;
            }
            if matches!(node.kind, IntervalKind::Component(_)) {
                node.parent = None;
            } else {
                self.intervals[idx] = None;
                self.free_list.push(idx);
                freed += 1;
            }
        }
        freed
    }

    // --- change tracking ---

    /// Opaque token that changes with every structural or size edit.
    pub fn change_mark(&self) -> u64 {
        self.change_mark
    }

    fn mark_changed(&mut self) {
        self.change_mark = self.change_mark.wrapping_add(1);
    }

    /// Open an edit session; removals are not reported while any session is alive.
    pub fn edit_session(&self) -> EditSession {
        self.session_depth.set(self.session_depth.get() + 1);
        EditSession {
            depth: Rc::clone(&self.session_depth),
        }
    }

    /// Whether an edit session is currently open.
    pub fn in_edit_session(&self) -> bool {
        self.session_depth.get() > 0
    }

    /// Take the queued removal records, oldest first.
    pub fn take_removed_intervals(&mut self) -> Vec<RemovedInterval> {
        core::mem::take(&mut self.removed)
    }

    // --- structure ---

    /// Insert `child` into `parent` at `index` (append when `None`); returns the index used.
    pub fn add_interval(
        &mut self,
        child: IntervalId,
        parent: IntervalId,
        index: Option<usize>,
    ) -> usize {
        debug_assert!(self.node(child).parent.is_none(), "interval already has a parent");
        debug_assert!(child != parent && !self.is_parent_of(child, parent), "cycle");
        debug_assert!(
            match self.node(child).kind {
                IntervalKind::Component(comp) => !self
                    .children(parent)
                    .iter()
                    .any(|&c| self.node(c).kind == IntervalKind::Component(comp)),
                _ => true,
            },
            "component added to a group twice"
        );
        let Some(children) = self.node_mut(parent).kind.children_mut() else {
            debug_assert!(false, "adding into a non-group interval");
            return 0;
        };
        let index = index.unwrap_or(children.len()).min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        self.mark_changed();
        index
    }

    /// Detach `child` from its parent; returns its former index.
    pub fn remove_interval(&mut self, child: IntervalId) -> usize {
        let Some(parent) = self.node(child).parent else {
            debug_assert!(false, "removing a detached interval");
            return 0;
        };
        let Some(index) = self.index_of(parent, child) else {
            debug_assert!(false, "parent does not list the child");
            return 0;
        };
        self.remove_interval_at(parent, index);
        index
    }

    /// Detach the child of `parent` at `index` and return it.
    pub fn remove_interval_at(&mut self, parent: IntervalId, index: usize) -> IntervalId {
        let child = match self.node_mut(parent).kind.children_mut() {
            Some(children) => children.remove(index),
            None => panic!("removing from a non-group interval {parent:?}"),
        };
        let want_resize = self.want_resize(child);
        self.node_mut(child).parent = None;
        if let IntervalKind::Component(component) = self.node(child).kind {
            if !self.in_edit_session() {
                let comp = self.comp(component);
                let axis = if comp.intervals[0] == child {
                    Axis::Horizontal
                } else {
                    Axis::Vertical
                };
                let container = comp.parent;
                self.removed.push(RemovedInterval {
                    component,
                    container,
                    axis,
                    parent,
                    index,
                    want_resize,
                });
            }
        }
        self.mark_changed();
        child
    }

    /// Set the alignment of an interval within its parallel parent.
    pub fn set_interval_alignment(&mut self, id: IntervalId, alignment: Option<Alignment>) {
        let node = self.node_mut(id);
        if node.alignment != alignment {
            node.alignment = alignment;
            self.mark_changed();
        }
    }

    /// Set the alignment a parallel group applies to its default-aligned children.
    pub fn set_group_alignment(&mut self, id: IntervalId, alignment: Alignment) {
        if let IntervalKind::Parallel {
            group_alignment, ..
        } = &mut self.node_mut(id).kind
        {
            if *group_alignment != alignment {
                *group_alignment = alignment;
                self.mark_changed();
            }
        } else {
            debug_assert!(false, "group alignment on a non-parallel interval");
        }
    }

    /// Set min, preferred, and max size of an interval.
    pub fn set_interval_size(&mut self, id: IntervalId, min: i32, pref: i32, max: i32) {
        if !self.is_alive(id) {
            return;
        }
        let node = self.node_mut(id);
        debug_assert!(
            matches!(node.kind, IntervalKind::Gap { .. } | IntervalKind::Component(_))
                || pref == NOT_EXPLICITLY_DEFINED,
            "groups do not have an explicit preferred size"
        );
        if (node.min, node.pref, node.max) != (min, pref, max) {
            node.min = min;
            node.pref = pref;
            node.max = max;
            self.mark_changed();
        }
    }

    /// Set the padding classifier of a gap.
    pub fn set_padding_type(&mut self, id: IntervalId, padding_type: Option<PaddingType>) {
        if !self.is_alive(id) {
            return;
        }
        if let IntervalKind::Gap { padding } = &mut self.node_mut(id).kind {
            if *padding != padding_type {
                *padding = padding_type;
                self.mark_changed();
            }
        }
    }

    /// Set or clear a persistent attribute, counting as a model change.
    pub fn change_interval_attribute(&mut self, id: IntervalId, attr: Attributes, set: bool) {
        if !self.is_alive(id) {
            return;
        }
        let node = self.node_mut(id);
        let before = node.attributes;
        node.attributes.set(attr, set);
        if node.attributes != before {
            self.mark_changed();
        }
    }

    /// Set a design-time attribute; not counted as a model change.
    pub(crate) fn set_attribute(&mut self, id: IntervalId, attr: Attributes) {
        self.node_mut(id).attributes.insert(attr);
    }

    /// Clear a design-time attribute; not counted as a model change.
    pub(crate) fn unset_attribute(&mut self, id: IntervalId, attr: Attributes) {
        self.node_mut(id).attributes.remove(attr);
    }

    pub(crate) fn set_attributes(&mut self, id: IntervalId, attrs: Attributes) {
        self.node_mut(id).attributes = attrs;
    }

    /// Mutable access to the cached geometry of an interval.
    pub fn space_mut(&mut self, id: IntervalId) -> &mut Region {
        &mut self.node_mut(id).space
    }

    // --- components ---

    /// Create a component that is not yet registered or placed anywhere.
    ///
    /// Containers get one empty layer of layout roots.
    pub fn create_component(&mut self, id: &str, container: bool) -> ComponentKey {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ComponentKey uses 32-bit indices by design."
        )]
        let key = ComponentKey(self.components.len() as u32);
        let intervals = [
            self.insert(IntervalKind::Component(key)),
            self.insert(IntervalKind::Component(key)),
        ];
        let mut roots = Vec::new();
        if container {
            roots.push([
                self.new_parallel(Alignment::Leading),
                self.new_parallel(Alignment::Leading),
            ]);
        }
        self.components.push(ComponentNode {
            id: id.into(),
            parent: None,
            intervals,
            roots,
            subcomponents: Vec::new(),
            resizability: None,
            link_size: [None; 2],
            registered: false,
        });
        key
    }

    pub(crate) fn comp(&self, key: ComponentKey) -> &ComponentNode {
        &self.components[key.idx()]
    }

    fn comp_mut(&mut self, key: ComponentKey) -> &mut ComponentNode {
        &mut self.components[key.idx()]
    }

    fn register(&mut self, key: ComponentKey) {
        let mut stack = alloc::vec![key];
        while let Some(k) = stack.pop() {
            let comp = self.comp_mut(k);
            comp.registered = true;
            let id = comp.id.clone();
            stack.extend(comp.subcomponents.iter().copied());
            self.ids.insert(id, k);
        }
    }

    fn unregister(&mut self, key: ComponentKey) {
        let mut stack = alloc::vec![key];
        while let Some(k) = stack.pop() {
            let comp = self.comp_mut(k);
            comp.registered = false;
            let id = comp.id.clone();
            stack.extend(comp.subcomponents.iter().copied());
            if self.ids.get(&id) == Some(&k) {
                self.ids.remove(&id);
            }
        }
    }

    /// Register a top-level component with no parent container.
    pub fn add_root_component(&mut self, key: ComponentKey) {
        self.register(key);
        self.mark_changed();
    }

    /// Place `key` into `container` at `index` (append when `None`) and register it.
    pub fn add_component(
        &mut self,
        key: ComponentKey,
        container: ComponentKey,
        index: Option<usize>,
    ) -> Result<(), LayoutError> {
        if !self.is_container(container) {
            return Err(LayoutError::NotAContainer {
                id: self.comp(container).id.clone(),
            });
        }
        if self.comp(key).parent.is_some() {
            return Err(LayoutError::AlreadyPlaced {
                id: self.comp(key).id.clone(),
            });
        }
        let subs = &mut self.comp_mut(container).subcomponents;
        let index = index.unwrap_or(subs.len()).min(subs.len());
        subs.insert(index, key);
        self.comp_mut(key).parent = Some(container);
        self.register(key);
        self.mark_changed();
        Ok(())
    }

    /// Take `key` out of its container; with `from_model` it is also unregistered.
    ///
    /// Its intervals stay where they are.
    pub fn remove_component(&mut self, key: ComponentKey, from_model: bool) {
        if let Some(parent) = self.comp(key).parent {
            self.comp_mut(parent).subcomponents.retain(|c| *c != key);
            self.comp_mut(key).parent = None;
            self.mark_changed();
        }
        if from_model && self.comp(key).registered {
            self.unregister(key);
            self.mark_changed();
        }
    }

    /// Remove both intervals of `key` from their trees, then the component itself.
    pub fn remove_component_and_intervals(&mut self, key: ComponentKey, from_model: bool) {
        for interval in self.comp(key).intervals {
            if self.node(interval).parent.is_some() {
                self.remove_interval(interval);
            }
        }
        self.remove_component(key, from_model);
    }

    /// Look up a registered component by id.
    pub fn component(&self, id: &str) -> Option<ComponentKey> {
        self.ids.get(id).copied()
    }

    /// Id of a component.
    pub fn component_id(&self, key: ComponentKey) -> &str {
        &self.comp(key).id
    }

    /// The interval of `key` on `axis`.
    pub fn component_interval(&self, key: ComponentKey, axis: Axis) -> IntervalId {
        self.comp(key).intervals[axis.index()]
    }

    /// The container `key` is placed in.
    pub fn component_parent(&self, key: ComponentKey) -> Option<ComponentKey> {
        self.comp(key).parent
    }

    /// Components placed in `container`, in insertion order.
    pub fn subcomponents(&self, container: ComponentKey) -> &[ComponentKey] {
        &self.comp(container).subcomponents
    }

    /// Whether `key` is a design surface with layout roots.
    pub fn is_container(&self, key: ComponentKey) -> bool {
        !self.comp(key).roots.is_empty()
    }

    /// Registered components, in creation order.
    pub fn all_components(&self) -> impl Iterator<Item = ComponentKey> + '_ {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.registered)
            .map(|(i, _)| {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "ComponentKey uses 32-bit indices by design."
                )]
                let idx = i as u32;
                ComponentKey(idx)
            })
    }

    /// Cached resizability of a component, if it was ever queried.
    pub fn resizability(&self, key: ComponentKey) -> Option<[bool; 2]> {
        self.comp(key).resizability
    }

    /// Cache the resizability reported for a component.
    pub fn set_resizability(&mut self, key: ComponentKey, resizability: Option<[bool; 2]>) {
        self.comp_mut(key).resizability = resizability;
    }

    /// Store the current bounds of a component into both of its intervals.
    pub fn set_current_bounds(&mut self, key: ComponentKey, bounds: Rect, baseline: Option<i32>) {
        let region = Region::from_rect(bounds, baseline);
        for interval in self.comp(key).intervals {
            self.node_mut(interval).space = region;
        }
    }

    /// Store the interior bounds of a container into every layout root.
    pub fn set_current_interior(&mut self, container: ComponentKey, interior: Rect) {
        let region = Region::from_rect(interior, None);
        for roots in self.comp(container).roots.clone() {
            for root in roots {
                self.node_mut(root).space = region;
            }
        }
    }

    // --- layers ---

    /// All layers of layout roots of a container; the first one is the default.
    pub fn layout_roots(&self, container: ComponentKey) -> &[[IntervalId; 2]] {
        &self.comp(container).roots
    }

    /// Root of the default layer on `axis`.
    pub fn default_root(&self, container: ComponentKey, axis: Axis) -> Option<IntervalId> {
        self.comp(container).roots.first().map(|r| r[axis.index()])
    }

    /// Index of the layer whose tree contains `interval`.
    pub fn layout_roots_index(&self, container: ComponentKey, interval: IntervalId) -> Option<usize> {
        let root = self.root_of(interval);
        self.comp(container)
            .roots
            .iter()
            .position(|pair| pair.contains(&root))
    }

    /// Roots of the trees holding the intervals of `key`.
    pub fn parent_roots(&self, key: ComponentKey) -> [IntervalId; 2] {
        let [h, v] = self.comp(key).intervals;
        [self.root_of(h), self.root_of(v)]
    }

    /// Append a new, empty layer to a container.
    pub fn add_new_layout_roots(&mut self, container: ComponentKey) -> [IntervalId; 2] {
        let roots = [
            self.new_parallel(Alignment::Leading),
            self.new_parallel(Alignment::Leading),
        ];
        self.comp_mut(container).roots.push(roots);
        self.mark_changed();
        roots
    }

    /// Remove the layer containing `root`; the last layer is never removed.
    pub fn remove_layout_roots(&mut self, container: ComponentKey, root: IntervalId) {
        let comp = self.comp(container);
        if comp.roots.len() < 2 {
            return;
        }
        if let Some(index) = comp.roots.iter().position(|pair| pair.contains(&root)) {
            let pair = self.comp_mut(container).roots.remove(index);
            for r in pair {
                self.discard(r);
            }
            self.mark_changed();
        }
    }

    /// Copy the whole layout of `source` into the empty `target` container.
    ///
    /// Each `(source id, target id)` pair maps a subcomponent of `source` to
    /// the component that takes its place; missing target components are created.
    pub fn copy_container_layout(
        &mut self,
        source: ComponentKey,
        id_map: &[(String, String)],
        target: ComponentKey,
    ) -> Result<(), LayoutError> {
        if !self.subcomponents(target).is_empty() {
            return Err(LayoutError::ContainerNotEmpty {
                id: self.comp(target).id.clone(),
            });
        }
        let mut resolved = Vec::with_capacity(id_map.len());
        for (source_id, target_id) in id_map {
            let src = self
                .component(source_id)
                .ok_or_else(|| LayoutError::unknown(source_id))?;
            let dst = self.component(target_id);
            if dst.is_some_and(|d| self.comp(d).parent == Some(target)) {
                return Err(LayoutError::AlreadyPlaced {
                    id: target_id.clone(),
                });
            }
            resolved.push((src, dst, target_id));
        }
        let mut comp_map: HashMap<ComponentKey, ComponentKey> = HashMap::new();
        for (src, dst, target_id) in resolved {
            let dst = match dst {
                Some(dst) => {
                    if self.comp(dst).parent.is_some() {
                        self.remove_component_and_intervals(dst, false);
                    }
                    dst
                }
                None => {
                    let container = self.is_container(src);
                    self.create_component(target_id, container)
                }
            };
            comp_map.insert(src, dst);
        }
        let old_roots = core::mem::take(&mut self.comp_mut(target).roots);
        for pair in old_roots {
            for r in pair {
                self.discard(r);
            }
        }
        for pair in self.comp(source).roots.clone() {
            let copied = [
                self.copy_tree(pair[0], &comp_map, Axis::Horizontal),
                self.copy_tree(pair[1], &comp_map, Axis::Vertical),
            ];
            self.comp_mut(target).roots.push(copied);
        }
        for &src in &self.comp(source).subcomponents.clone() {
            let Some(&dst) = comp_map.get(&src) else {
                continue;
            };
            self.comp_mut(target).subcomponents.push(dst);
            self.comp_mut(dst).parent = Some(target);
            self.register(dst);
        }
        self.mark_changed();
        Ok(())
    }

    fn copy_tree(
        &mut self,
        source: IntervalId,
        comp_map: &HashMap<ComponentKey, ComponentKey>,
        axis: Axis,
    ) -> IntervalId {
        let copy = self.clone_interval(source);
        for child in self.children(source).to_vec() {
            let sub = match self.node(child).kind {
                IntervalKind::Component(comp) => {
                    let Some(&dst) = comp_map.get(&comp) else {
                        continue;
                    };
                    let interval = self.component_interval(dst, axis);
                    self.copy_interval_properties(child, interval);
                    interval
                }
                _ => self.copy_tree(child, comp_map, axis),
            };
            self.add_interval(sub, copy, None);
        }
        copy
    }

    /// Move the layout and subcomponents of `source` into the empty `target`.
    pub fn move_container_layout(
        &mut self,
        source: ComponentKey,
        target: ComponentKey,
    ) -> Result<(), LayoutError> {
        if !self.subcomponents(target).is_empty() {
            return Err(LayoutError::ContainerNotEmpty {
                id: self.comp(target).id.clone(),
            });
        }
        let roots = core::mem::take(&mut self.comp_mut(source).roots);
        let fresh = [
            self.new_parallel(Alignment::Leading),
            self.new_parallel(Alignment::Leading),
        ];
        self.comp_mut(source).roots.push(fresh);
        let old = core::mem::replace(&mut self.comp_mut(target).roots, roots);
        for pair in old {
            for r in pair {
                self.discard(r);
            }
        }
        let subs = core::mem::take(&mut self.comp_mut(source).subcomponents);
        for &sub in &subs {
            self.comp_mut(sub).parent = Some(target);
        }
        self.comp_mut(target).subcomponents = subs;
        self.mark_changed();
        Ok(())
    }

    // --- link-size groups ---

    /// Link-size group of `key` on `axis`.
    pub fn link_size_id(&self, key: ComponentKey, axis: Axis) -> Option<u32> {
        self.comp(key).link_size[axis.index()]
    }

    /// Whether `key` shares its size on `axis` with other components.
    pub fn is_link_sized(&self, key: ComponentKey, axis: Axis) -> bool {
        self.link_size_id(key, axis).is_some()
    }

    /// All link-size groups on `axis`, keyed by group id.
    pub fn link_size_groups(&self, axis: Axis) -> HashMap<u32, Vec<ComponentKey>> {
        let mut groups: HashMap<u32, Vec<ComponentKey>> = HashMap::new();
        for key in self.all_components() {
            if let Some(id) = self.link_size_id(key, axis) {
                groups.entry(id).or_default().push(key);
            }
        }
        groups
    }

    /// Make the given components share one size on `axis`.
    ///
    /// Components already linked bring their whole group along.
    pub fn set_same_size(&mut self, keys: &[ComponentKey], axis: Axis) {
        if keys.len() < 2 {
            return;
        }
        let merged: HashSet<u32> = keys
            .iter()
            .filter_map(|&k| self.link_size_id(k, axis))
            .collect();
        let id = self.next_link_id;
        self.next_link_id += 1;
        for comp in &mut self.components {
            if comp.link_size[axis.index()].is_some_and(|l| merged.contains(&l)) {
                comp.link_size[axis.index()] = Some(id);
            }
        }
        for &key in keys {
            self.comp_mut(key).link_size[axis.index()] = Some(id);
        }
        self.mark_changed();
    }

    /// Take the given components out of their link-size groups on `axis`.
    pub fn unset_same_size(&mut self, keys: &[ComponentKey], axis: Axis) {
        for &key in keys {
            self.remove_component_from_link_sized_group(key, axis);
        }
    }

    /// Take one component out of its link-size group; a group left with a
    /// single member is dissolved.
    pub fn remove_component_from_link_sized_group(&mut self, key: ComponentKey, axis: Axis) {
        let Some(id) = self.link_size_id(key, axis) else {
            return;
        };
        self.comp_mut(key).link_size[axis.index()] = None;
        let rest: Vec<usize> = self
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.link_size[axis.index()] == Some(id))
            .map(|(i, _)| i)
            .collect();
        if rest.len() == 1 {
            self.components[rest[0]].link_size[axis.index()] = None;
        }
        self.mark_changed();
    }

    // --- integrity ---

    /// Verify the structural invariants of every registered container's trees.
    ///
    /// Checks that parent links are bidirectional, that no interval is its
    /// own ancestor, that non-root groups hold some content, and that no
    /// sequence has two gaps next to each other.
    pub fn check_integrity(&self) -> Result<(), LayoutError> {
        let mut visited: HashSet<IntervalId> = HashSet::new();
        for key in self.all_components() {
            for pair in &self.comp(key).roots {
                for &root in pair {
                    if self.node(root).parent.is_some() {
                        return Err(LayoutError::corrupted(root, "layout root has a parent"));
                    }
                    self.check_tree(root, &mut visited)?;
                }
            }
        }
        Ok(())
    }

    fn check_tree(
        &self,
        root: IntervalId,
        visited: &mut HashSet<IntervalId>,
    ) -> Result<(), LayoutError> {
        let mut stack = alloc::vec![root];
        while let Some(id) = stack.pop() {
            if !self.is_alive(id) {
                return Err(LayoutError::corrupted(id, "dangling interval"));
            }
            if !visited.insert(id) {
                return Err(LayoutError::corrupted(id, "interval reachable twice"));
            }
            let node = self.node(id);
            let children = node.kind.children();
            if id != root && self.is_group(id) {
                if children.iter().all(|&c| self.is_gap(c)) {
                    return Err(LayoutError::corrupted(id, "group without content"));
                }
            }
            if matches!(node.kind, IntervalKind::Sequential { .. })
                && children
                    .windows(2)
                    .any(|w| self.is_gap(w[0]) && self.is_gap(w[1]))
            {
                return Err(LayoutError::corrupted(id, "adjacent gaps in a sequence"));
            }
            for &child in children {
                if !self.is_alive(child) || self.node(child).parent != Some(id) {
                    return Err(LayoutError::corrupted(child, "parent link mismatch"));
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(model: &mut LayoutModel) -> ComponentKey {
        let cont = model.create_component("form", true);
        model.add_root_component(cont);
        cont
    }

    #[test]
    fn add_and_remove_keep_links_bidirectional() {
        let mut model = LayoutModel::new();
        let cont = container(&mut model);
        let root = model.default_root(cont, Axis::Horizontal).unwrap();
        let a = model.create_component("a", false);
        model.add_component(a, cont, None).unwrap();
        let seq = model.new_sequential();
        let gap = model.new_gap(10, 10, 10);
        model.add_interval(seq, root, None);
        model.add_interval(gap, seq, None);
        let ai = model.component_interval(a, Axis::Horizontal);
        assert_eq!(model.add_interval(ai, seq, None), 1);
        assert_eq!(model.parent(ai), Some(seq));
        assert_eq!(model.children(seq), &[gap, ai]);
        assert!(model.check_integrity().is_ok());

        assert_eq!(model.remove_interval(gap), 0);
        assert_eq!(model.parent(gap), None);
        assert_eq!(model.children(seq), &[ai]);
        model.discard(gap);
        assert!(!model.is_alive(gap));
    }

    #[test]
    fn setters_ignore_discarded_ids() {
        let mut model = LayoutModel::new();
        let gap = model.new_gap(10, 10, 10);
        model.discard(gap);
        let mark = model.change_mark();
        model.set_interval_size(gap, 1, 2, 3);
        model.set_padding_type(gap, Some(PaddingType::Separate));
        model.change_interval_attribute(gap, Attributes::FILL, true);
        assert_eq!(model.change_mark(), mark);
        // A fresh interval reusing the slot is not affected.
        let other = model.new_gap(4, 4, 4);
        assert_ne!(other, gap);
        assert_eq!(model.pref_size(other), 4);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn discarded_id_reads_as_detached_gap() {
        let mut model = LayoutModel::new();
        let seq = model.new_sequential();
        let gap = model.new_gap(10, 10, 10);
        model.add_interval(gap, seq, None);
        model.remove_interval(gap);
        model.discard(gap);
        assert_eq!(model.parent(gap), None);
        assert!(model.children(gap).is_empty());
        assert!(!model.space(gap).is_axis_set(Axis::Horizontal));
        model.space_mut(gap).set_axis(Axis::Horizontal, 0, 5);
        assert!(!model.space(gap).is_axis_set(Axis::Horizontal));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "stale interval id")]
    fn discarded_id_asserts_in_debug() {
        let mut model = LayoutModel::new();
        let gap = model.new_gap(10, 10, 10);
        model.discard(gap);
        let _ = model.parent(gap);
    }

    #[test]
    fn removal_outside_session_is_reported() {
        let mut model = LayoutModel::new();
        let cont = container(&mut model);
        let root = model.default_root(cont, Axis::Vertical).unwrap();
        let a = model.create_component("a", false);
        model.add_component(a, cont, None).unwrap();
        let ai = model.component_interval(a, Axis::Vertical);
        model.add_interval(ai, root, None);
        {
            let _session = model.edit_session();
            model.remove_interval(ai);
            assert!(model.in_edit_session());
        }
        assert!(model.take_removed_intervals().is_empty());
        model.add_interval(ai, root, None);
        model.remove_component_and_intervals(a, true);
        let removed = model.take_removed_intervals();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].axis, Axis::Vertical);
        assert_eq!(removed[0].container, Some(cont));
        assert_eq!(removed[0].parent, root);
        assert!(model.component("a").is_none());
    }

    #[test]
    fn change_mark_moves_only_on_real_changes() {
        let mut model = LayoutModel::new();
        let gap = model.new_gap(4, 4, 4);
        let mark = model.change_mark();
        model.set_interval_size(gap, 4, 4, 4);
        assert_eq!(model.change_mark(), mark);
        model.set_interval_size(gap, 4, 6, 4);
        assert_ne!(model.change_mark(), mark);
        let mark = model.change_mark();
        model.set_attribute(gap, Attributes::DESIGN_RESIZING);
        assert_eq!(model.change_mark(), mark);
    }

    #[test]
    fn integrity_rejects_adjacent_gaps_and_empty_groups() {
        let mut model = LayoutModel::new();
        let cont = container(&mut model);
        let root = model.default_root(cont, Axis::Horizontal).unwrap();
        let seq = model.new_sequential();
        model.add_interval(seq, root, None);
        let g1 = model.new_default_gap();
        let g2 = model.new_default_gap();
        model.add_interval(g1, seq, None);
        assert!(matches!(
            model.check_integrity(),
            Err(LayoutError::Corrupted { reason: "group without content", .. })
        ));
        let a = model.create_component("a", false);
        model.add_component(a, cont, None).unwrap();
        model.add_interval(g2, seq, None);
        model.add_interval(model.component_interval(a, Axis::Horizontal), seq, None);
        assert!(matches!(
            model.check_integrity(),
            Err(LayoutError::Corrupted { reason: "adjacent gaps in a sequence", .. })
        ));
    }

    #[test]
    fn layers_and_link_groups() {
        let mut model = LayoutModel::new();
        let cont = container(&mut model);
        let layer = model.add_new_layout_roots(cont);
        assert_eq!(model.layout_roots(cont).len(), 2);
        assert_eq!(model.layout_roots_index(cont, layer[1]), Some(1));
        model.remove_layout_roots(cont, layer[0]);
        assert_eq!(model.layout_roots(cont).len(), 1);
        model.remove_layout_roots(cont, model.default_root(cont, Axis::Horizontal).unwrap());
        assert_eq!(model.layout_roots(cont).len(), 1);

        let a = model.create_component("a", false);
        let b = model.create_component("b", false);
        model.add_component(a, cont, None).unwrap();
        model.add_component(b, cont, None).unwrap();
        model.set_same_size(&[a, b], Axis::Horizontal);
        assert!(model.is_link_sized(a, Axis::Horizontal));
        assert_eq!(model.link_size_groups(Axis::Horizontal).len(), 1);
        model.remove_component_from_link_sized_group(a, Axis::Horizontal);
        assert!(!model.is_link_sized(b, Axis::Horizontal));
    }

    #[test]
    fn move_container_layout_transfers_content() {
        let mut model = LayoutModel::new();
        let src = container(&mut model);
        let dst = container(&mut model);
        let a = model.create_component("a", false);
        model.add_component(a, src, None).unwrap();
        let root = model.default_root(src, Axis::Horizontal).unwrap();
        model.add_interval(model.component_interval(a, Axis::Horizontal), root, None);
        model.move_container_layout(src, dst).unwrap();
        assert_eq!(model.default_root(dst, Axis::Horizontal), Some(root));
        assert_eq!(model.component_parent(a), Some(dst));
        assert!(model.subcomponents(src).is_empty());
        assert_eq!(model.child_count(model.default_root(src, Axis::Horizontal).unwrap()), 0);
    }
}
