// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared vocabulary: axes, alignment points, size sentinels, paddings, and interval attributes.

/// One of the two independent layout dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left to right.
    Horizontal,
    /// Top to bottom.
    Vertical,
}

impl Axis {
    /// Both axes, horizontal first.
    pub const BOTH: [Self; 2] = [Self::Horizontal, Self::Vertical];

    /// Index usable for per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Horizontal => 0,
            Self::Vertical => 1,
        }
    }

    /// The orthogonal axis.
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    /// Alignment points that are meaningful on this axis.
    ///
    /// Baseline only exists vertically.
    pub const fn points(self) -> &'static [Alignment] {
        match self {
            Self::Horizontal => &[Alignment::Leading, Alignment::Trailing, Alignment::Center],
            Self::Vertical => &[
                Alignment::Leading,
                Alignment::Trailing,
                Alignment::Center,
                Alignment::Baseline,
            ],
        }
    }
}

/// A point along an axis that intervals can be anchored to.
///
/// Places where an interval may also inherit its parent's alignment use
/// `Option<Alignment>`, with `None` meaning "default".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Left or top edge.
    Leading,
    /// Right or bottom edge.
    Trailing,
    /// Midpoint.
    Center,
    /// Text baseline (vertical only).
    Baseline,
}

impl Alignment {
    /// The two edges, leading first.
    pub const EDGES: [Self; 2] = [Self::Leading, Self::Trailing];

    /// Index usable for per-point arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Leading => 0,
            Self::Trailing => 1,
            Self::Center => 2,
            Self::Baseline => 3,
        }
    }

    /// The opposite edge. Center and baseline map to themselves.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Leading => Self::Trailing,
            Self::Trailing => Self::Leading,
            other => other,
        }
    }

    /// Whether this is the leading or trailing edge.
    #[inline]
    pub const fn is_edge(self) -> bool {
        matches!(self, Self::Leading | Self::Trailing)
    }

    /// `-1` for leading, `1` otherwise; the direction of travel away from the edge's interior.
    #[inline]
    pub(crate) const fn step(self) -> isize {
        match self {
            Self::Leading => -1,
            _ => 1,
        }
    }

    /// `-1` for leading, `1` otherwise, as a pixel multiplier.
    #[inline]
    pub(crate) const fn sign(self) -> i32 {
        match self {
            Self::Leading => -1,
            _ => 1,
        }
    }
}

/// What a gesture does to a formation on one axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Motion {
    /// The whole formation moves.
    Move,
    /// The given edge moves; the other stays fixed.
    Resize(Alignment),
    /// Nothing changes on this axis.
    Fixed,
}

impl Motion {
    /// The resized edge, if this is a resize.
    #[inline]
    pub const fn resizing_edge(self) -> Option<Alignment> {
        match self {
            Self::Resize(edge) => Some(edge),
            _ => None,
        }
    }
}

/// Classifier of a default gap, resolved to pixels by the visual oracle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PaddingType {
    /// Space between related components.
    Related,
    /// Space between unrelated components.
    Unrelated,
    /// Space separating distinct sections.
    Separate,
    /// Indentation of a component below another one.
    Indent,
}

impl PaddingType {
    /// All padding kinds in increasing order of size, indent last.
    pub const ALL: [Self; 4] = [Self::Related, Self::Unrelated, Self::Separate, Self::Indent];
}

/// Size value meaning "use the default": the preferred size of a component or
/// the platform padding of a gap.
pub const NOT_EXPLICITLY_DEFINED: i32 = -1;

/// Size value meaning "same as the preferred size".
pub const USE_PREFERRED_SIZE: i32 = -2;

/// Maximum size used for intervals that can grow without bound.
pub const INFINITE_SIZE: i32 = i16::MAX as i32;

/// Smallest representable layout coordinate; used as "no such size".
pub(crate) const NO_SIZE: i32 = i16::MIN as i32;

bitflags::bitflags! {
    /// Structural and design-time markers carried by an interval.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attributes: u16 {
        /// The component fills the space of its group instead of keeping its size.
        const FILL = 1;
        /// The component used to fill before it was made resizing.
        const FORMER_FILL = 1 << 1;
        /// Gap absorbing the difference between the container size and its content.
        const DESIGN_CONTAINER_GAP = 1 << 2;
        /// Interval resizes only while designing.
        const DESIGN_RESIZING = 1 << 3;
        /// Interval keeps its size only while designing.
        const DESIGN_SUPPRESSED_RESIZING = 1 << 4;
        /// Parallel group that must not be treated as open at either edge.
        const CLOSED_GROUP = 1 << 5;
        /// Transient marker: aligned on the leading side during an align gesture.
        const ALIGN_PRE = 1 << 6;
        /// Transient marker: aligned on the trailing side during an align gesture.
        const ALIGN_POST = 1 << 7;
        /// Gap size forced back to default padding.
        const FORCED_DEFAULT = 1 << 8;

        /// Attributes that only matter while designing.
        const DESIGN_ATTRS = Self::DESIGN_CONTAINER_GAP.bits()
            | Self::DESIGN_RESIZING.bits()
            | Self::DESIGN_SUPPRESSED_RESIZING.bits()
            | Self::ALIGN_PRE.bits()
            | Self::ALIGN_POST.bits();
        /// Attributes that survive copying.
        const PERSISTENT = Self::FILL.bits() | Self::FORMER_FILL.bits() | Self::CLOSED_GROUP.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_only_swaps_edges() {
        assert_eq!(Alignment::Leading.opposite(), Alignment::Trailing);
        assert_eq!(Alignment::Trailing.opposite(), Alignment::Leading);
        assert_eq!(Alignment::Center.opposite(), Alignment::Center);
        assert_eq!(Alignment::Baseline.opposite(), Alignment::Baseline);
    }

    #[test]
    fn baseline_is_vertical_only() {
        assert!(!Axis::Horizontal.points().contains(&Alignment::Baseline));
        assert!(Axis::Vertical.points().contains(&Alignment::Baseline));
        assert_eq!(Axis::Horizontal.other(), Axis::Vertical);
    }

    #[test]
    fn design_attrs_mask() {
        let attrs = Attributes::FILL | Attributes::DESIGN_RESIZING;
        assert!(attrs.intersects(Attributes::DESIGN_ATTRS));
        assert_eq!(attrs & Attributes::PERSISTENT, Attributes::FILL);
        assert_eq!(INFINITE_SIZE, 32767);
    }
}
