// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tunable distances and limits of the interactive designer.

/// Empirical thresholds used while snapping and placing components.
///
/// The defaults reproduce the usual feel of the designer; hosts with very
/// different pixel densities may want to scale the distances.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tuning {
    /// How close (in pixels) an edge must get to snap.
    pub snap_distance: i32,
    /// Orthogonal distance within which neighbors still count as adjacent.
    pub ortho_distance: i32,
    /// Length of the tips drawn past guide line ends.
    pub guide_tip: i32,
    /// Overlap tolerated when painting feedback next to components.
    pub feedback_overlap: i32,
    /// How many unaligned parallel levels a resized edge may cross when
    /// aligning with another interval.
    pub max_unaligned_depth: usize,
    /// Slack when testing vertical overlap of components sitting in a row.
    pub vertical_overlap_margin: i32,
    /// Offset applied to pasted copies that would land on their originals.
    pub copy_shift: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            snap_distance: 8,
            ortho_distance: 8,
            guide_tip: 8,
            feedback_overlap: 10,
            max_unaligned_depth: 1,
            vertical_overlap_margin: 4,
            copy_shift: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Tuning;

    #[test]
    fn defaults() {
        let tuning = Tuning::default();
        assert_eq!(tuning.snap_distance, 8);
        assert_eq!(tuning.max_unaligned_depth, 1);
    }
}
