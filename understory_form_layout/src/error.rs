// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported at the designer boundary.

use alloc::string::String;

use thiserror::Error;

use crate::model::IntervalId;

/// Result alias used by the fallible designer verbs.
pub type Result<T> = core::result::Result<T, LayoutError>;

/// A rejected verb, or a structural problem found by an integrity check.
///
/// Verbs that return an error have not mutated the layout.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// No component with this id is registered in the model.
    #[error("unknown component: {id}")]
    UnknownComponent {
        /// The unresolved id.
        id: String,
    },

    /// The target container id does not resolve to a component.
    #[error("unknown container: {id}")]
    UnknownContainer {
        /// The unresolved id.
        id: String,
    },

    /// The component exists but has no layout roots.
    #[error("component is not a layout container: {id}")]
    NotAContainer {
        /// The component id.
        id: String,
    },

    /// The component is already part of the target container.
    #[error("component is already placed in the target container: {id}")]
    AlreadyPlaced {
        /// The component id.
        id: String,
    },

    /// The component is not placed in any container.
    #[error("component is not placed in a container: {id}")]
    NotPlaced {
        /// The component id.
        id: String,
    },

    /// The operation needs an empty container.
    #[error("container is not empty: {id}")]
    ContainerNotEmpty {
        /// The container id.
        id: String,
    },

    /// Parallel argument slices differ in length.
    #[error("mismatched argument lengths: {ids} ids, {bounds} bounds")]
    MismatchedLengths {
        /// Number of component ids.
        ids: usize,
        /// Number of rectangles.
        bounds: usize,
    },

    /// The verb needs at least one component.
    #[error("no components given")]
    EmptySelection,

    /// The selected components do not share one parent container.
    #[error("components are not in the same container")]
    DifferentContainers,

    /// `move_to` or `end_moving` was called without a started gesture.
    #[error("no gesture in progress")]
    NoActiveGesture,

    /// The interval tree violates a structural invariant.
    #[error("corrupted layout at {interval:?}: {reason}")]
    Corrupted {
        /// The offending interval.
        interval: IntervalId,
        /// Which rule is broken.
        reason: &'static str,
    },
}

impl LayoutError {
    pub(crate) fn unknown(id: &str) -> Self {
        Self::UnknownComponent { id: id.into() }
    }

    pub(crate) fn corrupted(interval: IntervalId, reason: &'static str) -> Self {
        Self::Corrupted { interval, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::LayoutError;
    use alloc::string::ToString;

    #[test]
    fn messages_name_the_offender() {
        assert_eq!(
            LayoutError::unknown("button1").to_string(),
            "unknown component: button1"
        );
        let err = LayoutError::MismatchedLengths { ids: 2, bounds: 3 };
        assert_eq!(err.to_string(), "mismatched argument lengths: 2 ids, 3 bounds");
    }
}
