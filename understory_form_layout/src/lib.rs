// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_form_layout --heading-base-level=0

//! Understory Form Layout: the editing engine of a visual form designer.
//!
//! A form is laid out by two trees of intervals per container, one per axis, in the manner of a
//! group layout: sequential groups place children one after another, parallel groups stack them
//! on the same span, and gaps hold the space between. This crate turns interactive gestures
//! (drag-to-add, drag-to-move, drag-to-resize, align, duplicate, enclose in container) into small,
//! deterministic edits of those trees that keep the form looking the way the user left it.
//!
//! It is not a constraint solver and not a layout engine in the measuring sense. Real pixel
//! geometry comes from the host through a [`VisualMapper`]; the crate reads it back after every
//! layout pass and only ever restructures the trees.
//!
//! ## API overview
//!
//! - [`LayoutModel`]: arena of intervals and the components owning them, with generational
//!   [`IntervalId`]s, layout layers, link-size groups, and an [`EditSession`] guard.
//! - [`Dragger`]: per-gesture position finder. Each step snaps the dragged formation next to or
//!   aligned with existing content and never writes to the model.
//! - [`Feeder`]: commits a finished gesture into the trees.
//! - [`Operations`]: the shared structural edits (extract, add content, gap handling, group
//!   dissolution).
//! - [`Designer`]: the facade a host drives. It owns the model and the mapper, exposes the
//!   gesture verbs, and repairs the trees after every edit.
//!
//! A typical gesture:
//!
//! - [`Designer::start_adding`] or [`Designer::start_moving`] or [`Designer::start_resizing`]
//! - [`Designer::move_to`] for every pointer step, with [`Designer::paint_move_feedback`]
//! - [`Designer::end_moving`] to commit or cancel
//! - [`Designer::update_current_state`] once the host has laid the form out again
//!
//! ## Ambient behavior
//!
//! Verbs report bad input with [`LayoutError`] before touching the model. Tunable distances live
//! in [`Tuning`]. The crate emits `tracing` events at verb boundaries and installs no subscriber.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod config;
pub mod designer;
pub mod dragger;
pub mod error;
pub mod feeder;
pub mod mapper;
pub mod model;
pub mod ops;
pub mod region;
pub mod types;

mod interval;
mod utils;

pub use config::Tuning;
pub use designer::{AdjustableAlignment, Designer, DragStep};
pub use dragger::{Dragger, Operation, PositionDef, SizeDef};
pub use error::{LayoutError, Result};
pub use feeder::{Feeder, InsertOutcome};
pub use mapper::{BadgeAxes, FeedbackPainter, FeedbackShape, Paddings, TableMapper, VisualMapper};
pub use model::{ComponentKey, EditSession, GroupKind, IntervalId, IntervalKind, LayoutModel, RemovedInterval};
pub use ops::{Operations, RemainderList};
pub use region::{Region, UNKNOWN};
pub use types::{
    Alignment, Attributes, Axis, INFINITE_SIZE, Motion, NOT_EXPLICITLY_DEFINED, PaddingType, USE_PREFERRED_SIZE,
};
pub use utils::{ComponentIntervals, size_of_default_gap, sizes_of_default_gap};
