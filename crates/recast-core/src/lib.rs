//! Core text primitives for Recast.
//!
//! This crate owns everything that touches raw text:
//! - [`Region`] and [`FileId`], the coordinates every other layer speaks in
//! - [`EditTree`], an arena of insert/delete/replace/copy/move edits with the
//!   containment and non-overlap invariants enforced at construction time
//! - [`Buffer`], the immutable text snapshot edits are applied to, producing a
//!   new snapshot plus a [`RegionMap`] for tracking regions through the change
//!
//! Nothing in here performs I/O or keeps global state; change orchestration lives
//! in `recast-refactor`.

mod buffer;
mod edit;
mod remap;
mod text;

pub use buffer::{apply, preview, ApplyError, ApplyOutcome, Buffer};
pub use edit::{EditId, EditKind, EditNode, EditTree, MalformedEditError};
pub use remap::{Delta, RegionMap, RemapError};
pub use text::{FileId, Region};
