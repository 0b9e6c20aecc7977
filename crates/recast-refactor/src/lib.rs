//! Change transactions for Recast.
//!
//! Edit trees from `recast-core` describe what to do to a single buffer. This crate
//! turns them into performable, undoable changes across a [`TextStore`]:
//! - [`TextChange`] and [`CompositeChange`] with a pluggable [`ExceptionHandler`]
//! - [`UndoManager`] for undo/redo history
//! - [`RefactoringStatus`] for pre-condition findings
//! - rename consistency checking ([`check_rename_consistency`]) and the
//!   [`RenameRefactoring`] built on it
//! - multi-file previews with unified diffs ([`generate_preview`])

mod change;
mod composite;
mod preview;
mod progress;
mod refactoring;
mod rename;
mod status;
mod store;
mod text_change;
mod undo;
mod validate;

pub use change::{
    execute, handler_for, AbortChangeHandler, Change, ChangeContext, ChangeError,
    ContinueChangeHandler, ExceptionHandler, HandlerOutcome, NullChange,
};
pub use composite::CompositeChange;
pub use preview::{generate_preview, FilePreview, RefactoringPreview};
pub use progress::{NullProgress, ProgressSink, TracingProgress};
pub use refactoring::{Refactoring, RefactoringRunner, RunReport};
pub use rename::RenameRefactoring;
pub use status::{RefactoringStatus, Severity, StatusEntry};
pub use store::{InMemoryWorkspace, StoreError, TextStore};
pub use text_change::{TextChange, TextChangeManager};
pub use undo::{ListenerId, UndoEntry, UndoListener, UndoManager};
pub use validate::{
    analyze_rename_changes, check_rename_consistency, group_by_file, scratch_copies, Occurrence,
    OccurrenceGroup, SearchOracle,
};

pub use recast_core::{Buffer, EditId, EditTree, FileId, Region};
