//! Undo/redo history of performed changes.

use recast_config::UndoConfig;

use crate::change::{execute, Change, ChangeContext, ChangeError};
use crate::progress::ProgressSink;

#[derive(Debug)]
pub struct UndoEntry {
    pub name: String,
    pub change: Box<dyn Change>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Observes the stack depths of an [`UndoManager`].
pub trait UndoListener {
    fn undo_stack_changed(&mut self, depth: usize);

    fn redo_stack_changed(&mut self, depth: usize);
}

#[derive(Default)]
pub struct UndoManager {
    undo: Vec<UndoEntry>,
    redo: Vec<UndoEntry>,
    listeners: Vec<(ListenerId, Box<dyn UndoListener>)>,
    next_listener: u64,
    limit: Option<usize>,
}

impl std::fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoManager")
            .field("undo", &self.undo)
            .field("redo", &self.redo)
            .field("listeners", &self.listeners.len())
            .field("limit", &self.limit)
            .finish()
    }
}

impl UndoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &UndoConfig) -> Self {
        Self {
            limit: config.limit,
            ..Self::default()
        }
    }

    /// Records `change` as the undo of something just performed. Clears the redo
    /// stack.
    pub fn add_undo(&mut self, name: impl Into<String>, change: Box<dyn Change>) {
        self.undo.push(UndoEntry {
            name: name.into(),
            change,
        });
        if let Some(limit) = self.limit {
            if self.undo.len() > limit {
                let dropped = self.undo.len() - limit;
                self.undo.drain(..dropped);
            }
        }
        let had_redo = !self.redo.is_empty();
        self.redo.clear();

        self.notify_undo();
        if had_redo {
            self.notify_redo();
        }
    }

    /// Undoes the most recent change and records its inverse for redo.
    ///
    /// Returns the name of the undone entry, or `None` when there was nothing to
    /// undo. A failed undo leaves the store in an unknown state relative to the
    /// history, so both stacks are flushed.
    pub fn perform_undo(
        &mut self,
        ctx: &mut ChangeContext<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Option<String>, ChangeError> {
        let Some(mut entry) = self.undo.pop() else {
            return Ok(None);
        };
        self.notify_undo();

        match execute(entry.change.as_mut(), ctx, progress) {
            Ok(redo) => {
                self.redo.push(UndoEntry {
                    name: entry.name.clone(),
                    change: redo,
                });
                self.notify_redo();
                Ok(Some(entry.name))
            }
            Err(err) => {
                tracing::warn!(change = %entry.name, error = %err, "undo failed; flushing history");
                self.flush();
                Err(err)
            }
        }
    }

    /// Symmetric to [`UndoManager::perform_undo`].
    pub fn perform_redo(
        &mut self,
        ctx: &mut ChangeContext<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Option<String>, ChangeError> {
        let Some(mut entry) = self.redo.pop() else {
            return Ok(None);
        };
        self.notify_redo();

        match execute(entry.change.as_mut(), ctx, progress) {
            Ok(undo) => {
                self.undo.push(UndoEntry {
                    name: entry.name.clone(),
                    change: undo,
                });
                self.notify_undo();
                Ok(Some(entry.name))
            }
            Err(err) => {
                tracing::warn!(change = %entry.name, error = %err, "redo failed; flushing history");
                self.flush();
                Err(err)
            }
        }
    }

    pub fn anything_to_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn anything_to_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn peek_undo_name(&self) -> Option<&str> {
        self.undo.last().map(|entry| entry.name.as_str())
    }

    pub fn peek_redo_name(&self) -> Option<&str> {
        self.redo.last().map(|entry| entry.name.as_str())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn flush(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.notify_undo();
        self.notify_redo();
    }

    pub fn add_listener(&mut self, listener: Box<dyn UndoListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    fn notify_undo(&mut self) {
        let depth = self.undo.len();
        for (_, listener) in &mut self.listeners {
            listener.undo_stack_changed(depth);
        }
    }

    fn notify_redo(&mut self) {
        let depth = self.redo.len();
        for (_, listener) in &mut self.listeners {
            listener.redo_stack_changed(depth);
        }
    }
}
