//! Drives a refactoring from its condition checks to a recorded undo entry.

use recast_config::ChangesConfig;
use tokio_util::sync::CancellationToken;

use crate::change::{execute, handler_for, Change, ChangeContext, ChangeError};
use crate::progress::ProgressSink;
use crate::status::RefactoringStatus;
use crate::store::TextStore;
use crate::undo::UndoManager;

pub trait Refactoring {
    fn name(&self) -> String;

    /// Cheap checks that decide whether the refactoring applies at all.
    fn check_initial_conditions(&mut self, store: &dyn TextStore) -> RefactoringStatus;

    /// Checks that need the computed edits.
    fn check_final_conditions(&mut self, store: &dyn TextStore) -> RefactoringStatus;

    fn create_change(&mut self, store: &dyn TextStore) -> Result<Box<dyn Change>, ChangeError>;
}

#[derive(Debug)]
pub struct RunReport {
    pub status: RefactoringStatus,
    /// Whether the change was performed and recorded for undo.
    pub performed: bool,
}

#[derive(Debug, Default)]
pub struct RefactoringRunner {
    config: ChangesConfig,
    cancel: CancellationToken,
}

impl RefactoringRunner {
    pub fn new(config: ChangesConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Checks, creates and performs `refactoring`.
    ///
    /// A `Fatal` status from either check stops the run before anything is
    /// changed; the report says so. When performing fails part-way and
    /// `rollback_on_abort` is set, the children that already ran are undone before
    /// the error is returned; otherwise the error still carries their rollback.
    pub fn run(
        &self,
        refactoring: &mut dyn Refactoring,
        store: &mut dyn TextStore,
        undo: &mut UndoManager,
        progress: &mut dyn ProgressSink,
    ) -> Result<RunReport, ChangeError> {
        let name = refactoring.name();
        let _span = tracing::debug_span!("refactoring", name = %name).entered();

        let mut status = refactoring.check_initial_conditions(&*store);
        if status.has_fatal_error() {
            tracing::debug!(severity = %status.severity(), "initial conditions failed");
            return Ok(RunReport {
                status,
                performed: false,
            });
        }
        status.merge(refactoring.check_final_conditions(&*store));
        if status.has_fatal_error() {
            tracing::debug!(severity = %status.severity(), "final conditions failed");
            return Ok(RunReport {
                status,
                performed: false,
            });
        }

        let mut change = refactoring.create_change(&*store)?;
        let result = {
            let mut ctx = ChangeContext::new(&mut *store)
                .with_handler(handler_for(&self.config))
                .with_cancellation(self.cancel.clone());
            execute(change.as_mut(), &mut ctx, progress)
        };

        match result {
            Ok(inverse) => {
                undo.add_undo(name, inverse);
                Ok(RunReport {
                    status,
                    performed: true,
                })
            }
            Err(mut err) => {
                if self.config.rollback_on_abort {
                    if let Some(mut rollback) = err.take_rollback() {
                        tracing::warn!(
                            committed = err.committed().len(),
                            "rolling back partially performed refactoring"
                        );
                        let mut ctx = ChangeContext::new(&mut *store);
                        execute(&mut rollback, &mut ctx, progress)?;
                    }
                }
                Err(err)
            }
        }
    }
}
