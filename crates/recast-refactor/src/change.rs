//! The change abstraction and the context changes are performed in.
//!
//! A [`Change`] mutates a [`TextStore`] and hands back the change that undoes it.
//! Failures are routed through the context's [`ExceptionHandler`], which decides
//! whether execution continues, aborts, or fails.

use std::fmt;

use recast_core::{ApplyError, MalformedEditError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::composite::CompositeChange;
use crate::progress::ProgressSink;
use crate::store::{StoreError, TextStore};

#[derive(Debug, Error)]
pub enum ChangeError {
    /// The exception handler decided to stop. This is the expected way for a
    /// change tree to give up and is not a bug.
    #[error("change `{change}` aborted: {reason}")]
    Aborted { change: String, reason: String },
    #[error("change execution was cancelled")]
    Cancelled,
    #[error("change `{change}` failed: {detail}")]
    Failed { change: String, detail: String },
    /// A change that is not backed by an edit tree could not be performed.
    #[error("change `{change}` could not be performed: {message}")]
    Perform { change: String, message: String },
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Edit(#[from] MalformedEditError),
    /// A composite stopped part-way. Children performed before the failure stay
    /// in effect; `rollback` undoes them when performed.
    #[error("{cause}")]
    Interrupted {
        cause: Box<ChangeError>,
        committed: Vec<String>,
        rollback: Box<CompositeChange>,
    },
}

impl ChangeError {
    /// Errors that already carry a decision (abort, cancel, failure) and must not
    /// be handed to an exception handler again.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            ChangeError::Aborted { .. }
                | ChangeError::Cancelled
                | ChangeError::Failed { .. }
                | ChangeError::Interrupted { .. }
        )
    }

    /// The error that stopped execution, looking through [`ChangeError::Interrupted`].
    pub fn cause(&self) -> &ChangeError {
        match self {
            ChangeError::Interrupted { cause, .. } => cause.cause(),
            other => other,
        }
    }

    /// Names of the changes that were performed before execution stopped.
    pub fn committed(&self) -> &[String] {
        match self {
            ChangeError::Interrupted { committed, .. } => committed,
            _ => &[],
        }
    }

    /// Takes the partial rollback out of an interrupted composite, leaving an empty
    /// one behind.
    pub fn take_rollback(&mut self) -> Option<CompositeChange> {
        match self {
            ChangeError::Interrupted { rollback, .. } => {
                let name = rollback.name().to_owned();
                Some(std::mem::replace(rollback.as_mut(), CompositeChange::new(name)))
            }
            _ => None,
        }
    }
}

/// What to do about a failed change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Treat the change as a no-op and keep going.
    Continue,
    /// Stop the whole change tree.
    Abort,
    /// Stop and report the failure with the given detail.
    Failure(String),
}

pub trait ExceptionHandler {
    fn handle(&mut self, change: &str, error: &ChangeError) -> HandlerOutcome;
}

/// Logs the failure and aborts. This is the default handler.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbortChangeHandler;

impl ExceptionHandler for AbortChangeHandler {
    fn handle(&mut self, change: &str, error: &ChangeError) -> HandlerOutcome {
        tracing::warn!(change, error = %error, "change failed; aborting");
        HandlerOutcome::Abort
    }
}

/// Logs the failure and skips the change.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContinueChangeHandler;

impl ExceptionHandler for ContinueChangeHandler {
    fn handle(&mut self, change: &str, error: &ChangeError) -> HandlerOutcome {
        tracing::warn!(change, error = %error, "change failed; continuing");
        HandlerOutcome::Continue
    }
}

/// The handler matching the configured failure policy.
pub fn handler_for(config: &recast_config::ChangesConfig) -> Box<dyn ExceptionHandler> {
    if config.abort_on_failure {
        Box::new(AbortChangeHandler)
    } else {
        Box::new(ContinueChangeHandler)
    }
}

/// Everything a change needs while it is performed.
pub struct ChangeContext<'a> {
    store: &'a mut dyn TextStore,
    handler: Box<dyn ExceptionHandler>,
    cancel: CancellationToken,
}

impl<'a> ChangeContext<'a> {
    pub fn new(store: &'a mut dyn TextStore) -> Self {
        Self {
            store,
            handler: Box::new(AbortChangeHandler),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_handler(mut self, handler: Box<dyn ExceptionHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &dyn TextStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn TextStore {
        &mut *self.store
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Routes a failure of `change` through the exception handler.
    ///
    /// `Ok(())` means the caller should treat the change as a no-op. Errors that
    /// already carry a decision are returned unchanged.
    pub fn handle(&mut self, change: &str, error: ChangeError) -> Result<(), ChangeError> {
        if error.is_control_flow() {
            return Err(error);
        }
        match self.handler.handle(change, &error) {
            HandlerOutcome::Continue => Ok(()),
            HandlerOutcome::Abort => Err(ChangeError::Aborted {
                change: change.to_owned(),
                reason: error.to_string(),
            }),
            HandlerOutcome::Failure(detail) => Err(ChangeError::Failed {
                change: change.to_owned(),
                detail,
            }),
        }
    }
}

impl fmt::Debug for ChangeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// A unit of work against a [`TextStore`] that knows how to undo itself.
///
/// Use [`execute`] rather than calling [`Change::perform`] directly; it skips
/// inactive changes and guarantees [`Change::performed`] runs.
pub trait Change: fmt::Debug {
    fn name(&self) -> &str;

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    fn about_to_perform(&mut self, _ctx: &ChangeContext<'_>, _progress: &mut dyn ProgressSink) {}

    /// Performs the change and returns the change that reverts it.
    fn perform(
        &mut self,
        ctx: &mut ChangeContext<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Box<dyn Change>, ChangeError>;

    /// Called once after `perform`, whether it succeeded, failed or panicked.
    fn performed(&mut self) {}
}

/// Runs the perform protocol for one change.
///
/// Inactive changes are skipped and yield a [`NullChange`] as their undo. A
/// failure is handed to the context's [`ExceptionHandler`]; when it continues,
/// the change counts as a no-op and its undo is a [`NullChange`].
pub fn execute(
    change: &mut dyn Change,
    ctx: &mut ChangeContext<'_>,
    progress: &mut dyn ProgressSink,
) -> Result<Box<dyn Change>, ChangeError> {
    match perform_unrouted(change, ctx, progress) {
        Ok(undo) => Ok(undo),
        Err(err) => {
            ctx.handle(change.name(), err)?;
            Ok(Box::new(NullChange::new(change.name())))
        }
    }
}

/// [`execute`] without consulting the handler; a composite routes its
/// children's failures itself.
pub(crate) fn perform_unrouted(
    change: &mut dyn Change,
    ctx: &mut ChangeContext<'_>,
    progress: &mut dyn ProgressSink,
) -> Result<Box<dyn Change>, ChangeError> {
    if !change.is_active() {
        tracing::debug!(change = change.name(), "skipping inactive change");
        return Ok(Box::new(NullChange::new(change.name())));
    }

    struct PerformedGuard<'c>(&'c mut dyn Change);

    impl Drop for PerformedGuard<'_> {
        fn drop(&mut self) {
            self.0.performed();
        }
    }

    let mut guard = PerformedGuard(change);
    guard.0.about_to_perform(ctx, progress);
    tracing::debug!(change = guard.0.name(), "performing change");
    guard.0.perform(ctx, progress)
}

/// A change that does nothing; its undo is another `NullChange`.
#[derive(Clone, Debug)]
pub struct NullChange {
    name: String,
    active: bool,
}

impl NullChange {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
        }
    }
}

impl Change for NullChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn perform(
        &mut self,
        _ctx: &mut ChangeContext<'_>,
        _progress: &mut dyn ProgressSink,
    ) -> Result<Box<dyn Change>, ChangeError> {
        Ok(Box::new(NullChange::new(self.name.clone())))
    }
}
