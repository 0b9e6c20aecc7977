use crate::change::{perform_unrouted, Change, ChangeContext, ChangeError};
use crate::progress::ProgressSink;

/// An ordered list of changes performed as one unit.
///
/// Children run in order with a cancellation check before each of them. When a
/// child stops execution the remaining children are skipped and the children
/// that already ran are left in effect; the returned
/// [`ChangeError::Interrupted`] carries the rollback for them.
#[derive(Debug)]
pub struct CompositeChange {
    name: String,
    children: Vec<Box<dyn Change>>,
    active: bool,
}

impl CompositeChange {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_children(name, Vec::new())
    }

    pub fn from_children(name: impl Into<String>, children: Vec<Box<dyn Change>>) -> Self {
        Self {
            name: name.into(),
            children,
            active: true,
        }
    }

    pub fn add_change(&mut self, change: impl Change + 'static) {
        self.children.push(Box::new(change));
    }

    pub fn add_boxed(&mut self, change: Box<dyn Change>) {
        self.children.push(change);
    }

    pub fn children(&self) -> &[Box<dyn Change>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Box<dyn Change>] {
        &mut self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn interrupt(
        &self,
        error: ChangeError,
        mut committed: Vec<String>,
        mut undo: Vec<Box<dyn Change>>,
    ) -> ChangeError {
        undo.reverse();
        let cause = match error {
            ChangeError::Interrupted {
                cause,
                committed: nested,
                rollback,
            } => {
                // The nested composite's own rollback runs first.
                committed.extend(nested);
                undo.insert(0, rollback);
                cause
            }
            other => Box::new(other),
        };

        tracing::warn!(
            change = %self.name,
            cause = %cause,
            committed = committed.len(),
            "composite change stopped; performed children stay in effect"
        );
        ChangeError::Interrupted {
            cause,
            committed,
            rollback: Box::new(CompositeChange::from_children(self.name.clone(), undo)),
        }
    }
}

impl Change for CompositeChange {
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
        ctx: &mut ChangeContext<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<Box<dyn Change>, ChangeError> {
        progress.begin_task(&self.name, self.children.len());
        let mut undo: Vec<Box<dyn Change>> = Vec::with_capacity(self.children.len());
        let mut committed = Vec::new();

        for index in 0..self.children.len() {
            if ctx.is_cancelled() {
                return Err(self.interrupt(ChangeError::Cancelled, committed, undo));
            }

            let child = self.children[index].as_mut();
            let name = child.name().to_owned();
            if !child.is_active() {
                progress.worked(1);
                continue;
            }
            match perform_unrouted(child, ctx, progress) {
                Ok(inverse) => {
                    committed.push(name);
                    undo.push(inverse);
                }
                Err(err) => {
                    if let Err(err) = ctx.handle(&name, err) {
                        return Err(self.interrupt(err, committed, undo));
                    }
                }
            }
            progress.worked(1);
        }
        progress.done();

        tracing::debug!(
            change = %self.name,
            performed = committed.len(),
            "composite change performed"
        );
        undo.reverse();
        Ok(Box::new(CompositeChange::from_children(self.name.clone(), undo)))
    }
}
