/// Receives progress reports while changes are performed.
///
/// Units are abstract; a change announces how many it will report with
/// [`ProgressSink::begin_task`] and then reports them with
/// [`ProgressSink::worked`].
pub trait ProgressSink {
    fn begin_task(&mut self, name: &str, total: usize);

    fn worked(&mut self, units: usize);

    fn done(&mut self);
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn begin_task(&mut self, _name: &str, _total: usize) {}

    fn worked(&mut self, _units: usize) {}

    fn done(&mut self) {}
}

/// Logs progress at `debug` level.
#[derive(Clone, Debug, Default)]
pub struct TracingProgress {
    task: Option<String>,
    total: usize,
    completed: usize,
}

impl TracingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

impl ProgressSink for TracingProgress {
    fn begin_task(&mut self, name: &str, total: usize) {
        tracing::debug!(task = name, total, "task started");
        self.task = Some(name.to_owned());
        self.total = total;
        self.completed = 0;
    }

    fn worked(&mut self, units: usize) {
        self.completed = self.completed.saturating_add(units);
        tracing::debug!(
            task = self.task.as_deref().unwrap_or(""),
            completed = self.completed,
            total = self.total,
            "progress"
        );
    }

    fn done(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!(task = %task, completed = self.completed, "task finished");
        }
    }
}
