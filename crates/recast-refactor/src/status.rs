//! Accumulated findings of refactoring pre-condition checks.

use std::fmt;

use recast_core::{FileId, Region};
use serde::Serialize;

/// Ordered from harmless to blocking; the severity of a status is the maximum
/// over its entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Ok,
    Info,
    Warning,
    Error,
    /// The refactoring cannot continue.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Ok => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub severity: Severity,
    pub message: String,
    pub context: Option<(FileId, Region)>,
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some((file, region)) => {
                write!(f, "{}: {} ({file} {region})", self.severity, self.message)
            }
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefactoringStatus {
    entries: Vec<StatusEntry>,
}

impl RefactoringStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        let mut status = Self::new();
        status.add_fatal_error(message, None);
        status
    }

    pub fn add_entry(&mut self, entry: StatusEntry) {
        self.entries.push(entry);
    }

    fn push(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        context: Option<(FileId, Region)>,
    ) {
        self.add_entry(StatusEntry {
            severity,
            message: message.into(),
            context,
        });
    }

    pub fn add_info(&mut self, message: impl Into<String>, context: Option<(FileId, Region)>) {
        self.push(Severity::Info, message, context);
    }

    pub fn add_warning(&mut self, message: impl Into<String>, context: Option<(FileId, Region)>) {
        self.push(Severity::Warning, message, context);
    }

    pub fn add_error(&mut self, message: impl Into<String>, context: Option<(FileId, Region)>) {
        self.push(Severity::Error, message, context);
    }

    pub fn add_fatal_error(
        &mut self,
        message: impl Into<String>,
        context: Option<(FileId, Region)>,
    ) {
        self.push(Severity::Fatal, message, context);
    }

    pub fn merge(&mut self, other: RefactoringStatus) {
        self.entries.extend(other.entries);
    }

    pub fn severity(&self) -> Severity {
        self.entries
            .iter()
            .map(|entry| entry.severity)
            .max()
            .unwrap_or_default()
    }

    pub fn is_ok(&self) -> bool {
        self.severity() == Severity::Ok
    }

    pub fn has_error(&self) -> bool {
        self.severity() >= Severity::Error
    }

    pub fn has_fatal_error(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn entries_with_severity(&self, min: Severity) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter(move |entry| entry.severity >= min)
    }
}
