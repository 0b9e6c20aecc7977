use std::collections::{BTreeMap, BTreeSet};

use recast_core::{Buffer, FileId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("file {0} does not exist")]
    Missing(FileId),
    #[error("file {0} is read-only")]
    ReadOnly(FileId),
}

/// The set of text buffers changes read from and write to.
///
/// Implementations decide where text lives (editor documents, files on disk);
/// the change machinery only ever swaps whole buffers.
pub trait TextStore {
    fn text(&self, file: &FileId) -> Option<&Buffer>;

    fn exists(&self, file: &FileId) -> bool {
        self.text(file).is_some()
    }

    fn is_read_only(&self, file: &FileId) -> bool;

    fn set_text(&mut self, file: &FileId, text: Buffer) -> Result<(), StoreError>;

    fn files(&self) -> Vec<FileId>;
}

/// [`TextStore`] over an in-memory map of files.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryWorkspace {
    files: BTreeMap<FileId, Buffer>,
    read_only: BTreeSet<FileId>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `file`, ignoring the read-only flag.
    pub fn insert(&mut self, file: impl Into<FileId>, text: impl Into<Buffer>) {
        self.files.insert(file.into(), text.into());
    }

    pub fn with_file(mut self, file: impl Into<FileId>, text: impl Into<Buffer>) -> Self {
        self.insert(file, text);
        self
    }

    pub fn set_read_only(&mut self, file: impl Into<FileId>, read_only: bool) {
        let file = file.into();
        if read_only {
            self.read_only.insert(file);
        } else {
            self.read_only.remove(&file);
        }
    }

    /// Text of `file` as a string slice, mostly for assertions.
    pub fn content(&self, file: &FileId) -> Option<&str> {
        self.files.get(file).map(Buffer::content)
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for InMemoryWorkspace {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut workspace = Self::new();
        for (file, text) in iter {
            workspace.insert(file, text);
        }
        workspace
    }
}

impl TextStore for InMemoryWorkspace {
    fn text(&self, file: &FileId) -> Option<&Buffer> {
        self.files.get(file)
    }

    fn is_read_only(&self, file: &FileId) -> bool {
        self.read_only.contains(file)
    }

    fn set_text(&mut self, file: &FileId, text: Buffer) -> Result<(), StoreError> {
        if self.read_only.contains(file) {
            return Err(StoreError::ReadOnly(file.clone()));
        }
        match self.files.get_mut(file) {
            Some(slot) => {
                *slot = text;
                Ok(())
            }
            None => Err(StoreError::Missing(file.clone())),
        }
    }

    fn files(&self) -> Vec<FileId> {
        self.files.keys().cloned().collect()
    }
}
