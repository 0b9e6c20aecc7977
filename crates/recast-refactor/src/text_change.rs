use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use recast_core::{apply, ApplyOutcome, Buffer, EditId, EditTree, FileId, Region, RemapError};

use crate::change::{Change, ChangeContext, ChangeError};
use crate::composite::CompositeChange;
use crate::progress::ProgressSink;
use crate::store::{StoreError, TextStore};

/// Applies an edit tree to one file of the store.
#[derive(Debug)]
pub struct TextChange {
    name: String,
    file: FileId,
    edit: EditTree,
    active: bool,
    applied: Option<ApplyOutcome>,
}

impl TextChange {
    pub fn new(name: impl Into<String>, file: FileId, edit: EditTree) -> Self {
        Self {
            name: name.into(),
            file,
            edit,
            active: true,
            applied: None,
        }
    }

    /// An empty change whose edit tree spans the current text of `file`.
    pub fn for_file(
        name: impl Into<String>,
        file: FileId,
        store: &dyn TextStore,
    ) -> Result<Self, StoreError> {
        let len = store
            .text(&file)
            .map(Buffer::len)
            .ok_or_else(|| StoreError::Missing(file.clone()))?;
        Ok(Self::new(name, file, EditTree::new(len)))
    }

    pub fn file(&self) -> &FileId {
        &self.file
    }

    pub fn edit(&self) -> &EditTree {
        &self.edit
    }

    pub fn edit_mut(&mut self) -> &mut EditTree {
        &mut self.edit
    }

    /// Applies the edit tree to the store's current text without writing it back.
    pub fn preview(&self, store: &dyn TextStore) -> Result<ApplyOutcome, ChangeError> {
        let current = store
            .text(&self.file)
            .ok_or_else(|| StoreError::Missing(self.file.clone()))?;
        Ok(apply(current, &self.edit)?)
    }

    pub fn preview_text(&self, store: &dyn TextStore) -> Result<Buffer, ChangeError> {
        Ok(self.preview(store)?.buffer)
    }

    /// Where edit `id` ended up after the last successful perform.
    pub fn tracked_region(&self, id: EditId) -> Option<Region> {
        self.applied.as_ref()?.region_of(id)
    }

    /// Maps a region of the pre-perform text into the text after the last perform.
    pub fn remap(&self, region: Region) -> Option<Result<Region, RemapError>> {
        self.applied.as_ref().map(|outcome| outcome.map.map(region))
    }

    fn apply_to(&mut self, store: &mut dyn TextStore) -> Result<TextChange, ChangeError> {
        if store.is_read_only(&self.file) {
            return Err(StoreError::ReadOnly(self.file.clone()).into());
        }
        let current = store
            .text(&self.file)
            .cloned()
            .ok_or_else(|| StoreError::Missing(self.file.clone()))?;

        let outcome = apply(&current, &self.edit)?;
        let inverse = outcome.map.inverse(&current)?;
        store.set_text(&self.file, outcome.buffer.clone())?;

        tracing::debug!(
            change = %self.name,
            file = %self.file,
            edits = outcome.map.deltas().len(),
            old_len = current.len(),
            new_len = outcome.buffer.len(),
            "applied text change"
        );
        self.applied = Some(outcome);
        Ok(TextChange::new(self.name.clone(), self.file.clone(), inverse))
    }
}

impl Change for TextChange {
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
        progress.begin_task(&self.name, 1);
        let result = self.apply_to(ctx.store_mut());
        progress.worked(1);
        progress.done();
        Ok(Box::new(result?))
    }
}

/// Collects one [`TextChange`] per file while a refactoring computes its edits.
#[derive(Debug, Default)]
pub struct TextChangeManager {
    changes: BTreeMap<FileId, TextChange>,
}

impl TextChangeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The change for `file`, created empty on first use.
    pub fn get_or_create(
        &mut self,
        file: &FileId,
        store: &dyn TextStore,
    ) -> Result<&mut TextChange, StoreError> {
        match self.changes.entry(file.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let change = TextChange::for_file(file.as_str(), file.clone(), store)?;
                Ok(entry.insert(change))
            }
        }
    }

    pub fn get(&self, file: &FileId) -> Option<&TextChange> {
        self.changes.get(file)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileId, &TextChange)> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// All file changes, in file order, as one composite.
    pub fn into_composite(self, name: impl Into<String>) -> CompositeChange {
        let children = self
            .changes
            .into_values()
            .map(|change| Box::new(change) as Box<dyn Change>)
            .collect();
        CompositeChange::from_children(name, children)
    }
}
