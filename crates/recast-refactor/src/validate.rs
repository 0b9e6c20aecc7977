//! Rename consistency checking.
//!
//! A rename is consistent when every reference that resolved to the symbol
//! before the edit still resolves to it afterwards. The check applies the
//! proposed edits to scratch copies, searches again, and correlates the two
//! occurrence sets purely by remapping positions through the edits. An old
//! occurrence without a counterpart at its remapped position has been captured
//! by some other declaration.

use std::collections::{BTreeMap, HashMap};

use recast_core::{EditId, FileId, Region};
use serde::Serialize;

use crate::change::ChangeError;
use crate::status::RefactoringStatus;
use crate::store::{InMemoryWorkspace, TextStore};
use crate::text_change::TextChangeManager;

/// A reference to (or declaration of) a symbol, as byte offsets `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Occurrence {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
}

impl Occurrence {
    pub fn new(file: FileId, start: usize, end: usize) -> Self {
        Self { file, start, end }
    }

    /// `None` when the bounds are inverted.
    pub fn region(&self) -> Option<Region> {
        (self.start <= self.end).then(|| Region::from_bounds(self.start, self.end))
    }
}

/// Occurrences within one file, ordered by offset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OccurrenceGroup {
    pub file: FileId,
    pub occurrences: Vec<Occurrence>,
}

/// Groups occurrences per file, sorting and de-duplicating within each group.
pub fn group_by_file(occurrences: impl IntoIterator<Item = Occurrence>) -> Vec<OccurrenceGroup> {
    let mut by_file: BTreeMap<FileId, Vec<Occurrence>> = BTreeMap::new();
    for occurrence in occurrences {
        by_file
            .entry(occurrence.file.clone())
            .or_default()
            .push(occurrence);
    }
    by_file
        .into_iter()
        .map(|(file, mut occurrences)| {
            occurrences.sort();
            occurrences.dedup();
            OccurrenceGroup { file, occurrences }
        })
        .collect()
}

/// Finds the occurrences of a symbol; backed by whatever resolves names.
pub trait SearchOracle {
    fn search(&self, symbol: &str, store: &dyn TextStore) -> Vec<Occurrence>;
}

/// Compares the occurrences found before and after a rename.
///
/// Each old occurrence is remapped through the edit node of its file's change
/// whose region equals the occurrence; the rename is consistent for it when a
/// new occurrence starts at the remapped offset. Every other old occurrence
/// adds one `Error` entry pointing at its original position.
pub fn analyze_rename_changes(
    manager: &TextChangeManager,
    old: &[OccurrenceGroup],
    new: &[OccurrenceGroup],
    store: &dyn TextStore,
) -> Result<RefactoringStatus, ChangeError> {
    let mut status = RefactoringStatus::new();
    let new_by_file: BTreeMap<&FileId, &OccurrenceGroup> =
        new.iter().map(|group| (&group.file, group)).collect();

    for group in old {
        let file = &group.file;
        let new_group = new_by_file.get(file);
        let change = manager.get(file);
        let outcome = change.map(|change| change.preview(store)).transpose()?;
        let edits: HashMap<Region, EditId> = change
            .map(|change| {
                let tree = change.edit();
                tree.preorder()
                    .into_iter()
                    .filter(|&id| id != tree.root())
                    .map(|id| (tree.node(id).region(), id))
                    .collect()
            })
            .unwrap_or_default();

        for occurrence in &group.occurrences {
            let Some(region) = occurrence.region() else {
                status.add_error(
                    format!(
                        "search reported inverted bounds {}..{}",
                        occurrence.start, occurrence.end
                    ),
                    Some((file.clone(), Region::empty(occurrence.start))),
                );
                continue;
            };
            let remapped = outcome
                .as_ref()
                .zip(edits.get(&region))
                .and_then(|(outcome, &id)| outcome.region_of(id));

            let resolved = match (new_group, remapped) {
                (Some(new_group), Some(remapped)) => new_group
                    .occurrences
                    .iter()
                    .any(|candidate| candidate.start == remapped.start()),
                _ => false,
            };
            if !resolved {
                tracing::debug!(
                    file = %file,
                    region = %region,
                    "reference is shadowed after the rename"
                );
                status.add_error(
                    "reference would no longer resolve to the renamed element",
                    Some((file.clone(), region)),
                );
            }
        }
    }
    Ok(status)
}

/// A copy of `store` with every changed file replaced by its previewed text.
pub fn scratch_copies(
    manager: &TextChangeManager,
    store: &dyn TextStore,
) -> Result<InMemoryWorkspace, ChangeError> {
    let mut scratch = InMemoryWorkspace::new();
    for file in store.files() {
        if let Some(text) = store.text(&file) {
            scratch.insert(file, text.clone());
        }
    }
    for (file, change) in manager.iter() {
        scratch.insert(file.clone(), change.preview_text(store)?);
    }
    Ok(scratch)
}

/// Searches `old_name` in `store` and `new_name` in the scratch copies, then
/// runs [`analyze_rename_changes`] over the two results.
pub fn check_rename_consistency(
    oracle: &dyn SearchOracle,
    old_name: &str,
    new_name: &str,
    manager: &TextChangeManager,
    store: &dyn TextStore,
) -> Result<RefactoringStatus, ChangeError> {
    let old = group_by_file(oracle.search(old_name, store));
    check_against(oracle, &old, new_name, manager, store)
}

/// Like [`check_rename_consistency`] with the old occurrences already known.
pub(crate) fn check_against(
    oracle: &dyn SearchOracle,
    old: &[OccurrenceGroup],
    new_name: &str,
    manager: &TextChangeManager,
    store: &dyn TextStore,
) -> Result<RefactoringStatus, ChangeError> {
    let scratch = scratch_copies(manager, store)?;
    let new = group_by_file(oracle.search(new_name, &scratch));
    analyze_rename_changes(manager, old, &new, store)
}
