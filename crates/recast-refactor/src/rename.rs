use recast_core::Region;

use crate::change::{Change, ChangeError};
use crate::refactoring::Refactoring;
use crate::status::RefactoringStatus;
use crate::store::TextStore;
use crate::text_change::TextChangeManager;
use crate::validate::{check_against, group_by_file, OccurrenceGroup, SearchOracle};

/// Renames every occurrence of a symbol found by a [`SearchOracle`].
#[derive(Debug)]
pub struct RenameRefactoring<O> {
    oracle: O,
    old_name: String,
    new_name: String,
    occurrences: Option<Vec<OccurrenceGroup>>,
    changes: Option<TextChangeManager>,
}

impl<O: SearchOracle> RenameRefactoring<O> {
    pub fn new(oracle: O, old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            oracle,
            old_name: old_name.into(),
            new_name: new_name.into(),
            occurrences: None,
            changes: None,
        }
    }

    pub fn has_cached_occurrences(&self) -> bool {
        self.occurrences.is_some()
    }

    fn occurrences(&mut self, store: &dyn TextStore) -> &[OccurrenceGroup] {
        let oracle = &self.oracle;
        let old_name = &self.old_name;
        self.occurrences
            .get_or_insert_with(|| group_by_file(oracle.search(old_name, store)))
    }

    fn compute_changes(&mut self, store: &dyn TextStore) -> Result<TextChangeManager, ChangeError> {
        let new_name = self.new_name.clone();
        let mut manager = TextChangeManager::new();
        for group in self.occurrences(store) {
            let change = manager.get_or_create(&group.file, store)?;
            let edit = change.edit_mut();
            for occurrence in &group.occurrences {
                let region = occurrence.region().ok_or_else(|| ChangeError::Perform {
                    change: format!("rename in {}", group.file),
                    message: format!(
                        "occurrence has inverted bounds {}..{}",
                        occurrence.start, occurrence.end
                    ),
                })?;
                let id = edit.replace(region, new_name.as_str());
                edit.add(id)?;
            }
        }
        Ok(manager)
    }
}

impl<O: SearchOracle> Refactoring for RenameRefactoring<O> {
    fn name(&self) -> String {
        format!("Rename `{}` to `{}`", self.old_name, self.new_name)
    }

    fn check_initial_conditions(&mut self, store: &dyn TextStore) -> RefactoringStatus {
        if self.new_name.trim().is_empty() {
            return RefactoringStatus::fatal("the new name must not be empty");
        }
        if self.new_name == self.old_name {
            return RefactoringStatus::fatal("the new name is the same as the old name");
        }

        let mut status = RefactoringStatus::new();
        let occurrences = self.occurrences(store);
        if occurrences.is_empty() {
            status.add_fatal_error("no occurrences of the symbol were found", None);
        }
        for group in occurrences {
            for occurrence in &group.occurrences {
                if occurrence.region().is_none() {
                    status.add_fatal_error(
                        format!(
                            "occurrence in {} has inverted bounds {}..{}",
                            group.file, occurrence.start, occurrence.end
                        ),
                        Some((group.file.clone(), Region::empty(occurrence.start))),
                    );
                }
            }
            if !store.exists(&group.file) {
                status.add_fatal_error(format!("file {} does not exist", group.file), None);
            } else if store.is_read_only(&group.file) {
                status.add_fatal_error(format!("file {} is read-only", group.file), None);
            }
        }
        status
    }

    fn check_final_conditions(&mut self, store: &dyn TextStore) -> RefactoringStatus {
        let manager = match self.compute_changes(store) {
            Ok(manager) => manager,
            Err(err) => return RefactoringStatus::fatal(err.to_string()),
        };
        let old = self.occurrences(store).to_vec();
        let status = match check_against(&self.oracle, &old, &self.new_name, &manager, store) {
            Ok(status) => status,
            Err(err) => RefactoringStatus::fatal(err.to_string()),
        };
        self.changes = Some(manager);
        status
    }

    fn create_change(&mut self, store: &dyn TextStore) -> Result<Box<dyn Change>, ChangeError> {
        let manager = match self.changes.take() {
            Some(manager) => manager,
            None => self.compute_changes(store)?,
        };
        // The occurrences describe the text before the change; they are stale
        // once it is performed.
        self.occurrences = None;
        Ok(Box::new(manager.into_composite(self.name())))
    }
}
