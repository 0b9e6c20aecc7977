use pretty_assertions::assert_eq;
use recast_config::{ChangesConfig, RecastConfig};
use recast_refactor::{
    Change, ChangeError, CompositeChange, EditTree, FileId, InMemoryWorkspace, NullProgress,
    Refactoring, RefactoringRunner, RefactoringStatus, Region, TextChange, TextStore,
    TracingProgress, UndoManager,
};

/// Edits `A.java` and then a file that does not exist.
struct HalfBroken;

impl Refactoring for HalfBroken {
    fn name(&self) -> String {
        "half broken".to_owned()
    }

    fn check_initial_conditions(&mut self, _store: &dyn TextStore) -> RefactoringStatus {
        RefactoringStatus::new()
    }

    fn check_final_conditions(&mut self, _store: &dyn TextStore) -> RefactoringStatus {
        let mut status = RefactoringStatus::new();
        status.add_warning("second file may be missing", None);
        status
    }

    fn create_change(&mut self, store: &dyn TextStore) -> Result<Box<dyn Change>, ChangeError> {
        let mut first = TextChange::for_file("edit A.java", FileId::from("A.java"), store)?;
        let id = first.edit_mut().replace(Region::new(6, 1), "Alpha");
        first.edit_mut().add(id)?;

        let mut composite = CompositeChange::new(self.name());
        composite.add_change(first);
        composite.add_change(TextChange::new(
            "edit Gone.java",
            FileId::from("Gone.java"),
            EditTree::new(0),
        ));
        Ok(Box::new(composite))
    }
}

fn workspace() -> InMemoryWorkspace {
    InMemoryWorkspace::new().with_file("A.java", "class A {}")
}

#[test]
fn partial_failure_is_left_to_the_caller_by_default() {
    let mut store = workspace();
    let mut undo = UndoManager::new();

    let mut err = RefactoringRunner::new(ChangesConfig::default())
        .run(&mut HalfBroken, &mut store, &mut undo, &mut NullProgress)
        .unwrap_err();

    assert_eq!(store.content(&FileId::from("A.java")), Some("class Alpha {}"));
    assert_eq!(err.committed(), ["edit A.java".to_owned()]);
    assert!(!undo.anything_to_undo());

    let rollback = err.take_rollback().unwrap();
    assert_eq!(rollback.len(), 1);
}

#[test]
fn configured_rollback_restores_committed_files() {
    let config = RecastConfig::load_from_str("[changes]\nrollback_on_abort = true\n").unwrap();
    let mut store = workspace();
    let mut undo = UndoManager::with_config(&config.undo);

    let err = RefactoringRunner::new(config.changes)
        .run(&mut HalfBroken, &mut store, &mut undo, &mut TracingProgress::new())
        .unwrap_err();

    assert!(matches!(
        err.cause(),
        ChangeError::Aborted { change, .. } if change == "edit Gone.java"
    ));
    assert_eq!(store, workspace());
    assert!(!undo.anything_to_undo());
}

#[test]
fn lenient_policy_records_what_succeeded() {
    let config = ChangesConfig {
        abort_on_failure: false,
        ..ChangesConfig::default()
    };
    let mut store = workspace();
    let mut undo = UndoManager::new();

    let report = RefactoringRunner::new(config)
        .run(&mut HalfBroken, &mut store, &mut undo, &mut NullProgress)
        .unwrap();

    assert!(report.performed);
    assert_eq!(report.status.entries().len(), 1);
    assert_eq!(store.content(&FileId::from("A.java")), Some("class Alpha {}"));
    assert_eq!(undo.peek_undo_name(), Some("half broken"));
}
