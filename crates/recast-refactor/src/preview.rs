use recast_config::PreviewConfig;
use recast_core::FileId;
use similar::TextDiff;

use crate::change::ChangeError;
use crate::store::{StoreError, TextStore};
use crate::text_change::TextChangeManager;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePreview {
    pub file: FileId,
    pub original: String,
    pub modified: String,
    pub unified_diff: String,
    pub edit_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefactoringPreview {
    pub total_files: usize,
    pub total_edits: usize,
    pub files: Vec<FilePreview>,
}

/// Previews every file change in `manager` without touching `store`.
///
/// Files whose text would not change are left out.
pub fn generate_preview(
    manager: &TextChangeManager,
    store: &dyn TextStore,
    config: &PreviewConfig,
) -> Result<RefactoringPreview, ChangeError> {
    let mut files = Vec::new();
    for (file, change) in manager.iter() {
        let original = store
            .text(file)
            .ok_or_else(|| StoreError::Missing(file.clone()))?
            .content()
            .to_owned();
        let modified = change.preview_text(store)?.content().to_owned();
        if original == modified {
            continue;
        }

        let diff = TextDiff::from_lines(&original, &modified);
        let unified_diff = diff
            .unified_diff()
            .context_radius(config.context_lines)
            .header(&format!("a/{file}"), &format!("b/{file}"))
            .to_string();

        files.push(FilePreview {
            file: file.clone(),
            original,
            modified,
            unified_diff,
            edit_count: change.edit().leaves().count(),
        });
    }

    let total_edits = files.iter().map(|file| file.edit_count).sum();
    Ok(RefactoringPreview {
        total_files: files.len(),
        total_edits,
        files,
    })
}
