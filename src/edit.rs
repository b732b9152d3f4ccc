//! The edit-stage-commit workflow.
//!
//! [`edit_overlay_file`] resolves the overlay, checks the target's parent
//! directory, stages a scratch copy, runs the editor, and commits the
//! result if the session changed it. Every failure is returned to the
//! caller; nothing here exits the process.

use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::commit::{commit, CommitStrategy, DEFAULT_FILE_MODE};
use crate::error::{EditError, EditResult};
use crate::overlay::{overlay_file_path, OverlayRegistry};
use crate::scratch::provision;
use crate::session::{run_session, ChangeDetection, Editor, SessionOutcome};

/// Permission mode for parent directories created with `create_dirs`.
pub const DIR_MODE: u32 = 0o755;

/// Which overlay file to edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub overlay: String,
    /// Path relative to the overlay's source directory.
    pub file: String,
}

impl EditRequest {
    pub fn new(overlay: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            overlay: overlay.into(),
            file: file.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOptions {
    /// Create missing parent directories instead of failing.
    pub create_dirs: bool,
    /// Mode for a newly created target file.
    pub mode: u32,
    pub detection: ChangeDetection,
    pub strategy: CommitStrategy,
    /// Where scratch files are created.
    pub scratch_dir: PathBuf,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            create_dirs: false,
            mode: DEFAULT_FILE_MODE,
            detection: ChangeDetection::default(),
            strategy: CommitStrategy::default(),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The editor left the scratch file alone; the target was not touched.
    Unchanged { path: PathBuf },
    /// The target was overwritten with the edited content.
    Committed { path: PathBuf },
}

/// Edit one overlay file interactively.
///
/// # Errors
/// Returns a precondition error if the overlay or the target's parent
/// directory is missing, an I/O error if staging or committing fails, and
/// an editor error if the editor cannot run or exits unsuccessfully.
pub fn edit_overlay_file(
    request: &EditRequest,
    registry: &OverlayRegistry,
    editor: &dyn Editor,
    options: &EditOptions,
) -> EditResult<EditOutcome> {
    if !registry.exists(&request.overlay) {
        return Err(EditError::OverlayNotFound {
            name: request.overlay.clone(),
        });
    }
    let source_dir = registry.source_dir(&request.overlay)?;

    let target = overlay_file_path(&source_dir, &request.file)?;
    debug!(file = %target.display(), "Will edit overlay file");

    let parent = target.parent().unwrap_or(&source_dir);
    ensure_parent(parent, options.create_dirs)?;

    let scratch = provision(&options.scratch_dir, &target)?;
    match run_session(&scratch, editor, options.detection)? {
        SessionOutcome::Unchanged => {
            info!("No change detected. Not updating overlay.");
            Ok(EditOutcome::Unchanged { path: target })
        }
        SessionOutcome::Changed => {
            commit(&scratch, &target, options.mode, options.strategy)?;
            info!(file = %target.display(), "Updated overlay file");
            Ok(EditOutcome::Committed { path: target })
        }
    }
}

fn ensure_parent(dir: &Path, create: bool) -> EditResult<()> {
    if create {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder.create(dir).map_err(|source| EditError::CreateDir {
            dir: dir.to_path_buf(),
            source,
        })
    } else if dir.is_dir() {
        Ok(())
    } else {
        Err(EditError::ParentMissing {
            dir: dir.to_path_buf(),
        })
    }
}
