//! Editor sessions and change detection.
//!
//! The scratch file is fingerprinted, handed to the operator's editor, and
//! fingerprinted again once the editor exits. Equal fingerprints mean there
//! is nothing to commit.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{EditError, EditResult, IoAction};
use crate::scratch::ScratchFile;

/// Editor used when nothing else is configured.
pub const DEFAULT_EDITOR: &str = "/bin/vi";

/// How a change to the scratch file is detected.
#[derive(clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDetection {
    /// Compare modification times. Misses edits within the filesystem's
    /// timestamp resolution.
    #[default]
    Mtime,
    /// Compare SHA-256 digests of the file content.
    Content,
}

/// Result of an editor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Unchanged,
    Changed,
}

/// Launches an interactive editor on a file and waits for it to finish.
pub trait Editor {
    /// # Errors
    /// Returns an error if the editor cannot be started or exits unsuccessfully.
    fn edit(&self, path: &Path) -> EditResult<()>;
}

/// An external editor command line. The edited path is appended as the
/// final argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    program: String,
    args: Vec<String>,
}

impl Default for EditorCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_EDITOR.to_string(),
            args: Vec::new(),
        }
    }
}

impl EditorCommand {
    /// Parse a command such as `"code --wait"`. Words are split on
    /// whitespace; a blank command yields [`DEFAULT_EDITOR`].
    pub fn parse(command: &str) -> Self {
        let mut words = command.split_whitespace().map(ToOwned::to_owned);
        match words.next() {
            Some(program) => Self {
                program,
                args: words.collect(),
            },
            None => Self::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Editor for EditorCommand {
    fn edit(&self, path: &Path) -> EditResult<()> {
        debug!(editor = %self.program, args = ?self.args, file = %path.display(), "Launching editor");
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .status()
            .map_err(|source| EditError::EditorLaunch {
                program: self.program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(EditError::EditorFailed { status })
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Fingerprint {
    Modified(SystemTime),
    Digest([u8; 32]),
}

fn fingerprint(path: &Path, detection: ChangeDetection) -> EditResult<Fingerprint> {
    match detection {
        ChangeDetection::Mtime => fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map(Fingerprint::Modified)
            .map_err(|err| EditError::io(IoAction::StatScratch, path, err)),
        ChangeDetection::Content => {
            let digest = File::open(path).and_then(|mut file| {
                let mut hasher = Sha256::new();
                io::copy(&mut file, &mut hasher)?;
                Ok(hasher.finalize())
            });
            digest
                .map(|digest| Fingerprint::Digest(digest.into()))
                .map_err(|err| EditError::io(IoAction::ReadScratch, path, err))
        }
    }
}

/// Run `editor` on the scratch file and report whether it changed.
///
/// # Errors
/// Fails if the scratch file cannot be inspected or the editor fails.
pub fn run_session(
    scratch: &ScratchFile,
    editor: &dyn Editor,
    detection: ChangeDetection,
) -> EditResult<SessionOutcome> {
    let path = scratch.path();
    let before = fingerprint(path, detection)?;
    editor.edit(path)?;
    let after = fingerprint(path, detection)?;

    if before == after {
        Ok(SessionOutcome::Unchanged)
    } else {
        Ok(SessionOutcome::Changed)
    }
}
