//! Error taxonomy for an edit session.
//!
//! Every variant is fatal at this layer. The binary logs it once and exits
//! with [`EditError::exit_code`].

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type EditResult<T> = Result<T, EditError>;

/// Which file operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    CreateScratch,
    OpenTarget,
    CopyToScratch,
    WriteScratch,
    StatScratch,
    ReadScratch,
    OpenDestination,
    WriteDestination,
}

impl IoAction {
    const fn describe(self) -> &'static str {
        match self {
            Self::CreateScratch => "create temporary file for editing",
            Self::OpenTarget => "open",
            Self::CopyToScratch => "copy for editing",
            Self::WriteScratch => "write to",
            Self::StatScratch => "stat",
            Self::ReadScratch => "read",
            Self::OpenDestination | Self::WriteDestination => "update",
        }
    }
}

impl std::fmt::Display for IoAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Overlay does not exist: {name}")]
    OverlayNotFound { name: String },

    #[error("{} does not exist. Use '--parents' option to create automatically.", .dir.display())]
    ParentMissing { dir: PathBuf },

    #[error("Invalid overlay file path: {path}")]
    InvalidPath { path: String },

    #[error("Could not create directory {}: {source}", .dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to {action} {}: {source}", .path.display())]
    Io {
        action: IoAction,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to launch editor {program}: {source}")]
    EditorLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Editor process exited with an error: {status}")]
    EditorFailed { status: ExitStatus },
}

impl EditError {
    pub(crate) fn io(action: IoAction, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error. All failures are terminal.
    pub const fn exit_code(&self) -> u8 {
        1
    }
}
