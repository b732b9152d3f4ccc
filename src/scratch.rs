//! Scratch file provisioning.
//!
//! The operator never edits an overlay file directly. A private copy is made
//! in the system temp directory, and that copy is removed when the
//! [`ScratchFile`] is dropped, whatever the outcome of the session.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, TempPath};
use tracing::debug;

use crate::error::{EditError, EditResult, IoAction};

/// File-name prefix for scratch files.
pub const SCRATCH_PREFIX: &str = "ww-overlay-edit-";

/// Extension marking a templated (macro-expandable) overlay file.
pub const TEMPLATE_EXTENSION: &str = "ww";

/// Body used to seed a new templated file.
pub const INITIAL_TEMPLATE: &str = "\
# This is a Warewulf Template file.
#
# This file (suffix '.ww') will be automatically rewritten without the suffix
# when the overlay is rendered for the individual nodes. Here are some examples
# of macros and logic which can be used within this file:
#
# Node FQDN = {{.Id}}
# Node Cluster = {{.ClusterName}}
# Network Config = {{.NetDevs.eth0.Ipaddr}}, {{.NetDevs.eth0.Hwaddr}}, etc.
#
# Go to the documentation pages for more information:
# https://warewulf.org/docs/development/contents/overlays.html
#
# Keep the following for better reference:
# ---
# This file is autogenerated by warewulf
# Host:   {{.BuildHost}}
# Time:   {{.BuildTime}}
# Source: {{.BuildSource}}
";

/// A private, self-deleting copy of the file being edited.
#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the scratch file for reading its current bytes.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened.
    pub fn open(&self) -> EditResult<File> {
        File::open(&self.path).map_err(|err| EditError::io(IoAction::ReadScratch, self.path(), err))
    }
}

/// Whether a missing `target` should be seeded from the template.
pub fn is_templated(target: &Path) -> bool {
    target
        .extension()
        .is_some_and(|ext| ext == TEMPLATE_EXTENSION)
}

/// Create a scratch file in `dir` seeded for `target`.
///
/// # Errors
/// Fails if the scratch file cannot be created or written, or if an existing
/// target cannot be read.
pub fn provision(dir: &Path, target: &Path) -> EditResult<ScratchFile> {
    let mut scratch = Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempfile_in(dir)
        .map_err(|err| EditError::io(IoAction::CreateScratch, dir, err))?;
    debug!(scratch = %scratch.path().display(), "Using temporary file");

    if target.is_file() {
        let mut original = File::open(target)
            .map_err(|err| EditError::io(IoAction::OpenTarget, target, err))?;
        io::copy(&mut original, scratch.as_file_mut())
            .map_err(|err| EditError::io(IoAction::CopyToScratch, target, err))?;
    } else if is_templated(target) {
        scratch
            .write_all(INITIAL_TEMPLATE.as_bytes())
            .map_err(|err| EditError::io(IoAction::WriteScratch, scratch.path(), err))?;
    }
    scratch
        .flush()
        .map_err(|err| EditError::io(IoAction::WriteScratch, scratch.path(), err))?;

    Ok(ScratchFile {
        path: scratch.into_temp_path(),
    })
}
