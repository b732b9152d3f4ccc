//! Overlay lookup.
//!
//! Overlays live as plain directories under a single root; the registry only
//! maps names to those directories and joins overlay-relative file paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{EditError, EditResult};

/// Default root holding one directory per overlay.
pub const DEFAULT_OVERLAY_DIR: &str = "/var/lib/warewulf/overlays";

/// Resolves overlay names to their source directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRegistry {
    root: PathBuf,
}

impl OverlayRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source directory for `name`. The directory may not exist.
    ///
    /// # Errors
    /// Returns [`EditError::OverlayNotFound`] if `name` is not a single
    /// plain path component.
    pub fn source_dir(&self, name: &str) -> EditResult<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => Ok(self.root.join(part)),
            _ => Err(EditError::OverlayNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Whether the overlay's source directory exists.
    pub fn exists(&self, name: &str) -> bool {
        self.source_dir(name).is_ok_and(|dir| dir.is_dir())
    }
}

/// Join an overlay-relative path onto the overlay source directory.
///
/// A leading `/` is ignored and `.` components are dropped. Parent
/// components are rejected so the result always stays inside `source_dir`.
///
/// # Errors
/// Returns [`EditError::InvalidPath`] for empty paths or paths containing `..`.
pub fn overlay_file_path(source_dir: &Path, relative: &str) -> EditResult<PathBuf> {
    let invalid = || EditError::InvalidPath {
        path: relative.to_string(),
    };
    let mut joined = source_dir.to_path_buf();
    let mut pushed = false;
    for component in Path::new(relative).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(part) => {
                joined.push(part);
                pushed = true;
            }
            Component::ParentDir | Component::Prefix(_) => return Err(invalid()),
        }
    }
    if pushed { Ok(joined) } else { Err(invalid()) }
}
