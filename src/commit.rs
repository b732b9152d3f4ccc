//! Writing the edited scratch file back to the overlay.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use tempfile::Builder;
use tracing::debug;

use crate::error::{EditError, EditResult, IoAction};
use crate::scratch::ScratchFile;

/// Permission mode for newly created overlay files.
pub const DEFAULT_FILE_MODE: u32 = 0o755;

/// How the destination file is replaced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CommitStrategy {
    /// Truncate and overwrite the destination through a single handle.
    /// A failure mid-copy can leave the destination partially written.
    #[default]
    InPlace,
    /// Write a sibling temporary file and rename it over the destination.
    Atomic,
}

/// Replace `target` with the current content of `scratch`.
///
/// `mode` applies when the destination is created. An existing destination
/// keeps its permissions.
///
/// # Errors
/// Fails if the destination cannot be opened or written.
pub fn commit(
    scratch: &ScratchFile,
    target: &Path,
    mode: u32,
    strategy: CommitStrategy,
) -> EditResult<()> {
    let mut source = scratch.open()?;
    debug!(from = %scratch.path().display(), to = %target.display(), ?strategy, "Copy");
    match strategy {
        CommitStrategy::InPlace => commit_in_place(&mut source, target, mode),
        CommitStrategy::Atomic => commit_atomic(&mut source, target, mode),
    }
}

fn commit_in_place(source: &mut File, target: &Path, mode: u32) -> EditResult<()> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(true);
    set_create_mode(&mut options, mode);
    let mut destination = options
        .open(target)
        .map_err(|err| EditError::io(IoAction::OpenDestination, target, err))?;
    io::copy(source, &mut destination)
        .map_err(|err| EditError::io(IoAction::WriteDestination, target, err))?;
    Ok(())
}

fn commit_atomic(source: &mut File, target: &Path, mode: u32) -> EditResult<()> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = Builder::new()
        .prefix(".overlay-edit-")
        .tempfile_in(dir)
        .map_err(|err| EditError::io(IoAction::OpenDestination, target, err))?;
    io::copy(source, staged.as_file_mut())
        .map_err(|err| EditError::io(IoAction::WriteDestination, target, err))?;

    let permissions = match existing_permissions(target) {
        Ok(Some(permissions)) => permissions,
        Ok(None) => permissions_for_mode(staged.as_file(), mode)
            .map_err(|err| EditError::io(IoAction::WriteDestination, target, err))?,
        Err(err) => return Err(EditError::io(IoAction::WriteDestination, target, err)),
    };
    staged
        .as_file()
        .set_permissions(permissions)
        .map_err(|err| EditError::io(IoAction::WriteDestination, target, err))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|err| EditError::io(IoAction::WriteDestination, target, err))?;
    staged
        .persist(target)
        .map_err(|err| EditError::io(IoAction::WriteDestination, target, err.error))?;
    Ok(())
}

/// Permissions of `target`, or `None` if it does not exist.
fn existing_permissions(target: &Path) -> io::Result<Option<fs::Permissions>> {
    match fs::metadata(target) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn set_create_mode(options: &mut OpenOptions, mode: u32) {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(mode);
}

#[cfg(not(unix))]
fn set_create_mode(_options: &mut OpenOptions, _mode: u32) {}

#[cfg(unix)]
fn permissions_for_mode(_file: &File, mode: u32) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn permissions_for_mode(file: &File, _mode: u32) -> io::Result<fs::Permissions> {
    Ok(file.metadata()?.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::provision;
    use tempfile::tempdir;

    fn scratch_with(dir: &Path, content: &[u8]) -> ScratchFile {
        let scratch = provision(dir, &dir.join("unused")).unwrap();
        fs::write(scratch.path(), content).unwrap();
        scratch
    }

    #[test]
    fn test_in_place_creates_missing_destination() {
        let dir = tempdir().unwrap();
        let scratch = scratch_with(dir.path(), b"line\n");
        let target = dir.path().join("motd");

        commit(&scratch, &target, 0o644, CommitStrategy::InPlace).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"line\n");
    }

    #[test]
    fn test_in_place_truncates_longer_destination() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("motd");
        fs::write(&target, b"a much longer original body\n").unwrap();
        let scratch = scratch_with(dir.path(), b"short\n");

        commit(&scratch, &target, 0o644, CommitStrategy::InPlace).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"short\n");
    }

    #[test]
    fn test_atomic_replaces_destination_and_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let overlay = dir.path().join("compute");
        fs::create_dir(&overlay).unwrap();
        let target = overlay.join("motd");
        fs::write(&target, b"old contents\n").unwrap();
        let scratch = scratch_with(dir.path(), b"new\n");

        commit(&scratch, &target, 0o644, CommitStrategy::Atomic).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new\n");
        let entries: Vec<_> = fs::read_dir(&overlay).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_missing_destination_dir_is_error() {
        let dir = tempdir().unwrap();
        let scratch = scratch_with(dir.path(), b"x");
        let target = dir.path().join("missing").join("motd");
        for strategy in [CommitStrategy::InPlace, CommitStrategy::Atomic] {
            let err = commit(&scratch, &target, 0o644, strategy).unwrap_err();
            assert!(matches!(err, EditError::Io { .. }), "{strategy:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_permissions_distinguishes_absent_from_unreadable() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("motd");
        fs::write(&file, b"hello").unwrap();

        assert!(existing_permissions(&file).unwrap().is_some());
        assert!(existing_permissions(&dir.path().join("absent")).unwrap().is_none());
        // A path through a regular file fails with something other than NotFound.
        assert!(existing_permissions(&file.join("child")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_modes_apply_on_create_and_existing_permissions_survive() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let scratch = scratch_with(dir.path(), b"x");

        let created = dir.path().join("created");
        commit(&scratch, &created, 0o600, CommitStrategy::InPlace).unwrap();
        assert_eq!(fs::metadata(&created).unwrap().permissions().mode() & 0o777, 0o600);

        let atomic = dir.path().join("atomic");
        commit(&scratch, &atomic, 0o640, CommitStrategy::Atomic).unwrap();
        assert_eq!(fs::metadata(&atomic).unwrap().permissions().mode() & 0o777, 0o640);

        let existing = dir.path().join("existing");
        fs::write(&existing, b"old").unwrap();
        fs::set_permissions(&existing, fs::Permissions::from_mode(0o600)).unwrap();
        for strategy in [CommitStrategy::InPlace, CommitStrategy::Atomic] {
            commit(&scratch, &existing, 0o755, strategy).unwrap();
            assert_eq!(
                fs::metadata(&existing).unwrap().permissions().mode() & 0o777,
                0o600,
                "{strategy:?}"
            );
        }
    }
}
