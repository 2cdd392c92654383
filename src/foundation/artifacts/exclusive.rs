use crate::foundation::artifacts::ArtifactError;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Fails with [`ArtifactError::AlreadyExists`] when anything, including a
/// dangling symlink, already sits at `path`.
pub fn ensure_absent(path: &Path) -> Result<(), ArtifactError> {
    match path.symlink_metadata() {
        Ok(_) => Err(ArtifactError::AlreadyExists(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ArtifactError::io(path, e)),
    }
}

/// Opens a new file for writing, refusing to touch an existing one.
///
/// The explicit [`ensure_absent`] check gives the same error on every
/// platform; `create_new` still closes the window between check and open.
pub fn create_exclusive(path: &Path) -> Result<File, ArtifactError> {
    ensure_absent(path)?;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| map_open_error(path, e))
}

/// Async counterpart of [`create_exclusive`] used for streamed content.
pub async fn create_exclusive_async(path: &Path) -> Result<tokio::fs::File, ArtifactError> {
    ensure_absent(path)?;

    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| map_open_error(path, e))
}

fn map_open_error(path: &Path, error: io::Error) -> ArtifactError {
    if error.kind() == io::ErrorKind::AlreadyExists {
        ArtifactError::AlreadyExists(path.to_path_buf())
    } else {
        ArtifactError::io(path, error)
    }
}
