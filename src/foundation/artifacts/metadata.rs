use crate::foundation::artifacts::{create_exclusive, ArtifactError};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Writes the sidecar for one photo: two labelled lines holding the remote id
/// and the original filename.
///
/// The sidecar is created exclusively, so a second run over the same output
/// directory fails here rather than clobbering earlier results.
pub fn write_metadata(
    meta_path: &Path,
    photo_id: &str,
    original_filename: &str,
) -> Result<(), ArtifactError> {
    let mut file = create_exclusive(meta_path)?;

    writeln!(file, "id: {photo_id}\noriginal_filename: {original_filename}")
        .and_then(|()| file.flush())
        .map_err(|e| ArtifactError::io(meta_path, e))?;

    debug!(path = %meta_path.display(), photo_id, "wrote metadata sidecar");
    Ok(())
}
