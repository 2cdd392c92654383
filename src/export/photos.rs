//! Photo export: content files, metadata sidecars and the run manifest.

use crate::api_client::{Photo, PhotoLibrary};
use crate::export::{ExportError, PhotoCursor};
use crate::foundation::artifacts::{
    create_exclusive_async, write_metadata, ArtifactError, Manifest, MANIFEST_FILE,
};
use crate::foundation::utils::{derive_content_filename, truncate_graphemes, PHOTOS_DIR};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Exports every photo of the library into `root`.
///
/// The manifest is truncated and rewritten; each photo then gets its manifest
/// row, its sidecar and its content file, strictly one photo at a time. The
/// first failure stops the run. Returns the number of photos exported.
pub async fn export_photos<L>(library: &L, root: &Path) -> Result<usize, ExportError>
where
    L: PhotoLibrary + ?Sized,
{
    let photos_dir = root.join(PHOTOS_DIR);
    fs::create_dir_all(&photos_dir).map_err(|e| ArtifactError::io(&photos_dir, e))?;

    let all_photos = library.all_photos();
    let total = library.photo_count(&all_photos).await?;
    let progress = create_progress_bar(total);

    let mut manifest = Manifest::create(&root.join(MANIFEST_FILE))?;
    let mut cursor = PhotoCursor::new(library, &all_photos);

    while let Some(page) = cursor.next_page().await? {
        for photo in &page {
            progress.set_message(truncate_graphemes(&photo.filename, 40));
            if let Err(e) = export_photo(library, root, photo, &mut manifest).await {
                progress.abandon_with_message(format!("Failed: {}", photo.filename));
                return Err(e);
            }
            progress.inc(1);
        }
    }

    progress.finish_with_message("All photos backed up");
    Ok(manifest.rows())
}

/// Writes the manifest row, the sidecar and the content file of one photo.
/// Returns the number of content bytes written.
///
/// A failed download leaves the partial content file in place.
pub async fn export_photo<L>(
    library: &L,
    root: &Path,
    photo: &Photo,
    manifest: &mut Manifest,
) -> Result<u64, ExportError>
where
    L: PhotoLibrary + ?Sized,
{
    let paths = derive_content_filename(&photo.id, &photo.filename);

    manifest.append(&photo.id, &photo.filename, &paths.file_name())?;
    write_metadata(&root.join(&paths.meta), &photo.id, &photo.filename)?;

    let content_path = root.join(&paths.content);
    let mut file = create_exclusive_async(&content_path).await?;
    let written = library
        .download(photo, &mut file)
        .await
        .map_err(|source| ExportError::Download {
            photo_id: photo.id.clone(),
            source,
        })?;
    file.flush()
        .await
        .map_err(|e| ArtifactError::io(&content_path, e))?;

    info!(photo_id = %photo.id, path = %content_path.display(), bytes = written, "photo exported");
    Ok(written)
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let progress = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{elapsed_precise} [{bar:40.cyan/blue}] {pos}/{len} photos {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}
