//! Album listings: one text file per real album under `albums/`.

use crate::api_client::{Album, PhotoLibrary};
use crate::export::{ExportError, PhotoCursor};
use crate::foundation::artifacts::{AlbumListing, ArtifactError};
use crate::foundation::utils::{album_listing_path, ALBUMS_DIR};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Writes a listing for every album except the library-wide pseudo-album.
///
/// Albums are processed one after the other in the order the library lists
/// them. Returns the number of listings written.
pub async fn export_albums<L>(library: &L, root: &Path) -> Result<usize, ExportError>
where
    L: PhotoLibrary + ?Sized,
{
    let albums_dir = root.join(ALBUMS_DIR);
    fs::create_dir_all(&albums_dir).map_err(|e| ArtifactError::io(&albums_dir, e))?;

    let albums: Vec<Album> = library
        .albums()
        .await?
        .into_iter()
        .filter(|album| !album.is_all_photos())
        .collect();

    let total = albums.len();
    for (idx, album) in albums.iter().enumerate() {
        println!(
            "\x1b[34mBacking up album {} / {} '{}'...\x1b[0m",
            idx + 1,
            total,
            album.name
        );
        let output_path = root.join(album_listing_path(&album.name));
        export_album(library, album, &output_path).await?;
        println!("\x1b[32mAlbum backup complete.\x1b[0m");
    }

    Ok(total)
}

/// Writes the listing of one album to `output_path`.
///
/// Returns `None` without touching the filesystem for the pseudo-album, and
/// otherwise the number of photos listed. An existing file at `output_path`
/// is an error and is left untouched.
pub async fn export_album<L>(
    library: &L,
    album: &Album,
    output_path: &Path,
) -> Result<Option<usize>, ExportError>
where
    L: PhotoLibrary + ?Sized,
{
    if album.is_all_photos() {
        debug!(album = %album.name, "skipping pseudo-album");
        return Ok(None);
    }

    let mut listing = AlbumListing::create(output_path, &album.name)?;
    let mut cursor = PhotoCursor::new(library, album);
    while let Some(page) = cursor.next_page().await? {
        for photo in &page {
            listing.push(&photo.id, &photo.filename)?;
        }
    }

    let count = listing.finish()?;
    info!(album = %album.name, path = %output_path.display(), photos = count, "album listing written");
    Ok(Some(count))
}
