//! Export of a remote photo library to local disk.
//!
//! Layout under the output root:
//! - `albums/<slug>.txt`: one listing per real album
//! - `photos/<base64url(id)><ext>`: original content
//! - `photos/<base64url(id)>.meta.txt`: id and original filename
//! - `photos.csv`: one row per exported photo

mod albums;
mod export_error;
mod pages;
mod photos;

#[cfg(test)]
mod test_helpers;

pub use albums::{export_album, export_albums};
pub use export_error::ExportError;
pub use pages::PhotoCursor;
pub use photos::{export_photo, export_photos};

use crate::api_client::PhotoLibrary;
use std::path::Path;

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub albums: usize,
    pub photos: usize,
}

/// Exports album listings first, then every photo.
pub async fn export_library<L>(library: &L, root: &Path) -> Result<ExportSummary, ExportError>
where
    L: PhotoLibrary + ?Sized,
{
    let albums = export_albums(library, root).await?;
    let photos = export_photos(library, root).await?;
    Ok(ExportSummary { albums, photos })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::Album;
    use crate::export::test_helpers::FakeLibrary;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_export_library_layout() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let library = FakeLibrary::new(2)
            .with_photo("p1", "a.jpg", b"aaa")
            .with_photo("p2", "b.png", b"bbb")
            .with_album(
                Album::folder("Family Trip", "F1"),
                &[("p1", "a.jpg"), ("p2", "b.png")],
            );

        let summary = export_library(&library, root).await.unwrap();

        assert_eq!(summary, ExportSummary { albums: 1, photos: 2 });
        assert!(root.join("albums/family-trip.txt").is_file());
        assert!(!root.join("albums/all-photos.txt").exists());
        assert!(root.join("photos/cDE=.jpg").is_file());
        assert!(root.join("photos/cDI=.meta.txt").is_file());
        assert_eq!(
            fs::read_to_string(root.join("photos.csv")).unwrap().lines().count(),
            3
        );
    }
}
