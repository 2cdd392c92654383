//! Deterministic on-disk names for exported photos and albums.
//!
//! A photo's stem depends on its remote identifier only. The original filename
//! contributes nothing but its final extension, so two photos that share a
//! filename (every phone names its pictures `IMG_0001.JPG`) never collide.

use crate::foundation::utils::slugify;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::path::{Path, PathBuf};

/// Directory, relative to the output root, holding content files and sidecars.
pub const PHOTOS_DIR: &str = "photos";

/// Directory, relative to the output root, holding one listing per album.
pub const ALBUMS_DIR: &str = "albums";

/// Suffix that replaces the photo extension on the metadata sidecar.
pub const META_SUFFIX: &str = ".meta.txt";

/// The local names derived for one photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPaths {
    /// URL-safe base64 of the photo id, padding kept.
    pub encoded_id: String,
    /// Final suffix of the original filename including the dot, or empty.
    pub extension: String,
    /// `photos/<encoded_id><extension>`
    pub content: PathBuf,
    /// `photos/<encoded_id>.meta.txt`
    pub meta: PathBuf,
}

impl PhotoPaths {
    /// The bare content filename as recorded in the manifest.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.encoded_id, self.extension)
    }
}

/// Encodes a photo id as URL-safe base64 of its UTF-8 bytes, padding kept.
pub fn encode_photo_id(photo_id: &str) -> String {
    URL_SAFE.encode(photo_id.as_bytes())
}

/// Returns the final suffix of `filename` including its leading dot.
///
/// Only the last component counts: `archive.tar.gz` gives `.gz`. Hidden files
/// such as `.profile`, names ending in a dot, and names without a dot give an
/// empty extension. Case is kept as-is.
pub fn file_extension(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => name[idx..].to_string(),
        _ => String::new(),
    }
}

/// Maps a photo to its content file and metadata sidecar, both relative to the
/// output root. Pure: nothing touches the filesystem.
///
/// # Examples
///
/// ```
/// use icloud_backup::foundation::utils::derive_content_filename;
/// use std::path::Path;
///
/// let paths = derive_content_filename("abc", "img.JPG");
/// assert_eq!(paths.content, Path::new("photos/YWJj.JPG"));
/// assert_eq!(paths.meta, Path::new("photos/YWJj.meta.txt"));
/// ```
pub fn derive_content_filename(photo_id: &str, original_filename: &str) -> PhotoPaths {
    let encoded_id = encode_photo_id(photo_id);
    let extension = file_extension(original_filename);
    let photos = Path::new(PHOTOS_DIR);

    PhotoPaths {
        content: photos.join(format!("{encoded_id}{extension}")),
        meta: photos.join(format!("{encoded_id}{META_SUFFIX}")),
        encoded_id,
        extension,
    }
}

/// Path of the listing written for an album, relative to the output root.
///
/// The album name is slugged with Unicode kept. A name that slugs to nothing
/// falls back to `album-<base64url(name)>` so it stays deterministic and
/// distinct per name.
pub fn album_listing_path(album_name: &str) -> PathBuf {
    let slug = slugify(album_name, true);
    let stem = if slug.is_empty() {
        format!("album-{}", URL_SAFE.encode(album_name.as_bytes()))
    } else {
        slug
    };
    Path::new(ALBUMS_DIR).join(format!("{stem}.txt"))
}
