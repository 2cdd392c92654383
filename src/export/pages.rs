use crate::api_client::{Album, ApiError, Photo, PhotoLibrary};

/// Walks the photos of one album page by page, in remote order.
///
/// Only one page is held at a time; the offset advances by the size of each
/// page until the library returns an empty one.
pub struct PhotoCursor<'a, L: PhotoLibrary + ?Sized> {
    library: &'a L,
    album: &'a Album,
    offset: u64,
    exhausted: bool,
}

impl<'a, L: PhotoLibrary + ?Sized> PhotoCursor<'a, L> {
    pub fn new(library: &'a L, album: &'a Album) -> Self {
        Self {
            library,
            album,
            offset: 0,
            exhausted: false,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<Vec<Photo>>, ApiError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self.library.photos_page(self.album, self.offset).await?;
        if page.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.offset += page.len() as u64;
        Ok(Some(page))
    }
}
