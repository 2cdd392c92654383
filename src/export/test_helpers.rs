//! In-memory photo library for exporter tests.

use crate::api_client::{Album, ApiError, Photo, PhotoLibrary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub struct FakeLibrary {
    albums: Vec<(Album, Vec<Photo>)>,
    contents: HashMap<String, Vec<u8>>,
    page_size: usize,
    broken_download: Option<String>,
    pub page_requests: AtomicUsize,
}

impl FakeLibrary {
    pub fn new(page_size: usize) -> Self {
        Self {
            albums: vec![(Album::all_photos(), Vec::new())],
            contents: HashMap::new(),
            page_size,
            broken_download: None,
            page_requests: AtomicUsize::new(0),
        }
    }

    /// Adds a photo to the library (and so to the pseudo-album).
    pub fn with_photo(mut self, id: &str, filename: &str, content: &[u8]) -> Self {
        self.albums[0].1.push(Photo::new(id, filename));
        self.contents.insert(id.to_string(), content.to_vec());
        self
    }

    pub fn with_album(mut self, album: Album, photos: &[(&str, &str)]) -> Self {
        let photos = photos
            .iter()
            .map(|(id, filename)| Photo::new(id, filename))
            .collect();
        self.albums.push((album, photos));
        self
    }

    /// Makes the download of `id` fail after part of the content was written.
    pub fn with_broken_download(mut self, id: &str) -> Self {
        self.broken_download = Some(id.to_string());
        self
    }

    fn photos_of(&self, album: &Album) -> &[Photo] {
        self.albums
            .iter()
            .find(|(a, _)| a == album)
            .map(|(_, photos)| photos.as_slice())
            .unwrap_or(&[])
    }
}

#[async_trait]
impl PhotoLibrary for FakeLibrary {
    async fn albums(&self) -> Result<Vec<Album>, ApiError> {
        Ok(self.albums.iter().map(|(a, _)| a.clone()).collect())
    }

    async fn photo_count(&self, album: &Album) -> Result<u64, ApiError> {
        Ok(self.photos_of(album).len() as u64)
    }

    async fn photos_page(&self, album: &Album, offset: u64) -> Result<Vec<Photo>, ApiError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .photos_of(album)
            .iter()
            .skip(offset as usize)
            .take(self.page_size)
            .cloned()
            .collect())
    }

    async fn download(
        &self,
        photo: &Photo,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ApiError> {
        let content = self.contents.get(&photo.id).cloned().unwrap_or_default();

        if self.broken_download.as_deref() == Some(photo.id.as_str()) {
            sink.write_all(&content[..content.len() / 2]).await?;
            return Err(ApiError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }

        sink.write_all(&content).await?;
        sink.flush().await?;
        Ok(content.len() as u64)
    }
}
