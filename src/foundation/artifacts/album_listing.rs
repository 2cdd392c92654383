use crate::foundation::artifacts::{create_exclusive, ArtifactError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Text listing of one album: the album name, a blank line, then one
/// `<id> <original_filename>` line per photo.
///
/// The file is created exclusively when the listing is opened, before any
/// photo is fetched, so a conflicting listing is reported without touching
/// the remote service.
pub struct AlbumListing {
    path: PathBuf,
    writer: BufWriter<File>,
    entries: usize,
}

impl AlbumListing {
    pub fn create(path: &Path, album_name: &str) -> Result<Self, ArtifactError> {
        let file = create_exclusive(path)?;
        let mut listing = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            entries: 0,
        };
        listing.write_line(album_name)?;
        listing.write_line("")?;
        Ok(listing)
    }

    pub fn push(&mut self, photo_id: &str, original_filename: &str) -> Result<(), ArtifactError> {
        self.write_line(&format!("{photo_id} {original_filename}"))?;
        self.entries += 1;
        Ok(())
    }

    /// Flushes and closes the listing, returning how many photos it holds.
    pub fn finish(mut self) -> Result<usize, ArtifactError> {
        self.writer
            .flush()
            .map_err(|e| ArtifactError::io(&self.path, e))?;
        Ok(self.entries)
    }

    fn write_line(&mut self, line: &str) -> Result<(), ArtifactError> {
        writeln!(self.writer, "{line}").map_err(|e| ArtifactError::io(&self.path, e))
    }
}
