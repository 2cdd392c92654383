use crate::foundation::artifacts::ArtifactError;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the manifest file, relative to the output root.
pub const MANIFEST_FILE: &str = "photos.csv";

/// First line of every manifest.
pub const MANIFEST_HEADER: &str = "photo_id,original_filename,filename";

/// The run-wide CSV manifest: one row per exported photo, in encounter order.
///
/// Unlike every other artifact the manifest is truncated when opened, since it
/// describes the current run only. Rows are flushed as they are written so the
/// file never lags behind what is already in `photos/`.
pub struct Manifest {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl Manifest {
    pub fn create(path: &Path) -> Result<Self, ArtifactError> {
        let file = File::create(path).map_err(|e| ArtifactError::io(path, e))?;
        let mut manifest = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            rows: 0,
        };
        manifest.write_line(MANIFEST_HEADER)?;
        Ok(manifest)
    }

    /// Appends `<photo_id>,<original_filename>,<filename>`.
    pub fn append(
        &mut self,
        photo_id: &str,
        original_filename: &str,
        file_name: &str,
    ) -> Result<(), ArtifactError> {
        let row = format!(
            "{},{},{}",
            csv_field(photo_id),
            csv_field(original_filename),
            csv_field(file_name)
        );
        self.write_line(&row)?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> Result<(), ArtifactError> {
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| ArtifactError::io(&self.path, e))
    }
}

/// Quotes a field only when it holds a delimiter, a quote or a line break.
/// Embedded quotes are doubled.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
