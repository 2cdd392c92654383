//! Local artifacts produced by an export run.
//!
//! Every file except the manifest is created exclusively: an artifact that is
//! already on disk stops the run instead of being overwritten.

mod album_listing;
mod artifact_error;
mod exclusive;
mod manifest;
mod metadata;

pub use album_listing::AlbumListing;
pub use artifact_error::ArtifactError;
pub use exclusive::{create_exclusive, create_exclusive_async, ensure_absent};
pub use manifest::{Manifest, MANIFEST_FILE, MANIFEST_HEADER};
pub use metadata::write_metadata;
