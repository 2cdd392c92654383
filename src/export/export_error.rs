use crate::api_client::ApiError;
use crate::foundation::artifacts::ArtifactError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("remote library error: {0}")]
    Api(#[from] ApiError),

    #[error("download of photo {photo_id} failed: {source}")]
    Download {
        photo_id: String,
        #[source]
        source: ApiError,
    },
}
