mod api_error;
mod auth;
mod models;
mod photos;
mod session;

pub use api_error::{ApiError, AuthError};
pub use auth::{authenticate, AuthBackend, AuthState};
pub use models::*;
pub use photos::{PhotoLibrary, PhotosService};
pub use session::ICloudSession;
