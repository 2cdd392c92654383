//! Backs up an iCloud photo library to local disk.
//!
//! Every photo is written under `photos/` with a name derived from its remote
//! id, so two photos sharing an original filename never collide:
//!
//! ```
//! use icloud_backup::foundation::utils::derive_content_filename;
//!
//! let paths = derive_content_filename("A", "IMG_0001.JPG");
//! assert_eq!(paths.content.to_str(), Some("photos/QQ==.JPG"));
//! assert_eq!(paths.meta.to_str(), Some("photos/QQ==.meta.txt"));
//! ```
//!
//! Album listings are named after a slug of the album name:
//!
//! ```
//! use icloud_backup::foundation::utils::slugify;
//!
//! assert_eq!(slugify("Summer Trip 2023!", true), "summer-trip-2023");
//! ```

pub mod api_client;
pub mod configuration;
pub mod export;
pub mod foundation;
pub mod startup;

pub use configuration::{ConfigFolder, Endpoints, Settings};
pub use export::{export_library, ExportError, ExportSummary};
