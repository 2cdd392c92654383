use serde_json::{json, Value};

/// Display name of the library-wide pseudo-album.
pub const ALL_PHOTOS_ALBUM: &str = "All Photos";

/// What kind of collection an [`Album`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumKind {
    /// The implicit collection of every photo in the library. Not a real
    /// album: listing it would duplicate every other listing.
    AllPhotos,
    /// A collection the service maintains on its own (favourites, videos).
    Smart,
    /// An album the user created.
    Folder,
}

/// How the photos of an album are queried from CloudKit.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumQuery {
    /// Record type returning assets together with their masters.
    pub list_type: String,
    /// Index key used to count the album's items.
    pub obj_type: String,
    /// Extra `filterBy` clauses appended to every page query.
    pub filters: Vec<Value>,
}

impl AlbumQuery {
    pub fn new(list_type: &str, obj_type: &str, filters: Vec<Value>) -> Self {
        Self {
            list_type: list_type.to_string(),
            obj_type: obj_type.to_string(),
            filters,
        }
    }
}

/// A remote album. The name is the album's key within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub name: String,
    pub kind: AlbumKind,
    pub query: AlbumQuery,
}

impl Album {
    pub fn new(name: &str, kind: AlbumKind, query: AlbumQuery) -> Self {
        Self {
            name: name.to_string(),
            kind,
            query,
        }
    }

    /// The library-wide pseudo-album.
    pub fn all_photos() -> Self {
        Self::new(
            ALL_PHOTOS_ALBUM,
            AlbumKind::AllPhotos,
            AlbumQuery::new("CPLAssetAndMasterByAddedDate", "CPLAssetByAddedDate", Vec::new()),
        )
    }

    /// A service-maintained album filtered by the `smartAlbum` field.
    pub fn smart(name: &str, obj_suffix: &str, smart_album: &str) -> Self {
        Self::new(
            name,
            AlbumKind::Smart,
            AlbumQuery::new(
                "CPLAssetAndMasterInSmartAlbumByAssetDate",
                &format!("CPLAssetInSmartAlbumByAssetDate:{obj_suffix}"),
                vec![equals_filter("smartAlbum", smart_album)],
            ),
        )
    }

    /// A service-maintained album backed by its own record types, without a
    /// `smartAlbum` filter.
    pub fn smart_records(name: &str, list_type: &str, obj_type: &str) -> Self {
        Self::new(
            name,
            AlbumKind::Smart,
            AlbumQuery::new(list_type, obj_type, Vec::new()),
        )
    }

    /// The library-wide pseudo-album followed by every service-maintained
    /// album, in the order the Photos web client lists them.
    pub fn smart_albums() -> Vec<Self> {
        vec![
            Self::all_photos(),
            Self::smart("Time-lapse", "Timelapse", "TIMELAPSE"),
            Self::smart("Videos", "Video", "VIDEO"),
            Self::smart("Slo-mo", "Slomo", "SLOMO"),
            Self::smart_records(
                "Bursts",
                "CPLBurstStackAssetAndMasterByAssetDate",
                "CPLAssetBurstStackAssetByAssetDate",
            ),
            Self::smart("Favorites", "Favorite", "FAVORITE"),
            Self::smart("Panoramas", "Panorama", "PANORAMA"),
            Self::smart("Screenshots", "Screenshot", "SCREENSHOT"),
            Self::smart("Live", "Live", "LIVE"),
            Self::smart_records(
                "Recently Deleted",
                "CPLAssetAndMasterDeletedByExpungedDate",
                "CPLAssetDeletedByExpungedDate",
            ),
            Self::smart_records(
                "Hidden",
                "CPLAssetAndMasterHiddenByAssetDate",
                "CPLAssetHiddenByAssetDate",
            ),
        ]
    }

    /// A user-created album, identified remotely by its folder record name.
    pub fn folder(name: &str, folder_id: &str) -> Self {
        Self::new(
            name,
            AlbumKind::Folder,
            AlbumQuery::new(
                "CPLContainerRelationLiveByAssetDate",
                &format!("CPLContainerRelationNotDeletedByAssetDate:{folder_id}"),
                vec![equals_filter("parentId", folder_id)],
            ),
        )
    }

    pub fn is_all_photos(&self) -> bool {
        self.kind == AlbumKind::AllPhotos
    }
}

fn equals_filter(field: &str, value: &str) -> Value {
    json!({
        "fieldName": field,
        "comparator": "EQUALS",
        "fieldValue": { "type": "STRING", "value": value },
    })
}

/// A remote photo. Content is fetched separately and streamed to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Remote-assigned identifier, unique across the library.
    pub id: String,
    /// Filename as uploaded. Neither unique nor filesystem-safe.
    pub filename: String,
    pub download_url: Option<String>,
    /// Size of the original as announced by the service, checked on download.
    pub size: Option<u64>,
}

impl Photo {
    pub fn new(id: &str, filename: &str) -> Self {
        Self {
            id: id.to_string(),
            filename: filename.to_string(),
            download_url: None,
            size: None,
        }
    }
}

/// What the service wants after the primary credentials were accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    /// Signed in, nothing else to confirm.
    None,
    /// A code pushed to an approved device must be entered.
    TwoFactor,
    /// A trusted device must be chosen to receive a code.
    TwoStep,
}

/// A device able to receive a two-step verification code.
///
/// The raw record is kept because the service expects it echoed back
/// verbatim when sending and validating codes.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustedDevice {
    record: Value,
}

impl TrustedDevice {
    pub fn new(record: Value) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &Value {
        &self.record
    }

    /// `deviceName`, or `SMS to <phoneNumber>` for phone numbers.
    pub fn label(&self) -> String {
        match self.record.get("deviceName").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => format!(
                "SMS to {}",
                self.record
                    .get("phoneNumber")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown number")
            ),
        }
    }
}
