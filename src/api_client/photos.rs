//! CloudKit client for the iCloud Photo Library.
//!
//! Albums and photos are CloudKit records in the `PrimarySync` zone of the
//! private `com.apple.photos.cloud` database. Photos are paged with a
//! `startRank` offset; each page holds `CPLAsset` and `CPLMaster` records,
//! and the masters carry the original filename and download URL.

use crate::api_client::session::ensure_success;
use crate::api_client::{Album, ApiError, Photo};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

const DATABASE_PATH: &str = "database/1/com.apple.photos.cloud/production/private";

/// Container folders that hold user albums but are not albums themselves.
const ROOT_FOLDERS: [&str; 2] = ["----Root-Folder----", "----Project-Root-Folder----"];

const DESIRED_KEYS: [&str; 12] = [
    "resOriginalRes",
    "resOriginalFileType",
    "filenameEnc",
    "originalOrientation",
    "masterRef",
    "assetDate",
    "addedDate",
    "isDeleted",
    "isHidden",
    "itemType",
    "recordName",
    "recordType",
];

/// Read access to a remote photo library.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// Every album, the library-wide pseudo-album included.
    async fn albums(&self) -> Result<Vec<Album>, ApiError>;

    /// The library-wide pseudo-album.
    fn all_photos(&self) -> Album {
        Album::all_photos()
    }

    async fn photo_count(&self, album: &Album) -> Result<u64, ApiError>;

    /// Photos of `album` starting at `offset`, in the order the service
    /// returns them. An empty page marks the end.
    async fn photos_page(&self, album: &Album, offset: u64) -> Result<Vec<Photo>, ApiError>;

    /// Streams the original content of `photo` into `sink` chunk by chunk and
    /// returns the number of bytes written. A byte count differing from the
    /// size the service announced is an error.
    async fn download(
        &self,
        photo: &Photo,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ApiError>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    record_name: String,
    record_type: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl Record {
    fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).map(|f| &f["value"])
    }

    fn decoded(&self, field: &str) -> Result<Option<String>, ApiError> {
        let Some(encoded) = self.value(field).and_then(Value::as_str) else {
            return Ok(None);
        };
        let bytes = STANDARD.decode(encoded).map_err(|e| {
            ApiError::UnexpectedResponse(format!(
                "{field} of record {} is not base64: {e}",
                self.record_name
            ))
        })?;
        String::from_utf8(bytes).map(Some).map_err(|e| {
            ApiError::UnexpectedResponse(format!(
                "{field} of record {} is not UTF-8: {e}",
                self.record_name
            ))
        })
    }
}

pub struct PhotosService {
    client: Client,
    endpoint: String,
    params: Vec<(String, String)>,
    page_size: u32,
}

impl PhotosService {
    /// Connects to the library and checks it has finished indexing.
    pub async fn open(
        client: Client,
        service_root: &str,
        mut params: Vec<(String, String)>,
        page_size: u32,
    ) -> Result<Self, ApiError> {
        params.push(("remapEnums".to_string(), "true".to_string()));
        params.push(("getCurrentSyncToken".to_string(), "true".to_string()));

        let service = Self {
            client,
            endpoint: format!("{}/{DATABASE_PATH}", service_root.trim_end_matches('/')),
            params,
            page_size,
        };

        let response = service
            .query(json!({
                "query": { "recordType": "CheckIndexingState" },
                "zoneID": { "zoneName": "PrimarySync" },
            }))
            .await?;
        let state = response
            .records
            .first()
            .and_then(|r| r.value("state"))
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");

        if state != "FINISHED" {
            return Err(ApiError::NotActivated(state.to_string()));
        }
        Ok(service)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.endpoint))
            .query(&self.params)
            .header("Content-Type", "text/plain")
            .body(serde_json::to_string(body)?)
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn query(&self, body: Value) -> Result<QueryResponse, ApiError> {
        Ok(self.post("records/query", &body).await?.json().await?)
    }

    fn page_query(&self, album: &Album, offset: u64) -> Value {
        let mut filters = vec![
            json!({
                "fieldName": "startRank",
                "fieldValue": { "type": "INT64", "value": offset },
                "comparator": "EQUALS",
            }),
            json!({
                "fieldName": "direction",
                "fieldValue": { "type": "STRING", "value": "ASCENDING" },
                "comparator": "EQUALS",
            }),
        ];
        filters.extend(album.query.filters.iter().cloned());

        json!({
            "query": {
                "filterBy": filters,
                "recordType": album.query.list_type,
            },
            "resultsLimit": self.page_size.saturating_mul(2),
            "desiredKeys": DESIRED_KEYS,
            "zoneID": { "zoneName": "PrimarySync" },
        })
    }
}

#[async_trait]
impl PhotoLibrary for PhotosService {
    async fn albums(&self) -> Result<Vec<Album>, ApiError> {
        let mut albums = Album::smart_albums();

        let response = self
            .query(json!({
                "query": { "recordType": "CPLAlbumByPositionLive" },
                "zoneID": { "zoneName": "PrimarySync" },
            }))
            .await?;

        for folder in &response.records {
            if ROOT_FOLDERS.contains(&folder.record_name.as_str()) {
                continue;
            }
            if folder.value("isDeleted").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            let Some(name) = folder.decoded("albumNameEnc")? else {
                continue;
            };
            albums.push(Album::folder(&name, &folder.record_name));
        }

        debug!(count = albums.len(), "listed albums");
        Ok(albums)
    }

    async fn photo_count(&self, album: &Album) -> Result<u64, ApiError> {
        let body = json!({
            "batch": [{
                "resultsLimit": 1,
                "query": {
                    "filterBy": {
                        "fieldName": "indexCountID",
                        "fieldValue": { "type": "STRING_LIST", "value": [album.query.obj_type] },
                        "comparator": "IN",
                    },
                    "recordType": "HyperionIndexCountLookup",
                },
                "zoneWide": true,
                "zoneID": { "zoneName": "PrimarySync" },
            }]
        });

        let response: Value = self
            .post("internal/records/query/batch", &body)
            .await?
            .json()
            .await?;

        response["batch"][0]["records"][0]["fields"]["itemCount"]["value"]
            .as_u64()
            .ok_or_else(|| {
                ApiError::UnexpectedResponse(format!("no item count for album {}", album.name))
            })
    }

    async fn photos_page(&self, album: &Album, offset: u64) -> Result<Vec<Photo>, ApiError> {
        let response = self.query(self.page_query(album, offset)).await?;

        let mut photos = Vec::new();
        for record in response
            .records
            .iter()
            .filter(|r| r.record_type == "CPLMaster")
        {
            let filename = record.decoded("filenameEnc")?.ok_or_else(|| {
                ApiError::UnexpectedResponse(format!(
                    "photo {} has no filename",
                    record.record_name
                ))
            })?;
            let original = record.value("resOriginalRes");

            photos.push(Photo {
                id: record.record_name.clone(),
                filename,
                download_url: original
                    .and_then(|o| o["downloadURL"].as_str())
                    .map(str::to_string),
                size: original.and_then(|o| o["size"].as_u64()),
            });
        }

        debug!(album = %album.name, offset, count = photos.len(), "fetched photo page");
        Ok(photos)
    }

    async fn download(
        &self,
        photo: &Photo,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, ApiError> {
        let url = photo.download_url.as_deref().ok_or_else(|| {
            ApiError::UnexpectedResponse(format!("photo {} has no original download URL", photo.id))
        })?;

        let mut response = ensure_success(self.client.get(url).send().await?).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        match photo.size {
            Some(expected) if expected != written => Err(ApiError::IncompleteDownload {
                photo_id: photo.id.clone(),
                expected,
                written,
            }),
            _ => Ok(written),
        }
    }
}
