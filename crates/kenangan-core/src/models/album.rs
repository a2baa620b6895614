use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds
pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

/// Generate a fresh opaque identifier for albums, photos and comments
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A comment attached to a photo. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub text: String,
    pub timestamp: Timestamp,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            author: author.into(),
            text: text.into(),
            timestamp: now_millis(),
        }
    }
}

/// A single photo inside an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Unique within the containing album
    pub id: String,

    /// Location of the image payload, never interpreted here
    pub url: String,

    /// Capture or upload time
    pub timestamp: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Display name of whoever added the photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Append-only, oldest first
    #[serde(default)]
    pub comments: Vec<Comment>,

    /// Tombstone; `None` means the photo is live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Photo {
    /// Create a live photo stamped with the current time
    pub fn new(url: impl Into<String>, author: Option<String>) -> Self {
        Self {
            id: new_id(),
            url: url.into(),
            timestamp: now_millis(),
            caption: None,
            author,
            comments: vec![],
            deleted_at: None,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A named, ordered collection of photos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    /// Caller supplied, unique among albums
    pub id: String,

    pub name: String,

    pub created_at: Timestamp,

    /// Display order; new photos are prepended
    #[serde(default)]
    pub photos: Vec<Photo>,

    /// Tombstone; `None` means the album is live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Album {
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
            photos: vec![],
            deleted_at: None,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn photo(&self, photo_id: &str) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == photo_id)
    }

    pub fn photo_mut(&mut self, photo_id: &str) -> Option<&mut Photo> {
        self.photos.iter_mut().find(|p| p.id == photo_id)
    }
}

/// The whole shared collection.
///
/// Serialized as a bare JSON array of albums, which is exactly the value held
/// under the remote document key. There is no delta form: every push carries
/// the complete snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub albums: Vec<Album>,
}

impl Snapshot {
    pub fn new(albums: Vec<Album>) -> Self {
        Self { albums }
    }

    /// Parse a snapshot from the JSON document held by the store
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize the full snapshot for a push
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    pub fn album(&self, album_id: &str) -> Option<&Album> {
        self.albums.iter().find(|a| a.id == album_id)
    }

    pub fn album_mut(&mut self, album_id: &str) -> Option<&mut Album> {
        self.albums.iter_mut().find(|a| a.id == album_id)
    }

    pub fn photo(&self, album_id: &str, photo_id: &str) -> Option<&Photo> {
        self.album(album_id).and_then(|a| a.photo(photo_id))
    }

    pub fn photo_mut(&mut self, album_id: &str, photo_id: &str) -> Option<&mut Photo> {
        self.album_mut(album_id).and_then(|a| a.photo_mut(photo_id))
    }
}
