//! Soft delete for albums and photos.
//!
//! Nothing in the sync core physically removes an album or a photo. Archiving
//! stamps `deleted_at`, restoring clears it. Album and photo tombstones are
//! independent layers: archiving an album leaves its photos' own tombstones
//! untouched, so a restored album shows exactly what it showed before.

use crate::models::{Snapshot, Timestamp};

/// Addresses one archivable entity inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Album(String),
    Photo { album_id: String, photo_id: String },
}

impl EntityRef {
    pub fn album(album_id: impl Into<String>) -> Self {
        EntityRef::Album(album_id.into())
    }

    pub fn photo(album_id: impl Into<String>, photo_id: impl Into<String>) -> Self {
        EntityRef::Photo {
            album_id: album_id.into(),
            photo_id: photo_id.into(),
        }
    }

    /// Whether the referenced entity exists in `snapshot`
    pub fn exists_in(&self, snapshot: &Snapshot) -> bool {
        match self {
            EntityRef::Album(album_id) => snapshot.album(album_id).is_some(),
            EntityRef::Photo { album_id, photo_id } => snapshot.photo(album_id, photo_id).is_some(),
        }
    }
}

/// Mark the target archived at `at`.
///
/// An already archived entity keeps its original tombstone. The stamp is never
/// earlier than the entity's own creation time. Unknown targets leave the
/// snapshot unchanged.
pub fn archive(mut snapshot: Snapshot, target: &EntityRef, at: Timestamp) -> Snapshot {
    match target {
        EntityRef::Album(album_id) => {
            if let Some(album) = snapshot.album_mut(album_id) {
                if album.deleted_at.is_none() {
                    album.deleted_at = Some(at.max(album.created_at));
                }
            }
        }
        EntityRef::Photo { album_id, photo_id } => {
            if let Some(photo) = snapshot.photo_mut(album_id, photo_id) {
                if photo.deleted_at.is_none() {
                    photo.deleted_at = Some(at.max(photo.timestamp));
                }
            }
        }
    }
    snapshot
}

/// Clear the tombstone on exactly the target entity
pub fn restore(mut snapshot: Snapshot, target: &EntityRef) -> Snapshot {
    match target {
        EntityRef::Album(album_id) => {
            if let Some(album) = snapshot.album_mut(album_id) {
                album.deleted_at = None;
            }
        }
        EntityRef::Photo { album_id, photo_id } => {
            if let Some(photo) = snapshot.photo_mut(album_id, photo_id) {
                photo.deleted_at = None;
            }
        }
    }
    snapshot
}
