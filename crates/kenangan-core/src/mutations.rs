//! Every change a client can make, expressed as a pure `Snapshot -> Snapshot`
//! transformation so it can be applied optimistically to the local replica
//! and then pushed as a whole.

use crate::error::{Error, Result};
use crate::models::{Album, Comment, Photo, Snapshot, Timestamp};
use crate::tombstone::{self, EntityRef};

/// Trim an album name and reject blank ones
pub fn validate_album_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::BlankName);
    }
    Ok(trimmed.to_string())
}

/// A single local change to the shared collection
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateAlbum(Album),
    RenameAlbum {
        album_id: String,
        name: String,
    },
    /// Prepended as a block, keeping the given order
    AddPhotos {
        album_id: String,
        photos: Vec<Photo>,
    },
    AddComment {
        album_id: String,
        photo_id: String,
        comment: Comment,
    },
    SetCaption {
        album_id: String,
        photo_id: String,
        caption: Option<String>,
    },
    Archive {
        target: EntityRef,
        at: Timestamp,
    },
    Restore(EntityRef),
}

impl Mutation {
    /// Short name used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::CreateAlbum(_) => "create_album",
            Mutation::RenameAlbum { .. } => "rename_album",
            Mutation::AddPhotos { .. } => "add_photos",
            Mutation::AddComment { .. } => "add_comment",
            Mutation::SetCaption { .. } => "set_caption",
            Mutation::Archive { .. } => "archive",
            Mutation::Restore(_) => "restore",
        }
    }

    pub fn apply(self, snapshot: Snapshot) -> Snapshot {
        match self {
            Mutation::CreateAlbum(album) => create_album(snapshot, album),
            Mutation::RenameAlbum { album_id, name } => rename_album(snapshot, &album_id, &name),
            Mutation::AddPhotos { album_id, photos } => add_photos(snapshot, &album_id, photos),
            Mutation::AddComment {
                album_id,
                photo_id,
                comment,
            } => add_comment(snapshot, &album_id, &photo_id, comment),
            Mutation::SetCaption {
                album_id,
                photo_id,
                caption,
            } => set_caption(snapshot, &album_id, &photo_id, caption),
            Mutation::Archive { target, at } => tombstone::archive(snapshot, &target, at),
            Mutation::Restore(target) => tombstone::restore(snapshot, &target),
        }
    }
}

/// Append a new album. An album whose id is already taken is ignored.
pub fn create_album(mut snapshot: Snapshot, album: Album) -> Snapshot {
    if snapshot.album(&album.id).is_none() {
        snapshot.albums.push(album);
    }
    snapshot
}

/// Rename an album; blank names leave it unchanged
pub fn rename_album(mut snapshot: Snapshot, album_id: &str, name: &str) -> Snapshot {
    if let (Some(album), Ok(name)) = (snapshot.album_mut(album_id), validate_album_name(name)) {
        album.name = name;
    }
    snapshot
}

/// Prepend photos to an album, skipping ids it already holds
pub fn add_photos(mut snapshot: Snapshot, album_id: &str, photos: Vec<Photo>) -> Snapshot {
    if let Some(album) = snapshot.album_mut(album_id) {
        let mut fresh: Vec<Photo> = Vec::with_capacity(photos.len());
        for photo in photos {
            if album.photo(&photo.id).is_none() && !fresh.iter().any(|p| p.id == photo.id) {
                fresh.push(photo);
            }
        }
        fresh.append(&mut album.photos);
        album.photos = fresh;
    }
    snapshot
}

pub fn add_comment(
    mut snapshot: Snapshot,
    album_id: &str,
    photo_id: &str,
    comment: Comment,
) -> Snapshot {
    if let Some(photo) = snapshot.photo_mut(album_id, photo_id) {
        if !photo.comments.iter().any(|c| c.id == comment.id) {
            photo.comments.push(comment);
        }
    }
    snapshot
}

/// Set or clear a caption, typically with text from the caption generator
pub fn set_caption(
    mut snapshot: Snapshot,
    album_id: &str,
    photo_id: &str,
    caption: Option<String>,
) -> Snapshot {
    if let Some(photo) = snapshot.photo_mut(album_id, photo_id) {
        photo.caption = caption;
    }
    snapshot
}
