//! Read paths over a snapshot.
//!
//! Every listing goes through [`Visibility`], so the live view and the archive
//! view use the same tombstone predicate and always partition the full set.

use std::fmt;
use std::str::FromStr;

use crate::models::{Album, Photo, Snapshot, Timestamp};

/// Anything carrying a `deleted_at` tombstone
pub trait Tombstoned {
    fn deleted_at(&self) -> Option<Timestamp>;
}

impl Tombstoned for Album {
    fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }
}

impl Tombstoned for Photo {
    fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Entities without a tombstone
    #[default]
    Live,
    /// Entities with a tombstone
    Archived,
    All,
}

impl Visibility {
    pub fn matches<T: Tombstoned>(self, entity: &T) -> bool {
        match self {
            Visibility::Live => entity.deleted_at().is_none(),
            Visibility::Archived => entity.deleted_at().is_some(),
            Visibility::All => true,
        }
    }
}

pub fn albums(snapshot: &Snapshot, visibility: Visibility) -> Vec<&Album> {
    snapshot.albums.iter().filter(|a| visibility.matches(*a)).collect()
}

pub fn photos(album: &Album, visibility: Visibility) -> Vec<&Photo> {
    album.photos.iter().filter(|p| visibility.matches(*p)).collect()
}

/// Number of photos shown in the album's live view
pub fn live_photo_count(album: &Album) -> usize {
    album.photos.iter().filter(|p| Visibility::Live.matches(*p)).count()
}

/// The photo shown on an album's tile
pub fn cover_photo(album: &Album) -> Option<&Photo> {
    album.photos.iter().find(|p| Visibility::Live.matches(*p))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlbumSort {
    #[default]
    Newest,
    Oldest,
    /// Alphabetical by name, ignoring case
    Az,
}

impl AlbumSort {
    pub fn as_str(self) -> &'static str {
        match self {
            AlbumSort::Newest => "newest",
            AlbumSort::Oldest => "oldest",
            AlbumSort::Az => "az",
        }
    }
}

impl fmt::Display for AlbumSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlbumSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "newest" => Ok(AlbumSort::Newest),
            "oldest" => Ok(AlbumSort::Oldest),
            "az" | "a-z" | "name" => Ok(AlbumSort::Az),
            other => Err(format!("unknown sort order '{other}' (expected newest, oldest or az)")),
        }
    }
}

/// Filter and ordering for the album grid
#[derive(Debug, Clone, Default)]
pub struct AlbumQuery {
    pub visibility: Visibility,
    /// Case-insensitive substring of the album name
    pub search: Option<String>,
    pub sort: AlbumSort,
}

pub fn query_albums<'a>(snapshot: &'a Snapshot, query: &AlbumQuery) -> Vec<&'a Album> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut result: Vec<&Album> = albums(snapshot, query.visibility)
        .into_iter()
        .filter(|a| match &needle {
            Some(needle) => a.name.to_lowercase().contains(needle),
            None => true,
        })
        .collect();

    match query.sort {
        AlbumSort::Newest => result.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        AlbumSort::Oldest => result.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        AlbumSort::Az => result.sort_by_key(|a| a.name.to_lowercase()),
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Step through an album's live photos with wrap-around
pub fn neighbor_photo<'a>(album: &'a Album, photo_id: &str, direction: Direction) -> Option<&'a Photo> {
    let live = photos(album, Visibility::Live);
    let total = live.len();
    let index = live.iter().position(|p| p.id == photo_id)?;
    let next = match direction {
        Direction::Next => (index + 1) % total,
        Direction::Previous => (index + total - 1) % total,
    };
    live.get(next).copied()
}
