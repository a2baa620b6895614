pub mod album;

pub use album::{new_id, now_millis, Album, Comment, Photo, Snapshot, Timestamp};
