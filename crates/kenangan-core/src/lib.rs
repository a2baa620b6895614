pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod mutations;
pub mod tombstone;
pub mod views;

// Re-export commonly used types and functions
pub use cache::ReplicaCache;
pub use config::Config;
pub use error::{Error, Result};
pub use models::{new_id, now_millis, Album, Comment, Photo, Snapshot, Timestamp};
pub use mutations::Mutation;
pub use tombstone::EntityRef;
