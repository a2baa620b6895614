pub mod commands;

use clap::{Parser, Subcommand};
use kenangan_core::views::AlbumSort;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(name = "kenangan", about = "Shared photo albums")]
#[clap(version, author)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[clap(long, global = true)]
    pub json: bool,

    /// Path to configuration file (defaults to ~/.config/kenangan/config.toml)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List albums
    #[clap(name = "ls")]
    ListAlbums {
        /// Show archived albums instead of live ones
        #[clap(long, conflicts_with = "all")]
        archived: bool,
        /// Show live and archived albums
        #[clap(long)]
        all: bool,
        /// Only albums whose name contains this text
        #[clap(long, short)]
        search: Option<String>,
        /// newest, oldest or az
        #[clap(long, default_value_t = AlbumSort::Newest)]
        sort: AlbumSort,
    },

    /// Show the photos of an album
    #[clap(name = "show")]
    Show {
        /// Album id or name
        album: String,
        /// Include archived photos
        #[clap(long)]
        archived: bool,
    },

    /// Album commands
    #[clap(subcommand, name = "album")]
    Album(AlbumCommands),

    /// Photo commands
    #[clap(subcommand, name = "photo")]
    Photo(PhotoCommands),

    /// Comment on a photo
    #[clap(name = "comment")]
    Comment {
        /// Album id or name
        album: String,
        /// Photo id or position (1 = newest)
        photo: String,
        text: String,
    },

    /// Remember the name stamped on new photos and comments
    #[clap(name = "sign-in")]
    SignIn { name: String },

    /// Forget the stored name
    #[clap(name = "sign-out")]
    SignOut,

    /// Show sync configuration and state
    #[clap(name = "status")]
    Status,
}

#[derive(Subcommand, Clone)]
pub enum AlbumCommands {
    /// Create an album
    #[clap(name = "new")]
    New { name: String },

    /// Rename an album
    #[clap(name = "rename")]
    Rename {
        /// Album id or name
        album: String,
        name: String,
    },

    /// Hide an album from the default listing
    #[clap(name = "archive")]
    Archive {
        /// Album id or name
        album: String,
    },

    /// Bring back an archived album
    #[clap(name = "restore")]
    Restore {
        /// Album id or name
        album: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum PhotoCommands {
    /// Add photos by URL; they appear first in the album, in the given order
    #[clap(name = "add")]
    Add {
        /// Album id or name
        album: String,
        #[clap(required = true)]
        urls: Vec<String>,
        /// Caption applied to every added photo
        #[clap(long)]
        caption: Option<String>,
    },

    /// Set or clear a caption
    #[clap(name = "caption")]
    Caption {
        /// Album id or name
        album: String,
        /// Photo id or position (1 = newest)
        photo: String,
        /// New caption; omit to clear
        text: Option<String>,
    },

    /// Hide a photo
    #[clap(name = "archive")]
    Archive {
        /// Album id or name
        album: String,
        /// Photo id or position (1 = newest)
        photo: String,
    },

    /// Bring back an archived photo
    #[clap(name = "restore")]
    Restore {
        /// Album id or name
        album: String,
        /// Photo id
        photo: String,
    },
}
