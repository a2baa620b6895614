use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use kenangan_core::mutations::validate_album_name;
use kenangan_core::views::{self, AlbumQuery, AlbumSort, Visibility};
use kenangan_core::{
    new_id, now_millis, Album, Comment, Config, EntityRef, Mutation, Photo, Snapshot, Timestamp,
};
use kenangan_syncd::{engine_from_config, PullOutcome, SyncEngine};
use std::path::{Path, PathBuf};

use crate::cli::{AlbumCommands, PhotoCommands};

/// Resolve the config file the same way `Config::load` does
fn config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => match std::env::var("KENANGAN_CONFIG") {
            Ok(custom) => Ok(PathBuf::from(custom)),
            Err(_) => Config::default_path(),
        },
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Start a replica and refresh it from the store.
///
/// With `strict` a failed refresh aborts: a mutation applied to a stale replica
/// would push that stale snapshot over everyone else's changes.
async fn open_replica(config: &Config, strict: bool) -> Result<SyncEngine> {
    let engine = engine_from_config(config)?;
    let outcome = match config.identity.author {
        Some(ref author) => engine.sign_in(author.clone()).await,
        None => engine.force_pull().await,
    };
    if let PullOutcome::Failed(e) = outcome {
        if strict {
            bail!("could not refresh albums from the store: {e}\nNothing was changed.");
        }
        eprintln!("{} showing cached albums ({})", "warning:".yellow().bold(), e);
    }
    Ok(engine)
}

/// Apply one mutation and wait until the store has it
async fn commit(engine: &SyncEngine, mutation: Mutation) -> Result<()> {
    engine
        .apply(mutation)
        .outcome()
        .await
        .context("the change was not saved to the shared store")
}

/// Find an album by id, or by name ignoring case. Live albums win over
/// archived ones with the same name.
pub fn resolve_album<'a>(snapshot: &'a Snapshot, target: &str) -> Result<&'a Album> {
    if let Some(album) = snapshot.album(target) {
        return Ok(album);
    }
    let wanted = target.trim().to_lowercase();
    let named: Vec<&Album> = snapshot
        .albums
        .iter()
        .filter(|a| a.name.to_lowercase() == wanted)
        .collect();
    let live: Vec<&Album> = named.iter().copied().filter(|a| !a.is_archived()).collect();
    let candidates = if live.is_empty() { named } else { live };

    match candidates.as_slice() {
        [album] => Ok(*album),
        [] => bail!("no album matches '{}'", target),
        many => bail!(
            "'{}' matches {} albums, use an id instead: {}",
            target,
            many.len(),
            many.iter().map(|a| a.id.as_str()).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Find a photo by id, or by its 1-based position among the live photos
/// (as printed by `show`)
pub fn resolve_photo<'a>(album: &'a Album, target: &str) -> Result<&'a Photo> {
    if let Some(photo) = album.photo(target) {
        return Ok(photo);
    }
    let live = views::photos(album, Visibility::Live);
    if let Ok(position) = target.trim_start_matches('#').parse::<usize>() {
        if let Some(photo) = position.checked_sub(1).and_then(|i| live.get(i).copied()) {
            return Ok(photo);
        }
        bail!("album '{}' has {} photos, no #{}", album.name, live.len(), position);
    }
    bail!("no photo '{}' in album '{}'", target, album.name)
}

fn format_date(millis: Timestamp) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn archived_marker(archived: bool) -> ColoredString {
    if archived {
        " (archived)".red()
    } else {
        "".normal()
    }
}

/// Handle the 'ls' command
pub async fn list_albums(
    config: &Config,
    visibility: Visibility,
    search: Option<String>,
    sort: AlbumSort,
    json: bool,
) -> Result<()> {
    let engine = open_replica(config, false).await?;
    let query = AlbumQuery {
        visibility,
        search,
        sort,
    };

    engine.read(|snapshot| {
        let albums = views::query_albums(snapshot, &query);
        if json {
            println!("{}", serde_json::to_string(&albums)?);
            return Ok(());
        }
        if albums.is_empty() {
            println!("No albums found. Create one with 'kenangan album new <name>'");
            return Ok(());
        }

        println!("Albums ({}):", sort);
        for album in albums {
            let cover = views::cover_photo(album)
                .map(|p| p.url.as_str())
                .unwrap_or("-");
            println!(
                "  {}{}  {} photos  {}  {}",
                album.name.cyan().bold(),
                archived_marker(album.is_archived()),
                views::live_photo_count(album),
                format_date(album.created_at).dimmed(),
                album.id.dimmed()
            );
            println!("    cover: {}", cover.dimmed());
        }
        Ok(())
    })
}

/// Handle the 'show' command
pub async fn show_album(config: &Config, target: &str, archived: bool, json: bool) -> Result<()> {
    let engine = open_replica(config, false).await?;
    engine.read(|snapshot| {
        let album = resolve_album(snapshot, target)?;
        if json {
            println!("{}", serde_json::to_string(album)?);
            return Ok(());
        }

        println!(
            "{}{}  {}",
            album.name.cyan().bold(),
            archived_marker(album.is_archived()),
            format_date(album.created_at).dimmed()
        );

        let visibility = if archived {
            Visibility::All
        } else {
            Visibility::Live
        };
        let photos = views::photos(album, visibility);
        if photos.is_empty() {
            println!("  No photos in album");
            return Ok(());
        }

        let mut position = 0;
        for photo in photos {
            let label = if photo.is_archived() {
                "  -".to_string()
            } else {
                position += 1;
                format!("#{}", position)
            };
            println!(
                "{} {}{} {}",
                label,
                photo.url,
                archived_marker(photo.is_archived()),
                photo.id.dimmed()
            );
            if let Some(ref caption) = photo.caption {
                println!("     {}", caption.italic());
            }
            if let Some(ref author) = photo.author {
                println!("     by {} on {}", author, format_date(photo.timestamp));
            }
            for comment in &photo.comments {
                println!("     {} {}", format!("{}:", comment.author).green(), comment.text);
            }
        }
        Ok(())
    })
}

/// Handle 'album' subcommands
pub async fn album_command(config: &Config, cmd: AlbumCommands, json: bool) -> Result<()> {
    let engine = open_replica(config, true).await?;
    match cmd {
        AlbumCommands::New { name } => {
            let name = validate_album_name(&name)?;
            let album = Album::new(new_id(), name, now_millis());
            commit(&engine, Mutation::CreateAlbum(album.clone())).await?;
            if json {
                println!("{}", serde_json::to_string(&album)?);
            } else {
                println!("Created album '{}' {}", album.name, album.id.dimmed());
            }
        }
        AlbumCommands::Rename { album, name } => {
            let name = validate_album_name(&name)?;
            let album_id = engine.read(|s| resolve_album(s, &album).map(|a| a.id.clone()))?;
            commit(
                &engine,
                Mutation::RenameAlbum {
                    album_id,
                    name: name.clone(),
                },
            )
            .await?;
            if !json {
                println!("Renamed '{}' to '{}'", album, name);
            }
        }
        AlbumCommands::Archive { album } => {
            let album_id = engine.read(|s| resolve_album(s, &album).map(|a| a.id.clone()))?;
            commit(
                &engine,
                Mutation::Archive {
                    target: EntityRef::album(album_id),
                    at: now_millis(),
                },
            )
            .await?;
            if !json {
                println!("Archived album '{}'", album);
            }
        }
        AlbumCommands::Restore { album } => {
            let album_id = engine.read(|s| resolve_album(s, &album).map(|a| a.id.clone()))?;
            commit(&engine, Mutation::Restore(EntityRef::album(album_id))).await?;
            if !json {
                println!("Restored album '{}'", album);
            }
        }
    }
    Ok(())
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Handle 'photo' subcommands
pub async fn photo_command(config: &Config, cmd: PhotoCommands, json: bool) -> Result<()> {
    let engine = open_replica(config, true).await?;
    match cmd {
        PhotoCommands::Add {
            album,
            urls,
            caption,
        } => {
            let album_id = engine.read(|s| resolve_album(s, &album).map(|a| a.id.clone()))?;
            let caption = non_blank(caption);
            let author = engine.author();
            let mut photos = Vec::with_capacity(urls.len());
            for url in urls {
                let url = url.trim();
                if url.is_empty() {
                    bail!("photo URL must not be empty");
                }
                let mut photo = Photo::new(url, author.clone());
                photo.caption = caption.clone();
                photos.push(photo);
            }

            let count = photos.len();
            let added: Vec<String> = photos.iter().map(|p| p.id.clone()).collect();
            commit(&engine, Mutation::AddPhotos { album_id, photos }).await?;
            if json {
                println!("{}", serde_json::to_string(&added)?);
            } else {
                println!("Added {} photo(s) to '{}'", count, album);
            }
        }
        PhotoCommands::Caption { album, photo, text } => {
            let (album_id, photo_id) = engine.read(|s| -> Result<_> {
                let a = resolve_album(s, &album)?;
                Ok((a.id.clone(), resolve_photo(a, &photo)?.id.clone()))
            })?;
            let caption = non_blank(text);
            let cleared = caption.is_none();
            commit(
                &engine,
                Mutation::SetCaption {
                    album_id,
                    photo_id,
                    caption,
                },
            )
            .await?;
            if !json {
                println!("{}", if cleared { "Caption cleared" } else { "Caption updated" });
            }
        }
        PhotoCommands::Archive { album, photo } => {
            let (album_id, photo_id) = engine.read(|s| -> Result<_> {
                let a = resolve_album(s, &album)?;
                Ok((a.id.clone(), resolve_photo(a, &photo)?.id.clone()))
            })?;
            commit(
                &engine,
                Mutation::Archive {
                    target: EntityRef::photo(album_id, photo_id),
                    at: now_millis(),
                },
            )
            .await?;
            if !json {
                println!("Archived photo {} in '{}'", photo, album);
            }
        }
        PhotoCommands::Restore { album, photo } => {
            let (album_id, photo_id) = engine.read(|s| -> Result<_> {
                let a = resolve_album(s, &album)?;
                Ok((a.id.clone(), resolve_photo(a, &photo)?.id.clone()))
            })?;
            commit(&engine, Mutation::Restore(EntityRef::photo(album_id, photo_id))).await?;
            if !json {
                println!("Restored photo {} in '{}'", photo, album);
            }
        }
    }
    Ok(())
}

/// Handle the 'comment' command
pub async fn add_comment(
    config: &Config,
    album: &str,
    photo: &str,
    text: &str,
    json: bool,
) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        bail!("comment must not be empty");
    }
    let engine = open_replica(config, true).await?;
    let Some(author) = engine.author() else {
        bail!("sign in first with 'kenangan sign-in <name>'");
    };

    let (album_id, photo_id) = engine.read(|s| -> Result<_> {
        let a = resolve_album(s, album)?;
        Ok((a.id.clone(), resolve_photo(a, photo)?.id.clone()))
    })?;
    let comment = Comment::new(author, text);
    commit(
        &engine,
        Mutation::AddComment {
            album_id,
            photo_id,
            comment: comment.clone(),
        },
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string(&comment)?);
    } else {
        println!("{} {}", format!("{}:", comment.author).green(), comment.text);
    }
    Ok(())
}

/// Persist the display name used for new photos and comments
pub fn sign_in(path: Option<&Path>, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("name must not be empty");
    }
    let path = config_path(path)?;
    let mut config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::default()
    };
    config.identity.author = Some(name.to_string());
    config.save_to(&path)?;
    println!("Signed in as {}", name.cyan());
    Ok(())
}

pub fn sign_out(path: Option<&Path>) -> Result<()> {
    let path = config_path(path)?;
    let mut config = load_config(Some(&path))?;
    config.identity.author = None;
    config.save_to(&path)?;
    println!("Signed out");
    Ok(())
}

/// Handle the 'status' command
pub async fn status(config: &Config, json: bool) -> Result<()> {
    let engine = open_replica(config, false).await?;
    let status = engine.status();
    let (albums, photos) = engine.read(|s| {
        let live = views::albums(s, Visibility::Live);
        let photos = live.iter().map(|a| views::live_photo_count(a)).sum::<usize>();
        (live.len(), photos)
    });
    let cache = config.cache.resolved_path()?;

    if json {
        let value = serde_json::json!({
            "endpoint": config.store.endpoint,
            "author": engine.author(),
            "state": status.label(),
            "error": match status.state {
                kenangan_syncd::SyncState::Error(ref e) => Some(e.clone()),
                _ => None,
            },
            "lastSync": status.last_sync,
            "pendingChanges": status.pending_changes,
            "albums": albums,
            "photos": photos,
            "cache": cache,
        });
        println!("{}", serde_json::to_string(&value)?);
        return Ok(());
    }

    let state: ColoredString = match status.state {
        kenangan_syncd::SyncState::Live => status.label().green(),
        kenangan_syncd::SyncState::Error(_) => status.label().red(),
        _ => status.label().yellow(),
    };
    match config.store.endpoint {
        Some(ref endpoint) => println!("Store:   {}", endpoint),
        None => println!("Store:   {}", "local-only".yellow()),
    }
    println!("Status:  {}", state);
    if let kenangan_syncd::SyncState::Error(ref e) = status.state {
        println!("Error:   {}", e.red());
    }
    if let Some(last_sync) = status.last_sync {
        println!("Synced:  {}", last_sync.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    }
    println!("Author:  {}", engine.author().unwrap_or_else(|| "-".to_string()));
    println!("Albums:  {} ({} photos)", albums, photos);
    match cache {
        Some(path) => println!("Cache:   {}", path.display()),
        None => println!("Cache:   disabled"),
    }
    Ok(())
}
