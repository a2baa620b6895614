mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use kenangan_core::views::Visibility;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Sync chatter stays out of command output unless asked for
    kenangan_syncd::init_tracing(if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    });

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::SignIn { ref name } => return cli::commands::sign_in(config_path, name),
        Commands::SignOut => return cli::commands::sign_out(config_path),
        _ => {}
    }

    let config = cli::commands::load_config(config_path)?;
    match cli.command {
        Commands::ListAlbums {
            archived,
            all,
            search,
            sort,
        } => {
            let visibility = if all {
                Visibility::All
            } else if archived {
                Visibility::Archived
            } else {
                Visibility::Live
            };
            cli::commands::list_albums(&config, visibility, search, sort, cli.json).await?;
        }
        Commands::Show { album, archived } => {
            cli::commands::show_album(&config, &album, archived, cli.json).await?;
        }
        Commands::Album(cmd) => {
            cli::commands::album_command(&config, cmd, cli.json).await?;
        }
        Commands::Photo(cmd) => {
            cli::commands::photo_command(&config, cmd, cli.json).await?;
        }
        Commands::Comment { album, photo, text } => {
            cli::commands::add_comment(&config, &album, &photo, &text, cli.json).await?;
        }
        Commands::Status => {
            cli::commands::status(&config, cli.json).await?;
        }
        Commands::SignIn { .. } | Commands::SignOut => {}
    }

    Ok(())
}
