use anyhow::{Context, Result};
use clap::Parser;
use kenangan_core::Config;
use kenangan_syncd::{engine_from_config, init_tracing, PullOutcome, SyncEngine};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kenangan-syncd", about = "Background sync daemon for kenangan shared albums")]
struct Args {
    /// Path to configuration file (defaults to ~/.config/kenangan/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh the local replica once and exit
    #[arg(long)]
    once: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_home(path: PathBuf) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(rest)),
        Err(_) => Ok(path),
    }
}

fn log_outcome(outcome: &PullOutcome) {
    match outcome {
        PullOutcome::Applied { found: false, .. } => {
            info!("no document stored yet, starting with an empty collection")
        }
        PullOutcome::Applied { albums, .. } => info!(albums, "replica refreshed"),
        PullOutcome::Vetoed(veto) => info!(?veto, "pull skipped"),
        PullOutcome::Failed(e) => warn!(error = %e, "pull failed, serving cached replica"),
    }
}

async fn initial_load(engine: &SyncEngine, config: &Config) -> PullOutcome {
    match config.identity.author {
        Some(ref author) => engine.sign_in(author.clone()).await,
        None => engine.force_pull().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    });

    let config = match args.config {
        Some(path) => Config::load_from(&expand_home(path)?)?,
        None => Config::load()?,
    };

    let engine = engine_from_config(&config)?;
    info!(
        interval_secs = config.sync.interval_seconds,
        quiet_period_ms = config.sync.quiet_period_ms,
        "kenangan-syncd starting"
    );

    let outcome = initial_load(&engine, &config).await;
    log_outcome(&outcome);
    if args.once {
        return match outcome {
            PullOutcome::Failed(e) => Err(e.into()),
            _ => Ok(()),
        };
    }

    let mut poller = engine.spawn_poller();
    let mut status = engine.subscribe();

    loop {
        tokio::select! {
            stopped = &mut poller => {
                if let Err(e) = stopped {
                    warn!(error = %e, "poller stopped unexpectedly");
                }
                break;
            }

            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                info!(
                    state = current.label(),
                    pending = current.pending_changes,
                    "sync status changed"
                );
            }

            _ = tokio::signal::ctrl_c() => {
                info!("received shutdown signal, stopping kenangan-syncd");
                break;
            }
        }
    }

    poller.abort();
    Ok(())
}
