use anyhow::Context;
use clap::Parser;
use kenangan_server::{config::Settings, router, AppState};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "kenangan-server", about = "kenangan document store API")]
struct Args {
    /// Path to server configuration TOML file
    #[arg(long, default_value = "~/.config/kenangan/server.toml")]
    config: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config_path = match args.config.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .context("Could not determine home directory")?
            .join(rest),
        None => PathBuf::from(&args.config),
    };
    let settings = Settings::from_file(&config_path)?;

    let state = AppState::open(&settings.storage).await?;
    let app = router(state);

    let host: IpAddr = settings
        .server
        .host
        .parse()
        .with_context(|| format!("invalid host '{}'", settings.server.host))?;
    let addr = SocketAddr::new(host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        data_dir = %settings.storage.data_dir.display(),
        max_body_bytes = settings.storage.max_body_bytes,
        "kenangan-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal, stopping kenangan-server");
        })
        .await?;
    Ok(())
}
