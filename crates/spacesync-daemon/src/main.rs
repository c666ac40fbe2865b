//! spacesync daemon
//!
//! Tracks yabai or AeroSpace spaces and serves them on a control socket.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use spacesync_config::DEFAULT_CONFIG_PATH;
use spacesync_daemon::ipc::{handle_ipc_connection, IpcServer};
use spacesync_daemon::provider::{resolve_provider, CommandRunner, PgrepProbe, ProcessRunner};
use spacesync_daemon::{SyncSettings, Synchronizer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spacesyncd")]
#[command(about = "Window-manager space synchronizer daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Backend to use instead of the configured one (auto, yabai, aerospace)
    #[arg(short, long)]
    backend: Option<String>,

    /// Control socket path
    #[arg(short, long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();

    let mut config = spacesync_config::load_config(&config_path)?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.global.log_level.as_filter())),
        )
        .init();

    tracing::info!("Loaded configuration from {}", config_path.display());

    if let Some(backend) = &args.backend {
        config.backend.kind = backend.parse().map_err(anyhow::Error::msg)?;
    }

    let runner: Arc<dyn CommandRunner> =
        Arc::new(ProcessRunner::new(config.backend.command_timeout()));
    let probe = PgrepProbe::new(runner.clone());
    let provider = resolve_provider(&config, runner, &probe, None).await;

    let sync = Arc::new(Synchronizer::new(
        provider,
        SyncSettings::from(&config.backend),
    ));
    sync.start_monitoring();

    let server = IpcServer::new(args.socket.or_else(|| config.global.control_socket.clone()))?;

    tracing::info!("spacesync daemon running");

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let sync = sync.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_ipc_connection(stream, sync).await {
                            tracing::warn!("IPC connection failed: {:#}", e);
                        }
                    });
                }
                Err(e) => tracing::warn!("{:#}", e),
            },
        }
    }

    tracing::info!("Shutting down...");
    sync.stop_monitoring();

    Ok(())
}
