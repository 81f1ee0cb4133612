use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use workerly::api::{create_router, AppState};
use workerly::utils::{logger, validation::Validate};
use workerly::WorkerlyConfig;

#[derive(Parser)]
#[command(name = "workerly-server")]
#[command(about = "HTTP API for workspaces and remaining work reports")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "WORKERLY_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides `server.bind_address`
    #[arg(long)]
    bind: Option<SocketAddr>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::warn!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = WorkerlyConfig::load(args.config.as_deref())?;
    logger::init_service_logger(&config.logging.level, config.logging.json);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let addr = match args.bind {
        Some(addr) => addr,
        None => config.server.bind_address.parse()?,
    };

    let state = AppState::from_config(&config)?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Workerly API listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Workerly API stopped");
    Ok(())
}
