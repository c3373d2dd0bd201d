//! `nasd` — NAS appliance management daemon: an HTTP+WebSocket control and
//! telemetry surface composed at boot from the leaf crates in this
//! workspace (§9 "compose at boot, depend on the interface").

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use nasd::pipeline;
use nasd::state::AppState;
use nasd_core::config::AppConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nasd", version, about = "NAS appliance management daemon")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "nasd.yaml")]
    config: PathBuf,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Background sweeper: evicts idle rate-limit buckets and retention-expired
/// async operations on a fixed interval, mirroring the teacher's scheduler
/// idiom of a single interval-driven task per housekeeping concern.
fn spawn_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            state.rate_limiter.sweep_idle();
            state.operations.sweep_expired();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    init_tracing(&config.logging.level);

    if !config.http_server.enabled {
        tracing::warn!("http_server.enabled is false; nothing to serve, exiting");
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", config.http_server.host, config.http_server.port).parse()?;
    let state = AppState::bootstrap(config);
    spawn_sweeper(state.clone());

    let router = pipeline::build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "nasd listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("nasd stopped");
    Ok(())
}
