//! Racetrack binary: read the environment, bind, serve until signalled.

use std::process::ExitCode;

use racetrack::{RacetrackServer, ServerConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "cannot start racetrack server");
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_addr();
    let server = match RacetrackServer::builder()
        .bind(&addr)
        .race_config(config.race)
        .keys(config.keys)
        .build()
        .await
    {
        Ok(server) => server,
        Err(err) => {
            error!(%err, %addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    let minutes = config.race.race_duration.as_secs() / 60;
    let mode = if config.dev_mode { "development" } else { "production" };
    info!(mode, race_minutes = minutes, %addr, "racetrack server listening");

    if let Err(err) = server.run_until(shutdown_signal()).await {
        error!(%err, "server stopped with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Configure tracing: `RUST_LOG` if set, `info` otherwise.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(%err, "cannot listen for SIGTERM, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
