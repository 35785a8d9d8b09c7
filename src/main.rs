use anyhow::Context as _;
use demo_apps::server::{
    build_router, forward_signals, shutdown_channel, AppState, DrainOutcome, ServerHandle,
    TerminationSignals,
};
use demo_apps::Config;
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started = Instant::now();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        port = config.port,
        pod = %config.pod_name,
        namespace = %config.namespace,
        node_env = %config.node_env,
        shutdown_timeout_secs = config.shutdown_timeout.as_secs(),
        "Starting demo-apps"
    );

    let server = match ServerHandle::bind(config.port).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to start HTTP server");
            return Err(e.into());
        }
    };

    // Register handlers before serving so a failure here is a startup error
    let signals =
        TerminationSignals::register().context("failed to register termination signal handlers")?;
    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    tokio::spawn(forward_signals(signals, shutdown_controller));

    let drain_timeout = config.shutdown_timeout;
    let app = build_router(AppState::new(config, started));

    match server.serve(app, shutdown_signal, drain_timeout).await? {
        DrainOutcome::Completed => info!("Shut down gracefully"),
        DrainOutcome::TimedOut => info!("Shut down after drain timeout"),
    }
    Ok(())
}
