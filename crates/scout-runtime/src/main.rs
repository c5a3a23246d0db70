//! `proxy-scout` binary.

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use scout_runtime::{build_parts, log_summary, Args, Pipeline, ScoutConfig};
use scout_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        ScoutConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("configuration rejected")?;

    let telemetry = config.telemetry(TelemetryConfig::from_env());
    init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?config.mode,
        workers = config.sink_config().workers(),
        results = %config.results.path.display(),
        "starting proxy-scout"
    );

    let parts = build_parts(&config).await?;
    let cancel = CancellationToken::new();
    let pipeline = Pipeline::start(&config, parts, cancel.clone());

    shutdown_signal().await.context("failed to listen for shutdown signals")?;
    info!("shutdown signal received, draining pipeline");
    cancel.cancel();

    let summary = pipeline.join().await;
    log_summary(&summary);
    info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
