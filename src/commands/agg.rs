use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::State;
use crate::aggregator::Scheduler;
use crate::feed::build_client;

/// Parse an `agg` interval such as `30s`, `1m` or `3m45s`. Zero is rejected.
pub fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

pub(super) async fn aggregate(state: &State, interval: Duration) -> Result<()> {
    let client = build_client().context("Failed to build HTTP client")?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // Without handlers the scheduler only stops on its own
                tracing::warn!(error = %e, "Failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    });

    println!(
        "Collecting feeds every {}",
        humantime::format_duration(interval)
    );

    let mut scheduler = Scheduler::new(state.db.clone(), client, interval);
    scheduler.run(shutdown_rx).await?;

    println!("Stopped collecting feeds");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM (Ctrl-C elsewhere).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, finishing current tick");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, finishing current tick");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl-C, finishing current tick");
    }

    Ok(())
}
