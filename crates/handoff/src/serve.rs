// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `handoff serve` command implementation.
//!
//! Opens the SQLite store, wires the hand-off service, and runs the timeout
//! and inactivity sweeps on their configured cadence until a shutdown signal
//! arrives. Each sweep catches its own per-session failures; a sweep that
//! fails as a whole is logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use handoff_config::HandoffConfig;
use handoff_core::{HandoffError, HealthStatus, SessionStore};
use handoff_engine::{HandoffService, SweepKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::commands::open_service;
use crate::shutdown;

/// Runs the `handoff serve` command.
pub async fn run_serve(config: HandoffConfig) -> Result<(), HandoffError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting handoff serve");

    let monitor = config.monitor.clone();
    let (service, store) = open_service(config).await?;
    let service = Arc::new(service);

    for (adapter, status) in service.health().await {
        match status {
            HealthStatus::Healthy => debug!(%adapter, "adapter healthy"),
            HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
                warn!(%adapter, %reason, "adapter not healthy at startup");
            }
        }
    }

    let cancel = shutdown::install_signal_handler();

    let mut loops: Vec<JoinHandle<()>> = Vec::new();
    if monitor.enabled {
        loops.push(spawn_sweep_loop(
            service.clone(),
            SweepKind::Timeout,
            Duration::from_secs(monitor.timeout_sweep_interval_secs),
            cancel.clone(),
        ));
        loops.push(spawn_sweep_loop(
            service.clone(),
            SweepKind::Inactivity,
            Duration::from_secs(monitor.inactivity_sweep_interval_secs),
            cancel.clone(),
        ));
        info!(
            timeout_every_secs = monitor.timeout_sweep_interval_secs,
            inactivity_every_secs = monitor.inactivity_sweep_interval_secs,
            pending_grace_secs = monitor.pending_grace_secs,
            inactivity_threshold_secs = monitor.inactivity_threshold_secs,
            "monitors started"
        );
    } else {
        info!("monitors disabled by configuration, waiting for shutdown");
    }

    cancel.cancelled().await;
    for handle in loops {
        if let Err(e) = handle.await {
            error!(error = %e, "sweep task ended abnormally");
        }
    }

    store.close().await?;
    info!("handoff serve shutdown complete");
    Ok(())
}

/// Runs one sweep kind every `period` until `cancel` fires. The first pass
/// happens one full period after startup.
fn spawn_sweep_loop(
    service: Arc<HandoffService>,
    kind: SweepKind,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = run_once(&service, kind).await {
                        error!(sweep = ?kind, error = %e, "sweep failed, retrying next tick");
                    }
                }
                _ = cancel.cancelled() => {
                    info!(sweep = ?kind, "sweep loop shutting down");
                    break;
                }
            }
        }
    })
}

pub(crate) async fn run_once(
    service: &HandoffService,
    kind: SweepKind,
) -> Result<handoff_engine::SweepReport, HandoffError> {
    match kind {
        SweepKind::Timeout => service.run_timeout_sweep().await,
        SweepKind::Inactivity => service.run_inactivity_sweep().await,
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` wins when set. Logs go to stderr so command output on stdout
/// stays clean.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("handoff={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
