//! RFGhost - Main Entry Point
//!
//! Loads configuration, wires source -> scheduler -> emitter -> sinks,
//! scans until Ctrl-C, then drains the output queue. Exit waits at most
//! `SHUTDOWN_GRACE_SECS` for reads still stuck on the blocking pool.

mod api;
mod logic;
pub mod constants;

use std::future::Future;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use tokio::sync::watch;

use constants::{APP_NAME, APP_VERSION, SHUTDOWN_GRACE_SECS, STATUS_REPORT_INTERVAL_SECS};
use logic::config::MonitorConfig;
use logic::emitter::{self, recorder, Emitter};
use logic::error::MonitorResult;
use logic::scheduler::{ScanHandle, ScanScheduler};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    match block_on_bounded(run(), Duration::from_secs(SHUTDOWN_GRACE_SECS)) {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(e)) => {
            log::error!("{} stopped: {}", APP_NAME, e);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("Cannot start async runtime: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Drive `task` on a fresh runtime, then give blocking work `grace` to finish
fn block_on_bounded<F: Future>(task: F, grace: Duration) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let output = runtime.block_on(task);
    runtime.shutdown_timeout(grace);
    Ok(output)
}

async fn run() -> MonitorResult<()> {
    let config_path = constants::get_config_path();
    let config = MonitorConfig::load(&config_path)?;

    if let Some(ref recorder) = config.output.recorder {
        log_previous_session(&recorder.resolved_dir());
    }

    let source = config.build_source()?;
    let sinks = emitter::build_sinks(&config.output)?;
    let (emitter, dispatcher) = Emitter::spawn(sinks, config.output.queue_capacity)?;
    let scheduler = ScanScheduler::new(&config, source, emitter)?;
    let handle = scheduler.handle();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scan = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let reporter = tokio::spawn(report_status(
        handle.clone(),
        Duration::from_secs(STATUS_REPORT_INTERVAL_SECS),
        shutdown_rx,
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C: {}", e);
    }
    log::info!("Shutdown requested, finishing current read...");
    let _ = shutdown_tx.send(true);

    let summary = match scan.await {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("Scan task aborted: {}", e);
            Default::default()
        }
    };
    let _ = reporter.await;

    // Scheduler dropped its emitter; the dispatcher drains what is queued
    let delivery = tokio::task::spawn_blocking(move || dispatcher.join())
        .await
        .unwrap_or_default();

    let status = api::scan_status(&handle);
    log::info!(
        "Final: {} cycles, {} rotations, {} anomalies, {} skipped, {} records dropped, {} deliveries ({} failed)",
        summary.cycles,
        summary.rotations,
        summary.anomalies,
        summary.skipped,
        status.dropped_records,
        delivery.delivered,
        delivery.failed
    );
    match serde_json::to_string(&status) {
        Ok(json) => log::debug!("Final status: {}", json),
        Err(e) => log::warn!("Cannot serialize final status: {}", e),
    }

    Ok(())
}

/// Note where the last run's signal log left off
fn log_previous_session(dir: &Path) {
    match recorder::recent_records(dir, 1) {
        Ok(records) => {
            if let Some(last) = records.last() {
                let at = chrono::DateTime::from_timestamp(last.timestamp as i64, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| last.timestamp.to_string());
                log::info!(
                    "Previous session last recorded {:.3} MHz at {} ({} anomalies)",
                    last.frequency_hz as f64 / 1e6,
                    at,
                    last.anomaly_events.len()
                );
            }
        }
        Err(e) => log::warn!("Cannot read previous signal log in {:?}: {}", dir, e),
    }
}

/// Periodic one-line health report until shutdown
async fn report_status(handle: ScanHandle, every: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = api::scan_status(&handle);
                let skipped: u64 = status.channels.iter().map(|c| c.counters.skipped).sum();
                let anomalies: u64 = status.channels.iter().map(|c| c.counters.anomalies).sum();
                log::info!(
                    "[Status] {} cycles, {} rotations, {} anomalies, {} skipped, phase {:?}",
                    status.cycle_count,
                    status.rotations,
                    anomalies,
                    skipped,
                    status.phase
                );
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
