//! The run loop.
//!
//! Starts the controller, then ticks it on a fixed interval until the run
//! duration elapses, the executor exhausts the error budget, or `shutdown`
//! fires. Every await here, including a `start` or tick stalled waiting on
//! identities, is raced against all three, so the run always ends on time.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::controller::RunController;
use super::executor::TaskExecutor;
use super::report::RunOutcome;
use crate::config::RunConfig;

/// Drive one run to its end and report why it ended.
pub async fn drive(
    cfg: &RunConfig,
    controller: &RunController,
    executor: &Arc<TaskExecutor>,
    abort: &CancellationToken,
    shutdown: &CancellationToken,
) -> RunOutcome {
    let deadline = tokio::time::sleep(Duration::from_secs(cfg.duration_secs));
    tokio::pin!(deadline);

    let started = tokio::select! {
        started = controller.start() => started,
        _ = &mut deadline => {
            info!("Run duration elapsed during start");
            return RunOutcome::Completed;
        }
        _ = abort.cancelled() => return RunOutcome::ErrorBudgetExceeded,
        _ = shutdown.cancelled() => {
            info!("Shutdown signal received during start.");
            return RunOutcome::Interrupted;
        }
    };
    match started {
        Ok(tasks) => executor.submit(tasks),
        Err(e) => {
            error!(error = %e, "Run start failed");
            return RunOutcome::from_error(&e);
        }
    }

    let mut interval = tokio::time::interval(Duration::from_millis(cfg.tick_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        tick_ms = cfg.tick_interval_ms,
        "Entering control loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let ticked = tokio::select! {
                    ticked = controller.next() => ticked,
                    _ = &mut deadline => {
                        info!("Run duration elapsed mid-tick");
                        return RunOutcome::Completed;
                    }
                    _ = abort.cancelled() => return RunOutcome::ErrorBudgetExceeded,
                    _ = shutdown.cancelled() => {
                        info!("Shutdown signal received mid-tick.");
                        return RunOutcome::Interrupted;
                    }
                };
                match ticked {
                    Ok(tasks) => executor.submit(tasks),
                    Err(e) => {
                        error!(error = %e, "Controller tick failed");
                        return RunOutcome::from_error(&e);
                    }
                }
            }
            _ = abort.cancelled() => {
                error!(
                    errors = controller.score().error_count(),
                    limit = controller.score().error_limit(),
                    "Error budget exceeded, stopping run"
                );
                return RunOutcome::ErrorBudgetExceeded;
            }
            _ = &mut deadline => {
                info!("Run duration elapsed");
                return RunOutcome::Completed;
            }
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received.");
                return RunOutcome::Interrupted;
            }
        }
    }
}
