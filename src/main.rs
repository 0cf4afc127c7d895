//! swarmbench: adaptive load generator
//!
//! Entry point. Loads configuration, initialises structured logging,
//! starts the identity prefetcher, and drives the run controller on a
//! fixed tick until the run ends, the error budget runs out, or Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use swarmbench::client::http::HttpClientFactory;
use swarmbench::config::AppConfig;
use swarmbench::engine::controller::{ControllerDeps, ControllerSettings, RunController};
use swarmbench::engine::executor::TaskExecutor;
use swarmbench::engine::prefetch::IdentityPrefetcher;
use swarmbench::engine::registry::InvestorRegistry;
use swarmbench::engine::report::RunReport;
use swarmbench::engine::run;
use swarmbench::engine::tracker::ScoreTracker;
use swarmbench::investor::random::RandomInvestorFactory;
use swarmbench::ledger::isubank::IsubankLedger;
use swarmbench::ledger::Ledger;
use swarmbench::random::{Random, RandomProvider};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Room for several levels' worth of investors before the vector regrows.
const REGISTRY_CAPACITY: usize = 5_000;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("SWARMBENCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        target_app = %cfg.target.app_endpoint,
        duration_secs = cfg.run.duration_secs,
        allow_error_min = cfg.limits.allow_error_min,
        allow_error_max = cfg.limits.allow_error_max,
        "swarmbench starting up"
    );

    // -- Initialise components -------------------------------------------

    let random: Arc<dyn RandomProvider> = Arc::new(Random::new());
    let ledger: Arc<dyn Ledger> = Arc::new(IsubankLedger::new(&cfg.target.internal_bank_endpoint)?);
    let registry = Arc::new(InvestorRegistry::with_capacity(REGISTRY_CAPACITY));
    let score = Arc::new(ScoreTracker::from_limits(&cfg.limits));

    let prefetcher = Arc::new(IdentityPrefetcher::new(
        Arc::clone(&ledger),
        Arc::clone(&random),
        cfg.prefetch.capacity,
        Duration::from_millis(cfg.prefetch.retry_delay_ms),
    ));
    let prefetch_cancel = CancellationToken::new();
    let prefetch_handle = prefetcher.spawn(prefetch_cancel.clone());

    let abort = CancellationToken::new();
    let executor = Arc::new(TaskExecutor::new(
        Arc::clone(&ledger),
        Arc::clone(&registry),
        Arc::clone(&score),
        abort.clone(),
    ));

    let controller = RunController::new(
        ControllerSettings::from_config(&cfg, random.as_ref()),
        ControllerDeps {
            clients: Arc::new(HttpClientFactory::new()),
            investors: Arc::new(RandomInvestorFactory::new(Arc::clone(&score))),
            ledger: Arc::clone(&ledger),
            random: Arc::clone(&random),
            prefetcher: Arc::clone(&prefetcher),
            registry: Arc::clone(&registry),
            score: Arc::clone(&score),
        },
    );

    // -- Run -------------------------------------------------------------

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => shutdown.cancel(),
                Err(e) => warn!(error = %e, "Could not listen for Ctrl+C"),
            }
        });
    }

    let outcome = run::drive(&cfg.run, &controller, &executor, &abort, &shutdown).await;

    // -- Wind down -------------------------------------------------------

    prefetch_cancel.cancel();
    abort.cancel();
    executor
        .shutdown(Duration::from_millis(cfg.run.shutdown_grace_ms))
        .await;
    if let Err(e) = prefetch_handle.await {
        warn!(error = %e, "Identity prefetcher task ended abnormally");
    }

    let report = RunReport::collect(outcome, controller.level().await, &score, &registry);
    info!(
        outcome = %report.outcome,
        level = report.level,
        score = report.score,
        errors = report.errors,
        total_score = report.total_score,
        investors = report.investors,
        active = report.active_investors,
        "Run finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.outcome.is_success() {
        anyhow::bail!("Run did not complete: {}", report.outcome);
    }
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swarmbench=info"));

    let json_logging = std::env::var("SWARMBENCH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
