//! Run controller: turns score and error state into load.
//!
//! `start` bootstraps the target and creates the founding batch of
//! investors. Each `next` tick starts one waiting investor, collects work
//! from every signed-in investor, and levels up (adding a new batch) for as
//! long as the score allows. Both calls hold the controller lock for their
//! whole duration, so ticks never overlap each other or the startup.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::prefetch::IdentityPrefetcher;
use super::registry::InvestorRegistry;
use super::task::Task;
use super::tracker::ScoreTracker;
use crate::client::{BootstrapParams, ClientFactory, ClientTimeouts, Credentials, WireClient};
use crate::config::AppConfig;
use crate::investor::InvestorFactory;
use crate::ledger::Ledger;
use crate::random::RandomProvider;
use crate::types::{BenchError, InvestorParams};

/// Price assumed before any trade has been observed.
pub const DEFAULT_TRADE_PRICE: i64 = 100;

/// Score needed to advance past `level`: `2^level * 100`, saturating.
pub fn required_score(level: u32) -> i64 {
    1i64.checked_shl(level)
        .filter(|p| *p > 0)
        .and_then(|p| p.checked_mul(100))
        .unwrap_or(i64::MAX)
}

/// Endpoints, app ids and sizing the controller needs from configuration.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub app_endpoint: String,
    pub bootstrap: BootstrapParams,
    pub workers_per_level: usize,
    pub client_timeouts: ClientTimeouts,
    pub init_timeouts: ClientTimeouts,
}

impl ControllerSettings {
    /// Build from config, generating fresh bank/log app ids for this run.
    pub fn from_config(cfg: &AppConfig, random: &dyn RandomProvider) -> Self {
        let init = cfg.timeouts.init_timeout();
        Self {
            app_endpoint: cfg.target.app_endpoint.clone(),
            bootstrap: BootstrapParams {
                bank_endpoint: cfg.target.bank_endpoint.clone(),
                bank_app_id: random.new_identity().to_string(),
                log_endpoint: cfg.target.log_endpoint.clone(),
                log_app_id: random.new_identity().to_string(),
            },
            workers_per_level: cfg.limits.add_workers_by_level,
            client_timeouts: ClientTimeouts::new(
                cfg.timeouts.client_timeout(),
                cfg.timeouts.retire_timeout(),
            ),
            init_timeouts: ClientTimeouts::new(init, init),
        }
    }
}

/// The collaborators and shared state a controller drives.
pub struct ControllerDeps {
    pub clients: Arc<dyn ClientFactory>,
    pub investors: Arc<dyn InvestorFactory>,
    pub ledger: Arc<dyn Ledger>,
    pub random: Arc<dyn RandomProvider>,
    pub prefetcher: Arc<IdentityPrefetcher>,
    pub registry: Arc<InvestorRegistry>,
    pub score: Arc<ScoreTracker>,
}

#[derive(Debug, Default)]
struct ControllerState {
    level: u32,
}

pub struct RunController {
    settings: ControllerSettings,
    deps: ControllerDeps,
    state: Mutex<ControllerState>,
}

impl RunController {
    pub fn new(settings: ControllerSettings, deps: ControllerDeps) -> Self {
        Self {
            settings,
            deps,
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub async fn level(&self) -> u32 {
        self.state.lock().await.level
    }

    pub fn registry(&self) -> &Arc<InvestorRegistry> {
        &self.deps.registry
    }

    pub fn score(&self) -> &Arc<ScoreTracker> {
        &self.deps.score
    }

    /// Provision a client for a new investor with a prefetched identity.
    async fn new_client(&self) -> Result<Arc<dyn WireClient>, BenchError> {
        let identity = self.deps.prefetcher.fetch_new_id().await.map_err(|e| {
            BenchError::Provisioning(format!("no identity available: {e}"))
        })?;
        let credentials = Credentials::investor(
            identity,
            self.deps.random.new_display_name(),
            self.deps.random.new_secret(),
        );
        self.deps
            .clients
            .create(&self.settings.app_endpoint, credentials, self.settings.client_timeouts)
            .map_err(|e| BenchError::Provisioning(format!("{e:#}")))
    }

    /// Initialize the target and create the founding batch.
    ///
    /// Odd slots are credit-heavy buyers, even slots coin-heavy sellers;
    /// pairs share a base price starting at 100. Each investor's credit is
    /// deposited and it is registered before its start task is returned.
    pub async fn start(&self) -> Result<Vec<Task>, BenchError> {
        let _state = self.state.lock().await;

        let guest = self
            .deps
            .clients
            .create(
                &self.settings.app_endpoint,
                Credentials::guest(),
                self.settings.init_timeouts,
            )
            .map_err(|e| BenchError::Bootstrap(format!("{e:#}")))?;
        guest
            .initialize(&self.settings.bootstrap)
            .await
            .map_err(|e| BenchError::Bootstrap(format!("{e:#}")))?;
        info!(endpoint = %self.settings.app_endpoint, "Target initialized");

        let workers = self.settings.workers_per_level;
        let mut tasks = Vec::with_capacity(workers);
        for i in 0..workers {
            let client = self.new_client().await?;
            let base_price = 100 + (i / 2) as i64;
            let params = if i % 2 == 1 {
                InvestorParams::credit_heavy(10_000, 2, base_price)
            } else {
                InvestorParams::coin_heavy(1, 5, 2, base_price)
            };
            let investor = self.deps.investors.build(client, params);

            if let Err(e) = self
                .deps
                .ledger
                .deposit_credit(investor.identity(), investor.credit())
                .await
            {
                warn!(bank_id = %investor.identity(), error = %e, "Initial credit deposit failed");
            }
            self.deps.registry.add(Arc::clone(&investor));
            tasks.push(investor.start());
        }

        info!(investors = workers, "Founding batch created");
        Ok(tasks)
    }

    /// One control-loop tick.
    pub async fn next(&self) -> Result<Vec<Task>, BenchError> {
        let mut state = self.state.lock().await;
        let mut tasks = Vec::new();

        // Stagger start-up: one new investor per tick.
        if let Some(investor) = self.deps.registry.first_not_started() {
            debug!(bank_id = %investor.identity(), "Starting investor");
            tasks.push(investor.start());
        }

        for investor in self.deps.registry.signed_in() {
            if let Some(task) = investor.next() {
                tasks.push(task);
            }
        }

        let score = self.deps.score.score();
        loop {
            if score < required_score(state.level) {
                break;
            }
            let errors = self.deps.score.error_count();
            if errors > self.deps.score.allow_error_min() {
                debug!(errors, level = state.level, "Level-up held back by errors");
                break;
            }

            // Approximation: the founding investor's view of the market
            // stands in for the current price.
            let latest_price = self
                .deps
                .registry
                .first()
                .map(|i| i.latest_trade_price())
                .filter(|p| *p != 0)
                .unwrap_or(DEFAULT_TRADE_PRICE);

            state.level += 1;
            let unit_amount = i64::from(state.level) * 5;
            info!(
                level = state.level,
                score,
                errors,
                latest_price,
                unit_amount,
                "Worker level up"
            );

            for i in 0..self.settings.workers_per_level {
                let client = self.new_client().await?;
                let params = if i % 2 == 1 {
                    InvestorParams::credit_heavy(latest_price * 1_000, unit_amount, latest_price - 2)
                } else {
                    InvestorParams::coin_heavy(1, unit_amount * 100, unit_amount, latest_price + 5)
                };
                let investor = self.deps.investors.build(client, params);
                let credit = investor.credit();
                tasks.push(Task::enroll(investor, credit));
            }
        }

        Ok(tasks)
    }
}
