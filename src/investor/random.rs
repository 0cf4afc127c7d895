//! Random investor: the default trading strategy.
//!
//! Signs up and signs in on start, then on every tick where it is idle
//! polls the market and places one order near its base price: credit-heavy
//! investors buy, coin-heavy investors sell until their coins run out.
//! Buy orders never bid above the lowest ask and sell orders never ask
//! below the highest bid. At most one job per investor is in flight at a
//! time.

use anyhow::{Context, Result};
use futures::FutureExt;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Investor, InvestorFactory};
use crate::client::{MarketInfo, OrderKind, WireClient};
use crate::engine::task::Task;
use crate::engine::tracker::ScoreTracker;
use crate::types::{Identity, InvestorParams, Lifecycle, StrategyKind};

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

pub const SCORE_SIGNUP: i64 = 1;
pub const SCORE_SIGNIN: i64 = 1;
pub const SCORE_INFO: i64 = 1;
pub const SCORE_ORDER: i64 = 5;

/// Orders are placed within ± this many units of the base price.
const PRICE_JITTER: i64 = 2;

/// Upper bound of the random pause before each trading job.
const MAX_THINK_MS: u64 = 500;

// ---------------------------------------------------------------------------
// Investor
// ---------------------------------------------------------------------------

pub struct RandomInvestor {
    identity: Identity,
    client: Arc<dyn WireClient>,
    params: InvestorParams,
    score: Arc<ScoreTracker>,
    state: AtomicU8,
    busy: AtomicBool,
    /// Coins not yet committed to a sell order.
    coins: AtomicI64,
    cursor: AtomicI64,
    latest_price: AtomicI64,
}

impl RandomInvestor {
    pub fn new(client: Arc<dyn WireClient>, params: InvestorParams, score: Arc<ScoreTracker>) -> Self {
        let identity = client.identity().cloned().unwrap_or_default();
        Self {
            identity,
            client,
            params,
            score,
            state: AtomicU8::new(Lifecycle::NotStarted as u8),
            busy: AtomicBool::new(false),
            coins: AtomicI64::new(params.coins),
            cursor: AtomicI64::new(0),
            latest_price: AtomicI64::new(0),
        }
    }

    pub fn params(&self) -> &InvestorParams {
        &self.params
    }

    pub fn coins(&self) -> i64 {
        self.coins.load(Ordering::SeqCst)
    }

    fn has_stock(&self) -> bool {
        match self.params.kind {
            StrategyKind::CreditHeavy => true,
            StrategyKind::CoinHeavy => self.coins() >= self.params.unit_amount,
        }
    }

    fn set_state(&self, state: Lifecycle) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn order_kind(&self) -> OrderKind {
        match self.params.kind {
            StrategyKind::CreditHeavy => OrderKind::Buy,
            StrategyKind::CoinHeavy => OrderKind::Sell,
        }
    }

    async fn sign_in(&self, cancel: CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }
        self.client.signup().await.context("signup failed")?;
        self.score.add_score(SCORE_SIGNUP);

        self.client.signin().await.context("signin failed")?;
        self.score.add_score(SCORE_SIGNIN);

        self.set_state(Lifecycle::SignedIn);
        debug!(bank_id = %self.identity, kind = %self.params.kind, "Investor signed in");
        Ok(())
    }

    async fn trade(&self, price: i64, cancel: CancellationToken) -> Result<()> {
        let info = self
            .client
            .info(self.cursor.load(Ordering::SeqCst))
            .await
            .context("info failed")?;
        self.score.add_score(SCORE_INFO);
        self.cursor.store(info.cursor, Ordering::SeqCst);
        if let Some(p) = info.latest_trade_price() {
            self.latest_price.store(p, Ordering::SeqCst);
        }

        if cancel.is_cancelled() {
            return Ok(());
        }

        let kind = self.order_kind();
        let price = book_price(kind, price, &info);
        let order_id = self
            .client
            .add_order(kind, self.params.unit_amount, price)
            .await
            .with_context(|| format!("{kind} order failed"))?;
        self.score.add_score(SCORE_ORDER);
        if kind == OrderKind::Sell {
            self.coins.fetch_sub(self.params.unit_amount, Ordering::SeqCst);
        }
        debug!(bank_id = %self.identity, order_id, %kind, price, "Order placed");
        Ok(())
    }
}

impl Investor for RandomInvestor {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn kind(&self) -> StrategyKind {
        self.params.kind
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.client.is_retired() {
            return Lifecycle::Retired;
        }
        Lifecycle::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn latest_trade_price(&self) -> i64 {
        self.latest_price.load(Ordering::SeqCst)
    }

    fn credit(&self) -> i64 {
        self.params.credit
    }

    fn start(self: Arc<Self>) -> Task {
        self.set_state(Lifecycle::Started);
        Task::exec("sign-in", Duration::ZERO, move |cancel| {
            async move { self.sign_in(cancel).await }.boxed()
        })
    }

    fn next(self: Arc<Self>) -> Option<Task> {
        if !self.is_signed_in() || !self.has_stock() || self.busy.swap(true, Ordering::SeqCst) {
            return None;
        }

        let (delay, price) = {
            let mut rng = rand::thread_rng();
            let delay = Duration::from_millis(rng.gen_range(0..=MAX_THINK_MS));
            let price = (self.params.base_price + rng.gen_range(-PRICE_JITTER..=PRICE_JITTER)).max(1);
            (delay, price)
        };

        Some(Task::exec("trade", delay, move |cancel| {
            async move {
                let result = self.trade(price, cancel).await;
                self.busy.store(false, Ordering::SeqCst);
                result
            }
            .boxed()
        }))
    }
}

/// Keep an order from crossing the book at a worse price than needed.
fn book_price(kind: OrderKind, price: i64, info: &MarketInfo) -> i64 {
    match (kind, info.lowest_sell_price, info.highest_buy_price) {
        (OrderKind::Buy, Some(ask), _) => price.min(ask),
        (OrderKind::Sell, _, Some(bid)) => price.max(bid),
        _ => price,
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

pub struct RandomInvestorFactory {
    score: Arc<ScoreTracker>,
}

impl RandomInvestorFactory {
    pub fn new(score: Arc<ScoreTracker>) -> Self {
        Self { score }
    }
}

impl InvestorFactory for RandomInvestorFactory {
    fn build(&self, client: Arc<dyn WireClient>, params: InvestorParams) -> Arc<dyn Investor> {
        Arc::new(RandomInvestor::new(client, params, Arc::clone(&self.score)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
