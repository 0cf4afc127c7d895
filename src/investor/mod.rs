//! Investors: the simulated participants.
//!
//! Defines the `Investor` contract the engine drives and the
//! `InvestorFactory` the controller builds them through. The default
//! strategy lives in `random`.

pub mod random;

use std::sync::Arc;

use crate::client::WireClient;
use crate::engine::task::Task;
use crate::types::{Identity, InvestorParams, Lifecycle, StrategyKind};

/// A simulated trader. Implementations keep their own state machine; the
/// controller only asks whether they are started/signed in and collects
/// the tasks they hand out.
pub trait Investor: Send + Sync {
    fn identity(&self) -> &Identity;

    fn kind(&self) -> StrategyKind;

    fn lifecycle(&self) -> Lifecycle;

    fn is_started(&self) -> bool {
        self.lifecycle() != Lifecycle::NotStarted
    }

    fn is_signed_in(&self) -> bool {
        self.lifecycle() == Lifecycle::SignedIn
    }

    fn is_retired(&self) -> bool {
        self.lifecycle() == Lifecycle::Retired
    }

    /// Price of the last trade this investor observed, 0 if none yet.
    fn latest_trade_price(&self) -> i64;

    /// Credit deposited for this investor.
    fn credit(&self) -> i64;

    /// Mark the investor started and return its sign-up/sign-in work.
    fn start(self: Arc<Self>) -> Task;

    /// The next unit of work, or `None` if there is nothing to do this tick.
    fn next(self: Arc<Self>) -> Option<Task>;
}

/// Builds investors around a freshly provisioned client.
pub trait InvestorFactory: Send + Sync {
    fn build(&self, client: Arc<dyn WireClient>, params: InvestorParams) -> Arc<dyn Investor>;
}
