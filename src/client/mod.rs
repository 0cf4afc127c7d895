//! Wire client abstraction.
//!
//! Defines the `ClientFactory` and `WireClient` traits through which the
//! engine and investors reach the target app, plus the small value types
//! that cross that boundary. The HTTP implementation lives in `http`.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::Identity;

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Who a client acts as. The bootstrap client is a guest with no identity.
#[derive(Debug)]
pub struct Credentials {
    pub identity: Option<Identity>,
    pub display_name: String,
    pub secret: SecretString,
}

impl Credentials {
    pub fn investor(identity: Identity, display_name: String, secret: SecretString) -> Self {
        Self {
            identity: Some(identity),
            display_name,
            secret,
        }
    }

    /// Anonymous credentials for the privileged bootstrap client.
    pub fn guest() -> Self {
        Self {
            identity: None,
            display_name: String::new(),
            secret: SecretString::new(String::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    /// Upper bound on a single request.
    pub operation: Duration,
    /// A request slower than this retires the client.
    pub retire: Duration,
}

impl ClientTimeouts {
    pub fn new(operation: Duration, retire: Duration) -> Self {
        Self { operation, retire }
    }
}

/// Settings the target app needs to reach the bank and log services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapParams {
    pub bank_endpoint: String,
    pub bank_app_id: String,
    pub log_endpoint: String,
    pub log_app_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Buy,
    Sell,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Buy => write!(f, "buy"),
            OrderKind::Sell => write!(f, "sell"),
        }
    }
}

/// The slice of the market snapshot investors act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketInfo {
    /// Latest trade id; pass back as the next cursor.
    pub cursor: i64,
    pub lowest_sell_price: Option<i64>,
    pub highest_buy_price: Option<i64>,
    /// Prices of this investor's orders that traded since the last cursor,
    /// oldest first.
    pub traded_prices: Vec<i64>,
}

impl MarketInfo {
    pub fn latest_trade_price(&self) -> Option<i64> {
        self.traded_prices.last().copied()
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A session with the target app, owned by exactly one investor.
#[async_trait]
pub trait WireClient: Send + Sync {
    /// The identity this client acts as (`None` for the bootstrap client).
    fn identity(&self) -> Option<&Identity>;

    /// Whether the client gave up on the target (too slow to respond).
    fn is_retired(&self) -> bool;

    /// Reset the target app and point it at the bank and log services.
    async fn initialize(&self, params: &BootstrapParams) -> Result<()>;

    async fn signup(&self) -> Result<()>;

    async fn signin(&self) -> Result<()>;

    async fn info(&self, cursor: i64) -> Result<MarketInfo>;

    /// Place an order; returns the app's order id.
    async fn add_order(&self, kind: OrderKind, amount: i64, price: i64) -> Result<i64>;
}

/// Builds wire clients. `create` is synchronous: it only prepares a
/// session, no request is sent.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        endpoint: &str,
        credentials: Credentials,
        timeouts: ClientTimeouts,
    ) -> Result<Arc<dyn WireClient>>;
}
