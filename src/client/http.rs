//! HTTP wire client for the exchange app.
//!
//! One `reqwest` client per investor, each with its own cookie jar so the
//! session established by `/signin` sticks. The client retires itself when
//! the target becomes too slow: a timed-out request, or one that took
//! longer than the retire timeout, flips the retired flag permanently.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{BootstrapParams, ClientFactory, ClientTimeouts, Credentials, MarketInfo, OrderKind, WireClient};
use crate::types::Identity;

// ---------------------------------------------------------------------------
// API response types (app JSON → Rust)
// ---------------------------------------------------------------------------

/// `GET /info`. Only the fields investors act on are deserialized.
#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    cursor: i64,
    #[serde(default)]
    lowest_sell_price: Option<i64>,
    #[serde(default)]
    highest_buy_price: Option<i64>,
    #[serde(default)]
    traded_orders: Vec<TradedOrder>,
}

#[derive(Debug, Deserialize)]
struct TradedOrder {
    #[serde(default)]
    trade: Option<TradeRef>,
}

#[derive(Debug, Deserialize)]
struct TradeRef {
    price: i64,
}

/// `POST /orders`.
#[derive(Debug, Deserialize)]
struct AddOrderResponse {
    id: i64,
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds `HttpClient`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl HttpClientFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ClientFactory for HttpClientFactory {
    fn create(
        &self,
        endpoint: &str,
        credentials: Credentials,
        timeouts: ClientTimeouts,
    ) -> Result<Arc<dyn WireClient>> {
        let client = HttpClient::new(endpoint, credentials, timeouts)?;
        Ok(Arc::new(client))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HttpClient {
    http: Client,
    base_url: String,
    identity: Option<Identity>,
    display_name: String,
    secret: SecretString,
    retire_after: Duration,
    retired: AtomicBool,
}

impl HttpClient {
    pub fn new(endpoint: &str, credentials: Credentials, timeouts: ClientTimeouts) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(timeouts.operation)
            .build()
            .context("Failed to build app HTTP client")?;

        Ok(Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_string(),
            identity: credentials.identity,
            display_name: credentials.display_name,
            secret: credentials.secret,
            retire_after: timeouts.retire,
            retired: AtomicBool::new(false),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bank_id(&self) -> Result<&str> {
        self.identity
            .as_ref()
            .map(Identity::as_str)
            .context("Guest client has no identity")
    }

    /// Send a request, track latency for retirement, and reject non-2xx.
    async fn send(&self, path: &str, req: RequestBuilder) -> Result<Response> {
        let started = Instant::now();
        let result = req.send().await;
        let elapsed = started.elapsed();

        let timed_out = matches!(&result, Err(e) if e.is_timeout());
        if timed_out || elapsed >= self.retire_after {
            if !self.retired.swap(true, Ordering::SeqCst) {
                warn!(
                    bank_id = ?self.identity,
                    path,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Target too slow, client retiring"
                );
            }
        }

        let resp = result.with_context(|| format!("Request to {path} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("{path} returned {status}: {text}");
        }
        debug!(path, status = %status, elapsed_ms = elapsed.as_millis() as u64, "Request ok");
        Ok(resp)
    }
}

#[async_trait]
impl WireClient for HttpClient {
    fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    async fn initialize(&self, params: &BootstrapParams) -> Result<()> {
        let form = [
            ("bank_endpoint", params.bank_endpoint.as_str()),
            ("bank_appid", params.bank_app_id.as_str()),
            ("log_endpoint", params.log_endpoint.as_str()),
            ("log_appid", params.log_app_id.as_str()),
        ];
        let req = self.http.post(self.url("/initialize")).form(&form);
        self.send("/initialize", req).await?;
        Ok(())
    }

    async fn signup(&self) -> Result<()> {
        let form = [
            ("name", self.display_name.as_str()),
            ("bank_id", self.bank_id()?),
            ("password", self.secret.expose_secret().as_str()),
        ];
        let req = self.http.post(self.url("/signup")).form(&form);
        self.send("/signup", req).await?;
        Ok(())
    }

    async fn signin(&self) -> Result<()> {
        let form = [
            ("bank_id", self.bank_id()?),
            ("password", self.secret.expose_secret().as_str()),
        ];
        let req = self.http.post(self.url("/signin")).form(&form);
        self.send("/signin", req).await?;
        Ok(())
    }

    async fn info(&self, cursor: i64) -> Result<MarketInfo> {
        let req = self
            .http
            .get(self.url("/info"))
            .query(&[("cursor", cursor)]);
        let resp = self.send("/info", req).await?;
        let body: InfoResponse = resp.json().await.context("Failed to parse /info response")?;

        Ok(MarketInfo {
            cursor: body.cursor,
            lowest_sell_price: body.lowest_sell_price,
            highest_buy_price: body.highest_buy_price,
            traded_prices: body
                .traded_orders
                .into_iter()
                .filter_map(|o| o.trade.map(|t| t.price))
                .collect(),
        })
    }

    async fn add_order(&self, kind: OrderKind, amount: i64, price: i64) -> Result<i64> {
        let kind = kind.to_string();
        let amount = amount.to_string();
        let price = price.to_string();
        let form = [
            ("type", kind.as_str()),
            ("amount", amount.as_str()),
            ("price", price.as_str()),
        ];
        let req = self.http.post(self.url("/orders")).form(&form);
        let resp = self.send("/orders", req).await?;
        let body: AddOrderResponse = resp.json().await.context("Failed to parse /orders response")?;
        Ok(body.id)
    }
}
