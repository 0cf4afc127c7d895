//! HTTP client for the bank's privileged (internal) endpoint.
//!
//! Only the two administrative calls the load generator needs:
//! `POST /register` and `POST /add_credit`, both JSON bodies keyed by
//! `bank_id`. Any non-2xx status is an error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::Ledger;
use crate::types::Identity;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    bank_id: &'a str,
}

#[derive(Debug, Serialize)]
struct AddCreditRequest<'a> {
    bank_id: &'a str,
    price: i64,
}

/// Ledger client for the internal bank API.
pub struct IsubankLedger {
    http: Client,
    endpoint: String,
}

impl IsubankLedger {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build bank HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{path}", self.endpoint);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Bank request to {path} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Bank {path} returned {status}: {text}");
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for IsubankLedger {
    async fn register_identity(&self, id: &Identity) -> Result<()> {
        self.post("/register", &RegisterRequest { bank_id: id.as_str() })
            .await?;
        debug!(bank_id = %id, "Identity registered");
        Ok(())
    }

    async fn deposit_credit(&self, id: &Identity, amount: i64) -> Result<()> {
        self.post(
            "/add_credit",
            &AddCreditRequest {
                bank_id: id.as_str(),
                price: amount,
            },
        )
        .await?;
        debug!(bank_id = %id, amount, "Credit deposited");
        Ok(())
    }
}
