//! Ledger (bank) integration.
//!
//! Defines the `Ledger` trait the engine consumes. Identities must be
//! registered here before an investor can sign up with them, and each
//! investor's starting credit is deposited here on enrolment.

pub mod isubank;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Identity;

/// Abstraction over the external ledger service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Register a fresh identity so it can hold credit.
    async fn register_identity(&self, id: &Identity) -> Result<()>;

    /// Add credit to a registered identity.
    async fn deposit_credit(&self, id: &Identity, amount: i64) -> Result<()>;
}
