//! Shared types for the load generator.
//!
//! Identities, investor lifecycle and strategy parameters, and the
//! domain error taxonomy. Engine, client and investor modules all depend
//! on these without depending on each other.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique token an investor uses with both the target app and the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Investor lifecycle
// ---------------------------------------------------------------------------

/// Where an investor is in its life. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Lifecycle {
    NotStarted = 0,
    /// `start()` has handed out its task but sign-in has not completed.
    Started = 1,
    SignedIn = 2,
    Retired = 3,
}

impl Lifecycle {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Lifecycle::NotStarted,
            1 => Lifecycle::Started,
            2 => Lifecycle::SignedIn,
            _ => Lifecycle::Retired,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::NotStarted => write!(f, "not-started"),
            Lifecycle::Started => write!(f, "started"),
            Lifecycle::SignedIn => write!(f, "signed-in"),
            Lifecycle::Retired => write!(f, "retired"),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy parameters
// ---------------------------------------------------------------------------

/// The two investor variants the controller alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Large credit, no coins: places buy orders.
    CreditHeavy,
    /// Token credit, coin inventory: places sell orders.
    CoinHeavy,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::CreditHeavy => write!(f, "credit-heavy"),
            StrategyKind::CoinHeavy => write!(f, "coin-heavy"),
        }
    }
}

/// Parameters handed to an `InvestorFactory` when a new investor is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorParams {
    pub kind: StrategyKind,
    /// Credit deposited with the ledger on enrolment.
    pub credit: i64,
    /// Coin inventory the investor starts with.
    pub coins: i64,
    /// Quantity per order.
    pub unit_amount: i64,
    /// Reference price orders are placed around.
    pub base_price: i64,
}

impl InvestorParams {
    pub fn credit_heavy(credit: i64, unit_amount: i64, base_price: i64) -> Self {
        Self {
            kind: StrategyKind::CreditHeavy,
            credit,
            coins: 0,
            unit_amount,
            base_price,
        }
    }

    pub fn coin_heavy(credit: i64, coins: i64, unit_amount: i64, base_price: i64) -> Self {
        Self {
            kind: StrategyKind::CoinHeavy,
            credit,
            coins,
            unit_amount,
            base_price,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the run.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("Error budget exceeded: {errors} errors against a limit of {limit}")]
    ErrorBudgetExceeded { errors: i64, limit: i64 },

    #[error("Client provisioning failed: {0}")]
    Provisioning(String),

    #[error("Target bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Identity prefetch pipeline is closed")]
    PrefetchClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BenchError {
    /// Whether this error means the whole run has to stop.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, BenchError::ErrorBudgetExceeded { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_roundtrips_through_u8() {
        for state in [
            Lifecycle::NotStarted,
            Lifecycle::Started,
            Lifecycle::SignedIn,
            Lifecycle::Retired,
        ] {
            assert_eq!(Lifecycle::from_u8(state as u8), state);
        }
        assert_eq!(Lifecycle::from_u8(42), Lifecycle::Retired);
    }

    #[test]
    fn test_lifecycle_orders_forward() {
        assert!(Lifecycle::NotStarted < Lifecycle::Started);
        assert!(Lifecycle::Started < Lifecycle::SignedIn);
        assert!(Lifecycle::SignedIn < Lifecycle::Retired);
    }

    #[test]
    fn test_investor_params_constructors() {
        let buyer = InvestorParams::credit_heavy(10_000, 2, 100);
        assert_eq!(buyer.kind, StrategyKind::CreditHeavy);
        assert_eq!(buyer.coins, 0);

        let seller = InvestorParams::coin_heavy(1, 5, 2, 101);
        assert_eq!(seller.kind, StrategyKind::CoinHeavy);
        assert_eq!(seller.coins, 5);
        assert_eq!(seller.base_price, 101);
    }

    #[test]
    fn test_error_display() {
        let err = BenchError::ErrorBudgetExceeded { errors: 100, limit: 100 };
        assert_eq!(
            err.to_string(),
            "Error budget exceeded: 100 errors against a limit of 100"
        );
        assert!(err.is_fatal_for_run());
        assert!(!BenchError::Provisioning("boom".into()).is_fatal_for_run());
    }

    #[test]
    fn test_identity_display() {
        let id = Identity::new("abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.as_str(), "abc123");
    }
}
