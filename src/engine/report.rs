//! End-of-run report.
//!
//! Gathers the final level, raw and penalised score, and population
//! counts into one serializable summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::registry::InvestorRegistry;
use super::tracker::ScoreTracker;
use crate::types::BenchError;

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Ran for the configured duration.
    Completed,
    ErrorBudgetExceeded,
    /// `start` or a level-up could not provision a client.
    ProvisioningFailed,
    /// Stopped by a signal.
    Interrupted,
}

impl RunOutcome {
    /// Map a controller error to the outcome it implies.
    pub fn from_error(err: &BenchError) -> Self {
        if err.is_fatal_for_run() {
            RunOutcome::ErrorBudgetExceeded
        } else {
            RunOutcome::ProvisioningFailed
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "COMPLETED"),
            RunOutcome::ErrorBudgetExceeded => write!(f, "ERROR BUDGET EXCEEDED"),
            RunOutcome::ProvisioningFailed => write!(f, "PROVISIONING FAILED"),
            RunOutcome::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub level: u32,
    pub score: i64,
    pub errors: i64,
    pub total_score: i64,
    pub investors: usize,
    pub active_investors: usize,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn collect(
        outcome: RunOutcome,
        level: u32,
        score: &ScoreTracker,
        registry: &InvestorRegistry,
    ) -> Self {
        Self {
            outcome,
            level,
            score: score.score(),
            errors: score.error_count(),
            total_score: score.total_score(),
            investors: registry.count(),
            active_investors: registry.active_count(),
            finished_at: Utc::now(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | level={} | score={} | errors={} | total={} | investors={} (active {})",
            self.outcome,
            self.level,
            self.score,
            self.errors,
            self.total_score,
            self.investors,
            self.active_investors,
        )
    }
}
