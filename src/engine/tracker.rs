//! Score and error accounting.
//!
//! Investors add score for every successful operation and report every
//! failure. The error budget scales with the score: `score / 20`, held
//! between `allow_error_min` and `allow_error_max`. Crossing it ends the run.

use std::sync::atomic::{AtomicI64, Ordering};
use tracing::warn;

use crate::config::LimitsConfig;
use crate::types::BenchError;

/// Score points that buy one extra tolerated error.
const SCORE_PER_ALLOWED_ERROR: i64 = 20;

/// Lock-free score/error counters, shared by reference across the run.
#[derive(Debug)]
pub struct ScoreTracker {
    score: AtomicI64,
    errors: AtomicI64,
    allow_error_min: i64,
    allow_error_max: i64,
}

impl ScoreTracker {
    pub fn new(allow_error_min: i64, allow_error_max: i64) -> Self {
        Self {
            score: AtomicI64::new(0),
            errors: AtomicI64::new(0),
            allow_error_min,
            allow_error_max,
        }
    }

    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self::new(limits.allow_error_min, limits.allow_error_max)
    }

    pub fn add_score(&self, delta: i64) {
        self.score.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn score(&self) -> i64 {
        self.score.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> i64 {
        self.errors.load(Ordering::SeqCst)
    }

    pub fn allow_error_min(&self) -> i64 {
        self.allow_error_min
    }

    /// Current error budget for the current score.
    pub fn error_limit(&self) -> i64 {
        error_limit(self.score(), self.allow_error_min, self.allow_error_max)
    }

    /// Count one error. Fails once the post-increment count reaches the
    /// budget; every later call fails too.
    pub fn increment_error(&self) -> Result<(), BenchError> {
        let errors = self.errors.fetch_add(1, Ordering::SeqCst) + 1;
        let limit = self.error_limit();
        if errors >= limit {
            warn!(errors, limit, "Error budget exhausted");
            return Err(BenchError::ErrorBudgetExceeded { errors, limit });
        }
        Ok(())
    }

    /// Final score: raw score less a demerit per error. Each error costs
    /// `score / (2 * allow_error_max)`, so a run that burns the whole
    /// maximum budget keeps half its score.
    pub fn total_score(&self) -> i64 {
        total_score(self.score(), self.error_count(), self.allow_error_max)
    }
}

/// `clamp(score / 20, min, max)`. Does not panic when `min > max`; the
/// minimum wins, matching a check of the floor before the ceiling.
pub fn error_limit(score: i64, allow_error_min: i64, allow_error_max: i64) -> i64 {
    let limit = score / SCORE_PER_ALLOWED_ERROR;
    if limit < allow_error_min {
        allow_error_min
    } else if limit > allow_error_max {
        allow_error_max
    } else {
        limit
    }
}

pub fn total_score(score: i64, errors: i64, allow_error_max: i64) -> i64 {
    let demerit = score / (allow_error_max * 2);
    score - demerit * errors
}
