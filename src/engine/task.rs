//! Work units produced by the controller and investors.
//!
//! A `Task` is one-shot: the executor consumes it and drops it. Neither
//! variant borrows anything from the controller, so tasks can outlive the
//! tick that produced them.

use anyhow::Result;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::investor::Investor;

/// The deferred body of an `ExecTask`. Receives the run-abort token so
/// long jobs can bail out early.
pub type Job = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<()>> + Send>;

pub enum Task {
    /// Run an arbitrary async job after a delay.
    Exec(ExecTask),
    /// Deposit an investor's credit with the ledger, then add it to the
    /// registry.
    Enroll(EnrollTask),
}

impl Task {
    pub fn exec<F>(label: &'static str, delay: Duration, job: F) -> Self
    where
        F: FnOnce(CancellationToken) -> BoxFuture<'static, Result<()>> + Send + 'static,
    {
        Task::Exec(ExecTask {
            label,
            delay,
            job: Box::new(job),
        })
    }

    pub fn enroll(investor: Arc<dyn Investor>, credit: i64) -> Self {
        Task::Enroll(EnrollTask { investor, credit })
    }

    pub fn delay(&self) -> Duration {
        match self {
            Task::Exec(t) => t.delay,
            Task::Enroll(_) => Duration::ZERO,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Task::Exec(t) => t.label,
            Task::Enroll(_) => "enroll",
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Exec(t) => f
                .debug_struct("Exec")
                .field("label", &t.label)
                .field("delay", &t.delay)
                .finish_non_exhaustive(),
            Task::Enroll(t) => f
                .debug_struct("Enroll")
                .field("investor", t.investor.identity())
                .field("credit", &t.credit)
                .finish(),
        }
    }
}

pub struct ExecTask {
    pub label: &'static str,
    pub delay: Duration,
    pub job: Job,
}

pub struct EnrollTask {
    pub investor: Arc<dyn Investor>,
    pub credit: i64,
}
