//! Task executor.
//!
//! Runs the work units handed out by the controller. Each submitted task
//! is spawned on a `TaskTracker`, waits out its delay, and runs. Failed
//! jobs are counted against the error budget; once the budget is gone the
//! executor cancels the run-abort token and the driver winds the run down.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::registry::InvestorRegistry;
use super::task::{EnrollTask, ExecTask, Task};
use super::tracker::ScoreTracker;
use crate::ledger::Ledger;

pub struct TaskExecutor {
    ledger: Arc<dyn Ledger>,
    registry: Arc<InvestorRegistry>,
    score: Arc<ScoreTracker>,
    abort: CancellationToken,
    tasks: TaskTracker,
}

impl TaskExecutor {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        registry: Arc<InvestorRegistry>,
        score: Arc<ScoreTracker>,
        abort: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            registry,
            score,
            abort,
            tasks: TaskTracker::new(),
        }
    }

    /// The token cancelled when the error budget is exhausted.
    pub fn abort_token(&self) -> CancellationToken {
        self.abort.clone()
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn every task in the batch. Returns immediately.
    pub fn submit(self: &Arc<Self>, batch: Vec<Task>) {
        if batch.is_empty() {
            return;
        }
        debug!(count = batch.len(), "Submitting tasks");

        for task in batch {
            let executor = Arc::clone(self);
            self.tasks.spawn(async move {
                executor.execute(task).await;
            });
        }
    }

    /// Run one task to completion on the current task, honouring its delay.
    /// A task still waiting on its delay when the run aborts is dropped.
    pub async fn execute(&self, task: Task) {
        let delay = task.delay();
        if !delay.is_zero() {
            tokio::select! {
                _ = self.abort.cancelled() => {
                    debug!(label = task.label(), "Run aborted, dropping delayed task");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match task {
            Task::Exec(exec) => self.run_exec(exec).await,
            Task::Enroll(enroll) => self.run_enroll(enroll).await,
        }
    }

    async fn run_exec(&self, exec: ExecTask) {
        let ExecTask { label, job, .. } = exec;
        if let Err(e) = job(self.abort.child_token()).await {
            warn!(label, error = %e, "Task failed");
            if let Err(budget) = self.score.increment_error() {
                if !self.abort.is_cancelled() {
                    error!(error = %budget, "Aborting run");
                    self.abort.cancel();
                }
            }
        }
    }

    // Deposit failures are logged only: the investor is still enrolled and
    // will surface the missing credit through its own failed orders.
    async fn run_enroll(&self, enroll: EnrollTask) {
        let EnrollTask { investor, credit } = enroll;
        if let Err(e) = self.ledger.deposit_credit(investor.identity(), credit).await {
            warn!(bank_id = %investor.identity(), credit, error = %e, "Credit deposit failed");
        }
        debug!(bank_id = %investor.identity(), kind = %investor.kind(), credit, "Investor enrolled");
        self.registry.add(investor);
    }

    /// Stop accepting work and wait up to `grace` for in-flight tasks.
    /// Returns `true` if everything finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tasks.close();
        let drained = tokio::time::timeout(grace, self.tasks.wait()).await.is_ok();
        if drained {
            info!("All tasks finished");
        } else {
            warn!(remaining = self.tasks.len(), "Shutdown grace expired with tasks in flight");
        }
        drained
    }
}
