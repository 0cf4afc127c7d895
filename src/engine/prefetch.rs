//! Identity prefetch pipeline.
//!
//! Registering an identity with the ledger is a network round trip, so it
//! is done ahead of need by a background producer feeding a bounded
//! channel. Creating an investor then only waits on the channel.
//!
//! The producer owns the channel's only sender while it runs. When it
//! stops, the sender is dropped and `fetch_new_id` reports
//! `PrefetchClosed` once the buffered identities are used up.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::random::RandomProvider;
use crate::types::{BenchError, Identity};

pub struct IdentityPrefetcher {
    ledger: Arc<dyn Ledger>,
    random: Arc<dyn RandomProvider>,
    retry_delay: Duration,
    sender: StdMutex<Option<mpsc::Sender<Identity>>>,
    receiver: Mutex<mpsc::Receiver<Identity>>,
}

impl IdentityPrefetcher {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        random: Arc<dyn RandomProvider>,
        capacity: usize,
        retry_delay: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            ledger,
            random,
            retry_delay,
            sender: StdMutex::new(Some(tx)),
            receiver: Mutex::new(rx),
        }
    }

    /// Spawn `run` on the current runtime.
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let prefetcher = Arc::clone(self);
        tokio::spawn(async move { prefetcher.run(cancel).await })
    }

    /// Produce registered identities until `cancel` fires.
    ///
    /// A registration that is already in flight is allowed to finish;
    /// cancellation is observed between registrations and while waiting
    /// for buffer space.
    pub async fn run(&self, cancel: CancellationToken) {
        let taken = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(tx) = taken else {
            warn!("Identity prefetcher already ran, ignoring second start");
            return;
        };

        info!(capacity = tx.max_capacity(), "Identity prefetcher started");
        let mut produced: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let id = self.random.new_identity();
            if let Err(e) = self.ledger.register_identity(&id).await {
                warn!(bank_id = %id, error = %e, "Identity registration failed, retrying with a new one");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.retry_delay) => continue,
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(id) => {
                    if sent.is_err() {
                        break;
                    }
                    produced += 1;
                }
            }
        }

        info!(produced, "Identity prefetcher stopped");
    }

    /// Wait for the next registered identity. Each identity is handed to
    /// exactly one caller.
    pub async fn fetch_new_id(&self) -> Result<Identity, BenchError> {
        let mut rx = self.receiver.lock().await;
        let id = rx.recv().await.ok_or(BenchError::PrefetchClosed)?;
        debug!(bank_id = %id, "Identity handed out");
        Ok(id)
    }
}
