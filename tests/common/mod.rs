//! In-memory collaborators for integration testing.
//!
//! Deterministic stand-ins for the wire client, client factory, ledger,
//! random provider and investor. All state is behind `Arc<Mutex<_>>` or
//! atomics and fully controllable from test code.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::FutureExt;
use secrecy::SecretString;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use swarmbench::client::{
    BootstrapParams, ClientFactory, ClientTimeouts, Credentials, MarketInfo, OrderKind, WireClient,
};
use swarmbench::config::AppConfig;
use swarmbench::engine::controller::{ControllerDeps, ControllerSettings, RunController};
use swarmbench::engine::executor::TaskExecutor;
use swarmbench::engine::prefetch::IdentityPrefetcher;
use swarmbench::engine::registry::InvestorRegistry;
use swarmbench::engine::task::Task;
use swarmbench::engine::tracker::ScoreTracker;
use swarmbench::investor::{Investor, InvestorFactory};
use swarmbench::ledger::Ledger;
use swarmbench::random::RandomProvider;
use swarmbench::types::{Identity, InvestorParams, Lifecycle, StrategyKind};

// ---------------------------------------------------------------------------
// Random
// ---------------------------------------------------------------------------

/// Hands out `id-0`, `id-1`, ...
#[derive(Default)]
pub struct SeqRandom {
    next: AtomicUsize,
}

impl RandomProvider for SeqRandom {
    fn new_identity(&self) -> Identity {
        Identity::new(format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst)))
    }

    fn new_display_name(&self) -> String {
        "Test Investor".to_string()
    }

    fn new_secret(&self) -> SecretString {
        SecretString::new("secret".to_string())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Accepts every call unless built with `accepting(n)`, in which case
/// registrations fail once `n` have succeeded.
#[derive(Default)]
pub struct FakeLedger {
    pub registered: Mutex<Vec<Identity>>,
    pub deposits: Mutex<Vec<(Identity, i64)>>,
    accept_limit: Option<usize>,
}

impl FakeLedger {
    pub fn accepting(n: usize) -> Self {
        Self {
            accept_limit: Some(n),
            ..Default::default()
        }
    }

    pub fn deposits(&self) -> Vec<(Identity, i64)> {
        self.deposits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn register_identity(&self, id: &Identity) -> Result<()> {
        let mut registered = self.registered.lock().unwrap();
        if self.accept_limit.is_some_and(|n| registered.len() >= n) {
            return Err(anyhow!("bank unavailable"));
        }
        registered.push(id.clone());
        Ok(())
    }

    async fn deposit_credit(&self, id: &Identity, amount: i64) -> Result<()> {
        self.deposits.lock().unwrap().push((id.clone(), amount));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire client
// ---------------------------------------------------------------------------

pub struct FakeClient {
    identity: Option<Identity>,
    pub timeouts: ClientTimeouts,
    pub initialized: Mutex<Vec<BootstrapParams>>,
    fail_initialize: bool,
}

#[async_trait]
impl WireClient for FakeClient {
    fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    fn is_retired(&self) -> bool {
        false
    }

    async fn initialize(&self, params: &BootstrapParams) -> Result<()> {
        if self.fail_initialize {
            return Err(anyhow!("initialize returned 500"));
        }
        self.initialized.lock().unwrap().push(params.clone());
        Ok(())
    }

    async fn signup(&self) -> Result<()> {
        Ok(())
    }

    async fn signin(&self) -> Result<()> {
        Ok(())
    }

    async fn info(&self, cursor: i64) -> Result<MarketInfo> {
        Ok(MarketInfo {
            cursor,
            ..Default::default()
        })
    }

    async fn add_order(&self, _kind: OrderKind, _amount: i64, _price: i64) -> Result<i64> {
        Ok(1)
    }
}

/// Records every client it creates. Can be told to fail from the N-th
/// creation on (counting the bootstrap client).
#[derive(Default)]
pub struct FakeClientFactory {
    pub created: Mutex<Vec<Arc<FakeClient>>>,
    fail_from: Mutex<Option<usize>>,
    fail_initialize: bool,
}

impl FakeClientFactory {
    pub fn failing_from(n: usize) -> Self {
        Self {
            fail_from: Mutex::new(Some(n)),
            ..Default::default()
        }
    }

    pub fn failing_initialize() -> Self {
        Self {
            fail_initialize: true,
            ..Default::default()
        }
    }

    pub fn fail_from(&self, n: usize) {
        *self.fail_from.lock().unwrap() = Some(n);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn guest(&self) -> Arc<FakeClient> {
        Arc::clone(&self.created.lock().unwrap()[0])
    }
}

impl ClientFactory for FakeClientFactory {
    fn create(
        &self,
        _endpoint: &str,
        credentials: Credentials,
        timeouts: ClientTimeouts,
    ) -> Result<Arc<dyn WireClient>> {
        let mut created = self.created.lock().unwrap();
        if let Some(n) = *self.fail_from.lock().unwrap() {
            if created.len() >= n {
                return Err(anyhow!("cookie jar exhausted"));
            }
        }
        let client = Arc::new(FakeClient {
            identity: credentials.identity,
            timeouts,
            initialized: Mutex::new(Vec::new()),
            fail_initialize: self.fail_initialize,
        });
        created.push(Arc::clone(&client));
        Ok(client)
    }
}

// ---------------------------------------------------------------------------
// Investor
// ---------------------------------------------------------------------------

/// Signs in instantly when its start task runs; produces a no-op task per
/// tick once signed in.
pub struct FakeInvestor {
    identity: Identity,
    pub params: InvestorParams,
    state: AtomicU8,
    price: AtomicI64,
}

impl FakeInvestor {
    pub fn set_price(&self, price: i64) {
        self.price.store(price, Ordering::SeqCst);
    }

    pub fn set_lifecycle(&self, state: Lifecycle) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

impl Investor for FakeInvestor {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn kind(&self) -> StrategyKind {
        self.params.kind
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn latest_trade_price(&self) -> i64 {
        self.price.load(Ordering::SeqCst)
    }

    fn credit(&self) -> i64 {
        self.params.credit
    }

    fn start(self: Arc<Self>) -> Task {
        self.set_lifecycle(Lifecycle::Started);
        Task::exec("fake-start", Duration::ZERO, move |_| {
            async move {
                self.set_lifecycle(Lifecycle::SignedIn);
                Ok(())
            }
            .boxed()
        })
    }

    fn next(self: Arc<Self>) -> Option<Task> {
        if !self.is_signed_in() {
            return None;
        }
        Some(Task::exec("fake-next", Duration::ZERO, |_| async { Ok(()) }.boxed()))
    }
}

#[derive(Default)]
pub struct FakeInvestorFactory {
    pub built: Mutex<Vec<Arc<FakeInvestor>>>,
}

impl FakeInvestorFactory {
    pub fn built(&self) -> Vec<Arc<FakeInvestor>> {
        self.built.lock().unwrap().clone()
    }
}

impl InvestorFactory for FakeInvestorFactory {
    fn build(&self, client: Arc<dyn WireClient>, params: InvestorParams) -> Arc<dyn Investor> {
        let investor = Arc::new(FakeInvestor {
            identity: client.identity().cloned().unwrap_or_default(),
            params,
            state: AtomicU8::new(Lifecycle::NotStarted as u8),
            price: AtomicI64::new(0),
        });
        self.built.lock().unwrap().push(Arc::clone(&investor));
        investor
    }
}

// ---------------------------------------------------------------------------
// Assembled run
// ---------------------------------------------------------------------------

/// A controller wired to fakes, with its prefetcher running.
pub struct TestRun {
    pub controller: RunController,
    pub executor: Arc<TaskExecutor>,
    pub clients: Arc<FakeClientFactory>,
    pub investors: Arc<FakeInvestorFactory>,
    pub ledger: Arc<FakeLedger>,
    pub registry: Arc<InvestorRegistry>,
    pub score: Arc<ScoreTracker>,
    pub prefetcher: Arc<IdentityPrefetcher>,
    pub cancel: CancellationToken,
}

impl TestRun {
    pub fn new(clients: FakeClientFactory) -> Self {
        Self::with_config(clients, AppConfig::default())
    }

    pub fn with_config(clients: FakeClientFactory, cfg: AppConfig) -> Self {
        Self::with_parts(clients, FakeLedger::default(), cfg)
    }

    pub fn with_parts(clients: FakeClientFactory, ledger: FakeLedger, cfg: AppConfig) -> Self {
        let clients = Arc::new(clients);
        let investors = Arc::new(FakeInvestorFactory::default());
        let ledger = Arc::new(ledger);
        let random: Arc<dyn RandomProvider> = Arc::new(SeqRandom::default());
        let registry = Arc::new(InvestorRegistry::new());
        let score = Arc::new(ScoreTracker::from_limits(&cfg.limits));

        let prefetcher = Arc::new(IdentityPrefetcher::new(
            ledger.clone(),
            Arc::clone(&random),
            cfg.prefetch.capacity,
            Duration::from_millis(1),
        ));
        let cancel = CancellationToken::new();
        prefetcher.spawn(cancel.clone());

        let executor = Arc::new(TaskExecutor::new(
            ledger.clone(),
            Arc::clone(&registry),
            Arc::clone(&score),
            CancellationToken::new(),
        ));

        let controller = RunController::new(
            ControllerSettings::from_config(&cfg, random.as_ref()),
            ControllerDeps {
                clients: clients.clone(),
                investors: investors.clone(),
                ledger: ledger.clone(),
                random,
                prefetcher: Arc::clone(&prefetcher),
                registry: Arc::clone(&registry),
                score: Arc::clone(&score),
            },
        );

        Self {
            controller,
            executor,
            clients,
            investors,
            ledger,
            registry,
            score,
            prefetcher,
            cancel,
        }
    }

    /// Execute a batch inline, in order.
    pub async fn run_all(&self, tasks: Vec<Task>) {
        for task in tasks {
            self.executor.execute(task).await;
        }
    }
}

impl Drop for TestRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub fn count_kind(tasks: &[Task], label: &str) -> usize {
    tasks.iter().filter(|t| t.label() == label).count()
}
