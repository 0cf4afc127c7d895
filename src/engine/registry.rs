//! Investor registry: the live population behind one lock.
//!
//! A plain vector of `Arc<dyn Investor>` in insertion order. Every call
//! takes the lock once, does its scan, and releases it before returning;
//! investor methods that produce work are called by the controller on the
//! returned handles, outside the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::investor::Investor;
use crate::types::Identity;

#[derive(Default)]
pub struct InvestorRegistry {
    investors: Mutex<Vec<Arc<dyn Investor>>>,
}

impl InvestorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            investors: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    // A panic while holding the lock cannot leave the vector half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Investor>>> {
        self.investors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, investor: Arc<dyn Investor>) {
        self.lock().push(investor);
    }

    /// Remove every investor sharing `investor`'s identity. Returns how many
    /// were dropped.
    pub fn remove(&self, investor: &dyn Investor) -> usize {
        let target = investor.identity();
        let mut guard = self.lock();
        let before = guard.len();
        let kept: Vec<Arc<dyn Investor>> = guard
            .iter()
            .filter(|i| i.identity() != target)
            .cloned()
            .collect();
        *guard = kept;
        before - guard.len()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Investors that have not retired.
    pub fn active_count(&self) -> usize {
        self.lock().iter().filter(|i| !i.is_retired()).count()
    }

    pub fn find(&self, identity: &Identity) -> Option<Arc<dyn Investor>> {
        self.lock()
            .iter()
            .find(|i| i.identity() == identity)
            .cloned()
    }

    /// The earliest-added investor still present.
    pub fn first(&self) -> Option<Arc<dyn Investor>> {
        self.lock().first().cloned()
    }

    pub fn first_not_started(&self) -> Option<Arc<dyn Investor>> {
        self.lock().iter().find(|i| !i.is_started()).cloned()
    }

    /// Snapshot of the signed-in investors, in registry order.
    pub fn signed_in(&self) -> Vec<Arc<dyn Investor>> {
        self.lock()
            .iter()
            .filter(|i| i.is_signed_in())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investor::testing::StubInvestor;
    use crate::types::{Lifecycle, StrategyKind};

    fn stub(id: &str) -> Arc<StubInvestor> {
        StubInvestor::arc(id)
    }

    #[test]
    fn test_add_and_count() {
        let registry = InvestorRegistry::new();
        assert_eq!(registry.count(), 0);
        assert!(registry.first().is_none());

        for i in 0..5 {
            registry.add(stub(&format!("inv-{i}")));
        }
        assert_eq!(registry.count(), 5);
        assert_eq!(registry.first().unwrap().identity().as_str(), "inv-0");
    }

    #[test]
    fn test_active_count_excludes_retired() {
        let registry = InvestorRegistry::with_capacity(10);
        let investors: Vec<_> = (0..10).map(|i| stub(&format!("inv-{i}"))).collect();
        for inv in &investors {
            registry.add(inv.clone());
        }
        for inv in investors.iter().take(3) {
            inv.set_lifecycle(Lifecycle::Retired);
        }
        assert_eq!(registry.count(), 10);
        assert_eq!(registry.active_count(), 7);
    }

    #[test]
    fn test_remove_drops_all_matching_identities() {
        let registry = InvestorRegistry::new();
        registry.add(stub("a"));
        registry.add(stub("dup"));
        registry.add(stub("b"));
        registry.add(stub("dup"));

        let removed = registry.remove(&StubInvestor::new("dup", StrategyKind::CoinHeavy, 0));
        assert_eq!(removed, 2);
        assert_eq!(registry.count(), 2);
        assert!(registry.find(&Identity::new("dup")).is_none());
        assert!(registry.find(&Identity::new("a")).is_some());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let registry = InvestorRegistry::new();
        registry.add(stub("a"));
        assert_eq!(registry.remove(stub("zzz").as_ref()), 0);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_count_tracks_adds_minus_removed() {
        let registry = InvestorRegistry::new();
        let mut adds = 0;
        for i in 0..20 {
            registry.add(stub(&format!("inv-{}", i % 7)));
            adds += 1;
        }
        // inv-3 was added for i = 3, 10, 17
        let removed = registry.remove(stub("inv-3").as_ref());
        assert_eq!(removed, 3);
        assert_eq!(registry.count(), adds - removed);
        assert!(registry.active_count() <= registry.count());
    }

    #[test]
    fn test_find_returns_first_match() {
        let registry = InvestorRegistry::new();
        let first = Arc::new(StubInvestor::new("same", StrategyKind::CreditHeavy, 1));
        let second = Arc::new(StubInvestor::new("same", StrategyKind::CoinHeavy, 2));
        registry.add(first);
        registry.add(second);
        let found = registry.find(&Identity::new("same")).unwrap();
        assert_eq!(found.credit(), 1);
        assert!(registry.find(&Identity::new("missing")).is_none());
    }

    #[test]
    fn test_lifecycle_scans() {
        let registry = InvestorRegistry::new();
        let a = stub("a");
        let b = stub("b");
        let c = stub("c");
        a.set_lifecycle(Lifecycle::SignedIn);
        c.set_lifecycle(Lifecycle::SignedIn);
        registry.add(a);
        registry.add(b);
        registry.add(c);

        assert_eq!(registry.first_not_started().unwrap().identity().as_str(), "b");
        let signed: Vec<_> = registry
            .signed_in()
            .iter()
            .map(|i| i.identity().as_str().to_string())
            .collect();
        assert_eq!(signed, vec!["a", "c"]);
    }

    #[test]
    fn test_concurrent_adds() {
        let registry = Arc::new(InvestorRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let r = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        r.add(stub(&format!("t{t}-{i}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.count(), 200);
    }
}
