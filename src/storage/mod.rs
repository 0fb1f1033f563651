//! Read/write contract of the relational store, plus the in-memory
//! implementation used by tests and local runs.

use crate::models::charge::{Charge, ChargeStatus};
use crate::models::settlement::{LedgerEntry, ProductStats, SellerBalance};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("charge {0} not found")]
    NotFound(String),
    #[error("charge {0} already exists")]
    Duplicate(String),
    #[error("charge {0} already settled")]
    AlreadySettled(String),
}

#[async_trait]
pub trait ChargeStore: Send + Sync {
    async fn insert(&self, charge: Charge) -> Result<(), StoreError>;
    async fn get(&self, txid: &str) -> Option<Charge>;
    async fn update_status(&self, txid: &str, status: ChargeStatus) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Applies one settlement as a single atomic unit: marks the charge
    /// paid, appends the ledger entry, credits the seller balance and the
    /// product counters. Partial application is an invariant violation the
    /// store must never allow.
    async fn settle(&self, charge: &Charge, entry: LedgerEntry) -> Result<(), StoreError>;
    async fn balance(&self, seller_id: &str) -> SellerBalance;
    async fn product_stats(&self, product_id: &str) -> ProductStats;
    async fn ledger(&self, seller_id: &str) -> Vec<LedgerEntry>;
}

#[derive(Default)]
struct Inner {
    charges: HashMap<String, Charge>,
    // Txids that ever settled. A charge settles at most once, no matter
    // what status transitions happen around the paid event.
    settled: HashSet<String>,
    ledger: HashMap<String, Vec<LedgerEntry>>,
    balances: HashMap<String, SellerBalance>,
    products: HashMap<String, ProductStats>,
}

/// Everything behind one mutex so `settle` is trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChargeStore for MemoryStore {
    async fn insert(&self, charge: Charge) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.charges.contains_key(&charge.txid) {
            return Err(StoreError::Duplicate(charge.txid));
        }
        inner.charges.insert(charge.txid.clone(), charge);
        Ok(())
    }

    async fn get(&self, txid: &str) -> Option<Charge> {
        self.inner.lock().charges.get(txid).cloned()
    }

    async fn update_status(&self, txid: &str, status: ChargeStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let charge = inner
            .charges
            .get_mut(txid)
            .ok_or_else(|| StoreError::NotFound(txid.to_string()))?;
        charge.status = status;
        Ok(())
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn settle(&self, charge: &Charge, entry: LedgerEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.settled.contains(&charge.txid) {
            return Err(StoreError::AlreadySettled(charge.txid.clone()));
        }
        {
            let stored = inner
                .charges
                .get_mut(&charge.txid)
                .ok_or_else(|| StoreError::NotFound(charge.txid.clone()))?;
            if stored.status == ChargeStatus::Paid {
                return Err(StoreError::AlreadySettled(charge.txid.clone()));
            }
            stored.status = ChargeStatus::Paid;
        }
        inner.settled.insert(charge.txid.clone());

        let balance = inner.balances.entry(charge.seller_id.clone()).or_default();
        balance.available_cents += entry.net_cents;
        balance.total_received_cents += entry.gross_cents;
        balance.total_sales += 1;

        let stats = inner.products.entry(charge.product_id.clone()).or_default();
        stats.sales_count += 1;
        stats.revenue_cents += entry.gross_cents;

        inner
            .ledger
            .entry(charge.seller_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn balance(&self, seller_id: &str) -> SellerBalance {
        self.inner
            .lock()
            .balances
            .get(seller_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn product_stats(&self, product_id: &str) -> ProductStats {
        self.inner
            .lock()
            .products
            .get(product_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn ledger(&self, seller_id: &str) -> Vec<LedgerEntry> {
        self.inner
            .lock()
            .ledger
            .get(seller_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::charge::{Environment, Payer};
    use chrono::Utc;

    fn charge(txid: &str) -> Charge {
        Charge {
            txid: txid.to_string(),
            amount_cents: 8000,
            payer: Payer {
                name: "Maria".to_string(),
                document: "12345678901".to_string(),
            },
            description: "Pedido 42".to_string(),
            status: ChargeStatus::Active,
            environment: Environment::Sandbox,
            seller_id: "seller-1".to_string(),
            product_id: "product-1".to_string(),
            expires_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    fn entry(txid: &str, gross: u64, net: u64) -> LedgerEntry {
        LedgerEntry {
            sale_id: txid.to_string(),
            gross_cents: gross,
            fee_percentage: 10.0,
            fee_fixed_cents: 199,
            net_cents: net,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        store.insert(charge("tx1")).await.unwrap();
        assert!(matches!(
            store.insert(charge("tx1")).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_settle_credits_everything_atomically() {
        let store = MemoryStore::new();
        store.insert(charge("tx1")).await.unwrap();
        store
            .settle(&charge("tx1"), entry("tx1", 8000, 7001))
            .await
            .unwrap();

        let balance = store.balance("seller-1").await;
        assert_eq!(balance.available_cents, 7001);
        assert_eq!(balance.total_received_cents, 8000);
        assert_eq!(balance.total_sales, 1);

        let stats = store.product_stats("product-1").await;
        assert_eq!(stats.sales_count, 1);
        assert_eq!(stats.revenue_cents, 8000);

        assert_eq!(store.ledger("seller-1").await.len(), 1);
        assert_eq!(store.get("tx1").await.unwrap().status, ChargeStatus::Paid);
    }

    #[tokio::test]
    async fn test_settle_rejects_already_paid_charge() {
        let store = MemoryStore::new();
        store.insert(charge("tx1")).await.unwrap();
        store
            .settle(&charge("tx1"), entry("tx1", 8000, 7001))
            .await
            .unwrap();
        let err = store
            .settle(&charge("tx1"), entry("tx1", 8000, 7001))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadySettled(_)));

        // Nothing was double-credited.
        assert_eq!(store.balance("seller-1").await.available_cents, 7001);
        assert_eq!(store.ledger("seller-1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_rejects_resettling_after_status_moved_on() {
        let store = MemoryStore::new();
        store.insert(charge("tx1")).await.unwrap();
        store
            .settle(&charge("tx1"), entry("tx1", 8000, 7001))
            .await
            .unwrap();
        // A late expiry event moves the status off Paid...
        store
            .update_status("tx1", ChargeStatus::Expired)
            .await
            .unwrap();
        // ...but the charge stays settled.
        let err = store
            .settle(&charge("tx1"), entry("tx1", 8000, 7001))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadySettled(_)));
        assert_eq!(store.balance("seller-1").await.available_cents, 7001);
        assert_eq!(store.ledger("seller-1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_settle_unknown_charge() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.settle(&charge("nope"), entry("nope", 1, 1)).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
