use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

use nexus_domain::id::{AccessKeyId, ProductId, StockItemId};
use nexus_domain::pagination::PageRequest;
use nexus_stock::domain::ledger::KeyLedger;
use nexus_stock::domain::repository::{
    AuditRepository, AuditTx, CatalogRepository, ConsumptionTx, InventoryQuery, InventoryTx,
    KeyLedgerTx, KeyLookup, KeyRepository, StockStore,
};
use nexus_stock::domain::types::{AccessKey, AuditEntry, KeyStatus, Product, StockItem};
use nexus_stock::error::StockServiceError;
use nexus_stock::infra::memory::MemoryStockStore;
use nexus_stock::usecase::consume::{ConsumeInput, ConsumeOutput, ConsumeUseCase};

pub const OVERRIDE: &str = "adminkey777";

/// How long a [`Fault::SlowCommit`] commit stalls before going through.
pub const SLOW_COMMIT: Duration = Duration::from_millis(200);

// ── Seeding ──────────────────────────────────────────────────────────────────

/// Create a product whose items dequeue in the order given.
pub async fn seed_product(store: &MemoryStockStore, contents: &[&str]) -> ProductId {
    let product = Product {
        id: ProductId::new(),
        name: "Netflix Premium".to_owned(),
        icon: "🎬".to_owned(),
        created_at: Utc::now(),
    };
    store.create_product(&product).await.unwrap();
    add_items(store, product.id, contents).await;
    product.id
}

pub async fn add_items(store: &MemoryStockStore, product_id: ProductId, contents: &[&str]) {
    let base = Utc::now();
    let items: Vec<StockItem> = contents
        .iter()
        .enumerate()
        .map(|(i, content)| StockItem {
            id: StockItemId::new(),
            product_id,
            content: (*content).to_owned(),
            created_at: base + ChronoDuration::milliseconds(i as i64),
        })
        .collect();
    assert!(store.add_stock(product_id, &items).await.unwrap());
}

pub fn key(code: &str, expires_at: Option<DateTime<Utc>>, status: KeyStatus) -> AccessKey {
    AccessKey {
        id: AccessKeyId::new(),
        code: code.to_owned(),
        expires_at,
        status,
        used_at: None,
        created_at: Utc::now(),
    }
}

/// Unused key valid for one more hour.
pub async fn seed_key(store: &MemoryStockStore, code: &str) -> AccessKey {
    let k = key(
        code,
        Some(Utc::now() + ChronoDuration::hours(1)),
        KeyStatus::Unused,
    );
    assert!(store.insert_keys(&[k.clone()]).await.unwrap());
    k
}

pub async fn seed_keys(store: &MemoryStockStore, n: usize) -> Vec<String> {
    let keys: Vec<AccessKey> = (0..n)
        .map(|i| key(&format!("NEXUS-T{i:05}"), None, KeyStatus::Unused))
        .collect();
    assert!(store.insert_keys(&keys).await.unwrap());
    keys.into_iter().map(|k| k.code).collect()
}

// ── Inspection ───────────────────────────────────────────────────────────────

pub async fn key_status(store: &MemoryStockStore, code: &str) -> KeyStatus {
    store.find_key(code).await.unwrap().unwrap().status
}

pub async fn available(store: &MemoryStockStore, product_id: ProductId) -> u64 {
    store
        .list_products()
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.id == product_id)
        .map(|p| p.available_count)
        .unwrap()
}

pub async fn audit_of(store: &MemoryStockStore, product_id: ProductId) -> Vec<AuditEntry> {
    store
        .list_entries(
            Some(product_id),
            PageRequest {
                per_page: 100,
                page: 1,
            },
        )
        .await
        .unwrap()
}

// ── Use case ─────────────────────────────────────────────────────────────────

pub fn consume_uc<S: StockStore>(store: S) -> ConsumeUseCase<S> {
    ConsumeUseCase {
        store,
        ledger: KeyLedger::new(Some(OVERRIDE.to_owned())),
        timeout: Duration::from_secs(5),
    }
}

pub async fn consume<S: StockStore>(
    uc: &ConsumeUseCase<S>,
    product_id: ProductId,
    code: &str,
) -> Result<ConsumeOutput, StockServiceError> {
    uc.execute(ConsumeInput {
        product_id,
        key_code: code.to_owned(),
    })
    .await
}

// ── FaultyStore ──────────────────────────────────────────────────────────────

/// Step at which a [`FaultyStore`] transaction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Append,
    MarkUsed,
    Commit,
    /// Commit succeeds, but only after [`SLOW_COMMIT`].
    SlowCommit,
}

/// Memory store whose transactions fail or stall at one chosen step.
#[derive(Clone)]
pub struct FaultyStore {
    pub inner: MemoryStockStore,
    pub fault: Fault,
}

pub struct FaultyTx {
    inner: <MemoryStockStore as StockStore>::Tx,
    fault: Fault,
}

fn injected(step: &str) -> StockServiceError {
    anyhow!("injected failure at {step}").into()
}

impl StockStore for FaultyStore {
    type Tx = FaultyTx;

    async fn begin(&self) -> Result<Self::Tx, StockServiceError> {
        Ok(FaultyTx {
            inner: self.inner.begin().await?,
            fault: self.fault,
        })
    }

    async fn ping(&self) -> Result<(), StockServiceError> {
        self.inner.ping().await
    }
}

impl KeyLedgerTx for FaultyTx {
    async fn lock_key(&mut self, code: &str) -> Result<Option<AccessKey>, StockServiceError> {
        self.inner.lock_key(code).await
    }

    async fn mark_used(
        &mut self,
        id: AccessKeyId,
        at: DateTime<Utc>,
    ) -> Result<(), StockServiceError> {
        if self.fault == Fault::MarkUsed {
            return Err(injected("mark_used"));
        }
        self.inner.mark_used(id, at).await
    }
}

impl InventoryTx for FaultyTx {
    async fn dequeue_oldest(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<StockItem>, StockServiceError> {
        self.inner.dequeue_oldest(product_id).await
    }
}

impl AuditTx for FaultyTx {
    async fn append(&mut self, entry: &AuditEntry) -> Result<(), StockServiceError> {
        if self.fault == Fault::Append {
            return Err(injected("append"));
        }
        self.inner.append(entry).await
    }
}

impl ConsumptionTx for FaultyTx {
    async fn commit(self) -> Result<(), StockServiceError> {
        match self.fault {
            // Dropping the inner transaction rolls it back.
            Fault::Commit => return Err(injected("commit")),
            Fault::SlowCommit => tokio::time::sleep(SLOW_COMMIT).await,
            _ => {}
        }
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<(), StockServiceError> {
        self.inner.rollback().await
    }
}
