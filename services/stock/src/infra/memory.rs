//! In-process implementation of the stock store.
//!
//! Arbitration mirrors row locking: a consumption holds an owned async mutex
//! guard on the key it validated and on the product queue it dequeued from
//! until it commits, rolls back or is dropped. Transactions on different
//! products or keys never wait on each other. Writes are staged on the
//! transaction and applied on commit; a rollback (explicit or by drop) puts
//! dequeued items back at the head of their queue. Key reads outside a
//! consumption see the committed row and never wait on a key lock.
//!
//! Lock order is always key, then product queue, so two consumptions can
//! never wait on each other in a cycle.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use nexus_domain::id::{AccessKeyId, ProductId};
use nexus_domain::pagination::PageRequest;

use crate::domain::repository::{
    AuditRepository, AuditTx, CatalogRepository, ConsumptionTx, InventoryQuery, InventoryTx,
    KeyLedgerTx, KeyLookup, KeyRepository, StockStore,
};
use crate::domain::types::{
    AccessKey, AuditEntry, KeyStatus, Product, ProductSummary, StockItem,
};
use crate::error::StockServiceError;

#[derive(Clone, Default)]
pub struct MemoryStockStore {
    state: Arc<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    products: RwLock<Vec<Product>>,
    queues: RwLock<HashMap<ProductId, Arc<ProductQueue>>>,
    keys: RwLock<HashMap<String, KeySlot>>,
    audit: Mutex<Vec<AuditEntry>>,
}

#[derive(Default)]
struct ProductQueue {
    /// Sorted by `StockItem::fifo_key`.
    items: Arc<AsyncMutex<VecDeque<StockItem>>>,
    /// Committed count, readable without waiting on in-flight consumptions.
    available: AtomicU64,
}

#[derive(Clone)]
struct KeySlot {
    id: AccessKeyId,
    /// Held by the consumption that validated this key.
    lock: Arc<AsyncMutex<()>>,
    /// Committed state, readable without waiting on `lock`.
    row: Arc<RwLock<AccessKey>>,
}

fn poisoned() -> StockServiceError {
    anyhow!("memory store lock poisoned").into()
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StockServiceError> {
    lock.read().map_err(|_| poisoned())
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StockServiceError> {
    lock.write().map_err(|_| poisoned())
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StockServiceError> {
    mutex.lock().map_err(|_| poisoned())
}

impl MemoryState {
    fn queue(&self, product_id: ProductId) -> Result<Option<Arc<ProductQueue>>, StockServiceError> {
        Ok(read(&self.queues)?.get(&product_id).cloned())
    }

    fn key_slot(&self, code: &str) -> Result<Option<KeySlot>, StockServiceError> {
        Ok(read(&self.keys)?.get(code).cloned())
    }

    fn key_slots(&self) -> Result<Vec<KeySlot>, StockServiceError> {
        Ok(read(&self.keys)?.values().cloned().collect())
    }
}

// ── Consumption transaction ──────────────────────────────────────────────────

struct HeldQueue {
    product_id: ProductId,
    queue: Arc<ProductQueue>,
    items: OwnedMutexGuard<VecDeque<StockItem>>,
    /// Dequeued in this transaction, oldest first.
    taken: Vec<StockItem>,
}

struct HeldKey {
    slot: KeySlot,
    _guard: OwnedMutexGuard<()>,
}

pub struct MemoryConsumptionTx {
    state: Arc<MemoryState>,
    key: Option<HeldKey>,
    queue: Option<HeldQueue>,
    staged_audit: Vec<AuditEntry>,
    staged_used_at: Option<DateTime<Utc>>,
    open: bool,
}

impl MemoryConsumptionTx {
    fn new(state: Arc<MemoryState>) -> Self {
        Self {
            state,
            key: None,
            queue: None,
            staged_audit: Vec::new(),
            staged_used_at: None,
            open: true,
        }
    }

    fn restore(&mut self) {
        if let Some(held) = self.queue.as_mut() {
            for item in held.taken.drain(..).rev() {
                held.items.push_front(item);
            }
        }
        self.staged_audit.clear();
        self.staged_used_at = None;
    }
}

impl Drop for MemoryConsumptionTx {
    fn drop(&mut self) {
        if self.open {
            self.restore();
        }
    }
}

impl KeyLedgerTx for MemoryConsumptionTx {
    async fn lock_key(&mut self, code: &str) -> Result<Option<AccessKey>, StockServiceError> {
        if let Some(held) = self.key.as_ref() {
            let key = read(&held.slot.row)?.clone();
            if key.code == code {
                return Ok(Some(key));
            }
        }
        let Some(slot) = self.state.key_slot(code)? else {
            return Ok(None);
        };
        let guard = Arc::clone(&slot.lock).lock_owned().await;
        // Revoked while we waited.
        let still_stored = self
            .state
            .key_slot(code)?
            .is_some_and(|current| Arc::ptr_eq(&current.lock, &slot.lock));
        if !still_stored {
            return Ok(None);
        }
        let key = read(&slot.row)?.clone();
        self.key = Some(HeldKey {
            slot,
            _guard: guard,
        });
        Ok(Some(key))
    }

    async fn mark_used(
        &mut self,
        id: AccessKeyId,
        at: DateTime<Utc>,
    ) -> Result<(), StockServiceError> {
        match self.key.as_ref() {
            Some(held) if held.slot.id == id => {
                self.staged_used_at = Some(at);
                Ok(())
            }
            _ => Err(anyhow!("key {id} is not locked by this transaction").into()),
        }
    }
}

impl InventoryTx for MemoryConsumptionTx {
    async fn dequeue_oldest(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<StockItem>, StockServiceError> {
        if let Some(held) = self.queue.as_ref().filter(|h| h.product_id != product_id) {
            return Err(anyhow!(
                "transaction already holds product {}",
                held.product_id
            )
            .into());
        }

        if self.queue.is_none() {
            let Some(queue) = self.state.queue(product_id)? else {
                return Ok(None);
            };
            let items = Arc::clone(&queue.items).lock_owned().await;
            // Product removed while we waited.
            let still_listed = self
                .state
                .queue(product_id)?
                .is_some_and(|current| Arc::ptr_eq(&current, &queue));
            if !still_listed {
                return Ok(None);
            }
            self.queue = Some(HeldQueue {
                product_id,
                queue,
                items,
                taken: Vec::new(),
            });
        }

        let Some(held) = self.queue.as_mut() else {
            return Ok(None);
        };
        let Some(item) = held.items.pop_front() else {
            return Ok(None);
        };
        held.taken.push(item.clone());
        Ok(Some(item))
    }
}

impl AuditTx for MemoryConsumptionTx {
    async fn append(&mut self, entry: &AuditEntry) -> Result<(), StockServiceError> {
        self.staged_audit.push(entry.clone());
        Ok(())
    }
}

impl ConsumptionTx for MemoryConsumptionTx {
    async fn commit(mut self) -> Result<(), StockServiceError> {
        if let (Some(at), Some(held)) = (self.staged_used_at.take(), self.key.as_ref()) {
            let mut key = write(&held.slot.row)?;
            if key.status == KeyStatus::Unused {
                key.status = KeyStatus::Used;
                key.used_at = Some(at);
            }
        }

        lock(&self.state.audit)?.append(&mut self.staged_audit);

        if let Some(held) = self.queue.as_mut() {
            let consumed = held.taken.len() as u64;
            held.queue.available.fetch_sub(consumed, Ordering::SeqCst);
            held.taken.clear();
        }

        self.open = false;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StockServiceError> {
        self.restore();
        self.open = false;
        Ok(())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

impl StockStore for MemoryStockStore {
    type Tx = MemoryConsumptionTx;

    async fn begin(&self) -> Result<Self::Tx, StockServiceError> {
        Ok(MemoryConsumptionTx::new(Arc::clone(&self.state)))
    }

    async fn ping(&self) -> Result<(), StockServiceError> {
        Ok(())
    }
}

impl InventoryQuery for MemoryStockStore {
    async fn list_products(&self) -> Result<Vec<ProductSummary>, StockServiceError> {
        let mut products = read(&self.state.products)?.clone();
        products.sort_by_key(|p| (p.created_at, p.id));
        let queues = read(&self.state.queues)?;
        Ok(products
            .into_iter()
            .map(|p| ProductSummary {
                available_count: queues
                    .get(&p.id)
                    .map_or(0, |q| q.available.load(Ordering::SeqCst)),
                id: p.id,
                name: p.name,
                icon: p.icon,
            })
            .collect())
    }
}

impl KeyLookup for MemoryStockStore {
    async fn find_key(&self, code: &str) -> Result<Option<AccessKey>, StockServiceError> {
        let Some(slot) = self.state.key_slot(code)? else {
            return Ok(None);
        };
        let key = read(&slot.row)?.clone();
        Ok(Some(key))
    }
}

impl KeyRepository for MemoryStockStore {
    async fn insert_keys(&self, keys: &[AccessKey]) -> Result<bool, StockServiceError> {
        let mut stored = write(&self.state.keys)?;
        let mut seen = std::collections::HashSet::new();
        for key in keys {
            if stored.contains_key(&key.code) || !seen.insert(key.code.as_str()) {
                return Ok(false);
            }
        }
        for key in keys {
            stored.insert(
                key.code.clone(),
                KeySlot {
                    id: key.id,
                    lock: Arc::new(AsyncMutex::new(())),
                    row: Arc::new(RwLock::new(key.clone())),
                },
            );
        }
        Ok(true)
    }

    async fn list_keys(&self, page: PageRequest) -> Result<Vec<AccessKey>, StockServiceError> {
        let mut keys = Vec::new();
        for slot in self.state.key_slots()? {
            keys.push(read(&slot.row)?.clone());
        }
        keys.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(keys
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn delete_key(&self, id: AccessKeyId) -> Result<bool, StockServiceError> {
        let mut stored = write(&self.state.keys)?;
        let before = stored.len();
        stored.retain(|_, slot| slot.id != id);
        Ok(stored.len() < before)
    }
}

impl CatalogRepository for MemoryStockStore {
    async fn create_product(&self, product: &Product) -> Result<(), StockServiceError> {
        write(&self.state.queues)?.insert(product.id, Arc::new(ProductQueue::default()));
        write(&self.state.products)?.push(product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StockServiceError> {
        let mut products = write(&self.state.products)?;
        let before = products.len();
        products.retain(|p| p.id != id);
        let deleted = products.len() < before;
        drop(products);
        write(&self.state.queues)?.remove(&id);
        Ok(deleted)
    }

    async fn add_stock(
        &self,
        product_id: ProductId,
        items: &[StockItem],
    ) -> Result<bool, StockServiceError> {
        let Some(queue) = self.state.queue(product_id)? else {
            return Ok(false);
        };
        let mut queued = queue.items.lock().await;
        for item in items {
            let at = queued.partition_point(|q| q.fifo_key() <= item.fifo_key());
            queued.insert(at, item.clone());
        }
        queue
            .available
            .fetch_add(items.len() as u64, Ordering::SeqCst);
        Ok(true)
    }

    async fn clear_stock(&self, product_id: ProductId) -> Result<Option<u64>, StockServiceError> {
        let Some(queue) = self.state.queue(product_id)? else {
            return Ok(None);
        };
        let mut queued = queue.items.lock().await;
        let removed = queued.len() as u64;
        queued.clear();
        queue.available.store(0, Ordering::SeqCst);
        Ok(Some(removed))
    }
}

impl AuditRepository for MemoryStockStore {
    async fn list_entries(
        &self,
        product_id: Option<ProductId>,
        page: PageRequest,
    ) -> Result<Vec<AuditEntry>, StockServiceError> {
        let audit = lock(&self.state.audit)?;
        Ok(audit
            .iter()
            .rev()
            .filter(|e| product_id.is_none_or(|id| e.product_id == id))
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect())
    }
}
