//! Storage contract of the stock service.
//!
//! Every consumption runs inside one [`ConsumptionTx`] obtained from
//! [`StockStore::begin`]. The transaction spans the three ledgers (keys,
//! inventory, audit) so that either all writes become visible on
//! [`ConsumptionTx::commit`] or none do. Dropping a transaction without
//! committing rolls it back.
//!
//! Methods return `impl Future + Send` so use cases stay `Send` when generic
//! over the store and can be driven from axum handlers and spawned tasks.

use std::future::Future;

use chrono::{DateTime, Utc};

use nexus_domain::id::{AccessKeyId, ProductId};
use nexus_domain::pagination::PageRequest;

use crate::domain::types::{AccessKey, AuditEntry, Product, ProductSummary, StockItem};
use crate::error::StockServiceError;

/// Key Ledger operations available inside a consumption.
pub trait KeyLedgerTx: Send {
    /// Find a key by code and hold it against concurrent consumptions
    /// until the transaction ends.
    fn lock_key(
        &mut self,
        code: &str,
    ) -> impl Future<Output = Result<Option<AccessKey>, StockServiceError>> + Send;

    /// Set status to used. No-op if the key is already used.
    fn mark_used(
        &mut self,
        id: AccessKeyId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StockServiceError>> + Send;
}

/// Inventory Store operations available inside a consumption.
pub trait InventoryTx: Send {
    /// Remove and return the oldest remaining item of a product.
    ///
    /// `None` when the product has no item this transaction can claim.
    /// Concurrent transactions never receive the same item.
    fn dequeue_oldest(
        &mut self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<StockItem>, StockServiceError>> + Send;
}

/// Audit Log operations available inside a consumption.
pub trait AuditTx: Send {
    fn append(
        &mut self,
        entry: &AuditEntry,
    ) -> impl Future<Output = Result<(), StockServiceError>> + Send;
}

/// One atomic consumption spanning keys, inventory and audit.
pub trait ConsumptionTx: KeyLedgerTx + InventoryTx + AuditTx {
    fn commit(self) -> impl Future<Output = Result<(), StockServiceError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), StockServiceError>> + Send;
}

/// Transactional store handle, injected into the consumption coordinator.
pub trait StockStore: Clone + Send + Sync + 'static {
    type Tx: ConsumptionTx;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StockServiceError>> + Send;

    /// Cheap connectivity check for readiness probes.
    fn ping(&self) -> impl Future<Output = Result<(), StockServiceError>> + Send;
}

/// Read-only inventory aggregation.
pub trait InventoryQuery: Send + Sync {
    /// All products with their available counts, oldest product first.
    fn list_products(
        &self,
    ) -> impl Future<Output = Result<Vec<ProductSummary>, StockServiceError>> + Send;
}

/// Non-locking key reads (login-time checks). Never mutates.
pub trait KeyLookup: Send + Sync {
    fn find_key(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<AccessKey>, StockServiceError>> + Send;
}

/// Administrative key management.
pub trait KeyRepository: Send + Sync {
    /// Insert a batch of keys; all or none.
    ///
    /// Returns `false`, inserting nothing, when a code is already taken.
    fn insert_keys(
        &self,
        keys: &[AccessKey],
    ) -> impl Future<Output = Result<bool, StockServiceError>> + Send;

    /// Newest first.
    fn list_keys(
        &self,
        page: PageRequest,
    ) -> impl Future<Output = Result<Vec<AccessKey>, StockServiceError>> + Send;

    /// Returns `true` if a key was deleted.
    fn delete_key(
        &self,
        id: AccessKeyId,
    ) -> impl Future<Output = Result<bool, StockServiceError>> + Send;
}

/// Administrative product and stock management.
pub trait CatalogRepository: Send + Sync {
    fn create_product(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<(), StockServiceError>> + Send;

    /// Delete a product with its remaining stock. Returns `true` if deleted.
    fn delete_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<bool, StockServiceError>> + Send;

    /// Append items to a product's queue. Returns `false` if the product does not exist.
    fn add_stock(
        &self,
        product_id: ProductId,
        items: &[StockItem],
    ) -> impl Future<Output = Result<bool, StockServiceError>> + Send;

    /// Discard all remaining items. `None` if the product does not exist.
    fn clear_stock(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<u64>, StockServiceError>> + Send;
}

/// Read access to the audit trail. There is no write path outside a consumption.
pub trait AuditRepository: Send + Sync {
    /// Newest first, optionally restricted to one product.
    fn list_entries(
        &self,
        product_id: Option<ProductId>,
        page: PageRequest,
    ) -> impl Future<Output = Result<Vec<AuditEntry>, StockServiceError>> + Send;
}

/// Everything the HTTP layer needs from one storage backend.
pub trait StockBackend:
    StockStore + InventoryQuery + KeyLookup + KeyRepository + CatalogRepository + AuditRepository
{
}

impl<T> StockBackend for T where
    T: StockStore
        + InventoryQuery
        + KeyLookup
        + KeyRepository
        + CatalogRepository
        + AuditRepository
{
}
