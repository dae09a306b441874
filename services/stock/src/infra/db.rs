use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, SqlErr, Statement, TransactionTrait, sea_query::Expr,
};

use nexus_domain::id::{AccessKeyId, ProductId};
use nexus_domain::pagination::PageRequest;
use nexus_stock_schema::{access_keys, audit_entries, products, stock_items};

use crate::domain::repository::{
    AuditRepository, AuditTx, CatalogRepository, ConsumptionTx, InventoryQuery, InventoryTx,
    KeyLedgerTx, KeyLookup, KeyRepository, StockStore,
};
use crate::domain::types::{
    AccessKey, AuditEntry, KeyStatus, Product, ProductSummary, StockItem,
};
use crate::error::StockServiceError;

/// Claims and deletes the oldest item of a product in one statement.
/// Rows locked by a concurrent consumption are skipped, never returned twice.
const DEQUEUE_OLDEST_SQL: &str = r#"
    DELETE FROM stock_items
    WHERE id = (
        SELECT id FROM stock_items
        WHERE product_id = $1
        ORDER BY created_at ASC, id ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
    )
    RETURNING id, product_id, content, created_at
"#;

const LIST_PRODUCTS_SQL: &str = r#"
    SELECT p.id, p.name, p.icon, COUNT(s.id) AS available_count
    FROM products p
    LEFT JOIN stock_items s ON s.product_id = p.id
    GROUP BY p.id, p.name, p.icon, p.created_at
    ORDER BY p.created_at ASC, p.id ASC
"#;

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbStockStore {
    pub db: DatabaseConnection,
}

impl StockStore for DbStockStore {
    type Tx = DbConsumptionTx;

    async fn begin(&self) -> Result<Self::Tx, StockServiceError> {
        let txn = self.db.begin().await.context("begin consumption")?;
        Ok(DbConsumptionTx { txn })
    }

    async fn ping(&self) -> Result<(), StockServiceError> {
        self.db.ping().await.context("ping database")?;
        Ok(())
    }
}

// ── Consumption transaction ──────────────────────────────────────────────────

/// Wraps one PostgreSQL transaction. Dropping it without commit rolls back.
pub struct DbConsumptionTx {
    txn: DatabaseTransaction,
}

impl KeyLedgerTx for DbConsumptionTx {
    async fn lock_key(&mut self, code: &str) -> Result<Option<AccessKey>, StockServiceError> {
        let model = access_keys::Entity::find()
            .filter(access_keys::Column::Code.eq(code))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .context("lock access key")?;
        Ok(model.map(key_from_model))
    }

    async fn mark_used(
        &mut self,
        id: AccessKeyId,
        at: DateTime<Utc>,
    ) -> Result<(), StockServiceError> {
        access_keys::Entity::update_many()
            .col_expr(
                access_keys::Column::Status,
                Expr::value(access_keys::STATUS_USED),
            )
            .col_expr(access_keys::Column::UsedAt, Expr::value(at))
            .filter(access_keys::Column::Id.eq(id.0))
            .filter(access_keys::Column::Status.eq(access_keys::STATUS_UNUSED))
            .exec(&self.txn)
            .await
            .context("mark access key used")?;
        Ok(())
    }
}

impl InventoryTx for DbConsumptionTx {
    async fn dequeue_oldest(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<StockItem>, StockServiceError> {
        let model = stock_items::Model::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            DEQUEUE_OLDEST_SQL,
            [product_id.0.into()],
        ))
        .one(&self.txn)
        .await
        .context("dequeue oldest stock item")?;
        Ok(model.map(item_from_model))
    }
}

impl AuditTx for DbConsumptionTx {
    async fn append(&mut self, entry: &AuditEntry) -> Result<(), StockServiceError> {
        audit_entries::ActiveModel {
            id: Set(entry.id.0),
            product_id: Set(entry.product_id.0),
            content: Set(entry.content.clone()),
            key_used: Set(entry.key_used.clone()),
            consumed_at: Set(entry.consumed_at),
        }
        .insert(&self.txn)
        .await
        .context("append audit entry")?;
        Ok(())
    }
}

impl ConsumptionTx for DbConsumptionTx {
    async fn commit(self) -> Result<(), StockServiceError> {
        self.txn.commit().await.context("commit consumption")?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StockServiceError> {
        self.txn.rollback().await.context("roll back consumption")?;
        Ok(())
    }
}

// ── Read side ────────────────────────────────────────────────────────────────

impl InventoryQuery for DbStockStore {
    async fn list_products(&self) -> Result<Vec<ProductSummary>, StockServiceError> {
        #[derive(Debug, FromQueryResult)]
        struct ProductRow {
            id: uuid::Uuid,
            name: String,
            icon: String,
            available_count: i64,
        }

        let rows = ProductRow::find_by_statement(Statement::from_string(
            self.db.get_database_backend(),
            LIST_PRODUCTS_SQL,
        ))
        .all(&self.db)
        .await
        .context("list products with stock counts")?;

        Ok(rows
            .into_iter()
            .map(|row| ProductSummary {
                id: row.id.into(),
                name: row.name,
                icon: row.icon,
                available_count: u64::try_from(row.available_count).unwrap_or(0),
            })
            .collect())
    }
}

impl KeyLookup for DbStockStore {
    async fn find_key(&self, code: &str) -> Result<Option<AccessKey>, StockServiceError> {
        let model = access_keys::Entity::find()
            .filter(access_keys::Column::Code.eq(code))
            .one(&self.db)
            .await
            .context("find access key by code")?;
        Ok(model.map(key_from_model))
    }
}

// ── Admin side ───────────────────────────────────────────────────────────────

impl KeyRepository for DbStockStore {
    async fn insert_keys(&self, keys: &[AccessKey]) -> Result<bool, StockServiceError> {
        if keys.is_empty() {
            return Ok(true);
        }
        let models = keys.iter().map(|key| access_keys::ActiveModel {
            id: Set(key.id.0),
            code: Set(key.code.clone()),
            expires_at: Set(key.expires_at),
            status: Set(status_to_db(key.status).to_owned()),
            used_at: Set(key.used_at),
            created_at: Set(key.created_at),
        });
        match access_keys::Entity::insert_many(models).exec(&self.db).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("insert access keys")
                .into()),
        }
    }

    async fn list_keys(&self, page: PageRequest) -> Result<Vec<AccessKey>, StockServiceError> {
        let models = access_keys::Entity::find()
            .order_by_desc(access_keys::Column::CreatedAt)
            .order_by_desc(access_keys::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list access keys")?;
        Ok(models.into_iter().map(key_from_model).collect())
    }

    async fn delete_key(&self, id: AccessKeyId) -> Result<bool, StockServiceError> {
        let result = access_keys::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .context("delete access key")?;
        Ok(result.rows_affected > 0)
    }
}

impl CatalogRepository for DbStockStore {
    async fn create_product(&self, product: &Product) -> Result<(), StockServiceError> {
        products::ActiveModel {
            id: Set(product.id.0),
            name: Set(product.name.clone()),
            icon: Set(product.icon.clone()),
            created_at: Set(product.created_at),
        }
        .insert(&self.db)
        .await
        .context("create product")?;
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StockServiceError> {
        // stock_items cascade; audit_entries are not linked and survive.
        let result = products::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .context("delete product")?;
        Ok(result.rows_affected > 0)
    }

    async fn add_stock(
        &self,
        product_id: ProductId,
        items: &[StockItem],
    ) -> Result<bool, StockServiceError> {
        let items = items.to_vec();
        let added = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                Box::pin(async move {
                    let exists = products::Entity::find_by_id(product_id.0)
                        .lock_shared()
                        .one(txn)
                        .await?
                        .is_some();
                    if !exists {
                        return Ok(false);
                    }
                    if !items.is_empty() {
                        stock_items::Entity::insert_many(items.iter().map(item_to_active))
                            .exec(txn)
                            .await?;
                    }
                    Ok(true)
                })
            })
            .await
            .context("add stock")?;
        Ok(added)
    }

    async fn clear_stock(&self, product_id: ProductId) -> Result<Option<u64>, StockServiceError> {
        let removed = self
            .db
            .transaction::<_, Option<u64>, sea_orm::DbErr>(|txn| {
                Box::pin(async move {
                    let exists = products::Entity::find_by_id(product_id.0)
                        .one(txn)
                        .await?
                        .is_some();
                    if !exists {
                        return Ok(None);
                    }
                    let result = stock_items::Entity::delete_many()
                        .filter(stock_items::Column::ProductId.eq(product_id.0))
                        .exec(txn)
                        .await?;
                    Ok(Some(result.rows_affected))
                })
            })
            .await
            .context("clear stock")?;
        Ok(removed)
    }
}

impl AuditRepository for DbStockStore {
    async fn list_entries(
        &self,
        product_id: Option<ProductId>,
        page: PageRequest,
    ) -> Result<Vec<AuditEntry>, StockServiceError> {
        let mut query = audit_entries::Entity::find();
        if let Some(product_id) = product_id {
            query = query.filter(audit_entries::Column::ProductId.eq(product_id.0));
        }
        let models = query
            .order_by_desc(audit_entries::Column::ConsumedAt)
            .order_by_desc(audit_entries::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list audit entries")?;
        Ok(models.into_iter().map(audit_from_model).collect())
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn status_to_db(status: KeyStatus) -> &'static str {
    match status {
        KeyStatus::Unused => access_keys::STATUS_UNUSED,
        KeyStatus::Used => access_keys::STATUS_USED,
    }
}

/// Anything but the unused marker reads as used: an unknown status must never be honored.
fn status_from_db(status: &str) -> KeyStatus {
    if status == access_keys::STATUS_UNUSED {
        KeyStatus::Unused
    } else {
        KeyStatus::Used
    }
}

fn key_from_model(model: access_keys::Model) -> AccessKey {
    AccessKey {
        id: model.id.into(),
        code: model.code,
        expires_at: model.expires_at,
        status: status_from_db(&model.status),
        used_at: model.used_at,
        created_at: model.created_at,
    }
}

fn item_from_model(model: stock_items::Model) -> StockItem {
    StockItem {
        id: model.id.into(),
        product_id: model.product_id.into(),
        content: model.content,
        created_at: model.created_at,
    }
}

fn item_to_active(item: &StockItem) -> stock_items::ActiveModel {
    stock_items::ActiveModel {
        id: Set(item.id.0),
        product_id: Set(item.product_id.0),
        content: Set(item.content.clone()),
        created_at: Set(item.created_at),
    }
}

fn audit_from_model(model: audit_entries::Model) -> AuditEntry {
    AuditEntry {
        id: model.id.into(),
        product_id: model.product_id.into(),
        content: model.content,
        key_used: model.key_used,
        consumed_at: model.consumed_at,
    }
}
