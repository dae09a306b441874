use chrono::{Duration, Utc};
use tracing::info;

use nexus_domain::id::{ProductId, StockItemId};

use crate::domain::repository::CatalogRepository;
use crate::domain::types::{DEFAULT_PRODUCT_ICON, Product, StockItem};
use crate::error::StockServiceError;

// ── CreateProduct ────────────────────────────────────────────────────────────

pub struct CreateProductInput {
    pub name: String,
    pub icon: Option<String>,
}

pub struct CreateProductUseCase<R: CatalogRepository> {
    pub catalog: R,
}

impl<R: CatalogRepository> CreateProductUseCase<R> {
    pub async fn execute(&self, input: CreateProductInput) -> Result<Product, StockServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(StockServiceError::InvalidInput("product name must not be empty"));
        }
        let icon = input
            .icon
            .as_deref()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_PRODUCT_ICON);

        let product = Product {
            id: ProductId::new(),
            name: name.to_owned(),
            icon: icon.to_owned(),
            created_at: Utc::now(),
        };
        self.catalog.create_product(&product).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }
}

// ── RemoveProduct ────────────────────────────────────────────────────────────

pub struct RemoveProductUseCase<R: CatalogRepository> {
    pub catalog: R,
}

impl<R: CatalogRepository> RemoveProductUseCase<R> {
    pub async fn execute(&self, id: ProductId) -> Result<(), StockServiceError> {
        if !self.catalog.delete_product(id).await? {
            return Err(StockServiceError::ProductNotFound);
        }
        info!(product_id = %id, "product removed");
        Ok(())
    }
}

// ── AddStock ─────────────────────────────────────────────────────────────────

pub struct AddStockInput {
    pub product_id: ProductId,
    /// Newline-separated contents; one item per non-blank line.
    pub lines: String,
}

pub struct AddStockUseCase<R: CatalogRepository> {
    pub catalog: R,
}

impl<R: CatalogRepository> AddStockUseCase<R> {
    /// Returns the number of items added.
    pub async fn execute(&self, input: AddStockInput) -> Result<u64, StockServiceError> {
        let items = parse_stock_lines(input.product_id, &input.lines);
        if items.is_empty() {
            return Err(StockServiceError::InvalidInput("no stock lines given"));
        }
        if !self.catalog.add_stock(input.product_id, &items).await? {
            return Err(StockServiceError::ProductNotFound);
        }
        let added = items.len() as u64;
        info!(product_id = %input.product_id, added, "stock added");
        Ok(added)
    }
}

/// One item per non-blank trimmed line. Timestamps step by one microsecond so
/// a batch dequeues in input order.
fn parse_stock_lines(product_id: ProductId, lines: &str) -> Vec<StockItem> {
    let base = Utc::now();
    lines
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, content)| StockItem {
            id: StockItemId::new(),
            product_id,
            content: content.to_owned(),
            created_at: base + Duration::microseconds(i as i64),
        })
        .collect()
}

// ── ClearStock ───────────────────────────────────────────────────────────────

pub struct ClearStockUseCase<R: CatalogRepository> {
    pub catalog: R,
}

impl<R: CatalogRepository> ClearStockUseCase<R> {
    /// Returns the number of items discarded.
    pub async fn execute(&self, product_id: ProductId) -> Result<u64, StockServiceError> {
        let removed = self
            .catalog
            .clear_stock(product_id)
            .await?
            .ok_or(StockServiceError::ProductNotFound)?;
        info!(product_id = %product_id, removed, "stock cleared");
        Ok(removed)
    }
}
