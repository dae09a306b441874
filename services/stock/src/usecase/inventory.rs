use crate::domain::repository::InventoryQuery;
use crate::domain::types::ProductSummary;
use crate::error::StockServiceError;

pub struct ListProductsUseCase<R: InventoryQuery> {
    pub inventory: R,
}

impl<R: InventoryQuery> ListProductsUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<ProductSummary>, StockServiceError> {
        self.inventory.list_products().await
    }
}
