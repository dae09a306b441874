use axum::{Json, extract::State};
use serde::Serialize;

use nexus_domain::id::ProductId;

use crate::domain::repository::StockBackend;
use crate::domain::types::ProductSummary;
use crate::error::StockServiceError;
use crate::state::AppState;
use crate::usecase::inventory::ListProductsUseCase;

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub icon: String,
    pub available_count: u64,
}

impl From<ProductSummary> for ProductResponse {
    fn from(p: ProductSummary) -> Self {
        Self {
            id: p.id,
            name: p.name,
            icon: p.icon,
            available_count: p.available_count,
        }
    }
}

// ── GET /products ────────────────────────────────────────────────────────────

pub async fn list_products<S: StockBackend>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<ProductResponse>>, StockServiceError> {
    let usecase = ListProductsUseCase {
        inventory: state.store,
    };
    let products = usecase.execute().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}
