use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::repository::StockBackend;
use crate::error::StockServiceError;
use crate::state::AppState;
use crate::usecase::consume::{ConsumeInput, ConsumeUseCase};

// ── POST /products/{product_id}/consume ──────────────────────────────────────

#[derive(Deserialize)]
pub struct ConsumeRequest {
    pub key: String,
}

#[derive(Serialize)]
pub struct ConsumeResponse {
    pub content: String,
    #[serde(serialize_with = "nexus_core::serde::to_rfc3339_ms")]
    pub consumed_at: DateTime<Utc>,
}

pub async fn consume<S: StockBackend>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<Uuid>,
    Json(body): Json<ConsumeRequest>,
) -> Result<Json<ConsumeResponse>, StockServiceError> {
    let usecase = ConsumeUseCase {
        store: state.store,
        ledger: state.ledger,
        timeout: state.consume_timeout,
    };
    let output = usecase
        .execute(ConsumeInput {
            product_id: product_id.into(),
            key_code: body.key.trim().to_owned(),
        })
        .await?;
    Ok(Json(ConsumeResponse {
        content: output.content,
        consumed_at: output.consumed_at,
    }))
}
