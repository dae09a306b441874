use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::repository::StockBackend;
use crate::domain::types::LoginCheck;
use crate::error::StockServiceError;
use crate::state::AppState;
use crate::usecase::key::ValidateKeyForLoginUseCase;

// ── POST /keys/validate ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ValidateKeyRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct ValidateKeyResponse {
    pub valid: bool,
    #[serde(serialize_with = "nexus_core::serde::opt_to_rfc3339_ms")]
    pub expires_at: Option<DateTime<Utc>>,
    pub already_used: bool,
    pub is_override: bool,
}

impl From<LoginCheck> for ValidateKeyResponse {
    fn from(c: LoginCheck) -> Self {
        Self {
            valid: c.valid,
            expires_at: c.expires_at,
            already_used: c.already_used,
            is_override: c.is_override,
        }
    }
}

pub async fn validate_key<S: StockBackend>(
    State(state): State<AppState<S>>,
    Json(body): Json<ValidateKeyRequest>,
) -> Result<Json<ValidateKeyResponse>, StockServiceError> {
    let usecase = ValidateKeyForLoginUseCase {
        keys: state.store,
        ledger: state.ledger,
    };
    let check = usecase.execute(&body.code).await?;
    Ok(Json(check.into()))
}
