use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nexus_domain::id::{AccessKeyId, AuditEntryId, ProductId};
use nexus_domain::pagination::PageRequest;

use crate::domain::repository::StockBackend;
use crate::domain::types::{AccessKey, AuditEntry, KeyStatus, Product};
use crate::error::StockServiceError;
use crate::state::AppState;
use crate::usecase::audit::{ListAuditEntriesInput, ListAuditEntriesUseCase};
use crate::usecase::catalog::{
    AddStockInput, AddStockUseCase, ClearStockUseCase, CreateProductInput, CreateProductUseCase,
    RemoveProductUseCase,
};
use crate::usecase::key::{IssueKeysInput, IssueKeysUseCase, ListKeysUseCase, RevokeKeyUseCase};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct KeyResponse {
    pub id: AccessKeyId,
    pub code: String,
    pub status: &'static str,
    #[serde(serialize_with = "nexus_core::serde::opt_to_rfc3339_ms")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "nexus_core::serde::opt_to_rfc3339_ms")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "nexus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<AccessKey> for KeyResponse {
    fn from(k: AccessKey) -> Self {
        Self {
            id: k.id,
            code: k.code,
            status: match k.status {
                KeyStatus::Unused => "unused",
                KeyStatus::Used => "used",
            },
            expires_at: k.expires_at,
            used_at: k.used_at,
            created_at: k.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CreatedProductResponse {
    pub id: ProductId,
    pub name: String,
    pub icon: String,
    #[serde(serialize_with = "nexus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl From<Product> for CreatedProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            name: p.name,
            icon: p.icon,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct AuditEntryResponse {
    pub id: AuditEntryId,
    pub product_id: ProductId,
    pub content: String,
    pub key_used: String,
    #[serde(serialize_with = "nexus_core::serde::to_rfc3339_ms")]
    pub consumed_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        Self {
            id: e.id,
            product_id: e.product_id,
            content: e.content,
            key_used: e.key_used,
            consumed_at: e.consumed_at,
        }
    }
}

// ── POST /admin/keys ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueKeysRequest {
    pub count: u32,
    pub ttl_hours: Option<u32>,
}

pub async fn issue_keys<S: StockBackend>(
    State(state): State<AppState<S>>,
    Json(body): Json<IssueKeysRequest>,
) -> Result<(StatusCode, Json<Vec<KeyResponse>>), StockServiceError> {
    let usecase = IssueKeysUseCase { keys: state.store };
    let keys = usecase
        .execute(IssueKeysInput {
            count: body.count,
            ttl_hours: body.ttl_hours,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(keys.into_iter().map(Into::into).collect()),
    ))
}

// ── GET /admin/keys ──────────────────────────────────────────────────────────

pub async fn list_keys<S: StockBackend>(
    State(state): State<AppState<S>>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Vec<KeyResponse>>, StockServiceError> {
    let usecase = ListKeysUseCase { keys: state.store };
    let keys = usecase.execute(page).await?;
    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

// ── DELETE /admin/keys/{key_id} ──────────────────────────────────────────────

pub async fn revoke_key<S: StockBackend>(
    State(state): State<AppState<S>>,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, StockServiceError> {
    let usecase = RevokeKeyUseCase { keys: state.store };
    usecase.execute(key_id.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /admin/products ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub icon: Option<String>,
}

pub async fn create_product<S: StockBackend>(
    State(state): State<AppState<S>>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<CreatedProductResponse>), StockServiceError> {
    let usecase = CreateProductUseCase {
        catalog: state.store,
    };
    let product = usecase
        .execute(CreateProductInput {
            name: body.name,
            icon: body.icon,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

// ── DELETE /admin/products/{product_id} ──────────────────────────────────────

pub async fn remove_product<S: StockBackend>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, StockServiceError> {
    let usecase = RemoveProductUseCase {
        catalog: state.store,
    };
    usecase.execute(product_id.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /admin/products/{product_id}/stock ──────────────────────────────────

#[derive(Deserialize)]
pub struct AddStockRequest {
    /// Newline-separated item contents.
    pub lines: String,
}

#[derive(Serialize)]
pub struct AddStockResponse {
    pub added: u64,
}

pub async fn add_stock<S: StockBackend>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<Uuid>,
    Json(body): Json<AddStockRequest>,
) -> Result<(StatusCode, Json<AddStockResponse>), StockServiceError> {
    let usecase = AddStockUseCase {
        catalog: state.store,
    };
    let added = usecase
        .execute(AddStockInput {
            product_id: product_id.into(),
            lines: body.lines,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(AddStockResponse { added })))
}

// ── DELETE /admin/products/{product_id}/stock ────────────────────────────────

#[derive(Serialize)]
pub struct ClearStockResponse {
    pub removed: u64,
}

pub async fn clear_stock<S: StockBackend>(
    State(state): State<AppState<S>>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ClearStockResponse>, StockServiceError> {
    let usecase = ClearStockUseCase {
        catalog: state.store,
    };
    let removed = usecase.execute(product_id.into()).await?;
    Ok(Json(ClearStockResponse { removed }))
}

// ── GET /admin/audit ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AuditQuery {
    pub product_id: Option<Uuid>,
    #[serde(rename = "per-page")]
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl AuditQuery {
    fn page_request(&self) -> PageRequest {
        let default = PageRequest::default();
        PageRequest {
            per_page: self.per_page.unwrap_or(default.per_page),
            page: self.page.unwrap_or(default.page),
        }
    }
}

pub async fn list_audit_entries<S: StockBackend>(
    State(state): State<AppState<S>>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntryResponse>>, StockServiceError> {
    let usecase = ListAuditEntriesUseCase { audit: state.store };
    let entries = usecase
        .execute(ListAuditEntriesInput {
            product_id: query.product_id.map(Into::into),
            page: query.page_request(),
        })
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}
