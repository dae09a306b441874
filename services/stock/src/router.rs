use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};

use nexus_core::health::{healthz, readiness};
use nexus_core::middleware::with_http_layers;

use crate::domain::repository::StockBackend;
use crate::handlers::{
    admin::{
        add_stock, clear_stock, create_product, issue_keys, list_audit_entries, list_keys,
        remove_product, revoke_key,
    },
    consume::consume,
    inventory::list_products,
    key::validate_key,
};
use crate::state::AppState;

async fn readyz<S: StockBackend>(State(state): State<AppState<S>>) -> StatusCode {
    readiness(state.store.ping().await)
}

pub fn build_router<S: StockBackend>(state: AppState<S>) -> Router {
    let router = Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz::<S>))
        // Storefront
        .route("/products", get(list_products::<S>))
        .route("/products/{product_id}/consume", post(consume::<S>))
        .route("/keys/validate", post(validate_key::<S>))
        // Admin: keys
        .route("/admin/keys", post(issue_keys::<S>).get(list_keys::<S>))
        .route("/admin/keys/{key_id}", delete(revoke_key::<S>))
        // Admin: catalog
        .route("/admin/products", post(create_product::<S>))
        .route("/admin/products/{product_id}", delete(remove_product::<S>))
        .route(
            "/admin/products/{product_id}/stock",
            post(add_stock::<S>).delete(clear_stock::<S>),
        )
        // Admin: audit
        .route("/admin/audit", get(list_audit_entries::<S>))
        .with_state(state);
    with_http_layers(router)
}
