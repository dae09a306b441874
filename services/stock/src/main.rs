use anyhow::Context;
use sea_orm::Database;
use tracing::{info, warn};

use nexus_core::tracing::init_tracing;
use nexus_stock::config::StockConfig;
use nexus_stock::domain::ledger::KeyLedger;
use nexus_stock::infra::db::DbStockStore;
use nexus_stock::router::build_router;
use nexus_stock::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = StockConfig::from_env()?;
    if config.override_key_is_default {
        warn!("OVERRIDE_KEY unset, the built-in default override key is active");
    } else if config.override_key.is_none() {
        info!("override key disabled");
    }

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let state = AppState {
        store: DbStockStore { db },
        ledger: KeyLedger::new(config.override_key),
        consume_timeout: config.consume_timeout,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.stock_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("stock service listening on {addr}");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
