use std::time::Duration;

use crate::domain::ledger::KeyLedger;
use crate::domain::repository::StockBackend;

/// Shared application state passed to every handler via axum `State`.
///
/// Generic over the storage backend so the same router runs against
/// PostgreSQL in production and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState<S: StockBackend> {
    pub store: S,
    pub ledger: KeyLedger,
    pub consume_timeout: Duration,
}
