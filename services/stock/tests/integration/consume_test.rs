use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use nexus_domain::id::ProductId;
use nexus_stock::domain::repository::KeyRepository;
use nexus_stock::domain::types::KeyStatus;
use nexus_stock::error::StockServiceError;
use nexus_stock::infra::memory::MemoryStockStore;

use crate::helpers::{
    Fault, FaultyStore, OVERRIDE, SLOW_COMMIT, audit_of, available, consume, consume_uc, key, key_status,
    seed_key, seed_keys, seed_product,
};

#[tokio::test]
async fn should_deliver_items_in_fifo_order() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["first", "second", "third"]).await;
    let codes = seed_keys(&store, 3).await;
    let uc = consume_uc(store.clone());

    let mut delivered = Vec::new();
    for code in &codes {
        delivered.push(consume(&uc, product, code).await.unwrap().content);
    }

    assert_eq!(delivered, ["first", "second", "third"]);
    assert_eq!(available(&store, product).await, 0);
}

#[tokio::test]
async fn should_record_audit_entry_for_delivery() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["acct:pw"]).await;
    seed_key(&store, "NEXUS-AUD001").await;
    let uc = consume_uc(store.clone());

    let output = consume(&uc, product, "NEXUS-AUD001").await.unwrap();

    let audit = audit_of(&store, product).await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].content, "acct:pw");
    assert_eq!(audit[0].key_used, "NEXUS-AUD001");
    assert_eq!(audit[0].consumed_at, output.consumed_at);
    assert_eq!(key_status(&store, "NEXUS-AUD001").await, KeyStatus::Used);
}

#[tokio::test]
async fn should_not_lose_stock_when_key_is_rejected() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["only"]).await;
    let expired = key(
        "NEXUS-EXP001",
        Some(Utc::now() - Duration::minutes(1)),
        KeyStatus::Unused,
    );
    let used = key("NEXUS-USD001", None, KeyStatus::Used);
    store.insert_keys(&[expired, used]).await.unwrap();
    let uc = consume_uc(store.clone());

    let unknown = consume(&uc, product, "NEXUS-NOPE00").await;
    assert!(
        matches!(unknown, Err(StockServiceError::KeyInvalid)),
        "expected KeyInvalid, got {unknown:?}"
    );
    let expired = consume(&uc, product, "NEXUS-EXP001").await;
    assert!(
        matches!(expired, Err(StockServiceError::KeyExpired)),
        "expected KeyExpired, got {expired:?}"
    );
    let used = consume(&uc, product, "NEXUS-USD001").await;
    assert!(
        matches!(used, Err(StockServiceError::KeyAlreadyUsed)),
        "expected KeyAlreadyUsed, got {used:?}"
    );

    assert_eq!(available(&store, product).await, 1);
    assert!(audit_of(&store, product).await.is_empty());
    assert_eq!(
        key_status(&store, "NEXUS-EXP001").await,
        KeyStatus::Unused,
        "expired key must not be burned"
    );
}

#[tokio::test]
async fn should_not_burn_key_when_stock_is_empty() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &[]).await;
    seed_key(&store, "NEXUS-EMPTY1").await;
    let uc = consume_uc(store.clone());

    let result = consume(&uc, product, "NEXUS-EMPTY1").await;

    assert!(
        matches!(result, Err(StockServiceError::OutOfStock)),
        "expected OutOfStock, got {result:?}"
    );
    assert_eq!(key_status(&store, "NEXUS-EMPTY1").await, KeyStatus::Unused);
    assert!(audit_of(&store, product).await.is_empty());
}

#[tokio::test]
async fn should_treat_unknown_product_as_out_of_stock() {
    let store = MemoryStockStore::default();
    seed_key(&store, "NEXUS-NOPROD").await;
    let uc = consume_uc(store.clone());

    let result = consume(&uc, ProductId::new(), "NEXUS-NOPROD").await;

    assert!(matches!(result, Err(StockServiceError::OutOfStock)));
    assert_eq!(key_status(&store, "NEXUS-NOPROD").await, KeyStatus::Unused);
}

#[tokio::test]
async fn should_accept_override_key_repeatedly() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["a", "b", "c", "d"]).await;
    let uc = consume_uc(store.clone());

    for expected in ["a", "b", "c", "d"] {
        let output = consume(&uc, product, OVERRIDE).await.unwrap();
        assert_eq!(output.content, expected);
    }

    let audit = audit_of(&store, product).await;
    assert_eq!(audit.len(), 4);
    assert!(audit.iter().all(|e| e.key_used == OVERRIDE));
    let result = consume(&uc, product, OVERRIDE).await;
    assert!(matches!(result, Err(StockServiceError::OutOfStock)));
}

#[tokio::test]
async fn should_reject_override_code_when_override_disabled() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["a"]).await;
    let mut uc = consume_uc(store.clone());
    uc.ledger = nexus_stock::domain::ledger::KeyLedger::new(Some(String::new()));

    let result = consume(&uc, product, OVERRIDE).await;

    assert!(matches!(result, Err(StockServiceError::KeyInvalid)));
    assert_eq!(available(&store, product).await, 1);
}

#[tokio::test]
async fn should_roll_back_everything_when_a_step_fails() {
    for fault in [Fault::Append, Fault::MarkUsed, Fault::Commit] {
        let inner = MemoryStockStore::default();
        let product = seed_product(&inner, &["keep-me", "next"]).await;
        seed_key(&inner, "NEXUS-FAULT1").await;
        let uc = consume_uc(FaultyStore {
            inner: inner.clone(),
            fault,
        });

        let result = consume(&uc, product, "NEXUS-FAULT1").await;

        assert!(
            matches!(result, Err(ref e) if e.is_retryable()),
            "{fault:?}: expected StorageTransactionFailed, got {result:?}"
        );
        assert_eq!(available(&inner, product).await, 2, "{fault:?}");
        assert!(audit_of(&inner, product).await.is_empty(), "{fault:?}");
        assert_eq!(
            key_status(&inner, "NEXUS-FAULT1").await,
            KeyStatus::Unused,
            "{fault:?}"
        );

        // The same key succeeds afterwards and still gets the oldest item.
        let retry = consume(&consume_uc(inner.clone()), product, "NEXUS-FAULT1")
            .await
            .unwrap();
        assert_eq!(retry.content, "keep-me", "{fault:?}");
    }
}

#[tokio::test]
async fn should_finish_commit_that_outlasts_timeout() {
    let inner = MemoryStockStore::default();
    let product = seed_product(&inner, &["slow-but-sure"]).await;
    seed_key(&inner, "NEXUS-SLOW01").await;
    let mut uc = consume_uc(FaultyStore {
        inner: inner.clone(),
        fault: Fault::SlowCommit,
    });
    uc.timeout = StdDuration::from_millis(50);
    assert!(uc.timeout < SLOW_COMMIT);

    let result = consume(&uc, product, "NEXUS-SLOW01").await;

    let output =
        result.unwrap_or_else(|e| panic!("a committed consumption must be delivered: {e:?}"));
    assert_eq!(output.content, "slow-but-sure");
    assert_eq!(key_status(&inner, "NEXUS-SLOW01").await, KeyStatus::Used);
    assert_eq!(available(&inner, product).await, 0);
    assert_eq!(audit_of(&inner, product).await.len(), 1);
}
