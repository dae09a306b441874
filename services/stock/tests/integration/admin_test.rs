use nexus_domain::pagination::PageRequest;
use nexus_stock::error::StockServiceError;
use nexus_stock::infra::memory::MemoryStockStore;
use nexus_stock::usecase::audit::{ListAuditEntriesInput, ListAuditEntriesUseCase};
use nexus_stock::usecase::catalog::{
    AddStockInput, AddStockUseCase, ClearStockUseCase, RemoveProductUseCase,
};
use nexus_stock::usecase::inventory::ListProductsUseCase;

use crate::helpers::{OVERRIDE, available, consume, consume_uc, seed_keys, seed_product};

#[tokio::test]
async fn should_append_stock_behind_existing_items() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["old"]).await;

    AddStockUseCase {
        catalog: store.clone(),
    }
    .execute(AddStockInput {
        product_id: product,
        lines: "new-1\n\nnew-2\n".to_owned(),
    })
    .await
    .unwrap();
    assert_eq!(available(&store, product).await, 3);

    let uc = consume_uc(store.clone());
    let mut delivered = Vec::new();
    for _ in 0..3 {
        delivered.push(consume(&uc, product, OVERRIDE).await.unwrap().content);
    }
    assert_eq!(delivered, ["old", "new-1", "new-2"]);
}

#[tokio::test]
async fn should_keep_audit_history_after_product_removal() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["sold", "unsold"]).await;
    let codes = seed_keys(&store, 1).await;
    consume(&consume_uc(store.clone()), product, &codes[0])
        .await
        .unwrap();

    RemoveProductUseCase {
        catalog: store.clone(),
    }
    .execute(product)
    .await
    .unwrap();

    let products = ListProductsUseCase {
        inventory: store.clone(),
    }
    .execute()
    .await
    .unwrap();
    assert!(products.is_empty());

    let audit = ListAuditEntriesUseCase {
        audit: store.clone(),
    }
    .execute(ListAuditEntriesInput {
        product_id: Some(product),
        page: PageRequest::default(),
    })
    .await
    .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].content, "sold");

    let result = consume(&consume_uc(store.clone()), product, OVERRIDE).await;
    assert!(matches!(result, Err(StockServiceError::OutOfStock)));
}

#[tokio::test]
async fn should_report_out_of_stock_after_clearing() {
    let store = MemoryStockStore::default();
    let product = seed_product(&store, &["a", "b"]).await;

    let removed = ClearStockUseCase {
        catalog: store.clone(),
    }
    .execute(product)
    .await
    .unwrap();

    assert_eq!(removed, 2);
    let result = consume(&consume_uc(store.clone()), product, OVERRIDE).await;
    assert!(matches!(result, Err(StockServiceError::OutOfStock)));
}

#[tokio::test]
async fn should_list_audit_newest_first_and_filter_by_product() {
    let store = MemoryStockStore::default();
    let first = seed_product(&store, &["f1", "f2"]).await;
    let second = seed_product(&store, &["s1"]).await;
    let uc = consume_uc(store.clone());
    consume(&uc, first, OVERRIDE).await.unwrap();
    consume(&uc, second, OVERRIDE).await.unwrap();
    consume(&uc, first, OVERRIDE).await.unwrap();

    let audit = ListAuditEntriesUseCase {
        audit: store.clone(),
    };
    let all = audit
        .execute(ListAuditEntriesInput {
            product_id: None,
            page: PageRequest::default(),
        })
        .await
        .unwrap();
    let contents: Vec<_> = all.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, ["f2", "s1", "f1"]);

    let only_second = audit
        .execute(ListAuditEntriesInput {
            product_id: Some(second),
            page: PageRequest::default(),
        })
        .await
        .unwrap();
    assert_eq!(only_second.len(), 1);
    assert_eq!(only_second[0].content, "s1");
}
