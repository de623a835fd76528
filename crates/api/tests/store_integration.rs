//! PostgreSQL store behavior: upserts, hierarchy writes, deactivation, orders.

mod common;

use common::{seed_organization, seed_product, seed_terminal_group, test_pool, unique_external_id};
use domain::models::{
    LocalizedText, NewOrder, NewOrderItem, OrderStatus, ProductRecord, TerminalGroupRecord,
};
use domain::services::{HierarchyReconciler, RemoteGroup};
use domain::store::{CatalogEntity, CatalogStore, OrderStore, StoreError};
use persistence::PgStore;
use rust_decimal::Decimal;
use uuid::Uuid;

fn product_record(org: Uuid, external_id: &str, images: Vec<String>) -> ProductRecord {
    ProductRecord {
        external_id: external_id.to_string(),
        organization_id: org,
        group_id: None,
        name: LocalizedText::uniform("Somsa"),
        description: LocalizedText::default(),
        price: Decimal::new(1250050, 2),
        images,
    }
}

#[tokio::test]
async fn test_product_upsert_keeps_images_when_feed_has_none() {
    let Some(pool) = test_pool().await else { return };
    let store = PgStore::new(pool);
    let org = seed_organization(&store).await;
    let ext = unique_external_id("p");

    let first = store
        .upsert_product(product_record(org.id, &ext, vec!["https://img/1.jpg".to_string()]))
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.entity.price, Decimal::new(1250050, 2));

    let second = store
        .upsert_product(product_record(org.id, &ext, vec![]))
        .await
        .unwrap();
    assert!(!second.created);
    assert_eq!(second.entity.id, first.entity.id);
    assert_eq!(second.entity.images, vec!["https://img/1.jpg".to_string()]);

    let third = store
        .upsert_product(product_record(org.id, &ext, vec!["https://img/2.jpg".to_string()]))
        .await
        .unwrap();
    assert_eq!(third.entity.images, vec!["https://img/2.jpg".to_string()]);
}

#[tokio::test]
async fn test_hierarchy_writes_parents_before_children() {
    let Some(pool) = test_pool().await else { return };
    let store = PgStore::new(pool);
    let org = seed_organization(&store).await;

    let root = unique_external_id("g-root");
    let child = unique_external_id("g-child");
    let grandchild = unique_external_id("g-grand");
    let groups = vec![
        RemoteGroup {
            id: grandchild.clone(),
            name: Some("Tea".to_string()),
            parent: Some(child.clone()),
            ..Default::default()
        },
        RemoteGroup {
            id: child.clone(),
            name: Some("Hot".to_string()),
            parent: Some(root.clone()),
            ..Default::default()
        },
        RemoteGroup {
            id: root.clone(),
            name: Some("Drinks".to_string()),
            ..Default::default()
        },
    ];

    let outcome = HierarchyReconciler::default()
        .reconcile(&store, org.id, &groups)
        .await;
    assert_eq!(outcome.counts.created, 3);
    assert!(outcome.warnings.is_empty());

    let stored = store.list_groups(org.id).await.unwrap();
    let by_ext = |ext: &str| stored.iter().find(|g| g.external_id == ext).unwrap();
    assert_eq!(by_ext(&child).parent_group_id, Some(by_ext(&root).id));
    assert_eq!(by_ext(&grandchild).parent_group_id, Some(by_ext(&child).id));
    assert_eq!(by_ext(&root).parent_group_id, None);

    let again = HierarchyReconciler::default()
        .reconcile(&store, org.id, &groups)
        .await;
    assert_eq!(again.counts.created, 0);
    assert_eq!(again.counts.updated, 3);
}

#[tokio::test]
async fn test_mark_missing_inactive_is_scoped_to_organization() {
    let Some(pool) = test_pool().await else { return };
    let store = PgStore::new(pool);
    let org = seed_organization(&store).await;
    let other = seed_organization(&store).await;

    let keep = unique_external_id("keep");
    let gone = unique_external_id("gone");
    store.upsert_product(product_record(org.id, &keep, vec![])).await.unwrap();
    let gone_product = store
        .upsert_product(product_record(org.id, &gone, vec![]))
        .await
        .unwrap()
        .entity;
    let foreign = seed_product(&store, other.id, "Lagman", 30000).await;

    let changed = store
        .mark_missing_inactive(CatalogEntity::Product, org.id, &[keep.clone()])
        .await
        .unwrap();
    assert_eq!(changed, 1);

    let gone_product = store.find_product(gone_product.id).await.unwrap().unwrap();
    assert!(!gone_product.is_active);
    assert!(store.find_product(foreign.id).await.unwrap().unwrap().is_active);

    let repeat = store
        .mark_missing_inactive(CatalogEntity::Product, org.id, &[keep])
        .await
        .unwrap();
    assert_eq!(repeat, 0);

    // Reappearing in the feed reactivates the row.
    let revived = store
        .upsert_product(product_record(org.id, &gone, vec![]))
        .await
        .unwrap();
    assert!(revived.entity.is_active);
}

#[tokio::test]
async fn test_first_active_terminal_group_skips_inactive() {
    let Some(pool) = test_pool().await else { return };
    let store = PgStore::new(pool);
    let org = seed_organization(&store).await;

    assert!(store.first_active_terminal_group(org.id).await.unwrap().is_none());

    let first = store
        .upsert_terminal_group(TerminalGroupRecord {
            external_id: unique_external_id("tg"),
            organization_id: org.id,
            name: "Bar".to_string(),
        })
        .await
        .unwrap()
        .entity;
    seed_terminal_group(&store, org.id).await;

    let chosen = store.first_active_terminal_group(org.id).await.unwrap().unwrap();
    assert_eq!(chosen.id, first.id);

    let present: Vec<String> = store
        .list_terminal_groups(org.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.id != first.id)
        .map(|t| t.external_id)
        .collect();
    store
        .mark_missing_inactive(CatalogEntity::TerminalGroup, org.id, &present)
        .await
        .unwrap();

    let chosen = store.first_active_terminal_group(org.id).await.unwrap().unwrap();
    assert_ne!(chosen.id, first.id);
}

#[tokio::test]
async fn test_order_round_trip() {
    let Some(pool) = test_pool().await else { return };
    let store = PgStore::new(pool);
    let org = seed_organization(&store).await;
    let product = seed_product(&store, org.id, "Manti", 20000).await;

    let item = NewOrderItem::new(product.id, "Manti".to_string(), 3, product.price);
    let new_order = NewOrder {
        organization_id: org.id,
        user_id: None,
        customer_name: "Bekzod".to_string(),
        customer_phone: "+998901234567".to_string(),
        customer_email: None,
        delivery_address: None,
        notes: Some("Extra sauce".to_string()),
        total_amount: item.total,
    };

    let first = store
        .create_order(new_order.clone(), vec![item.clone()])
        .await
        .unwrap();
    let second = store.create_order(new_order, vec![item]).await.unwrap();

    assert_eq!(first.order.status, OrderStatus::Pending);
    assert!(first.order.order_number >= 10000);
    assert!(second.order.order_number > first.order.order_number);
    assert_eq!(first.order.total_amount, Decimal::from(60000));
    assert_eq!(first.items[0].total, Decimal::from(60000));

    let items = store.list_order_items(first.order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, Some(product.id));

    let confirmed = store
        .update_order_status(first.order.id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);

    let external = unique_external_id("iiko");
    store
        .set_external_order_id(first.order.id, &external)
        .await
        .unwrap();
    let found = store
        .find_order_by_external_id(&external)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.order.id);

    let duplicate = store.set_external_order_id(second.order.id, &external).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

    let missing = store.set_message_id(Uuid::new_v4(), 5).await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_order_items_keep_insertion_order() {
    let Some(pool) = test_pool().await else { return };
    let store = PgStore::new(pool);
    let org = seed_organization(&store).await;

    let mut items = Vec::new();
    for name in ["Shashlik", "Lagman", "Non", "Choy", "Samsa"] {
        let product = seed_product(&store, org.id, name, 10000).await;
        items.push(NewOrderItem::new(product.id, name.to_string(), 1, product.price));
    }
    let new_order = NewOrder {
        organization_id: org.id,
        user_id: None,
        customer_name: "Malika".to_string(),
        customer_phone: "+998907778899".to_string(),
        customer_email: None,
        delivery_address: None,
        notes: None,
        total_amount: Decimal::from(50000),
    };

    let created = store.create_order(new_order, items).await.unwrap();
    let listed = store.list_order_items(created.order.id).await.unwrap();

    let names: Vec<&str> = listed.iter().map(|i| i.product_name.as_str()).collect();
    assert_eq!(names, ["Shashlik", "Lagman", "Non", "Choy", "Samsa"]);
}
