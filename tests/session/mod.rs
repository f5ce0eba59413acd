use rstest::rstest;

use sqlbench::config::context::build_context;
use sqlbench::context::{ContextError, SessionContext};
use sqlbench::engine::Value;
use sqlbench::repository::interface::{
    clear_last_opened, get_last_opened, set_last_opened, Repository,
};

use crate::{test_store, TestStore};

mod generate;
mod properties;

async fn open(store: &TestStore) -> SessionContext {
    build_context(store.config.clone()).await.unwrap()
}

#[rstest]
#[tokio::test]
async fn test_shop_scenario(test_store: TestStore) {
    let mut context = open(&test_store).await;

    let shop = context.create_database("shop", None).await.unwrap();
    assert_eq!(context.databases().len(), 1);
    assert_eq!(context.databases()[0].name, "shop");
    assert_eq!(context.active_id(), Some(shop.id.as_str()));

    let create = context
        .execute("CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT)")
        .await
        .unwrap();
    assert_eq!(create.row_count, 0);

    let insert = context
        .execute("INSERT INTO items (name) VALUES ('apple')")
        .await
        .unwrap();
    assert_eq!(insert.row_count, 0);

    context.reload_schema().unwrap();
    let items = &context.tables()[0];
    assert_eq!(items.name, "items");
    assert_eq!(items.row_count, 1);
    assert_eq!(
        items
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.r#type.as_str(), c.primary_key))
            .collect::<Vec<_>>(),
        vec![("id", "INTEGER", true), ("name", "TEXT", false)]
    );

    context.delete_database(&shop.id).await.unwrap();
    assert!(context.databases().is_empty());
    assert_eq!(context.active_id(), None);
}

#[rstest]
#[tokio::test]
async fn test_state_survives_restart(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let shop = context
        .create_database("shop", Some("groceries".to_string()))
        .await
        .unwrap();
    context
        .execute("CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT)")
        .await
        .unwrap();
    context
        .execute("INSERT INTO items (name) VALUES ('apple'), ('pear')")
        .await
        .unwrap();
    let entry = context
        .append_history("SELECT * FROM items", None)
        .await
        .unwrap();
    drop(context);

    let mut context = open(&test_store).await;
    assert_eq!(context.active_id(), Some(shop.id.as_str()));
    assert_eq!(
        context.active_database().unwrap().description,
        Some("groceries".to_string())
    );
    assert_eq!(context.tables()[0].row_count, 2);
    assert_eq!(context.history(), &[entry]);

    let result = context
        .execute("SELECT name FROM items ORDER BY id")
        .await
        .unwrap();
    assert_eq!(
        result.rows,
        vec![vec![Value::from("apple")], vec![Value::from("pear")]]
    );
}

#[rstest]
#[tokio::test]
async fn test_switch_between_databases(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let first = context.create_database("first", None).await.unwrap();
    context.execute("CREATE TABLE a (x INTEGER)").await.unwrap();
    context.append_history("SELECT 1", None).await.unwrap();

    let second = context.create_database("second", None).await.unwrap();
    assert!(context.tables().is_empty());
    assert!(context.history().is_empty());

    context.switch_to(&first.id).await.unwrap();
    assert_eq!(context.tables()[0].name, "a");
    assert_eq!(context.history().len(), 1);
    assert_eq!(
        get_last_opened(context.repository.as_ref()).await.unwrap(),
        Some(first.id.clone())
    );

    context.delete_database(&first.id).await.unwrap();
    assert_eq!(context.active_id(), Some(second.id.as_str()));
    assert_eq!(context.last_opened(), Some(second.id.as_str()));
}

#[rstest]
#[tokio::test]
async fn test_corrupt_blob_is_skipped(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let shop = context.create_database("shop", None).await.unwrap();
    context
        .repository
        .put_database_blob("mangled", b"these bytes were never a database image")
        .await
        .unwrap();
    set_last_opened(context.repository.as_ref(), "mangled")
        .await
        .unwrap();
    drop(context);

    let mut context = open(&test_store).await;
    assert_eq!(context.databases().len(), 1);
    assert_eq!(context.active_id(), Some(shop.id.as_str()));

    let err = context.switch_to("mangled").await.unwrap_err();
    assert!(matches!(err, ContextError::BlobCorrupt { .. }));
}

#[rstest]
#[tokio::test]
async fn test_legacy_entries_hidden(test_store: TestStore) {
    let mut context = open(&test_store).await;
    context
        .create_database("Sample Northwind", None)
        .await
        .unwrap();
    let shop = context.create_database("shop", None).await.unwrap();
    clear_last_opened(context.repository.as_ref()).await.unwrap();
    drop(context);

    let context = open(&test_store).await;
    assert_eq!(
        context
            .databases()
            .iter()
            .map(|d| d.id.as_str())
            .collect::<Vec<_>>(),
        vec![shop.id.as_str()]
    );
    assert_eq!(context.active_id(), Some(shop.id.as_str()));
}
