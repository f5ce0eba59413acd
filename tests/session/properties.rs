use std::time::Duration;

use rstest::rstest;
use tokio::time::sleep;

use sqlbench::repository::interface::{clear_last_opened, set_last_opened, Repository};

use super::open;
use crate::{test_store, TestStore};

#[rstest]
#[tokio::test]
async fn test_persist_then_switch_round_trips(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let shop = context.create_database("shop", None).await.unwrap();
    context
        .execute(
            "CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT NOT NULL, price REAL);
             CREATE TABLE tags(item_id INTEGER, tag TEXT);
             INSERT INTO items (name, price) VALUES ('apple', 0.5), ('pear', NULL);
             INSERT INTO tags VALUES (1, 'fruit');",
        )
        .await
        .unwrap();

    let tables_before = context.tables().to_vec();
    let rows_before = context.execute("SELECT * FROM items").await.unwrap().rows;

    context.persist_now().await.unwrap();
    context.switch_to(&shop.id).await.unwrap();

    assert_eq!(context.tables(), tables_before.as_slice());
    let rows_after = context.execute("SELECT * FROM items").await.unwrap().rows;
    assert_eq!(rows_after, rows_before);
}

#[rstest]
#[tokio::test]
async fn test_delete_cascades(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let keep = context.create_database("keep", None).await.unwrap();
    context.append_history("SELECT 'kept'", None).await.unwrap();

    let doomed = context.create_database("doomed", None).await.unwrap();
    for i in 0..3 {
        context
            .append_history(&format!("SELECT {i}"), None)
            .await
            .unwrap();
    }

    context.delete_database(&doomed.id).await.unwrap();

    let remaining = context.repository.get_all_queries().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|q| q.database_id == keep.id));
    assert!(context.databases().iter().all(|d| d.id != doomed.id));
    assert!(context
        .repository
        .get_database_blob(&doomed.id)
        .await
        .unwrap()
        .is_none());
}

#[rstest]
#[tokio::test]
async fn test_reselection(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let a = context.create_database("A", None).await.unwrap();
    sleep(Duration::from_millis(5)).await;
    let b = context.create_database("B", None).await.unwrap();
    assert!(a.last_modified < b.last_modified);

    // Nothing remembered: the newest one wins
    clear_last_opened(context.repository.as_ref()).await.unwrap();
    drop(context);
    let mut context = open(&test_store).await;
    assert_eq!(context.active_id(), Some(b.id.as_str()));

    // Remembered and present: it wins even though it's older
    set_last_opened(context.repository.as_ref(), &a.id)
        .await
        .unwrap();
    drop(context);
    let context = open(&test_store).await;
    assert_eq!(context.active_id(), Some(a.id.as_str()));
    assert_eq!(context.databases()[0].id, b.id);
}

#[rstest]
#[tokio::test]
async fn test_deleting_last_database_clears_everything(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let only = context.create_database("only", None).await.unwrap();
    context.execute("CREATE TABLE t (x INTEGER)").await.unwrap();
    context.append_history("SELECT * FROM t", None).await.unwrap();

    context.delete_database(&only.id).await.unwrap();

    assert_eq!(context.active_id(), None);
    assert_eq!(context.last_opened(), None);
    assert!(context.tables().is_empty());
    assert!(context.history().is_empty());
    assert!(context.export_active().is_err());
}

#[rstest]
#[tokio::test]
async fn test_mutations_and_reads_are_persisted(test_store: TestStore) {
    let mut context = open(&test_store).await;
    let shop = context.create_database("shop", None).await.unwrap();

    context.execute("CREATE TABLE t(x INTEGER)").await.unwrap();
    let stored = context
        .repository
        .get_database_blob(&shop.id)
        .await
        .unwrap()
        .unwrap();

    // The stored image alone already knows about `t`
    let mut restarted = open(&test_store).await;
    assert_eq!(restarted.tables()[0].name, "t");
    drop(restarted);

    sleep(Duration::from_millis(5)).await;
    context.execute("SELECT 1").await.unwrap();
    let after_select = context
        .repository
        .get_database_blob(&shop.id)
        .await
        .unwrap()
        .unwrap();

    // Re-stamped modification time means a new image was written
    assert_ne!(stored, after_select);

    restarted = open(&test_store).await;
    assert!(restarted.databases()[0].last_modified > shop.last_modified);
}

#[rstest]
#[tokio::test]
async fn test_toggle_favorite_twice(test_store: TestStore) {
    let mut context = open(&test_store).await;
    context.create_database("shop", None).await.unwrap();
    let entry = context.append_history("SELECT 1", None).await.unwrap();
    assert!(!entry.is_favorite);

    context.toggle_favorite(&entry.id).await.unwrap();
    let toggled = context.toggle_favorite(&entry.id).await.unwrap();

    assert_eq!(toggled, entry);
    assert_eq!(context.history(), &[entry]);
}
