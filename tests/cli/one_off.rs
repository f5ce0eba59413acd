use serde_json::{json, Value as JsonValue};

use crate::cli::*;

#[rstest]
#[tokio::test]
async fn test_one_off(test_store: TestStore) -> Result<(), Box<dyn std::error::Error>> {
    // Seed the store through the library, the binary picks up where it left off
    let mut context = build_context(test_store.config.clone()).await?;
    context.create_database("shop", None).await?;
    drop(context);

    let output = sqlbench_cmd(&test_store)
        .arg("--one-off")
        .arg(
            "CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT); \
             INSERT INTO items (name) VALUES ('apple'), ('pear'); \
             SELECT id, name FROM items ORDER BY id",
        )
        .output()?;

    assert!(output.status.success());

    let lines: Vec<JsonValue> = String::from_utf8_lossy(&output.stdout)
        .trim()
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    // The whole text is one batch, reported through its last row set
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["columns"], json!(["id", "name"]));
    assert_eq!(lines[0]["rows"], json!([[1, "apple"], [2, "pear"]]));
    assert_eq!(lines[0]["rowCount"], 2);

    // Everything, history included, made it to the store
    let context = build_context(test_store.config.clone()).await?;
    assert_eq!(context.tables()[0].row_count, 2);
    assert_eq!(context.history().len(), 1);

    Ok(())
}

#[rstest]
fn test_one_off_without_database(test_store: TestStore) -> std::io::Result<()> {
    let output = sqlbench_cmd(&test_store).arg("--one-off").arg("SELECT 1").output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No database selected"));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn test_one_off_failure_applies_nothing(
    test_store: TestStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut context = build_context(test_store.config.clone()).await?;
    context.create_database("shop", None).await?;
    drop(context);

    let output = sqlbench_cmd(&test_store)
        .arg("--one-off")
        .arg("CREATE TABLE items (x INTEGER); SELECT * FROM missing; SELECT 2")
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).trim().is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no such table: missing"));

    let context = build_context(test_store.config.clone()).await?;
    assert!(context.tables().is_empty());
    assert!(context.history().is_empty());
    Ok(())
}
