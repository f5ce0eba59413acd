use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sqlbench::config::context::build_context;
use sqlbench::config::schema::load_config_from_string;
use sqlbench::context::ContextError;
use sqlbench::engine::Value;

use crate::{test_store, TestStore};

async fn mock_generator(status: u16, content: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })))
        .mount(&server)
        .await;
    server
}

fn config_with_generator(store: &TestStore, server: &MockServer) -> String {
    format!(
        "{}\n[generator]\nendpoint = \"{}/v1/chat/completions\"\nmodel = \"test\"\n",
        store.config_str(),
        server.uri()
    )
}

#[rstest]
#[tokio::test]
async fn test_generate_and_execute(test_store: TestStore) {
    let server = mock_generator(200, "```sql\nSELECT name FROM items ORDER BY id\n```").await;
    let config =
        load_config_from_string(&config_with_generator(&test_store, &server), false, None)
            .unwrap();

    let mut context = build_context(config).await.unwrap();
    context.create_database("shop", None).await.unwrap();
    context
        .execute(
            "CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO items (name) VALUES ('apple'), ('pear');",
        )
        .await
        .unwrap();

    let generated = context
        .generate_and_execute("names of all the items")
        .await
        .unwrap();

    assert_eq!(generated.statement, "SELECT name FROM items ORDER BY id");
    assert_eq!(
        generated.result.rows,
        vec![vec![Value::from("apple")], vec![Value::from("pear")]]
    );
}

#[rstest]
#[tokio::test]
async fn test_generation_failure_leaves_database_alone(test_store: TestStore) {
    let server = mock_generator(500, "DROP TABLE items").await;
    let config =
        load_config_from_string(&config_with_generator(&test_store, &server), false, None)
            .unwrap();

    let mut context = build_context(config).await.unwrap();
    context.create_database("shop", None).await.unwrap();
    context
        .execute("CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT)")
        .await
        .unwrap();

    let err = context
        .generate_and_execute("get rid of the items")
        .await
        .unwrap_err();

    assert!(matches!(err, ContextError::GenerationFailed(_)));
    assert_eq!(context.tables()[0].name, "items");
}
