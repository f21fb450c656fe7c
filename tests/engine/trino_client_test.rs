use std::time::Duration;

use scanguard::config::{EngineConfig, HttpScheme};
use scanguard::engine::{EngineError, QueryEngine, TrinoEngine};
use scanguard::gate::ScriptedOperator;
use scanguard::runner::{QueryRunner, RunOutcome};
use serde_json::{json, Value};
use wiremock::matchers::{body_string, body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> TrinoEngine {
    let mut config = EngineConfig::new("127.0.0.1", "analyst");
    config.scheme = HttpScheme::Http;
    config.port = Some(server.address().port());
    config.catalog = Some("hive".to_string());
    config.request_timeout = Duration::from_secs(5);
    TrinoEngine::connect(&config).unwrap()
}

fn page(server: &MockServer, id: &str, next: Option<&str>, body: Value) -> Value {
    let mut page = json!({
        "id": id,
        "infoUri": format!("{}/ui/query.html?{}", server.uri(), id),
        "stats": { "state": "RUNNING", "processedRows": 0, "processedBytes": 0 }
    });
    if let Some(next) = next {
        page["nextUri"] = json!(format!("{}{}", server.uri(), next));
    }
    if let (Value::Object(page), Value::Object(extra)) = (&mut page, body) {
        page.extend(extra);
    }
    page
}

#[tokio::test]
async fn test_execute_follows_next_uri() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .and(header("X-Trino-User", "analyst"))
        .and(header("X-Trino-Source", "scanguard"))
        .and(header("X-Trino-Catalog", "hive"))
        .and(header_exists("X-Trino-Client-Info"))
        .and(body_string("SELECT id, code FROM fault"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q1",
            Some("/v1/statement/queued/q1/1"),
            json!({}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/statement/queued/q1/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q1",
            Some("/v1/statement/executing/q1/2"),
            json!({
                "columns": [
                    { "name": "id", "type": "bigint" },
                    { "name": "code", "type": "varchar" }
                ],
                "data": [[1, "E01"]]
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/statement/executing/q1/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q1",
            None,
            json!({ "data": [[2, "E02"], [3, null]] }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();
    cursor.execute("SELECT id, code FROM fault").await.unwrap();

    let columns = cursor.description().unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[1].name, "code");
    assert_eq!(columns[1].type_name, "varchar");

    let rows = cursor.fetch_all().await.unwrap();
    assert_eq!(
        rows,
        vec![
            vec![json!(1), json!("E01")],
            vec![json!(2), json!("E02")],
            vec![json!(3), json!(null)],
        ]
    );

    cursor.close().await.unwrap();
    engine.close().await.unwrap();
}

#[tokio::test]
async fn test_error_page_is_query_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q2",
            None,
            json!({
                "error": {
                    "message": "line 1:1: mismatched input 'SELEC'",
                    "errorCode": 1,
                    "errorName": "SYNTAX_ERROR",
                    "errorType": "USER_ERROR"
                }
            }),
        )))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();
    let err = cursor.execute("SELEC 1").await.unwrap_err();

    assert!(err.is_query_failure());
    match err {
        EngineError::Query { name, code, message } => {
            assert_eq!(name, "SYNTAX_ERROR");
            assert_eq!(code, 1);
            assert!(message.contains("mismatched input"));
        }
        other => panic!("expected query error, got {:?}", other),
    }
    cursor.close().await.unwrap();
}

#[tokio::test]
async fn test_http_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();
    let err = cursor.execute("SELECT 1").await.unwrap_err();

    assert!(matches!(err, EngineError::Http { status: 401, ref body } if body == "Unauthorized"));
    assert!(!err.is_query_failure());
}

#[tokio::test]
async fn test_close_cancels_unfinished_statement() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q3",
            Some("/v1/statement/executing/q3/1"),
            json!({}),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/statement/executing/q3/1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1/statement/executing/q3/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();
    let err = cursor.execute("SELECT * FROM fault").await.unwrap_err();
    assert!(matches!(err, EngineError::Http { status: 500, .. }));

    cursor.close().await.unwrap();
    // Second close is a no-op.
    cursor.close().await.unwrap();
}

#[tokio::test]
async fn test_busy_coordinator_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q4",
            Some("/v1/statement/executing/q4/1"),
            json!({}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/statement/executing/q4/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/statement/executing/q4/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q4",
            None,
            json!({
                "columns": [{ "name": "n", "type": "bigint" }],
                "data": [[42]]
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();
    cursor.execute("SELECT 42").await.unwrap();

    assert_eq!(cursor.fetch_all().await.unwrap(), vec![vec![json!(42)]]);
    cursor.close().await.unwrap();
}

#[tokio::test]
async fn test_busy_coordinator_gives_up_after_three_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "q5",
            Some("/v1/statement/executing/q5/1"),
            json!({}),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/statement/executing/q5/1"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1/statement/executing/q5/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();
    let err = cursor.execute("SELECT 1").await.unwrap_err();

    assert!(err.is_retryable());
    cursor.close().await.unwrap();
}

#[tokio::test]
async fn test_busy_statement_submission_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();
    let err = cursor.execute("SELECT 1").await.unwrap_err();

    assert!(matches!(err, EngineError::Http { status: 503, .. }));
}

#[test]
fn test_retryable_statuses() {
    let http = |status| EngineError::Http {
        status,
        body: String::new(),
    };
    assert!(http(502).is_retryable());
    assert!(http(503).is_retryable());
    assert!(http(504).is_retryable());
    assert!(!http(500).is_retryable());
    assert!(!http(401).is_retryable());
    assert!(!EngineError::query("SYNTAX_ERROR", 1, "bad").is_retryable());
}

#[tokio::test]
async fn test_cursor_state_errors() {
    let server = MockServer::start().await;
    let engine = engine_for(&server);
    let mut cursor = engine.cursor().await.unwrap();

    assert!(matches!(
        cursor.fetch_all().await,
        Err(EngineError::NoStatement)
    ));

    cursor.close().await.unwrap();
    assert!(matches!(
        cursor.execute("SELECT 1").await,
        Err(EngineError::CursorClosed)
    ));
}

#[tokio::test]
async fn test_gated_run_over_http() {
    let server = MockServer::start().await;
    let explain = json!({
        "inputTableColumnInfos": [{
            "table": { "catalog": "hive", "schemaTable": { "schema": "logs", "table": "fault" } },
            "estimate": { "outputSizeInBytes": 2048.0 }
        }],
        "estimate": { "outputSizeInBytes": 512.0 }
    });

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .and(body_string_contains("EXPLAIN (TYPE IO, FORMAT JSON)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "explain",
            None,
            json!({
                "columns": [{ "name": "Query Plan", "type": "varchar" }],
                "data": [[explain.to_string()]]
            }),
        )))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .and(body_string("SELECT * FROM hive.logs.fault"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            &server,
            "run",
            None,
            json!({
                "columns": [{ "name": "n", "type": "bigint" }],
                "data": [[7]]
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let mut operator = ScriptedOperator::always(false);
    let result = QueryRunner::default()
        .run(&engine, &mut operator, "SELECT * FROM hive.logs.fault")
        .await
        .unwrap();

    let RunOutcome::Completed(rows) = result else {
        panic!("expected the query to run");
    };
    assert_eq!(rows.rows, vec![vec![json!(7)]]);
    assert!(operator.questions().is_empty());
}
