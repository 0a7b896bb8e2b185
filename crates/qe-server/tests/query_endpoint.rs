//! Integration tests for the HTTP surface (§6.2), driven through
//! `tower::ServiceExt::oneshot` against a stub executor so no live backend
//! is required.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use qe_core::{CatalogConfig, Registry};
use qe_exec::{CommandOutcome, ExecResult, ExecutionRequest, Executor, Row};
use qe_server::{router, AppState};
use tower::ServiceExt;

struct StubExecutor;

#[async_trait]
impl Executor for StubExecutor {
    async fn execute_query(&self, _request: &ExecutionRequest) -> ExecResult<Vec<Row>> {
        Ok(vec![vec![
            ("id".to_string(), qe_core::ir::Scalar::Uuid(uuid::Uuid::nil())),
            ("total".to_string(), qe_core::ir::Scalar::Int(42)),
        ]])
    }

    async fn execute_command(&self, _request: &ExecutionRequest) -> ExecResult<CommandOutcome> {
        Ok(CommandOutcome {
            affected_rows: 1,
            returned: Vec::new(),
        })
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}

fn test_registry() -> Registry {
    let config: CatalogConfig = serde_json::from_value(serde_json::json!({
        "models": [{
            "name": "orders",
            "table": "orders",
            "primaryKey": "id",
            "fields": [
                { "name": "id", "type": "uuid", "nullable": false },
                { "name": "user_id", "type": "uuid", "nullable": false },
                { "name": "total", "type": "integer", "nullable": false }
            ]
        }]
    }))
    .unwrap();
    Registry::load(&config).unwrap()
}

fn test_state() -> Arc<AppState> {
    Arc::new(AppState {
        registry: Arc::new(test_registry()),
        executor: Arc::new(StubExecutor),
        db_type: "postgres",
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn info_reports_the_configured_backend() {
    let app = router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/info").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "database_type": "postgres", "status": "ok" })
    );
}

#[tokio::test]
async fn query_compiles_and_executes_the_uuid_equality_scenario() {
    let app = router(test_state());
    let body = serde_json::json!({
        "model": "orders",
        "filters": {
            "field": "user_id",
            "op": "=",
            "value": "11111111-1111-1111-1111-111111111111"
        }
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["sql"],
        serde_json::json!("SELECT * FROM orders t0 WHERE t0.user_id = $1::uuid LIMIT $2 OFFSET $3;")
    );
    assert_eq!(
        json["params"],
        serde_json::json!(["11111111-1111-1111-1111-111111111111", 100, 0])
    );
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn query_rejects_an_unknown_model_with_bad_request() {
    let app = router(test_state());
    let body = serde_json::json!({ "model": "missing" });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
