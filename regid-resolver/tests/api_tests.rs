//! HTTP surface: routing, status codes and persistence on auto-apply

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use helpers::*;
use http_body_util::BodyExt;
use regid_resolver::db::companies::VALIDATED_STATUS;
use regid_resolver::db::{init_tables, CompanyStore, SqliteCompanyStore};
use regid_resolver::types::OrgRecord;
use regid_resolver::{build_router, AppState, Resolver, ResolverConfig, Source};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Resolver whose only adapter finds TOTVS with a matching website
fn totvs_resolver(config: &ResolverConfig) -> Resolver {
    let adapters = vec![FakeAdapter::new(
        Source::EmpresaQui,
        Ok(structured(vec![OrgRecord {
            website: Some("https://totvs.com".to_string()),
            ..record(TOTVS_CNPJ, "TOTVS S.A.")
        }])),
    )
    .shared()];
    Resolver::new(adapters, Vec::new(), config)
}

async fn store_with(ids: &[(&str, &str)]) -> (Arc<SqliteCompanyStore>, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();

    for (id, name) in ids {
        sqlx::query("INSERT INTO companies (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(&pool)
            .await
            .unwrap();
    }
    (Arc::new(SqliteCompanyStore::new(pool.clone())), pool)
}

/// `(cnpj, cnpj_status, cnpj_confidence, cnpj_source, updated_at)` of one company
type IdentifierColumns = (
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
);

async fn identifier_columns(pool: &SqlitePool, id: &str) -> IdentifierColumns {
    sqlx::query_as(
        "SELECT cnpj, cnpj_status, cnpj_confidence, cnpj_source, updated_at FROM companies WHERE id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn app(resolver: Resolver, store: Option<Arc<SqliteCompanyStore>>) -> Router {
    let store = store.map(|s| s as Arc<dyn CompanyStore>);
    build_router(AppState::new(Arc::new(resolver), store))
}

fn discover_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/discover")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(totvs_resolver(&ResolverConfig::default()), None);
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "regid-resolver");
}

#[tokio::test]
async fn test_missing_company_name_is_bad_request() {
    let app = app(totvs_resolver(&ResolverConfig::default()), None);

    let (status, body) = send(
        app,
        discover_request(json!({"company_name": "   ", "domain": "totvs.com"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app(totvs_resolver(&ResolverConfig::default()), None);

    let (status, body) = send(app, discover_request("{\"company_name\": ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_deadline_exceeded_is_request_timeout() {
    let mut config = ResolverConfig::default();
    config.resolution.global_deadline_ms = 50;
    let adapters = vec![FakeAdapter::new(Source::WebSearch, Ok(text(&["53.113.791/0001-22"])))
        .with_delay(Duration::from_secs(5))
        .shared()];
    let app = app(Resolver::new(adapters, Vec::new(), &config), None);

    let (status, body) = send(
        app,
        discover_request(json!({"company_name": "TOTVS SA"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["status"], "timed_out");
    assert_eq!(body["timeout"], true);
}

#[tokio::test]
async fn test_auto_applied_identifier_is_persisted() {
    let (store, pool) = store_with(&[("c-1", "TOTVS")]).await;
    let app = app(
        totvs_resolver(&ResolverConfig::default()),
        Some(Arc::clone(&store)),
    );

    let (status, body) = send(
        app,
        discover_request(
            json!({
                "company_id": "c-1",
                "company_name": "TOTVS SA",
                "domain": "totvs.com",
            })
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "auto_applied");
    assert_eq!(body["auto_applied"], true);
    assert_eq!(body["best_match"]["identifier"], TOTVS_CNPJ);
    assert_eq!(body["best_match"]["confidence"], 96);

    let (cnpj, status, confidence, source, updated_at) = identifier_columns(&pool, "c-1").await;
    assert_eq!(cnpj.as_deref(), Some(TOTVS_CNPJ));
    assert_eq!(status.as_deref(), Some(VALIDATED_STATUS));
    assert_eq!(confidence, Some(96));
    assert_eq!(source.as_deref(), Some("empresaqui"));
    assert!(updated_at.is_some());
}

#[tokio::test]
async fn test_needs_review_is_not_persisted() {
    let (store, pool) = store_with(&[("c-2", "TOTVS")]).await;
    let app = app(
        totvs_resolver(&ResolverConfig::default()),
        Some(Arc::clone(&store)),
    );

    // no domain: name alone scores 92, short of corroboration
    let (status, body) = send(
        app,
        discover_request(json!({"company_id": "c-2", "company_name": "TOTVS SA"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "needs_review");
    assert_eq!(body["auto_applied"], false);
    assert_eq!(body["candidates"].as_array().map(Vec::len), Some(1));

    let (cnpj, status, ..) = identifier_columns(&pool, "c-2").await;
    assert_eq!(cnpj, None);
    assert_eq!(status, None);
}

#[tokio::test]
async fn test_unknown_company_still_returns_resolution() {
    let (store, _pool) = store_with(&[]).await;
    let app = app(totvs_resolver(&ResolverConfig::default()), Some(store));

    let (status, body) = send(
        app,
        discover_request(
            json!({
                "company_id": "missing",
                "company_name": "TOTVS SA",
                "domain": "totvs.com",
            })
            .to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "auto_applied");
}

#[tokio::test]
async fn test_not_found_response_shape() {
    let adapters = vec![FakeAdapter::new(Source::WebSearch, Ok(text(&["sem resultados"]))).shared()];
    let app = app(
        Resolver::new(adapters, Vec::new(), &ResolverConfig::default()),
        None,
    );

    let (status, body) = send(
        app,
        discover_request(json!({"company_name": "Example Co"}).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_found");
    assert_eq!(body["auto_applied"], false);
    assert_eq!(body["best_match"], Value::Null);
    assert_eq!(body["candidates"], json!([]));
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let app = app(totvs_resolver(&ResolverConfig::default()), None);
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/discover")
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.contains_key("access-control-allow-origin"));
    assert!(headers.contains_key("access-control-allow-methods"));
    assert!(headers.contains_key("access-control-allow-headers"));
}

#[tokio::test]
async fn test_cors_headers_on_discover_response() {
    let app = app(totvs_resolver(&ResolverConfig::default()), None);
    let request = Request::builder()
        .method("POST")
        .uri("/discover")
        .header("origin", "https://app.example.com")
        .header("content-type", "application/json")
        .body(Body::from(json!({"company_name": "TOTVS SA"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}
