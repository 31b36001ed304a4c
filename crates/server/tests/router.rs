//! Router behaviour that needs no database: probes, docs and the bearer middleware.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use configs::UploadConfig;
use models::user::Role;
use server::routes::{self, auth};
use service::auth::domain::Claims;

const SECRET: &str = "test-secret";

fn app() -> Router {
    let state = auth::ServerState {
        db: DatabaseConnection::Disconnected,
        auth: auth::ServerAuthConfig { jwt_secret: SECRET.into(), token_ttl_hours: 1, cookie_secure: false },
        uploads: Arc::new(UploadConfig::default()),
    };
    routes::build_router(tower_http::cors::CorsLayer::very_permissive(), state)
}

fn token(role: Role, exp_offset_secs: i64) -> String {
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_secs() as i64;
    let claims = Claims {
        sub: "someone@example.com".into(),
        uid: Uuid::new_v4().to_string(),
        tid: Uuid::new_v4().to_string(),
        role,
        exp: (now + exp_offset_secs) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() -> anyhow::Result<()> {
    let resp = app().oneshot(Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"status": "ok"}));
    Ok(())
}

#[tokio::test]
async fn metrics_expose_request_counter() -> anyhow::Result<()> {
    let app = app();
    app.clone().oneshot(Request::get("/health").body(Body::empty())?).await?;
    let resp = app.oneshot(Request::get("/metrics").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(resp.into_body(), usize::MAX).await?.to_vec())?;
    assert!(text.contains("ideabox_http_requests_total"));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> anyhow::Result<()> {
    let resp = app().oneshot(Request::get("/api-docs/openapi.json").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    assert!(doc["paths"].get("/api/v1/ideas").is_some());
    Ok(())
}

#[tokio::test]
async fn missing_token_is_bad_request() -> anyhow::Result<()> {
    let resp = app().oneshot(Request::get("/api/v1/ideas").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Validation Error");
    Ok(())
}

#[tokio::test]
async fn garbage_and_expired_tokens_are_unauthorized() -> anyhow::Result<()> {
    let req = Request::get("/api/v1/ideas").header("authorization", "Bearer not-a-jwt").body(Body::empty())?;
    assert_eq!(app().oneshot(req).await?.status(), StatusCode::UNAUTHORIZED);

    let expired = token(Role::Admin, -3600);
    let req = Request::get("/api/v1/ideas").header("authorization", format!("Bearer {expired}")).body(Body::empty())?;
    assert_eq!(app().oneshot(req).await?.status(), StatusCode::UNAUTHORIZED);

    let req = Request::get("/api/v1/ideas").header("authorization", "Basic Zm9vOmJhcg==").body(Body::empty())?;
    assert_eq!(app().oneshot(req).await?.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn valid_token_for_unknown_account_is_not_let_through() -> anyhow::Result<()> {
    // the signature checks out but the account lookup cannot succeed
    let req = Request::post("/api/v1/categories")
        .header("cookie", format!("theme=dark; auth_token={}", token(Role::Admin, 3600)))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&json!({"name": "Safety"}))?))?;
    let resp = app().oneshot(req).await?;
    assert!(resp.status().is_client_error() || resp.status().is_server_error());
    assert_ne!(resp.status(), StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn preflight_skips_auth() -> anyhow::Result<()> {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/ideas")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())?;
    let resp = app().oneshot(req).await?;
    assert_ne!(resp.status(), StatusCode::BAD_REQUEST);
    assert_ne!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
