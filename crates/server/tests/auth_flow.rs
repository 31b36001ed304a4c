use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use configs::UploadConfig;
use server::routes::{self, auth};

async fn build_app() -> Option<Router> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return None; }
    let db = match models::db::connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skipping auth flow tests: {e}");
            return None;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skipping auth flow tests, migration failed: {e}");
        return None;
    }
    let state = auth::ServerState {
        db,
        auth: auth::ServerAuthConfig { jwt_secret: "test-secret".into(), token_ttl_hours: 1, cookie_secure: false },
        uploads: Arc::new(UploadConfig::default()),
    };
    Some(routes::build_router(tower_http::cors::CorsLayer::very_permissive(), state))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_of(resp: axum::response::Response) -> Value {
    serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_register_login_me_flow() -> anyhow::Result<()> {
    let Some(app) = build_app().await else { return Ok(()); };
    let tid = Uuid::new_v4();
    let email = format!("user_{}@example.com", Uuid::new_v4());

    let resp = app.clone().oneshot(post_json("/api/v1/auth/register", json!({
        "tenant_id": tid, "tenant_name": "Acme", "email": email, "name": "Tester", "password": "S3curePass!"
    }))).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_of(resp).await["role"], "admin");

    let resp = app.clone().oneshot(post_json("/api/v1/auth/login", json!({
        "tenant_id": tid, "email": email, "password": "S3curePass!"
    }))).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers().get("set-cookie").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(cookie.contains("auth_token=") && cookie.contains("HttpOnly"));
    let token = json_of(resp).await["token"].as_str().unwrap_or_default().to_string();

    let req = Request::get("/api/v1/auth/me").header("authorization", format!("Bearer {token}")).body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = json_of(resp).await;
    assert_eq!(me["email"], email);
    assert_eq!(me["tenant_id"], tid.to_string());

    // the tenant got its default workflow
    let req = Request::get("/api/v1/statuses").header("authorization", format!("Bearer {token}")).body(Body::empty())?;
    let statuses = json_of(app.oneshot(req).await?).await;
    assert_eq!(statuses.as_array().map(|a| a.len()), Some(5));
    Ok(())
}

#[tokio::test]
async fn test_second_registrant_is_plain_user_and_duplicates_conflict() -> anyhow::Result<()> {
    let Some(app) = build_app().await else { return Ok(()); };
    let tid = Uuid::new_v4();
    let first = json!({"tenant_id": tid, "email": "first@example.com", "name": "First", "password": "StrongPass123"});
    app.clone().oneshot(post_json("/api/v1/auth/register", first.clone())).await?;

    let resp = app.clone().oneshot(post_json("/api/v1/auth/register", json!({
        "tenant_id": tid, "email": "second@example.com", "name": "Second", "password": "StrongPass123"
    }))).await?;
    assert_eq!(json_of(resp).await["role"], "user");

    let resp = app.oneshot(post_json("/api/v1/auth/register", first)).await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password() -> anyhow::Result<()> {
    let Some(app) = build_app().await else { return Ok(()); };
    let tid = Uuid::new_v4();
    let email = format!("user_{}@example.com", Uuid::new_v4());
    app.clone().oneshot(post_json("/api/v1/auth/register", json!({
        "tenant_id": tid, "email": email, "name": "Tester", "password": "StrongPass123"
    }))).await?;

    let resp = app.oneshot(post_json("/api/v1/auth/login", json!({
        "tenant_id": tid, "email": email, "password": "wrong"
    }))).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_register_short_password_rejected() -> anyhow::Result<()> {
    let Some(app) = build_app().await else { return Ok(()); };
    let resp = app.oneshot(post_json("/api/v1/auth/register", json!({
        "tenant_id": Uuid::new_v4(), "email": "a@b.com", "name": "A", "password": "short"
    }))).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

/// Register an admin and a plain user in a fresh tenant; returns their tokens and the user's id.
async fn admin_and_user(app: &Router) -> anyhow::Result<(String, String, String)> {
    let tid = Uuid::new_v4();
    let mut tokens = Vec::new();
    let mut user_id = String::new();
    for (i, name) in ["Boss", "Member"].into_iter().enumerate() {
        let email = format!("{}_{}@example.com", name.to_lowercase(), Uuid::new_v4());
        let reg = json_of(app.clone().oneshot(post_json("/api/v1/auth/register", json!({
            "tenant_id": tid, "email": email, "name": name, "password": "StrongPass123"
        }))).await?).await;
        if i == 1 {
            user_id = reg["user_id"].as_str().unwrap_or_default().to_string();
        }
        let login = json_of(app.clone().oneshot(post_json("/api/v1/auth/login", json!({
            "tenant_id": tid, "email": email, "password": "StrongPass123"
        }))).await?).await;
        tokens.push(login["token"].as_str().unwrap_or_default().to_string());
    }
    Ok((tokens[0].clone(), tokens[1].clone(), user_id))
}

fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json");
    match body {
        Some(b) => builder.body(Body::from(b.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_roles_cookie_and_logout() -> anyhow::Result<()> {
    let Some(app) = build_app().await else { return Ok(()); };
    let (_admin, user, _) = admin_and_user(&app).await?;

    let resp = app.clone().oneshot(authed("POST", "/api/v1/categories", &user, Some(json!({"name": "Safety"})))).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_of(resp).await["error"], "Forbidden");

    let req = Request::post("/api/v1/statuses")
        .header("cookie", format!("theme=dark; auth_token={user}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "Parked", "kind": "pending"}).to_string()))?;
    assert_eq!(app.clone().oneshot(req).await?.status(), StatusCode::FORBIDDEN);

    let resp = app.oneshot(authed("POST", "/api/v1/auth/logout", &user, None)).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookie = resp.headers().get("set-cookie").and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("auth_token="));
    Ok(())
}

#[tokio::test]
async fn test_role_and_status_changes_apply_to_live_tokens() -> anyhow::Result<()> {
    let Some(app) = build_app().await else { return Ok(()); };
    let (admin, user, user_id) = admin_and_user(&app).await?;
    let role_uri = format!("/api/v1/users/{user_id}/role");

    // promotion takes effect without a new login
    let resp = app.clone().oneshot(authed("PUT", &role_uri, &admin, Some(json!({"role": "admin"})))).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.clone().oneshot(authed("POST", "/api/v1/categories", &user, Some(json!({"name": "Energy"})))).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // so does disabling the account
    let resp = app.clone().oneshot(authed("PUT", &role_uri, &admin, Some(json!({"status": "disabled"})))).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.oneshot(authed("GET", "/api/v1/ideas", &user, None)).await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
