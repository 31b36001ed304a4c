use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use configs::UploadConfig;
use models::user::Role;
use service::auth::{
    decode_token,
    domain::{AuthUser, LoginInput, RegisterInput},
    repo::SeaOrmAuthRepository,
    service::{AuthConfig, AuthService},
};
use service::rbac::Actor;

use crate::errors::JsonApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub cookie_secure: bool,
}

impl ServerAuthConfig {
    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_ttl_hours: cfg.token_ttl_hours,
            cookie_secure: cfg.cookie_secure,
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: ServerAuthConfig,
    pub uploads: Arc<UploadConfig>,
}

impl ServerState {
    pub fn auth_service(&self) -> AuthService<SeaOrmAuthRepository> {
        let repo = Arc::new(SeaOrmAuthRepository::new(self.db.clone()));
        AuthService::new(repo, AuthConfig {
            jwt_secret: Some(self.auth.jwt_secret.clone()),
            password_algorithm: "argon2".into(),
            token_ttl_hours: self.auth.token_ttl_hours,
        })
    }
}

/// The authenticated caller, as placed in request extensions by the bearer middleware.
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .map(CurrentActor)
            .ok_or_else(|| JsonApiError::unauthorized("authentication required"))
    }
}

#[derive(Serialize)]
pub struct RegisterOutput { pub user_id: Uuid, pub tenant_id: Uuid, pub role: Role }

#[derive(Serialize)]
pub struct MeOutput { pub user_id: Uuid, pub tenant_id: Uuid, pub email: String, pub name: String, pub role: Role }

impl From<AuthUser> for MeOutput {
    fn from(u: AuthUser) -> Self {
        Self { user_id: u.id, tenant_id: u.tenant_id, email: u.email, name: u.name, role: u.role }
    }
}

#[derive(Serialize)]
pub struct LoginOutput {
    #[serde(flatten)]
    pub user: MeOutput,
    pub token: String,
}

#[utoipa::path(post, path = "/api/v1/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 200, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(
    State(state): State<ServerState>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<RegisterOutput>, JsonApiError> {
    let user = state.auth_service().register(input).await?;
    Ok(Json(RegisterOutput { user_id: user.id, tenant_id: user.tenant_id, role: user.role }))
}

#[utoipa::path(post, path = "/api/v1/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized")))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let session = state.auth_service().login(input).await?;
    let token = session
        .token
        .ok_or_else(|| JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", Some("token generation failed".into())))?;
    let mut cookie = Cookie::new(AUTH_COOKIE, token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(state.auth.cookie_secure);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);
    Ok((jar, Json(LoginOutput { user: session.user.into(), token })))
}

#[utoipa::path(post, path = "/api/v1/auth/logout", tag = "auth", responses((status = 204, description = "Logged Out")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/v1/auth/me", tag = "auth", responses((status = 200, description = "Current user"), (status = 401, description = "Unauthorized")))]
pub async fn me(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<MeOutput>, JsonApiError> {
    let user = state.auth_service().me(actor.user_id).await?;
    Ok(Json(user.into()))
}

fn is_public(method: &Method, path: &str) -> bool {
    method == Method::OPTIONS
        || path == "/health"
        || path == "/metrics"
        || path == "/api/v1/auth/login"
        || path == "/api/v1/auth/register"
        || path.starts_with("/docs")
        || path.starts_with("/api-docs")
}

/// Global middleware: every non-public route needs `Authorization: Bearer <token>`
/// or the `auth_token` cookie. Missing token is 400, invalid or expired is 401.
/// The account is reloaded on every request: disabled or deleted users get 401 and
/// the stored role replaces the one in the token. The caller is inserted into
/// request extensions as an `Actor`.
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    if is_public(req.method(), &path) {
        return Ok(next.run(req).await);
    }

    let token = match req.headers().get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => {
                tracing::warn!(path = %path, "invalid Authorization format (expect Bearer)");
                return Err(JsonApiError::unauthorized("expected a Bearer token"));
            }
        },
        None => match CookieJar::from_headers(req.headers()).get(AUTH_COOKIE) {
            Some(c) if !c.value().is_empty() => c.value().to_string(),
            _ => {
                tracing::warn!(path = %path, "missing Authorization header and auth_token cookie");
                return Err(JsonApiError::bad_request("missing bearer token"));
            }
        },
    };

    let claims = decode_token(&state.auth.jwt_secret, &token).map_err(|e| {
        tracing::warn!(path = %path, err = %e, "token validation failed");
        JsonApiError::unauthorized("invalid or expired token")
    })?;
    let claimed = claims.actor().ok_or_else(|| JsonApiError::unauthorized("malformed token claims"))?;
    let account = state.auth_service().me(claimed.user_id).await?;
    if account.tenant_id != claimed.tenant_id {
        tracing::warn!(path = %path, user_id = %claimed.user_id, "token tenant does not match the account");
        return Err(JsonApiError::unauthorized("invalid or expired token"));
    }
    req.extensions_mut().insert(account.actor());
    Ok(next.run(req).await)
}
