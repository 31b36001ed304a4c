use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::{metrics, types::Health};

use crate::openapi::ApiDoc;

pub mod auth;
pub mod categories;
pub mod comments;
pub mod files;
pub mod forms;
pub mod ideas;
pub mod notifications;
pub mod plan_actions;
pub mod statuses;
pub mod taches;
pub mod users;

use auth::ServerState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_text() -> impl IntoResponse {
    metrics::encode_metrics()
}

/// Count and time every request for `/metrics`.
async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_owned();
    let started = Instant::now();
    let resp = next.run(req).await;
    metrics::observe_request(&method, resp.status().as_u16(), started.elapsed().as_secs_f64());
    resp
}

fn api_v1() -> Router<ServerState> {
    let auth_routes = Router::new()
        .route("/auth/register", axum::routing::post(auth::register))
        .route("/auth/login", axum::routing::post(auth::login))
        .route("/auth/logout", axum::routing::post(auth::logout))
        .route("/auth/me", get(auth::me));

    auth_routes
        .merge(users::router())
        .merge(categories::router())
        .merge(statuses::router())
        .merge(forms::router())
        .merge(ideas::router())
        .merge(plan_actions::router())
        .merge(taches::router())
        .merge(comments::router())
        .merge(files::router())
        .merge(notifications::router())
}

/// Build the full application router: public probes, docs and the authenticated `/api/v1` tree.
pub fn build_router(cors: CorsLayer, state: ServerState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text));

    public
        .nest("/api/v1", api_v1())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token_state))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
