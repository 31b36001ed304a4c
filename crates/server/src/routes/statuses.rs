use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use models::status;
use service::status_service::{self, NewStatus, UpdateStatus};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/statuses", get(list).post(create))
        .route("/statuses/:id", get(get_one).put(update).delete(remove))
}

async fn list(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<status::Model>>, JsonApiError> {
    Ok(Json(status_service::list_statuses(&state.db, &actor).await?))
}

async fn create(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewStatus>,
) -> Result<(StatusCode, Json<status::Model>), JsonApiError> {
    let created = status_service::create_status(&state.db, &actor, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_one(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<status::Model>, JsonApiError> {
    Ok(Json(status_service::get_status(&state.db, &actor, id).await?))
}

async fn update(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStatus>,
) -> Result<Json<status::Model>, JsonApiError> {
    Ok(Json(status_service::update_status(&state.db, &actor, id, input).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    status_service::delete_status(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
