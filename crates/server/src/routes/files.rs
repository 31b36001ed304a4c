//! File metadata by id. Registration lives under `/ideas/:id/files`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use models::file_metadata;
use service::file_service;

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

pub fn router() -> Router<ServerState> {
    Router::new().route("/files/:id", get(get_one).delete(remove))
}

async fn get_one(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<file_metadata::Model>, JsonApiError> {
    Ok(Json(file_service::get_file(&state.db, &actor, id).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    file_service::delete_file(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
