use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use models::tache;
use service::tache_service::{self, UpdateTache};

use super::auth::{CurrentActor, ServerState};
use super::plan_actions::ProgressInput;
use crate::errors::JsonApiError;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/taches/:id", get(get_one).put(update).delete(remove))
        .route("/taches/:id/progress", put(set_progress))
}

async fn get_one(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<tache::Model>, JsonApiError> {
    Ok(Json(tache_service::get_tache(&state.db, &actor, id).await?))
}

async fn update(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTache>,
) -> Result<Json<tache::Model>, JsonApiError> {
    Ok(Json(tache_service::update_tache(&state.db, &actor, id, input).await?))
}

async fn set_progress(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<ProgressInput>,
) -> Result<Json<tache::Model>, JsonApiError> {
    Ok(Json(tache_service::set_progress(&state.db, &actor, id, input.progress).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    tache_service::delete_tache(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
