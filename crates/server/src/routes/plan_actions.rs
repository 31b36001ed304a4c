use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use models::{plan_action, tache};
use service::{
    pagination::{Paged, Pagination},
    plan_action_service::{self, PlanActionFilter, UpdatePlanAction},
    tache_service::{self, NewTache},
};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

/// Body of the progress endpoints.
#[derive(Debug, Deserialize)]
pub struct ProgressInput { pub progress: i32 }

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/plan-actions", get(list))
        .route("/plan-actions/:id", get(get_one).put(update).delete(remove))
        .route("/plan-actions/:id/progress", put(set_progress))
        .route("/plan-actions/:id/taches", get(list_taches).post(create_tache))
}

async fn list(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<PlanActionFilter>,
    Query(page): Query<Pagination>,
) -> Result<Json<Paged<plan_action::Model>>, JsonApiError> {
    Ok(Json(plan_action_service::list_plan_actions(&state.db, &actor, filter, page).await?))
}

async fn get_one(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<plan_action::Model>, JsonApiError> {
    Ok(Json(plan_action_service::get_plan_action(&state.db, &actor, id).await?))
}

async fn update(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePlanAction>,
) -> Result<Json<plan_action::Model>, JsonApiError> {
    Ok(Json(plan_action_service::update_plan_action(&state.db, &actor, id, input).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    plan_action_service::delete_plan_action(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_progress(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<ProgressInput>,
) -> Result<Json<plan_action::Model>, JsonApiError> {
    Ok(Json(plan_action_service::set_progress(&state.db, &actor, id, input.progress).await?))
}

async fn list_taches(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<tache::Model>>, JsonApiError> {
    Ok(Json(tache_service::list_taches(&state.db, &actor, id).await?))
}

async fn create_tache(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<NewTache>,
) -> Result<(StatusCode, Json<tache::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(tache_service::create_tache(&state.db, &actor, id, input).await?)))
}
