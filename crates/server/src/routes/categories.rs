use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use models::category;
use service::category_service::{self, NewCategory, UpdateCategory};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/:id", get(get_one).put(update).delete(remove))
}

async fn list(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<category::Model>>, JsonApiError> {
    Ok(Json(category_service::list_categories(&state.db, &actor).await?))
}

async fn create(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewCategory>,
) -> Result<(StatusCode, Json<category::Model>), JsonApiError> {
    let created = category_service::create_category(&state.db, &actor, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_one(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<category::Model>, JsonApiError> {
    Ok(Json(category_service::get_category(&state.db, &actor, id).await?))
}

async fn update(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategory>,
) -> Result<Json<category::Model>, JsonApiError> {
    Ok(Json(category_service::update_category(&state.db, &actor, id, input).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    category_service::delete_category(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
