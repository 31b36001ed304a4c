use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use models::user;
use service::{pagination::{Paged, Pagination}, user_service::{self, UpdateRole}};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

#[derive(Debug, Deserialize)]
pub struct RenameInput { pub name: String }

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/users", get(list))
        .route("/users/:id", get(get_one).patch(rename).delete(remove))
        .route("/users/:id/role", put(set_role))
}

async fn list(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Query(page): Query<Pagination>,
) -> Result<Json<Paged<user::Model>>, JsonApiError> {
    Ok(Json(user_service::list_users(&state.db, &actor, page).await?))
}

async fn get_one(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<user::Model>, JsonApiError> {
    Ok(Json(user_service::get_user(&state.db, &actor, id).await?))
}

async fn rename(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<RenameInput>,
) -> Result<Json<user::Model>, JsonApiError> {
    Ok(Json(user_service::update_user_name(&state.db, &actor, id, &input.name).await?))
}

async fn set_role(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateRole>,
) -> Result<Json<user::Model>, JsonApiError> {
    Ok(Json(user_service::update_role(&state.db, &actor, id, input).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    user_service::soft_delete_user(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
