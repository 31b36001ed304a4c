use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::put,
    Json, Router,
};
use uuid::Uuid;

use models::comment;
use service::comment_service::{self, CommentInput};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

pub fn router() -> Router<ServerState> {
    Router::new().route("/comments/:id", put(update).delete(remove))
}

async fn update(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<CommentInput>,
) -> Result<Json<comment::Model>, JsonApiError> {
    Ok(Json(comment_service::update_comment(&state.db, &actor, id, input).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    comment_service::delete_comment(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
