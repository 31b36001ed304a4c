use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use models::notification;
use service::{
    notification_service::{self, NotificationFilter},
    pagination::{Paged, Pagination},
};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/notifications", get(list))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(read_all))
        .route("/notifications/:id", delete(remove))
        .route("/notifications/:id/read", post(read))
}

/// Own notifications, newest first.
async fn list(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<NotificationFilter>,
    Query(page): Query<Pagination>,
) -> Result<Json<Paged<notification::Model>>, JsonApiError> {
    Ok(Json(notification_service::list_notifications(&state.db, &actor, filter, page).await?))
}

async fn unread_count(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Value>, JsonApiError> {
    let count = notification_service::unread_count(&state.db, &actor).await?;
    Ok(Json(json!({ "count": count })))
}

async fn read(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<notification::Model>, JsonApiError> {
    Ok(Json(notification_service::mark_read(&state.db, &actor, id).await?))
}

async fn read_all(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Value>, JsonApiError> {
    let updated = notification_service::mark_all_read(&state.db, &actor).await?;
    Ok(Json(json!({ "updated": updated })))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    notification_service::delete_notification(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
