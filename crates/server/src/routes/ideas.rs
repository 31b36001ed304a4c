use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use models::{comment, file_metadata, idea, plan_action};
use service::{
    comment_service::{self, CommentInput},
    file_service::{self, NewFile},
    idea_service::{self, ChangeStatus, IdeaFilter, NewIdea, UpdateIdea},
    pagination::{Paged, Pagination},
    plan_action_service::{self, ConvertIdea},
};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

/// Query string of `GET /ideas`: pagination plus filters.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct IdeaListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// Case-insensitive title substring
    pub q: Option<String>,
}

impl IdeaListQuery {
    fn split(self) -> (IdeaFilter, Pagination) {
        let defaults = Pagination::default();
        let page = Pagination { page: self.page.unwrap_or(defaults.page), per_page: self.per_page.unwrap_or(defaults.per_page) };
        let filter = IdeaFilter { status_id: self.status_id, category_id: self.category_id, author_id: self.author_id, q: self.q };
        (filter, page)
    }
}

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/ideas", get(list).post(create))
        .route("/ideas/:id", get(get_one).put(update).delete(remove))
        .route("/ideas/:id/status", post(change_status))
        .route("/ideas/:id/convert", post(convert))
        .route("/ideas/:id/plan-actions", get(plan_actions))
        .route("/ideas/:id/comments", get(list_comments).post(add_comment))
        .route("/ideas/:id/files", get(list_files).post(register_file))
}

#[utoipa::path(get, path = "/api/v1/ideas", tag = "ideas", params(IdeaListQuery), responses((status = 200, description = "Page of ideas")))]
pub async fn list(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Query(q): Query<IdeaListQuery>,
) -> Result<Json<Paged<idea::Model>>, JsonApiError> {
    let (filter, page) = q.split();
    Ok(Json(idea_service::list_ideas(&state.db, &actor, filter, page).await?))
}

#[utoipa::path(post, path = "/api/v1/ideas", tag = "ideas", request_body = crate::openapi::NewIdeaRequest, responses((status = 201, description = "Created"), (status = 400, description = "Validation Error")))]
pub async fn create(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewIdea>,
) -> Result<(StatusCode, Json<idea::Model>), JsonApiError> {
    let created = idea_service::create_idea(&state.db, &actor, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(get, path = "/api/v1/ideas/{id}", tag = "ideas", params(("id" = Uuid, Path, description = "Idea ID")), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get_one(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<idea::Model>, JsonApiError> {
    Ok(Json(idea_service::get_idea(&state.db, &actor, id).await?))
}

async fn update(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateIdea>,
) -> Result<Json<idea::Model>, JsonApiError> {
    Ok(Json(idea_service::update_idea(&state.db, &actor, id, input).await?))
}

async fn remove(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    idea_service::delete_idea(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/api/v1/ideas/{id}/status", tag = "ideas", params(("id" = Uuid, Path, description = "Idea ID")), request_body = crate::openapi::ChangeStatusRequest, responses((status = 200, description = "Moved"), (status = 400, description = "Validation Error"), (status = 403, description = "Forbidden")))]
pub async fn change_status(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<ChangeStatus>,
) -> Result<Json<idea::Model>, JsonApiError> {
    Ok(Json(idea_service::change_status(&state.db, &actor, id, input).await?))
}

async fn convert(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<ConvertIdea>,
) -> Result<(StatusCode, Json<plan_action::Model>), JsonApiError> {
    let created = plan_action_service::convert_idea(&state.db, &actor, id, input).await?;
    info!(idea_id = %id, plan_action_id = %created.id, "idea converted via api");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn plan_actions(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<plan_action::Model>>, JsonApiError> {
    Ok(Json(plan_action_service::list_for_idea(&state.db, &actor, id).await?))
}

async fn list_comments(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<comment::Model>>, JsonApiError> {
    Ok(Json(comment_service::list_comments(&state.db, &actor, id).await?))
}

async fn add_comment(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<CommentInput>,
) -> Result<(StatusCode, Json<comment::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(comment_service::add_comment(&state.db, &actor, id, input).await?)))
}

async fn list_files(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<file_metadata::Model>>, JsonApiError> {
    Ok(Json(file_service::list_files(&state.db, &actor, id).await?))
}

async fn register_file(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<NewFile>,
) -> Result<(StatusCode, Json<file_metadata::Model>), JsonApiError> {
    let created = file_service::register_file(&state.db, &state.uploads, &actor, Some(id), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults_to_first_page() {
        let (filter, page) = IdeaListQuery { q: Some("led".into()), ..Default::default() }.split();
        assert_eq!(filter.q.as_deref(), Some("led"));
        assert_eq!((page.page, page.per_page), (1, 20));
    }
}
