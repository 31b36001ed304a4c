//! Form models, their variants and fields, plus a dry-run validation endpoint.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use models::{form_field, form_model, form_variant};
use service::forms::definitions::{
    self, NewFieldInput, NewForm, NewVariant, UpdateFieldInput, UpdateForm, UpdateVariant,
};

use super::auth::{CurrentActor, ServerState};
use crate::errors::JsonApiError;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/forms", get(list_forms).post(create_form))
        .route("/forms/:id", get(get_form).put(update_form).delete(delete_form))
        .route("/forms/:id/variants", get(list_variants).post(create_variant))
        .route("/variants/:id", get(get_variant).put(update_variant).delete(delete_variant))
        .route("/variants/:id/fields", get(list_fields).post(create_field))
        .route("/variants/:id/validate", post(validate))
        .route("/fields/:id", put(update_field).delete(delete_field))
}

async fn list_forms(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<form_model::Model>>, JsonApiError> {
    Ok(Json(definitions::list_forms(&state.db, &actor).await?))
}

async fn create_form(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<NewForm>,
) -> Result<(StatusCode, Json<form_model::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(definitions::create_form(&state.db, &actor, input).await?)))
}

async fn get_form(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<form_model::Model>, JsonApiError> {
    Ok(Json(definitions::get_form(&state.db, &actor, id).await?))
}

async fn update_form(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateForm>,
) -> Result<Json<form_model::Model>, JsonApiError> {
    Ok(Json(definitions::update_form(&state.db, &actor, id, input).await?))
}

async fn delete_form(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    definitions::delete_form(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_variants(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(form_id): Path<Uuid>,
) -> Result<Json<Vec<form_variant::Model>>, JsonApiError> {
    Ok(Json(definitions::list_variants(&state.db, &actor, form_id).await?))
}

async fn create_variant(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(form_id): Path<Uuid>,
    Json(input): Json<NewVariant>,
) -> Result<(StatusCode, Json<form_variant::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(definitions::create_variant(&state.db, &actor, form_id, input).await?)))
}

async fn get_variant(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<form_variant::Model>, JsonApiError> {
    Ok(Json(definitions::get_variant(&state.db, &actor, id).await?))
}

async fn update_variant(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateVariant>,
) -> Result<Json<form_variant::Model>, JsonApiError> {
    Ok(Json(definitions::update_variant(&state.db, &actor, id, input).await?))
}

async fn delete_variant(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    definitions::delete_variant(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_fields(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(variant_id): Path<Uuid>,
) -> Result<Json<Vec<form_field::Model>>, JsonApiError> {
    Ok(Json(definitions::list_fields(&state.db, &actor, variant_id).await?))
}

async fn create_field(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(variant_id): Path<Uuid>,
    Json(input): Json<NewFieldInput>,
) -> Result<(StatusCode, Json<form_field::Model>), JsonApiError> {
    Ok((StatusCode::CREATED, Json(definitions::create_field(&state.db, &actor, variant_id, input).await?)))
}

async fn update_field(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateFieldInput>,
) -> Result<Json<form_field::Model>, JsonApiError> {
    Ok(Json(definitions::update_field(&state.db, &actor, id, input).await?))
}

async fn delete_field(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    definitions::delete_field(&state.db, &actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate a submission against a variant without storing anything.
async fn validate(
    State(state): State<ServerState>,
    CurrentActor(actor): CurrentActor,
    Path(variant_id): Path<Uuid>,
    Json(values): Json<Value>,
) -> Result<Json<Value>, JsonApiError> {
    let data = definitions::validate_for_variant(&state.db, &actor, variant_id, &values).await?;
    Ok(Json(json!({ "valid": true, "data": data })))
}
