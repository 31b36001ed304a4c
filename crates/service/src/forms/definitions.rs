//! Form models, their variants and the fields of each variant.

use uuid::Uuid;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};

use models::{form_field::{self, FieldType}, form_model, form_variant};
use crate::{category_service, errors::ServiceError, rbac::{self, Actor}};

use super::engine::{self, FieldSpec};

#[derive(Debug, Clone, Deserialize)]
pub struct NewForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub name: String,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVariant {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    /// Unbind the variant from its category.
    #[serde(default)]
    pub clear_category: bool,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFieldInput {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub options: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFieldInput {
    pub label: Option<String>,
    pub required: Option<bool>,
    pub position: Option<i32>,
    pub options: Option<Vec<String>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Drop the lower bound. Ignored when `min` is set.
    #[serde(default)]
    pub clear_min: bool,
    /// Drop the upper bound. Ignored when `max` is set.
    #[serde(default)]
    pub clear_max: bool,
}

/// Bound after an update: a new value wins, then an explicit clear, then the stored one.
fn next_bound(new: Option<f64>, clear: bool, current: Option<f64>) -> Option<f64> {
    match new {
        Some(v) => Some(v),
        None if clear => None,
        None => current,
    }
}

// ---- form models ----

pub async fn find_form_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<form_model::Model, ServiceError> {
    form_model::Entity::find_by_id(id)
        .filter(form_model::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("form"))
}

pub async fn list_forms(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<form_model::Model>, ServiceError> {
    Ok(form_model::Entity::find()
        .filter(form_model::Column::TenantId.eq(actor.tenant_id))
        .order_by_asc(form_model::Column::Name)
        .all(db)
        .await?)
}

pub async fn get_form(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<form_model::Model, ServiceError> {
    find_form_in_tenant(db, actor.tenant_id, id).await
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id))]
pub async fn create_form(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewForm,
) -> Result<form_model::Model, ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    let created = form_model::create(db, actor.tenant_id, &input.name, input.description.as_deref()).await?;
    info!(form_id = %created.id, "form_created");
    Ok(created)
}

pub async fn update_form(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateForm,
) -> Result<form_model::Model, ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    let mut am: form_model::ActiveModel = find_form_in_tenant(db, actor.tenant_id, id).await?.into();
    if let Some(name) = input.name.as_deref() {
        form_model::validate_name(name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(desc) = input.description { am.description = Set(Some(desc)); }
    if let Some(active) = input.active { am.active = Set(active); }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Variants and fields go with the form; ideas keep their data but lose the variant link.
pub async fn delete_form(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    find_form_in_tenant(db, actor.tenant_id, id).await?;
    form_model::Entity::delete_by_id(id).exec(db).await?;
    info!(form_id = %id, "form_deleted");
    Ok(())
}

// ---- variants ----

/// Variant plus its form model, scoped to a tenant.
pub async fn find_variant_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<(form_variant::Model, form_model::Model), ServiceError> {
    match form_variant::Entity::find_by_id(id)
        .find_also_related(form_model::Entity)
        .filter(form_model::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?
    {
        Some((v, Some(m))) => Ok((v, m)),
        _ => Err(ServiceError::not_found("form variant")),
    }
}

async fn clear_default_variant<C: ConnectionTrait>(
    db: &C,
    form_model_id: Uuid,
) -> Result<(), ServiceError> {
    form_variant::Entity::update_many()
        .col_expr(form_variant::Column::IsDefault, Expr::value(false))
        .filter(form_variant::Column::FormModelId.eq(form_model_id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn list_variants(
    db: &DatabaseConnection,
    actor: &Actor,
    form_id: Uuid,
) -> Result<Vec<form_variant::Model>, ServiceError> {
    find_form_in_tenant(db, actor.tenant_id, form_id).await?;
    Ok(form_variant::Entity::find()
        .filter(form_variant::Column::FormModelId.eq(form_id))
        .order_by_asc(form_variant::Column::Name)
        .all(db)
        .await?)
}

pub async fn get_variant(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<form_variant::Model, ServiceError> {
    Ok(find_variant_in_tenant(db, actor.tenant_id, id).await?.0)
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id))]
pub async fn create_variant(
    db: &DatabaseConnection,
    actor: &Actor,
    form_id: Uuid,
    input: NewVariant,
) -> Result<form_variant::Model, ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    find_form_in_tenant(db, actor.tenant_id, form_id).await?;
    if let Some(cid) = input.category_id {
        category_service::find_in_tenant(db, actor.tenant_id, cid).await?;
    }
    let txn = db.begin().await?;
    if input.is_default {
        clear_default_variant(&txn, form_id).await?;
    }
    let created = form_variant::create(&txn, form_id, &input.name, input.category_id, input.is_default).await?;
    txn.commit().await?;
    info!(variant_id = %created.id, form_id = %form_id, "form_variant_created");
    Ok(created)
}

pub async fn update_variant(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateVariant,
) -> Result<form_variant::Model, ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    let (variant, _) = find_variant_in_tenant(db, actor.tenant_id, id).await?;
    if let Some(cid) = input.category_id {
        category_service::find_in_tenant(db, actor.tenant_id, cid).await?;
    }
    let txn = db.begin().await?;
    let form_model_id = variant.form_model_id;
    let mut am: form_variant::ActiveModel = variant.into();
    if let Some(name) = input.name.as_deref() {
        form_variant::validate_name(name)?;
        am.name = Set(name.trim().to_string());
    }
    if input.clear_category {
        am.category_id = Set(None);
    } else if let Some(cid) = input.category_id {
        am.category_id = Set(Some(cid));
    }
    if let Some(is_default) = input.is_default {
        if is_default { clear_default_variant(&txn, form_model_id).await?; }
        am.is_default = Set(is_default);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

pub async fn delete_variant(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    find_variant_in_tenant(db, actor.tenant_id, id).await?;
    form_variant::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Pick the variant an idea submission is validated against.
///
/// An explicit variant wins and must belong to an active form of the tenant.
/// Otherwise the variant bound to the category is used (the default one first),
/// and without either there is no form to fill.
pub async fn resolve_variant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    category_id: Option<Uuid>,
    explicit_variant_id: Option<Uuid>,
) -> Result<Option<form_variant::Model>, ServiceError> {
    if let Some(id) = explicit_variant_id {
        let (variant, model) = find_variant_in_tenant(db, tenant_id, id)
            .await
            .map_err(|_| ServiceError::validation(format!("unknown form variant {id}")))?;
        if !model.active {
            return Err(ServiceError::validation(format!("form '{}' is inactive", model.name)));
        }
        return Ok(Some(variant));
    }
    let Some(cid) = category_id else { return Ok(None) };
    let found = form_variant::Entity::find()
        .find_also_related(form_model::Entity)
        .filter(form_model::Column::TenantId.eq(tenant_id))
        .filter(form_model::Column::Active.eq(true))
        .filter(form_variant::Column::CategoryId.eq(cid))
        .order_by_desc(form_variant::Column::IsDefault)
        .order_by_asc(form_variant::Column::CreatedAt)
        .one(db)
        .await?;
    Ok(found.map(|(v, _)| v))
}

// ---- fields ----

async fn find_field_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<form_field::Model, ServiceError> {
    let field = form_field::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("form field"))?;
    find_variant_in_tenant(db, tenant_id, field.variant_id)
        .await
        .map_err(|_| ServiceError::not_found("form field"))?;
    Ok(field)
}

pub async fn list_fields(
    db: &DatabaseConnection,
    actor: &Actor,
    variant_id: Uuid,
) -> Result<Vec<form_field::Model>, ServiceError> {
    find_variant_in_tenant(db, actor.tenant_id, variant_id).await?;
    fields_of(db, variant_id).await
}

async fn fields_of<C: ConnectionTrait>(
    db: &C,
    variant_id: Uuid,
) -> Result<Vec<form_field::Model>, ServiceError> {
    Ok(form_field::Entity::find()
        .filter(form_field::Column::VariantId.eq(variant_id))
        .order_by_asc(form_field::Column::Position)
        .order_by_asc(form_field::Column::Key)
        .all(db)
        .await?)
}

/// Validator view of a variant's fields, in display order.
pub async fn field_specs<C: ConnectionTrait>(
    db: &C,
    variant_id: Uuid,
) -> Result<Vec<FieldSpec>, ServiceError> {
    let fields = fields_of(db, variant_id).await?;
    let mut specs = Vec::with_capacity(fields.len());
    for f in &fields {
        specs.push(FieldSpec::try_from(f)?);
    }
    Ok(specs)
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, key = %input.key))]
pub async fn create_field(
    db: &DatabaseConnection,
    actor: &Actor,
    variant_id: Uuid,
    input: NewFieldInput,
) -> Result<form_field::Model, ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    find_variant_in_tenant(db, actor.tenant_id, variant_id).await?;
    let created = form_field::create(db, variant_id, form_field::NewField {
        key: &input.key,
        label: &input.label,
        field_type: input.field_type,
        required: input.required,
        position: input.position,
        options: input.options,
        min: input.min,
        max: input.max,
    })
    .await?;
    info!(field_id = %created.id, variant_id = %variant_id, "form_field_created");
    Ok(created)
}

/// Key and type are fixed once created; stored submissions reference them.
pub async fn update_field(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateFieldInput,
) -> Result<form_field::Model, ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    let field = find_field_in_tenant(db, actor.tenant_id, id).await?;
    let field_type = field.field_type()?;
    let options = input.options.clone().unwrap_or_else(|| field.option_values());
    let min = next_bound(input.min, input.clear_min, field.min);
    let max = next_bound(input.max, input.clear_max, field.max);
    form_field::validate_definition(field_type, &options, min, max)?;

    let mut am: form_field::ActiveModel = field.into();
    if let Some(label) = input.label.as_deref() {
        form_field::validate_label(label)?;
        am.label = Set(label.trim().to_string());
    }
    if let Some(required) = input.required {
        am.required = Set(required);
    }
    if let Some(position) = input.position {
        am.position = Set(position);
    }
    if field_type.has_options() {
        am.options = Set(Some(serde_json::json!(options)));
    }
    am.min = Set(min);
    am.max = Set(max);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn delete_field(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    rbac::require_admin(actor, "manage forms")?;
    find_field_in_tenant(db, actor.tenant_id, id).await?;
    form_field::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Dry-run a submission against a variant without storing anything.
pub async fn validate_for_variant(
    db: &DatabaseConnection,
    actor: &Actor,
    variant_id: Uuid,
    values: &Value,
) -> Result<Map<String, Value>, ServiceError> {
    find_variant_in_tenant(db, actor.tenant_id, variant_id).await?;
    let specs = field_specs(db, variant_id).await?;
    engine::validate_submission(&specs, values).map_err(ServiceError::Fields)
}
