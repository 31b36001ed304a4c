use uuid::Uuid;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use serde::Deserialize;
use tracing::{info, instrument};

use models::status::{self, StatusKind};
use models::idea;
use crate::{errors::ServiceError, rbac::{self, Actor}};

/// Statuses every new tenant starts with, in workflow order.
pub const DEFAULT_STATUSES: [(&str, StatusKind, &str); 5] = [
    ("Submitted", StatusKind::Pending, "#9e9e9e"),
    ("In review", StatusKind::InReview, "#2196f3"),
    ("Approved", StatusKind::Approved, "#4caf50"),
    ("Rejected", StatusKind::Rejected, "#f44336"),
    ("Implemented", StatusKind::Implemented, "#673ab7"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct NewStatus {
    pub name: String,
    pub kind: StatusKind,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStatus {
    pub name: Option<String>,
    pub kind: Option<StatusKind>,
    pub position: Option<i32>,
    pub is_default: Option<bool>,
    pub color: Option<String>,
}

/// Insert the default workflow for a freshly created tenant.
pub async fn bootstrap_defaults<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
) -> Result<Vec<status::Model>, ServiceError> {
    let mut out = Vec::with_capacity(DEFAULT_STATUSES.len());
    for (pos, (name, kind, color)) in DEFAULT_STATUSES.iter().enumerate() {
        let is_default = pos == 0;
        out.push(status::create(db, tenant_id, name, *kind, pos as i32, is_default, Some(color)).await?);
    }
    Ok(out)
}

/// Status of the actor's tenant, or not found.
pub async fn find_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<status::Model, ServiceError> {
    status::Entity::find_by_id(id)
        .filter(status::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("status"))
}

pub async fn default_status<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
) -> Result<Option<status::Model>, ServiceError> {
    Ok(status::Entity::find()
        .filter(status::Column::TenantId.eq(tenant_id))
        .filter(status::Column::IsDefault.eq(true))
        .one(db)
        .await?)
}

/// Lowest-positioned status of a kind.
pub async fn first_of_kind<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    kind: StatusKind,
) -> Result<Option<status::Model>, ServiceError> {
    Ok(status::Entity::find()
        .filter(status::Column::TenantId.eq(tenant_id))
        .filter(status::Column::Kind.eq(kind.as_str()))
        .order_by_asc(status::Column::Position)
        .one(db)
        .await?)
}

pub async fn list_statuses(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<status::Model>, ServiceError> {
    Ok(status::Entity::find()
        .filter(status::Column::TenantId.eq(actor.tenant_id))
        .order_by_asc(status::Column::Position)
        .order_by_asc(status::Column::Name)
        .all(db)
        .await?)
}

pub async fn get_status(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<status::Model, ServiceError> {
    find_in_tenant(db, actor.tenant_id, id).await
}

async fn clear_default<C: ConnectionTrait>(db: &C, tenant_id: Uuid) -> Result<(), ServiceError> {
    status::Entity::update_many()
        .col_expr(status::Column::IsDefault, Expr::value(false))
        .filter(status::Column::TenantId.eq(tenant_id))
        .filter(status::Column::IsDefault.eq(true))
        .exec(db)
        .await?;
    Ok(())
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id))]
pub async fn create_status(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewStatus,
) -> Result<status::Model, ServiceError> {
    rbac::require_admin(actor, "manage statuses")?;
    status::validate_default(input.kind, input.is_default)?;
    let txn = db.begin().await?;
    if input.is_default {
        clear_default(&txn, actor.tenant_id).await?;
    }
    let created = status::create(
        &txn,
        actor.tenant_id,
        &input.name,
        input.kind,
        input.position,
        input.is_default,
        input.color.as_deref(),
    )
    .await?;
    txn.commit().await?;
    info!(status_id = %created.id, kind = %input.kind, "status_created");
    Ok(created)
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id))]
pub async fn update_status(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateStatus,
) -> Result<status::Model, ServiceError> {
    rbac::require_admin(actor, "manage statuses")?;
    let txn = db.begin().await?;
    let current = find_in_tenant(&txn, actor.tenant_id, id).await?;
    let kind = input.kind.unwrap_or(current.kind());
    let is_default = input.is_default.unwrap_or(current.is_default);
    if current.is_default && !is_default {
        return Err(ServiceError::validation(
            "a tenant needs a default status; mark another status as default instead",
        ));
    }
    status::validate_default(kind, is_default)?;

    let mut am: status::ActiveModel = current.clone().into();
    if let Some(name) = input.name.as_deref() {
        status::validate_name(name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(color) = input.color.as_deref() {
        status::validate_color(color)?;
        am.color = Set(Some(color.to_string()));
    }
    if let Some(position) = input.position {
        am.position = Set(position);
    }
    am.kind = Set(kind.as_str().to_string());
    if is_default && !current.is_default {
        clear_default(&txn, actor.tenant_id).await?;
    }
    am.is_default = Set(is_default);
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    info!(status_id = %updated.id, "status_updated");
    Ok(updated)
}

#[instrument(skip(db), fields(tenant_id = %actor.tenant_id))]
pub async fn delete_status(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    rbac::require_admin(actor, "manage statuses")?;
    let current = find_in_tenant(db, actor.tenant_id, id).await?;
    if current.is_default {
        return Err(ServiceError::Conflict("the default status cannot be deleted".into()));
    }
    let in_use = idea::Entity::find()
        .filter(idea::Column::StatusId.eq(id))
        .count(db)
        .await?;
    if in_use > 0 {
        return Err(ServiceError::Conflict(format!("status is used by {in_use} idea(s)")));
    }
    status::Entity::delete_by_id(id).exec(db).await?;
    info!(status_id = %id, "status_deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, get_db};

    #[test]
    fn default_workflow_has_one_pending_default() {
        assert_eq!(DEFAULT_STATUSES[0].1, StatusKind::Pending);
        assert_eq!(DEFAULT_STATUSES.iter().filter(|s| s.1 == StatusKind::Implemented).count(), 1);
    }

    #[tokio::test]
    async fn switching_default_keeps_exactly_one() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;

        let statuses = list_statuses(&db, &f.admin).await?;
        assert_eq!(statuses.len(), DEFAULT_STATUSES.len());
        assert_eq!(statuses.iter().filter(|s| s.is_default).count(), 1);

        let triage = create_status(&db, &f.admin, NewStatus {
            name: "Triage".into(),
            kind: StatusKind::Pending,
            position: 10,
            is_default: true,
            color: None,
        }).await?;
        let after = list_statuses(&db, &f.admin).await?;
        let defaults: Vec<_> = after.iter().filter(|s| s.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, triage.id);

        let err = update_status(&db, &f.admin, triage.id, UpdateStatus { is_default: Some(false), ..Default::default() }).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn non_admins_cannot_write_and_default_cannot_be_deleted() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let input = NewStatus { name: "X".into(), kind: StatusKind::InReview, position: 9, is_default: false, color: None };
        assert!(matches!(create_status(&db, &f.manager, input).await, Err(ServiceError::Forbidden(_))));

        let default = default_status(&db, f.tenant_id).await?.expect("bootstrapped default");
        assert!(matches!(delete_status(&db, &f.admin, default.id).await, Err(ServiceError::Conflict(_))));

        let dup = NewStatus { name: "Approved".into(), kind: StatusKind::Approved, position: 9, is_default: false, color: None };
        assert!(matches!(create_status(&db, &f.admin, dup).await, Err(ServiceError::Model(models::errors::ModelError::Conflict(_)))));
        Ok(())
    }
    #[tokio::test]
    async fn status_in_use_cannot_be_deleted() -> Result<(), anyhow::Error> {
        use crate::idea_service::{self, ChangeStatus, NewIdea};

        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let idea = idea_service::create_idea(&db, &f.user, NewIdea {
            title: "Standing desks".into(),
            description: String::new(),
            category_id: None,
            form_variant_id: None,
            form_data: serde_json::Value::Null,
        }).await?;
        let in_review = first_of_kind(&db, f.tenant_id, StatusKind::InReview).await?.unwrap();
        idea_service::change_status(&db, &f.manager, idea.id, ChangeStatus { status_id: in_review.id, note: None }).await?;

        let err = delete_status(&db, &f.admin, in_review.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m.contains("used by 1 idea")));
        assert!(get_status(&db, &f.admin, in_review.id).await.is_ok());

        // an unused status goes away
        let rejected = first_of_kind(&db, f.tenant_id, StatusKind::Rejected).await?.unwrap();
        delete_status(&db, &f.admin, rejected.id).await?;
        assert!(matches!(get_status(&db, &f.admin, rejected.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
