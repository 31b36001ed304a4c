use uuid::Uuid;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};

use models::user::{self, Role};
use crate::{errors::ServiceError, pagination::{self, Paged, Pagination}, rbac::{self, Actor}};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRole {
    pub role: Option<Role>,
    pub status: Option<String>,
}

/// Live (not soft-deleted) user of a tenant.
pub async fn find_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<user::Model, ServiceError> {
    user::Entity::find_by_id(id)
        .filter(user::Column::TenantId.eq(tenant_id))
        .filter(user::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))
}

/// Owner/assignee candidates must be active members of the tenant.
pub async fn require_active_member<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<user::Model, ServiceError> {
    let u = find_in_tenant(db, tenant_id, id)
        .await
        .map_err(|_| ServiceError::validation(format!("user {id} is not a member of this tenant")))?;
    if !u.is_active() {
        return Err(ServiceError::validation(format!("user {id} is disabled")));
    }
    Ok(u)
}

/// Admins and managers of a tenant; they receive review notifications.
pub async fn reviewers<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
) -> Result<Vec<user::Model>, ServiceError> {
    Ok(user::Entity::find()
        .filter(user::Column::TenantId.eq(tenant_id))
        .filter(user::Column::Role.is_in([Role::Admin.as_str(), Role::Manager.as_str()]))
        .filter(user::Column::Status.eq(user::STATUS_ACTIVE))
        .filter(user::Column::DeletedAt.is_null())
        .all(db)
        .await?)
}

pub async fn list_users(
    db: &DatabaseConnection,
    actor: &Actor,
    opts: Pagination,
) -> Result<Paged<user::Model>, ServiceError> {
    rbac::require_admin(actor, "list users")?;
    let select = user::Entity::find()
        .filter(user::Column::TenantId.eq(actor.tenant_id))
        .filter(user::Column::DeletedAt.is_null())
        .order_by_asc(user::Column::Email);
    pagination::fetch_page(db, select, opts).await
}

pub async fn get_user(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<user::Model, ServiceError> {
    let found = find_in_tenant(db, actor.tenant_id, id).await?;
    if !actor.is_admin() && actor.user_id != id {
        return Err(ServiceError::forbidden("view other users"));
    }
    Ok(found)
}

/// Rename a user; self or admin.
#[instrument(skip(db, name), fields(tenant_id = %actor.tenant_id))]
pub async fn update_user_name(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    name: &str,
) -> Result<user::Model, ServiceError> {
    user::validate_name(name)?;
    let found = find_in_tenant(db, actor.tenant_id, id).await?;
    if !actor.is_admin() && actor.user_id != id {
        return Err(ServiceError::forbidden("edit other users"));
    }
    let mut am: user::ActiveModel = found.into();
    am.name = Set(name.trim().to_string());
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Change role and/or account status. Admins cannot demote or disable themselves.
#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id))]
pub async fn update_role(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateRole,
) -> Result<user::Model, ServiceError> {
    rbac::require_admin(actor, "change roles")?;
    let found = find_in_tenant(db, actor.tenant_id, id).await?;
    if actor.user_id == id {
        if input.role.is_some_and(|r| r != Role::Admin) {
            return Err(ServiceError::validation("admins cannot demote themselves"));
        }
        if input.status.as_deref().is_some_and(|s| s != user::STATUS_ACTIVE) {
            return Err(ServiceError::validation("admins cannot disable themselves"));
        }
    }
    let mut am: user::ActiveModel = found.into();
    if let Some(role) = input.role { am.role = Set(role.as_str().to_string()); }
    if let Some(status) = input.status.as_deref() {
        user::validate_status(status)?;
        am.status = Set(status.to_string());
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(user_id = %updated.id, role = %updated.role, status = %updated.status, "user_role_updated");
    Ok(updated)
}

#[instrument(skip(db), fields(tenant_id = %actor.tenant_id))]
pub async fn soft_delete_user(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    rbac::require_admin(actor, "delete users")?;
    if actor.user_id == id {
        return Err(ServiceError::validation("admins cannot delete themselves"));
    }
    find_in_tenant(db, actor.tenant_id, id).await?;
    user::soft_delete(db, id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, get_db};

    #[tokio::test]
    async fn user_admin_flow() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;

        let page = list_users(&db, &f.admin, Pagination { page: 1, per_page: 2 }).await?;
        assert_eq!(page.total, 4);
        assert_eq!(page.items.len(), 2);
        assert!(matches!(list_users(&db, &f.user, Pagination::default()).await, Err(ServiceError::Forbidden(_))));

        assert!(get_user(&db, &f.user, f.user.user_id).await.is_ok());
        assert!(matches!(get_user(&db, &f.user, f.manager.user_id).await, Err(ServiceError::Forbidden(_))));

        let renamed = update_user_name(&db, &f.user, f.user.user_id, "Renamed").await?;
        assert_eq!(renamed.name, "Renamed");

        let promoted = update_role(&db, &f.admin, f.user.user_id, UpdateRole { role: Some(Role::Manager), status: None }).await?;
        assert_eq!(promoted.role(), Role::Manager);
        let self_demote = update_role(&db, &f.admin, f.admin.user_id, UpdateRole { role: Some(Role::User), status: None }).await;
        assert!(matches!(self_demote, Err(ServiceError::Validation(_))));

        soft_delete_user(&db, &f.admin, f.other_user.user_id).await?;
        assert!(matches!(get_user(&db, &f.admin, f.other_user.user_id).await, Err(ServiceError::NotFound(_))));
        assert!(soft_delete_user(&db, &f.admin, f.admin.user_id).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn users_of_other_tenants_are_not_found() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let a = fixture(&db).await;
        let b = fixture(&db).await;
        assert!(matches!(get_user(&db, &a.admin, b.user.user_id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
