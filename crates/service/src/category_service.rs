use uuid::Uuid;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{info, instrument};

use models::{category, idea};
use crate::{errors::ServiceError, rbac::{self, Actor}};

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

pub async fn find_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<category::Model, ServiceError> {
    category::Entity::find_by_id(id)
        .filter(category::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("category"))
}

/// Ideas may only be filed under active categories of their tenant.
pub async fn require_active<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<category::Model, ServiceError> {
    let c = find_in_tenant(db, tenant_id, id)
        .await
        .map_err(|_| ServiceError::validation(format!("unknown category {id}")))?;
    if !c.active {
        return Err(ServiceError::validation(format!("category '{}' is inactive", c.name)));
    }
    Ok(c)
}

pub async fn list_categories(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<category::Model>, ServiceError> {
    Ok(category::Entity::find()
        .filter(category::Column::TenantId.eq(actor.tenant_id))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?)
}

pub async fn get_category(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<category::Model, ServiceError> {
    find_in_tenant(db, actor.tenant_id, id).await
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id))]
pub async fn create_category(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewCategory,
) -> Result<category::Model, ServiceError> {
    rbac::require_admin(actor, "manage categories")?;
    let created = category::create(db, actor.tenant_id, &input.name, input.description.as_deref()).await?;
    info!(category_id = %created.id, "category_created");
    Ok(created)
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id))]
pub async fn update_category(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateCategory,
) -> Result<category::Model, ServiceError> {
    rbac::require_admin(actor, "manage categories")?;
    let mut am: category::ActiveModel = find_in_tenant(db, actor.tenant_id, id).await?.into();
    if let Some(name) = input.name.as_deref() {
        category::validate_name(name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(desc) = input.description {
        am.description = Set(Some(desc));
    }
    if let Some(active) = input.active {
        am.active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Delete a category; ideas filed under it block the delete (deactivate instead).
#[instrument(skip(db), fields(tenant_id = %actor.tenant_id))]
pub async fn delete_category(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    rbac::require_admin(actor, "manage categories")?;
    find_in_tenant(db, actor.tenant_id, id).await?;
    let used = idea::Entity::find().filter(idea::Column::CategoryId.eq(id)).count(db).await?;
    if used > 0 {
        return Err(ServiceError::Conflict(format!("category is used by {used} idea(s)")));
    }
    category::Entity::delete_by_id(id).exec(db).await?;
    info!(category_id = %id, "category_deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, get_db};

    #[tokio::test]
    async fn category_crud_and_permissions() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;

        let input = NewCategory { name: "Energy".into(), description: Some("Savings".into()) };
        assert!(matches!(create_category(&db, &f.user, input.clone()).await, Err(ServiceError::Forbidden(_))));
        let c = create_category(&db, &f.admin, input.clone()).await?;

        let dup = create_category(&db, &f.admin, input).await.unwrap_err();
        assert!(matches!(dup, ServiceError::Model(models::errors::ModelError::Conflict(_))));

        assert_eq!(list_categories(&db, &f.user).await?.len(), 1);
        let off = update_category(&db, &f.admin, c.id, UpdateCategory { active: Some(false), ..Default::default() }).await?;
        assert!(!off.active);
        assert!(matches!(require_active(&db, f.tenant_id, c.id).await, Err(ServiceError::Validation(_))));

        delete_category(&db, &f.admin, c.id).await?;
        assert!(matches!(get_category(&db, &f.admin, c.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
    #[tokio::test]
    async fn category_in_use_cannot_be_deleted() -> Result<(), anyhow::Error> {
        use crate::idea_service::{self, NewIdea, UpdateIdea};

        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let c = create_category(&db, &f.admin, NewCategory { name: "Facilities".into(), description: None }).await?;
        let idea = idea_service::create_idea(&db, &f.user, NewIdea {
            title: "More plants".into(),
            description: String::new(),
            category_id: Some(c.id),
            form_variant_id: None,
            form_data: serde_json::Value::Null,
        }).await?;

        let err = delete_category(&db, &f.admin, c.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m.contains("used by 1 idea")));

        // once detached the category can be removed
        let detached = idea_service::update_idea(&db, &f.user, idea.id, UpdateIdea { clear_category: true, ..Default::default() }).await?;
        assert_eq!(detached.category_id, None);
        delete_category(&db, &f.admin, c.id).await?;
        Ok(())
    }
}
