use uuid::Uuid;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};

use models::{comment, notification::NotificationKind};
use crate::{errors::ServiceError, idea_service, notification_service, rbac::Actor};

#[derive(Debug, Clone, Deserialize)]
pub struct CommentInput {
    pub body: String,
}

async fn find_visible(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<comment::Model, ServiceError> {
    let found = comment::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("comment"))?;
    idea_service::find_visible(db, actor, found.idea_id)
        .await
        .map_err(|_| ServiceError::not_found("comment"))?;
    Ok(found)
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn add_comment(
    db: &DatabaseConnection,
    actor: &Actor,
    idea_id: Uuid,
    input: CommentInput,
) -> Result<comment::Model, ServiceError> {
    comment::validate_body(&input.body)?;
    let idea = idea_service::find_visible(db, actor, idea_id).await?;

    let txn = db.begin().await?;
    let now = Utc::now().into();
    let created = comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        idea_id: Set(idea.id),
        author_id: Set(actor.user_id),
        body: Set(input.body.trim().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    if idea.author_id != actor.user_id {
        let message = format!("New comment on your idea \"{}\"", idea.title);
        notification_service::notify(&txn, idea.tenant_id, idea.author_id, NotificationKind::CommentAdded, &message, Some(idea.id)).await?;
    }
    txn.commit().await?;
    info!(comment_id = %created.id, idea_id = %idea_id, "comment_added");
    Ok(created)
}

/// Comments of a visible idea, oldest first.
pub async fn list_comments(
    db: &DatabaseConnection,
    actor: &Actor,
    idea_id: Uuid,
) -> Result<Vec<comment::Model>, ServiceError> {
    idea_service::find_visible(db, actor, idea_id).await?;
    Ok(comment::Entity::find()
        .filter(comment::Column::IdeaId.eq(idea_id))
        .order_by_asc(comment::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn update_comment(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: CommentInput,
) -> Result<comment::Model, ServiceError> {
    comment::validate_body(&input.body)?;
    let found = find_visible(db, actor, id).await?;
    if found.author_id != actor.user_id {
        return Err(ServiceError::forbidden("edit comments of others"));
    }
    let mut am: comment::ActiveModel = found.into();
    am.body = Set(input.body.trim().to_string());
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn delete_comment(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    let found = find_visible(db, actor, id).await?;
    if found.author_id != actor.user_id && !actor.is_admin() {
        return Err(ServiceError::forbidden("delete comments of others"));
    }
    comment::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}
