use uuid::Uuid;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use sea_orm::sea_query::Expr;
use serde::Deserialize;
use tracing::debug;

use common::metrics::NOTIFICATIONS_SENT_TOTAL;
use models::notification::{self, NotificationKind};
use crate::{errors::ServiceError, pagination::{self, Paged, Pagination}, rbac::Actor};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

/// Record a notification for one user.
pub async fn notify<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    user_id: Uuid,
    kind: NotificationKind,
    message: &str,
    entity_id: Option<Uuid>,
) -> Result<notification::Model, ServiceError> {
    let created = notification::create(db, tenant_id, user_id, kind, message, entity_id).await?;
    NOTIFICATIONS_SENT_TOTAL.with_label_values(&[kind.as_str()]).inc();
    debug!(notification_id = %created.id, user_id = %user_id, kind = kind.as_str(), "notification_created");
    Ok(created)
}

/// Notify several users, skipping `except` (usually the actor).
pub async fn notify_all<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    user_ids: impl IntoIterator<Item = Uuid>,
    except: Uuid,
    kind: NotificationKind,
    message: &str,
    entity_id: Option<Uuid>,
) -> Result<usize, ServiceError> {
    let mut sent = 0;
    for uid in user_ids.into_iter().filter(|u| *u != except) {
        notify(db, tenant_id, uid, kind, message, entity_id).await?;
        sent += 1;
    }
    Ok(sent)
}

async fn find_own(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<notification::Model, ServiceError> {
    notification::Entity::find_by_id(id)
        .filter(notification::Column::UserId.eq(actor.user_id))
        .filter(notification::Column::TenantId.eq(actor.tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("notification"))
}

pub async fn list_notifications(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: NotificationFilter,
    opts: Pagination,
) -> Result<Paged<notification::Model>, ServiceError> {
    let mut select = notification::Entity::find()
        .filter(notification::Column::UserId.eq(actor.user_id))
        .filter(notification::Column::TenantId.eq(actor.tenant_id));
    if filter.unread_only {
        select = select.filter(notification::Column::ReadAt.is_null());
    }
    pagination::fetch_page(db, select.order_by_desc(notification::Column::CreatedAt), opts).await
}

pub async fn unread_count(db: &DatabaseConnection, actor: &Actor) -> Result<u64, ServiceError> {
    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(actor.user_id))
        .filter(notification::Column::TenantId.eq(actor.tenant_id))
        .filter(notification::Column::ReadAt.is_null())
        .count(db)
        .await?)
}

/// Mark one notification read; reading it twice keeps the first timestamp.
pub async fn mark_read(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<notification::Model, ServiceError> {
    let found = find_own(db, actor, id).await?;
    if found.read_at.is_some() { return Ok(found); }
    let mut am: notification::ActiveModel = found.into();
    am.read_at = Set(Some(Utc::now().into()));
    Ok(am.update(db).await?)
}

pub async fn mark_all_read(db: &DatabaseConnection, actor: &Actor) -> Result<u64, ServiceError> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let res = notification::Entity::update_many()
        .col_expr(notification::Column::ReadAt, Expr::value(now))
        .filter(notification::Column::UserId.eq(actor.user_id))
        .filter(notification::Column::TenantId.eq(actor.tenant_id))
        .filter(notification::Column::ReadAt.is_null())
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

pub async fn delete_notification(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    find_own(db, actor, id).await?;
    notification::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, get_db};

    #[tokio::test]
    async fn inbox_lifecycle() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;

        let sent = notify_all(
            &db,
            f.tenant_id,
            [f.user.user_id, f.manager.user_id],
            f.manager.user_id,
            NotificationKind::CommentAdded,
            "new comment",
            None,
        ).await?;
        assert_eq!(sent, 1);
        let second = notify(&db, f.tenant_id, f.user.user_id, NotificationKind::IdeaStatusChanged, "moved", None).await?;

        assert_eq!(unread_count(&db, &f.user).await?, 2);
        mark_read(&db, &f.user, second.id).await?;
        let unread = list_notifications(&db, &f.user, NotificationFilter { unread_only: true }, Pagination::default()).await?;
        assert_eq!(unread.total, 1);

        assert!(matches!(mark_read(&db, &f.other_user, second.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(delete_notification(&db, &f.other_user, second.id).await, Err(ServiceError::NotFound(_))));

        assert_eq!(mark_all_read(&db, &f.user).await?, 1);
        assert_eq!(unread_count(&db, &f.user).await?, 0);
        delete_notification(&db, &f.user, second.id).await?;
        let all = list_notifications(&db, &f.user, NotificationFilter::default(), Pagination::default()).await?;
        assert_eq!(all.total, 1);
        Ok(())
    }
}
