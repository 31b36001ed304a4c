use uuid::Uuid;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument};

use models::{notification::NotificationKind, plan_action, tache};
use crate::{
    errors::ServiceError,
    notification_service,
    plan_action_service::{self, completion_stamp},
    rbac::{self, Actor},
    user_service,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewTache {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTache {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// Tache plus its (visible) plan action.
async fn find_visible<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    id: Uuid,
) -> Result<(tache::Model, plan_action::Model), ServiceError> {
    let t = tache::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("tache"))?;
    let pa = plan_action_service::find_visible(db, actor, t.plan_action_id)
        .await
        .map_err(|_| ServiceError::not_found("tache"))?;
    Ok((t, pa))
}

async fn notify_assignee<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    t: &tache::Model,
) -> Result<(), ServiceError> {
    if let Some(assignee) = t.assignee_id.filter(|a| *a != actor.user_id) {
        let message = format!("You were assigned the task \"{}\"", t.title);
        notification_service::notify(db, actor.tenant_id, assignee, NotificationKind::TacheAssigned, &message, Some(t.id)).await?;
    }
    Ok(())
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn create_tache(
    db: &DatabaseConnection,
    actor: &Actor,
    plan_action_id: Uuid,
    input: NewTache,
) -> Result<tache::Model, ServiceError> {
    let pa = plan_action_service::find_visible(db, actor, plan_action_id).await?;
    if !rbac::can_manage_plan_action(actor, &pa) {
        return Err(ServiceError::forbidden("add taches to this plan action"));
    }
    tache::validate_title(&input.title)?;
    if let Some(a) = input.assignee_id {
        user_service::require_active_member(db, actor.tenant_id, a).await?;
    }

    let txn = db.begin().await?;
    let now = Utc::now().into();
    let created = tache::ActiveModel {
        id: Set(Uuid::new_v4()),
        plan_action_id: Set(pa.id),
        assignee_id: Set(input.assignee_id),
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        progress: Set(0),
        due_date: Set(input.due_date),
        completed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    notify_assignee(&txn, actor, &created).await?;
    plan_action_service::recompute_progress(&txn, pa.id, actor.user_id).await?;
    txn.commit().await?;
    info!(tache_id = %created.id, plan_action_id = %pa.id, "tache_created");
    Ok(created)
}

pub async fn list_taches(
    db: &DatabaseConnection,
    actor: &Actor,
    plan_action_id: Uuid,
) -> Result<Vec<tache::Model>, ServiceError> {
    plan_action_service::find_visible(db, actor, plan_action_id).await?;
    Ok(tache::Entity::find()
        .filter(tache::Column::PlanActionId.eq(plan_action_id))
        .order_by_asc(tache::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn get_tache(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<tache::Model, ServiceError> {
    Ok(find_visible(db, actor, id).await?.0)
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn update_tache(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateTache,
) -> Result<tache::Model, ServiceError> {
    let (current, pa) = find_visible(db, actor, id).await?;
    if !rbac::can_manage_plan_action(actor, &pa) {
        return Err(ServiceError::forbidden("edit this tache"));
    }
    let reassigned = input.assignee_id.filter(|a| current.assignee_id != Some(*a));
    if let Some(a) = reassigned {
        user_service::require_active_member(db, actor.tenant_id, a).await?;
    }

    let txn = db.begin().await?;
    let mut am: tache::ActiveModel = current.into();
    if let Some(title) = input.title.as_deref() {
        tache::validate_title(title)?;
        am.title = Set(title.trim().to_string());
    }
    if let Some(desc) = input.description { am.description = Set(desc); }
    if let Some(due) = input.due_date { am.due_date = Set(Some(due)); }
    if let Some(a) = reassigned { am.assignee_id = Set(Some(a)); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    if reassigned.is_some() {
        notify_assignee(&txn, actor, &updated).await?;
    }
    txn.commit().await?;
    Ok(updated)
}

/// Set tache progress and re-derive the plan action (and possibly the idea) from it.
#[instrument(skip(db), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn set_progress(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    progress: i32,
) -> Result<tache::Model, ServiceError> {
    tache::validate_progress(progress)?;
    let (current, pa) = find_visible(db, actor, id).await?;
    if !rbac::can_update_tache_progress(actor, &current, &pa) {
        return Err(ServiceError::forbidden("update progress of this tache"));
    }

    let txn = db.begin().await?;
    let completed_at = completion_stamp(progress, current.completed_at);
    let mut am: tache::ActiveModel = current.into();
    am.progress = Set(progress);
    am.completed_at = Set(completed_at);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    let parent = plan_action_service::recompute_progress(&txn, pa.id, actor.user_id).await?;
    txn.commit().await?;
    info!(tache_id = %id, progress, plan_action_progress = parent.progress, "tache_progress_set");
    Ok(updated)
}

#[instrument(skip(db), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn delete_tache(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    let (_, pa) = find_visible(db, actor, id).await?;
    if !rbac::can_manage_plan_action(actor, &pa) {
        return Err(ServiceError::forbidden("delete this tache"));
    }
    let txn = db.begin().await?;
    tache::Entity::delete_by_id(id).exec(&txn).await?;
    plan_action_service::recompute_progress(&txn, pa.id, actor.user_id).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idea_service;
    use crate::plan_action_service::{convert_idea, get_plan_action, ConvertIdea};
    use crate::test_support::{approved_idea, fixture, get_db};
    use models::status::StatusKind;

    fn new_tache(title: &str, assignee: Option<Uuid>) -> NewTache {
        NewTache { title: title.into(), description: String::new(), assignee_id: assignee, due_date: None }
    }

    #[tokio::test]
    async fn tache_progress_drives_plan_action_and_idea() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let idea = approved_idea(&db, &f).await;
        let pa = convert_idea(&db, &f.manager, idea.id, ConvertIdea::default()).await?;

        let t1 = create_tache(&db, &f.manager, pa.id, new_tache("Order", Some(f.other_user.user_id))).await?;
        let t2 = create_tache(&db, &f.manager, pa.id, new_tache("Fit", None)).await?;

        // direct progress is refused once taches exist
        assert!(matches!(
            plan_action_service::set_progress(&db, &f.manager, pa.id, 50).await,
            Err(ServiceError::Validation(_))
        ));

        // assignee may update their own tache, not the other one
        set_progress(&db, &f.other_user, t1.id, 50).await?;
        assert!(matches!(set_progress(&db, &f.other_user, t2.id, 10).await, Err(ServiceError::NotFound(_)) | Err(ServiceError::Forbidden(_))));
        assert_eq!(get_plan_action(&db, &f.manager, pa.id).await?.progress, 25);

        set_progress(&db, &f.manager, t2.id, 25).await?;
        assert_eq!(get_plan_action(&db, &f.manager, pa.id).await?.progress, 37);

        set_progress(&db, &f.other_user, t1.id, 100).await?;
        let done = set_progress(&db, &f.manager, t2.id, 100).await?;
        assert!(done.completed_at.is_some());
        let finished = get_plan_action(&db, &f.manager, pa.id).await?;
        assert_eq!(finished.progress, 100);
        assert!(finished.completed_at.is_some());

        let implemented = crate::status_service::first_of_kind(&db, f.tenant_id, StatusKind::Implemented).await?.unwrap();
        assert_eq!(idea_service::get_idea(&db, &f.manager, idea.id).await?.status_id, implemented.id);

        delete_tache(&db, &f.manager, t2.id).await?;
        assert_eq!(get_plan_action(&db, &f.manager, pa.id).await?.progress, 100);
        Ok(())
    }

    #[tokio::test]
    async fn unrelated_users_cannot_touch_taches() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let idea = approved_idea(&db, &f).await;
        let pa = convert_idea(&db, &f.manager, idea.id, ConvertIdea::default()).await?;
        let t = create_tache(&db, &f.manager, pa.id, new_tache("Order", None)).await?;

        assert!(matches!(get_tache(&db, &f.other_user, t.id).await, Err(ServiceError::NotFound(_))));
        // authoring the idea grants no access to its execution
        assert!(matches!(get_tache(&db, &f.user, t.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(set_progress(&db, &f.user, t.id, 10).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(create_tache(&db, &f.user, pa.id, new_tache("x", None)).await, Err(ServiceError::NotFound(_))));

        // an assignee sees the tache but may not restructure the plan action
        let theirs = create_tache(&db, &f.manager, pa.id, new_tache("Check", Some(f.user.user_id))).await?;
        assert!(get_tache(&db, &f.user, theirs.id).await.is_ok());
        assert!(matches!(delete_tache(&db, &f.user, theirs.id).await, Err(ServiceError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_tache_completion_is_not_lost() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let idea = approved_idea(&db, &f).await;
        let pa = convert_idea(&db, &f.manager, idea.id, ConvertIdea::default()).await?;
        let t1 = create_tache(&db, &f.manager, pa.id, new_tache("Left", None)).await?;
        let t2 = create_tache(&db, &f.manager, pa.id, new_tache("Right", None)).await?;

        let (a, b) = tokio::join!(
            set_progress(&db, &f.manager, t1.id, 100),
            set_progress(&db, &f.admin, t2.id, 100),
        );
        a?;
        b?;

        let finished = get_plan_action(&db, &f.manager, pa.id).await?;
        assert_eq!(finished.progress, 100);
        let implemented = crate::status_service::first_of_kind(&db, f.tenant_id, StatusKind::Implemented).await?.unwrap();
        assert_eq!(idea_service::get_idea(&db, &f.manager, idea.id).await?.status_id, implemented.id);
        Ok(())
    }
}
