//! Plan actions: the execution side of an approved idea.
//!
//! Progress is either set directly (no taches) or derived from the taches. When
//! every plan action of an idea reaches 100 the idea is moved to the tenant's
//! `implemented` status.

use uuid::Uuid;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::Query;
use serde::Deserialize;
use tracing::{info, instrument};

use models::{idea, notification::NotificationKind, plan_action, status::StatusKind, tache};
use crate::{
    errors::ServiceError,
    idea_service, notification_service,
    pagination::{self, Paged, Pagination},
    rbac::{self, Actor},
    status_service, user_service,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertIdea {
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanAction {
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PlanActionFilter {
    pub idea_id: Option<Uuid>,
}

/// Integer mean of tache progress, rounded down. `None` without taches.
pub fn derived_progress(progress: &[i32]) -> Option<i32> {
    if progress.is_empty() {
        return None;
    }
    let sum: i64 = progress.iter().map(|p| *p as i64).sum();
    Some((sum / progress.len() as i64) as i32)
}

/// `completed_at` after a progress change: stamped on reaching 100, cleared below.
pub(crate) fn completion_stamp(
    progress: i32,
    previous: Option<sea_orm::prelude::DateTimeWithTimeZone>,
) -> Option<sea_orm::prelude::DateTimeWithTimeZone> {
    if progress >= 100 {
        previous.or_else(|| Some(Utc::now().into()))
    } else {
        None
    }
}

pub async fn find_in_tenant<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<plan_action::Model, ServiceError> {
    plan_action::Entity::find_by_id(id)
        .filter(plan_action::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("plan action"))
}

/// Plain users see only plan actions they own or hold a tache in.
fn visibility(actor: &Actor) -> Condition {
    if actor.is_reviewer() {
        return Condition::all();
    }
    Condition::any()
        .add(plan_action::Column::OwnerId.eq(actor.user_id))
        .add(plan_action::Column::Id.in_subquery(
            Query::select()
                .column(tache::Column::PlanActionId)
                .from(tache::Entity)
                .and_where(tache::Column::AssigneeId.eq(actor.user_id))
                .to_owned(),
        ))
}

pub async fn find_visible<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    id: Uuid,
) -> Result<plan_action::Model, ServiceError> {
    plan_action::Entity::find_by_id(id)
        .filter(plan_action::Column::TenantId.eq(actor.tenant_id))
        .filter(visibility(actor))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("plan action"))
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn convert_idea(
    db: &DatabaseConnection,
    actor: &Actor,
    idea_id: Uuid,
    input: ConvertIdea,
) -> Result<plan_action::Model, ServiceError> {
    rbac::require_reviewer(actor, "convert ideas")?;
    let source = idea_service::find_visible(db, actor, idea_id).await?;
    let status = status_service::find_in_tenant(db, actor.tenant_id, source.status_id).await?;
    if status.kind() != StatusKind::Approved {
        return Err(ServiceError::validation(format!(
            "only approved ideas can be converted (idea is '{}')",
            status.name
        )));
    }
    let title = input.title.unwrap_or_else(|| source.title.clone());
    plan_action::validate_title(&title)?;
    if let Some(owner) = input.owner_id {
        user_service::require_active_member(db, actor.tenant_id, owner).await?;
    }

    let txn = db.begin().await?;
    let now = Utc::now().into();
    let created = plan_action::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(actor.tenant_id),
        idea_id: Set(source.id),
        owner_id: Set(input.owner_id),
        title: Set(title.trim().to_string()),
        description: Set(input.description.unwrap_or_else(|| source.description.clone())),
        progress: Set(0),
        due_date: Set(input.due_date),
        completed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    if let Some(owner) = input.owner_id.filter(|o| *o != actor.user_id) {
        let message = format!("You own the plan action \"{}\"", created.title);
        notification_service::notify(&txn, actor.tenant_id, owner, NotificationKind::PlanActionAssigned, &message, Some(created.id)).await?;
    }
    txn.commit().await?;
    info!(plan_action_id = %created.id, idea_id = %idea_id, "idea_converted");
    Ok(created)
}

pub async fn list_plan_actions(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: PlanActionFilter,
    opts: Pagination,
) -> Result<Paged<plan_action::Model>, ServiceError> {
    let mut select = plan_action::Entity::find()
        .filter(plan_action::Column::TenantId.eq(actor.tenant_id))
        .filter(visibility(actor));
    if let Some(idea_id) = filter.idea_id {
        select = select.filter(plan_action::Column::IdeaId.eq(idea_id));
    }
    pagination::fetch_page(db, select.order_by_asc(plan_action::Column::CreatedAt), opts).await
}

/// Plan actions of one idea; the idea itself must be visible.
pub async fn list_for_idea(
    db: &DatabaseConnection,
    actor: &Actor,
    idea_id: Uuid,
) -> Result<Vec<plan_action::Model>, ServiceError> {
    idea_service::find_visible(db, actor, idea_id).await?;
    Ok(plan_action::Entity::find()
        .filter(plan_action::Column::TenantId.eq(actor.tenant_id))
        .filter(plan_action::Column::IdeaId.eq(idea_id))
        .filter(visibility(actor))
        .order_by_asc(plan_action::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn get_plan_action(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<plan_action::Model, ServiceError> {
    find_visible(db, actor, id).await
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn update_plan_action(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdatePlanAction,
) -> Result<plan_action::Model, ServiceError> {
    let current = find_visible(db, actor, id).await?;
    if !rbac::can_manage_plan_action(actor, &current) {
        return Err(ServiceError::forbidden("manage this plan action"));
    }
    let reassigned = input.owner_id.filter(|o| current.owner_id != Some(*o));
    if let Some(owner) = reassigned {
        if !actor.is_reviewer() {
            return Err(ServiceError::forbidden("reassign plan actions"));
        }
        user_service::require_active_member(db, actor.tenant_id, owner).await?;
    }

    let txn = db.begin().await?;
    let mut am: plan_action::ActiveModel = current.into();
    if let Some(title) = input.title.as_deref() {
        plan_action::validate_title(title)?;
        am.title = Set(title.trim().to_string());
    }
    if let Some(desc) = input.description {
        am.description = Set(desc);
    }
    if let Some(due) = input.due_date {
        am.due_date = Set(Some(due));
    }
    if let Some(owner) = reassigned {
        am.owner_id = Set(Some(owner));
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await?;
    if let Some(owner) = reassigned.filter(|o| *o != actor.user_id) {
        let message = format!("You own the plan action \"{}\"", updated.title);
        notification_service::notify(&txn, updated.tenant_id, owner, NotificationKind::PlanActionAssigned, &message, Some(updated.id)).await?;
    }
    txn.commit().await?;
    Ok(updated)
}

#[instrument(skip(db), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn delete_plan_action(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    rbac::require_reviewer(actor, "delete plan actions")?;
    find_in_tenant(db, actor.tenant_id, id).await?;
    plan_action::Entity::delete_by_id(id).exec(db).await?;
    info!(plan_action_id = %id, "plan_action_deleted");
    Ok(())
}

/// Set progress directly; only allowed while the plan action has no taches.
#[instrument(skip(db), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn set_progress(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    progress: i32,
) -> Result<plan_action::Model, ServiceError> {
    plan_action::validate_progress(progress)?;
    let visible = find_visible(db, actor, id).await?;
    if !rbac::can_manage_plan_action(actor, &visible) {
        return Err(ServiceError::forbidden("update progress of this plan action"));
    }

    let txn = db.begin().await?;
    let current = lock_plan_action(&txn, id).await?;
    let taches = tache::Entity::find().filter(tache::Column::PlanActionId.eq(id)).count(&txn).await?;
    if taches > 0 {
        return Err(ServiceError::validation("progress is derived from taches; update the taches instead"));
    }
    let updated = store_progress(&txn, current, progress).await?;
    cascade_completion(&txn, updated.idea_id, actor.user_id).await?;
    txn.commit().await?;
    info!(plan_action_id = %id, progress, "plan_action_progress_set");
    Ok(updated)
}

/// `SELECT ... FOR UPDATE` on the plan action; progress writers serialize on this row.
async fn lock_plan_action<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<plan_action::Model, ServiceError> {
    plan_action::Entity::find_by_id(id)
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("plan action"))
}

async fn store_progress<C: ConnectionTrait>(
    db: &C,
    current: plan_action::Model,
    progress: i32,
) -> Result<plan_action::Model, ServiceError> {
    let completed_at = completion_stamp(progress, current.completed_at);
    let mut am: plan_action::ActiveModel = current.into();
    am.progress = Set(progress);
    am.completed_at = Set(completed_at);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

/// Re-derive progress from the taches, then run the completion cascade.
/// Without taches the stored progress is left alone. Must run inside the
/// transaction that changed the taches: the plan action row is locked before
/// the taches are read.
pub async fn recompute_progress<C: ConnectionTrait>(
    db: &C,
    plan_action_id: Uuid,
    actor_id: Uuid,
) -> Result<plan_action::Model, ServiceError> {
    let current = lock_plan_action(db, plan_action_id).await?;
    let progress: Vec<i32> = tache::Entity::find()
        .filter(tache::Column::PlanActionId.eq(plan_action_id))
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.progress)
        .collect();
    let Some(derived) = derived_progress(&progress) else { return Ok(current) };
    let updated = if derived != current.progress {
        store_progress(db, current, derived).await?
    } else {
        current
    };
    cascade_completion(db, updated.idea_id, actor_id).await?;
    Ok(updated)
}

/// Move the idea to `implemented` once all of its plan actions are complete.
/// Returns whether the idea moved. The idea row is locked first so that plan
/// actions finishing concurrently see each other's progress.
pub async fn cascade_completion<C: ConnectionTrait>(
    db: &C,
    idea_id: Uuid,
    actor_id: Uuid,
) -> Result<bool, ServiceError> {
    let Some(source) = idea::Entity::find_by_id(idea_id).lock_exclusive().one(db).await? else {
        return Ok(false);
    };
    let actions = plan_action::Entity::find()
        .filter(plan_action::Column::IdeaId.eq(idea_id))
        .all(db)
        .await?;
    if actions.is_empty() || actions.iter().any(|a| a.progress < 100) {
        return Ok(false);
    }
    let Some(target) = status_service::first_of_kind(db, source.tenant_id, StatusKind::Implemented).await? else {
        return Ok(false);
    };
    let current = status_service::find_in_tenant(db, source.tenant_id, source.status_id).await?;
    if current.kind() == StatusKind::Implemented {
        return Ok(false);
    }
    idea_service::apply_transition(
        db,
        source,
        &target,
        actor_id,
        NotificationKind::IdeaImplemented,
        Some("all plan actions are complete"),
    )
    .await?;
    Ok(true)
}
