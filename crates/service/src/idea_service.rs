//! Idea submission and review workflow.

use uuid::Uuid;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sea_orm::sea_query::{Expr, Func};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use common::metrics::{IDEAS_CREATED_TOTAL, STATUS_TRANSITIONS_TOTAL};
use models::{idea, notification::NotificationKind, status};
use crate::{
    category_service,
    errors::ServiceError,
    forms::{self, definitions::field_specs},
    notification_service,
    pagination::{self, Paged, Pagination},
    rbac::{self, Actor},
    status_service, user_service,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewIdea {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub form_variant_id: Option<Uuid>,
    #[serde(default)]
    pub form_data: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIdea {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    /// Detach the idea from its category. Ignored when `category_id` is set.
    #[serde(default)]
    pub clear_category: bool,
    pub form_data: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdeaFilter {
    pub status_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// Case-insensitive title substring.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatus {
    pub status_id: Uuid,
    #[serde(default)]
    pub note: Option<String>,
}

/// Validate `data` against the variant, or require it to be empty when no form applies.
async fn checked_form_data<C: ConnectionTrait>(
    db: &C,
    variant_id: Option<Uuid>,
    data: &Value,
) -> Result<Value, ServiceError> {
    match variant_id {
        Some(vid) => {
            let specs = field_specs(db, vid).await?;
            let normalized = forms::validate_submission(&specs, data).map_err(ServiceError::Fields)?;
            Ok(Value::Object(normalized))
        }
        None => match data {
            Value::Null => Ok(Value::Object(Default::default())),
            Value::Object(m) if m.is_empty() => Ok(data.clone()),
            _ => Err(ServiceError::validation("form_data given but no form applies to this idea")),
        },
    }
}

/// Idea of the actor's tenant that the actor may see; anything else is "not found".
pub async fn find_visible<C: ConnectionTrait>(
    db: &C,
    actor: &Actor,
    id: Uuid,
) -> Result<idea::Model, ServiceError> {
    let found = idea::Entity::find_by_id(id)
        .filter(idea::Column::TenantId.eq(actor.tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("idea"))?;
    if !rbac::can_view_idea(actor, &found) {
        return Err(ServiceError::not_found("idea"));
    }
    Ok(found)
}

async fn status_of<C: ConnectionTrait>(
    db: &C,
    idea: &idea::Model,
) -> Result<status::Model, ServiceError> {
    status_service::find_in_tenant(db, idea.tenant_id, idea.status_id).await
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn create_idea(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewIdea,
) -> Result<idea::Model, ServiceError> {
    idea::validate_title(&input.title)?;
    idea::validate_description(&input.description)?;
    if let Some(cid) = input.category_id {
        category_service::require_active(db, actor.tenant_id, cid).await?;
    }
    let variant = forms::resolve_variant(db, actor.tenant_id, input.category_id, input.form_variant_id).await?;
    let variant_id = variant.map(|v| v.id);
    let form_data = checked_form_data(db, variant_id, &input.form_data).await?;
    let initial = status_service::default_status(db, actor.tenant_id)
        .await?
        .ok_or_else(|| ServiceError::Conflict("tenant has no default status".into()))?;

    let txn = db.begin().await?;
    let now = Utc::now().into();
    let created = idea::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(actor.tenant_id),
        author_id: Set(actor.user_id),
        category_id: Set(input.category_id),
        status_id: Set(initial.id),
        form_variant_id: Set(variant_id),
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        form_data: Set(form_data),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    let reviewers = user_service::reviewers(&txn, actor.tenant_id).await?;
    let message = format!("New idea submitted: {}", created.title);
    notification_service::notify_all(
        &txn,
        actor.tenant_id,
        reviewers.iter().map(|u| u.id).collect::<Vec<_>>(),
        actor.user_id,
        NotificationKind::IdeaSubmitted,
        &message,
        Some(created.id),
    )
    .await?;
    txn.commit().await?;

    IDEAS_CREATED_TOTAL.inc();
    info!(idea_id = %created.id, status_id = %initial.id, variant_id = ?variant_id, "idea_created");
    Ok(created)
}

pub async fn list_ideas(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: IdeaFilter,
    opts: Pagination,
) -> Result<Paged<idea::Model>, ServiceError> {
    let mut select = idea::Entity::find().filter(idea::Column::TenantId.eq(actor.tenant_id));
    if let Some(sid) = filter.status_id {
        select = select.filter(idea::Column::StatusId.eq(sid));
    }
    if let Some(cid) = filter.category_id {
        select = select.filter(idea::Column::CategoryId.eq(cid));
    }
    if let Some(author) = rbac::idea_author_scope(actor, filter.author_id) {
        select = select.filter(idea::Column::AuthorId.eq(author));
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        select = select.filter(Expr::expr(Func::lower(Expr::col(idea::Column::Title))).like(pattern));
    }
    pagination::fetch_page(db, select.order_by_desc(idea::Column::CreatedAt), opts).await
}

pub async fn get_idea(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<idea::Model, ServiceError> {
    find_visible(db, actor, id).await
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn update_idea(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateIdea,
) -> Result<idea::Model, ServiceError> {
    let current = find_visible(db, actor, id).await?;
    let kind = status_of(db, &current).await?.kind();
    if !rbac::can_edit_idea(actor, &current, kind) {
        return Err(ServiceError::forbidden("edit this idea"));
    }

    let next_category = match input.category_id {
        Some(c) => Some(c),
        None if input.clear_category => None,
        None => current.category_id,
    };
    let category_changed = next_category != current.category_id;
    if let Some(cid) = next_category.filter(|_| category_changed) {
        category_service::require_active(db, actor.tenant_id, cid).await?;
    }
    let variant_id = if category_changed {
        forms::resolve_variant(db, actor.tenant_id, next_category, None).await?.map(|v| v.id)
    } else {
        current.form_variant_id
    };
    let no_answers = Value::Null;
    let form_data = if category_changed || input.form_data.is_some() {
        let data = match (&input.form_data, variant_id) {
            (Some(data), _) => data,
            // the old answers cannot apply once no form is left
            (None, None) => &no_answers,
            (None, Some(_)) => &current.form_data,
        };
        Some(checked_form_data(db, variant_id, data).await?)
    } else {
        None
    };

    let mut am: idea::ActiveModel = current.into();
    if let Some(title) = input.title.as_deref() {
        idea::validate_title(title)?;
        am.title = Set(title.trim().to_string());
    }
    if let Some(desc) = input.description {
        idea::validate_description(&desc)?;
        am.description = Set(desc);
    }
    if category_changed {
        am.category_id = Set(next_category);
        am.form_variant_id = Set(variant_id);
    }
    if let Some(data) = form_data {
        am.form_data = Set(data);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(idea_id = %updated.id, "idea_updated");
    Ok(updated)
}

#[instrument(skip(db), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn delete_idea(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    let current = find_visible(db, actor, id).await?;
    let kind = status_of(db, &current).await?.kind();
    if !rbac::can_delete_idea(actor, &current, kind) {
        return Err(ServiceError::forbidden("delete this idea"));
    }
    idea::Entity::delete_by_id(id).exec(db).await?;
    info!(idea_id = %id, "idea_deleted");
    Ok(())
}

/// Move an idea to `target` and send `notice` to its author, unless the author caused the move.
pub(crate) async fn apply_transition<C: ConnectionTrait>(
    db: &C,
    idea: idea::Model,
    target: &status::Model,
    actor_id: Uuid,
    notice: NotificationKind,
    note: Option<&str>,
) -> Result<idea::Model, ServiceError> {
    let author_id = idea.author_id;
    let mut am: idea::ActiveModel = idea.into();
    am.status_id = Set(target.id);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;

    let kind = target.kind();
    if author_id != actor_id {
        let mut message = format!("Your idea \"{}\" is now {}", updated.title, target.name);
        if let Some(n) = note.map(str::trim).filter(|n| !n.is_empty()) {
            message.push_str(": ");
            message.push_str(n);
        }
        notification_service::notify(db, updated.tenant_id, author_id, notice, &message, Some(updated.id)).await?;
    }
    STATUS_TRANSITIONS_TOTAL.with_label_values(&[kind.as_str()]).inc();
    info!(idea_id = %updated.id, status_id = %target.id, kind = %kind, "idea_status_changed");
    Ok(updated)
}

#[instrument(skip(db, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn change_status(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: ChangeStatus,
) -> Result<idea::Model, ServiceError> {
    let current = find_visible(db, actor, id).await?;
    let from = status_of(db, &current).await?;
    if !rbac::can_change_status(actor, from.kind()) {
        return Err(ServiceError::forbidden("change the status of this idea"));
    }
    let target = status_service::find_in_tenant(db, actor.tenant_id, input.status_id)
        .await
        .map_err(|_| ServiceError::validation(format!("unknown status {}", input.status_id)))?;
    if target.id == from.id {
        return Err(ServiceError::validation(format!("idea is already in status '{}'", from.name)));
    }
    let txn = db.begin().await?;
    let updated = apply_transition(
        &txn,
        current,
        &target,
        actor.user_id,
        NotificationKind::IdeaStatusChanged,
        input.note.as_deref(),
    )
    .await?;
    txn.commit().await?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification_service::{self, NotificationFilter};
    use crate::test_support::{fixture, get_db};
    use models::status::StatusKind;
    use serde_json::json;

    fn new_idea(title: &str) -> NewIdea {
        NewIdea { title: title.into(), description: "desc".into(), category_id: None, form_variant_id: None, form_data: Value::Null }
    }

    #[tokio::test]
    async fn submission_visibility_and_review() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;

        let mine = create_idea(&db, &f.user, new_idea("Solar panels on roof")).await?;
        let theirs = create_idea(&db, &f.other_user, new_idea("Bike sheds")).await?;
        let pending = status_service::default_status(&db, f.tenant_id).await?.unwrap();
        assert_eq!(mine.status_id, pending.id);

        // reviewers were told about the submission
        assert!(notification_service::unread_count(&db, &f.manager).await? >= 2);

        let own_list = list_ideas(&db, &f.user, IdeaFilter::default(), Pagination::default()).await?;
        assert_eq!(own_list.total, 1);
        let forced = list_ideas(&db, &f.user, IdeaFilter { author_id: Some(f.other_user.user_id), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(forced.total, 1);
        assert_eq!(forced.items[0].id, mine.id);

        let all = list_ideas(&db, &f.manager, IdeaFilter::default(), Pagination::default()).await?;
        assert_eq!(all.total, 2);
        let searched = list_ideas(&db, &f.manager, IdeaFilter { q: Some("SOLAR".into()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(searched.total, 1);

        assert!(matches!(get_idea(&db, &f.user, theirs.id).await, Err(ServiceError::NotFound(_))));

        let edited = update_idea(&db, &f.user, mine.id, UpdateIdea { title: Some("Solar panels".into()), ..Default::default() }).await?;
        assert_eq!(edited.title, "Solar panels");

        let in_review = status_service::first_of_kind(&db, f.tenant_id, StatusKind::InReview).await?.unwrap();
        assert!(matches!(
            change_status(&db, &f.user, mine.id, ChangeStatus { status_id: in_review.id, note: None }).await,
            Err(ServiceError::Forbidden(_))
        ));
        let moved = change_status(&db, &f.manager, mine.id, ChangeStatus { status_id: in_review.id, note: Some("looking".into()) }).await?;
        assert_eq!(moved.status_id, in_review.id);
        assert!(matches!(
            change_status(&db, &f.manager, mine.id, ChangeStatus { status_id: in_review.id, note: None }).await,
            Err(ServiceError::Validation(_))
        ));

        let inbox = notification_service::list_notifications(&db, &f.user, NotificationFilter { unread_only: true }, Pagination::default()).await?;
        assert!(inbox.items.iter().any(|n| n.kind == "idea_status_changed" && n.message.ends_with(": looking")));

        // author can no longer edit or delete once review started
        assert!(matches!(
            update_idea(&db, &f.user, mine.id, UpdateIdea { title: Some("x".into()), ..Default::default() }).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(delete_idea(&db, &f.user, mine.id).await, Err(ServiceError::Forbidden(_))));
        delete_idea(&db, &f.other_user, theirs.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn reopening_a_final_idea_requires_admin() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let idea = create_idea(&db, &f.user, new_idea("Four-day week")).await?;
        let rejected = status_service::first_of_kind(&db, f.tenant_id, StatusKind::Rejected).await?.unwrap();
        let pending = status_service::default_status(&db, f.tenant_id).await?.unwrap();
        change_status(&db, &f.manager, idea.id, ChangeStatus { status_id: rejected.id, note: None }).await?;
        assert!(matches!(
            change_status(&db, &f.manager, idea.id, ChangeStatus { status_id: pending.id, note: None }).await,
            Err(ServiceError::Forbidden(_))
        ));
        change_status(&db, &f.admin, idea.id, ChangeStatus { status_id: pending.id, note: None }).await?;
        Ok(())
    }

    #[tokio::test]
    async fn manual_move_to_implemented_is_a_plain_status_change() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let idea = create_idea(&db, &f.user, new_idea("Recycling bins")).await?;
        let implemented = status_service::first_of_kind(&db, f.tenant_id, StatusKind::Implemented).await?.unwrap();
        change_status(&db, &f.manager, idea.id, ChangeStatus { status_id: implemented.id, note: None }).await?;

        let inbox = notification_service::list_notifications(&db, &f.user, NotificationFilter::default(), Pagination::default()).await?;
        let kinds: Vec<&str> = inbox.items.iter().map(|n| n.kind.as_str()).collect();
        assert_eq!(kinds, vec!["idea_status_changed"]);
        Ok(())
    }

    #[tokio::test]
    async fn clearing_the_category_drops_its_form() -> Result<(), anyhow::Error> {
        use crate::category_service::{self, NewCategory};
        use crate::forms::definitions::{create_field, create_form, create_variant, NewFieldInput, NewForm, NewVariant};
        use models::form_field::FieldType;

        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let cat = category_service::create_category(&db, &f.admin, NewCategory { name: "Travel".into(), description: None }).await?;
        let form = create_form(&db, &f.admin, NewForm { name: "Travel form".into(), description: None }).await?;
        let variant = create_variant(&db, &f.admin, form.id, NewVariant { name: "Trips".into(), category_id: Some(cat.id), is_default: true }).await?;
        create_field(&db, &f.admin, variant.id, NewFieldInput {
            key: "trips".into(),
            label: "Trips per year".into(),
            field_type: FieldType::Integer,
            required: true,
            position: 0,
            options: vec![],
            min: Some(0.0),
            max: None,
        }).await?;
        let idea = create_idea(&db, &f.user, NewIdea {
            category_id: Some(cat.id),
            form_data: json!({"trips": 4}),
            ..new_idea("Fewer flights")
        }).await?;
        assert_eq!(idea.form_variant_id, Some(variant.id));

        let cleared = update_idea(&db, &f.user, idea.id, UpdateIdea { clear_category: true, ..Default::default() }).await?;
        assert_eq!(cleared.category_id, None);
        assert_eq!(cleared.form_variant_id, None);
        assert_eq!(cleared.form_data, json!({}));

        // an explicit category wins over the clear flag
        let back = update_idea(&db, &f.user, idea.id, UpdateIdea {
            category_id: Some(cat.id),
            clear_category: true,
            form_data: Some(json!({"trips": 2})),
            ..Default::default()
        }).await?;
        assert_eq!(back.category_id, Some(cat.id));
        assert_eq!(back.form_data, json!({"trips": 2}));
        Ok(())
    }

    #[tokio::test]
    async fn form_data_is_validated_against_category_variant() -> Result<(), anyhow::Error> {
        use crate::category_service::NewCategory;
        use crate::forms::definitions::{create_field, create_form, create_variant, NewFieldInput, NewForm, NewVariant};
        use models::form_field::FieldType;

        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let cat = category_service::create_category(&db, &f.admin, NewCategory { name: "Cost".into(), description: None }).await?;
        let form = create_form(&db, &f.admin, NewForm { name: "Cost form".into(), description: None }).await?;
        let variant = create_variant(&db, &f.admin, form.id, NewVariant { name: "Cost".into(), category_id: Some(cat.id), is_default: true }).await?;
        create_field(&db, &f.admin, variant.id, NewFieldInput {
            key: "savings".into(),
            label: "Yearly savings".into(),
            field_type: FieldType::Number,
            required: true,
            position: 0,
            options: vec![],
            min: Some(0.0),
            max: None,
        }).await?;

        let mut input = new_idea("Cheaper paper");
        input.category_id = Some(cat.id);
        input.form_data = json!({"savings": -5});
        let err = create_idea(&db, &f.user, input.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Fields(ref e) if e[0].field == "savings"));

        input.form_data = json!({"savings": 1200});
        let created = create_idea(&db, &f.user, input).await?;
        assert_eq!(created.form_variant_id, Some(variant.id));
        assert_eq!(created.form_data, json!({"savings": 1200}));

        let stray = NewIdea { form_data: json!({"x": 1}), ..new_idea("No form") };
        assert!(matches!(create_idea(&db, &f.user, stray).await, Err(ServiceError::Validation(_))));
        Ok(())
    }
}
