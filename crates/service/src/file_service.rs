//! Attachment metadata. Bytes live elsewhere; only the record and a storage key are kept here.

use uuid::Uuid;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};

use configs::UploadConfig;
use models::file_metadata;
use crate::{errors::ServiceError, idea_service, rbac::Actor};

#[derive(Debug, Clone, Deserialize)]
pub struct NewFile {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Check a declared upload against the configured limits.
pub fn check_upload(cfg: &UploadConfig, input: &NewFile) -> Result<(), ServiceError> {
    file_metadata::validate_file_name(&input.file_name)?;
    if input.size_bytes < 1 {
        return Err(ServiceError::validation("size_bytes must be positive"));
    }
    if input.size_bytes > cfg.max_upload_bytes {
        return Err(ServiceError::validation(format!("file exceeds the {} byte limit", cfg.max_upload_bytes)));
    }
    let mime = input.mime_type.trim().to_ascii_lowercase();
    if !cfg.allowed_mime_types.iter().any(|m| m.eq_ignore_ascii_case(&mime)) {
        return Err(ServiceError::validation(format!("mime type {mime} is not allowed")));
    }
    Ok(())
}

async fn find_visible(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<file_metadata::Model, ServiceError> {
    let found = file_metadata::Entity::find_by_id(id)
        .filter(file_metadata::Column::TenantId.eq(actor.tenant_id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("file"))?;
    if let Some(idea_id) = found.idea_id {
        idea_service::find_visible(db, actor, idea_id)
            .await
            .map_err(|_| ServiceError::not_found("file"))?;
    } else if found.uploaded_by != actor.user_id && !actor.is_reviewer() {
        return Err(ServiceError::not_found("file"));
    }
    Ok(found)
}

#[instrument(skip(db, cfg, input), fields(tenant_id = %actor.tenant_id, user_id = %actor.user_id))]
pub async fn register_file(
    db: &DatabaseConnection,
    cfg: &UploadConfig,
    actor: &Actor,
    idea_id: Option<Uuid>,
    input: NewFile,
) -> Result<file_metadata::Model, ServiceError> {
    check_upload(cfg, &input)?;
    if let Some(iid) = idea_id {
        idea_service::find_visible(db, actor, iid).await?;
    }
    let id = Uuid::new_v4();
    let created = file_metadata::ActiveModel {
        id: Set(id),
        tenant_id: Set(actor.tenant_id),
        idea_id: Set(idea_id),
        uploaded_by: Set(actor.user_id),
        file_name: Set(input.file_name.trim().to_string()),
        mime_type: Set(input.mime_type.trim().to_ascii_lowercase()),
        size_bytes: Set(input.size_bytes),
        storage_key: Set(file_metadata::storage_key(actor.tenant_id, id, &input.file_name)),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    info!(file_id = %created.id, size = created.size_bytes, "file_registered");
    Ok(created)
}

pub async fn list_files(
    db: &DatabaseConnection,
    actor: &Actor,
    idea_id: Uuid,
) -> Result<Vec<file_metadata::Model>, ServiceError> {
    idea_service::find_visible(db, actor, idea_id).await?;
    Ok(file_metadata::Entity::find()
        .filter(file_metadata::Column::IdeaId.eq(idea_id))
        .order_by_asc(file_metadata::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn get_file(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<file_metadata::Model, ServiceError> {
    find_visible(db, actor, id).await
}

pub async fn delete_file(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
) -> Result<(), ServiceError> {
    let found = find_visible(db, actor, id).await?;
    if found.uploaded_by != actor.user_id && !actor.is_admin() {
        return Err(ServiceError::forbidden("delete files of others"));
    }
    file_metadata::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idea_service::NewIdea;
    use crate::test_support::{fixture, get_db};

    fn pdf(size: i64) -> NewFile {
        NewFile { file_name: "plan (final).pdf".into(), mime_type: "Application/PDF".into(), size_bytes: size }
    }

    #[test]
    fn upload_limits() {
        let cfg = UploadConfig::default();
        assert!(check_upload(&cfg, &pdf(1024)).is_ok());
        assert!(check_upload(&cfg, &pdf(0)).is_err());
        assert!(check_upload(&cfg, &pdf(cfg.max_upload_bytes + 1)).is_err());
        let exe = NewFile { mime_type: "application/x-msdownload".into(), ..pdf(10) };
        assert!(check_upload(&cfg, &exe).is_err());
        let unnamed = NewFile { file_name: " ".into(), ..pdf(10) };
        assert!(check_upload(&cfg, &unnamed).is_err());
    }

    #[tokio::test]
    async fn metadata_lifecycle() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };
        let f = fixture(&db).await;
        let cfg = UploadConfig::default();
        let idea = idea_service::create_idea(&db, &f.user, NewIdea {
            title: "Shared bikes".into(),
            description: String::new(),
            category_id: None,
            form_variant_id: None,
            form_data: serde_json::Value::Null,
        }).await?;

        let file = register_file(&db, &cfg, &f.user, Some(idea.id), pdf(2048)).await?;
        assert_eq!(file.storage_key, format!("{}/{}-plan__final_.pdf", f.tenant_id, file.id));
        assert_eq!(file.mime_type, "application/pdf");

        assert_eq!(list_files(&db, &f.manager, idea.id).await?.len(), 1);
        assert!(matches!(get_file(&db, &f.other_user, file.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(delete_file(&db, &f.manager, file.id).await, Err(ServiceError::Forbidden(_))));
        delete_file(&db, &f.user, file.id).await?;
        assert!(list_files(&db, &f.user, idea.id).await?.is_empty());
        Ok(())
    }
}
