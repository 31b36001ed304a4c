use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{errors, tenant};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_metadata")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub idea_id: Option<Uuid>,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Tenant }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Tenant => Entity::belongs_to(tenant::Entity)
                .from(Column::TenantId)
                .to(tenant::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_file_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("file_name required".into())); }
    if name.len() > 255 { return Err(errors::ModelError::Validation("file_name too long (<=255)".into())); }
    Ok(())
}

/// Keep `[A-Za-z0-9._-]`, map everything else to `_`, and strip leading dots.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() { "file".to_string() } else { trimmed.to_string() }
}

pub fn storage_key(tenant_id: Uuid, id: Uuid, file_name: &str) -> String {
    format!("{}/{}-{}", tenant_id, id, sanitize_file_name(file_name))
}
