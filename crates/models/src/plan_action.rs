use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{errors, idea};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plan_action")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub idea_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub progress: i32,
    pub due_date: Option<Date>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Idea }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Idea => Entity::belongs_to(idea::Entity)
                .from(Column::IdeaId)
                .to(idea::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_title(title: &str) -> Result<(), errors::ModelError> {
    if title.trim().is_empty() { return Err(errors::ModelError::Validation("title required".into())); }
    if title.chars().count() > 200 { return Err(errors::ModelError::Validation("title too long (<=200)".into())); }
    Ok(())
}

/// Progress is a percentage.
pub fn validate_progress(progress: i32) -> Result<(), errors::ModelError> {
    if !(0..=100).contains(&progress) {
        return Err(errors::ModelError::Validation("progress must be within 0..=100".into()));
    }
    Ok(())
}
