use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{errors, idea};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub idea_id: Uuid,
    pub author_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub body: String,
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

pub fn validate_body(body: &str) -> Result<(), errors::ModelError> {
    if body.trim().is_empty() { return Err(errors::ModelError::Validation("comment body required".into())); }
    if body.chars().count() > 5000 { return Err(errors::ModelError::Validation("comment too long (<=5000)".into())); }
    Ok(())
}
