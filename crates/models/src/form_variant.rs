use sea_orm::{entity::prelude::*, Set, ConnectionTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, form_model};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_variant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub form_model_id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub is_default: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { FormModel }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::FormModel => Entity::belongs_to(form_model::Entity)
                .from(Column::FormModelId)
                .to(form_model::Column::Id)
                .into(),
        }
    }
}

impl Related<form_model::Entity> for Entity {
    fn to() -> RelationDef { Relation::FormModel.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("variant name required".into())); }
    if name.len() > 128 { return Err(errors::ModelError::Validation("variant name too long (<=128)".into())); }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    form_model_id: Uuid,
    name: &str,
    category_id: Option<Uuid>,
    is_default: bool,
) -> Result<Model, errors::ModelError> {
    validate_name(name)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        form_model_id: Set(form_model_id),
        name: Set(name.trim().to_string()),
        category_id: Set(category_id),
        is_default: Set(is_default),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(errors::ModelError::from)
}
