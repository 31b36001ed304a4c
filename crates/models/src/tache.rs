use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::plan_action;

pub use crate::plan_action::{validate_progress, validate_title};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tache")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub plan_action_id: Uuid,
    pub assignee_id: Option<Uuid>,
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
pub enum Relation { PlanAction }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::PlanAction => Entity::belongs_to(plan_action::Entity)
                .from(Column::PlanActionId)
                .to(plan_action::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
