use std::fmt;
use std::str::FromStr;

use sea_orm::{entity::prelude::*, Set, ConnectionTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, tenant};

/// Workflow meaning of a tenant-configured status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Pending,
    InReview,
    Approved,
    Rejected,
    Implemented,
}

impl StatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Pending => "pending",
            StatusKind::InReview => "in_review",
            StatusKind::Approved => "approved",
            StatusKind::Rejected => "rejected",
            StatusKind::Implemented => "implemented",
        }
    }

    /// Final kinds close the idea; leaving them is a reopen.
    pub fn is_final(&self) -> bool {
        matches!(self, StatusKind::Rejected | StatusKind::Implemented)
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StatusKind {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(StatusKind::Pending),
            "in_review" => Ok(StatusKind::InReview),
            "approved" => Ok(StatusKind::Approved),
            "rejected" => Ok(StatusKind::Rejected),
            "implemented" => Ok(StatusKind::Implemented),
            other => Err(errors::ModelError::Validation(format!("unknown status kind: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "status")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub kind: String,
    pub position: i32,
    pub is_default: bool,
    pub color: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn kind(&self) -> StatusKind { self.kind.parse().unwrap_or(StatusKind::Pending) }
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

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("status name required".into())); }
    if name.len() > 64 { return Err(errors::ModelError::Validation("status name too long (<=64)".into())); }
    Ok(())
}

/// Colors are `#RRGGBB`.
pub fn validate_color(color: &str) -> Result<(), errors::ModelError> {
    let ok = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !ok { return Err(errors::ModelError::Validation("color must be #RRGGBB".into())); }
    Ok(())
}

pub fn validate_default(kind: StatusKind, is_default: bool) -> Result<(), errors::ModelError> {
    if is_default && kind != StatusKind::Pending {
        return Err(errors::ModelError::Validation("default status must have kind pending".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    name: &str,
    kind: StatusKind,
    position: i32,
    is_default: bool,
    color: Option<&str>,
) -> Result<Model, errors::ModelError> {
    validate_name(name)?;
    validate_default(kind, is_default)?;
    if let Some(c) = color { validate_color(c)?; }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        name: Set(name.trim().to_string()),
        kind: Set(kind.as_str().to_string()),
        position: Set(position),
        is_default: Set(is_default),
        color: Set(color.map(str::to_string)),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(errors::ModelError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for k in [StatusKind::Pending, StatusKind::InReview, StatusKind::Approved, StatusKind::Rejected, StatusKind::Implemented] {
            assert_eq!(k.as_str().parse::<StatusKind>().unwrap(), k);
        }
        assert!("closed".parse::<StatusKind>().is_err());
    }

    #[test]
    fn only_rejected_and_implemented_are_final() {
        assert!(StatusKind::Rejected.is_final());
        assert!(StatusKind::Implemented.is_final());
        assert!(!StatusKind::Approved.is_final());
        assert!(!StatusKind::Pending.is_final());
    }

    #[test]
    fn color_validation() {
        assert!(validate_color("#1a2B3c").is_ok());
        assert!(validate_color("1a2b3c").is_err());
        assert!(validate_color("#12345").is_err());
        assert!(validate_color("#zzzzzz").is_err());
    }

    #[test]
    fn default_status_must_be_pending() {
        assert!(validate_default(StatusKind::Pending, true).is_ok());
        assert!(validate_default(StatusKind::Approved, true).is_err());
        assert!(validate_default(StatusKind::Approved, false).is_ok());
    }
}
