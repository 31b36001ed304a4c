//! Role-based access policy.
//!
//! Every check is a pure function over the acting user and the records involved, so
//! handlers and services share one set of rules. Cross-tenant access is reported as
//! "not found" by the callers, never as "forbidden".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::{idea, plan_action, status::StatusKind, tache, user::Role};

use crate::errors::ServiceError;

/// The authenticated caller, decoded from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: Role) -> Self { Self { user_id, tenant_id, role } }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Admins and managers review ideas and drive plan actions.
    pub fn is_reviewer(&self) -> bool { matches!(self.role, Role::Admin | Role::Manager) }

    pub fn same_tenant(&self, tenant_id: Uuid) -> bool { self.tenant_id == tenant_id }
}

pub fn require_admin(actor: &Actor, action: &str) -> Result<(), ServiceError> {
    if actor.is_admin() { Ok(()) } else { Err(ServiceError::forbidden(action)) }
}

pub fn require_reviewer(actor: &Actor, action: &str) -> Result<(), ServiceError> {
    if actor.is_reviewer() { Ok(()) } else { Err(ServiceError::forbidden(action)) }
}

/// Reviewers see every idea of their tenant; plain users only their own.
pub fn can_view_idea(actor: &Actor, idea: &idea::Model) -> bool {
    actor.same_tenant(idea.tenant_id) && (actor.is_reviewer() || idea.author_id == actor.user_id)
}

/// Authors may edit only while the idea is still pending review.
pub fn can_edit_idea(actor: &Actor, idea: &idea::Model, kind: StatusKind) -> bool {
    if !actor.same_tenant(idea.tenant_id) { return false; }
    actor.is_reviewer() || (idea.author_id == actor.user_id && kind == StatusKind::Pending)
}

pub fn can_delete_idea(actor: &Actor, idea: &idea::Model, kind: StatusKind) -> bool {
    if !actor.same_tenant(idea.tenant_id) { return false; }
    actor.is_admin() || (idea.author_id == actor.user_id && kind == StatusKind::Pending)
}

/// Reviewers move ideas through the workflow; reopening a final status is admin-only.
pub fn can_change_status(actor: &Actor, from: StatusKind) -> bool {
    if from.is_final() { actor.is_admin() } else { actor.is_reviewer() }
}

pub fn can_manage_plan_action(actor: &Actor, pa: &plan_action::Model) -> bool {
    actor.same_tenant(pa.tenant_id) && (actor.is_reviewer() || pa.owner_id == Some(actor.user_id))
}

pub fn can_update_tache_progress(actor: &Actor, t: &tache::Model, pa: &plan_action::Model) -> bool {
    can_manage_plan_action(actor, pa) || (actor.same_tenant(pa.tenant_id) && t.assignee_id == Some(actor.user_id))
}

/// Visibility filter for idea listings: `Some(author)` forces the author filter.
pub fn idea_author_scope(actor: &Actor, requested: Option<Uuid>) -> Option<Uuid> {
    if actor.is_reviewer() { requested } else { Some(actor.user_id) }
}
