use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::user::Role;

use crate::rbac::Actor;

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub tenant_id: Uuid,
    /// Name for the tenant when this registration creates it.
    #[serde(default)]
    pub tenant_name: Option<String>,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// A validated registration, password already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub tenant_id: Uuid,
    pub email: String,
    pub password: String,
}

/// Domain user (business view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
}

impl AuthUser {
    pub fn actor(&self) -> Actor { Actor::new(self.id, self.tenant_id, self.role) }
}

impl From<models::user::Model> for AuthUser {
    fn from(u: models::user::Model) -> Self {
        Self { id: u.id, tenant_id: u.tenant_id, role: u.role(), active: u.is_active(), email: u.email, name: u.name }
    }
}

/// Domain credentials (hashed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: Option<String>,
}

/// JWT claims. `sub` is the email, `uid`/`tid` are uuids in string form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub uid: String,
    pub tid: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn actor(&self) -> Option<Actor> {
        let user_id = Uuid::parse_str(&self.uid).ok()?;
        let tenant_id = Uuid::parse_str(&self.tid).ok()?;
        Some(Actor::new(user_id, tenant_id, self.role))
    }
}
