use async_trait::async_trait;
use models::user::Role;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials, NewAccount};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Store a registration as one unit: bootstrap the tenant when it is unknown,
    /// create the user (admin of a new tenant, plain user otherwise) and its
    /// credentials. Nothing is kept when any step fails. Returns the user and
    /// whether the tenant was created.
    async fn register_account(&self, account: NewAccount) -> Result<(AuthUser, bool), AuthError>;

    async fn find_user_by_tenant_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        tenants: Mutex<HashSet<Uuid>>,
        users: Mutex<HashMap<(Uuid, String), AuthUser>>, // key: (tenant_id, email)
        creds: Mutex<HashMap<Uuid, Credentials>>,        // key: user_id
    }

    impl MockAuthRepository {
        /// Flip a user's active flag, as an admin disabling an account would.
        pub fn set_active(&self, user_id: Uuid, active: bool) {
            let mut users = self.users.lock().unwrap();
            if let Some(u) = users.values_mut().find(|u| u.id == user_id) {
                u.active = active;
            }
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn register_account(
            &self,
            account: NewAccount,
        ) -> Result<(AuthUser, bool), AuthError> {
            let mut tenants = self.tenants.lock().unwrap();
            let mut users = self.users.lock().unwrap();
            let key = (account.tenant_id, account.email.clone());
            if users.contains_key(&key) {
                return Err(AuthError::Conflict);
            }
            let created_tenant = tenants.insert(account.tenant_id);
            let role = if created_tenant { Role::Admin } else { Role::User };
            let user = AuthUser {
                id: Uuid::new_v4(),
                tenant_id: account.tenant_id,
                email: account.email,
                name: account.name,
                role,
                active: true,
            };
            users.insert(key, user.clone());
            self.creds.lock().unwrap().insert(user.id, Credentials {
                user_id: user.id,
                password_hash: account.password_hash,
                password_algorithm: account.password_algorithm,
            });
            Ok((user, created_tenant))
        }

        async fn find_user_by_tenant_email(
            &self,
            tenant_id: Uuid,
            email: &str,
        ) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(&(tenant_id, email.to_string())).cloned())
        }

        async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.id == user_id).cloned())
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }
    }
}
