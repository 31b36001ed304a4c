use sea_orm::{DatabaseConnection, DbErr, EntityTrait, ColumnTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;

use models::user::Role;

use crate::auth::domain::{AuthUser, Credentials, NewAccount};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;
use crate::errors::ServiceError;
use crate::tenant_service;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn db_err(e: DbErr) -> AuthError {
    AuthError::Repository(e.to_string())
}

fn repo_err(e: ServiceError) -> AuthError {
    match e {
        ServiceError::Conflict(_) => AuthError::Conflict,
        ServiceError::Validation(m) => AuthError::Validation(m),
        ServiceError::Model(models::errors::ModelError::Validation(m)) => AuthError::Validation(m),
        ServiceError::Model(models::errors::ModelError::Conflict(_)) => AuthError::Conflict,
        other => AuthError::Repository(other.to_string()),
    }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn register_account(&self, account: NewAccount) -> Result<(AuthUser, bool), AuthError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let created_tenant = tenant_service::bootstrap_tenant(&txn, account.tenant_id, &account.tenant_name)
            .await
            .map_err(repo_err)?;
        let role = if created_tenant { Role::Admin } else { Role::User };
        let user = models::user::create(&txn, account.tenant_id, &account.email, &account.name, role)
            .await
            .map_err(|e| repo_err(e.into()))?;
        models::user_credentials::upsert_password(&txn, user.id, account.password_hash, &account.password_algorithm)
            .await
            .map_err(|e| repo_err(e.into()))?;
        txn.commit().await.map_err(db_err)?;
        Ok((AuthUser::from(user), created_tenant))
    }

    async fn find_user_by_tenant_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find()
            .filter(models::user::Column::TenantId.eq(tenant_id))
            .filter(models::user::Column::Email.eq(email.to_string()))
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(AuthUser::from))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(AuthUser::from))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::Entity::find()
            .filter(models::user_credentials::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }
}
