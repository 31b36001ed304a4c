use uuid::Uuid;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::info;

use models::tenant;
use crate::{errors::ServiceError, status_service};

/// Get tenant by id.
pub async fn get_tenant(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<tenant::Model>, ServiceError> {
    Ok(tenant::Entity::find_by_id(id).one(db).await?)
}

/// Create the tenant with its default statuses unless it already exists.
/// Returns `true` when this call created it.
pub async fn ensure_tenant(
    db: &DatabaseConnection,
    id: Uuid,
    name: &str,
) -> Result<bool, ServiceError> {
    let txn = db.begin().await?;
    let created = bootstrap_tenant(&txn, id, name).await?;
    txn.commit().await?;
    Ok(created)
}

/// [`ensure_tenant`] on a caller-owned connection or transaction.
pub async fn bootstrap_tenant<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    name: &str,
) -> Result<bool, ServiceError> {
    if tenant::Entity::find_by_id(id).one(db).await?.is_some() {
        return Ok(false);
    }
    let created = tenant::create_with_id(db, id, name).await?;
    let statuses = status_service::bootstrap_defaults(db, created.id).await?;
    info!(tenant_id = %created.id, statuses = statuses.len(), "tenant_bootstrapped");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn ensure_tenant_is_idempotent() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()); };

        let id = Uuid::new_v4();
        let name = format!("svc_tenant_{id}");
        assert!(ensure_tenant(&db, id, &name).await?);
        assert!(!ensure_tenant(&db, id, &name).await?);

        let found = get_tenant(&db, id).await?.unwrap();
        assert_eq!(found.name, name);
        assert!(status_service::default_status(&db, id).await?.is_some());
        Ok(())
    }
}
