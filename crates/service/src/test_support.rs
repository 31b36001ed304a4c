#![cfg(test)]
use tokio::sync::OnceCell;
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use uuid::Uuid;

use configs::DatabaseConfig;
use models::db::connect_with_config;
use models::user::Role;

use crate::idea_service::{self, ChangeStatus, NewIdea};
use crate::rbac::Actor;
use crate::{status_service, tenant_service};

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn test_db_config() -> DatabaseConfig {
    DatabaseConfig {
        max_connections: 10,
        min_connections: 1,
        connect_timeout_secs: 5,
        acquire_timeout_secs: 10,
        ..DatabaseConfig::default()
    }
}

/// Connection to a migrated test database, or `None` when DB tests are skipped
/// (`SKIP_DB_TESTS` set) or the database cannot be reached.
pub async fn get_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return None; }

    let ready = *MIGRATED
        .get_or_init(|| async {
            let db = match connect_with_config(&test_db_config()).await {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("skipping db tests: {e}");
                    return false;
                }
            };
            if let Err(e) = migration::Migrator::up(&db, None).await {
                eprintln!("skipping db tests, migration failed: {e}");
                return false;
            }
            true
        })
        .await;
    if !ready { return None; }

    // Fresh connection for the current test's runtime
    connect_with_config(&test_db_config()).await.ok()
}

/// A fresh tenant with default statuses and one user per role.
pub struct Fixture {
    pub tenant_id: Uuid,
    pub admin: Actor,
    pub manager: Actor,
    pub user: Actor,
    pub other_user: Actor,
}

pub async fn fixture(db: &DatabaseConnection) -> Fixture {
    let tenant_id = Uuid::new_v4();
    tenant_service::ensure_tenant(db, tenant_id, &format!("test-tenant-{tenant_id}"))
        .await
        .expect("create tenant");
    let mut mk = Vec::new();
    for (i, role) in [Role::Admin, Role::Manager, Role::User, Role::User].into_iter().enumerate() {
        let u = models::user::create(db, tenant_id, &format!("u{i}_{}@example.com", Uuid::new_v4()), &format!("User {i}"), role)
            .await
            .expect("create user");
        mk.push(Actor::new(u.id, tenant_id, role));
    }
    Fixture { tenant_id, admin: mk[0], manager: mk[1], user: mk[2], other_user: mk[3] }
}

/// An idea by `f.user`, approved by `f.manager`.
pub async fn approved_idea(db: &DatabaseConnection, f: &Fixture) -> models::idea::Model {
    let created = idea_service::create_idea(db, &f.user, NewIdea {
        title: "Replace lighting with LED".into(),
        description: "cheaper".into(),
        category_id: None,
        form_variant_id: None,
        form_data: serde_json::Value::Null,
    })
    .await
    .expect("create idea");
    let approved = status_service::first_of_kind(db, f.tenant_id, models::status::StatusKind::Approved)
        .await
        .expect("query statuses")
        .expect("approved status");
    idea_service::change_status(db, &f.manager, created.id, ChangeStatus { status_id: approved.id, note: None })
        .await
        .expect("approve")
}
