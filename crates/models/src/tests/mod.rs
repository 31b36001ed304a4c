//! Database-backed entity tests. Skipped when `SKIP_DB_TESTS` is set or no
//! database is reachable at `DATABASE_URL`.

use crate::db::connect;
use crate::{category, form_field, form_model, form_variant, status, tenant, user, user_credentials};
use sea_orm::{DatabaseConnection, EntityTrait, QueryFilter, ColumnTrait};
use migration::MigratorTrait;
use anyhow::Result;
use tokio::sync::OnceCell;
use uuid::Uuid;

// Migrations run once per test process, on a throwaway connection.
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

async fn setup_test_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let migrated = MIGRATED
        .get_or_init(|| async {
            let db = match connect().await {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("skip: cannot connect to db: {}", e);
                    return false;
                }
            };
            if let Err(e) = migration::Migrator::up(&db, None).await {
                eprintln!("skip: migrate up failed: {}", e);
                return false;
            }
            true
        })
        .await;
    if !*migrated {
        return None;
    }
    connect().await.ok()
}

#[tokio::test]
async fn test_tenant_user_credentials_crud() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let t = tenant::create(&db, &format!("models_tenant_{}", Uuid::new_v4())).await?;
    let email = format!("Models_{}@Example.com", Uuid::new_v4());
    let u = user::create(&db, t.id, &email, "Model User", user::Role::Manager).await?;
    assert_eq!(u.email, email.to_ascii_lowercase());
    assert_eq!(u.role(), user::Role::Manager);

    let c1 = user_credentials::upsert_password(&db, u.id, "hash-one".into(), "argon2").await?;
    let c2 = user_credentials::upsert_password(&db, u.id, "hash-two".into(), "argon2").await?;
    assert_eq!(c1.id, c2.id);
    assert_eq!(c2.password_hash, "hash-two");

    // same email in the same tenant violates the composite unique index
    assert!(user::create(&db, t.id, &email, "Dup", user::Role::User).await.is_err());

    user::soft_delete(&db, u.id).await?;
    let after = user::Entity::find_by_id(u.id).one(&db).await?.expect("user still present");
    assert!(after.deleted_at.is_some());
    assert!(!after.is_active());

    tenant::Entity::delete_by_id(t.id).exec(&db).await?;
    assert!(user::Entity::find_by_id(u.id).one(&db).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_form_definition_tree() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let t = tenant::create(&db, &format!("forms_tenant_{}", Uuid::new_v4())).await?;
    let cat = category::create(&db, t.id, "Energy", Some("energy savings")).await?;
    let fm = form_model::create(&db, t.id, "Default form", None).await?;
    let v = form_variant::create(&db, fm.id, "Energy variant", Some(cat.id), false).await?;
    let f = form_field::create(
        &db,
        v.id,
        form_field::NewField {
            key: "impact",
            label: "Impact",
            field_type: form_field::FieldType::Select,
            required: true,
            position: 1,
            options: vec!["low".into(), "high".into()],
            min: None,
            max: None,
        },
    )
    .await?;
    assert_eq!(f.option_values(), vec!["low".to_string(), "high".to_string()]);

    let st = status::create(&db, t.id, "Submitted", status::StatusKind::Pending, 0, true, Some("#cccccc")).await?;
    assert_eq!(st.kind(), status::StatusKind::Pending);

    let fields = form_field::Entity::find()
        .filter(form_field::Column::VariantId.eq(v.id))
        .all(&db)
        .await?;
    assert_eq!(fields.len(), 1);

    tenant::Entity::delete_by_id(t.id).exec(&db).await?;
    Ok(())
}
