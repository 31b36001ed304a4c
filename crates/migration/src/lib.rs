//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_tenant;
mod m20240301_000002_create_user;
mod m20240301_000003_create_user_credentials;
mod m20240301_000004_create_category;
mod m20240301_000005_create_status;
mod m20240301_000006_create_form_model;
mod m20240301_000007_create_form_variant;
mod m20240301_000008_create_form_field;
mod m20240301_000009_create_idea;
mod m20240301_000010_create_plan_action;
mod m20240301_000011_create_tache;
mod m20240301_000012_create_comment;
mod m20240301_000013_create_notification;
mod m20240301_000014_create_file_metadata;
mod m20240301_000020_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_tenant::Migration),
            Box::new(m20240301_000002_create_user::Migration),
            Box::new(m20240301_000003_create_user_credentials::Migration),
            Box::new(m20240301_000004_create_category::Migration),
            Box::new(m20240301_000005_create_status::Migration),
            Box::new(m20240301_000006_create_form_model::Migration),
            Box::new(m20240301_000007_create_form_variant::Migration),
            Box::new(m20240301_000008_create_form_field::Migration),
            Box::new(m20240301_000009_create_idea::Migration),
            Box::new(m20240301_000010_create_plan_action::Migration),
            Box::new(m20240301_000011_create_tache::Migration),
            Box::new(m20240301_000012_create_comment::Migration),
            Box::new(m20240301_000013_create_notification::Migration),
            Box::new(m20240301_000014_create_file_metadata::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000020_add_indexes::Migration),
        ]
    }
}
