//! Create `status` table: tenant-configurable workflow states.
//!
//! `kind` maps each configured status onto one of the workflow kinds the service understands.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Status::Table)
                    .if_not_exists()
                    .col(uuid(Status::Id).primary_key())
                    .col(uuid(Status::TenantId).not_null())
                    .col(string_len(Status::Name, 64).not_null())
                    .col(string_len(Status::Kind, 16).not_null())
                    .col(integer(Status::Position).not_null())
                    .col(boolean(Status::IsDefault).not_null().default(false))
                    .col(ColumnDef::new(Status::Color).string_len(16).null())
                    .col(timestamp_with_time_zone(Status::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_status_tenant")
                            .from(Status::Table, Status::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Status::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Status { Table, Id, TenantId, Name, Kind, Position, IsDefault, Color, CreatedAt }

#[derive(DeriveIden)]
enum Tenant { Table, Id }
