use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FormModel::Table)
                    .if_not_exists()
                    .col(uuid(FormModel::Id).primary_key())
                    .col(uuid(FormModel::TenantId).not_null())
                    .col(string_len(FormModel::Name, 128).not_null())
                    .col(ColumnDef::new(FormModel::Description).text().null())
                    .col(boolean(FormModel::Active).not_null().default(true))
                    .col(timestamp_with_time_zone(FormModel::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(FormModel::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_model_tenant")
                            .from(FormModel::Table, FormModel::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FormModel::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum FormModel { Table, Id, TenantId, Name, Description, Active, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Tenant { Table, Id }
