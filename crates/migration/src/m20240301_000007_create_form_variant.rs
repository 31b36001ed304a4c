//! Create `form_variant`: a concrete field layout of a form model, optionally bound to a category.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FormVariant::Table)
                    .if_not_exists()
                    .col(uuid(FormVariant::Id).primary_key())
                    .col(uuid(FormVariant::FormModelId).not_null())
                    .col(string_len(FormVariant::Name, 128).not_null())
                    .col(ColumnDef::new(FormVariant::CategoryId).uuid().null())
                    .col(boolean(FormVariant::IsDefault).not_null().default(false))
                    .col(timestamp_with_time_zone(FormVariant::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(FormVariant::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_variant_model")
                            .from(FormVariant::Table, FormVariant::FormModelId)
                            .to(FormModel::Table, FormModel::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_variant_category")
                            .from(FormVariant::Table, FormVariant::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FormVariant::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum FormVariant { Table, Id, FormModelId, Name, CategoryId, IsDefault, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum FormModel { Table, Id }

#[derive(DeriveIden)]
enum Category { Table, Id }
