//! Create `form_field`: one typed input of a variant.
//!
//! `options` holds the JSON array of choices for select fields; `min`/`max` bound
//! lengths, numeric values or selection counts depending on the field type.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FormField::Table)
                    .if_not_exists()
                    .col(uuid(FormField::Id).primary_key())
                    .col(uuid(FormField::VariantId).not_null())
                    .col(string_len(FormField::Key, 64).not_null())
                    .col(string_len(FormField::Label, 255).not_null())
                    .col(string_len(FormField::FieldType, 16).not_null())
                    .col(boolean(FormField::Required).not_null().default(false))
                    .col(integer(FormField::Position).not_null())
                    .col(ColumnDef::new(FormField::Options).json_binary().null())
                    .col(ColumnDef::new(FormField::Min).double().null())
                    .col(ColumnDef::new(FormField::Max).double().null())
                    .col(timestamp_with_time_zone(FormField::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(FormField::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_field_variant")
                            .from(FormField::Table, FormField::VariantId)
                            .to(FormVariant::Table, FormVariant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FormField::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum FormField {
    Table,
    Id,
    VariantId,
    Key,
    Label,
    FieldType,
    Required,
    Position,
    Options,
    Min,
    Max,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FormVariant { Table, Id }
