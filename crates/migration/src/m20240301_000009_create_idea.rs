//! Create `idea` table. Submitted form values live in the `form_data` JSON column.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Idea::Table)
                    .if_not_exists()
                    .col(uuid(Idea::Id).primary_key())
                    .col(uuid(Idea::TenantId).not_null())
                    .col(uuid(Idea::AuthorId).not_null())
                    .col(ColumnDef::new(Idea::CategoryId).uuid().null())
                    .col(uuid(Idea::StatusId).not_null())
                    .col(ColumnDef::new(Idea::FormVariantId).uuid().null())
                    .col(string_len(Idea::Title, 200).not_null())
                    .col(text(Idea::Description).not_null())
                    .col(json_binary(Idea::FormData).not_null())
                    .col(timestamp_with_time_zone(Idea::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Idea::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_tenant")
                            .from(Idea::Table, Idea::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_author")
                            .from(Idea::Table, Idea::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_category")
                            .from(Idea::Table, Idea::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_status")
                            .from(Idea::Table, Idea::StatusId)
                            .to(Status::Table, Status::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_idea_form_variant")
                            .from(Idea::Table, Idea::FormVariantId)
                            .to(FormVariant::Table, FormVariant::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Idea::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Idea {
    Table,
    Id,
    TenantId,
    AuthorId,
    CategoryId,
    StatusId,
    FormVariantId,
    Title,
    Description,
    FormData,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenant { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Category { Table, Id }

#[derive(DeriveIden)]
enum Status { Table, Id }

#[derive(DeriveIden)]
enum FormVariant { Table, Id }
