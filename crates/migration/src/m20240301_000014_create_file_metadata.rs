//! Create `file_metadata`. Only descriptive metadata is stored; bytes live elsewhere.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FileMetadata::Table)
                    .if_not_exists()
                    .col(uuid(FileMetadata::Id).primary_key())
                    .col(uuid(FileMetadata::TenantId).not_null())
                    .col(ColumnDef::new(FileMetadata::IdeaId).uuid().null())
                    .col(uuid(FileMetadata::UploadedBy).not_null())
                    .col(string_len(FileMetadata::FileName, 255).not_null())
                    .col(string_len(FileMetadata::MimeType, 128).not_null())
                    .col(big_integer(FileMetadata::SizeBytes).not_null())
                    .col(string_len(FileMetadata::StorageKey, 512).unique_key().not_null())
                    .col(timestamp_with_time_zone(FileMetadata::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_metadata_tenant")
                            .from(FileMetadata::Table, FileMetadata::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_metadata_idea")
                            .from(FileMetadata::Table, FileMetadata::IdeaId)
                            .to(Idea::Table, Idea::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_file_metadata_uploader")
                            .from(FileMetadata::Table, FileMetadata::UploadedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FileMetadata::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum FileMetadata {
    Table,
    Id,
    TenantId,
    IdeaId,
    UploadedBy,
    FileName,
    MimeType,
    SizeBytes,
    StorageKey,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Tenant { Table, Id }

#[derive(DeriveIden)]
enum Idea { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
