//! Create `plan_action`: work derived from an approved idea, tracked by a 0-100 progress.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PlanAction::Table)
                    .if_not_exists()
                    .col(uuid(PlanAction::Id).primary_key())
                    .col(uuid(PlanAction::TenantId).not_null())
                    .col(uuid(PlanAction::IdeaId).not_null())
                    .col(ColumnDef::new(PlanAction::OwnerId).uuid().null())
                    .col(string_len(PlanAction::Title, 200).not_null())
                    .col(text(PlanAction::Description).not_null())
                    .col(integer(PlanAction::Progress).not_null().default(0))
                    .col(ColumnDef::new(PlanAction::DueDate).date().null())
                    .col(ColumnDef::new(PlanAction::CompletedAt).timestamp_with_time_zone().null())
                    .col(timestamp_with_time_zone(PlanAction::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(PlanAction::UpdatedAt).not_null())
                    .check(Expr::col(PlanAction::Progress).between(0, 100))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plan_action_tenant")
                            .from(PlanAction::Table, PlanAction::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plan_action_idea")
                            .from(PlanAction::Table, PlanAction::IdeaId)
                            .to(Idea::Table, Idea::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plan_action_owner")
                            .from(PlanAction::Table, PlanAction::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PlanAction::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PlanAction {
    Table,
    Id,
    TenantId,
    IdeaId,
    OwnerId,
    Title,
    Description,
    Progress,
    DueDate,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenant { Table, Id }

#[derive(DeriveIden)]
enum Idea { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
