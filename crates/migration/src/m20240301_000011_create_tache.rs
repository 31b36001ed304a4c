//! Create `tache`: sub-task of a plan action.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tache::Table)
                    .if_not_exists()
                    .col(uuid(Tache::Id).primary_key())
                    .col(uuid(Tache::PlanActionId).not_null())
                    .col(ColumnDef::new(Tache::AssigneeId).uuid().null())
                    .col(string_len(Tache::Title, 200).not_null())
                    .col(text(Tache::Description).not_null())
                    .col(integer(Tache::Progress).not_null().default(0))
                    .col(ColumnDef::new(Tache::DueDate).date().null())
                    .col(ColumnDef::new(Tache::CompletedAt).timestamp_with_time_zone().null())
                    .col(timestamp_with_time_zone(Tache::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Tache::UpdatedAt).not_null())
                    .check(Expr::col(Tache::Progress).between(0, 100))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tache_plan_action")
                            .from(Tache::Table, Tache::PlanActionId)
                            .to(PlanAction::Table, PlanAction::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tache_assignee")
                            .from(Tache::Table, Tache::AssigneeId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Tache::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Tache {
    Table,
    Id,
    PlanActionId,
    AssigneeId,
    Title,
    Description,
    Progress,
    DueDate,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PlanAction { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
