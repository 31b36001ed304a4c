use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (index name, table, columns, unique)
fn specs() -> Vec<(&'static str, DynIden, Vec<DynIden>, bool)> {
    vec![
        ("uniq_user_tenant_email", User::Table.into_iden(), vec![User::TenantId.into_iden(), User::Email.into_iden()], true),
        ("uniq_category_tenant_name", Category::Table.into_iden(), vec![Category::TenantId.into_iden(), Category::Name.into_iden()], true),
        ("uniq_status_tenant_name", Status::Table.into_iden(), vec![Status::TenantId.into_iden(), Status::Name.into_iden()], true),
        ("uniq_form_model_tenant_name", FormModel::Table.into_iden(), vec![FormModel::TenantId.into_iden(), FormModel::Name.into_iden()], true),
        ("uniq_form_field_variant_key", FormField::Table.into_iden(), vec![FormField::VariantId.into_iden(), FormField::Key.into_iden()], true),
        ("idx_idea_tenant_status", Idea::Table.into_iden(), vec![Idea::TenantId.into_iden(), Idea::StatusId.into_iden()], false),
        ("idx_idea_author", Idea::Table.into_iden(), vec![Idea::AuthorId.into_iden()], false),
        ("idx_plan_action_idea", PlanAction::Table.into_iden(), vec![PlanAction::IdeaId.into_iden()], false),
        ("idx_tache_plan_action", Tache::Table.into_iden(), vec![Tache::PlanActionId.into_iden()], false),
        ("idx_comment_idea", Comment::Table.into_iden(), vec![Comment::IdeaId.into_iden()], false),
        ("idx_notification_user_read", Notification::Table.into_iden(), vec![Notification::UserId.into_iden(), Notification::ReadAt.into_iden()], false),
    ]
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, cols, unique) in specs() {
            let mut idx = Index::create();
            idx.name(name).table(table);
            for c in cols {
                idx.col(c);
            }
            if unique {
                idx.unique();
            }
            manager.create_index(idx.to_owned()).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, _, _) in specs() {
            manager
                .drop_index(Index::drop().name(name).table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum User { Table, TenantId, Email }

#[derive(DeriveIden)]
enum Category { Table, TenantId, Name }

#[derive(DeriveIden)]
enum Status { Table, TenantId, Name }

#[derive(DeriveIden)]
enum FormModel { Table, TenantId, Name }

#[derive(DeriveIden)]
enum FormField { Table, VariantId, Key }

#[derive(DeriveIden)]
enum Idea { Table, TenantId, StatusId, AuthorId }

#[derive(DeriveIden)]
enum PlanAction { Table, IdeaId }

#[derive(DeriveIden)]
enum Tache { Table, PlanActionId }

#[derive(DeriveIden)]
enum Comment { Table, IdeaId }

#[derive(DeriveIden)]
enum Notification { Table, UserId, ReadAt }
