//! Create idea reaction table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(IdeaReaction::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(IdeaReaction::Id)
                .string_len(32)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(IdeaReaction::IdeaId).string_len(32).not_null())
        .col(ColumnDef::new(IdeaReaction::UserId).string_len(super::IDENTITY_ID_LEN).not_null())
        .col(ColumnDef::new(IdeaReaction::Choice).string_len(16).not_null())
        .col(
            ColumnDef::new(IdeaReaction::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_idea_reaction_idea")
                .from(IdeaReaction::Table, IdeaReaction::IdeaId)
                .to(Idea::Table, Idea::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(create_table()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_idea_reaction_idea_created")
                    .table(IdeaReaction::Table)
                    .col(IdeaReaction::IdeaId)
                    .col(IdeaReaction::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IdeaReaction::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum IdeaReaction {
    Table,
    Id,
    IdeaId,
    UserId,
    Choice,
    CreatedAt,
}

#[derive(Iden)]
enum Idea {
    Table,
    Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_fits_external_identity_ids() {
        let sql = create_table().to_string(PostgresQueryBuilder);

        assert!(sql.contains(r#""user_id" varchar(64) NOT NULL"#), "{sql}");
    }
}
