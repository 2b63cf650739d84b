//! Create idea table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(Idea::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Idea::Id)
                .string_len(32)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Idea::Title).string_len(100).not_null())
        .col(ColumnDef::new(Idea::Description).text().not_null())
        .col(ColumnDef::new(Idea::Category).string_len(50).not_null())
        .col(
            ColumnDef::new(Idea::Status)
                .string_len(16)
                .not_null()
                .default("pending"),
        )
        .col(ColumnDef::new(Idea::SubmitterId).string_len(super::IDENTITY_ID_LEN).not_null())
        .col(ColumnDef::new(Idea::SubmitterName).string_len(128).not_null())
        .col(ColumnDef::new(Idea::SubmitterRole).string_len(16).not_null())
        .col(
            ColumnDef::new(Idea::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(ColumnDef::new(Idea::UpdatedAt).timestamp_with_time_zone())
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(create_table()).await?;

        // Index: status (board filters by status)
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_status")
                    .table(Idea::Table)
                    .col(Idea::Status)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (newest first listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_idea_created_at")
                    .table(Idea::Table)
                    .col(Idea::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Idea::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Idea {
    Table,
    Id,
    Title,
    Description,
    Category,
    Status,
    SubmitterId,
    SubmitterName,
    SubmitterRole,
    CreatedAt,
    UpdatedAt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitter_id_fits_external_identity_ids() {
        let sql = create_table().to_string(PostgresQueryBuilder);

        assert!(sql.contains(r#""submitter_id" varchar(64) NOT NULL"#), "{sql}");
    }
}
