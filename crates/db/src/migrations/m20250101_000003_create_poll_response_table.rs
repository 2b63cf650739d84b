//! Create poll response table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(PollResponse::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(PollResponse::Id)
                .string_len(32)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(PollResponse::PollId).string_len(32).not_null())
        .col(ColumnDef::new(PollResponse::UserId).string_len(super::IDENTITY_ID_LEN).not_null())
        .col(ColumnDef::new(PollResponse::UserName).string_len(128).not_null())
        .col(ColumnDef::new(PollResponse::UserRole).string_len(16).not_null())
        .col(
            ColumnDef::new(PollResponse::SelectedOption)
                .integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(PollResponse::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name("fk_poll_response_poll")
                .from(PollResponse::Table, PollResponse::PollId)
                .to(Poll::Table, Poll::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(create_table()).await?;

        // No unique (poll_id, user_id) index: revotes append new rows.
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_response_poll_created")
                    .table(PollResponse::Table)
                    .col(PollResponse::PollId)
                    .col(PollResponse::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_response_user_id")
                    .table(PollResponse::Table)
                    .col(PollResponse::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollResponse::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollResponse {
    Table,
    Id,
    PollId,
    UserId,
    UserName,
    UserRole,
    SelectedOption,
    CreatedAt,
}

#[derive(Iden)]
enum Poll {
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
