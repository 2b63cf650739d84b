//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_idea_table;
mod m20250101_000002_create_poll_table;
mod m20250101_000003_create_poll_response_table;
mod m20250101_000004_create_idea_reaction_table;

/// Width of columns holding ids issued by the identity provider, which are
/// not ULIDs.
const IDENTITY_ID_LEN: u32 = 64;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_idea_table::Migration),
            Box::new(m20250101_000002_create_poll_table::Migration),
            Box::new(m20250101_000003_create_poll_response_table::Migration),
            Box::new(m20250101_000004_create_idea_reaction_table::Migration),
        ]
    }
}
