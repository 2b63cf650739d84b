//! Idea reaction repository.

use std::sync::Arc;

use crate::entities::{IdeaReaction, idea_reaction};
use connect_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Idea reaction repository for database operations.
#[derive(Clone)]
pub struct IdeaReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl IdeaReactionRepository {
    /// Create a new idea reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the reaction log for an idea in insertion order.
    pub async fn find_by_idea(&self, idea_id: &str) -> AppResult<Vec<idea_reaction::Model>> {
        IdeaReaction::find()
            .filter(idea_reaction::Column::IdeaId.eq(idea_id))
            .order_by_asc(idea_reaction::Column::CreatedAt)
            .order_by_asc(idea_reaction::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the reaction logs for several ideas in insertion order.
    pub async fn find_by_ideas(&self, idea_ids: &[String]) -> AppResult<Vec<idea_reaction::Model>> {
        if idea_ids.is_empty() {
            return Ok(vec![]);
        }

        IdeaReaction::find()
            .filter(idea_reaction::Column::IdeaId.is_in(idea_ids.iter().cloned()))
            .order_by_asc(idea_reaction::Column::CreatedAt)
            .order_by_asc(idea_reaction::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append a reaction row.
    pub async fn create(
        &self,
        model: idea_reaction::ActiveModel,
    ) -> AppResult<idea_reaction::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
