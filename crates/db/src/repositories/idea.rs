//! Idea repository.

use std::sync::Arc;

use crate::entities::{Idea, IdeaStatus, idea};
use connect_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Idea repository for database operations.
#[derive(Clone)]
pub struct IdeaRepository {
    db: Arc<DatabaseConnection>,
}

impl IdeaRepository {
    /// Create a new idea repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an idea by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<idea::Model>> {
        Idea::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an idea by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<idea::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Idea not found: {id}")))
    }

    /// List ideas, newest first, optionally restricted to the given statuses.
    pub async fn find_by_statuses(
        &self,
        statuses: Option<&[IdeaStatus]>,
    ) -> AppResult<Vec<idea::Model>> {
        let mut query = Idea::find();
        if let Some(statuses) = statuses {
            query = query.filter(idea::Column::Status.is_in(statuses.iter().copied()));
        }

        query
            .order_by_desc(idea::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new idea.
    pub async fn create(&self, model: idea::ActiveModel) -> AppResult<idea::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update an idea.
    pub async fn update(&self, model: idea::ActiveModel) -> AppResult<idea::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_idea(id: &str, status: IdeaStatus) -> idea::Model {
        idea::Model {
            id: id.to_string(),
            title: "Standing desks".to_string(),
            description: "Add standing desks to the second floor".to_string(),
            category: "workplace".to_string(),
            status,
            submitter_id: "user1".to_string(),
            submitter_name: "Alex".to_string(),
            submitter_role: UserRole::Employee,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_returns_idea() {
        let idea = create_test_idea("idea1", IdeaStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[idea.clone()]])
                .into_connection(),
        );

        let repo = IdeaRepository::new(db);
        let found = repo.find_by_id("idea1").await.unwrap().unwrap();

        assert_eq!(found.id, "idea1");
        assert_eq!(found.status, IdeaStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<idea::Model>::new()])
                .into_connection(),
        );

        let repo = IdeaRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_statuses_returns_rows() {
        let approved = create_test_idea("idea1", IdeaStatus::Approved);
        let in_progress = create_test_idea("idea2", IdeaStatus::InProgress);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[approved, in_progress]])
                .into_connection(),
        );

        let repo = IdeaRepository::new(db);
        let ideas = repo
            .find_by_statuses(Some(&[IdeaStatus::Approved, IdeaStatus::InProgress]))
            .await
            .unwrap();

        assert_eq!(ideas.len(), 2);
    }
}
