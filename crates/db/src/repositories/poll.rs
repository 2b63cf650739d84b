//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, PollResponse, poll, poll_response};
use connect_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the poll attached to an idea.
    pub async fn find_by_idea_id(&self, idea_id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::IdeaId.eq(idea_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the polls attached to any of the given ideas.
    pub async fn find_by_idea_ids(&self, idea_ids: &[String]) -> AppResult<Vec<poll::Model>> {
        if idea_ids.is_empty() {
            return Ok(vec![]);
        }

        Poll::find()
            .filter(poll::Column::IdeaId.is_in(idea_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new poll.
    pub async fn create(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Poll response repository for database operations.
#[derive(Clone)]
pub struct PollResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl PollResponseRepository {
    /// Create a new poll response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Get the full response log for a poll in insertion order.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_response::Model>> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .order_by_asc(poll_response::Column::CreatedAt)
            .order_by_asc(poll_response::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append a response row.
    pub async fn create(
        &self,
        model: poll_response::ActiveModel,
    ) -> AppResult<poll_response::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn create_test_poll(id: &str, idea_id: &str) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            idea_id: idea_id.to_string(),
            question: "Which floor first?".to_string(),
            options: json!(["Second", "Third"]),
            is_active: true,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_response(id: &str, user_id: &str, option: i32, age_secs: i64) -> poll_response::Model {
        poll_response::Model {
            id: id.to_string(),
            poll_id: "poll1".to_string(),
            user_id: user_id.to_string(),
            user_name: user_id.to_uppercase(),
            user_role: UserRole::Trainee,
            selected_option: option,
            created_at: (Utc::now() - Duration::seconds(age_secs)).into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_idea_id_returns_poll() {
        let poll = create_test_poll("poll1", "idea1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[poll.clone()]])
                .into_connection(),
        );

        let repo = PollRepository::new(db);
        let found = repo.find_by_idea_id("idea1").await.unwrap().unwrap();

        assert_eq!(found.id, "poll1");
        assert_eq!(found.options, json!(["Second", "Third"]));
    }

    #[tokio::test]
    async fn test_find_by_idea_ids_empty_input_skips_query() {
        // No query results appended: a query would fail the mock.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = PollRepository::new(db);
        let polls = repo.find_by_idea_ids(&[]).await.unwrap();

        assert!(polls.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_poll_keeps_every_row() {
        let rows = vec![
            create_test_response("r1", "alice", 0, 30),
            create_test_response("r2", "bob", 1, 20),
            create_test_response("r3", "alice", 1, 10),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = PollResponseRepository::new(db);
        let log = repo.find_by_poll("poll1").await.unwrap();

        assert_eq!(log.len(), 3);
        assert_eq!(log[2].user_id, "alice");
        assert_eq!(log[2].selected_option, 1);
    }
}
