//! In-process backend.
//!
//! One explicit store object per app session, shared by cloning. Used by the
//! demo binary when no database is configured and by the integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use connect_common::{AppError, AppResult, IdGenerator};
use tokio::sync::RwLock;

use super::{IdeaCatalog, NewIdea, NewPoll, ReactionLogStore, VoteLogStore};
use crate::aggregator::summarize_reactions;
use crate::model::{
    Idea, IdeaStatus, IdeaWithPoll, OptionIndex, Poll, Reaction, ReactionChoice, UserRole,
    VoteResponse,
};

#[derive(Debug, Default)]
struct Tables {
    ideas: Vec<Idea>,
    polls: Vec<Poll>,
    responses: Vec<VoteResponse>,
    reactions: Vec<Reaction>,
}

impl Tables {
    fn with_poll(&self, idea: &Idea) -> IdeaWithPoll {
        let mut idea = idea.clone();
        idea.reactions = Some(summarize_reactions(&self.reactions, &idea.id));
        let poll = self.polls.iter().find(|p| p.idea_id == idea.id).cloned();
        IdeaWithPoll { idea, poll }
    }
}

/// In-memory store implementing every collaborator interface.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<RwLock<Tables>>,
    id_gen: IdGenerator,
}

impl MemoryBackend {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response row with an explicit timestamp.
    ///
    /// Stands in for writes made by other sessions or devices.
    pub async fn append_vote_at(
        &self,
        poll_id: &str,
        user_id: &str,
        selected_option: OptionIndex,
        created_at: DateTime<Utc>,
    ) -> VoteResponse {
        let row = VoteResponse {
            id: self.id_gen.generate(),
            poll_id: poll_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_id.to_string(),
            user_role: UserRole::Employee,
            selected_option,
            created_at,
        };
        self.tables.write().await.responses.push(row.clone());
        row
    }

    /// Number of response rows stored for a poll.
    pub async fn response_count(&self, poll_id: &str) -> usize {
        self.tables
            .read()
            .await
            .responses
            .iter()
            .filter(|r| r.poll_id == poll_id)
            .count()
    }
}

#[async_trait]
impl VoteLogStore for MemoryBackend {
    async fn fetch_vote_log(&self, poll_id: &str) -> AppResult<Vec<VoteResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .responses
            .iter()
            .filter(|r| r.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn append_vote(
        &self,
        poll_id: &str,
        user_id: &str,
        user_name: &str,
        user_role: UserRole,
        selected_option: OptionIndex,
    ) -> AppResult<VoteResponse> {
        let mut tables = self.tables.write().await;
        if !tables.polls.iter().any(|p| p.id == poll_id) {
            return Err(AppError::NotFound(format!("Poll not found: {poll_id}")));
        }

        let row = VoteResponse {
            id: self.id_gen.generate(),
            poll_id: poll_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            user_role,
            selected_option,
            created_at: Utc::now(),
        };
        tables.responses.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl IdeaCatalog for MemoryBackend {
    async fn fetch_ideas_with_polls(
        &self,
        filter_by_status: Option<&[IdeaStatus]>,
    ) -> AppResult<Vec<IdeaWithPoll>> {
        let tables = self.tables.read().await;
        let mut ideas: Vec<IdeaWithPoll> = tables
            .ideas
            .iter()
            .rev()
            .filter(|idea| filter_by_status.is_none_or(|statuses| statuses.contains(&idea.status)))
            .map(|idea| tables.with_poll(idea))
            .collect();
        // Stable sort keeps later insertions first among equal timestamps.
        ideas.sort_by(|a, b| b.idea.created_at.cmp(&a.idea.created_at));
        Ok(ideas)
    }

    async fn find_idea(&self, idea_id: &str) -> AppResult<Option<IdeaWithPoll>> {
        let tables = self.tables.read().await;
        Ok(tables
            .ideas
            .iter()
            .find(|idea| idea.id == idea_id)
            .map(|idea| tables.with_poll(idea)))
    }

    async fn insert_idea(&self, idea: NewIdea) -> AppResult<Idea> {
        let created = Idea {
            id: self.id_gen.generate(),
            title: idea.title,
            description: idea.description,
            category: idea.category,
            status: IdeaStatus::Pending,
            submitter: idea.submitter,
            created_at: Utc::now(),
            updated_at: None,
            reactions: None,
        };
        self.tables.write().await.ideas.push(created.clone());
        Ok(created)
    }

    async fn set_idea_status(
        &self,
        idea_id: &str,
        status: IdeaStatus,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Idea> {
        let mut tables = self.tables.write().await;
        let idea = tables
            .ideas
            .iter_mut()
            .find(|idea| idea.id == idea_id)
            .ok_or_else(|| AppError::NotFound(format!("Idea not found: {idea_id}")))?;

        idea.status = status;
        idea.updated_at = Some(updated_at);
        Ok(idea.clone())
    }

    async fn insert_poll(&self, poll: NewPoll) -> AppResult<Poll> {
        let mut tables = self.tables.write().await;
        if !tables.ideas.iter().any(|idea| idea.id == poll.idea_id) {
            return Err(AppError::NotFound(format!("Idea not found: {}", poll.idea_id)));
        }
        if tables.polls.iter().any(|p| p.idea_id == poll.idea_id) {
            return Err(AppError::Conflict(format!(
                "Idea already has a poll: {}",
                poll.idea_id
            )));
        }

        let created = Poll {
            id: self.id_gen.generate(),
            idea_id: poll.idea_id,
            question: poll.question,
            options: poll.options,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.polls.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl ReactionLogStore for MemoryBackend {
    async fn fetch_reactions(&self, idea_id: &str) -> AppResult<Vec<Reaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reactions
            .iter()
            .filter(|r| r.idea_id == idea_id)
            .cloned()
            .collect())
    }

    async fn append_reaction(
        &self,
        idea_id: &str,
        user_id: &str,
        choice: ReactionChoice,
    ) -> AppResult<Reaction> {
        let mut tables = self.tables.write().await;
        if !tables.ideas.iter().any(|idea| idea.id == idea_id) {
            return Err(AppError::NotFound(format!("Idea not found: {idea_id}")));
        }

        let row = Reaction {
            id: self.id_gen.generate(),
            idea_id: idea_id.to_string(),
            user_id: user_id.to_string(),
            choice,
            created_at: Utc::now(),
        };
        tables.reactions.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Submitter;

    fn new_idea(title: &str) -> NewIdea {
        NewIdea {
            title: title.to_string(),
            description: "Details".to_string(),
            category: "workplace".to_string(),
            submitter: Submitter {
                id: "user1".to_string(),
                name: "Alex".to_string(),
                role: UserRole::Employee,
            },
        }
    }

    #[tokio::test]
    async fn test_polls_are_matched_to_ideas() {
        let backend = MemoryBackend::new();
        let with_poll = backend.insert_idea(new_idea("First")).await.unwrap();
        let without_poll = backend.insert_idea(new_idea("Second")).await.unwrap();
        backend
            .insert_poll(NewPoll {
                idea_id: with_poll.id.clone(),
                question: "When?".to_string(),
                options: vec!["Now".to_string(), "Later".to_string()],
            })
            .await
            .unwrap();

        let ideas = backend.fetch_ideas_with_polls(None).await.unwrap();

        assert_eq!(ideas.len(), 2);
        let first = ideas.iter().find(|i| i.idea.id == with_poll.id).unwrap();
        let second = ideas.iter().find(|i| i.idea.id == without_poll.id).unwrap();
        assert!(first.poll.is_some());
        assert!(second.poll.is_none());
    }

    #[tokio::test]
    async fn test_status_filter() {
        let backend = MemoryBackend::new();
        let approved = backend.insert_idea(new_idea("Approved")).await.unwrap();
        backend.insert_idea(new_idea("Pending")).await.unwrap();
        backend
            .set_idea_status(&approved.id, IdeaStatus::Approved, Utc::now())
            .await
            .unwrap();

        let ideas = backend
            .fetch_ideas_with_polls(Some(&[IdeaStatus::Approved]))
            .await
            .unwrap();

        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].idea.id, approved.id);
    }

    #[tokio::test]
    async fn test_second_poll_for_idea_conflicts() {
        let backend = MemoryBackend::new();
        let idea = backend.insert_idea(new_idea("Idea")).await.unwrap();
        let poll = NewPoll {
            idea_id: idea.id.clone(),
            question: "Which?".to_string(),
            options: vec!["A".to_string(), "B".to_string()],
        };

        backend.insert_poll(poll.clone()).await.unwrap();
        let result = backend.insert_poll(poll).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_vote_log_is_append_only() {
        let backend = MemoryBackend::new();
        let idea = backend.insert_idea(new_idea("Idea")).await.unwrap();
        let poll = backend
            .insert_poll(NewPoll {
                idea_id: idea.id,
                question: "Which?".to_string(),
                options: vec!["A".to_string(), "B".to_string()],
            })
            .await
            .unwrap();

        backend
            .append_vote(&poll.id, "user1", "Alex", UserRole::Employee, 0)
            .await
            .unwrap();
        backend
            .append_vote(&poll.id, "user1", "Alex", UserRole::Employee, 1)
            .await
            .unwrap();

        let log = backend.fetch_vote_log(&poll.id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].selected_option, 0);
        assert_eq!(log[1].selected_option, 1);
    }

    #[tokio::test]
    async fn test_append_vote_unknown_poll() {
        let backend = MemoryBackend::new();

        let result = backend
            .append_vote("missing", "user1", "Alex", UserRole::Admin, 0)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
