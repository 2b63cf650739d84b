//! Collaborator interfaces to the hosted backend.
//!
//! The core never owns persistent state. It reads and appends through these
//! traits, so the same services run against [`MemoryBackend`] in tests and
//! [`DatabaseBackend`] in deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use connect_common::AppResult;

use crate::model::{
    Idea, IdeaStatus, IdeaWithPoll, OptionIndex, Poll, Reaction, ReactionChoice, Submitter,
    UserRole, VoteResponse,
};

pub mod database;
pub mod memory;

pub use database::DatabaseBackend;
pub use memory::MemoryBackend;

/// Append-only poll response log.
#[async_trait]
pub trait VoteLogStore: Send + Sync {
    /// Read the full response log of a poll in insertion order.
    async fn fetch_vote_log(&self, poll_id: &str) -> AppResult<Vec<VoteResponse>>;

    /// Append one response row. Earlier rows are never modified.
    async fn append_vote(
        &self,
        poll_id: &str,
        user_id: &str,
        user_name: &str,
        user_role: UserRole,
        selected_option: OptionIndex,
    ) -> AppResult<VoteResponse>;
}

/// A new idea as stored by [`IdeaCatalog::insert_idea`].
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct NewIdea {
    pub title: String,
    pub description: String,
    pub category: String,
    pub submitter: Submitter,
}

/// A new poll as stored by [`IdeaCatalog::insert_poll`].
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct NewPoll {
    pub idea_id: String,
    pub question: String,
    pub options: Vec<String>,
}

/// Ideas and their polls.
#[async_trait]
pub trait IdeaCatalog: Send + Sync {
    /// Bulk read of ideas, newest first, each matched with its poll.
    async fn fetch_ideas_with_polls(
        &self,
        filter_by_status: Option<&[IdeaStatus]>,
    ) -> AppResult<Vec<IdeaWithPoll>>;

    /// Read one idea and its poll.
    async fn find_idea(&self, idea_id: &str) -> AppResult<Option<IdeaWithPoll>>;

    /// Store a new idea with status `Pending`.
    async fn insert_idea(&self, idea: NewIdea) -> AppResult<Idea>;

    /// Change an idea's status.
    async fn set_idea_status(
        &self,
        idea_id: &str,
        status: IdeaStatus,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Idea>;

    /// Store a new active poll.
    async fn insert_poll(&self, poll: NewPoll) -> AppResult<Poll>;
}

/// Append-only like/dislike log.
#[async_trait]
pub trait ReactionLogStore: Send + Sync {
    /// Read the reaction log of an idea in insertion order.
    async fn fetch_reactions(&self, idea_id: &str) -> AppResult<Vec<Reaction>>;

    /// Append one reaction row.
    async fn append_reaction(
        &self,
        idea_id: &str,
        user_id: &str,
        choice: ReactionChoice,
    ) -> AppResult<Reaction>;
}
