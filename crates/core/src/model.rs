//! Domain types shared by the aggregator, the cache and the services.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use connect_db::entities::{IdeaStatus, ReactionChoice, UserRole};

/// Index into [`Poll::options`].
pub type OptionIndex = u32;

/// The signed-in user of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether the user may moderate ideas and create polls.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// A single-question poll attached to an idea. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub idea_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// Whether `option` indexes one of this poll's options.
    #[must_use]
    pub fn has_option(&self, option: OptionIndex) -> bool {
        (option as usize) < self.options.len()
    }
}

/// One append-only record of a user's choice on a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub id: String,
    pub poll_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_role: UserRole,
    pub selected_option: OptionIndex,
    pub created_at: DateTime<Utc>,
}

/// Per-option vote counts derived from a response log.
///
/// Options nobody currently picks are absent from `options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Number of distinct voters.
    pub total: u64,
    pub options: BTreeMap<OptionIndex, u64>,
}

impl AggregateResult {
    /// Votes currently counted for `option`.
    #[must_use]
    pub fn count(&self, option: OptionIndex) -> u64 {
        self.options.get(&option).copied().unwrap_or(0)
    }

    pub(crate) fn add_vote(&mut self, option: OptionIndex) {
        *self.options.entry(option).or_insert(0) += 1;
    }

    pub(crate) fn remove_vote(&mut self, option: OptionIndex) {
        if let Some(count) = self.options.get_mut(&option) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.options.remove(&option);
            }
        }
    }
}

/// Identity of the user who submitted an idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
    pub id: String,
    pub name: String,
    pub role: UserRole,
}

/// An idea on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: IdeaStatus,
    pub submitter: Submitter,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Like/dislike counts, when the backend loaded them.
    pub reactions: Option<ReactionSummary>,
}

/// An idea together with its poll, matched by foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaWithPoll {
    pub idea: Idea,
    pub poll: Option<Poll>,
}

/// One append-only like/dislike record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub idea_id: String,
    pub user_id: String,
    pub choice: ReactionChoice,
    pub created_at: DateTime<Utc>,
}

/// Like/dislike counts derived from a reaction log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub likes: u64,
    pub dislikes: u64,
}

/// A row of an append-only, latest-row-wins log.
pub trait LogEntry {
    /// The poll or idea the row belongs to.
    fn subject_id(&self) -> &str;
    fn user_id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

impl LogEntry for VoteResponse {
    fn subject_id(&self) -> &str {
        &self.poll_id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl LogEntry for Reaction {
    fn subject_id(&self) -> &str {
        &self.idea_id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
