//! Idea service.

use std::sync::Arc;

use chrono::Utc;
use connect_common::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::backend::{IdeaCatalog, NewIdea, NewPoll};
use crate::identity::IdentityProvider;
use crate::model::{CurrentUser, Idea, IdeaStatus, Poll, Submitter};

/// Maximum number of characters in a poll option.
const MAX_OPTION_CHARS: usize = 100;

/// Input for submitting an idea.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitIdeaInput {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
}

/// Input for attaching a poll to an idea.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePollInput {
    #[validate(length(min = 1, max = 200))]
    pub question: String,
    #[validate(length(min = 2, max = 10))]
    pub options: Vec<String>,
}

/// Whether an idea may move from `from` to `to`.
#[must_use]
pub const fn can_transition(from: IdeaStatus, to: IdeaStatus) -> bool {
    matches!(
        (from, to),
        (
            IdeaStatus::Pending,
            IdeaStatus::InProgress | IdeaStatus::Approved | IdeaStatus::Rejected
        ) | (
            IdeaStatus::InProgress,
            IdeaStatus::Approved | IdeaStatus::Rejected
        ) | (IdeaStatus::Approved, IdeaStatus::InProgress)
    )
}

/// Whether polls may be attached to ideas in `status`.
#[must_use]
pub const fn accepts_polls(status: IdeaStatus) -> bool {
    matches!(status, IdeaStatus::Approved | IdeaStatus::InProgress)
}

/// Idea service for business logic.
#[derive(Clone)]
pub struct IdeaService {
    catalog: Arc<dyn IdeaCatalog>,
    identity: Arc<dyn IdentityProvider>,
}

impl IdeaService {
    /// Create a new idea service.
    #[must_use]
    pub fn new(catalog: Arc<dyn IdeaCatalog>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { catalog, identity }
    }

    /// Submit a new idea as the signed-in user.
    pub async fn submit(&self, input: SubmitIdeaInput) -> AppResult<Idea> {
        let user = self.identity.current_user().ok_or(AppError::AuthRequired)?;

        input.validate()?;
        let title = non_blank("title", &input.title)?;
        let description = non_blank("description", &input.description)?;
        let category = non_blank("category", &input.category)?;

        let idea = self
            .catalog
            .insert_idea(NewIdea {
                title,
                description,
                category,
                submitter: Submitter {
                    id: user.id,
                    name: user.name,
                    role: user.role,
                },
            })
            .await?;

        info!(idea_id = %idea.id, submitter = %idea.submitter.id, "Idea submitted");
        Ok(idea)
    }

    /// Move an idea to a new status. Admin only.
    pub async fn set_status(&self, idea_id: &str, status: IdeaStatus) -> AppResult<Idea> {
        let admin = self.require_admin()?;

        let current = self
            .catalog
            .find_idea(idea_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Idea not found: {idea_id}")))?
            .idea;

        if !can_transition(current.status, status) {
            return Err(AppError::BadRequest(format!(
                "Cannot move idea from {:?} to {status:?}",
                current.status
            )));
        }

        let idea = self
            .catalog
            .set_idea_status(idea_id, status, Utc::now())
            .await?;

        info!(
            idea_id,
            from = ?current.status,
            to = ?status,
            admin = %admin.id,
            "Idea status changed"
        );
        Ok(idea)
    }

    /// Attach a poll to an approved or in-progress idea. Admin only.
    pub async fn create_poll(&self, idea_id: &str, input: CreatePollInput) -> AppResult<Poll> {
        let admin = self.require_admin()?;

        input.validate()?;
        let question = non_blank("question", &input.question)?;
        for option in &input.options {
            if option.trim().is_empty() {
                return Err(AppError::BadRequest(
                    "Poll options cannot be empty".to_string(),
                ));
            }
            if option.chars().count() > MAX_OPTION_CHARS {
                return Err(AppError::BadRequest(format!(
                    "Poll option is too long (max {MAX_OPTION_CHARS} chars)"
                )));
            }
        }

        let existing = self
            .catalog
            .find_idea(idea_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Idea not found: {idea_id}")))?;

        if !accepts_polls(existing.idea.status) {
            return Err(AppError::BadRequest(format!(
                "Polls require an approved or in-progress idea, found {:?}",
                existing.idea.status
            )));
        }
        if existing.poll.is_some() {
            return Err(AppError::Conflict(format!(
                "Idea already has a poll: {idea_id}"
            )));
        }

        let poll = self
            .catalog
            .insert_poll(NewPoll {
                idea_id: idea_id.to_string(),
                question,
                options: input.options.iter().map(|o| o.trim().to_string()).collect(),
            })
            .await?;

        info!(poll_id = %poll.id, idea_id, admin = %admin.id, "Poll created");
        Ok(poll)
    }

    fn require_admin(&self) -> AppResult<CurrentUser> {
        let user = self.identity.current_user().ok_or(AppError::AuthRequired)?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin role required".to_string()));
        }
        Ok(user)
    }
}

fn non_blank(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be blank")));
    }
    Ok(trimmed.to_string())
}
