//! Backend over the sea-orm repositories.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use connect_common::{AppError, AppResult, IdGenerator};
use connect_db::{
    entities::{idea, idea_reaction, poll, poll_response},
    repositories::{
        IdeaReactionRepository, IdeaRepository, PollRepository, PollResponseRepository,
    },
};
use sea_orm::{DatabaseConnection, Set};
use serde_json::json;

use super::{IdeaCatalog, NewIdea, NewPoll, ReactionLogStore, VoteLogStore};
use crate::aggregator::summarize_reactions;
use crate::model::{
    Idea, IdeaStatus, IdeaWithPoll, OptionIndex, Poll, Reaction, ReactionChoice, Submitter,
    UserRole, VoteResponse,
};

/// Backend persisting to `PostgreSQL`.
#[derive(Clone)]
pub struct DatabaseBackend {
    idea_repo: IdeaRepository,
    poll_repo: PollRepository,
    response_repo: PollResponseRepository,
    reaction_repo: IdeaReactionRepository,
    id_gen: IdGenerator,
}

impl DatabaseBackend {
    /// Create a backend sharing one connection pool across repositories.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            idea_repo: IdeaRepository::new(Arc::clone(&db)),
            poll_repo: PollRepository::new(Arc::clone(&db)),
            response_repo: PollResponseRepository::new(Arc::clone(&db)),
            reaction_repo: IdeaReactionRepository::new(db),
            id_gen: IdGenerator::new(),
        }
    }
}

fn to_idea(model: idea::Model) -> Idea {
    Idea {
        id: model.id,
        title: model.title,
        description: model.description,
        category: model.category,
        status: model.status,
        submitter: Submitter {
            id: model.submitter_id,
            name: model.submitter_name,
            role: model.submitter_role,
        },
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.map(|t| t.with_timezone(&Utc)),
        reactions: None,
    }
}

fn to_poll(model: poll::Model) -> AppResult<Poll> {
    let options: Vec<String> = serde_json::from_value(model.options)
        .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))?;

    Ok(Poll {
        id: model.id,
        idea_id: model.idea_id,
        question: model.question,
        options,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn to_vote(model: poll_response::Model) -> AppResult<VoteResponse> {
    let selected_option = OptionIndex::try_from(model.selected_option).map_err(|_| {
        AppError::Internal(format!(
            "Negative option index in response {}: {}",
            model.id, model.selected_option
        ))
    })?;

    Ok(VoteResponse {
        id: model.id,
        poll_id: model.poll_id,
        user_id: model.user_id,
        user_name: model.user_name,
        user_role: model.user_role,
        selected_option,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn to_reaction(model: idea_reaction::Model) -> Reaction {
    Reaction {
        id: model.id,
        idea_id: model.idea_id,
        user_id: model.user_id,
        choice: model.choice,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl VoteLogStore for DatabaseBackend {
    async fn fetch_vote_log(&self, poll_id: &str) -> AppResult<Vec<VoteResponse>> {
        self.response_repo
            .find_by_poll(poll_id)
            .await?
            .into_iter()
            .map(to_vote)
            .collect()
    }

    async fn append_vote(
        &self,
        poll_id: &str,
        user_id: &str,
        user_name: &str,
        user_role: UserRole,
        selected_option: OptionIndex,
    ) -> AppResult<VoteResponse> {
        let option = i32::try_from(selected_option)
            .map_err(|_| AppError::BadRequest("Invalid option".to_string()))?;

        let model = poll_response::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll_id.to_string()),
            user_id: Set(user_id.to_string()),
            user_name: Set(user_name.to_string()),
            user_role: Set(user_role),
            selected_option: Set(option),
            created_at: Set(Utc::now().into()),
        };

        to_vote(self.response_repo.create(model).await?)
    }
}

#[async_trait]
impl IdeaCatalog for DatabaseBackend {
    async fn fetch_ideas_with_polls(
        &self,
        filter_by_status: Option<&[IdeaStatus]>,
    ) -> AppResult<Vec<IdeaWithPoll>> {
        let ideas = self.idea_repo.find_by_statuses(filter_by_status).await?;
        let idea_ids: Vec<String> = ideas.iter().map(|i| i.id.clone()).collect();

        let mut polls: HashMap<String, Poll> = HashMap::new();
        for model in self.poll_repo.find_by_idea_ids(&idea_ids).await? {
            let poll = to_poll(model)?;
            polls.insert(poll.idea_id.clone(), poll);
        }

        let reactions: Vec<Reaction> = self
            .reaction_repo
            .find_by_ideas(&idea_ids)
            .await?
            .into_iter()
            .map(to_reaction)
            .collect();

        Ok(ideas
            .into_iter()
            .map(|model| {
                let mut idea = to_idea(model);
                idea.reactions = Some(summarize_reactions(&reactions, &idea.id));
                let poll = polls.remove(&idea.id);
                IdeaWithPoll { idea, poll }
            })
            .collect())
    }

    async fn find_idea(&self, idea_id: &str) -> AppResult<Option<IdeaWithPoll>> {
        let Some(model) = self.idea_repo.find_by_id(idea_id).await? else {
            return Ok(None);
        };

        let poll = self
            .poll_repo
            .find_by_idea_id(idea_id)
            .await?
            .map(to_poll)
            .transpose()?;

        Ok(Some(IdeaWithPoll {
            idea: to_idea(model),
            poll,
        }))
    }

    async fn insert_idea(&self, idea: NewIdea) -> AppResult<Idea> {
        let model = idea::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(idea.title),
            description: Set(idea.description),
            category: Set(idea.category),
            status: Set(IdeaStatus::Pending),
            submitter_id: Set(idea.submitter.id),
            submitter_name: Set(idea.submitter.name),
            submitter_role: Set(idea.submitter.role),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        Ok(to_idea(self.idea_repo.create(model).await?))
    }

    async fn set_idea_status(
        &self,
        idea_id: &str,
        status: IdeaStatus,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Idea> {
        let existing = self.idea_repo.get_by_id(idea_id).await?;

        let mut active: idea::ActiveModel = existing.into();
        active.status = Set(status);
        active.updated_at = Set(Some(updated_at.into()));

        Ok(to_idea(self.idea_repo.update(active).await?))
    }

    async fn insert_poll(&self, poll: NewPoll) -> AppResult<Poll> {
        if self.poll_repo.find_by_idea_id(&poll.idea_id).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Idea already has a poll: {}",
                poll.idea_id
            )));
        }

        let model = poll::ActiveModel {
            id: Set(self.id_gen.generate()),
            idea_id: Set(poll.idea_id),
            question: Set(poll.question),
            options: Set(json!(poll.options)),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        };

        to_poll(self.poll_repo.create(model).await?)
    }
}

#[async_trait]
impl ReactionLogStore for DatabaseBackend {
    async fn fetch_reactions(&self, idea_id: &str) -> AppResult<Vec<Reaction>> {
        Ok(self
            .reaction_repo
            .find_by_idea(idea_id)
            .await?
            .into_iter()
            .map(to_reaction)
            .collect())
    }

    async fn append_reaction(
        &self,
        idea_id: &str,
        user_id: &str,
        choice: ReactionChoice,
    ) -> AppResult<Reaction> {
        let model = idea_reaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            idea_id: Set(idea_id.to_string()),
            user_id: Set(user_id.to_string()),
            choice: Set(choice),
            created_at: Set(Utc::now().into()),
        };

        Ok(to_reaction(self.reaction_repo.create(model).await?))
    }
}
