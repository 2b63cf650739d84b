//! Reaction service.

use std::sync::Arc;
use std::time::Duration;

use connect_common::{AppError, AppResult, RetryPolicy, SyncConfig};
use serde::Serialize;
use tokio::time::timeout;
use tracing::info;

use crate::aggregator::{current_reaction_of, summarize_reactions};
use crate::backend::ReactionLogStore;
use crate::identity::IdentityProvider;
use crate::model::{Reaction, ReactionChoice, ReactionSummary};

/// Reactions on one idea as seen by the session user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReactionState {
    pub summary: ReactionSummary,
    /// `None` when the user has no reaction or withdrew it.
    pub current: Option<ReactionChoice>,
}

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    reactions: Arc<dyn ReactionLogStore>,
    identity: Arc<dyn IdentityProvider>,
    write_timeout: Duration,
    fetch_timeout: Duration,
    retry: RetryPolicy,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub fn new(
        reactions: Arc<dyn ReactionLogStore>,
        identity: Arc<dyn IdentityProvider>,
        sync: &SyncConfig,
    ) -> Self {
        Self {
            reactions,
            identity,
            write_timeout: sync.write_timeout(),
            fetch_timeout: sync.fetch_timeout(),
            retry: sync.retry_policy(),
        }
    }

    /// Current reactions on an idea.
    pub async fn state(&self, idea_id: &str) -> AppResult<ReactionState> {
        let log = self.fetch(idea_id).await?;
        let current = self
            .identity
            .current_user()
            .and_then(|user| current_reaction_of(&log, idea_id, &user.id));

        Ok(ReactionState {
            summary: summarize_reactions(&log, idea_id),
            current,
        })
    }

    /// Like or dislike an idea.
    ///
    /// Repeating the current choice withdraws it.
    pub async fn react(&self, idea_id: &str, choice: ReactionChoice) -> AppResult<ReactionState> {
        let user = self.identity.current_user().ok_or(AppError::AuthRequired)?;
        if choice == ReactionChoice::Withdrawn {
            return Err(AppError::BadRequest(
                "Use withdraw to clear a reaction".to_string(),
            ));
        }

        let mut log = self.fetch(idea_id).await?;
        let next = if current_reaction_of(&log, idea_id, &user.id) == Some(choice) {
            ReactionChoice::Withdrawn
        } else {
            choice
        };

        log.push(self.append(idea_id, &user.id, next).await?);

        info!(idea_id, user_id = %user.id, choice = ?next, "Reaction recorded");

        Ok(ReactionState {
            summary: summarize_reactions(&log, idea_id),
            current: current_reaction_of(&log, idea_id, &user.id),
        })
    }

    /// Clear the session user's reaction, if any.
    pub async fn withdraw(&self, idea_id: &str) -> AppResult<ReactionState> {
        let user = self.identity.current_user().ok_or(AppError::AuthRequired)?;

        let mut log = self.fetch(idea_id).await?;
        if current_reaction_of(&log, idea_id, &user.id).is_some() {
            log.push(self.append(idea_id, &user.id, ReactionChoice::Withdrawn).await?);
        }

        Ok(ReactionState {
            summary: summarize_reactions(&log, idea_id),
            current: None,
        })
    }

    async fn append(
        &self,
        idea_id: &str,
        user_id: &str,
        choice: ReactionChoice,
    ) -> AppResult<Reaction> {
        timeout(
            self.write_timeout,
            self.reactions.append_reaction(idea_id, user_id, choice),
        )
        .await
        .map_err(|_| {
            AppError::WriteFailed(format!(
                "Reaction write timed out after {}ms",
                self.write_timeout.as_millis()
            ))
        })?
    }

    async fn fetch(&self, idea_id: &str) -> AppResult<Vec<Reaction>> {
        self.retry
            .run("fetch_reactions", || async move {
                timeout(self.fetch_timeout, self.reactions.fetch_reactions(idea_id)).await?
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::backend::{IdeaCatalog, MemoryBackend, NewIdea};
    use crate::identity::SessionIdentity;
    use crate::model::{CurrentUser, Submitter, UserRole};

    async fn seeded() -> (MemoryBackend, String) {
        let backend = MemoryBackend::new();
        let idea = backend
            .insert_idea(NewIdea {
                title: "Bike racks".to_string(),
                description: "Near the entrance".to_string(),
                category: "facilities".to_string(),
                submitter: Submitter {
                    id: "bob".to_string(),
                    name: "Bob".to_string(),
                    role: UserRole::Employee,
                },
            })
            .await
            .unwrap();
        (backend, idea.id)
    }

    fn service(backend: &MemoryBackend, user_id: &str) -> ReactionService {
        let identity = SessionIdentity::signed_in(CurrentUser {
            id: user_id.to_string(),
            name: user_id.to_string(),
            role: UserRole::Employee,
        });
        ReactionService::new(
            Arc::new(backend.clone()),
            Arc::new(identity),
            &SyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_switching_reaction_moves_count() {
        let (backend, idea_id) = seeded().await;
        let alice = service(&backend, "alice");

        alice.react(&idea_id, ReactionChoice::Like).await.unwrap();
        let state = alice.react(&idea_id, ReactionChoice::Dislike).await.unwrap();

        assert_eq!(state.summary, ReactionSummary { likes: 0, dislikes: 1 });
        assert_eq!(state.current, Some(ReactionChoice::Dislike));
    }

    #[tokio::test]
    async fn test_repeating_reaction_withdraws_it() {
        let (backend, idea_id) = seeded().await;
        let alice = service(&backend, "alice");
        let bob = service(&backend, "bob");

        bob.react(&idea_id, ReactionChoice::Like).await.unwrap();
        alice.react(&idea_id, ReactionChoice::Like).await.unwrap();
        let state = alice.react(&idea_id, ReactionChoice::Like).await.unwrap();

        assert_eq!(state.summary, ReactionSummary { likes: 1, dislikes: 0 });
        assert_eq!(state.current, None);
    }

    #[tokio::test]
    async fn test_withdraw_without_reaction_writes_nothing() {
        let (backend, idea_id) = seeded().await;
        let alice = service(&backend, "alice");

        let state = alice.withdraw(&idea_id).await.unwrap();

        assert_eq!(state.summary, ReactionSummary::default());
        assert!(backend.fetch_reactions(&idea_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_react_requires_identity() {
        let (backend, idea_id) = seeded().await;
        let service = ReactionService::new(
            Arc::new(backend),
            Arc::new(SessionIdentity::signed_out()),
            &SyncConfig::default(),
        );

        let result = service.react(&idea_id, ReactionChoice::Like).await;

        assert!(matches!(result, Err(AppError::AuthRequired)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_reaction_write_times_out() {
        struct StalledWrites(MemoryBackend);

        #[async_trait]
        impl ReactionLogStore for StalledWrites {
            async fn fetch_reactions(&self, idea_id: &str) -> AppResult<Vec<Reaction>> {
                self.0.fetch_reactions(idea_id).await
            }

            async fn append_reaction(
                &self,
                _idea_id: &str,
                _user_id: &str,
                _choice: ReactionChoice,
            ) -> AppResult<Reaction> {
                std::future::pending().await
            }
        }

        let (backend, idea_id) = seeded().await;
        let service = ReactionService::new(
            Arc::new(StalledWrites(backend.clone())),
            Arc::new(SessionIdentity::signed_in(CurrentUser {
                id: "alice".to_string(),
                name: "Alice".to_string(),
                role: UserRole::Employee,
            })),
            &SyncConfig::default(),
        );

        let result = service.react(&idea_id, ReactionChoice::Like).await;

        assert!(matches!(result, Err(AppError::WriteFailed(_))));
        assert!(backend.fetch_reactions(&idea_id).await.unwrap().is_empty());
    }
}
