//! Voting service.
//!
//! Drives the optimistic cache for one user session: votes are applied
//! locally, written to the log, then reconciled against the aggregated log as
//! soon as the write completes.

use std::sync::Arc;
use std::time::Duration;

use connect_common::{AppError, AppResult, RetryPolicy, SyncConfig};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::aggregator::{aggregate_poll, latest_vote_of};
use crate::backend::{IdeaCatalog, VoteLogStore};
use crate::cache::{OptimisticVoteCache, PollSnapshot, ReconcileOutcome, ReconcileTicket};
use crate::identity::IdentityProvider;
use crate::model::{Idea, IdeaStatus, IdeaWithPoll, OptionIndex, Poll};

/// A poll as rendered on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollView {
    pub poll: Poll,
    pub snapshot: PollSnapshot,
}

/// An idea as rendered on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdeaView {
    pub idea: Idea,
    pub poll: Option<PollView>,
}

/// Result of [`VotingService::cast_vote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was written and the poll reconciled (or kept optimistic if
    /// the reconcile failed).
    Recorded(PollSnapshot),
    /// The user already had this vote; nothing was written.
    Unchanged(PollSnapshot),
}

impl VoteOutcome {
    /// The poll state after the vote.
    #[must_use]
    pub const fn snapshot(&self) -> &PollSnapshot {
        match self {
            Self::Recorded(snapshot) | Self::Unchanged(snapshot) => snapshot,
        }
    }
}

/// Voting service for one app session.
#[derive(Clone)]
pub struct VotingService {
    votes: Arc<dyn VoteLogStore>,
    catalog: Arc<dyn IdeaCatalog>,
    identity: Arc<dyn IdentityProvider>,
    cache: Arc<RwLock<OptimisticVoteCache>>,
    /// Last-known-good idea list.
    board: Arc<RwLock<Vec<IdeaWithPoll>>>,
    write_timeout: Duration,
    fetch_timeout: Duration,
    retry: RetryPolicy,
}

impl VotingService {
    /// Create a new voting service.
    #[must_use]
    pub fn new(
        votes: Arc<dyn VoteLogStore>,
        catalog: Arc<dyn IdeaCatalog>,
        identity: Arc<dyn IdentityProvider>,
        sync: &SyncConfig,
    ) -> Self {
        Self {
            votes,
            catalog,
            identity,
            cache: Arc::new(RwLock::new(OptimisticVoteCache::new())),
            board: Arc::new(RwLock::new(Vec::new())),
            write_timeout: sync.write_timeout(),
            fetch_timeout: sync.fetch_timeout(),
            retry: sync.retry_policy(),
        }
    }

    /// Reload the board and reconcile every poll on it.
    ///
    /// When the idea fetch fails the last-known-good list is returned,
    /// filtered the same way.
    pub async fn refresh(&self, filter_by_status: Option<&[IdeaStatus]>) -> Vec<IdeaView> {
        let fetched = self
            .retry
            .run("fetch_ideas_with_polls", || async move {
                timeout(
                    self.fetch_timeout,
                    self.catalog.fetch_ideas_with_polls(filter_by_status),
                )
                .await?
            })
            .await;

        let ideas = match fetched {
            Ok(ideas) => {
                let poll_ids: Vec<String> = ideas
                    .iter()
                    .filter_map(|i| i.poll.as_ref().map(|p| p.id.clone()))
                    .collect();

                *self.board.write().await = ideas.clone();

                let outcomes = join_all(poll_ids.iter().map(|id| self.reconcile(id))).await;
                let failed = outcomes
                    .iter()
                    .filter(|o| matches!(o, ReconcileOutcome::Failed))
                    .count();
                info!(
                    ideas = ideas.len(),
                    polls = poll_ids.len(),
                    failed,
                    "Refreshed idea board"
                );
                ideas
            }
            Err(e) => {
                e.log();
                warn!("Idea fetch failed, keeping last-known-good board");
                self.board
                    .read()
                    .await
                    .iter()
                    .filter(|i| filter_by_status.is_none_or(|s| s.contains(&i.idea.status)))
                    .cloned()
                    .collect()
            }
        };

        self.views(ideas).await
    }

    /// Cached state of one poll.
    pub async fn snapshot(&self, poll_id: &str) -> Option<PollSnapshot> {
        self.cache.read().await.snapshot(poll_id)
    }

    /// Replace a poll's counts with the aggregate of its full log.
    ///
    /// Failures keep the cached state and are reported as
    /// [`ReconcileOutcome::Failed`]; results superseded by a newer reconcile
    /// are dropped as [`ReconcileOutcome::Stale`].
    pub async fn reconcile(&self, poll_id: &str) -> ReconcileOutcome {
        let ticket = self.cache.write().await.begin_reconcile(poll_id);
        self.finish(ticket).await
    }

    /// Cast or change the session user's vote.
    ///
    /// A failed write rolls the vote back and resyncs the poll from the log,
    /// since the rolled-back vote may have superseded a pending reconcile.
    pub async fn cast_vote(&self, poll_id: &str, option: OptionIndex) -> AppResult<VoteOutcome> {
        let user = self.identity.current_user().ok_or(AppError::AuthRequired)?;

        let poll = self.known_poll(poll_id).await?;
        if !poll.is_active {
            return Err(AppError::BadRequest("Poll is closed".to_string()));
        }
        if !poll.has_option(option) {
            return Err(AppError::BadRequest(format!(
                "Option {option} is out of range for {} options",
                poll.options.len()
            )));
        }

        let token = self
            .cache
            .write()
            .await
            .apply_local_vote(poll_id, &user.id, option);

        if token.is_noop() {
            debug!(poll_id, user_id = %user.id, option, "Vote unchanged, skipping write");
            return Ok(VoteOutcome::Unchanged(self.current(poll_id).await));
        }

        let write = timeout(
            self.write_timeout,
            self.votes
                .append_vote(poll_id, &user.id, &user.name, user.role, option),
        )
        .await
        .map_err(|_| {
            AppError::WriteFailed(format!(
                "Vote write timed out after {}ms",
                self.write_timeout.as_millis()
            ))
        })
        .and_then(|result| result);

        let confirmed = self.cache.write().await.confirm_vote(token, write);
        let ticket = match confirmed {
            Ok(ticket) => ticket,
            Err(e) => {
                e.log();
                warn!(poll_id, user_id = %user.id, "Vote rolled back");
                let resync = self.reconcile(poll_id).await;
                debug!(poll_id, ?resync, "Resynced poll after rollback");
                return Err(e);
            }
        };

        info!(poll_id, user_id = %user.id, option, "Vote recorded");

        self.finish(ticket).await;
        Ok(VoteOutcome::Recorded(self.current(poll_id).await))
    }

    async fn finish(&self, ticket: ReconcileTicket) -> ReconcileOutcome {
        let poll_id = ticket.poll_id();

        let fetched = self
            .retry
            .run("fetch_vote_log", || async move {
                timeout(self.fetch_timeout, self.votes.fetch_vote_log(poll_id)).await?
            })
            .await;

        let log = match fetched {
            Ok(log) => log,
            Err(e) => {
                let error = AppError::ReconcileFailed(e.to_string());
                warn!(poll_id, error = %error, "Keeping cached poll state");
                return ReconcileOutcome::Failed;
            }
        };

        let counts = aggregate_poll(&log, poll_id);
        let server_vote = self
            .identity
            .current_user()
            .and_then(|user| latest_vote_of(&log, poll_id, &user.id));

        let outcome = self
            .cache
            .write()
            .await
            .finish_reconcile(&ticket, counts, server_vote);

        if outcome == ReconcileOutcome::Stale {
            debug!(
                poll_id,
                token = ticket.token(),
                error = %AppError::StaleReconcile,
                "Dropped reconcile result"
            );
        }
        outcome
    }

    async fn known_poll(&self, poll_id: &str) -> AppResult<Poll> {
        self.board
            .read()
            .await
            .iter()
            .filter_map(|i| i.poll.as_ref())
            .find(|p| p.id == poll_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))
    }

    async fn current(&self, poll_id: &str) -> PollSnapshot {
        self.snapshot(poll_id).await.unwrap_or_default()
    }

    async fn views(&self, ideas: Vec<IdeaWithPoll>) -> Vec<IdeaView> {
        let cache = self.cache.read().await;
        ideas
            .into_iter()
            .map(|IdeaWithPoll { idea, poll }| IdeaView {
                idea,
                poll: poll.map(|poll| PollView {
                    snapshot: cache.snapshot(&poll.id).unwrap_or_default(),
                    poll,
                }),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, NewIdea, NewPoll};
    use crate::identity::SessionIdentity;
    use crate::model::{CurrentUser, Submitter, UserRole};
    use chrono::{Duration as ChronoDuration, Utc};
    use maplit::btreemap;

    fn alice() -> CurrentUser {
        CurrentUser {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            role: UserRole::Employee,
        }
    }

    async fn seeded() -> (MemoryBackend, String) {
        let backend = MemoryBackend::new();
        let idea = backend
            .insert_idea(NewIdea {
                title: "Standing desks".to_string(),
                description: "For the second floor".to_string(),
                category: "facilities".to_string(),
                submitter: Submitter {
                    id: "bob".to_string(),
                    name: "Bob".to_string(),
                    role: UserRole::Employee,
                },
            })
            .await
            .unwrap();
        let poll = backend
            .insert_poll(NewPoll {
                idea_id: idea.id,
                question: "Should we?".to_string(),
                options: vec!["Yes".to_string(), "No".to_string(), "Maybe".to_string()],
            })
            .await
            .unwrap();
        (backend, poll.id)
    }

    fn service(backend: &MemoryBackend, identity: SessionIdentity) -> VotingService {
        VotingService::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Arc::new(identity),
            &SyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_vote_then_revote() {
        let (backend, poll_id) = seeded().await;
        let service = service(&backend, SessionIdentity::signed_in(alice()));
        service.refresh(None).await;

        let first = service.cast_vote(&poll_id, 0).await.unwrap();
        assert_eq!(first.snapshot().counts.options, btreemap! { 0 => 1 });
        assert_eq!(first.snapshot().counts.total, 1);

        let second = service.cast_vote(&poll_id, 1).await.unwrap();
        assert_eq!(second.snapshot().counts.options, btreemap! { 1 => 1 });
        assert_eq!(second.snapshot().counts.total, 1);
        assert_eq!(second.snapshot().current_user_vote, Some(1));
        assert_eq!(backend.response_count(&poll_id).await, 2);
    }

    #[tokio::test]
    async fn test_repeated_vote_is_not_written() {
        let (backend, poll_id) = seeded().await;
        let service = service(&backend, SessionIdentity::signed_in(alice()));
        service.refresh(None).await;

        service.cast_vote(&poll_id, 2).await.unwrap();
        let again = service.cast_vote(&poll_id, 2).await.unwrap();

        assert!(matches!(again, VoteOutcome::Unchanged(_)));
        assert_eq!(again.snapshot().counts.total, 1);
        assert_eq!(backend.response_count(&poll_id).await, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_option() {
        let (backend, poll_id) = seeded().await;
        let service = service(&backend, SessionIdentity::signed_in(alice()));
        service.refresh(None).await;

        let result = service.cast_vote(&poll_id, 3).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(service.snapshot(&poll_id).await.unwrap().current_user_vote.is_none());
    }

    #[tokio::test]
    async fn test_unknown_poll() {
        let (backend, _) = seeded().await;
        let service = service(&backend, SessionIdentity::signed_in(alice()));
        service.refresh(None).await;

        let result = service.cast_vote("missing", 0).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_vote_from_other_device() {
        let (backend, poll_id) = seeded().await;
        let service = service(&backend, SessionIdentity::signed_in(alice()));
        service.refresh(None).await;
        service.cast_vote(&poll_id, 0).await.unwrap();

        backend
            .append_vote_at(&poll_id, "alice", 2, Utc::now() + ChronoDuration::seconds(5))
            .await;
        let board = service.refresh(None).await;

        let poll = board[0].poll.as_ref().unwrap();
        assert_eq!(poll.snapshot.current_user_vote, Some(2));
        assert_eq!(poll.snapshot.counts.options, btreemap! { 2 => 1 });
    }
}
