//! Optimistic per-poll vote cache for one user session.
//!
//! Local votes are applied before the backend confirms them. Each entry keeps
//! a generation counter so a rollback never clobbers a newer local vote or a
//! reconciled server state, and a reconcile counter so only the most recently
//! issued reconcile may write its result.

use std::collections::HashMap;

use connect_common::{AppError, AppResult};
use serde::Serialize;
use tracing::debug;

use crate::model::{AggregateResult, OptionIndex};

/// What the UI renders for one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSnapshot {
    /// The session user's current vote.
    pub current_user_vote: Option<OptionIndex>,
    /// Vote counts, optimistic until the next reconcile.
    pub counts: AggregateResult,
}

#[derive(Debug, Default)]
struct PollEntry {
    snapshot: PollSnapshot,
    /// Bumped whenever `snapshot` changes.
    generation: u64,
    /// Latest reconcile token handed out.
    issued_reconcile: u64,
}

/// Captures the state before an optimistic vote so it can be undone.
#[derive(Debug, Clone)]
#[must_use = "a rollback token must be confirmed or rolled back"]
pub struct RollbackToken {
    poll_id: String,
    previous: PollSnapshot,
    generation: u64,
    /// Reconcile counter before and after the vote superseded it.
    reconcile_before: u64,
    reconcile_after: u64,
    changed: bool,
}

impl RollbackToken {
    /// The vote before the optimistic update.
    #[must_use]
    pub const fn previous_vote(&self) -> Option<OptionIndex> {
        self.previous.current_user_vote
    }

    /// Whether the vote changed anything. A repeated submission of the current
    /// vote is a no-op and needs no backend write.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        !self.changed
    }
}

/// Permission to write one reconcile result into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTicket {
    poll_id: String,
    token: u64,
}

impl ReconcileTicket {
    /// Poll being reconciled.
    #[must_use]
    pub fn poll_id(&self) -> &str {
        &self.poll_id
    }

    /// Monotonic per-poll token.
    #[must_use]
    pub const fn token(&self) -> u64 {
        self.token
    }
}

/// Result of a reconcile attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Server counts replaced the cached ones.
    Applied(PollSnapshot),
    /// A newer reconcile was issued; the result was discarded.
    Stale,
    /// Fetching the log failed; the cached state was kept.
    Failed,
}

/// Optimistic vote cache keyed by poll ID.
#[derive(Debug, Default)]
pub struct OptimisticVoteCache {
    entries: HashMap<String, PollEntry>,
}

impl OptimisticVoteCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view of a poll, if the cache knows it.
    #[must_use]
    pub fn snapshot(&self, poll_id: &str) -> Option<PollSnapshot> {
        self.entries.get(poll_id).map(|entry| entry.snapshot.clone())
    }

    /// The session user's current vote on a poll.
    #[must_use]
    pub fn current_vote(&self, poll_id: &str) -> Option<OptionIndex> {
        self.entries
            .get(poll_id)
            .and_then(|entry| entry.snapshot.current_user_vote)
    }

    /// Number of polls tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no poll is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a vote immediately.
    ///
    /// A revote moves the user's count between options and leaves `total`
    /// alone; a first vote increments `total`. Voting again for the current
    /// option changes nothing. Any reconcile already in flight for the poll is
    /// invalidated so it cannot overwrite the optimistic state.
    pub fn apply_local_vote(
        &mut self,
        poll_id: &str,
        user_id: &str,
        new_option: OptionIndex,
    ) -> RollbackToken {
        let entry = self.entries.entry(poll_id.to_string()).or_default();
        let previous = entry.snapshot.clone();
        let changed = previous.current_user_vote != Some(new_option);
        let reconcile_before = entry.issued_reconcile;

        if changed {
            let counts = &mut entry.snapshot.counts;
            match previous.current_user_vote {
                Some(old) => counts.remove_vote(old),
                None => counts.total += 1,
            }
            counts.add_vote(new_option);
            entry.snapshot.current_user_vote = Some(new_option);
            entry.generation += 1;
            entry.issued_reconcile += 1;
        }

        debug!(
            poll_id,
            user_id,
            new_option,
            previous = ?previous.current_user_vote,
            changed,
            "Applied local vote"
        );

        RollbackToken {
            poll_id: poll_id.to_string(),
            previous,
            generation: entry.generation,
            reconcile_before,
            reconcile_after: entry.issued_reconcile,
            changed,
        }
    }

    /// Restore the state captured by `token`.
    ///
    /// Returns `false` when the entry moved on since the token was issued (a
    /// newer local vote or an applied reconcile); that newer state is kept.
    ///
    /// A reconcile that was in flight when the vote was applied becomes the
    /// latest again, unless another reconcile has been issued since.
    pub fn rollback(&mut self, token: RollbackToken) -> bool {
        let Some(entry) = self.entries.get_mut(&token.poll_id) else {
            return false;
        };

        if !token.changed {
            return true;
        }

        if entry.generation != token.generation {
            debug!(
                poll_id = %token.poll_id,
                "Skipping rollback, entry changed since the vote was applied"
            );
            return false;
        }

        entry.snapshot = token.previous;
        entry.generation += 1;
        if entry.issued_reconcile == token.reconcile_after {
            entry.issued_reconcile = token.reconcile_before;
        }
        true
    }

    /// Settle an optimistic vote with the backend's write result.
    ///
    /// On success the caller gets a ticket for the follow-up reconcile. On
    /// failure the vote is rolled back and the error is surfaced as
    /// [`AppError::WriteFailed`].
    pub fn confirm_vote<T>(
        &mut self,
        token: RollbackToken,
        write_result: AppResult<T>,
    ) -> AppResult<ReconcileTicket> {
        match write_result {
            Ok(_) => Ok(self.begin_reconcile(&token.poll_id)),
            Err(e) => {
                let poll_id = token.poll_id.clone();
                let restored = self.rollback(token);
                debug!(poll_id = %poll_id, restored, error = %e, "Rolled back failed vote");
                Err(match e {
                    AppError::WriteFailed(msg) => AppError::WriteFailed(msg),
                    other => AppError::WriteFailed(other.to_string()),
                })
            }
        }
    }

    /// Issue a reconcile token for a poll, superseding every earlier one.
    pub fn begin_reconcile(&mut self, poll_id: &str) -> ReconcileTicket {
        let entry = self.entries.entry(poll_id.to_string()).or_default();
        entry.issued_reconcile += 1;
        ReconcileTicket {
            poll_id: poll_id.to_string(),
            token: entry.issued_reconcile,
        }
    }

    /// Whether `ticket` is still the latest reconcile issued for its poll.
    #[must_use]
    pub fn is_latest(&self, ticket: &ReconcileTicket) -> bool {
        self.entries
            .get(&ticket.poll_id)
            .is_some_and(|entry| entry.issued_reconcile == ticket.token)
    }

    /// Replace a poll's counts with server-derived ones.
    ///
    /// `server_vote` is the session user's vote as derived from the log; it
    /// overwrites the cached vote when they disagree.
    pub fn finish_reconcile(
        &mut self,
        ticket: &ReconcileTicket,
        counts: AggregateResult,
        server_vote: Option<OptionIndex>,
    ) -> ReconcileOutcome {
        let Some(entry) = self.entries.get_mut(&ticket.poll_id) else {
            return ReconcileOutcome::Stale;
        };

        if entry.issued_reconcile != ticket.token {
            debug!(
                poll_id = %ticket.poll_id,
                token = ticket.token,
                latest = entry.issued_reconcile,
                "Discarding stale reconcile"
            );
            return ReconcileOutcome::Stale;
        }

        if entry.snapshot.current_user_vote != server_vote {
            debug!(
                poll_id = %ticket.poll_id,
                cached = ?entry.snapshot.current_user_vote,
                server = ?server_vote,
                "Correcting vote from server log"
            );
        }

        entry.snapshot = PollSnapshot {
            current_user_vote: server_vote,
            counts,
        };
        entry.generation += 1;
        ReconcileOutcome::Applied(entry.snapshot.clone())
    }
}
