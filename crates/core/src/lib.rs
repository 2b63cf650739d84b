//! Core vote reconciliation logic for the Connect idea board.

pub mod aggregator;
pub mod backend;
pub mod cache;
pub mod identity;
pub mod model;
pub mod services;

pub use aggregator::{aggregate_poll, aggregate_polls, latest_vote_of, summarize_reactions};
pub use backend::{
    DatabaseBackend, IdeaCatalog, MemoryBackend, NewIdea, NewPoll, ReactionLogStore, VoteLogStore,
};
pub use cache::{OptimisticVoteCache, PollSnapshot, ReconcileOutcome, RollbackToken};
pub use identity::{IdentityProvider, SessionIdentity};
pub use model::*;
pub use services::*;
