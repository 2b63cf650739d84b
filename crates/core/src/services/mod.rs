//! Business logic services.

#![allow(missing_docs)]

pub mod idea;
pub mod reaction;
pub mod voting;

pub use idea::{CreatePollInput, IdeaService, SubmitIdeaInput};
pub use reaction::{ReactionService, ReactionState};
pub use voting::{IdeaView, PollView, VoteOutcome, VotingService};
