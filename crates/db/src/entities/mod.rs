//! Database entities.

pub mod idea;
pub mod idea_reaction;
pub mod poll;
pub mod poll_response;

pub use idea::{Entity as Idea, IdeaStatus, UserRole};
pub use idea_reaction::{Entity as IdeaReaction, ReactionChoice};
pub use poll::Entity as Poll;
pub use poll_response::Entity as PollResponse;
