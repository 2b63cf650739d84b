//! Repositories wrapping sea-orm queries.

pub mod idea;
pub mod poll;
pub mod reaction;

pub use idea::IdeaRepository;
pub use poll::{PollRepository, PollResponseRepository};
pub use reaction::IdeaReactionRepository;
