//! Demo board for the in-memory backend.

use std::sync::Arc;

use chrono::{Duration, Utc};
use connect_core::{
    CreatePollInput, CurrentUser, IdeaService, IdeaStatus, MemoryBackend, ReactionChoice,
    ReactionLogStore, SessionIdentity, SubmitIdeaInput, UserRole,
};
use tracing::info;

struct DemoIdea {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    status: IdeaStatus,
    poll: Option<(&'static str, &'static [&'static str])>,
}

const IDEAS: &[DemoIdea] = &[
    DemoIdea {
        title: "Quiet room on the third floor",
        description: "Turn the unused storage room into a phone-free quiet space.",
        category: "facilities",
        status: IdeaStatus::Approved,
        poll: Some(("Would you use a quiet room?", &["Yes", "No", "Maybe"])),
    },
    DemoIdea {
        title: "Monthly lunch and learn",
        description: "One team presents something they built, lunch is provided.",
        category: "culture",
        status: IdeaStatus::InProgress,
        poll: Some((
            "Which day suits you best?",
            &["Tuesday", "Wednesday", "Thursday"],
        )),
    },
    DemoIdea {
        title: "Bike storage",
        description: "Covered racks near the side entrance.",
        category: "facilities",
        status: IdeaStatus::Pending,
        poll: None,
    },
];

/// Votes cast by colleagues before the session starts: (user, option, minutes ago).
const COLLEAGUE_VOTES: &[(&str, u32, i64)] = &[
    ("priya", 0, 50),
    ("marco", 1, 45),
    ("lena", 0, 40),
    ("marco", 0, 30),
    ("tom", 2, 20),
];

/// Fill `backend` with a small board and return the poll IDs in creation order.
pub async fn seed(backend: &MemoryBackend) -> anyhow::Result<Vec<String>> {
    let admin = Arc::new(SessionIdentity::signed_in(CurrentUser {
        id: "dana".to_string(),
        name: "Dana".to_string(),
        role: UserRole::Admin,
    }));
    let ideas = IdeaService::new(Arc::new(backend.clone()), admin);

    let mut poll_ids = Vec::new();
    for demo in IDEAS {
        let idea = ideas
            .submit(SubmitIdeaInput {
                title: demo.title.to_string(),
                description: demo.description.to_string(),
                category: demo.category.to_string(),
            })
            .await?;

        if demo.status != IdeaStatus::Pending {
            ideas.set_status(&idea.id, demo.status).await?;
        }

        if let Some((question, options)) = demo.poll {
            let poll = ideas
                .create_poll(
                    &idea.id,
                    CreatePollInput {
                        question: question.to_string(),
                        options: options.iter().map(|o| (*o).to_string()).collect(),
                    },
                )
                .await?;
            poll_ids.push(poll.id);
        }

        backend
            .append_reaction(&idea.id, "priya", ReactionChoice::Like)
            .await?;
    }

    let now = Utc::now();
    for poll_id in &poll_ids {
        for (user_id, option, minutes_ago) in COLLEAGUE_VOTES {
            backend
                .append_vote_at(poll_id, user_id, *option, now - Duration::minutes(*minutes_ago))
                .await;
        }
    }

    info!(
        ideas = IDEAS.len(),
        polls = poll_ids.len(),
        "Seeded demo board"
    );
    Ok(poll_ids)
}
