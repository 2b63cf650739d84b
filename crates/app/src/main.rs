//! Connect idea board session runner.
//!
//! With the memory backend this seeds a demo board and plays one session
//! against it. With the database backend it reports the live tallies of
//! every open idea.

mod demo;

use std::sync::Arc;

use anyhow::Context;
use connect_common::{BackendKind, Config, LoggingConfig};
use connect_core::{
    CurrentUser, DatabaseBackend, IdeaStatus, IdeaView, MemoryBackend, ReactionChoice,
    ReactionService, SessionIdentity, UserRole, VoteOutcome, VotingService,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const OPEN_STATUSES: &[IdeaStatus] = &[IdeaStatus::Approved, IdeaStatus::InProgress];

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn report(board: &[IdeaView]) {
    for view in board {
        let reactions = view.idea.reactions.unwrap_or_default();
        info!(
            idea = %view.idea.title,
            status = ?view.idea.status,
            likes = reactions.likes,
            dislikes = reactions.dislikes,
            "Idea"
        );

        let Some(poll) = &view.poll else {
            continue;
        };
        info!(
            question = %poll.poll.question,
            voters = poll.snapshot.counts.total,
            my_vote = ?poll.snapshot.current_user_vote,
            "Poll"
        );
        for (index, label) in (0..).zip(&poll.poll.options) {
            info!(option = %label, votes = poll.snapshot.counts.count(index), "Tally");
        }
    }
}

async fn run_demo(config: &Config) -> anyhow::Result<()> {
    let backend = MemoryBackend::new();
    let poll_ids = demo::seed(&backend).await?;

    let identity = Arc::new(SessionIdentity::signed_in(CurrentUser {
        id: "sam".to_string(),
        name: "Sam".to_string(),
        role: UserRole::Employee,
    }));
    let voting = VotingService::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        identity.clone(),
        &config.sync,
    );
    let reactions = ReactionService::new(Arc::new(backend.clone()), identity, &config.sync);

    let board = voting.refresh(None).await;
    report(&board);

    if let Some(poll_id) = poll_ids.first() {
        voting.cast_vote(poll_id, 1).await?;
        match voting.cast_vote(poll_id, 2).await? {
            VoteOutcome::Recorded(snapshot) | VoteOutcome::Unchanged(snapshot) => info!(
                poll_id = %poll_id,
                voters = snapshot.counts.total,
                my_vote = ?snapshot.current_user_vote,
                "Changed vote"
            ),
        }
    }

    if let Some(first) = board.first() {
        let state = reactions.react(&first.idea.id, ReactionChoice::Like).await?;
        info!(
            idea = %first.idea.title,
            likes = state.summary.likes,
            dislikes = state.summary.dislikes,
            "Liked idea"
        );
    }

    report(&voting.refresh(Some(OPEN_STATUSES)).await);
    Ok(())
}

async fn run_report(config: &Config) -> anyhow::Result<()> {
    let db_config = config
        .backend
        .database
        .as_ref()
        .context("backend.database must be set when backend.kind = \"database\"")?;

    let db = connect_db::init(db_config).await?;
    connect_db::migrate(&db).await?;
    info!("Database ready");

    let backend = DatabaseBackend::new(Arc::new(db));
    let voting = VotingService::new(
        Arc::new(backend.clone()),
        Arc::new(backend),
        Arc::new(SessionIdentity::signed_out()),
        &config.sync,
    );

    report(&voting.refresh(Some(OPEN_STATUSES)).await);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!(backend = ?config.backend.kind, "Starting Connect session");

    match config.backend.kind {
        BackendKind::Memory => run_demo(&config).await,
        BackendKind::Database => run_report(&config).await,
    }
}
