//! Latest-row-wins aggregation over append-only logs.
//!
//! A user's current vote is never stored. It is the row with the greatest
//! `created_at` for that (poll, user) pair. Rows sharing a timestamp are
//! resolved by input order: the later row wins, so backends must return logs
//! in insertion order.

use std::collections::HashMap;

use crate::model::{
    AggregateResult, LogEntry, OptionIndex, Reaction, ReactionChoice, ReactionSummary,
    VoteResponse,
};

/// Select the latest row per (subject, user) among rows whose subject passes `keep`.
fn select_latest<'a, T, F>(rows: &'a [T], keep: F) -> HashMap<(&'a str, &'a str), &'a T>
where
    T: LogEntry,
    F: Fn(&str) -> bool,
{
    let mut latest: HashMap<(&str, &str), &T> = HashMap::new();
    for row in rows.iter().filter(|row| keep(row.subject_id())) {
        latest
            .entry((row.subject_id(), row.user_id()))
            .and_modify(|current| {
                if row.created_at() >= current.created_at() {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    latest
}

/// Aggregate the response log for every poll in `poll_ids`.
///
/// Every requested poll is present in the output; a poll without rows maps to
/// an empty result. Rows for polls not requested are ignored.
pub fn aggregate_polls<'p, I>(rows: &[VoteResponse], poll_ids: I) -> HashMap<String, AggregateResult>
where
    I: IntoIterator<Item = &'p str>,
{
    let mut results: HashMap<String, AggregateResult> = poll_ids
        .into_iter()
        .map(|id| (id.to_string(), AggregateResult::default()))
        .collect();

    let latest = select_latest(rows, |poll_id| results.contains_key(poll_id));
    for ((poll_id, _), row) in latest {
        if let Some(result) = results.get_mut(poll_id) {
            result.total += 1;
            result.add_vote(row.selected_option);
        }
    }

    results
}

/// Aggregate the response log of a single poll.
#[must_use]
pub fn aggregate_poll(rows: &[VoteResponse], poll_id: &str) -> AggregateResult {
    aggregate_polls(rows, [poll_id])
        .remove(poll_id)
        .unwrap_or_default()
}

/// The current vote of `user_id` on `poll_id`, derived from the log.
#[must_use]
pub fn latest_vote_of(rows: &[VoteResponse], poll_id: &str, user_id: &str) -> Option<OptionIndex> {
    rows.iter()
        .filter(|row| row.poll_id == poll_id && row.user_id == user_id)
        .fold(None::<&VoteResponse>, |latest, row| match latest {
            Some(current) if row.created_at < current.created_at => Some(current),
            _ => Some(row),
        })
        .map(|row| row.selected_option)
}

/// Like/dislike counts for `idea_id`. A withdrawn latest row counts as no reaction.
#[must_use]
pub fn summarize_reactions(rows: &[Reaction], idea_id: &str) -> ReactionSummary {
    select_latest(rows, |id| id == idea_id).into_values().fold(
        ReactionSummary::default(),
        |mut summary, row| {
            match row.choice {
                ReactionChoice::Like => summary.likes += 1,
                ReactionChoice::Dislike => summary.dislikes += 1,
                ReactionChoice::Withdrawn => {}
            }
            summary
        },
    )
}

/// The current reaction of `user_id` on `idea_id`, if any.
#[must_use]
pub fn current_reaction_of(rows: &[Reaction], idea_id: &str, user_id: &str) -> Option<ReactionChoice> {
    select_latest(rows, |id| id == idea_id)
        .get(&(idea_id, user_id))
        .map(|row| row.choice)
        .filter(|choice| *choice != ReactionChoice::Withdrawn)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::UserRole;
    use chrono::{DateTime, TimeZone, Utc};
    use maplit::btreemap;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn vote(poll_id: &str, user_id: &str, option: OptionIndex, t: i64) -> VoteResponse {
        VoteResponse {
            id: format!("{poll_id}-{user_id}-{t}"),
            poll_id: poll_id.to_string(),
            user_id: user_id.to_string(),
            user_name: user_id.to_string(),
            user_role: UserRole::Employee,
            selected_option: option,
            created_at: at(t),
        }
    }

    fn reaction(user_id: &str, choice: ReactionChoice, t: i64) -> Reaction {
        Reaction {
            id: format!("idea1-{user_id}-{t}"),
            idea_id: "idea1".to_string(),
            user_id: user_id.to_string(),
            choice,
            created_at: at(t),
        }
    }

    #[test]
    fn test_later_vote_overrides_earlier_one() {
        let log = vec![
            vote("poll1", "alice", 0, 1),
            vote("poll1", "bob", 1, 2),
            vote("poll1", "alice", 1, 3),
        ];

        let result = aggregate_poll(&log, "poll1");

        assert_eq!(result.total, 2);
        assert_eq!(result.options, btreemap! { 1 => 2 });
    }

    #[test]
    fn test_total_counts_distinct_voters_not_rows() {
        let log = vec![
            vote("poll1", "alice", 0, 1),
            vote("poll1", "alice", 1, 2),
            vote("poll1", "alice", 2, 3),
            vote("poll1", "alice", 0, 4),
            vote("poll1", "bob", 2, 5),
        ];

        let result = aggregate_poll(&log, "poll1");

        assert_eq!(result.total, 2);
        assert_eq!(result.options, btreemap! { 0 => 1, 2 => 1 });
        assert_eq!(result.options.values().sum::<u64>(), result.total);
    }

    #[test]
    fn test_unsorted_input_uses_timestamps() {
        let log = vec![
            vote("poll1", "alice", 2, 9),
            vote("poll1", "alice", 0, 1),
            vote("poll1", "alice", 1, 5),
        ];

        assert_eq!(aggregate_poll(&log, "poll1").options, btreemap! { 2 => 1 });
        assert_eq!(latest_vote_of(&log, "poll1", "alice"), Some(2));
    }

    #[test]
    fn test_timestamp_tie_prefers_later_row() {
        let log = vec![vote("poll1", "alice", 0, 7), vote("poll1", "alice", 1, 7)];

        assert_eq!(aggregate_poll(&log, "poll1").options, btreemap! { 1 => 1 });
        assert_eq!(latest_vote_of(&log, "poll1", "alice"), Some(1));
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let log = vec![
            vote("poll1", "alice", 0, 1),
            vote("poll1", "bob", 1, 1),
            vote("poll1", "carol", 1, 2),
            vote("poll1", "alice", 2, 2),
        ];

        assert_eq!(aggregate_poll(&log, "poll1"), aggregate_poll(&log, "poll1"));
    }

    #[test]
    fn test_empty_log_yields_empty_result() {
        let result = aggregate_poll(&[], "poll1");

        assert_eq!(result, AggregateResult::default());
        assert_eq!(result.total, 0);
        assert!(result.options.is_empty());
    }

    #[test]
    fn test_aggregate_polls_groups_by_poll() {
        let log = vec![
            vote("poll1", "alice", 0, 1),
            vote("poll2", "alice", 1, 2),
            vote("poll2", "bob", 1, 3),
            vote("poll3", "carol", 0, 4),
        ];

        let results = aggregate_polls(&log, ["poll1", "poll2", "poll4"]);

        assert_eq!(results.len(), 3);
        assert_eq!(results["poll1"].options, btreemap! { 0 => 1 });
        assert_eq!(results["poll2"].total, 2);
        assert_eq!(results["poll2"].options, btreemap! { 1 => 2 });
        assert_eq!(results["poll4"], AggregateResult::default());
        assert!(!results.contains_key("poll3"));
    }

    #[test]
    fn test_latest_vote_of_unknown_user() {
        let log = vec![vote("poll1", "alice", 0, 1)];

        assert_eq!(latest_vote_of(&log, "poll1", "bob"), None);
        assert_eq!(latest_vote_of(&log, "poll2", "alice"), None);
    }

    #[test]
    fn test_reaction_summary_latest_wins() {
        let log = vec![
            reaction("alice", ReactionChoice::Like, 1),
            reaction("bob", ReactionChoice::Like, 2),
            reaction("alice", ReactionChoice::Dislike, 3),
            reaction("carol", ReactionChoice::Like, 4),
            reaction("carol", ReactionChoice::Withdrawn, 5),
        ];

        let summary = summarize_reactions(&log, "idea1");

        assert_eq!(summary, ReactionSummary { likes: 1, dislikes: 1 });
        assert_eq!(
            current_reaction_of(&log, "idea1", "alice"),
            Some(ReactionChoice::Dislike)
        );
        assert_eq!(current_reaction_of(&log, "idea1", "carol"), None);
        assert_eq!(current_reaction_of(&log, "idea1", "dave"), None);
    }
}
