//! Publish window of a question: `[pub_date, end_date)`, with no end when
//! `end_date` is unset. `now` is always passed in.

use crate::db::question::InternalQuestion;
use chrono::{DateTime, Duration, Utc};

pub fn is_published(question: &InternalQuestion, now: DateTime<Utc>) -> bool {
    question.pub_date <= now
}

/// Published within the last day. A `pub_date` in the future is not recent.
pub fn was_published_recently(question: &InternalQuestion, now: DateTime<Utc>) -> bool {
    now - Duration::days(1) <= question.pub_date && question.pub_date <= now
}

/// Voting closes at `end_date` itself.
pub fn can_vote(question: &InternalQuestion, now: DateTime<Utc>) -> bool {
    match question.end_date {
        None => is_published(question, now),
        Some(end_date) => is_published(question, now) && now < end_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::question::QuestionId;

    fn question(pub_offset: Duration, end_offset: Option<Duration>, now: DateTime<Utc>) -> InternalQuestion {
        InternalQuestion {
            id: QuestionId::new(),
            question_text: "What's up?".to_owned(),
            pub_date: now + pub_offset,
            end_date: end_offset.map(|offset| now + offset),
        }
    }

    #[test]
    fn future_question_is_neither_published_nor_recent() {
        let now = Utc::now();
        let future = question(Duration::seconds(1), None, now);
        assert!(!is_published(&future, now));
        assert!(!was_published_recently(&future, now));
        assert!(!can_vote(&future, now));
    }

    #[test]
    fn recent_window_is_one_day_inclusive() {
        let now = Utc::now();
        assert!(was_published_recently(&question(Duration::zero(), None, now), now));
        assert!(was_published_recently(
            &question(-Duration::hours(23) - Duration::minutes(59), None, now),
            now
        ));
        assert!(was_published_recently(&question(-Duration::days(1), None, now), now));
        assert!(!was_published_recently(
            &question(-Duration::days(1) - Duration::seconds(1), None, now),
            now
        ));
    }

    #[test]
    fn open_ended_question_follows_publication() {
        let now = Utc::now();
        for offset in [-Duration::days(5), Duration::zero(), Duration::days(5)] {
            let q = question(offset, None, now);
            assert_eq!(can_vote(&q, now), is_published(&q, now));
        }
    }

    #[test]
    fn voting_closes_at_end_date() {
        let now = Utc::now();
        let ended = question(-Duration::days(5), Some(-Duration::days(2)), now);
        assert!(is_published(&ended, now));
        assert!(!can_vote(&ended, now));

        let ends_now = question(-Duration::days(5), Some(Duration::zero()), now);
        assert!(!can_vote(&ends_now, now));

        let ends_soon = question(-Duration::days(5), Some(Duration::seconds(1)), now);
        assert!(can_vote(&ends_soon, now));
    }

    #[test]
    fn end_date_doesnt_open_unpublished_question() {
        let now = Utc::now();
        let q = question(Duration::days(1), Some(Duration::days(2)), now);
        assert!(!can_vote(&q, now));
    }
}
