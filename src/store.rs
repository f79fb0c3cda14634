//! Persistence boundary for questions, choices, votes and accounts.
//!
//! [`crate::db::PgStore`] is the Postgres implementation and
//! [`crate::managers::MemoryStore`] keeps everything in process memory.

use crate::db::{
    choice::{ChoiceId, ChoiceTally, InternalChoice},
    question::{InternalQuestion, QuestionId},
    session::{InternalSession, SessionId},
    user::{InternalUser, NewUser, UserId},
    vote::{InternalVote, RecordedVote},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::Report;

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Questions with `pub_date <= now`, newest first.
    async fn published_questions(&self, now: DateTime<Utc>) -> Result<Vec<InternalQuestion>, Report>;

    async fn question(&self, id: QuestionId) -> Result<Option<InternalQuestion>, Report>;

    async fn add_question(
        &self,
        question_text: &str,
        pub_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<InternalQuestion, Report>;

    /// The only mutation a question allows after creation.
    async fn set_end_date(
        &self,
        id: QuestionId,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Option<InternalQuestion>, Report>;

    /// Choices of a question in creation order.
    async fn choices(&self, question: QuestionId) -> Result<Vec<InternalChoice>, Report>;

    async fn choice(&self, id: ChoiceId) -> Result<Option<InternalChoice>, Report>;

    async fn add_choice(&self, question: QuestionId, choice_text: &str) -> Result<InternalChoice, Report>;

    /// Choices of a question with the number of votes pointing at each.
    async fn tally(&self, question: QuestionId) -> Result<Vec<ChoiceTally>, Report>;

    async fn vote_for(&self, user: UserId, question: QuestionId) -> Result<Option<InternalVote>, Report>;

    /// Looks up the user's vote for the question and either moves it to
    /// `choice` or creates it, atomically.
    async fn record_vote(
        &self,
        user: UserId,
        question: QuestionId,
        choice: ChoiceId,
    ) -> Result<RecordedVote, Report>;

    /// Number of vote rows a user holds for a question. Never more than one.
    async fn vote_count(&self, user: UserId, question: QuestionId) -> Result<i64, Report>;

    async fn user_by_username(&self, username: &str) -> Result<Option<InternalUser>, Report>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<InternalUser>, Report>;

    /// `None` when the username is taken.
    async fn add_user(&self, user: NewUser) -> Result<Option<InternalUser>, Report>;

    async fn session(&self, id: SessionId) -> Result<Option<InternalSession>, Report>;

    async fn save_session(&self, user: UserId) -> Result<InternalSession, Report>;

    async fn delete_session(&self, id: SessionId) -> Result<(), Report>;
}
