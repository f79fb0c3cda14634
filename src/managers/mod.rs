//! In-memory [`PollStore`], used by the tests and when no database is configured.

pub mod question;
pub mod session;
pub mod user;
pub mod vote;

use crate::{
    db::{
        choice::{ChoiceId, ChoiceTally, InternalChoice},
        question::{InternalQuestion, QuestionId},
        session::{InternalSession, SessionId},
        user::{InternalUser, NewUser, UserId},
        vote::{InternalVote, RecordedVote},
    },
    store::PollStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::eyre::{eyre, Report};
use question::QuestionManager;
use session::SessionManager;
use tokio::sync::Mutex;
use user::UserManager;
use vote::VoteManager;

#[derive(Default)]
struct Managers {
    questions: QuestionManager,
    votes: VoteManager,
    users: UserManager,
    sessions: SessionManager,
}

/// Every operation holds the one lock for its whole duration, which gives
/// `record_vote` the same atomicity as the database transaction.
#[derive(Default)]
pub struct MemoryStore {
    managers: Mutex<Managers>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn published_questions(&self, now: DateTime<Utc>) -> Result<Vec<InternalQuestion>, Report> {
        Ok(self.managers.lock().await.questions.published(now))
    }

    async fn question(&self, id: QuestionId) -> Result<Option<InternalQuestion>, Report> {
        Ok(self.managers.lock().await.questions.find_by_id(id))
    }

    async fn add_question(
        &self,
        question_text: &str,
        pub_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<InternalQuestion, Report> {
        let question = InternalQuestion {
            id: QuestionId::new(),
            question_text: question_text.to_owned(),
            pub_date,
            end_date,
        };
        self.managers.lock().await.questions.insert(question.clone());
        Ok(question)
    }

    async fn set_end_date(
        &self,
        id: QuestionId,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Option<InternalQuestion>, Report> {
        Ok(self.managers.lock().await.questions.set_end_date(id, end_date))
    }

    async fn choices(&self, question: QuestionId) -> Result<Vec<InternalChoice>, Report> {
        Ok(self.managers.lock().await.questions.choices_for(question))
    }

    async fn choice(&self, id: ChoiceId) -> Result<Option<InternalChoice>, Report> {
        Ok(self.managers.lock().await.questions.find_choice(id))
    }

    async fn add_choice(&self, question: QuestionId, choice_text: &str) -> Result<InternalChoice, Report> {
        let choice = InternalChoice {
            id: ChoiceId::new(),
            question_id: question,
            choice_text: choice_text.to_owned(),
        };
        self.managers
            .lock()
            .await
            .questions
            .insert_choice(choice)
            .ok_or_else(|| eyre!("question {} does not exist", question))
    }

    async fn tally(&self, question: QuestionId) -> Result<Vec<ChoiceTally>, Report> {
        let managers = self.managers.lock().await;
        let tally = managers
            .questions
            .choices_for(question)
            .into_iter()
            .map(|choice| ChoiceTally {
                votes: managers.votes.count_for_choice(choice.id),
                id: choice.id,
                choice_text: choice.choice_text,
            })
            .collect();
        Ok(tally)
    }

    async fn vote_for(&self, user: UserId, question: QuestionId) -> Result<Option<InternalVote>, Report> {
        Ok(self.managers.lock().await.votes.find(user, question))
    }

    async fn record_vote(
        &self,
        user: UserId,
        question: QuestionId,
        choice: ChoiceId,
    ) -> Result<RecordedVote, Report> {
        let mut managers = self.managers.lock().await;
        match managers.questions.find_choice(choice) {
            Some(found) if found.question_id == question => {}
            _ => return Err(eyre!("choice {} does not belong to question {}", choice, question)),
        }
        Ok(managers.votes.record(user, question, choice))
    }

    async fn vote_count(&self, user: UserId, question: QuestionId) -> Result<i64, Report> {
        Ok(self.managers.lock().await.votes.count_for_user(user, question))
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<InternalUser>, Report> {
        Ok(self.managers.lock().await.users.find_by_username(username))
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<InternalUser>, Report> {
        Ok(self.managers.lock().await.users.find_by_id(id))
    }

    async fn add_user(&self, new_user: NewUser) -> Result<Option<InternalUser>, Report> {
        Ok(self.managers.lock().await.users.insert(new_user))
    }

    async fn session(&self, id: SessionId) -> Result<Option<InternalSession>, Report> {
        Ok(self.managers.lock().await.sessions.find_by_id(id))
    }

    async fn save_session(&self, user: UserId) -> Result<InternalSession, Report> {
        Ok(self.managers.lock().await.sessions.create(user))
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), Report> {
        self.managers.lock().await.sessions.remove(id);
        Ok(())
    }
}
