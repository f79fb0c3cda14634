pub mod choice;
pub mod question;
pub mod session;
pub mod user;
pub mod vote;

use crate::{span::SpanMessage, store::PollStore};
use actix::prelude::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use choice::{ChoiceId, ChoiceTally, InternalChoice};
use color_eyre::eyre::Report;
use question::{InternalQuestion, QuestionId};
use session::{InternalSession, SessionId};
use sqlx::{
    migrate::Migrator,
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use user::{InternalUser, NewUser, UserId};
use vote::{InternalVote, RecordedVote};

pub static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug)]
pub struct DbExecutor(pub PgPool);

impl DbExecutor {
    pub fn pool(&mut self) -> PgPool {
        self.0.clone()
    }
}

impl Actor for DbExecutor {
    type Context = Context<Self>;
}

pub async fn new_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    new_pool_with(database_url.parse()?).await
}

pub async fn new_pool_with(connect_options: PgConnectOptions) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5 as u32)
        .connect_with(connect_options)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), Report> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// [`PollStore`] backed by Postgres. Every query is a message to a
/// [`DbExecutor`] carrying the caller's span.
#[derive(Clone)]
pub struct PgStore {
    executor: Addr<DbExecutor>,
}

impl PgStore {
    /// Starts the executor actor on the current arbiter.
    pub fn start(pool: PgPool) -> Self {
        Self {
            executor: DbExecutor(pool).start(),
        }
    }

    async fn send<M, T>(&self, msg: M) -> Result<T, Report>
    where
        M: Message<Result = Result<T, Report>> + Send + 'static,
        T: Send + 'static,
        DbExecutor: Handler<SpanMessage<M>>,
    {
        self.executor.send(SpanMessage::new(msg)).await?
    }
}

#[async_trait]
impl PollStore for PgStore {
    async fn published_questions(&self, now: DateTime<Utc>) -> Result<Vec<InternalQuestion>, Report> {
        self.send(question::PublishedQuestions(now)).await
    }

    async fn question(&self, id: QuestionId) -> Result<Option<InternalQuestion>, Report> {
        self.send(question::QuestionById(id)).await
    }

    async fn add_question(
        &self,
        question_text: &str,
        pub_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<InternalQuestion, Report> {
        self.send(question::SaveQuestion {
            question_text: question_text.to_owned(),
            pub_date,
            end_date,
        })
        .await
    }

    async fn set_end_date(
        &self,
        id: QuestionId,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Option<InternalQuestion>, Report> {
        self.send(question::SetEndDate(id, end_date)).await
    }

    async fn choices(&self, question: QuestionId) -> Result<Vec<InternalChoice>, Report> {
        self.send(choice::ChoicesForQuestionId(question)).await
    }

    async fn choice(&self, id: ChoiceId) -> Result<Option<InternalChoice>, Report> {
        self.send(choice::ChoiceById(id)).await
    }

    async fn add_choice(&self, question: QuestionId, choice_text: &str) -> Result<InternalChoice, Report> {
        self.send(choice::SaveChoice {
            question_id: question,
            choice_text: choice_text.to_owned(),
        })
        .await
    }

    async fn tally(&self, question: QuestionId) -> Result<Vec<ChoiceTally>, Report> {
        self.send(choice::TallyForQuestionId(question)).await
    }

    async fn vote_for(&self, user: UserId, question: QuestionId) -> Result<Option<InternalVote>, Report> {
        self.send(vote::VoteForUser(user, question)).await
    }

    async fn record_vote(
        &self,
        user: UserId,
        question: QuestionId,
        choice: ChoiceId,
    ) -> Result<RecordedVote, Report> {
        self.send(vote::RecordVote {
            user_id: user,
            question_id: question,
            choice_id: choice,
        })
        .await
    }

    async fn vote_count(&self, user: UserId, question: QuestionId) -> Result<i64, Report> {
        self.send(vote::CountVotes(user, question)).await
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<InternalUser>, Report> {
        self.send(user::UserByUsername(username.to_owned())).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<InternalUser>, Report> {
        self.send(user::UserById(id)).await
    }

    async fn add_user(&self, new_user: NewUser) -> Result<Option<InternalUser>, Report> {
        self.send(user::SaveUser(new_user)).await
    }

    async fn session(&self, id: SessionId) -> Result<Option<InternalSession>, Report> {
        self.send(session::SessionById(id)).await
    }

    async fn save_session(&self, user: UserId) -> Result<InternalSession, Report> {
        self.send(session::SaveSession(user)).await
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), Report> {
        self.send(session::DeleteSession(id)).await
    }
}
