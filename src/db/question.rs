use super::DbExecutor;
use crate::async_message_handler_with_span;
use actix::prelude::*;
use actix_interop::with_ctx;
use chrono::{DateTime, Utc};
use color_eyre::eyre::Report;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use std::{fmt, str::FromStr};
use tracing::debug;

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct QuestionId(pub Uuid);

impl QuestionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QuestionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, sqlx::FromRow)]
pub struct InternalQuestion {
    pub id: QuestionId,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Vec<InternalQuestion>, Report>")]
pub struct PublishedQuestions(pub DateTime<Utc>);

async_message_handler_with_span! {
    impl AsyncSpanHandler<PublishedQuestions> for DbExecutor {
        async fn handle(msg: PublishedQuestions) -> Result<Vec<InternalQuestion>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let PublishedQuestions(now) = msg;
            debug!("Retrieving questions published before {now}", now = now);
            let questions = sqlx::query_as::<_, InternalQuestion>(
                r#"
                SELECT id, question_text, pub_date, end_date FROM questions
                WHERE pub_date <= $1
                ORDER BY pub_date DESC
                "#,
            )
            .bind(now)
            .fetch_all(&pool)
            .await?;

            Ok(questions)
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Option<InternalQuestion>, Report>")]
pub struct QuestionById(pub QuestionId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<QuestionById> for DbExecutor {
        async fn handle(msg: QuestionById) -> Result<Option<InternalQuestion>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let QuestionById(question_id) = msg;
            debug!("Retrieving question by id {id}", id = question_id);
            let question = sqlx::query_as::<_, InternalQuestion>(
                r#"SELECT id, question_text, pub_date, end_date FROM questions WHERE id = $1"#,
            )
            .bind(question_id)
            .fetch_optional(&pool)
            .await?;

            Ok(question)
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<InternalQuestion, Report>")]
pub struct SaveQuestion {
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

async_message_handler_with_span! {
    impl AsyncSpanHandler<SaveQuestion> for DbExecutor {
        async fn handle(msg: SaveQuestion) -> Result<InternalQuestion, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            debug!("Saving question {text:?}", text = msg.question_text);
            let question = sqlx::query_as::<_, InternalQuestion>(
                r#"
                INSERT INTO questions (id, question_text, pub_date, end_date) VALUES ($1, $2, $3, $4)
                RETURNING id, question_text, pub_date, end_date
                "#,
            )
            .bind(QuestionId::new())
            .bind(msg.question_text)
            .bind(msg.pub_date)
            .bind(msg.end_date)
            .fetch_one(&pool)
            .await?;

            Ok(question)
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Option<InternalQuestion>, Report>")]
pub struct SetEndDate(pub QuestionId, pub Option<DateTime<Utc>>);

async_message_handler_with_span! {
    impl AsyncSpanHandler<SetEndDate> for DbExecutor {
        async fn handle(msg: SetEndDate) -> Result<Option<InternalQuestion>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let SetEndDate(question_id, end_date) = msg;
            debug!("Setting end date of question {id} to {end_date:?}", id = question_id, end_date = end_date);
            let question = sqlx::query_as::<_, InternalQuestion>(
                r#"
                UPDATE questions SET end_date = $2 WHERE id = $1
                RETURNING id, question_text, pub_date, end_date
                "#,
            )
            .bind(question_id)
            .bind(end_date)
            .fetch_optional(&pool)
            .await?;

            Ok(question)
        }
    }
}
