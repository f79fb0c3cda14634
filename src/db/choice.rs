use super::{question::QuestionId, DbExecutor};
use crate::async_message_handler_with_span;
use actix::prelude::*;
use actix_interop::with_ctx;
use color_eyre::eyre::Report;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use std::{fmt, str::FromStr};
use tracing::{debug, instrument};

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ChoiceId(pub Uuid);

impl ChoiceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChoiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChoiceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, sqlx::FromRow)]
pub struct InternalChoice {
    pub id: ChoiceId,
    pub question_id: QuestionId,
    pub choice_text: String,
}

/// A choice with its vote count, derived from the vote rows pointing at it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, sqlx::FromRow)]
pub struct ChoiceTally {
    pub id: ChoiceId,
    pub choice_text: String,
    pub votes: i64,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Vec<InternalChoice>, Report>")]
pub struct ChoicesForQuestionId(pub QuestionId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<ChoicesForQuestionId> for DbExecutor {
        #[instrument]
        async fn handle(msg: ChoicesForQuestionId) -> Result<Vec<InternalChoice>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let ChoicesForQuestionId(question_id) = msg;
            let choices = sqlx::query_as::<_, InternalChoice>(
                r#"
                SELECT id, question_id, choice_text FROM choices
                WHERE question_id = $1
                ORDER BY created_at, id
                "#,
            )
            .bind(question_id)
            .fetch_all(&pool)
            .await?;
            debug!("Choices found {}", choices.len());
            Ok(choices)
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Option<InternalChoice>, Report>")]
pub struct ChoiceById(pub ChoiceId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<ChoiceById> for DbExecutor {
        async fn handle(msg: ChoiceById) -> Result<Option<InternalChoice>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let ChoiceById(choice_id) = msg;
            debug!("Retrieving choice by id {id}", id = choice_id);
            let choice = sqlx::query_as::<_, InternalChoice>(
                r#"SELECT id, question_id, choice_text FROM choices WHERE id = $1"#,
            )
            .bind(choice_id)
            .fetch_optional(&pool)
            .await?;

            Ok(choice)
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<InternalChoice, Report>")]
pub struct SaveChoice {
    pub question_id: QuestionId,
    pub choice_text: String,
}

async_message_handler_with_span! {
    impl AsyncSpanHandler<SaveChoice> for DbExecutor {
        async fn handle(msg: SaveChoice) -> Result<InternalChoice, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            debug!("Saving choice {text:?} for question {id}", text = msg.choice_text, id = msg.question_id);
            let choice = sqlx::query_as::<_, InternalChoice>(
                r#"
                INSERT INTO choices (id, question_id, choice_text) VALUES ($1, $2, $3)
                RETURNING id, question_id, choice_text
                "#,
            )
            .bind(ChoiceId::new())
            .bind(msg.question_id)
            .bind(msg.choice_text)
            .fetch_one(&pool)
            .await?;

            Ok(choice)
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Vec<ChoiceTally>, Report>")]
pub struct TallyForQuestionId(pub QuestionId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<TallyForQuestionId> for DbExecutor {
        #[instrument]
        async fn handle(msg: TallyForQuestionId) -> Result<Vec<ChoiceTally>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let TallyForQuestionId(question_id) = msg;
            let tally = sqlx::query_as::<_, ChoiceTally>(
                r#"
                SELECT c.id, c.choice_text, COUNT(v.id) AS votes
                FROM choices c
                LEFT JOIN votes v ON v.choice_id = c.id
                WHERE c.question_id = $1
                GROUP BY c.id
                ORDER BY c.created_at, c.id
                "#,
            )
            .bind(question_id)
            .fetch_all(&pool)
            .await?;

            Ok(tally)
        }
    }
}
