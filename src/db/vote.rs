use super::{choice::ChoiceId, question::QuestionId, user::UserId, DbExecutor};
use crate::async_message_handler_with_span;
use actix::prelude::*;
use actix_interop::with_ctx;
use color_eyre::eyre::{eyre, Report};
use serde::{Deserialize, Serialize};
use sqlx::{types::Uuid, PgConnection};
use tracing::debug;

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct VoteId(pub Uuid);

impl VoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VoteId {
    fn default() -> Self {
        Self::new()
    }
}

/// A user's current selection for a question.
///
/// `question_id` always matches the question of `choice_id`; the pair is
/// what the `(user_id, question_id)` uniqueness constraint hangs on.
#[derive(Clone, PartialEq, Eq, Debug, sqlx::FromRow)]
pub struct InternalVote {
    pub id: VoteId,
    pub choice_id: ChoiceId,
    pub question_id: QuestionId,
    pub user_id: UserId,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RecordedVote {
    Created(InternalVote),
    Updated {
        vote: InternalVote,
        previous: ChoiceId,
    },
}

impl RecordedVote {
    pub fn vote(&self) -> &InternalVote {
        match self {
            RecordedVote::Created(vote) => vote,
            RecordedVote::Updated { vote, .. } => vote,
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Option<InternalVote>, Report>")]
pub struct VoteForUser(pub UserId, pub QuestionId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<VoteForUser> for DbExecutor {
        async fn handle(msg: VoteForUser) -> Result<Option<InternalVote>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let VoteForUser(user_id, question_id) = msg;
            debug!(user_id = user_id.as_string().as_str(), "Retrieving vote for question {id}", id = question_id);
            let vote = sqlx::query_as::<_, InternalVote>(
                r#"
                SELECT id, choice_id, question_id, user_id FROM votes
                WHERE user_id = $1 AND question_id = $2
                "#,
            )
            .bind(user_id)
            .bind(question_id)
            .fetch_optional(&pool)
            .await?;

            Ok(vote)
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<i64, Report>")]
pub struct CountVotes(pub UserId, pub QuestionId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<CountVotes> for DbExecutor {
        async fn handle(msg: CountVotes) -> Result<i64, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let CountVotes(user_id, question_id) = msg;
            let count: i64 = sqlx::query_scalar(
                r#"SELECT COUNT(*) FROM votes WHERE user_id = $1 AND question_id = $2"#,
            )
            .bind(user_id)
            .bind(question_id)
            .fetch_one(&pool)
            .await?;

            Ok(count)
        }
    }
}

async fn locked_vote(
    conn: &mut PgConnection,
    user_id: UserId,
    question_id: QuestionId,
) -> Result<Option<InternalVote>, sqlx::Error> {
    sqlx::query_as::<_, InternalVote>(
        r#"
        SELECT id, choice_id, question_id, user_id FROM votes
        WHERE user_id = $1 AND question_id = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_optional(conn)
    .await
}

async fn move_vote(
    conn: &mut PgConnection,
    existing: InternalVote,
    choice_id: ChoiceId,
) -> Result<RecordedVote, sqlx::Error> {
    debug!("Moving vote {id:?} to choice {choice}", id = existing.id, choice = choice_id);
    let vote = sqlx::query_as::<_, InternalVote>(
        r#"
        UPDATE votes SET choice_id = $2 WHERE id = $1
        RETURNING id, choice_id, question_id, user_id
        "#,
    )
    .bind(existing.id)
    .bind(choice_id)
    .fetch_one(conn)
    .await?;
    Ok(RecordedVote::Updated {
        vote,
        previous: existing.choice_id,
    })
}

/// Points the user's vote for a question at `choice`, creating it on first use.
///
/// Lookup and write share one transaction. The row lock covers the update
/// path; when two first votes race, the unique constraint turns the later
/// insert into nothing and that vote moves the row the earlier one created.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<RecordedVote, Report>")]
pub struct RecordVote {
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub choice_id: ChoiceId,
}

async_message_handler_with_span! {
    impl AsyncSpanHandler<RecordVote> for DbExecutor {
        async fn handle(msg: RecordVote) -> Result<RecordedVote, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let RecordVote { user_id, question_id, choice_id } = msg;
            let mut tx = pool.begin().await?;

            let recorded = match locked_vote(&mut tx, user_id, question_id).await? {
                Some(existing) => move_vote(&mut tx, existing, choice_id).await?,
                None => {
                    debug!("Inserting vote for choice {choice}", choice = choice_id);
                    let inserted = sqlx::query_as::<_, InternalVote>(
                        r#"
                        INSERT INTO votes (id, choice_id, question_id, user_id) VALUES ($1, $2, $3, $4)
                        ON CONFLICT (user_id, question_id) DO NOTHING
                        RETURNING id, choice_id, question_id, user_id
                        "#,
                    )
                    .bind(VoteId::new())
                    .bind(choice_id)
                    .bind(question_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                    match inserted {
                        Some(vote) => RecordedVote::Created(vote),
                        None => {
                            debug!("Another first vote got in before us");
                            let existing = locked_vote(&mut tx, user_id, question_id)
                                .await?
                                .ok_or_else(|| eyre!("vote for question {} disappeared", question_id))?;
                            move_vote(&mut tx, existing, choice_id).await?
                        }
                    }
                }
            };

            tx.commit().await?;
            Ok(recorded)
        }
    }
}
