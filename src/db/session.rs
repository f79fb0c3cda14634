use super::{user::UserId, DbExecutor};
use crate::async_message_handler_with_span;
use actix::prelude::*;
use actix_interop::with_ctx;
use color_eyre::eyre::Report;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use std::str::FromStr;
use tracing::debug;

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_string(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct InternalSession {
    pub id: SessionId,
    pub user_id: UserId,
}

#[derive(Message, Clone)]
#[rtype(result = "Result<Option<InternalSession>, Report>")]
pub struct SessionById(pub SessionId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<SessionById> for DbExecutor {
        async fn handle(msg: SessionById) -> Result<Option<InternalSession>, Report> {
            let SessionById(session_id) = msg;
            debug!(id = session_id.as_string().as_str(), "Get session by id");
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let session = sqlx::query_as::<_, InternalSession>(
                r#"SELECT id, user_id FROM sessions WHERE id = $1"#,
            )
            .bind(session_id)
            .fetch_optional(&pool)
            .await?;

            Ok(session)
        }
    }
}

#[derive(Message, Clone)]
#[rtype(result = "Result<InternalSession, Report>")]
pub struct SaveSession(pub UserId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<SaveSession> for DbExecutor {
        async fn handle(msg: SaveSession) -> Result<InternalSession, Report> {
            let SaveSession(user_id) = msg;
            debug!(
                user_id = user_id.as_string().as_str(),
                "Save new session for user"
            );
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let session = sqlx::query_as::<_, InternalSession>(
                r#"
                INSERT INTO sessions (user_id) VALUES($1)
                RETURNING id, user_id
                "#,
            )
            .bind(user_id)
            .fetch_one(&pool)
            .await?;

            Ok(session)
        }
    }
}

#[derive(Message, Clone)]
#[rtype(result = "Result<(), Report>")]
pub struct DeleteSession(pub SessionId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<DeleteSession> for DbExecutor {
        async fn handle(msg: DeleteSession) -> Result<(), Report> {
            let DeleteSession(session_id) = msg;
            debug!(id = session_id.as_string().as_str(), "Delete session");
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            sqlx::query(r#"DELETE FROM sessions WHERE id = $1"#)
                .bind(session_id)
                .execute(&pool)
                .await?;

            Ok(())
        }
    }
}
