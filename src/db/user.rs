use super::DbExecutor;
use crate::async_message_handler_with_span;
use actix::prelude::*;
use actix_interop::with_ctx;
use color_eyre::eyre::Report;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use tracing::debug;

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_string(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct InternalUser {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

// Find user

#[derive(Message, Clone)]
#[rtype(result = "Result<Option<InternalUser>, Report>")]
pub struct UserByUsername(pub String);

async_message_handler_with_span! {
    impl AsyncSpanHandler<UserByUsername> for DbExecutor {
        async fn handle(msg: UserByUsername) -> Result<Option<InternalUser>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let username = msg.0;
            debug!(username = username.as_str(), "Retrieving user by username");
            let user = sqlx::query_as::<_, InternalUser>(
                r#"SELECT id, username, email, password_hash FROM users WHERE username = $1"#,
            )
            .bind(username)
            .fetch_optional(&pool)
            .await?;

            Ok(user)
        }
    }
}

#[derive(Message, Clone)]
#[rtype(result = "Result<Option<InternalUser>, Report>")]
pub struct UserById(pub UserId);

async_message_handler_with_span! {
    impl AsyncSpanHandler<UserById> for DbExecutor {
        async fn handle(msg: UserById) -> Result<Option<InternalUser>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let user_id = msg.0;
            debug!(id = user_id.as_string().as_str(), "Retrieving user by id");
            let user = sqlx::query_as::<_, InternalUser>(
                r#"SELECT id, username, email, password_hash FROM users WHERE id = $1"#,
            )
            .bind(user_id)
            .fetch_optional(&pool)
            .await?;

            Ok(user)
        }
    }
}

// Save user

/// Resolves to `None` when the username is already taken.
#[derive(Message, Clone)]
#[rtype(result = "Result<Option<InternalUser>, Report>")]
pub struct SaveUser(pub NewUser);

async_message_handler_with_span! {
    impl AsyncSpanHandler<SaveUser> for DbExecutor {
        async fn handle(msg: SaveUser) -> Result<Option<InternalUser>, Report> {
            let pool = with_ctx(|a: &mut DbExecutor, _| a.pool());
            let SaveUser(new_user) = msg;
            debug!(username = new_user.username.as_str(), "Saving new user");
            let user = sqlx::query_as::<_, InternalUser>(
                r#"
                INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, $4)
                ON CONFLICT (username) DO NOTHING
                RETURNING id, username, email, password_hash
                "#,
            )
            .bind(UserId::new())
            .bind(new_user.username)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .fetch_optional(&pool)
            .await?;

            Ok(user)
        }
    }
}
