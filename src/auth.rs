//! Accounts and cookie sessions.
//!
//! Passwords are stored as argon2id PHC strings. The session cookie holds a
//! [`SessionId`]; [`CurrentUser`] resolves it to a user on every request.

use crate::{
    db::{
        session::{InternalSession, SessionId},
        user::InternalUser,
    },
    error::ServerError,
    store::PollStore,
};
use actix_web::{
    cookie::{Cookie, SameSite},
    dev::Payload,
    error::ErrorInternalServerError,
    web, FromRequest, HttpRequest,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use color_eyre::eyre::{eyre, Report};
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, warn};

pub const SESSION_COOKIE: &str = "sessionid";

pub fn hash_password(password: &str) -> Result<String, Report> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| eyre!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!("Stored password hash is unreadable: {}", err);
            false
        }
    }
}

pub fn session_cookie(session: &InternalSession, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session.id.as_string())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn removed_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

pub fn session_id(req: &HttpRequest) -> Option<SessionId> {
    req.cookie(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

/// Address of the client, preferring the first `X-Forwarded-For` entry.
pub fn client_ip(req: &HttpRequest) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_owned())
        .filter(|ip| !ip.is_empty());
    match forwarded {
        Some(ip) => ip,
        None => req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_owned()),
    }
}

/// The user behind the request's session cookie, `None` for anonymous requests.
///
/// A cookie pointing at a missing session counts as anonymous.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Option<InternalUser>);

impl CurrentUser {
    pub fn user(&self) -> Option<&InternalUser> {
        self.0.as_ref()
    }
}

async fn load_user(store: &dyn PollStore, session_id: SessionId) -> Result<Option<InternalUser>, Report> {
    let session = match store.session(session_id).await? {
        Some(session) => session,
        None => {
            debug!(id = session_id.as_string().as_str(), "Unknown session");
            return Ok(None);
        }
    };
    store.user_by_id(session.user_id).await
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let store = req.app_data::<web::Data<dyn PollStore>>().cloned();
        let session_id = session_id(req);
        async move {
            let store = store.ok_or_else(|| ErrorInternalServerError("poll store is not configured"))?;
            let user = match session_id {
                Some(session_id) => load_user(store.get_ref(), session_id)
                    .await
                    .map_err(ServerError::from)?,
                None => None,
            };
            Ok(CurrentUser(user))
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("FatChance!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("FatChance!", &hash));
        assert!(!verify_password("fatchance!", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not a phc string"));
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .peer_addr("192.0.2.1:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(client_ip(&req), "203.0.113.7");

        let req = TestRequest::default()
            .peer_addr("192.0.2.1:4000".parse().unwrap())
            .to_http_request();
        assert_eq!(client_ip(&req), "192.0.2.1");
    }
}
